//! Physical control inventory of the surface
//!
//! Builds the fixed element set (8 encoders, two rows of 8 buttons, an 8x8
//! pad grid and the scene button) from [`LayoutConfig`] and resolves incoming
//! MIDI messages to `(element, raw input)` pairs. The layout is immutable
//! after startup and shared with the MIDI input callback.

use crate::config::LayoutConfig;
use crate::element::{Element, ElementId, ElementKind, RawInput};
use crate::midi::{ControlAddress, MidiMessage};
use std::collections::HashMap;

/// Throttle columns, buttons per row and pads per row
pub const COLUMNS: usize = 8;
/// Pad rows; row 0 is the bottom row
pub const PAD_ROWS: usize = 8;

/// Which sensor of an element an address feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sensor {
    Turn,
    Touch,
    Press,
}

#[derive(Debug, Clone)]
pub struct SurfaceLayout {
    elements: Vec<Element>,
    encoders: [ElementId; COLUMNS],
    upper: [ElementId; COLUMNS],
    lower: [ElementId; COLUMNS],
    pads: [[ElementId; COLUMNS]; PAD_ROWS],
    scene: ElementId,
    inputs: HashMap<ControlAddress, (ElementId, Sensor)>,
}

impl SurfaceLayout {
    pub fn new(config: &LayoutConfig) -> Self {
        let ch = config.channel;
        let mut elements = Vec::new();
        let mut inputs = HashMap::new();

        let mut add = |name: String,
                       kind: ElementKind,
                       output: Option<ControlAddress>,
                       sensors: &[(ControlAddress, Sensor)]| {
            let id = ElementId(elements.len());
            elements.push(Element::new(id, name, kind, output));
            for (address, sensor) in sensors {
                inputs.insert(*address, (id, *sensor));
            }
            id
        };

        let encoders = std::array::from_fn(|c| {
            let offset = c as u8;
            add(
                format!("encoder{}", c + 1),
                ElementKind::Encoder,
                None,
                &[
                    (ControlAddress::cc(ch, config.encoder_cc + offset), Sensor::Turn),
                    (
                        ControlAddress::note(ch, config.encoder_touch_note + offset),
                        Sensor::Touch,
                    ),
                ],
            )
        });
        let upper = std::array::from_fn(|c| {
            let address = ControlAddress::cc(ch, config.upper_cc + c as u8);
            add(
                format!("upper{}", c + 1),
                ElementKind::ColorButton,
                Some(address),
                &[(address, Sensor::Press)],
            )
        });
        let lower = std::array::from_fn(|c| {
            let address = ControlAddress::cc(ch, config.lower_cc + c as u8);
            add(
                format!("lower{}", c + 1),
                ElementKind::ColorButton,
                Some(address),
                &[(address, Sensor::Press)],
            )
        });
        let pads = std::array::from_fn(|row| {
            std::array::from_fn(|col| {
                let address =
                    ControlAddress::note(ch, config.pad_note + (row * COLUMNS + col) as u8);
                add(
                    format!("pad_r{}_c{}", row, col),
                    ElementKind::ColorPad,
                    Some(address),
                    &[(address, Sensor::Press)],
                )
            })
        });
        let scene_address = ControlAddress::cc(ch, config.scene_cc);
        let scene = add(
            "scene".to_string(),
            ElementKind::Button,
            Some(scene_address),
            &[(scene_address, Sensor::Press)],
        );

        Self {
            elements,
            encoders,
            upper,
            lower,
            pads,
            scene,
            inputs,
        }
    }

    /// Fresh copies of every element, in id order
    pub fn elements(&self) -> Vec<Element> {
        self.elements.clone()
    }

    pub fn encoder(&self, column: usize) -> ElementId {
        self.encoders[column]
    }

    pub fn upper(&self, column: usize) -> ElementId {
        self.upper[column]
    }

    pub fn lower(&self, column: usize) -> ElementId {
        self.lower[column]
    }

    /// Pad at `row` (0 = bottom) and `column`
    pub fn pad(&self, row: usize, column: usize) -> ElementId {
        self.pads[row][column]
    }

    pub fn scene_button(&self) -> ElementId {
        self.scene
    }

    /// Map a MIDI message to the element and sensor it came from
    pub fn resolve(&self, message: &MidiMessage) -> Option<(ElementId, RawInput)> {
        let address = message.address()?;
        let value = message.value()?;
        let (id, sensor) = *self.inputs.get(&address)?;
        let input = match sensor {
            Sensor::Turn => RawInput::Turn(value),
            Sensor::Touch => RawInput::Touch(value > 0),
            Sensor::Press => RawInput::Press(value > 0),
        };
        Some((id, input))
    }
}

impl Default for SurfaceLayout {
    fn default() -> Self {
        Self::new(&LayoutConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory() {
        let layout = SurfaceLayout::default();
        let elements = layout.elements();
        assert_eq!(elements.len(), 8 + 8 + 8 + 64 + 1);
        assert_eq!(elements[layout.encoder(0).0].name(), "encoder1");
        assert_eq!(elements[layout.lower(4).0].name(), "lower5");
        assert_eq!(elements[layout.pad(2, 4).0].name(), "pad_r2_c4");
        assert_eq!(elements[layout.scene_button().0].kind(), ElementKind::Button);
    }

    #[test]
    fn test_resolve_encoder_turn_and_touch() {
        let layout = SurfaceLayout::default();
        let turn = MidiMessage::ControlChange {
            channel: 0,
            cc: 73,
            value: 127,
        };
        assert_eq!(
            layout.resolve(&turn),
            Some((layout.encoder(2), RawInput::Turn(127)))
        );
        let touch = MidiMessage::NoteOn {
            channel: 0,
            note: 2,
            velocity: 127,
        };
        assert_eq!(
            layout.resolve(&touch),
            Some((layout.encoder(2), RawInput::Touch(true)))
        );
    }

    #[test]
    fn test_resolve_pad_rows_from_bottom() {
        let layout = SurfaceLayout::default();
        let bottom_left = MidiMessage::NoteOn {
            channel: 0,
            note: 36,
            velocity: 90,
        };
        assert_eq!(
            layout.resolve(&bottom_left),
            Some((layout.pad(0, 0), RawInput::Press(true)))
        );
        let top_right = MidiMessage::NoteOff {
            channel: 0,
            note: 99,
            velocity: 0,
        };
        assert_eq!(
            layout.resolve(&top_right),
            Some((layout.pad(7, 7), RawInput::Press(false)))
        );
    }

    #[test]
    fn test_unknown_controls_are_ignored() {
        let layout = SurfaceLayout::default();
        let other_channel = MidiMessage::NoteOn {
            channel: 5,
            note: 36,
            velocity: 1,
        };
        assert_eq!(layout.resolve(&other_channel), None);
        let bend = MidiMessage::PitchBend {
            channel: 0,
            value: 0,
        };
        assert_eq!(layout.resolve(&bend), None);
    }
}
