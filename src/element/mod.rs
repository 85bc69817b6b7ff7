//! Physical control elements
//!
//! The surface's control inventory is fixed at startup: every encoder, pad
//! and button becomes one [`Element`] that lives for the whole process. What
//! changes is its binding (owner + configuration) and its state, both managed
//! through the [`ElementRegistry`](crate::registry::ElementRegistry).

pub mod feedback;

pub use feedback::{ColorName, ColorSpec, Feedback, Palette, PaletteEntry, Shade};

use crate::midi::ControlAddress;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of an element in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of physical control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Endless relative encoder with a touch sensor
    Encoder,
    /// Velocity pad with a palette LED
    ColorPad,
    /// Button with a palette LED
    ColorButton,
    /// Button with a single-color LED
    Button,
}

impl ElementKind {
    pub fn default_state(self) -> ElementState {
        match self {
            ElementKind::Encoder => ElementState::position(0.0),
            _ => ElementState::Bool(false),
        }
    }
}

/// Local state of an element
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementState {
    Bool(bool),
    Position { value: f32, touched: bool },
}

impl ElementState {
    pub fn position(value: f32) -> Self {
        ElementState::Position {
            value: value.clamp(0.0, 1.0),
            touched: false,
        }
    }

    pub fn as_bool(&self) -> bool {
        match *self {
            ElementState::Bool(b) => b,
            ElementState::Position { value, .. } => value > 0.0,
        }
    }

    pub fn as_position(&self) -> Option<f32> {
        match *self {
            ElementState::Position { value, .. } => Some(value),
            ElementState::Bool(_) => None,
        }
    }

    /// Whether this state has the shape an element kind stores
    pub fn fits(&self, kind: ElementKind) -> bool {
        matches!(
            (self, kind),
            (ElementState::Position { .. }, ElementKind::Encoder)
                | (
                    ElementState::Bool(_),
                    ElementKind::ColorPad | ElementKind::ColorButton | ElementKind::Button
                )
        )
    }
}

/// How a pad or button reacts to presses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadMode {
    /// State flips on each press
    #[default]
    Toggle,
    /// State follows the pressed signal
    Momentary,
    /// Every press is reported once; no state is kept
    Trigger,
}

/// Per-binding element configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementConfig {
    #[serde(rename = "type", default)]
    pub mode: PadMode,
    #[serde(default = "default_on_color")]
    pub on_color: ColorSpec,
    #[serde(default = "default_off_color")]
    pub off_color: ColorSpec,
    /// Encoder step per detent
    #[serde(default = "default_delta")]
    pub delta: f32,
}

impl ElementConfig {
    pub fn colored(mode: PadMode, on: impl Into<ColorSpec>, off: impl Into<ColorSpec>) -> Self {
        Self {
            mode,
            on_color: on.into(),
            off_color: off.into(),
            delta: default_delta(),
        }
    }

    pub fn encoder(delta: f32) -> Self {
        Self {
            delta,
            ..Self::unbound()
        }
    }

    /// Neutral look of an element nobody owns
    pub fn unbound() -> Self {
        let gray = ColorSpec::from(ColorName::Gray).darkest();
        Self {
            mode: PadMode::Momentary,
            on_color: gray,
            off_color: gray,
            delta: default_delta(),
        }
    }
}

impl Default for ElementConfig {
    fn default() -> Self {
        Self::colored(PadMode::Toggle, default_on_color(), default_off_color())
    }
}

fn default_on_color() -> ColorSpec {
    ColorName::White.into()
}

fn default_off_color() -> ColorSpec {
    ColorSpec::from(ColorName::White).darkest()
}

fn default_delta() -> f32 {
    1.0 / 128.0
}

/// Raw signal from one control, already split by sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput {
    /// Pad/button pressed (`true`) or released
    Press(bool),
    /// Relative encoder turn, raw 7-bit value
    Turn(u8),
    /// Encoder touch sensor
    Touch(bool),
}

/// Decode a relative encoder value into signed detents
///
/// `1..=63` turn clockwise, `65..=127` counter-clockwise (two's complement),
/// `0` and `64` carry no movement.
pub fn decode_relative(raw: u8) -> Option<i32> {
    match raw & 0x7F {
        0 | 64 => None,
        v @ 1..=63 => Some(i32::from(v)),
        v => Some(i32::from(v) - 128),
    }
}

/// What a raw input does to an element
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputOutcome {
    Changed(ElementState),
    Triggered,
    Unchanged,
}

/// One physical control
#[derive(Debug, Clone)]
pub struct Element {
    id: ElementId,
    name: String,
    kind: ElementKind,
    output: Option<ControlAddress>,
    pub(crate) state: ElementState,
    pressed: bool,
}

impl Element {
    pub fn new(
        id: ElementId,
        name: impl Into<String>,
        kind: ElementKind,
        output: Option<ControlAddress>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            output,
            state: kind.default_state(),
            pressed: false,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Where LED feedback for this element goes
    pub fn output(&self) -> Option<ControlAddress> {
        self.output
    }

    pub fn state(&self) -> ElementState {
        self.state
    }

    /// Track the raw pressed level; returns `true` on a rising edge
    pub(crate) fn track_press(&mut self, pressed: bool) -> bool {
        let rising = pressed && !self.pressed;
        self.pressed = pressed;
        rising
    }

    /// Compute the effect of a raw input without applying it
    ///
    /// `rising` is the edge reported by [`Element::track_press`] for presses.
    pub fn interpret(&self, input: RawInput, rising: bool, config: &ElementConfig) -> InputOutcome {
        match (self.kind, input, self.state) {
            (ElementKind::Encoder, RawInput::Turn(raw), ElementState::Position { value, touched }) => {
                let Some(detents) = decode_relative(raw) else {
                    return InputOutcome::Unchanged;
                };
                let next = (value + config.delta * detents as f32).clamp(0.0, 1.0);
                if next == value {
                    InputOutcome::Unchanged
                } else {
                    InputOutcome::Changed(ElementState::Position {
                        value: next,
                        touched,
                    })
                }
            }
            (ElementKind::Encoder, RawInput::Touch(t), ElementState::Position { value, touched }) => {
                if t == touched {
                    InputOutcome::Unchanged
                } else {
                    InputOutcome::Changed(ElementState::Position { value, touched: t })
                }
            }
            (_, RawInput::Press(pressed), ElementState::Bool(current)) => match config.mode {
                PadMode::Toggle if rising => InputOutcome::Changed(ElementState::Bool(!current)),
                PadMode::Momentary if pressed != current => {
                    InputOutcome::Changed(ElementState::Bool(pressed))
                }
                PadMode::Trigger if rising => InputOutcome::Triggered,
                _ => InputOutcome::Unchanged,
            },
            _ => InputOutcome::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(mode: PadMode) -> (Element, ElementConfig) {
        (
            Element::new(ElementId(0), "pad", ElementKind::ColorPad, None),
            ElementConfig::colored(mode, ColorName::Green, ColorName::Red),
        )
    }

    fn press(element: &mut Element, config: &ElementConfig, pressed: bool) -> InputOutcome {
        let rising = element.track_press(pressed);
        let outcome = element.interpret(RawInput::Press(pressed), rising, config);
        if let InputOutcome::Changed(s) = outcome {
            element.state = s;
        }
        outcome
    }

    #[test]
    fn test_decode_relative() {
        assert_eq!(decode_relative(0), None);
        assert_eq!(decode_relative(64), None);
        assert_eq!(decode_relative(1), Some(1));
        assert_eq!(decode_relative(63), Some(63));
        assert_eq!(decode_relative(127), Some(-1));
        assert_eq!(decode_relative(65), Some(-63));
    }

    #[test]
    fn test_toggle_flips_on_rising_edge_only() {
        let (mut el, cfg) = pad(PadMode::Toggle);
        assert_eq!(press(&mut el, &cfg, true), InputOutcome::Changed(ElementState::Bool(true)));
        assert_eq!(press(&mut el, &cfg, true), InputOutcome::Unchanged);
        assert_eq!(press(&mut el, &cfg, false), InputOutcome::Unchanged);
        assert_eq!(press(&mut el, &cfg, true), InputOutcome::Changed(ElementState::Bool(false)));
    }

    #[test]
    fn test_momentary_mirrors_signal() {
        let (mut el, cfg) = pad(PadMode::Momentary);
        assert_eq!(press(&mut el, &cfg, true), InputOutcome::Changed(ElementState::Bool(true)));
        assert_eq!(press(&mut el, &cfg, false), InputOutcome::Changed(ElementState::Bool(false)));
    }

    #[test]
    fn test_trigger_keeps_no_state() {
        let (mut el, cfg) = pad(PadMode::Trigger);
        assert_eq!(press(&mut el, &cfg, true), InputOutcome::Triggered);
        assert_eq!(press(&mut el, &cfg, false), InputOutcome::Unchanged);
        assert_eq!(press(&mut el, &cfg, true), InputOutcome::Triggered);
        assert_eq!(el.state(), ElementState::Bool(false));
    }

    #[test]
    fn test_encoder_clamps() {
        let mut el = Element::new(ElementId(1), "enc", ElementKind::Encoder, None);
        let cfg = ElementConfig::encoder(0.25);
        el.state = ElementState::position(0.9);
        assert_eq!(
            el.interpret(RawInput::Turn(1), false, &cfg),
            InputOutcome::Changed(ElementState::Position { value: 1.0, touched: false })
        );
        el.state = ElementState::position(1.0);
        assert_eq!(el.interpret(RawInput::Turn(3), false, &cfg), InputOutcome::Unchanged);
        assert_eq!(
            el.interpret(RawInput::Turn(126), false, &cfg),
            InputOutcome::Changed(ElementState::Position { value: 0.5, touched: false })
        );
    }

    #[test]
    fn test_encoder_touch() {
        let el = Element::new(ElementId(1), "enc", ElementKind::Encoder, None);
        let cfg = ElementConfig::encoder(0.1);
        assert_eq!(
            el.interpret(RawInput::Touch(true), false, &cfg),
            InputOutcome::Changed(ElementState::Position { value: 0.0, touched: true })
        );
        assert_eq!(el.interpret(RawInput::Touch(false), false, &cfg), InputOutcome::Unchanged);
    }

    #[test]
    fn test_state_shape() {
        assert!(ElementState::Bool(true).fits(ElementKind::Button));
        assert!(!ElementState::Bool(true).fits(ElementKind::Encoder));
        assert!(ElementState::position(0.3).fits(ElementKind::Encoder));
        assert!(!ElementState::position(0.3).fits(ElementKind::ColorPad));
    }

    #[test]
    fn test_config_keys() {
        let cfg: ElementConfig =
            serde_yaml::from_str("type: trigger\nonColor: red\noffColor: blue:dark\ndelta: 0.5")
                .unwrap();
        assert_eq!(cfg.mode, PadMode::Trigger);
        assert_eq!(cfg.on_color, ColorName::Red.into());
        assert_eq!(cfg.off_color, ColorSpec::new(ColorName::Blue, Shade::Dark));
        assert_eq!(cfg.delta, 0.5);
    }
}
