//! Throttle column: encoder ↔ speed, upper button ↔ direction, lower button ↔ selection

use super::{Followup, SurfaceState};
use crate::display::ThrottleView;
use crate::element::{ColorName, ColorSpec, ElementConfig, ElementId, ElementState, PadMode};
use crate::entity::{EntityChange, LocoField};
use crate::protocol::ServerRequest;
use crate::registry::{ElementEvent, OwnerId};
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleController {
    column: usize,
    address: u32,
    encoder: ElementId,
    direction: ElementId,
    select: ElementId,
}

impl ThrottleController {
    pub fn new(
        column: usize,
        address: u32,
        encoder: ElementId,
        direction: ElementId,
        select: ElementId,
    ) -> Self {
        Self {
            column,
            address,
            encoder,
            direction,
            select,
        }
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    fn direction_config() -> ElementConfig {
        ElementConfig::colored(PadMode::Toggle, ColorName::Green, ColorName::Orange)
    }

    fn select_config() -> ElementConfig {
        ElementConfig::colored(
            PadMode::Toggle,
            ColorName::White,
            ColorSpec::from(ColorName::White).darkest(),
        )
    }

    pub fn connect(&mut self, owner: OwnerId, state: &mut SurfaceState) {
        let Some(loco) = state.roster.loco(self.address) else {
            debug!("Throttle column {}: no loco {}", self.column, self.address);
            return;
        };
        let (step, speed, forward) = (loco.step(), loco.speed_value(), loco.is_forward());
        let selected = state.selection.is_selected(self.column);

        state.registry.connect(
            self.encoder,
            owner,
            ElementConfig::encoder(step),
            ElementState::position(speed),
        );
        state.registry.connect(
            self.direction,
            owner,
            Self::direction_config(),
            ElementState::Bool(forward),
        );
        state.registry.connect(
            self.select,
            owner,
            Self::select_config(),
            ElementState::Bool(selected),
        );
        state.display.add_view(
            owner,
            Box::new(ThrottleView {
                column: self.column,
                address: self.address,
            }),
        );
    }

    pub fn disconnect(&mut self, owner: OwnerId, state: &mut SurfaceState) {
        for id in [self.encoder, self.direction, self.select] {
            state.registry.disconnect(id);
        }
        state.display.remove_view(owner);
    }

    pub fn element_changed(&mut self, element: ElementId, event: ElementEvent, state: &mut SurfaceState) {
        let ElementEvent::Changed(new_state) = event else {
            return;
        };
        let address = self.address;

        if element == self.encoder {
            let Some(value) = new_state.as_position() else {
                return;
            };
            let Some(loco) = state.roster.loco_mut(address) else {
                return;
            };
            if loco.speed.assign(value) {
                trace!("Loco {} speed → {:.3}", address, value);
                state.request(ServerRequest::Speed {
                    address,
                    speed: value,
                });
            }
        } else if element == self.direction {
            let forward = new_state.as_bool();
            let Some(loco) = state.roster.loco_mut(address) else {
                return;
            };
            loco.forward.assign(forward);
            // Reversing always stops the loco first
            loco.speed.assign(0.0f32);
            debug!("Loco {} direction → {}", address, if forward { "forward" } else { "reverse" });
            state.request(ServerRequest::Speed { address, speed: 0.0 });
            state.request(ServerRequest::Direction { address, forward });
            let stopped = state.encoder_state(self.encoder, 0.0);
            state.registry.update_from_server(self.encoder, stopped);
        } else if element == self.select {
            if new_state.as_bool() {
                state.selection.select(self.column);
            } else {
                state.selection.deselect(self.column);
            }
            state.follow(Followup::SelectionChanged);
        }
    }

    pub fn entity_changed(&mut self, change: &EntityChange, state: &mut SurfaceState) {
        let EntityChange::Loco { address, field } = change else {
            return;
        };
        if *address != self.address {
            return;
        }
        let Some(loco) = state.roster.loco(self.address) else {
            return;
        };
        match field {
            LocoField::Speed => {
                let value = state.encoder_state(self.encoder, loco.speed_value());
                state.registry.update_from_server(self.encoder, value);
            }
            LocoField::Forward => {
                let forward = ElementState::Bool(loco.is_forward());
                state.registry.update_from_server(self.direction, forward);
            }
            _ => {}
        }
    }

    pub fn selection_changed(&mut self, state: &mut SurfaceState) {
        let selected = state.selection.is_selected(self.column);
        state
            .registry
            .update_from_server(self.select, ElementState::Bool(selected));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocoConfig;
    use crate::element::{Palette, RawInput};
    use crate::entity::{Loco, Roster};
    use crate::layout::SurfaceLayout;
    use crate::registry::ElementRegistry;

    const OWNER: OwnerId = OwnerId(1);

    fn setup() -> (SurfaceLayout, SurfaceState, ThrottleController) {
        let layout = SurfaceLayout::default();
        let config: LocoConfig = serde_yaml::from_str("address: 3\ndelta: 0.25").unwrap();
        let roster = Roster::new(vec![Loco::from_config(&config)], vec![]);
        let registry = ElementRegistry::new(layout.elements(), Palette::default());
        let state = SurfaceState::new(registry, roster);
        let controller =
            ThrottleController::new(0, 3, layout.encoder(0), layout.upper(0), layout.lower(0));
        (layout, state, controller)
    }

    fn press(state: &mut SurfaceState, c: &mut ThrottleController, id: ElementId) {
        for pressed in [true, false] {
            if let Some(d) = state.registry.handle_input(id, RawInput::Press(pressed)) {
                c.element_changed(d.element, d.event, state);
            }
        }
    }

    #[test]
    fn test_connect_binds_three_elements_and_a_view() {
        let (layout, mut state, mut c) = setup();
        c.connect(OWNER, &mut state);
        assert_eq!(state.registry.owner_of(layout.encoder(0)), Some(OWNER));
        assert_eq!(state.registry.owner_of(layout.upper(0)), Some(OWNER));
        assert_eq!(state.registry.owner_of(layout.lower(0)), Some(OWNER));
        assert_eq!(state.display.len(), 1);
        assert!(state.take_requests().is_empty());

        c.disconnect(OWNER, &mut state);
        assert!(state.registry.bound().is_empty());
        assert!(state.display.is_empty());
    }

    #[test]
    fn test_encoder_turn_sends_speed() {
        let (layout, mut state, mut c) = setup();
        c.connect(OWNER, &mut state);
        let d = state
            .registry
            .handle_input(layout.encoder(0), RawInput::Turn(2))
            .unwrap();
        c.element_changed(d.element, d.event, &mut state);
        assert_eq!(
            state.take_requests(),
            vec![ServerRequest::Speed {
                address: 3,
                speed: 0.5
            }]
        );
        assert_eq!(state.roster.loco(3).unwrap().speed_value(), 0.5);
    }

    #[test]
    fn test_direction_toggle_stops_the_loco() {
        let (layout, mut state, mut c) = setup();
        state.roster.loco_mut(3).unwrap().speed.assign(0.75f32);
        c.connect(OWNER, &mut state);

        press(&mut state, &mut c, layout.upper(0));
        assert_eq!(
            state.take_requests(),
            vec![
                ServerRequest::Speed {
                    address: 3,
                    speed: 0.0
                },
                ServerRequest::Direction {
                    address: 3,
                    forward: false
                },
            ]
        );
        let encoder = state.registry.element(layout.encoder(0)).unwrap();
        assert_eq!(encoder.state().as_position(), Some(0.0));
    }

    #[test]
    fn test_server_speed_updates_encoder_without_request() {
        let (layout, mut state, mut c) = setup();
        c.connect(OWNER, &mut state);
        state.roster.loco_mut(3).unwrap().speed.assign(0.25f32);
        c.entity_changed(
            &EntityChange::Loco {
                address: 3,
                field: LocoField::Speed,
            },
            &mut state,
        );
        let encoder = state.registry.element(layout.encoder(0)).unwrap();
        assert_eq!(encoder.state().as_position(), Some(0.25));
        assert!(state.take_requests().is_empty());
    }

    #[test]
    fn test_select_button_updates_selection() {
        let (layout, mut state, mut c) = setup();
        c.connect(OWNER, &mut state);
        press(&mut state, &mut c, layout.lower(0));
        assert_eq!(state.selection.selected(), Some(0));
        assert_eq!(state.take_followups(), vec![Followup::SelectionChanged]);

        press(&mut state, &mut c, layout.lower(0));
        assert_eq!(state.selection.selected(), None);
    }

    #[test]
    fn test_missing_loco_leaves_elements_unbound() {
        let (layout, mut state, _) = setup();
        let mut c = ThrottleController::new(1, 99, layout.encoder(1), layout.upper(1), layout.lower(1));
        c.connect(OWNER, &mut state);
        assert!(state.registry.bound().is_empty());
        assert!(state
            .registry
            .handle_input(layout.upper(1), RawInput::Press(true))
            .is_none());
    }
}
