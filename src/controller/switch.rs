//! Switch group pad
//!
//! `Single` groups bind as a toggle (on = thrown color, off = closed color).
//! An invalid single binds on, so its first press closes it.
//! Composite groups bind as a trigger showing the color of the position the
//! next press selects. Writes are optimistic: the roster is updated at once
//! and the pad re-rendered, so the server's echo changes nothing.

use super::SurfaceState;
use crate::element::{ColorName, ElementConfig, ElementId, ElementState, PadMode};
use crate::entity::{EntityChange, SwitchField};
use crate::protocol::ServerRequest;
use crate::registry::{ElementEvent, OwnerId};
use crate::switch_group::{GroupKind, Position, SwitchGroup};
use tracing::{debug, info, trace};

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchController {
    panel: usize,
    group: usize,
    pad: ElementId,
    bound: bool,
}

impl SwitchController {
    pub fn new(panel: usize, group: usize, pad: ElementId) -> Self {
        Self {
            panel,
            group,
            pad,
            bound: false,
        }
    }

    /// Group and its current position, or `None` while any switch is unresolved
    fn resolve(&self, state: &SurfaceState) -> Option<(SwitchGroup, Position)> {
        let group = state.roster.group(self.panel, self.group)?;
        let states = state.roster.group_states(group)?;
        let position = group.current_position(&states);
        Some((group.clone(), position))
    }

    fn binding(group: &SwitchGroup, position: Position) -> (ElementConfig, ElementState) {
        if group.kind() == GroupKind::Single {
            let (on, off) = if position == Position::Invalid {
                (ColorName::Warning, ColorName::Warning)
            } else {
                (group.color(Position::Thrown), group.color(Position::Closed))
            };
            (
                ElementConfig::colored(PadMode::Toggle, on, off),
                ElementState::Bool(position != Position::Closed),
            )
        } else {
            let color = if position == Position::Invalid {
                ColorName::Warning
            } else {
                group.color(group.next_position(position))
            };
            (
                ElementConfig::colored(PadMode::Trigger, color, color),
                ElementState::Bool(false),
            )
        }
    }

    /// (Re)bind the pad for the group's live position
    ///
    /// Leaves the pad unbound while the group is unresolved.
    pub fn connect(&mut self, owner: OwnerId, state: &mut SurfaceState) {
        let Some((group, position)) = self.resolve(state) else {
            trace!("Group {}/{} unresolved", self.panel, self.group);
            return;
        };
        let (config, initial) = Self::binding(&group, position);
        state.registry.connect(self.pad, owner, config, initial);
        self.bound = true;
    }

    pub fn disconnect(&mut self, state: &mut SurfaceState) {
        if self.bound {
            state.registry.disconnect(self.pad);
            self.bound = false;
        }
    }

    pub fn element_changed(&mut self, owner: OwnerId, event: ElementEvent, state: &mut SurfaceState) {
        let Some((group, position)) = self.resolve(state) else {
            return;
        };
        let target = match (group.kind(), event) {
            (GroupKind::Single, ElementEvent::Changed(s)) => {
                if s.as_bool() {
                    Position::Thrown
                } else {
                    Position::Closed
                }
            }
            (GroupKind::Single, ElementEvent::Triggered) => return,
            (_, ElementEvent::Triggered) => group.next_position(position),
            (_, ElementEvent::Changed(_)) => return,
        };
        let Some(writes) = group.set_states(target) else {
            return;
        };

        info!("Switch group '{}': {} → {}", group.label(), position, target);
        for (name, switch_state) in writes {
            let changed = state
                .roster
                .switch_mut(&name)
                .is_some_and(|s| s.set_state(switch_state));
            if changed {
                state.request(ServerRequest::SetTurnout {
                    name,
                    state: switch_state.code(),
                });
            }
        }
        self.connect(owner, state);
    }

    pub fn entity_changed(&mut self, owner: OwnerId, change: &EntityChange, state: &mut SurfaceState) {
        let name = match change {
            EntityChange::Switch {
                name,
                field: SwitchField::State,
            }
            | EntityChange::SwitchResolved { name } => name,
            _ => return,
        };
        let Some(group) = state.roster.group(self.panel, self.group) else {
            return;
        };
        if group.contains(name) {
            debug!("Group {}/{} refreshed by '{}'", self.panel, self.group, name);
            self.connect(owner, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Palette, RawInput};
    use crate::entity::{Panel, Roster, SwitchState};
    use crate::layout::SurfaceLayout;
    use crate::protocol::ServerEvent;
    use crate::registry::ElementRegistry;
    use serde_json::json;

    const OWNER: OwnerId = OwnerId(4);

    fn setup(kind: GroupKind) -> (ElementId, SurfaceState, SwitchController) {
        let layout = SurfaceLayout::default();
        let members = (0..kind.arity()).map(|i| format!("LT{}", i + 1)).collect();
        let group = SwitchGroup::new(kind, members, None).unwrap();
        let roster = Roster::new(
            vec![],
            vec![Panel {
                name: "Yard".into(),
                groups: vec![group],
            }],
        );
        let registry = ElementRegistry::new(layout.elements(), Palette::default());
        let pad = layout.pad(7, 0);
        (pad, SurfaceState::new(registry, roster), SwitchController::new(0, 0, pad))
    }

    fn report(state: &mut SurfaceState, name: &str, code: i64) -> Vec<EntityChange> {
        let event =
            ServerEvent::decode(&json!({"type": "turnout", "data": {"name": name, "state": code}}))
                .unwrap();
        state.roster.apply(&event)
    }

    fn press(state: &mut SurfaceState, c: &mut SwitchController, pad: ElementId) {
        for pressed in [true, false] {
            if let Some(d) = state.registry.handle_input(pad, RawInput::Press(pressed)) {
                c.element_changed(d.owner, d.event, state);
            }
        }
    }

    fn switch_state(state: &SurfaceState, name: &str) -> SwitchState {
        state.roster.switch(name).unwrap().state()
    }

    #[test]
    fn test_unresolved_group_stays_unbound_until_resolved() {
        let (pad, mut state, mut c) = setup(GroupKind::ThreeWay);
        c.connect(OWNER, &mut state);
        assert_eq!(state.registry.owner_of(pad), None);

        for change in report(&mut state, "LT1", 2) {
            c.entity_changed(OWNER, &change, &mut state);
        }
        assert_eq!(state.registry.owner_of(pad), None);

        for change in report(&mut state, "LT2", 2) {
            c.entity_changed(OWNER, &change, &mut state);
        }
        assert_eq!(state.registry.owner_of(pad), Some(OWNER));
    }

    #[test]
    fn test_three_way_presses_follow_the_cycle() {
        let (pad, mut state, mut c) = setup(GroupKind::ThreeWay);
        report(&mut state, "LT1", 2);
        report(&mut state, "LT2", 2);
        c.connect(OWNER, &mut state);

        // mid → left
        press(&mut state, &mut c, pad);
        assert_eq!(switch_state(&state, "LT1"), SwitchState::Thrown);
        assert_eq!(switch_state(&state, "LT2"), SwitchState::Closed);
        assert_eq!(
            state.take_requests(),
            vec![ServerRequest::SetTurnout {
                name: "LT1".into(),
                state: 4
            }]
        );

        // left → right
        press(&mut state, &mut c, pad);
        assert_eq!(switch_state(&state, "LT1"), SwitchState::Closed);
        assert_eq!(switch_state(&state, "LT2"), SwitchState::Thrown);

        // right → mid
        press(&mut state, &mut c, pad);
        assert_eq!(switch_state(&state, "LT1"), SwitchState::Closed);
        assert_eq!(switch_state(&state, "LT2"), SwitchState::Closed);
    }

    #[test]
    fn test_pad_shows_next_position_color() {
        let (pad, mut state, mut c) = setup(GroupKind::ThreeWay);
        report(&mut state, "LT1", 2);
        report(&mut state, "LT2", 2);
        c.connect(OWNER, &mut state);
        let palette = Palette::default();
        let config = state.registry.binding(pad).unwrap().config;
        assert_eq!(config.on_color, ColorName::Yellow.into());

        press(&mut state, &mut c, pad);
        let config = state.registry.binding(pad).unwrap().config;
        assert_eq!(config.on_color, ColorName::Blue.into());
        let last = state.registry.drain_feedback().pop().unwrap();
        assert_eq!(last.value, palette.index(ColorName::Blue.into()));
    }

    #[test]
    fn test_invalid_position_renders_warning_and_recovers_home() {
        let (pad, mut state, mut c) = setup(GroupKind::ThreeWay);
        report(&mut state, "LT1", 4);
        report(&mut state, "LT2", 4);
        c.connect(OWNER, &mut state);
        let config = state.registry.binding(pad).unwrap().config;
        assert_eq!(config.on_color, ColorName::Warning.into());

        press(&mut state, &mut c, pad);
        assert_eq!(switch_state(&state, "LT1"), SwitchState::Closed);
        assert_eq!(switch_state(&state, "LT2"), SwitchState::Closed);
    }

    #[test]
    fn test_invalid_single_recovers_to_closed() {
        for code in [1, 8] {
            let (pad, mut state, mut c) = setup(GroupKind::Single);
            report(&mut state, "LT1", code);
            c.connect(OWNER, &mut state);
            let config = state.registry.binding(pad).unwrap().config;
            assert_eq!(config.on_color, ColorName::Warning.into());

            press(&mut state, &mut c, pad);
            assert_eq!(switch_state(&state, "LT1"), SwitchState::Closed);
            assert_eq!(
                state.take_requests(),
                vec![ServerRequest::SetTurnout {
                    name: "LT1".into(),
                    state: 2
                }]
            );
            assert_eq!(
                state.registry.element(pad).unwrap().state(),
                ElementState::Bool(false)
            );
        }
    }

    #[test]
    fn test_single_toggle_and_server_echo() {
        let (pad, mut state, mut c) = setup(GroupKind::Single);
        report(&mut state, "LT1", 2);
        c.connect(OWNER, &mut state);

        press(&mut state, &mut c, pad);
        assert_eq!(switch_state(&state, "LT1"), SwitchState::Thrown);
        assert_eq!(state.take_requests().len(), 1);

        // Echo of our own write changes nothing
        assert!(report(&mut state, "LT1", 4).is_empty());

        // A different value from the server wins
        for change in report(&mut state, "LT1", 2) {
            c.entity_changed(OWNER, &change, &mut state);
        }
        assert_eq!(
            state.registry.element(pad).unwrap().state(),
            ElementState::Bool(false)
        );
        assert!(state.take_requests().is_empty());
    }
}
