//! Function pads (pad rows 4-7)
//!
//! With a throttle selected, the 32 pads show functions F0-F31 of that loco in
//! reading order. Without a selection, each column shows the favorite
//! functions of the loco in that throttle column.

use super::SurfaceState;
use crate::element::{ColorName, ColorSpec, ElementConfig, ElementId, ElementState, PadMode};
use crate::entity::{EntityChange, LocoField};
use crate::layout::COLUMNS;
use crate::protocol::ServerRequest;
use crate::registry::{ElementEvent, OwnerId};
use tracing::trace;

/// Pad rows given to functions
pub const FUNCTION_ROWS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FunctionBinding {
    pad: ElementId,
    address: u32,
    index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionController {
    /// Pads, top row first
    pads: [[ElementId; COLUMNS]; FUNCTION_ROWS],
    /// Loco address in each throttle column
    columns: Vec<Option<u32>>,
    bound: Vec<FunctionBinding>,
}

impl FunctionController {
    pub fn new(pads: [[ElementId; COLUMNS]; FUNCTION_ROWS], columns: Vec<Option<u32>>) -> Self {
        Self {
            pads,
            columns,
            bound: Vec::new(),
        }
    }

    /// `(pad, address, function)` triples currently bound
    pub fn bindings(&self) -> Vec<(ElementId, u32, usize)> {
        self.bound
            .iter()
            .map(|b| (b.pad, b.address, b.index))
            .collect()
    }

    fn plan(&self, state: &SurfaceState) -> Vec<FunctionBinding> {
        let mut plan = Vec::new();
        let selected = state
            .selection
            .selected()
            .and_then(|c| self.columns.get(c).copied().flatten());

        match selected {
            Some(address) => {
                let Some(loco) = state.roster.loco(address) else {
                    return plan;
                };
                for (row, pads) in self.pads.iter().enumerate() {
                    for (col, pad) in pads.iter().enumerate() {
                        let index = row * COLUMNS + col;
                        if index < loco.function_count() {
                            plan.push(FunctionBinding {
                                pad: *pad,
                                address,
                                index,
                            });
                        }
                    }
                }
            }
            None => {
                for (col, address) in self.columns.iter().enumerate().take(COLUMNS) {
                    let Some(loco) = address.and_then(|a| state.roster.loco(a)) else {
                        continue;
                    };
                    for (row, index) in loco.favorites().iter().take(FUNCTION_ROWS).enumerate() {
                        plan.push(FunctionBinding {
                            pad: self.pads[row][col],
                            address: loco.address(),
                            index: *index,
                        });
                    }
                }
            }
        }
        plan
    }

    pub fn connect(&mut self, owner: OwnerId, state: &mut SurfaceState) {
        self.bound = self.plan(state);
        for binding in &self.bound {
            let Some(loco) = state.roster.loco(binding.address) else {
                continue;
            };
            let mode = if loco.is_momentary(binding.index) {
                PadMode::Momentary
            } else {
                PadMode::Toggle
            };
            let config = ElementConfig::colored(
                mode,
                ColorName::Yellow,
                ColorSpec::from(ColorName::Yellow).darkest(),
            );
            let on = loco.function(binding.index).unwrap_or(false);
            state
                .registry
                .connect(binding.pad, owner, config, ElementState::Bool(on));
        }
    }

    pub fn disconnect(&mut self, state: &mut SurfaceState) {
        for binding in self.bound.drain(..) {
            state.registry.disconnect(binding.pad);
        }
    }

    pub fn element_changed(&mut self, element: ElementId, event: ElementEvent, state: &mut SurfaceState) {
        let ElementEvent::Changed(new_state) = event else {
            return;
        };
        let Some(binding) = self.bound.iter().find(|b| b.pad == element).copied() else {
            return;
        };
        let on = new_state.as_bool();
        let Some(function) = state
            .roster
            .loco_mut(binding.address)
            .and_then(|l| l.functions.get_mut(binding.index))
        else {
            return;
        };
        if function.assign(on) {
            trace!("Loco {} F{} → {}", binding.address, binding.index, on);
            state.request(ServerRequest::Function {
                address: binding.address,
                index: binding.index,
                on,
            });
        }
    }

    pub fn entity_changed(&mut self, change: &EntityChange, state: &mut SurfaceState) {
        let EntityChange::Loco {
            address,
            field: LocoField::Function(index),
        } = change
        else {
            return;
        };
        let Some(on) = state.roster.loco(*address).and_then(|l| l.function(*index)) else {
            return;
        };
        for binding in &self.bound {
            if binding.address == *address && binding.index == *index {
                state
                    .registry
                    .update_from_server(binding.pad, ElementState::Bool(on));
            }
        }
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

    const OWNER: OwnerId = OwnerId(3);

    fn loco(yaml: &str) -> Loco {
        let config: LocoConfig = serde_yaml::from_str(yaml).unwrap();
        Loco::from_config(&config)
    }

    fn setup() -> (SurfaceLayout, SurfaceState, FunctionController) {
        let layout = SurfaceLayout::default();
        let roster = Roster::new(
            vec![
                loco("address: 3\nfavorites: [0, 2]\nmomentary: [2]"),
                loco("address: 5\nfunctions: 10"),
            ],
            vec![],
        );
        let registry = ElementRegistry::new(layout.elements(), Palette::default());
        let pads = std::array::from_fn(|r| std::array::from_fn(|c| layout.pad(7 - r, c)));
        let controller = FunctionController::new(pads, vec![Some(3), Some(5), None]);
        (layout, SurfaceState::new(registry, roster), controller)
    }

    #[test]
    fn test_unselected_columns_show_favorites() {
        let (layout, mut state, mut c) = setup();
        c.connect(OWNER, &mut state);
        assert_eq!(
            c.bindings(),
            vec![
                (layout.pad(7, 0), 3, 0),
                (layout.pad(6, 0), 3, 2),
                (layout.pad(7, 1), 5, 0),
                (layout.pad(6, 1), 5, 1),
                (layout.pad(5, 1), 5, 2),
                (layout.pad(4, 1), 5, 3),
            ]
        );
    }

    #[test]
    fn test_selected_loco_maps_functions_in_reading_order() {
        let (layout, mut state, mut c) = setup();
        state.selection.select(1);
        c.connect(OWNER, &mut state);
        let bindings = c.bindings();
        assert_eq!(bindings.len(), 10);
        assert_eq!(bindings[9], (layout.pad(6, 1), 5, 9));
    }

    #[test]
    fn test_press_toggles_function() {
        let (layout, mut state, mut c) = setup();
        c.connect(OWNER, &mut state);
        let d = state
            .registry
            .handle_input(layout.pad(7, 0), RawInput::Press(true))
            .unwrap();
        c.element_changed(d.element, d.event, &mut state);
        assert_eq!(
            state.take_requests(),
            vec![ServerRequest::Function {
                address: 3,
                index: 0,
                on: true
            }]
        );
    }

    #[test]
    fn test_momentary_function_releases() {
        let (layout, mut state, mut c) = setup();
        c.connect(OWNER, &mut state);
        for pressed in [true, false] {
            let d = state
                .registry
                .handle_input(layout.pad(6, 0), RawInput::Press(pressed))
                .unwrap();
            c.element_changed(d.element, d.event, &mut state);
        }
        let requests = state.take_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[1],
            ServerRequest::Function {
                address: 3,
                index: 2,
                on: false
            }
        );
    }

    #[test]
    fn test_server_function_change_updates_pad() {
        let (layout, mut state, mut c) = setup();
        c.connect(OWNER, &mut state);
        state.roster.loco_mut(5).unwrap().functions[1].assign(true);
        c.entity_changed(
            &EntityChange::Loco {
                address: 5,
                field: LocoField::Function(1),
            },
            &mut state,
        );
        assert_eq!(
            state.registry.element(layout.pad(6, 1)).unwrap().state(),
            ElementState::Bool(true)
        );
        assert!(state.take_requests().is_empty());
    }

    #[test]
    fn test_disconnect_releases_all_pads() {
        let (_, mut state, mut c) = setup();
        c.connect(OWNER, &mut state);
        c.disconnect(&mut state);
        assert!(state.registry.bound().is_empty());
        assert!(c.bindings().is_empty());
    }
}
