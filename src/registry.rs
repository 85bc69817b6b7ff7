//! Element registry: bindings, state updates and input routing
//!
//! The registry is the only code that mutates element state. All writes go
//! through [`ElementRegistry::set_state`] with an [`Origin`]:
//!
//! - `Origin::System` (`connect`, `disconnect`, `update_from_server`) renders
//!   feedback but never reports back to the owner, so a server-originated
//!   value is not echoed to the server;
//! - `Origin::User` (`handle_input`) renders feedback and produces a
//!   [`Dispatch`] for the owning controller.

use crate::element::feedback::{self, Feedback, Palette};
use crate::element::{
    Element, ElementConfig, ElementId, ElementKind, ElementState, InputOutcome, RawInput,
};
use std::fmt;
use tracing::{debug, trace, warn};

/// Identity of a binding owner (a controller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(pub u32);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner:{}", self.0)
    }
}

/// Element ↔ owner association
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binding {
    pub owner: OwnerId,
    pub config: ElementConfig,
}

/// Who caused a state write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    System,
    User,
}

/// What the owner of an element is told about user input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementEvent {
    Changed(ElementState),
    Triggered,
}

/// A user input routed to its owner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dispatch {
    pub owner: OwnerId,
    pub element: ElementId,
    pub event: ElementEvent,
}

/// Registry of the fixed element inventory and its current bindings
pub struct ElementRegistry {
    elements: Vec<Element>,
    bindings: Vec<Option<Binding>>,
    palette: Palette,
    unbound: ElementConfig,
    pending: Vec<Feedback>,
}

impl ElementRegistry {
    /// `elements[i]` must carry `ElementId(i)`
    pub fn new(elements: Vec<Element>, palette: Palette) -> Self {
        debug_assert!(elements.iter().enumerate().all(|(i, e)| e.id() == ElementId(i)));
        let bindings = vec![None; elements.len()];
        Self {
            elements,
            bindings,
            palette,
            unbound: ElementConfig::unbound(),
            pending: Vec::new(),
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    pub fn binding(&self, id: ElementId) -> Option<&Binding> {
        self.bindings.get(id.0).and_then(Option::as_ref)
    }

    pub fn owner_of(&self, id: ElementId) -> Option<OwnerId> {
        self.binding(id).map(|b| b.owner)
    }

    /// Every bound element with its owner, in element order
    pub fn bound(&self) -> Vec<(ElementId, OwnerId)> {
        self.bindings
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.map(|b| (ElementId(i), b.owner)))
            .collect()
    }

    /// Bind an element to an owner, replacing any previous binding
    ///
    /// Sets the initial state and renders it. The owner is not notified.
    pub fn connect(
        &mut self,
        id: ElementId,
        owner: OwnerId,
        config: ElementConfig,
        initial: ElementState,
    ) {
        let Some(element) = self.elements.get(id.0) else {
            warn!("connect: no element {}", id);
            return;
        };
        if !initial.fits(element.kind()) {
            debug_assert!(false, "state {:?} does not fit {:?}", initial, element.kind());
            warn!(
                "connect: state {:?} does not fit element '{}' ({:?})",
                initial,
                element.name(),
                element.kind()
            );
            return;
        }
        if let Some(previous) = self.bindings[id.0].replace(Binding { owner, config }) {
            if previous.owner != owner {
                trace!(
                    "Element '{}' rebound from {} to {}",
                    element.name(),
                    previous.owner,
                    owner
                );
            }
        }
        self.set_state(id, initial, Origin::System);
    }

    /// Unbind an element and reset it to the neutral unbound look
    pub fn disconnect(&mut self, id: ElementId) {
        let Some(element) = self.elements.get(id.0) else {
            return;
        };
        let default = element.kind().default_state();
        if self.bindings[id.0].take().is_some() {
            self.set_state(id, default, Origin::System);
        }
    }

    /// Push a value that did not come from this element's own input
    ///
    /// No-op when the element is unbound; returns whether it was applied.
    pub fn update_from_server(&mut self, id: ElementId, value: ElementState) -> bool {
        let Some(element) = self.elements.get(id.0) else {
            return false;
        };
        if self.binding(id).is_none() {
            trace!("update_from_server: '{}' is unbound", element.name());
            return false;
        }
        if !value.fits(element.kind()) {
            warn!(
                "update_from_server: state {:?} does not fit element '{}'",
                value,
                element.name()
            );
            return false;
        }
        self.set_state(id, value, Origin::System);
        true
    }

    /// Apply a raw hardware input and route the result to the owner
    ///
    /// Input on an unbound element is dropped.
    pub fn handle_input(&mut self, id: ElementId, input: RawInput) -> Option<Dispatch> {
        let element = self.elements.get_mut(id.0)?;
        let rising = match input {
            RawInput::Press(p) => element.track_press(p),
            _ => false,
        };
        let Some(binding) = self.bindings[id.0] else {
            debug!("Dropping {:?} on unbound element '{}'", input, element.name());
            return None;
        };

        match element.interpret(input, rising, &binding.config) {
            InputOutcome::Changed(state) => self.set_state(id, state, Origin::User),
            InputOutcome::Triggered => Some(Dispatch {
                owner: binding.owner,
                element: id,
                event: ElementEvent::Triggered,
            }),
            InputOutcome::Unchanged => None,
        }
    }

    /// Re-render every element for the initial paint
    pub fn render_all(&mut self) {
        for i in 0..self.elements.len() {
            self.render(ElementId(i));
        }
    }

    /// Take the feedback produced since the last drain
    pub fn drain_feedback(&mut self) -> Vec<Feedback> {
        std::mem::take(&mut self.pending)
    }

    fn set_state(&mut self, id: ElementId, state: ElementState, origin: Origin) -> Option<Dispatch> {
        self.elements[id.0].state = state;
        self.render(id);

        match (origin, self.bindings[id.0]) {
            (Origin::User, Some(binding)) => Some(Dispatch {
                owner: binding.owner,
                element: id,
                event: ElementEvent::Changed(state),
            }),
            _ => None,
        }
    }

    fn render(&mut self, id: ElementId) {
        let element = &self.elements[id.0];
        let config = self.bindings[id.0]
            .as_ref()
            .map(|b| &b.config)
            .unwrap_or(&self.unbound);
        let Some(address) = element.output() else {
            return;
        };
        if let Some(value) = feedback::render(element.kind(), &element.state(), config, &self.palette)
        {
            self.pending.push(Feedback { address, value });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ColorName, PadMode};
    use crate::midi::ControlAddress;

    const OWNER: OwnerId = OwnerId(7);

    fn registry() -> ElementRegistry {
        let elements = vec![
            Element::new(
                ElementId(0),
                "pad",
                ElementKind::ColorPad,
                Some(ControlAddress::note(0, 36)),
            ),
            Element::new(ElementId(1), "encoder", ElementKind::Encoder, None),
            Element::new(
                ElementId(2),
                "button",
                ElementKind::Button,
                Some(ControlAddress::cc(0, 3)),
            ),
            Element::new(
                ElementId(3),
                "color_button",
                ElementKind::ColorButton,
                Some(ControlAddress::cc(0, 102)),
            ),
        ];
        ElementRegistry::new(elements, Palette::default())
    }

    fn toggle() -> ElementConfig {
        ElementConfig::colored(PadMode::Toggle, ColorName::Green, ColorName::Red)
    }

    #[test]
    fn test_connect_renders_without_dispatch() {
        let mut reg = registry();
        reg.connect(ElementId(0), OWNER, toggle(), ElementState::Bool(true));
        assert_eq!(reg.owner_of(ElementId(0)), Some(OWNER));
        assert_eq!(
            reg.drain_feedback(),
            vec![Feedback {
                address: ControlAddress::note(0, 36),
                value: 126
            }]
        );
    }

    #[test]
    fn test_disconnect_then_connect_reproduces_feedback() {
        let encoder = (ElementConfig::encoder(0.1), ElementState::position(0.3));
        let cases = [
            (ElementId(0), toggle(), ElementState::Bool(true)),
            (ElementId(0), toggle(), ElementState::Bool(false)),
            (ElementId(1), encoder.0, encoder.1),
            (ElementId(2), toggle(), ElementState::Bool(true)),
            (ElementId(2), toggle(), ElementState::Bool(false)),
            (ElementId(3), toggle(), ElementState::Bool(true)),
            (ElementId(3), toggle(), ElementState::Bool(false)),
        ];
        for (id, config, state) in cases {
            let mut reg = registry();
            reg.connect(id, OWNER, config, state);
            let first = reg.drain_feedback();

            reg.disconnect(id);
            reg.drain_feedback();
            assert_eq!(reg.owner_of(id), None);

            reg.connect(id, OWNER, config, state);
            assert_eq!(reg.drain_feedback(), first, "{:?} {:?}", id, state);
            assert_eq!(reg.element(id).unwrap().state(), state);
        }
    }

    #[test]
    fn test_disconnect_renders_unbound_look() {
        let mut reg = registry();
        reg.connect(ElementId(0), OWNER, toggle(), ElementState::Bool(true));
        let first = reg.drain_feedback();

        reg.disconnect(ElementId(0));
        let unbound = reg.drain_feedback();
        assert_eq!(unbound.len(), 1);
        assert_ne!(unbound, first);

        // Encoders have no LED
        reg.connect(ElementId(1), OWNER, ElementConfig::encoder(0.1), ElementState::position(0.3));
        reg.disconnect(ElementId(1));
        assert!(reg.drain_feedback().is_empty());
    }

    #[test]
    fn test_update_from_server_ignores_unbound() {
        let mut reg = registry();
        assert!(!reg.update_from_server(ElementId(0), ElementState::Bool(true)));
        assert!(reg.drain_feedback().is_empty());

        reg.connect(ElementId(0), OWNER, toggle(), ElementState::Bool(false));
        reg.drain_feedback();
        assert!(reg.update_from_server(ElementId(0), ElementState::Bool(true)));
        assert_eq!(reg.element(ElementId(0)).unwrap().state(), ElementState::Bool(true));
        assert_eq!(reg.drain_feedback().len(), 1);
    }

    #[test]
    fn test_user_input_dispatches_to_owner() {
        let mut reg = registry();
        reg.connect(ElementId(0), OWNER, toggle(), ElementState::Bool(false));
        let dispatch = reg.handle_input(ElementId(0), RawInput::Press(true)).unwrap();
        assert_eq!(dispatch.owner, OWNER);
        assert_eq!(dispatch.event, ElementEvent::Changed(ElementState::Bool(true)));
        assert!(reg.handle_input(ElementId(0), RawInput::Press(false)).is_none());
    }

    #[test]
    fn test_input_on_unbound_element_is_dropped() {
        let mut reg = registry();
        assert!(reg.handle_input(ElementId(0), RawInput::Press(true)).is_none());
        assert_eq!(reg.element(ElementId(0)).unwrap().state(), ElementState::Bool(false));
        assert!(reg.handle_input(ElementId(42), RawInput::Press(true)).is_none());
    }

    #[test]
    fn test_press_held_while_unbound_is_not_a_rising_edge_later() {
        let mut reg = registry();
        reg.handle_input(ElementId(0), RawInput::Press(true));
        reg.connect(ElementId(0), OWNER, toggle(), ElementState::Bool(false));
        assert!(reg.handle_input(ElementId(0), RawInput::Press(true)).is_none());
    }

    #[test]
    fn test_encoder_turn_produces_no_feedback() {
        let mut reg = registry();
        reg.connect(
            ElementId(1),
            OWNER,
            ElementConfig::encoder(0.1),
            ElementState::position(0.5),
        );
        let dispatch = reg.handle_input(ElementId(1), RawInput::Turn(1)).unwrap();
        match dispatch.event {
            ElementEvent::Changed(ElementState::Position { value, .. }) => {
                assert!((value - 0.6).abs() < 1e-6)
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(reg.drain_feedback().is_empty());
    }

    #[test]
    fn test_rebind_replaces_owner() {
        let mut reg = registry();
        reg.connect(ElementId(2), OWNER, toggle(), ElementState::Bool(false));
        reg.connect(ElementId(2), OwnerId(9), toggle(), ElementState::Bool(true));
        assert_eq!(reg.owner_of(ElementId(2)), Some(OwnerId(9)));
        assert_eq!(reg.bound(), vec![(ElementId(2), OwnerId(9))]);
    }

    #[test]
    fn test_trigger_dispatch() {
        let mut reg = registry();
        let trigger = ElementConfig::colored(PadMode::Trigger, ColorName::Blue, ColorName::Gray);
        reg.connect(ElementId(0), OWNER, trigger, ElementState::Bool(true));
        let dispatch = reg.handle_input(ElementId(0), RawInput::Press(true)).unwrap();
        assert_eq!(dispatch.event, ElementEvent::Triggered);
    }
}
