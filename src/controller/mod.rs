//! Controllers: bindings between elements and domain entities
//!
//! A controller binds a fixed set of elements to one domain sub-entity while
//! its scene or page is active. It is identified by an [`OwnerId`]; elements
//! refer to it only through that id, resolved via the [`ControllerSet`].
//!
//! Controllers never call back into scenes. Navigation and cross-controller
//! effects are queued as [`Followup`]s and applied by the actor once the
//! current dispatch has returned.

pub mod function;
pub mod panel;
pub mod switch;
pub mod throttle;

pub use function::FunctionController;
pub use panel::{PanelController, PanelTarget};
pub use switch::SwitchController;
pub use throttle::ThrottleController;

use crate::display::DisplayList;
use crate::element::{ElementId, ElementState};
use crate::entity::{EntityChange, Roster};
use crate::protocol::ServerRequest;
use crate::registry::{ElementEvent, ElementRegistry, OwnerId};
use crate::selection::SelectionManager;
use std::collections::BTreeMap;

/// Deferred effect of a controller operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Followup {
    GotoPage(usize),
    NextScene,
    /// The throttle selection changed; dependents must refresh
    SelectionChanged,
}

/// Everything controllers read and mutate, owned by the surface actor
pub struct SurfaceState {
    pub registry: ElementRegistry,
    pub roster: Roster,
    pub selection: SelectionManager,
    pub display: DisplayList,
    requests: Vec<ServerRequest>,
    followups: Vec<Followup>,
}

impl SurfaceState {
    pub fn new(registry: ElementRegistry, roster: Roster) -> Self {
        Self {
            registry,
            roster,
            selection: SelectionManager::new(),
            display: DisplayList::new(),
            requests: Vec::new(),
            followups: Vec::new(),
        }
    }

    /// Queue a request for the server; sent after the current command
    pub fn request(&mut self, request: ServerRequest) {
        self.requests.push(request);
    }

    pub fn follow(&mut self, followup: Followup) {
        self.followups.push(followup);
    }

    pub fn take_requests(&mut self) -> Vec<ServerRequest> {
        std::mem::take(&mut self.requests)
    }

    pub fn take_followups(&mut self) -> Vec<Followup> {
        std::mem::take(&mut self.followups)
    }

    /// Encoder state at `value`, keeping the current touch flag
    pub(crate) fn encoder_state(&self, id: ElementId, value: f32) -> ElementState {
        let touched = matches!(
            self.registry.element(id).map(|e| e.state()),
            Some(ElementState::Position { touched: true, .. })
        );
        ElementState::Position {
            value: value.clamp(0.0, 1.0),
            touched,
        }
    }
}

/// The four controller roles
#[derive(Debug)]
pub enum Controller {
    Throttle(ThrottleController),
    Switch(SwitchController),
    Panel(PanelController),
    Function(FunctionController),
}

impl Controller {
    /// Bind elements (and views) for this controller
    pub fn connect(&mut self, owner: OwnerId, state: &mut SurfaceState) {
        match self {
            Controller::Throttle(c) => c.connect(owner, state),
            Controller::Switch(c) => c.connect(owner, state),
            Controller::Panel(c) => c.connect(owner, state),
            Controller::Function(c) => c.connect(owner, state),
        }
    }

    /// Release every element and view this controller holds
    pub fn disconnect(&mut self, owner: OwnerId, state: &mut SurfaceState) {
        match self {
            Controller::Throttle(c) => c.disconnect(owner, state),
            Controller::Switch(c) => c.disconnect(state),
            Controller::Panel(c) => c.disconnect(state),
            Controller::Function(c) => c.disconnect(state),
        }
    }

    /// User input on one of this controller's elements
    pub fn element_changed(
        &mut self,
        owner: OwnerId,
        element: ElementId,
        event: ElementEvent,
        state: &mut SurfaceState,
    ) {
        match self {
            Controller::Throttle(c) => c.element_changed(element, event, state),
            Controller::Switch(c) => c.element_changed(owner, event, state),
            Controller::Panel(c) => c.element_changed(element, event, state),
            Controller::Function(c) => c.element_changed(element, event, state),
        }
    }

    /// Server-originated entity change
    pub fn entity_changed(&mut self, owner: OwnerId, change: &EntityChange, state: &mut SurfaceState) {
        match self {
            Controller::Throttle(c) => c.entity_changed(change, state),
            Controller::Switch(c) => c.entity_changed(owner, change, state),
            Controller::Panel(_) => {}
            Controller::Function(c) => c.entity_changed(change, state),
        }
    }

    pub fn selection_changed(&mut self, owner: OwnerId, state: &mut SurfaceState) {
        match self {
            Controller::Throttle(c) => c.selection_changed(state),
            Controller::Function(c) => {
                c.disconnect(state);
                c.connect(owner, state);
            }
            Controller::Switch(_) | Controller::Panel(_) => {}
        }
    }
}

/// Live controllers by owner id
#[derive(Debug, Default)]
pub struct ControllerSet {
    controllers: BTreeMap<OwnerId, Controller>,
    next_id: u32,
}

impl ControllerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an owner id without a controller (scene-level views)
    pub fn reserve(&mut self) -> OwnerId {
        let id = OwnerId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register and connect a controller
    pub fn attach(&mut self, controller: Controller, state: &mut SurfaceState) -> OwnerId {
        let owner = self.reserve();
        let controller = self.controllers.entry(owner).or_insert(controller);
        controller.connect(owner, state);
        owner
    }

    /// Disconnect and drop a controller
    pub fn detach(&mut self, owner: OwnerId, state: &mut SurfaceState) {
        if let Some(mut controller) = self.controllers.remove(&owner) {
            controller.disconnect(owner, state);
        }
    }

    pub fn get_mut(&mut self, owner: OwnerId) -> Option<&mut Controller> {
        self.controllers.get_mut(&owner)
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn owners(&self) -> Vec<OwnerId> {
        self.controllers.keys().copied().collect()
    }

    pub fn entity_changed(&mut self, change: &EntityChange, state: &mut SurfaceState) {
        for (owner, controller) in self.controllers.iter_mut() {
            controller.entity_changed(*owner, change, state);
        }
    }

    pub fn selection_changed(&mut self, state: &mut SurfaceState) {
        for (owner, controller) in self.controllers.iter_mut() {
            controller.selection_changed(*owner, state);
        }
    }
}
