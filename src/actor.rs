//! SurfaceActor - single owner of all surface state
//!
//! The actor owns the element registry, controllers, scenes, selection,
//! roster and display list, and processes [`SurfaceCommand`]s one at a time.
//! This serializes server pushes, hardware input, navigation and frame
//! composition without locks.
//!
//! The actor performs no I/O. Server requests and LED feedback produced by a
//! command are pushed to unbounded channels after the command completes and
//! are drained by the transport and MIDI output tasks.
//!
//! ```text
//!  transport ──ServerMessage──┐
//!  MIDI in ───HardwareInput───┼──► command_rx ──► SurfaceActor ──► request_tx  ──► transport
//!  refresh ───RenderFrame─────┘                                 └─► feedback_tx ──► MIDI out
//! ```

use crate::actor_handle::SurfaceHandle;
use crate::commands::{BoundElement, SurfaceCommand, SurfaceSnapshot};
use crate::controller::{
    Controller, ControllerSet, Followup, PanelController, PanelTarget, SurfaceState,
};
use crate::display::{DrawContext, Frame};
use crate::element::{ElementId, Feedback, Palette, RawInput};
use crate::entity::Roster;
use crate::layout::SurfaceLayout;
use crate::protocol::{ServerEvent, ServerRequest};
use crate::registry::ElementRegistry;
use crate::scene::{Scene, SceneContext, SceneManager};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};


/// Receivers for what the actor produces
pub struct SurfaceOutputs {
    pub requests: mpsc::UnboundedReceiver<ServerRequest>,
    pub feedback: mpsc::UnboundedReceiver<Feedback>,
}

pub struct SurfaceActor {
    layout: Arc<SurfaceLayout>,
    state: SurfaceState,
    controllers: ControllerSet,
    scenes: SceneManager,
    frame: Frame,
    command_rx: mpsc::UnboundedReceiver<SurfaceCommand>,
    request_tx: mpsc::UnboundedSender<ServerRequest>,
    feedback_tx: mpsc::UnboundedSender<Feedback>,
    command_count: u64,
}

impl SurfaceActor {
    /// Create the actor with its handle and output receivers
    ///
    /// Nothing runs until [`SurfaceActor::spawn`].
    pub fn new(
        layout: Arc<SurfaceLayout>,
        roster: Roster,
        palette: Palette,
        frame_size: (usize, usize),
    ) -> (Self, SurfaceHandle, SurfaceOutputs) {
        let (cmd_tx, command_rx) = mpsc::unbounded_channel();
        let (request_tx, requests) = mpsc::unbounded_channel();
        let (feedback_tx, feedback) = mpsc::unbounded_channel();

        let mut controllers = ControllerSet::new();
        let scenes = SceneManager::new(vec![
            Scene::throttles(roster.locos().len(), controllers.reserve()),
            Scene::switches(roster.panels().len(), controllers.reserve()),
        ]);
        let registry = ElementRegistry::new(layout.elements(), palette);

        let actor = Self {
            layout,
            state: SurfaceState::new(registry, roster),
            controllers,
            scenes,
            frame: Frame::new(frame_size.0, frame_size.1),
            command_rx,
            request_tx,
            feedback_tx,
            command_count: 0,
        };
        (
            actor,
            SurfaceHandle::new(cmd_tx),
            SurfaceOutputs { requests, feedback },
        )
    }

    /// Spawn the run loop as a tokio task
    pub fn spawn(self) -> JoinHandle<()> {
        info!("SurfaceActor spawned");
        tokio::spawn(self.run())
    }

    /// Main run loop: startup, then commands in arrival order until shutdown
    async fn run(mut self) {
        self.startup();
        self.flush();

        while let Some(cmd) = self.command_rx.recv().await {
            trace!(?cmd, "Processing command");
            self.command_count += 1;
            if !self.handle(cmd) {
                info!("SurfaceActor received shutdown command");
                break;
            }
            self.flush();
        }

        info!(
            command_count = self.command_count,
            "SurfaceActor run loop terminated"
        );
    }

    /// Subscribe to every entity, paint the surface and enter the first scene
    fn startup(&mut self) {
        let addresses: Vec<u32> = self.state.roster.locos().iter().map(|l| l.address()).collect();
        for address in addresses {
            self.state.request(ServerRequest::AcquireThrottle { address });
        }
        for name in self.state.roster.referenced_switches() {
            self.state.request(ServerRequest::SubscribeTurnout { name });
        }

        self.state.registry.render_all();

        let scene_button = PanelController::new(
            vec![(self.layout.scene_button(), PanelTarget::NextScene)],
            None,
        );
        self.controllers
            .attach(Controller::Panel(scene_button), &mut self.state);

        self.with_scenes(|scenes, ctx| scenes.goto_scene(0, ctx));
        self.apply_followups();
    }

    /// Process one command; returns `false` on shutdown
    fn handle(&mut self, cmd: SurfaceCommand) -> bool {
        match cmd {
            SurfaceCommand::ServerMessage(message) => self.handle_server_message(&message),
            SurfaceCommand::HardwareInput { element, input } => {
                self.handle_hardware_input(element, input)
            }
            SurfaceCommand::GotoScene(index) => {
                self.with_scenes(|scenes, ctx| scenes.goto_scene(index, ctx));
            }
            SurfaceCommand::GotoPage(page) => {
                self.with_scenes(|scenes, ctx| scenes.goto_page(page, ctx));
            }
            SurfaceCommand::RenderFrame { response } => {
                let _ = response.send(self.compose());
            }
            SurfaceCommand::Snapshot { response } => {
                let _ = response.send(self.snapshot());
            }
            SurfaceCommand::Shutdown => return false,
        }
        self.apply_followups();
        true
    }

    fn with_scenes<R>(&mut self, f: impl FnOnce(&mut SceneManager, &mut SceneContext<'_>) -> R) -> R {
        let mut ctx = SceneContext {
            layout: &self.layout,
            controllers: &mut self.controllers,
            state: &mut self.state,
        };
        f(&mut self.scenes, &mut ctx)
    }

    fn handle_server_message(&mut self, message: &Value) {
        let event = match ServerEvent::decode(message) {
            Ok(event) => event,
            Err(e) => {
                warn!("Dropping server message: {}", e);
                return;
            }
        };

        match event {
            ServerEvent::Hello { heartbeat_ms } => {
                info!(heartbeat_ms, "Server hello");
            }
            ServerEvent::Throttle { .. } | ServerEvent::Turnout { .. } => {
                let changes = self.state.roster.apply(&event);
                for change in &changes {
                    trace!(?change, "Entity changed");
                    self.controllers.entity_changed(change, &mut self.state);
                }
            }
            ServerEvent::Pong => trace!("Pong"),
            ServerEvent::Error { code, message } => {
                warn!(code, "Server error: {}", message);
            }
            ServerEvent::Ignored(kind) => trace!("Ignoring '{}' message", kind),
        }
    }

    fn handle_hardware_input(&mut self, element: ElementId, input: RawInput) {
        let Some(dispatch) = self.state.registry.handle_input(element, input) else {
            return;
        };
        match self.controllers.get_mut(dispatch.owner) {
            Some(controller) => controller.element_changed(
                dispatch.owner,
                dispatch.element,
                dispatch.event,
                &mut self.state,
            ),
            None => warn!(
                "Element {} is bound to {} which has no controller",
                element, dispatch.owner
            ),
        }
    }

    /// Apply navigation and selection effects queued by controllers
    fn apply_followups(&mut self) {
        loop {
            let followups = self.state.take_followups();
            if followups.is_empty() {
                break;
            }
            for followup in followups {
                debug!(?followup, "Applying followup");
                match followup {
                    Followup::GotoPage(page) => {
                        self.with_scenes(|scenes, ctx| scenes.goto_page(page, ctx));
                    }
                    Followup::NextScene => {
                        self.with_scenes(|scenes, ctx| scenes.next_scene(ctx));
                    }
                    Followup::SelectionChanged => {
                        self.controllers.selection_changed(&mut self.state);
                        self.with_scenes(|scenes, ctx| scenes.selection_changed(ctx));
                    }
                }
            }
        }
    }

    fn compose(&mut self) -> Frame {
        let ctx = DrawContext {
            palette: self.state.registry.palette(),
            roster: &self.state.roster,
            selection: self.state.selection.selected(),
        };
        self.state.display.compose(&mut self.frame, &ctx);
        self.frame.clone()
    }

    fn snapshot(&self) -> SurfaceSnapshot {
        let registry = &self.state.registry;
        let bindings = registry
            .bound()
            .into_iter()
            .filter_map(|(id, owner)| {
                let element = registry.element(id)?;
                Some(BoundElement {
                    name: element.name().to_string(),
                    owner,
                    state: element.state(),
                })
            })
            .collect();
        let scene = self.scenes.active();

        SurfaceSnapshot {
            scene: scene.map(Scene::name),
            page: scene.map_or(0, |s| s.pager().page()),
            page_count: scene.map_or(0, |s| s.pager().page_count()),
            selection: self.state.selection.selected(),
            bindings,
            views: self.state.display.len(),
            controllers: self.controllers.len(),
        }
    }

    /// Hand queued requests and feedback to the I/O tasks
    fn flush(&mut self) {
        for request in self.state.take_requests() {
            if self.request_tx.send(request).is_err() {
                debug!("Request channel closed");
                break;
            }
        }
        for feedback in self.state.registry.drain_feedback() {
            if self.feedback_tx.send(feedback).is_err() {
                debug!("Feedback channel closed");
                break;
            }
        }
    }
}
