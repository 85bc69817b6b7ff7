//! SurfaceHandle - Public API for the SurfaceActor
//!
//! Fire-and-forget methods for the hot paths (server messages, hardware
//! input, navigation) and async methods with oneshot channels for queries.

use crate::commands::{SurfaceCommand, SurfaceSnapshot};
use crate::display::Frame;
use crate::element::{ElementId, RawInput};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

/// Handle for interacting with the SurfaceActor
///
/// Cheap to clone; every producer task holds its own copy. Sends never
/// block. Once the actor has stopped, sends are dropped and queries return
/// `None`.
#[derive(Clone)]
pub struct SurfaceHandle {
    cmd_tx: mpsc::UnboundedSender<SurfaceCommand>,
}

impl SurfaceHandle {
    pub fn new(cmd_tx: mpsc::UnboundedSender<SurfaceCommand>) -> Self {
        Self { cmd_tx }
    }

    fn send(&self, cmd: SurfaceCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            trace!("Surface actor stopped, dropping command");
        }
    }

    // =========================================================================
    // Hot path methods (fire-and-forget, no await)
    // =========================================================================

    /// Forward a decoded server message
    pub fn server_message(&self, message: Value) {
        self.send(SurfaceCommand::ServerMessage(message));
    }

    /// Forward raw input from a physical control
    pub fn hardware_input(&self, element: ElementId, input: RawInput) {
        self.send(SurfaceCommand::HardwareInput { element, input });
    }

    pub fn goto_scene(&self, index: usize) {
        self.send(SurfaceCommand::GotoScene(index));
    }

    pub fn goto_page(&self, page: usize) {
        self.send(SurfaceCommand::GotoPage(page));
    }

    pub fn shutdown(&self) {
        self.send(SurfaceCommand::Shutdown);
    }

    // =========================================================================
    // Query methods (async with response)
    // =========================================================================

    /// Compose the current display list into a frame
    pub async fn render_frame(&self) -> Option<Frame> {
        let (response_tx, response_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SurfaceCommand::RenderFrame {
                response: response_tx,
            })
            .is_err()
        {
            return None;
        }
        response_rx.await.ok()
    }

    pub async fn snapshot(&self) -> Option<SurfaceSnapshot> {
        let (response_tx, response_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SurfaceCommand::Snapshot {
                response: response_tx,
            })
            .is_err()
        {
            return None;
        }
        response_rx.await.ok()
    }

    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }
}
