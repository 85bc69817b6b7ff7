//! Commands for the surface actor
//!
//! Every producer (transport, MIDI input, display refresh, control API)
//! talks to the actor through these commands on one channel, so all state
//! mutation is serialized.
//!
//! # Hot path commands (fire-and-forget)
//! - `ServerMessage`: decoded JSON pushed by the server
//! - `HardwareInput`: raw input already resolved to an element
//!
//! # Request-response commands
//! - `RenderFrame`: compose the display list into a frame
//! - `Snapshot`: bindings and navigation state for diagnostics and tests

use crate::display::Frame;
use crate::element::{ElementId, ElementState, RawInput};
use crate::registry::OwnerId;
use serde_json::Value;
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum SurfaceCommand {
    // -------------------------------------------------------------------------
    // Hot path commands (no response)
    // -------------------------------------------------------------------------
    /// Message from the automation server
    ServerMessage(Value),

    /// Input from a physical control
    HardwareInput { element: ElementId, input: RawInput },

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------
    GotoScene(usize),
    GotoPage(usize),

    // -------------------------------------------------------------------------
    // Request-response commands
    // -------------------------------------------------------------------------
    RenderFrame {
        response: oneshot::Sender<Frame>,
    },
    Snapshot {
        response: oneshot::Sender<SurfaceSnapshot>,
    },

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------
    Shutdown,
}

/// One bound element as seen in a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct BoundElement {
    pub name: String,
    pub owner: OwnerId,
    pub state: ElementState,
}

/// Point-in-time view of the surface
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSnapshot {
    pub scene: Option<&'static str>,
    pub page: usize,
    pub page_count: usize,
    pub selection: Option<usize>,
    /// Bound elements in element order
    pub bindings: Vec<BoundElement>,
    pub views: usize,
    pub controllers: usize,
}

impl SurfaceSnapshot {
    pub fn binding(&self, name: &str) -> Option<&BoundElement> {
        self.bindings.iter().find(|b| b.name == name)
    }

    pub fn bound_names(&self) -> Vec<&str> {
        self.bindings.iter().map(|b| b.name.as_str()).collect()
    }
}
