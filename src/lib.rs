//! Trackdeck - control-surface binding and scene sync for JMRI
//!
//! Physical controls are typed [`element::Element`]s held by the
//! [`registry::ElementRegistry`]. Controllers bind them to locomotives and
//! switch groups, scenes decide which controllers exist, and the
//! [`actor::SurfaceActor`] serializes server pushes, hardware input and
//! frame refreshes over all of it.

pub mod actor;
pub mod actor_handle;
pub mod attribute;
pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod display;
pub mod element;
pub mod entity;
pub mod hardware;
pub mod layout;
pub mod midi;
pub mod protocol;
pub mod registry;
pub mod scene;
pub mod selection;
pub mod switch_group;
pub mod transport;

pub use actor::{SurfaceActor, SurfaceOutputs};
pub use actor_handle::SurfaceHandle;
pub use config::AppConfig;
