//! Trigger pads mapped to navigation targets

use super::{Followup, SurfaceState};
use crate::element::{ColorName, ColorSpec, ElementConfig, ElementId, ElementState, PadMode};
use crate::registry::ElementEvent;
use crate::registry::OwnerId;
use tracing::debug;

/// Where a panel pad leads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelTarget {
    GotoPage(usize),
    NextScene,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelController {
    targets: Vec<(ElementId, PanelTarget)>,
    /// Page that is lit as current
    current: Option<usize>,
}

impl PanelController {
    pub fn new(targets: Vec<(ElementId, PanelTarget)>, current: Option<usize>) -> Self {
        Self { targets, current }
    }

    /// Page selector: one pad per page, the current page lit
    pub fn pages(pads: &[ElementId], page_count: usize, current: usize) -> Self {
        let targets = pads
            .iter()
            .take(page_count)
            .enumerate()
            .map(|(page, pad)| (*pad, PanelTarget::GotoPage(page)))
            .collect();
        Self::new(targets, Some(current))
    }

    pub fn targets(&self) -> &[(ElementId, PanelTarget)] {
        &self.targets
    }

    pub fn connect(&mut self, owner: OwnerId, state: &mut SurfaceState) {
        let config = ElementConfig::colored(
            PadMode::Trigger,
            ColorName::White,
            ColorSpec::from(ColorName::Gray).dark(),
        );
        for (pad, target) in &self.targets {
            let lit = match target {
                PanelTarget::GotoPage(page) => self.current == Some(*page),
                PanelTarget::NextScene => true,
            };
            state
                .registry
                .connect(*pad, owner, config, ElementState::Bool(lit));
        }
    }

    pub fn disconnect(&mut self, state: &mut SurfaceState) {
        for (pad, _) in &self.targets {
            state.registry.disconnect(*pad);
        }
    }

    pub fn element_changed(&mut self, element: ElementId, event: ElementEvent, state: &mut SurfaceState) {
        if event != ElementEvent::Triggered {
            return;
        }
        let Some((_, target)) = self.targets.iter().find(|(pad, _)| *pad == element) else {
            return;
        };
        debug!("Panel pad {} → {:?}", element, target);
        state.follow(match *target {
            PanelTarget::GotoPage(page) => Followup::GotoPage(page),
            PanelTarget::NextScene => Followup::NextScene,
        });
    }
}
