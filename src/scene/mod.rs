//! Scenes: named sets of bindings and views, one active at a time
//!
//! Both scenes are paged. A page switch tears down the current page's
//! controllers and views, moves the pager and builds the new page, all inside
//! one actor command so nothing observes a half-built page.

pub mod manager;
pub mod pager;

pub use manager::SceneManager;
pub use pager::Pager;

use crate::config::MAX_GROUPS_PER_PANEL;
use crate::controller::{
    Controller, ControllerSet, FunctionController, PanelController, SurfaceState, SwitchController,
    ThrottleController,
};
use crate::display::{PageBarView, PanelView};
use crate::layout::{SurfaceLayout, COLUMNS, PAD_ROWS};
use crate::registry::OwnerId;
use tracing::debug;

/// Mutable context scenes build into
pub struct SceneContext<'a> {
    pub layout: &'a SurfaceLayout,
    pub controllers: &'a mut ControllerSet,
    pub state: &'a mut SurfaceState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneKind {
    /// Banks of eight throttles
    Throttles,
    /// One track panel per page
    Switches,
}

#[derive(Debug)]
pub struct Scene {
    kind: SceneKind,
    pager: Pager,
    /// Controllers of the current page
    owners: Vec<OwnerId>,
    /// Owner of the scene's own views (page bar, panel)
    view_owner: OwnerId,
}

impl Scene {
    pub fn throttles(loco_count: usize, view_owner: OwnerId) -> Self {
        Self::new(SceneKind::Throttles, loco_count.div_ceil(COLUMNS), view_owner)
    }

    pub fn switches(panel_count: usize, view_owner: OwnerId) -> Self {
        Self::new(SceneKind::Switches, panel_count, view_owner)
    }

    fn new(kind: SceneKind, page_count: usize, view_owner: OwnerId) -> Self {
        Self {
            kind,
            pager: Pager::new(page_count),
            owners: Vec::new(),
            view_owner,
        }
    }

    pub fn kind(&self) -> SceneKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            SceneKind::Throttles => "throttles",
            SceneKind::Switches => "switches",
        }
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn owners(&self) -> &[OwnerId] {
        &self.owners
    }

    pub fn build(&mut self, ctx: &mut SceneContext<'_>) {
        debug!("Building scene '{}'", self.name());
        self.build_page(ctx);
    }

    pub fn destroy(&mut self, ctx: &mut SceneContext<'_>) {
        debug!("Destroying scene '{}'", self.name());
        self.destroy_page(ctx);
    }

    /// Switch to page `page`; out-of-range pages are ignored
    pub fn goto_page(&mut self, page: usize, ctx: &mut SceneContext<'_>) -> bool {
        if !self.pager.is_valid(page) {
            return false;
        }
        self.destroy_page(ctx);
        self.pager.set_page(page);
        self.build_page(ctx);
        true
    }

    /// Record the live selection for the current page
    pub fn remember_selection(&mut self, state: &SurfaceState) {
        if self.kind == SceneKind::Throttles {
            self.pager.remember(state.selection.selected());
        }
    }

    fn attach(&mut self, controller: Controller, ctx: &mut SceneContext<'_>) {
        let owner = ctx.controllers.attach(controller, ctx.state);
        self.owners.push(owner);
    }

    fn build_page(&mut self, ctx: &mut SceneContext<'_>) {
        let page = self.pager.page();
        match self.kind {
            SceneKind::Throttles => self.build_throttles(page, ctx),
            SceneKind::Switches => self.build_switches(page, ctx),
        }

        let selectors: Vec<_> = (0..COLUMNS).map(|c| ctx.layout.pad(0, c)).collect();
        let page_bar = PanelController::pages(&selectors, self.pager.page_count(), page);
        self.attach(Controller::Panel(page_bar), ctx);
        ctx.state.display.add_view(
            self.view_owner,
            Box::new(PageBarView {
                page,
                count: self.pager.page_count(),
            }),
        );
    }

    fn build_throttles(&mut self, page: usize, ctx: &mut SceneContext<'_>) {
        ctx.state.selection.restore(self.pager.selected());

        let columns: Vec<Option<u32>> = {
            let locos = ctx.state.roster.locos();
            (0..COLUMNS)
                .map(|c| locos.get(page * COLUMNS + c).map(|l| l.address()))
                .collect()
        };
        for (column, address) in columns.iter().enumerate() {
            let Some(address) = *address else {
                continue;
            };
            let throttle = ThrottleController::new(
                column,
                address,
                ctx.layout.encoder(column),
                ctx.layout.upper(column),
                ctx.layout.lower(column),
            );
            self.attach(Controller::Throttle(throttle), ctx);
        }

        let pads = std::array::from_fn(|r| {
            std::array::from_fn(|c| ctx.layout.pad(PAD_ROWS - 1 - r, c))
        });
        self.attach(Controller::Function(FunctionController::new(pads, columns)), ctx);
    }

    fn build_switches(&mut self, page: usize, ctx: &mut SceneContext<'_>) {
        let group_count = match ctx.state.roster.panels().get(page) {
            Some(panel) => panel.groups.len().min(MAX_GROUPS_PER_PANEL),
            None => return,
        };
        for group in 0..group_count {
            let pad = ctx
                .layout
                .pad(PAD_ROWS - 1 - group / COLUMNS, group % COLUMNS);
            self.attach(
                Controller::Switch(SwitchController::new(page, group, pad)),
                ctx,
            );
        }
        ctx.state
            .display
            .add_view(self.view_owner, Box::new(PanelView { panel: page }));
    }

    fn destroy_page(&mut self, ctx: &mut SceneContext<'_>) {
        if self.kind == SceneKind::Throttles {
            self.pager.remember(ctx.state.selection.selected());
            ctx.state.selection.clear();
        }
        for owner in self.owners.drain(..) {
            ctx.controllers.detach(owner, ctx.state);
        }
        ctx.state.display.remove_view(self.view_owner);
    }
}
