//! Active scene selection
//!
//! Transitions always run `destroy` on the current scene, switch, then
//! `build` on the next one.

use super::{Scene, SceneContext};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct SceneManager {
    scenes: Vec<Scene>,
    active: Option<usize>,
}

impl SceneManager {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self {
            scenes,
            active: None,
        }
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&Scene> {
        self.active.and_then(|i| self.scenes.get(i))
    }

    fn active_mut(&mut self) -> Option<&mut Scene> {
        self.active.and_then(|i| self.scenes.get_mut(i))
    }

    pub fn goto_scene(&mut self, index: usize, ctx: &mut SceneContext<'_>) -> bool {
        if index >= self.scenes.len() {
            warn!("Scene {} out of range (0..{})", index, self.scenes.len());
            return false;
        }
        if let Some(current) = self.active_mut() {
            current.destroy(ctx);
        }
        self.active = Some(index);
        let scene = &mut self.scenes[index];
        info!("Scene → {}", scene.name());
        scene.build(ctx);
        true
    }

    /// Cycle to the next scene (first scene when none is active)
    pub fn next_scene(&mut self, ctx: &mut SceneContext<'_>) -> bool {
        if self.scenes.is_empty() {
            return false;
        }
        let next = self.active.map_or(0, |i| (i + 1) % self.scenes.len());
        self.goto_scene(next, ctx)
    }

    pub fn goto_page(&mut self, page: usize, ctx: &mut SceneContext<'_>) -> bool {
        match self.active_mut() {
            Some(scene) => scene.goto_page(page, ctx),
            None => false,
        }
    }

    pub fn selection_changed(&mut self, ctx: &mut SceneContext<'_>) {
        if let Some(scene) = self.active_mut() {
            scene.remember_selection(ctx.state);
        }
    }
}
