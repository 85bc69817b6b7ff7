//! Pixel display: views, the render list and frame composition
//!
//! Controllers and scenes register [`View`]s in the [`DisplayList`] while they
//! are bound and remove them when unbound. The refresh driver asks the actor
//! for a composed [`Frame`] at a fixed cadence and hands it to a
//! [`FrameSink`].

use crate::element::{ColorName, ColorSpec, Palette};
use crate::entity::Roster;
use crate::layout::COLUMNS;
use crate::registry::OwnerId;
use anyhow::Result;
use tracing::trace;

const PAGE_BAR_HEIGHT: usize = 8;
const DIRECTION_HEIGHT: usize = 8;
const OUTLINE: usize = 2;

/// RGB frame buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<[u8; 3]>,
}

impl Frame {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0; 3]; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[[u8; 3]] {
        &self.pixels
    }

    pub fn clear(&mut self) {
        self.pixels.fill([0; 3]);
    }

    /// Fill a rectangle, clipped to the frame
    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, rgb: [u8; 3]) {
        let x_end = (x + w).min(self.width);
        let y_end = (y + h).min(self.height);
        for row in y.min(y_end)..y_end {
            let start = row * self.width;
            self.pixels[start + x.min(x_end)..start + x_end].fill(rgb);
        }
    }

    /// Draw a rectangle outline `thickness` pixels wide
    pub fn outline_rect(&mut self, x: usize, y: usize, w: usize, h: usize, thickness: usize, rgb: [u8; 3]) {
        self.fill_rect(x, y, w, thickness, rgb);
        self.fill_rect(x, (y + h).saturating_sub(thickness), w, thickness, rgb);
        self.fill_rect(x, y, thickness, h, rgb);
        self.fill_rect((x + w).saturating_sub(thickness), y, thickness, h, rgb);
    }

    pub fn get(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    fn column_width(&self) -> usize {
        self.width / COLUMNS
    }
}

/// Shared read-only state views draw from
pub struct DrawContext<'a> {
    pub palette: &'a Palette,
    pub roster: &'a Roster,
    pub selection: Option<usize>,
}

impl DrawContext<'_> {
    fn rgb(&self, spec: impl Into<ColorSpec>) -> [u8; 3] {
        self.palette.rgb(spec.into())
    }
}

/// Something that draws itself into a frame
pub trait View: Send {
    fn draw(&self, frame: &mut Frame, ctx: &DrawContext<'_>);
}

/// One throttle column: speed bar, direction strip, selection outline
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleView {
    pub column: usize,
    pub address: u32,
}

impl View for ThrottleView {
    fn draw(&self, frame: &mut Frame, ctx: &DrawContext<'_>) {
        let Some(loco) = ctx.roster.loco(self.address) else {
            return;
        };
        let w = frame.column_width();
        let x = self.column * w;
        let area = frame.height().saturating_sub(PAGE_BAR_HEIGHT);

        let direction = if loco.is_forward() {
            ColorName::Green
        } else {
            ColorName::Orange
        };
        frame.fill_rect(x, 0, w, DIRECTION_HEIGHT, ctx.rgb(direction));

        let color = loco
            .color
            .as_text()
            .and_then(|c| c.parse::<ColorName>().ok())
            .unwrap_or(ColorName::White);
        let track = area.saturating_sub(DIRECTION_HEIGHT);
        let bar = (loco.speed_value().clamp(0.0, 1.0) * track as f32).round() as usize;
        frame.fill_rect(
            x + OUTLINE * 2,
            area - bar,
            w.saturating_sub(OUTLINE * 4),
            bar,
            ctx.rgb(color),
        );

        if ctx.selection == Some(self.column) {
            frame.outline_rect(x, 0, w, area, OUTLINE, ctx.rgb(ColorName::White));
        }
    }
}

/// One track panel: a cell per switch group in pad order
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub panel: usize,
}

impl View for PanelView {
    fn draw(&self, frame: &mut Frame, ctx: &DrawContext<'_>) {
        let Some(panel) = ctx.roster.panels().get(self.panel) else {
            return;
        };
        let w = frame.column_width();
        let rows = crate::layout::PAD_ROWS - 1;
        let h = frame.height().saturating_sub(PAGE_BAR_HEIGHT) / rows;

        for (idx, group) in panel.groups.iter().enumerate().take(rows * COLUMNS) {
            let (row, col) = (idx / COLUMNS, idx % COLUMNS);
            let color = match ctx.roster.group_states(group) {
                Some(states) => ColorSpec::from(group.color(group.current_position(&states))),
                None => ColorSpec::from(ColorName::Gray).darkest(),
            };
            frame.fill_rect(
                col * w + OUTLINE,
                row * h + OUTLINE,
                w.saturating_sub(OUTLINE * 2),
                h.saturating_sub(OUTLINE * 2),
                ctx.rgb(color),
            );
        }
    }
}

/// Page indicator strip along the bottom edge
#[derive(Debug, Clone, PartialEq)]
pub struct PageBarView {
    pub page: usize,
    pub count: usize,
}

impl View for PageBarView {
    fn draw(&self, frame: &mut Frame, ctx: &DrawContext<'_>) {
        if self.count == 0 {
            return;
        }
        let y = frame.height().saturating_sub(PAGE_BAR_HEIGHT);
        let w = frame.width() / self.count;
        for page in 0..self.count {
            let color = if page == self.page {
                ColorSpec::from(ColorName::White)
            } else {
                ColorSpec::from(ColorName::Gray).dark()
            };
            frame.fill_rect(page * w + 1, y + 1, w.saturating_sub(2), PAGE_BAR_HEIGHT - 2, ctx.rgb(color));
        }
    }
}

/// Views currently on screen, in insertion order, keyed by owner
#[derive(Default)]
pub struct DisplayList {
    views: Vec<(OwnerId, Box<dyn View>)>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_view(&mut self, owner: OwnerId, view: Box<dyn View>) {
        trace!("Adding view for {}", owner);
        self.views.push((owner, view));
    }

    /// Remove every view of `owner`; returns how many were removed
    pub fn remove_view(&mut self, owner: OwnerId) -> usize {
        let before = self.views.len();
        self.views.retain(|(o, _)| *o != owner);
        before - self.views.len()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Owners with at least one view, in drawing order
    pub fn owners(&self) -> Vec<OwnerId> {
        let mut owners: Vec<OwnerId> = Vec::new();
        for (owner, _) in &self.views {
            if !owners.contains(owner) {
                owners.push(*owner);
            }
        }
        owners
    }

    pub fn compose(&self, frame: &mut Frame, ctx: &DrawContext<'_>) {
        frame.clear();
        for (_, view) in &self.views {
            view.draw(frame, ctx);
        }
    }
}

/// Destination of composed frames
pub trait FrameSink: Send {
    fn present(&mut self, frame: &Frame) -> Result<()>;
}

/// Sink that only counts frames; pushing pixels to the device is not done here
#[derive(Debug, Default)]
pub struct LoggingFrameSink {
    frames: u64,
    last: Option<u64>,
}

impl LoggingFrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameSink for LoggingFrameSink {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.frames += 1;
        let lit = frame.pixels().iter().filter(|p| **p != [0; 3]).count() as u64;
        if self.last != Some(lit) {
            trace!(frame = self.frames, lit, "Display content changed");
            self.last = Some(lit);
        }
        Ok(())
    }
}
