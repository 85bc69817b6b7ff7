//! Configuration management for trackdeck
//!
//! Handles loading, parsing and validation of the YAML configuration file.

use crate::element::{ColorName, PaletteEntry};
use crate::layout::COLUMNS;
use crate::switch_group::GroupKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::fs;

/// Groups that fit on pad rows 1-7
pub const MAX_GROUPS_PER_PANEL: usize = 56;

/// One page selector pad per column
pub const MAX_PAGES: usize = COLUMNS;

/// Locos reachable through the page selectors
pub const MAX_LOCOS: usize = MAX_PAGES * COLUMNS;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub jmri: JmriConfig,
    pub midi: MidiConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    /// Palette entries replacing the built-in surface colors
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub palette: HashMap<ColorName, PaletteEntry>,
    #[serde(default)]
    pub locos: Vec<LocoConfig>,
    #[serde(default)]
    pub panels: Vec<PanelConfig>,
}

/// JMRI JSON server connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JmriConfig {
    #[serde(default = "default_jmri_host")]
    pub host: String,
    #[serde(default = "default_jmri_port")]
    pub port: u16,
    #[serde(default = "default_jmri_path")]
    pub path: String,
}

impl Default for JmriConfig {
    fn default() -> Self {
        Self {
            host: default_jmri_host(),
            port: default_jmri_port(),
            path: default_jmri_path(),
        }
    }
}

impl JmriConfig {
    pub fn url(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, self.path)
    }
}

/// MIDI port configuration (case-insensitive substring match)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MidiConfig {
    pub input_port: String,
    pub output_port: String,
}

/// Pixel display configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_height")]
    pub height: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            width: default_width(),
            height: default_height(),
        }
    }
}

/// MIDI addresses of the physical controls
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LayoutConfig {
    /// MIDI channel (0-15) used by every control
    #[serde(default)]
    pub channel: u8,
    #[serde(default = "default_encoder_cc")]
    pub encoder_cc: u8,
    #[serde(default)]
    pub encoder_touch_note: u8,
    #[serde(default = "default_upper_cc")]
    pub upper_cc: u8,
    #[serde(default = "default_lower_cc")]
    pub lower_cc: u8,
    #[serde(default = "default_pad_note")]
    pub pad_note: u8,
    #[serde(default = "default_scene_cc")]
    pub scene_cc: u8,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            encoder_cc: default_encoder_cc(),
            encoder_touch_note: 0,
            upper_cc: default_upper_cc(),
            lower_cc: default_lower_cc(),
            pad_note: default_pad_note(),
            scene_cc: default_scene_cc(),
        }
    }
}

/// One locomotive on the throttle pages
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocoConfig {
    pub address: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_speed_steps")]
    pub speed_steps: u16,
    /// Encoder step override; defaults to one speed step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<f32>,
    #[serde(default = "default_functions")]
    pub functions: usize,
    /// Ranked function indices shown when no throttle is selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorites: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub momentary: Vec<usize>,
}

/// A track panel: one switch-scene page
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PanelConfig {
    pub name: String,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupConfig {
    pub kind: GroupKind,
    /// JMRI system names, in the order the group kind expects
    pub switches: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.midi.input_port.is_empty() {
            anyhow::bail!("MIDI input_port cannot be empty");
        }
        if self.midi.output_port.is_empty() {
            anyhow::bail!("MIDI output_port cannot be empty");
        }
        if self.jmri.host.is_empty() {
            anyhow::bail!("JMRI host cannot be empty");
        }
        if !self.jmri.path.starts_with('/') {
            anyhow::bail!("JMRI path '{}' must start with '/'", self.jmri.path);
        }

        if self.display.fps == 0 {
            anyhow::bail!("Display fps must be at least 1");
        }
        if self.display.width == 0 || self.display.height == 0 {
            anyhow::bail!(
                "Display size {}x{} is empty",
                self.display.width,
                self.display.height
            );
        }

        self.validate_layout()?;

        if self.locos.len() > MAX_LOCOS {
            anyhow::bail!(
                "{} locos configured (at most {} fit on {} throttle pages)",
                self.locos.len(),
                MAX_LOCOS,
                MAX_PAGES
            );
        }
        if self.panels.len() > MAX_PAGES {
            anyhow::bail!(
                "{} panels configured (at most {} fit on the page pads)",
                self.panels.len(),
                MAX_PAGES
            );
        }

        let mut addresses = HashSet::new();
        for loco in &self.locos {
            if !addresses.insert(loco.address) {
                anyhow::bail!("Duplicate loco address {}", loco.address);
            }
            if loco.speed_steps == 0 {
                anyhow::bail!("Loco {} speed_steps must be at least 1", loco.address);
            }
            if let Some(delta) = loco.delta {
                if !(delta > 0.0 && delta <= 1.0) {
                    anyhow::bail!(
                        "Loco {} delta {} is out of range (must be in (0, 1])",
                        loco.address,
                        delta
                    );
                }
            }
        }

        for (panel_idx, panel) in self.panels.iter().enumerate() {
            if panel.name.is_empty() {
                anyhow::bail!("Panel {} name cannot be empty", panel_idx);
            }
            if panel.groups.len() > MAX_GROUPS_PER_PANEL {
                anyhow::bail!(
                    "Panel '{}' has {} groups (at most {} fit on the pads)",
                    panel.name,
                    panel.groups.len(),
                    MAX_GROUPS_PER_PANEL
                );
            }
            for (group_idx, group) in panel.groups.iter().enumerate() {
                if group.switches.len() != group.kind.arity() {
                    anyhow::bail!(
                        "Group {} in panel '{}' is {:?} and needs {} switches, got {}",
                        group_idx,
                        panel.name,
                        group.kind,
                        group.kind.arity(),
                        group.switches.len()
                    );
                }
                if group.switches.iter().any(String::is_empty) {
                    anyhow::bail!(
                        "Group {} in panel '{}' has an empty switch name",
                        group_idx,
                        panel.name
                    );
                }
            }
        }

        Ok(())
    }

    /// Every control range must stay inside 7-bit MIDI and own its addresses
    fn validate_layout(&self) -> Result<()> {
        let layout = &self.layout;
        if layout.channel > 15 {
            anyhow::bail!("Layout channel {} is invalid (must be 0-15)", layout.channel);
        }
        let notes = [
            ("encoder_touch_note", layout.encoder_touch_note, 8u16),
            ("pad_note", layout.pad_note, 64),
        ];
        let ccs = [
            ("encoder_cc", layout.encoder_cc, 8u16),
            ("upper_cc", layout.upper_cc, 8),
            ("lower_cc", layout.lower_cc, 8),
            ("scene_cc", layout.scene_cc, 1),
        ];
        for (name, base, count) in notes.iter().chain(ccs.iter()) {
            if u16::from(*base) + count > 128 {
                anyhow::bail!(
                    "Layout {} {} leaves no room for {} controls",
                    name,
                    base,
                    count
                );
            }
        }
        check_overlaps("note", &notes)?;
        check_overlaps("CC", &ccs)?;
        Ok(())
    }
}

fn check_overlaps(what: &str, ranges: &[(&str, u8, u16)]) -> Result<()> {
    for (i, (name, base, count)) in ranges.iter().enumerate() {
        let start = u16::from(*base);
        for (other, other_base, other_count) in &ranges[i + 1..] {
            let other_start = u16::from(*other_base);
            if start < other_start + other_count && other_start < start + count {
                anyhow::bail!(
                    "Layout {} {} overlaps {} {} ({} ranges must not share addresses)",
                    name,
                    base,
                    other,
                    other_base,
                    what
                );
            }
        }
    }
    Ok(())
}

fn default_jmri_host() -> String { "localhost".to_string() }
fn default_jmri_port() -> u16 { 12080 }
fn default_jmri_path() -> String { "/json/".to_string() }
fn default_fps() -> u32 { 30 }
fn default_width() -> usize { 960 }
fn default_height() -> usize { 160 }
fn default_encoder_cc() -> u8 { 71 }
fn default_upper_cc() -> u8 { 102 }
fn default_lower_cc() -> u8 { 20 }
fn default_pad_note() -> u8 { 36 }
fn default_scene_cc() -> u8 { 3 }
fn default_speed_steps() -> u16 { 126 }
fn default_functions() -> usize { 29 }
