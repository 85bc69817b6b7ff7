//! Feedback rendering: element state to LED color
//!
//! Two-color elements show `on` or `off` color from the surface palette;
//! single-color buttons show a binary intensity; encoders have no LED.

use super::{ElementConfig, ElementKind, ElementState};
use crate::midi::ControlAddress;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Full intensity for single-color buttons
pub const LED_ON: u8 = 127;
/// Dimmed intensity for single-color buttons
pub const LED_OFF: u8 = 0;

/// Logical color names shared by pads, buttons and the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorName {
    Black,
    White,
    Gray,
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    /// Distinct color for states that disagree with every known position
    Warning,
}

impl ColorName {
    pub const ALL: [ColorName; 10] = [
        ColorName::Black,
        ColorName::White,
        ColorName::Gray,
        ColorName::Red,
        ColorName::Orange,
        ColorName::Yellow,
        ColorName::Green,
        ColorName::Blue,
        ColorName::Purple,
        ColorName::Warning,
    ];
}

impl FromStr for ColorName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColorName::ALL
            .iter()
            .copied()
            .find(|c| c.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown color '{}'", s))
    }
}

impl fmt::Display for ColorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColorName::Black => "black",
            ColorName::White => "white",
            ColorName::Gray => "gray",
            ColorName::Red => "red",
            ColorName::Orange => "orange",
            ColorName::Yellow => "yellow",
            ColorName::Green => "green",
            ColorName::Blue => "blue",
            ColorName::Purple => "purple",
            ColorName::Warning => "warning",
        };
        f.write_str(s)
    }
}

/// Brightness variant of a palette color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Shade {
    #[default]
    Full,
    Dark,
    Darkest,
}

impl Shade {
    fn index(self) -> usize {
        match self {
            Shade::Full => 0,
            Shade::Dark => 1,
            Shade::Darkest => 2,
        }
    }
}

/// A color plus shade, written as `"red"` or `"red:dark"` in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColorSpec {
    pub color: ColorName,
    pub shade: Shade,
}

impl ColorSpec {
    pub const fn new(color: ColorName, shade: Shade) -> Self {
        Self { color, shade }
    }

    pub fn dark(self) -> Self {
        Self::new(self.color, Shade::Dark)
    }

    pub fn darkest(self) -> Self {
        Self::new(self.color, Shade::Darkest)
    }
}

impl From<ColorName> for ColorSpec {
    fn from(color: ColorName) -> Self {
        Self::new(color, Shade::Full)
    }
}

impl TryFrom<String> for ColorSpec {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let (name, shade) = match value.split_once(':') {
            Some((name, "dark")) => (name, Shade::Dark),
            Some((name, "darkest")) => (name, Shade::Darkest),
            Some((_, other)) => return Err(format!("unknown shade '{}'", other)),
            None => (value.as_str(), Shade::Full),
        };
        Ok(Self::new(name.parse()?, shade))
    }
}

impl From<ColorSpec> for String {
    fn from(spec: ColorSpec) -> Self {
        match spec.shade {
            Shade::Full => spec.color.to_string(),
            Shade::Dark => format!("{}:dark", spec.color),
            Shade::Darkest => format!("{}:darkest", spec.color),
        }
    }
}

/// Palette entry: surface LED indices per shade plus the display RGB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub indices: [u8; 3],
    pub rgb: [u8; 3],
}

/// Shared color palette for LEDs and the pixel display
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    entries: HashMap<ColorName, PaletteEntry>,
}

impl Default for Palette {
    fn default() -> Self {
        let entries = [
            (ColorName::Black, [0, 0, 0], [0, 0, 0]),
            (ColorName::White, [122, 123, 124], [255, 255, 255]),
            (ColorName::Gray, [123, 124, 124], [128, 128, 128]),
            (ColorName::Red, [127, 1, 2], [255, 0, 0]),
            (ColorName::Orange, [3, 4, 5], [255, 128, 0]),
            (ColorName::Yellow, [8, 9, 10], [255, 220, 0]),
            (ColorName::Green, [126, 21, 22], [0, 200, 0]),
            (ColorName::Blue, [125, 45, 46], [0, 80, 255]),
            (ColorName::Purple, [49, 50, 51], [140, 0, 200]),
            (ColorName::Warning, [57, 58, 59], [255, 0, 160]),
        ]
        .into_iter()
        .map(|(name, indices, rgb)| (name, PaletteEntry { indices, rgb }))
        .collect();
        Self { entries }
    }
}

impl Palette {
    /// Default palette with configured entries replaced
    pub fn with_overrides(overrides: &HashMap<ColorName, PaletteEntry>) -> Self {
        let mut palette = Self::default();
        palette
            .entries
            .extend(overrides.iter().map(|(k, v)| (*k, *v)));
        palette
    }

    fn entry(&self, color: ColorName) -> PaletteEntry {
        self.entries.get(&color).copied().unwrap_or(PaletteEntry {
            indices: [0; 3],
            rgb: [0; 3],
        })
    }

    /// Surface palette index for a color
    pub fn index(&self, spec: ColorSpec) -> u8 {
        self.entry(spec.color).indices[spec.shade.index()]
    }

    /// Display RGB for a color; darker shades scale the base color down
    pub fn rgb(&self, spec: ColorSpec) -> [u8; 3] {
        let [r, g, b] = self.entry(spec.color).rgb;
        let div = match spec.shade {
            Shade::Full => 1,
            Shade::Dark => 2,
            Shade::Darkest => 4,
        };
        [r / div, g / div, b / div]
    }
}

/// One LED update for the hardware output task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback {
    pub address: ControlAddress,
    pub value: u8,
}

impl Feedback {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.address.message(self.value).encode()
    }
}

/// Render rule: the LED value an element shows for a state and configuration
///
/// Returns `None` for elements without an LED.
pub fn render(
    kind: ElementKind,
    state: &ElementState,
    config: &ElementConfig,
    palette: &Palette,
) -> Option<u8> {
    match kind {
        ElementKind::Encoder => None,
        ElementKind::ColorPad | ElementKind::ColorButton => {
            let spec = if state.as_bool() {
                config.on_color
            } else {
                config.off_color
            };
            Some(palette.index(spec))
        }
        ElementKind::Button => Some(if state.as_bool() { LED_ON } else { LED_OFF }),
    }
}
