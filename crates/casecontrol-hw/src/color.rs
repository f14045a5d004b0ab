//! RGB color type, named aliases and parsing.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 24-bit RGB color as sent to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Named color aliases (the classic AWT palette).
const NAMED_COLORS: &[(&str, Rgb)] = &[
    ("black", Rgb::new(0, 0, 0)),
    ("blue", Rgb::new(0, 0, 255)),
    ("cyan", Rgb::new(0, 255, 255)),
    ("dark_gray", Rgb::new(64, 64, 64)),
    ("darkgray", Rgb::new(64, 64, 64)),
    ("gray", Rgb::new(128, 128, 128)),
    ("green", Rgb::new(0, 255, 0)),
    ("light_gray", Rgb::new(192, 192, 192)),
    ("lightgray", Rgb::new(192, 192, 192)),
    ("magenta", Rgb::new(255, 0, 255)),
    ("orange", Rgb::new(255, 200, 0)),
    ("pink", Rgb::new(255, 175, 175)),
    ("red", Rgb::new(255, 0, 0)),
    ("white", Rgb::new(255, 255, 255)),
    ("yellow", Rgb::new(255, 255, 0)),
];

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    /// Creates a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Returns the color as wire bytes in RGB order.
    pub fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Looks up a named color alias (case-insensitive).
    pub fn named(name: &str) -> Option<Rgb> {
        let name = name.to_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(alias, _)| *alias == name)
            .map(|(_, color)| *color)
    }

    /// Returns the list of accepted color names.
    pub fn names() -> impl Iterator<Item = &'static str> {
        NAMED_COLORS.iter().map(|(alias, _)| *alias)
    }

    /// Linear interpolation from `self` towards `next`, `step` of `steps` of
    /// the way there. Each channel is truncated, never rounded.
    pub fn interpolate(self, next: Rgb, step: u32, steps: u32) -> Rgb {
        if steps == 0 {
            return next;
        }
        let step = step.min(steps);
        let channel = |last: u8, next: u8| -> u8 {
            // last*(T-k) + next*k is last*T + (next-last)*k kept non-negative,
            // so integer division truncates the same way the real value would.
            ((last as u32 * (steps - step) + next as u32 * step) / steps) as u8
        };
        Rgb::new(
            channel(self.r, next.r),
            channel(self.g, next.g),
            channel(self.b, next.b),
        )
    }
}

/// Parses a hex color string (e.g., "#FF0000" or "FF0000").
pub fn parse_hex_color(hex: &str) -> Option<Rgb> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Rgb::new(r, g, b))
}

/// Parses an `R/G/B` triple. Components are clamped to 0-255.
fn parse_rgb_triple(s: &str) -> Option<Rgb> {
    let parts: Vec<i64> = s
        .split('/')
        .map(|part| part.trim().parse::<i64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;

    match parts.as_slice() {
        [r, g, b] => Some(Rgb::new(
            (*r).clamp(0, 255) as u8,
            (*g).clamp(0, 255) as u8,
            (*b).clamp(0, 255) as u8,
        )),
        _ => None,
    }
}

impl FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let parsed = if s.contains('/') {
            parse_rgb_triple(s)
        } else {
            Rgb::named(s).or_else(|| parse_hex_color(s))
        };
        parsed.ok_or_else(|| Error::InvalidColor(s.to_string()))
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.r, self.g, self.b)
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

impl TryFrom<String> for Rgb {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}
