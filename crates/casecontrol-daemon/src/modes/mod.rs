//! Mode system for the case lighting and the LCD.
//!
//! A mode selects which engine computes the output on every tick. Engines
//! are rebuilt whenever the selected mode changes, so switching modes always
//! restarts an animation from its first frame.

mod case;
mod glyphs;
mod lcd;

pub use case::CaseEngine;
pub use lcd::{blank_text, LcdEngine, LcdSources, LcdText};

use crate::state::StateError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Case lighting modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMode {
    /// Lights off.
    #[default]
    Off,
    /// Single fixed color.
    Static,
    /// Cross-fade through the fade color list.
    Fade,
}

impl CaseMode {
    /// All case modes in display order.
    pub const ALL: [CaseMode; 3] = [CaseMode::Off, CaseMode::Static, CaseMode::Fade];
}

impl FromStr for CaseMode {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, StateError> {
        match s.trim().to_lowercase().as_str() {
            "off" => Ok(CaseMode::Off),
            "static" => Ok(CaseMode::Static),
            "fade" => Ok(CaseMode::Fade),
            _ => Err(StateError::UnknownCaseMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for CaseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseMode::Off => write!(f, "off"),
            CaseMode::Static => write!(f, "static"),
            CaseMode::Fade => write!(f, "fade"),
        }
    }
}

/// LCD content modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LcdMode {
    /// Backlight off, screen blank.
    #[default]
    Off,
    /// Fixed backlight color, blank screen.
    Static,
    /// Date line and a large clock.
    Clock,
    /// Temperatures and fan speed.
    Temps,
    /// First lines of a text file.
    Text,
    /// Division standings.
    Standings,
}

impl LcdMode {
    /// All LCD modes in display order.
    pub const ALL: [LcdMode; 6] = [
        LcdMode::Off,
        LcdMode::Static,
        LcdMode::Clock,
        LcdMode::Temps,
        LcdMode::Text,
        LcdMode::Standings,
    ];
}

impl FromStr for LcdMode {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, StateError> {
        match s.trim().to_lowercase().as_str() {
            "off" => Ok(LcdMode::Off),
            "static" => Ok(LcdMode::Static),
            "clock" => Ok(LcdMode::Clock),
            "temps" => Ok(LcdMode::Temps),
            "text" => Ok(LcdMode::Text),
            "standings" | "nhl" => Ok(LcdMode::Standings),
            _ => Err(StateError::UnknownLcdMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for LcdMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LcdMode::Off => write!(f, "off"),
            LcdMode::Static => write!(f, "static"),
            LcdMode::Clock => write!(f, "clock"),
            LcdMode::Temps => write!(f, "temps"),
            LcdMode::Text => write!(f, "text"),
            LcdMode::Standings => write!(f, "standings"),
        }
    }
}

/// Joins mode names for help and error messages.
pub fn mode_names<M: std::fmt::Display>(modes: &[M]) -> String {
    modes
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_mode_from_str() {
        assert_eq!("fade".parse::<CaseMode>().unwrap(), CaseMode::Fade);
        assert_eq!("STATIC".parse::<CaseMode>().unwrap(), CaseMode::Static);
        assert!(matches!(
            "glow".parse::<CaseMode>(),
            Err(StateError::UnknownCaseMode(name)) if name == "glow"
        ));
    }

    #[test]
    fn test_lcd_mode_from_str() {
        assert_eq!("clock".parse::<LcdMode>().unwrap(), LcdMode::Clock);
        assert_eq!("nhl".parse::<LcdMode>().unwrap(), LcdMode::Standings);
        assert!("disco".parse::<LcdMode>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for mode in CaseMode::ALL {
            assert_eq!(mode.to_string().parse::<CaseMode>().unwrap(), mode);
        }
        for mode in LcdMode::ALL {
            assert_eq!(mode.to_string().parse::<LcdMode>().unwrap(), mode);
        }
        assert_eq!(mode_names(&CaseMode::ALL), "off, static, fade");
    }
}
