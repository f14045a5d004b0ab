//! Case lighting engine.

use super::CaseMode;
use crate::state::Settings;
use casecontrol_hw::Rgb;

/// Progress counters of a running fade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FadeProgress {
    /// Index of the color the fade starts from.
    pub color_index: usize,
    /// Ticks spent interpolating towards the next color.
    pub fade_ticks: u32,
    /// Ticks spent holding at the next color.
    pub pause_ticks: u32,
}

impl FadeProgress {
    /// Advances the counters by one tick.
    fn advance(&mut self, fade_ticks: u32, pause_ticks: u32, len: usize) {
        if self.fade_ticks < fade_ticks {
            self.fade_ticks += 1;
        } else if self.pause_ticks < pause_ticks {
            self.pause_ticks += 1;
        } else {
            self.fade_ticks = 0;
            self.pause_ticks = 0;
            self.color_index = (self.color_index + 1) % len;
        }
    }
}

/// Computes the case color for the active mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseEngine {
    Off,
    Static,
    Fade(FadeProgress),
}

impl CaseEngine {
    /// Creates a fresh engine for a mode.
    pub fn new(mode: CaseMode) -> Self {
        match mode {
            CaseMode::Off => CaseEngine::Off,
            CaseMode::Static => CaseEngine::Static,
            CaseMode::Fade => CaseEngine::Fade(FadeProgress::default()),
        }
    }

    /// Returns the mode this engine implements.
    pub fn mode(&self) -> CaseMode {
        match self {
            CaseEngine::Off => CaseMode::Off,
            CaseEngine::Static => CaseMode::Static,
            CaseEngine::Fade(_) => CaseMode::Fade,
        }
    }

    /// Computes the color for one tick.
    pub fn color(&mut self, settings: &Settings) -> Rgb {
        match self {
            CaseEngine::Off => Rgb::BLACK,
            CaseEngine::Static => settings.case_static_color,
            CaseEngine::Fade(progress) => {
                let colors = &settings.case_fade_colors;
                if colors.is_empty() {
                    return Rgb::BLACK;
                }
                if progress.color_index >= colors.len() {
                    progress.color_index = 0;
                }
                progress.advance(
                    settings.case_fade_ticks,
                    settings.case_pause_ticks,
                    colors.len(),
                );

                let last = colors[progress.color_index];
                let next = colors[(progress.color_index + 1) % colors.len()];
                last.interpolate(next, progress.fade_ticks, settings.case_fade_ticks)
            }
        }
    }

    /// Returns the fade progress, if fading.
    #[cfg(test)]
    pub fn progress(&self) -> Option<&FadeProgress> {
        match self {
            CaseEngine::Fade(progress) => Some(progress),
            _ => None,
        }
    }
}
