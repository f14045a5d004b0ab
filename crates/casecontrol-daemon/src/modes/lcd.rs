//! LCD content engine.

use super::glyphs::{big_text, clock_layout};
use super::LcdMode;
use crate::sensors::{Readings, TempsSource, TextFeed};
use crate::standings::StandingsBoard;
use crate::state::Settings;
use casecontrol_hw::{Rgb, LCD_HEIGHT, LCD_WIDTH};
use chrono::{Local, NaiveDateTime, Timelike};

/// Four lines of LCD text. Lines may be longer than the display; they are
/// cut when encoded for the wire.
pub type LcdText = [String; LCD_HEIGHT];

/// Degree sign in the LCD's character set.
pub const DEGREE: char = '\u{df}';

/// Returns four empty lines.
pub fn blank_text() -> LcdText {
    Default::default()
}

/// Data the content modes draw from.
pub struct LcdSources {
    pub temps: TempsSource,
    pub text: TextFeed,
    pub standings: StandingsBoard,
}

/// Computes the LCD color and text for the active mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LcdEngine {
    Off,
    Static,
    Clock,
    Temps,
    Text,
    Standings,
}

impl LcdEngine {
    /// Creates a fresh engine for a mode.
    pub fn new(mode: LcdMode) -> Self {
        match mode {
            LcdMode::Off => LcdEngine::Off,
            LcdMode::Static => LcdEngine::Static,
            LcdMode::Clock => LcdEngine::Clock,
            LcdMode::Temps => LcdEngine::Temps,
            LcdMode::Text => LcdEngine::Text,
            LcdMode::Standings => LcdEngine::Standings,
        }
    }

    /// Returns the mode this engine implements.
    pub fn mode(&self) -> LcdMode {
        match self {
            LcdEngine::Off => LcdMode::Off,
            LcdEngine::Static => LcdMode::Static,
            LcdEngine::Clock => LcdMode::Clock,
            LcdEngine::Temps => LcdMode::Temps,
            LcdEngine::Text => LcdMode::Text,
            LcdEngine::Standings => LcdMode::Standings,
        }
    }

    /// Computes the backlight color.
    pub fn color(&self, settings: &Settings) -> Rgb {
        match self {
            LcdEngine::Off => Rgb::BLACK,
            _ => settings.lcd_static_color,
        }
    }

    /// Computes the text for one tick.
    pub fn text(&self, sources: &mut LcdSources) -> LcdText {
        match self {
            LcdEngine::Off | LcdEngine::Static => blank_text(),
            LcdEngine::Clock => clock_text(Local::now().naive_local()),
            LcdEngine::Temps => temps_text(&sources.temps.sample()),
            LcdEngine::Text => sources.text.read(),
            LcdEngine::Standings => sources.standings.text(),
        }
    }
}

/// Date and seconds on the first line, the time in large digits below.
pub fn clock_text(now: NaiveDateTime) -> LcdText {
    let date = now.format("%A, %b %-d").to_string();
    let seconds = now.format("%S").to_string();
    let pad = LCD_WIDTH.saturating_sub(date.chars().count());

    let (_, hour) = now.hour12();
    let [top, middle, bottom] = big_text(&clock_layout(hour, now.minute()));
    [format!("{date}{seconds:>pad$}"), top, middle, bottom]
}

/// Fan speed and temperatures, one reading group per line.
pub fn temps_text(readings: &Readings) -> LcdText {
    let [cpu0, cpu1, board, gpu] = readings.temps;
    [
        format!("Fan: {} RPM", readings.fan),
        format!("CPU: {cpu0}{DEGREE}C {cpu1}{DEGREE}C"),
        format!("     {board}{DEGREE}C"),
        format!("GPU: {gpu}{DEGREE}C"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn sources() -> LcdSources {
        LcdSources {
            temps: TempsSource::new("/nonexistent/%Y%m%d.csv", Duration::ZERO),
            text: TextFeed::new("/nonexistent/notes.txt"),
            standings: StandingsBoard::new(),
        }
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 2, 3)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_off_and_static() {
        let settings = Settings {
            lcd_static_color: Rgb::new(0, 0, 90),
            ..Settings::default()
        };
        let mut sources = sources();

        let off = LcdEngine::new(LcdMode::Off);
        assert_eq!(off.color(&settings), Rgb::BLACK);
        assert_eq!(off.text(&mut sources), blank_text());

        let fixed = LcdEngine::new(LcdMode::Static);
        assert_eq!(fixed.color(&settings), Rgb::new(0, 0, 90));
        assert_eq!(fixed.text(&mut sources), blank_text());
    }

    #[test]
    fn test_clock_date_line() {
        let text = clock_text(at(21, 7, 9));
        assert_eq!(text[0], "Wednesday, Feb 3  09");
        assert_eq!(text[0].chars().count(), LCD_WIDTH);
    }

    #[test]
    fn test_clock_digits() {
        let text = clock_text(at(21, 7, 9));
        let expected = big_text("     9 : 0 7");
        assert_eq!(text[1..], expected[..]);

        // Noon shows as 12, midnight as 12 too
        let noon = clock_text(at(12, 30, 0));
        assert_eq!(noon[1..], big_text(" 1 2 : 3 0")[..]);
        let midnight = clock_text(at(0, 0, 0));
        assert_eq!(midnight[1..], big_text(" 1 2 : 0 0")[..]);
    }

    #[test]
    fn test_temps_lines() {
        let readings = Readings {
            temps: [41, 43, 35, 60],
            fan: 1200,
        };
        let text = temps_text(&readings);
        assert_eq!(text[0], "Fan: 1200 RPM");
        assert_eq!(text[1], "CPU: 41\u{df}C 43\u{df}C");
        assert_eq!(text[2], "     35\u{df}C");
        assert_eq!(text[3], "GPU: 60\u{df}C");
    }

    #[test]
    fn test_temps_without_log_shows_zeros() {
        let text = LcdEngine::new(LcdMode::Temps).text(&mut sources());
        assert_eq!(text[0], "Fan: 0 RPM");
        assert_eq!(text[3], "GPU: 0\u{df}C");
    }

    #[test]
    fn test_mode_round_trip() {
        for mode in LcdMode::ALL {
            assert_eq!(LcdEngine::new(mode).mode(), mode);
        }
    }
}
