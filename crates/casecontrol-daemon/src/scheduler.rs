//! Tick scheduler: runs the mode engines and publishes their outputs.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::modes::{CaseEngine, LcdEngine, LcdSources};
use crate::state::{Output, SharedState};

/// Owns the active engines and steps them once per tick.
pub struct ModeRunner {
    case: CaseEngine,
    lcd: LcdEngine,
    sources: LcdSources,
}

impl ModeRunner {
    /// Creates a runner with engines for the currently selected modes.
    pub fn new(state: &SharedState, sources: LcdSources) -> Self {
        let settings = state.settings();
        Self {
            case: CaseEngine::new(settings.case_mode),
            lcd: LcdEngine::new(settings.lcd_mode),
            sources,
        }
    }

    /// Computes one frame and stores it in the shared state.
    pub fn tick(&mut self, state: &SharedState) {
        let settings = state.settings();

        if self.case.mode() != settings.case_mode {
            debug!("Case engine {} -> {}", self.case.mode(), settings.case_mode);
            self.case = CaseEngine::new(settings.case_mode);
        }
        if self.lcd.mode() != settings.lcd_mode {
            debug!("LCD engine {} -> {}", self.lcd.mode(), settings.lcd_mode);
            self.lcd = LcdEngine::new(settings.lcd_mode);
        }

        let output = Output {
            case_color: self.case.color(&settings),
            lcd_color: self.lcd.color(&settings),
            lcd_text: self.lcd.text(&mut self.sources),
        };
        state.set_output(output);
    }
}

/// Ticks the runner at a fixed period until shutdown.
pub async fn scheduler_loop(
    state: Arc<SharedState>,
    mut runner: ModeRunner,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        if *shutdown.borrow() {
            break;
        }
        runner.tick(&state);
    }
    debug!("Scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::blank_text;
    use crate::sensors::{TempsSource, TextFeed};
    use crate::standings::StandingsBoard;
    use casecontrol_hw::Rgb;

    fn runner(state: &SharedState) -> ModeRunner {
        let sources = LcdSources {
            temps: TempsSource::new("/nonexistent/%Y%m%d.csv", Duration::ZERO),
            text: TextFeed::new("/nonexistent/notes.txt"),
            standings: StandingsBoard::new(),
        };
        ModeRunner::new(state, sources)
    }

    fn fade_state() -> SharedState {
        let state = SharedState::in_memory();
        state.add_fade_color("255/0/0").unwrap();
        state.add_fade_color("0/255/0").unwrap();
        state.set_fade_ticks(10);
        state.set_pause_ticks(0);
        state.set_case_mode("fade").unwrap();
        state
    }

    #[test]
    fn test_fade_end_to_end() {
        let state = fade_state();
        let mut runner = runner(&state);

        for _ in 0..5 {
            runner.tick(&state);
        }
        assert_eq!(state.output().case_color, Rgb::new(127, 127, 0));

        for _ in 5..10 {
            runner.tick(&state);
        }
        assert_eq!(state.output().case_color, Rgb::new(0, 255, 0));

        // Wrap: progress restarts from green and heads back to red
        runner.tick(&state);
        assert_eq!(state.output().case_color, Rgb::new(0, 255, 0));
        runner.tick(&state);
        assert_eq!(state.output().case_color, Rgb::new(25, 229, 0));
    }

    #[test]
    fn test_mode_switch_restarts_fade() {
        let state = fade_state();
        let mut runner = runner(&state);
        for _ in 0..7 {
            runner.tick(&state);
        }

        state.set_case_mode("off").unwrap();
        runner.tick(&state);
        assert_eq!(state.output().case_color, Rgb::BLACK);

        state.set_case_mode("fade").unwrap();
        runner.tick(&state);
        assert_eq!(state.output().case_color, Rgb::new(229, 25, 0));
    }

    #[test]
    fn test_static_colors_apply_live() {
        let state = SharedState::in_memory();
        state.set_case_mode("static").unwrap();
        state.set_lcd_mode("static").unwrap();
        state.set_case_color("1/2/3").unwrap();
        let mut runner = runner(&state);

        runner.tick(&state);
        assert_eq!(state.output().case_color, Rgb::new(1, 2, 3));

        state.set_case_color("white").unwrap();
        state.set_lcd_color("0/0/200").unwrap();
        runner.tick(&state);
        let output = state.output();
        assert_eq!(output.case_color, Rgb::new(255, 255, 255));
        assert_eq!(output.lcd_color, Rgb::new(0, 0, 200));
        assert_eq!(output.lcd_text, blank_text());
    }

    #[test]
    fn test_standings_placeholder_before_fetch() {
        let state = SharedState::in_memory();
        state.set_lcd_mode("standings").unwrap();
        let mut runner = runner(&state);
        runner.tick(&state);
        assert!(state.output().lcd_text[0].starts_with("Loading"));
    }

    #[tokio::test]
    async fn test_loop_stops_on_shutdown() {
        let state = Arc::new(fade_state());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler_loop(
            state.clone(),
            runner(&state),
            Duration::from_millis(1),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        assert_ne!(state.output().case_color, Rgb::BLACK);
    }
}
