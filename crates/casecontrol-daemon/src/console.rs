//! Line-oriented console on stdin.

use clap::{Parser, Subcommand};
use std::fmt::Write;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::state::{SharedState, StateError};

#[derive(Parser, Debug)]
#[command(name = "casecontrol", no_binary_name = true)]
#[command(about = "Case lighting and LCD console")]
struct ConsoleLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Case lighting commands
    Case {
        #[command(subcommand)]
        action: CaseCommand,
    },
    /// LCD commands
    Lcd {
        #[command(subcommand)]
        action: LcdCommand,
    },
    /// Show the current settings
    Info,
    /// Turn everything off and quit
    #[command(alias = "quit")]
    Exit,
}

#[derive(Subcommand, Debug)]
enum CaseCommand {
    /// Select the lighting mode
    Mode {
        /// Mode: off, static, fade
        name: String,
    },
    /// Set the static color
    Color {
        /// R/G/B, #RRGGBB or a color name
        color: String,
    },
    /// Fade settings
    Fade {
        #[command(subcommand)]
        action: FadeCommand,
    },
}

#[derive(Subcommand, Debug)]
enum FadeCommand {
    /// Append a color to the fade list
    Add {
        /// R/G/B, #RRGGBB or a color name
        color: String,
    },
    /// Remove the color at an index
    #[command(alias = "delete")]
    Del {
        /// Zero-based position in the fade list
        index: usize,
    },
    /// Remove every color from the fade list
    Clear,
    /// Set the ticks spent fading between colors (10-200)
    Ticks {
        #[arg(allow_negative_numbers = true)]
        ticks: i64,
    },
    /// Set the ticks spent holding each color (0-200)
    Pause {
        #[arg(allow_negative_numbers = true)]
        ticks: i64,
    },
    /// Saved fade lists
    Set {
        #[command(subcommand)]
        action: FadeSetCommand,
    },
}

#[derive(Subcommand, Debug)]
enum FadeSetCommand {
    /// Save the fade list under a name
    Save { name: String },
    /// Replace the fade list with a saved one
    Load { name: String },
    /// Delete a saved list
    #[command(alias = "delete")]
    Del { name: String },
    /// List saved lists
    List,
}

#[derive(Subcommand, Debug)]
enum LcdCommand {
    /// Select the LCD mode
    Mode {
        /// Mode: off, static, clock, temps, text, standings
        name: String,
    },
    /// Set the backlight color
    Color {
        /// R/G/B, #RRGGBB or a color name
        color: String,
    },
}

/// Result of one console line.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Text to show the user.
    Reply(String),
    /// The user asked to quit.
    Exit,
}

/// Parses and applies one console line.
pub fn run_line(state: &SharedState, line: &str) -> Outcome {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Outcome::Reply(String::new());
    }

    let parsed = match ConsoleLine::try_parse_from(words) {
        Ok(parsed) => parsed,
        Err(e) => return Outcome::Reply(e.to_string().trim_end().to_string()),
    };

    let reply = match parsed.command {
        Command::Exit => return Outcome::Exit,
        Command::Info => Ok(info(state)),
        Command::Case { action } => handle_case(state, action),
        Command::Lcd { action } => handle_lcd(state, action),
    };
    Outcome::Reply(reply.unwrap_or_else(|e| e.to_string()))
}

fn handle_case(state: &SharedState, action: CaseCommand) -> Result<String, StateError> {
    match action {
        CaseCommand::Mode { name } => {
            let mode = state.set_case_mode(&name)?;
            Ok(format!("Case mode set to {}", mode))
        }
        CaseCommand::Color { color } => {
            let color = state.set_case_color(&color)?;
            Ok(format!("Case color set to {}", color))
        }
        CaseCommand::Fade { action } => handle_fade(state, action),
    }
}

fn handle_fade(state: &SharedState, action: FadeCommand) -> Result<String, StateError> {
    match action {
        FadeCommand::Add { color } => {
            let len = state.add_fade_color(&color)?;
            Ok(format!("Added {} ({} colors)", color, len))
        }
        FadeCommand::Del { index } => {
            let removed = state.remove_fade_color(index)?;
            Ok(format!("Removed {}", removed))
        }
        FadeCommand::Clear => {
            state.clear_fade_colors();
            Ok("Fade list cleared".to_string())
        }
        FadeCommand::Ticks { ticks } => {
            let stored = state.set_fade_ticks(ticks);
            Ok(format!("Fade ticks set to {}", stored))
        }
        FadeCommand::Pause { ticks } => {
            let stored = state.set_pause_ticks(ticks);
            Ok(format!("Pause ticks set to {}", stored))
        }
        FadeCommand::Set { action } => match action {
            FadeSetCommand::Save { name } => {
                let len = state.save_fade_set(&name)?;
                Ok(format!("Saved {} colors as '{}'", len, name))
            }
            FadeSetCommand::Load { name } => {
                let len = state.load_fade_set(&name)?;
                Ok(format!("Loaded '{}' ({} colors)", name, len))
            }
            FadeSetCommand::Del { name } => {
                state.delete_fade_set(&name)?;
                Ok(format!("Deleted '{}'", name))
            }
            FadeSetCommand::List => {
                let sets = state.fade_sets();
                if sets.is_empty() {
                    return Ok("No saved fade sets".to_string());
                }
                Ok(sets
                    .iter()
                    .map(|(name, colors)| format!("{}: {}", name, join_colors(colors)))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
        },
    }
}

fn handle_lcd(state: &SharedState, action: LcdCommand) -> Result<String, StateError> {
    match action {
        LcdCommand::Mode { name } => {
            let mode = state.set_lcd_mode(&name)?;
            Ok(format!("LCD mode set to {}", mode))
        }
        LcdCommand::Color { color } => {
            let color = state.set_lcd_color(&color)?;
            Ok(format!("LCD color set to {}", color))
        }
    }
}

fn join_colors(colors: &[casecontrol_hw::Rgb]) -> String {
    colors
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn info(state: &SharedState) -> String {
    let settings = state.settings();
    let output = state.output();

    let mut out = String::new();
    let _ = writeln!(out, "Case:");
    let _ = writeln!(out, "  Mode: {}", settings.case_mode);
    let _ = writeln!(out, "  Static color: {}", settings.case_static_color);
    let _ = writeln!(out, "  Fade colors: [{}]", join_colors(&settings.case_fade_colors));
    let _ = writeln!(
        out,
        "  Fade ticks: {}, pause ticks: {}",
        settings.case_fade_ticks, settings.case_pause_ticks
    );
    let _ = writeln!(out, "  Current color: {}", output.case_color);
    let names: Vec<&str> = settings.saved_fade_sets.keys().map(String::as_str).collect();
    let _ = writeln!(out, "  Saved fade sets: {}", names.join(", "));
    let _ = writeln!(out, "LCD:");
    let _ = writeln!(out, "  Mode: {}", settings.lcd_mode);
    let _ = writeln!(out, "  Static color: {}", settings.lcd_static_color);
    let _ = write!(out, "  Current color: {}", output.lcd_color);
    out
}

/// Forwards stdin lines from a plain thread, so a pending read never holds
/// up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("Console read failed: {}", e);
                    return;
                }
            }
        }
    });
    rx
}

/// Reads commands from stdin until `exit` or end of input.
pub async fn console_loop(state: Arc<SharedState>) {
    let mut lines = spawn_stdin_reader();
    while let Some(line) = lines.recv().await {
        match run_line(&state, &line) {
            Outcome::Reply(reply) if reply.is_empty() => {}
            Outcome::Reply(reply) => println!("{}", reply),
            Outcome::Exit => {
                println!("Goodbye");
                return;
            }
        }
    }
    debug!("Console input closed");
}
