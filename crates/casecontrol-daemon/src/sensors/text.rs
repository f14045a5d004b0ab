//! Text feed read from a user-edited file.

use crate::modes::{blank_text, LcdText};
use casecontrol_hw::LCD_WIDTH;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Shows the first lines of a plain text file.
pub struct TextFeed {
    path: PathBuf,
}

impl TextFeed {
    /// Creates a feed for a file path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Reads up to four lines, each cut to the LCD width. Lines the file
    /// does not have are empty.
    pub fn read(&self) -> LcdText {
        let mut text = blank_text();
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                trace!("Text feed {:?} unavailable: {}", self.path, e);
                return text;
            }
        };
        for (slot, line) in text.iter_mut().zip(content.lines()) {
            *slot = line.chars().take(LCD_WIDTH).collect();
        }
        text
    }
}
