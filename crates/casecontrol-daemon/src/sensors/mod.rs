//! External data sources for the LCD.
//!
//! Sources never fail outwards: a missing or garbled input keeps the last
//! good value (or a blank one) so the LCD always has something to show.

mod temps;
mod text;

pub use temps::{Readings, TempsSource};
pub use text::TextFeed;
