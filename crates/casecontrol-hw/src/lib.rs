//! Case Control Hardware Library
//!
//! Provides the color model, wire protocol and serial link for the
//! microcontroller that drives the case RGB lighting and the 20x4
//! character LCD.

pub mod color;
pub mod error;
pub mod link;

pub use color::Rgb;
pub use error::{Error, Result};
pub use link::{Connector, DeviceLink, SerialConnector, Tag};

/// LCD geometry in characters.
pub const LCD_WIDTH: usize = 20;
pub const LCD_HEIGHT: usize = 4;

/// Baud rate the controller firmware listens on.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
