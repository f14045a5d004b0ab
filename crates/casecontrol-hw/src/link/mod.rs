//! Serial link module.
//!
//! Provides the tagged packet protocol and the acknowledged serial link
//! to the controller board.

mod device;

pub mod protocol;

pub use device::{Connector, DeviceLink, SerialConnector};
pub use protocol::{build_color_packet, build_text_packet, encode_line, expected_ack, Tag};
