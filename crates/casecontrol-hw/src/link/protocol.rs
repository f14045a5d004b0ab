//! Wire protocol definitions and encoding.
//!
//! Protocol structure:
//! - Every packet is `[tag:1][payload:N]`, with no further framing
//! - Tags: `c` (case color), `l` (LCD color), `t` (LCD text)
//! - Color payload: 3 bytes, RGB order
//! - Text payload: 4 lines of exactly 20 bytes, space padded
//! - The device answers each packet with a single byte equal to the number
//!   of bytes it received for that packet, tag included

use crate::{Rgb, LCD_HEIGHT, LCD_WIDTH};

/// Color payload size.
pub const COLOR_PAYLOAD_SIZE: usize = 3;

/// Text payload size (4 lines of 20 characters).
pub const TEXT_PAYLOAD_SIZE: usize = LCD_WIDTH * LCD_HEIGHT;

/// Tag byte size.
pub const TAG_SIZE: usize = 1;

/// Color packet size including tag.
pub const COLOR_PACKET_SIZE: usize = TAG_SIZE + COLOR_PAYLOAD_SIZE;

/// Text packet size including tag.
pub const TEXT_PACKET_SIZE: usize = TAG_SIZE + TEXT_PAYLOAD_SIZE;

/// Byte sent in place of characters the LCD cannot show.
const REPLACEMENT_BYTE: u8 = b'?';

/// Packet tags, one per synchronized field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    /// Case lighting color.
    CaseColor = b'c',
    /// LCD backlight color.
    LcdColor = b'l',
    /// LCD text buffer.
    LcdText = b't',
}

impl Tag {
    /// Converts a byte value to a Tag.
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            b'c' => Some(Tag::CaseColor),
            b'l' => Some(Tag::LcdColor),
            b't' => Some(Tag::LcdText),
            _ => None,
        }
    }

    /// Returns the payload size that follows this tag.
    pub fn payload_size(&self) -> usize {
        match self {
            Tag::CaseColor | Tag::LcdColor => COLOR_PAYLOAD_SIZE,
            Tag::LcdText => TEXT_PAYLOAD_SIZE,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tag::CaseColor => write!(f, "case-color"),
            Tag::LcdColor => write!(f, "lcd-color"),
            Tag::LcdText => write!(f, "lcd-text"),
        }
    }
}

/// Builds a color packet for the case or LCD backlight.
pub fn build_color_packet(tag: Tag, color: Rgb) -> [u8; COLOR_PACKET_SIZE] {
    let [r, g, b] = color.to_bytes();
    [tag as u8, r, g, b]
}

/// Encodes one LCD line into exactly `LCD_WIDTH` bytes.
///
/// Characters up to U+00FF map to their code point (this keeps the custom
/// glyph codes and the LCD's own upper half reachable), anything else is
/// replaced. Long lines are cut, short lines are padded with spaces.
pub fn encode_line(line: &str) -> [u8; LCD_WIDTH] {
    let mut buffer = [b' '; LCD_WIDTH];
    for (slot, ch) in buffer.iter_mut().zip(line.chars()) {
        *slot = u8::try_from(u32::from(ch)).unwrap_or(REPLACEMENT_BYTE);
    }
    buffer
}

/// Builds the text packet. Missing lines are sent blank, extra lines are ignored.
pub fn build_text_packet<S: AsRef<str>>(lines: &[S]) -> [u8; TEXT_PACKET_SIZE] {
    let mut buffer = [b' '; TEXT_PACKET_SIZE];
    buffer[0] = Tag::LcdText as u8;
    for (row, line) in lines.iter().take(LCD_HEIGHT).enumerate() {
        let start = TAG_SIZE + row * LCD_WIDTH;
        buffer[start..start + LCD_WIDTH].copy_from_slice(&encode_line(line.as_ref()));
    }
    buffer
}

/// Returns the ACK byte the device must answer with for this packet.
pub fn expected_ack(packet: &[u8]) -> u8 {
    packet.len() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_packet() {
        let packet = build_color_packet(Tag::CaseColor, Rgb::new(255, 128, 1));
        assert_eq!(packet, [b'c', 255, 128, 1]);
        assert_eq!(expected_ack(&packet), 4);

        let packet = build_color_packet(Tag::LcdColor, Rgb::BLACK);
        assert_eq!(packet, [b'l', 0, 0, 0]);
    }

    #[test]
    fn test_encode_line_pads_and_truncates() {
        assert_eq!(&encode_line("Hi"), b"Hi                  ");
        assert_eq!(
            &encode_line("This line is far too long for the LCD"),
            b"This line is far too"
        );
        assert_eq!(&encode_line(""), &[b' '; LCD_WIDTH]);
    }

    #[test]
    fn test_encode_line_byte_mapping() {
        // Custom glyph codes, degree sign and full block pass through as single bytes
        let encoded = encode_line("\u{1}\u{5}\u{df}\u{ff}\u{263a}");
        assert_eq!(&encoded[..5], &[0x01, 0x05, 0xDF, 0xFF, b'?']);
        assert_eq!(encoded[5], b' ');
    }

    #[test]
    fn test_text_packet() {
        let lines = ["one", "two", "three", "four"];
        let packet = build_text_packet(&lines);
        assert_eq!(packet.len(), 81);
        assert_eq!(packet[0], b't');
        assert_eq!(&packet[1..21], b"one                 ");
        assert_eq!(&packet[61..81], b"four                ");
        assert_eq!(expected_ack(&packet), 81);
    }

    #[test]
    fn test_text_packet_missing_lines() {
        let packet = build_text_packet(&["only".to_string()]);
        assert_eq!(&packet[21..81], &[b' '; 60]);
    }

    #[test]
    fn test_tag_round_trip() {
        for tag in [Tag::CaseColor, Tag::LcdColor, Tag::LcdText] {
            assert_eq!(Tag::from_byte(tag as u8), Some(tag));
        }
        assert_eq!(Tag::from_byte(b'x'), None);
        assert_eq!(Tag::LcdText.payload_size(), 80);
    }
}
