//! Three-row font for the large clock.
//!
//! Glyphs are built from five custom LCD characters the firmware loads into
//! codes 1 to 5, plus the LCD's full block (0xFF) and plain spaces.

/// Rows per glyph.
pub const GLYPH_HEIGHT: usize = 3;

/// Lower half block, bottom-right rounded.
const HBR: char = '\u{1}';
/// Lower half block, bottom-left rounded.
const HBL: char = '\u{2}';
/// Bottom bar.
const BOT: char = '\u{3}';
/// Full block, bottom-right rounded.
const FBR: char = '\u{4}';
/// Full block, bottom-left rounded.
const FBL: char = '\u{5}';
/// Full block.
const FUL: char = '\u{ff}';
/// Empty cell.
const EMT: char = ' ';

type Glyph = [&'static [char]; GLYPH_HEIGHT];

const DIGITS: [Glyph; 10] = [
    [&[HBR, BOT, HBL], &[FUL, EMT, FUL], &[FBR, BOT, FBL]],
    [&[BOT, HBL, EMT], &[EMT, FUL, EMT], &[BOT, FUL, BOT]],
    [&[HBR, BOT, HBL], &[HBR, BOT, FBL], &[FBR, BOT, BOT]],
    [&[HBR, BOT, HBL], &[EMT, BOT, FUL], &[BOT, BOT, FBL]],
    [&[BOT, EMT, BOT], &[FBR, BOT, FUL], &[EMT, EMT, FUL]],
    [&[BOT, BOT, BOT], &[FUL, BOT, HBL], &[BOT, BOT, FBL]],
    [&[HBR, BOT, HBL], &[FUL, BOT, HBL], &[FBR, BOT, FBL]],
    [&[BOT, BOT, BOT], &[EMT, HBR, FBL], &[EMT, FUL, EMT]],
    [&[HBR, BOT, HBL], &[FUL, BOT, FUL], &[FBR, BOT, FBL]],
    [&[HBR, BOT, HBL], &[FBR, BOT, FUL], &[EMT, EMT, FUL]],
];

const COLON: Glyph = [&[FUL], &[EMT], &[FUL]];
const SPACE: Glyph = [&[EMT], &[EMT], &[EMT]];

fn glyph(ch: char) -> Glyph {
    match ch {
        ':' => COLON,
        d @ '0'..='9' => DIGITS[(d as u8 - b'0') as usize],
        _ => SPACE,
    }
}

/// Renders a string of digits, colons and spaces as three text rows.
///
/// Anything outside the font renders as a space.
pub fn big_text(text: &str) -> [String; GLYPH_HEIGHT] {
    let mut rows: [String; GLYPH_HEIGHT] = Default::default();
    for ch in text.chars() {
        for (row, cells) in rows.iter_mut().zip(glyph(ch)) {
            row.extend(cells.iter());
        }
    }
    rows
}

/// Lays out a 12-hour time so that the rendered clock is the same width
/// for one- and two-digit hours.
pub fn clock_layout(hour: u32, minute: u32) -> String {
    let minutes = format!("{:02}", minute % 60);
    let mut m = minutes.chars();
    let (m0, m1) = (m.next().unwrap_or('0'), m.next().unwrap_or('0'));

    let hours = hour.to_string();
    let mut h = hours.chars();
    match (h.next(), h.next()) {
        (Some(h0), Some(h1)) => format!(" {h0} {h1} : {m0} {m1}"),
        (Some(h0), None) => format!("     {h0} : {m0} {m1}"),
        _ => format!("       : {m0} {m1}"),
    }
}
