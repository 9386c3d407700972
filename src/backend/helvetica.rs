//! Standard Helvetica metrics and WinAnsi encoding for PDF overlay text.
//!
//! Helvetica is one of the 14 standard PDF fonts, so overlay text needs no
//! embedded font program. Widths are in 1/1000 em.

/// Advance widths for WinAnsi codes 32..=126.
const WIDTHS_32_126: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Width used for codes outside the ASCII table.
const FALLBACK_WIDTH: u16 = 556;

pub const ASCENT: f32 = 718.0;
pub const DESCENT: f32 = -207.0;

/// WinAnsi code of the trademark sign.
const WIN_ANSI_TRADEMARK: u8 = 0x99;

/// Encode text as WinAnsi bytes. Unmappable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2122}' => WIN_ANSI_TRADEMARK,
            '\u{20AC}' => 0x80,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            c if (' '..='~').contains(&c) => c as u8,
            c if ('\u{A0}'..='\u{FF}').contains(&c) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn glyph_width(code: u8) -> u16 {
    match code {
        32..=126 => WIDTHS_32_126[(code - 32) as usize],
        WIN_ANSI_TRADEMARK => 1000,
        0x97 => 1000,
        _ => FALLBACK_WIDTH,
    }
}

/// Width of WinAnsi-encoded text at `font_size` points.
pub fn text_width(encoded: &[u8], font_size: f32) -> f32 {
    let units: u32 = encoded.iter().map(|&b| glyph_width(b) as u32).sum();
    units as f32 * font_size / 1000.0
}

/// Height of the ascent-to-descent box at `font_size` points.
pub fn text_height(font_size: f32) -> f32 {
    (ASCENT - DESCENT) * font_size / 1000.0
}

/// Escape bytes for a PDF literal string.
pub fn escape_literal(encoded: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded.len() + 2);
    for &b in encoded {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            _ => out.push(b),
        }
    }
    out
}
