//! Base-14 font selection, glyph widths and WinAnsi text encoding.
//!
//! Only the standard PDF fonts are used, so no font data is embedded. Widths
//! come from the Helvetica AFM tables; the Times faces are measured with the
//! Helvetica tables, which slightly overestimates line lengths.

/// Widths of the printable ASCII range (32..=126) in 1/1000 em.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, //
];

const DEFAULT_WIDTH: u16 = 556;
const COURIER_WIDTH: u16 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontFamily {
    Helvetica,
    Times,
    Courier,
}

impl FontFamily {
    /// Picks the first recognizable family from a `font-family` list.
    pub fn from_property(value: &str) -> FontFamily {
        for candidate in value.split(',') {
            let name = candidate.trim().trim_matches(|c| c == '"' || c == '\'').to_ascii_lowercase();
            match name.as_str() {
                "courier" | "courier new" | "monospace" => return FontFamily::Courier,
                "times" | "times roman" | "times new roman" | "times-roman" | "serif" => return FontFamily::Times,
                "helvetica" | "arial" | "sans-serif" => return FontFamily::Helvetica,
                _ => {}
            }
        }
        FontFamily::Helvetica
    }
}

/// One of the twelve base-14 text faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BaseFont {
    pub family: FontFamily,
    pub bold: bool,
    pub italic: bool,
}

impl BaseFont {
    pub fn new(family: FontFamily, bold: bool, italic: bool) -> Self {
        Self { family, bold, italic }
    }

    pub fn postscript_name(&self) -> &'static str {
        match (self.family, self.bold, self.italic) {
            (FontFamily::Helvetica, false, false) => "Helvetica",
            (FontFamily::Helvetica, true, false) => "Helvetica-Bold",
            (FontFamily::Helvetica, false, true) => "Helvetica-Oblique",
            (FontFamily::Helvetica, true, true) => "Helvetica-BoldOblique",
            (FontFamily::Times, false, false) => "Times-Roman",
            (FontFamily::Times, true, false) => "Times-Bold",
            (FontFamily::Times, false, true) => "Times-Italic",
            (FontFamily::Times, true, true) => "Times-BoldItalic",
            (FontFamily::Courier, false, false) => "Courier",
            (FontFamily::Courier, true, false) => "Courier-Bold",
            (FontFamily::Courier, false, true) => "Courier-Oblique",
            (FontFamily::Courier, true, true) => "Courier-BoldOblique",
        }
    }

    fn char_width(&self, c: char) -> u16 {
        if self.family == FontFamily::Courier {
            return COURIER_WIDTH;
        }
        let table = if self.bold { &HELVETICA_BOLD } else { &HELVETICA };
        match c as u32 {
            code @ 32..=126 => table[(code - 32) as usize],
            0xA0 => table[0],
            _ => DEFAULT_WIDTH,
        }
    }

    /// Width of `text` in points at `size`.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        units as f32 * size / 1000.0
    }

    /// Distance from the top of the em box to the baseline, in points.
    pub fn ascent(&self, size: f32) -> f32 {
        let units = match self.family {
            FontFamily::Helvetica => 718.0,
            FontFamily::Times => 683.0,
            FontFamily::Courier => 629.0,
        };
        units * size / 1000.0
    }
}

/// Encodes text for a WinAnsiEncoding simple font. Characters outside the
/// encoding become `?`.
pub fn to_win_ansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u8,
            _ => match c {
                '\u{20AC}' => 0x80,
                '\u{2018}' => 0x91,
                '\u{2019}' => 0x92,
                '\u{201C}' => 0x93,
                '\u{201D}' => 0x94,
                '\u{2022}' => 0x95,
                '\u{2013}' => 0x96,
                '\u{2014}' => 0x97,
                '\u{2026}' => 0x85,
                _ => b'?',
            },
        })
        .collect()
}
