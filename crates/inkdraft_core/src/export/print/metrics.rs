//! Standard-14 font selection, glyph widths and WinAnsi encoding.

/// The eight Helvetica / Courier faces used by the print converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl Font {
    pub const ALL: [Font; 8] = [
        Font::Helvetica,
        Font::HelveticaBold,
        Font::HelveticaOblique,
        Font::HelveticaBoldOblique,
        Font::Courier,
        Font::CourierBold,
        Font::CourierOblique,
        Font::CourierBoldOblique,
    ];

    pub fn select(bold: bool, italic: bool, monospace: bool) -> Self {
        match (monospace, bold, italic) {
            (false, false, false) => Font::Helvetica,
            (false, true, false) => Font::HelveticaBold,
            (false, false, true) => Font::HelveticaOblique,
            (false, true, true) => Font::HelveticaBoldOblique,
            (true, false, false) => Font::Courier,
            (true, true, false) => Font::CourierBold,
            (true, false, true) => Font::CourierOblique,
            (true, true, true) => Font::CourierBoldOblique,
        }
    }

    pub fn base_name(self) -> &'static [u8] {
        match self {
            Font::Helvetica => b"Helvetica",
            Font::HelveticaBold => b"Helvetica-Bold",
            Font::HelveticaOblique => b"Helvetica-Oblique",
            Font::HelveticaBoldOblique => b"Helvetica-BoldOblique",
            Font::Courier => b"Courier",
            Font::CourierBold => b"Courier-Bold",
            Font::CourierOblique => b"Courier-Oblique",
            Font::CourierBoldOblique => b"Courier-BoldOblique",
        }
    }

    /// Resource name in page dictionaries (`F1`..`F8`).
    pub fn resource_name(self) -> &'static [u8] {
        match self {
            Font::Helvetica => b"F1",
            Font::HelveticaBold => b"F2",
            Font::HelveticaOblique => b"F3",
            Font::HelveticaBoldOblique => b"F4",
            Font::Courier => b"F5",
            Font::CourierBold => b"F6",
            Font::CourierOblique => b"F7",
            Font::CourierBoldOblique => b"F8",
        }
    }

    pub fn index(self) -> usize {
        Font::ALL
            .iter()
            .position(|font| *font == self)
            .unwrap_or(0)
    }

    fn is_monospace(self) -> bool {
        matches!(
            self,
            Font::Courier | Font::CourierBold | Font::CourierOblique | Font::CourierBoldOblique
        )
    }

    fn is_bold(self) -> bool {
        matches!(self, Font::HelveticaBold | Font::HelveticaBoldOblique)
    }

    /// Advance width of one encoded byte in thousandths of an em.
    fn glyph_width(self, byte: u8) -> u16 {
        if self.is_monospace() {
            return 600;
        }
        if (32..=126).contains(&byte) {
            let table = if self.is_bold() {
                &HELVETICA_BOLD_WIDTHS
            } else {
                &HELVETICA_WIDTHS
            };
            return table[usize::from(byte - 32)];
        }
        match byte {
            0x95 => 350,
            0x85 | 0x89 | 0x97 => 1000,
            0x91 | 0x92 | 0x82 => 222,
            0x93 | 0x94 | 0x84 => 333,
            0xA0 => 278,
            _ => 556,
        }
    }

    /// Width of `text` set at `size` points.
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = text
            .chars()
            .map(|ch| u32::from(self.glyph_width(encode_char(ch))))
            .sum();
        units as f32 * size / 1000.0
    }
}

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Map a char to its WinAnsi byte; unmappable chars become `?`.
pub fn encode_char(ch: char) -> u8 {
    let code = u32::from(ch);
    match code {
        32..=126 | 0xA0..=0xFF => code as u8,
        0x09 => b' ',
        _ => match ch {
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        },
    }
}

pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(encode_char).collect()
}
