//! Font handling for text extraction: byte-to-text decoding and glyph widths.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object};
use tracing::trace;

/// Width used when a font declares none, in thousandths of an em.
const DEFAULT_WIDTH: f64 = 500.0;

/// One decoded character code.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChar {
    pub text: String,
    /// Horizontal advance in text space units (em / 1000 already applied).
    pub width: f64,
    /// Single-byte code 32, which receives word spacing.
    pub is_space: bool,
}

/// Decoding information for one font resource.
#[derive(Debug, Clone, Default)]
pub struct Font {
    two_byte: bool,
    to_unicode: HashMap<u32, String>,
    differences: HashMap<u32, String>,
    widths: HashMap<u32, f64>,
    default_width: f64,
}

impl Font {
    /// Build a font from its dictionary. Unknown or broken entries fall back
    /// to single-byte WinAnsi decoding.
    pub fn load(doc: &Document, dict: &Dictionary) -> Self {
        let subtype = name(doc, dict.get(b"Subtype").ok());
        let two_byte = subtype.as_deref() == Some(b"Type0".as_slice());

        let mut font = Font {
            two_byte,
            default_width: DEFAULT_WIDTH,
            ..Font::default()
        };

        if let Some(stream) = resolve(doc, dict.get(b"ToUnicode").ok()).and_then(|o| o.as_stream().ok()) {
            let data = stream.decompressed_content().unwrap_or_else(|_| stream.content.clone());
            font.to_unicode = parse_cmap(&data);
            trace!("ToUnicode CMap with {} entries", font.to_unicode.len());
        }

        if two_byte {
            font.load_cid_widths(doc, dict);
        } else {
            font.load_simple_widths(doc, dict);
            font.load_differences(doc, dict);
        }
        font
    }

    fn load_simple_widths(&mut self, doc: &Document, dict: &Dictionary) {
        let first = resolve(doc, dict.get(b"FirstChar").ok()).and_then(number).unwrap_or(0.0) as u32;
        if let Some(Object::Array(widths)) = resolve(doc, dict.get(b"Widths").ok()) {
            for (i, w) in widths.iter().enumerate() {
                if let Some(w) = resolve(doc, Some(w)).and_then(number) {
                    self.widths.insert(first + i as u32, w);
                }
            }
        }
        let missing = resolve(doc, dict.get(b"FontDescriptor").ok())
            .and_then(|o| o.as_dict().ok())
            .and_then(|d| resolve(doc, d.get(b"MissingWidth").ok()))
            .and_then(number);
        if let Some(w) = missing.filter(|w| *w > 0.0) {
            self.default_width = w;
        }
    }

    fn load_cid_widths(&mut self, doc: &Document, dict: &Dictionary) {
        self.default_width = 1000.0;
        let Some(descendant) = resolve(doc, dict.get(b"DescendantFonts").ok())
            .and_then(|o| o.as_array().ok())
            .and_then(|a| a.first())
            .and_then(|o| resolve(doc, Some(o)))
            .and_then(|o| o.as_dict().ok())
        else {
            return;
        };

        if let Some(dw) = resolve(doc, descendant.get(b"DW").ok()).and_then(number) {
            self.default_width = dw;
        }
        let Some(Object::Array(w)) = resolve(doc, descendant.get(b"W").ok()) else {
            return;
        };

        // Entries are either `c [w1 w2 ...]` or `c_first c_last w`.
        let mut i = 0;
        while i < w.len() {
            let Some(start) = resolve(doc, Some(&w[i])).and_then(number) else {
                break;
            };
            match w.get(i + 1).and_then(|o| resolve(doc, Some(o))) {
                Some(Object::Array(list)) => {
                    for (k, width) in list.iter().enumerate() {
                        if let Some(width) = number(width) {
                            self.widths.insert(start as u32 + k as u32, width);
                        }
                    }
                    i += 2;
                }
                Some(end) => {
                    let (Some(end), Some(width)) = (number(end), w.get(i + 2).and_then(number)) else {
                        break;
                    };
                    for code in start as u32..=end as u32 {
                        self.widths.insert(code, width);
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    fn load_differences(&mut self, doc: &Document, dict: &Dictionary) {
        let Some(Object::Dictionary(encoding)) = resolve(doc, dict.get(b"Encoding").ok()) else {
            return;
        };
        let Some(Object::Array(diffs)) = resolve(doc, encoding.get(b"Differences").ok()) else {
            return;
        };
        let mut code = 0u32;
        for entry in diffs {
            match entry {
                Object::Integer(c) => code = *c as u32,
                Object::Name(glyph) => {
                    if let Some(text) = glyph_name_to_text(&String::from_utf8_lossy(glyph)) {
                        self.differences.insert(code, text);
                    }
                    code += 1;
                }
                _ => {}
            }
        }
    }

    /// Split a string operand into character codes and decode each one.
    pub fn decode(&self, bytes: &[u8]) -> Vec<DecodedChar> {
        let codes: Vec<u32> = if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| match c {
                    [hi, lo] => (u32::from(*hi) << 8) | u32::from(*lo),
                    [single] => u32::from(*single),
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|b| u32::from(*b)).collect()
        };

        codes
            .into_iter()
            .map(|code| DecodedChar {
                text: self.text_for(code),
                width: self.widths.get(&code).copied().unwrap_or(self.default_width) / 1000.0,
                is_space: !self.two_byte && code == 32,
            })
            .collect()
    }

    fn text_for(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.get(&code) {
            return text.clone();
        }
        if let Some(text) = self.differences.get(&code) {
            return text.clone();
        }
        if self.two_byte {
            return char::from_u32(code).map(String::from).unwrap_or_default();
        }
        win_ansi(code as u8).map(String::from).unwrap_or_default()
    }
}

fn resolve<'a>(doc: &'a Document, object: Option<&'a Object>) -> Option<&'a Object> {
    let object = object?;
    doc.dereference(object).ok().map(|(_, o)| o)
}

fn name(doc: &Document, object: Option<&Object>) -> Option<Vec<u8>> {
    resolve(doc, object)?.as_name().ok().map(<[u8]>::to_vec)
}

pub(crate) fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// WinAnsiEncoding; the 0x80-0x9F block differs from Latin-1.
fn win_ansi(byte: u8) -> Option<char> {
    const HIGH: [Option<char>; 32] = [
        Some('€'), None, Some('‚'), Some('ƒ'), Some('„'), Some('…'), Some('†'), Some('‡'),
        Some('ˆ'), Some('‰'), Some('Š'), Some('‹'), Some('Œ'), None, Some('Ž'), None,
        None, Some('‘'), Some('’'), Some('“'), Some('”'), Some('•'), Some('–'), Some('—'),
        Some('˜'), Some('™'), Some('š'), Some('›'), Some('œ'), None, Some('ž'), Some('Ÿ'),
    ];
    match byte {
        0x20..=0x7E | 0xA0..=0xFF => Some(char::from(byte)),
        0x80..=0x9F => HIGH[(byte - 0x80) as usize],
        _ => None,
    }
}

fn glyph_name_to_text(name: &str) -> Option<String> {
    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() == 4 {
            return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32).map(String::from);
        }
    }
    if name.len() == 1 {
        return Some(name.to_string());
    }
    let text = match name {
        "space" | "nbspace" => " ",
        "zero" => "0",
        "one" => "1",
        "two" => "2",
        "three" => "3",
        "four" => "4",
        "five" => "5",
        "six" => "6",
        "seven" => "7",
        "eight" => "8",
        "nine" => "9",
        "period" => ".",
        "comma" => ",",
        "colon" => ":",
        "semicolon" => ";",
        "hyphen" | "minus" => "-",
        "slash" => "/",
        "percent" => "%",
        "ampersand" => "&",
        "quoteright" | "quotesingle" => "'",
        "parenleft" => "(",
        "parenright" => ")",
        "numbersign" => "#",
        "plus" => "+",
        "degree" => "°",
        "ordmasculine" => "º",
        "eacute" => "é",
        "egrave" => "è",
        "ecircumflex" => "ê",
        "agrave" => "à",
        "acircumflex" => "â",
        "ccedilla" => "ç",
        "ugrave" => "ù",
        "ocircumflex" => "ô",
        "icircumflex" => "î",
        "Eacute" => "É",
        "Egrave" => "È",
        "Agrave" => "À",
        "Ccedilla" => "Ç",
        "euro" | "Euro" => "€",
        _ => return None,
    };
    Some(text.to_string())
}

/// Parse the `bfchar` and `bfrange` sections of a ToUnicode CMap.
pub(crate) fn parse_cmap(data: &[u8]) -> HashMap<u32, String> {
    let tokens = tokenize_cmap(&String::from_utf8_lossy(data));
    let mut map = HashMap::new();
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i].as_str() {
            "beginbfchar" => {
                i += 1;
                while i + 1 < tokens.len() && tokens[i] != "endbfchar" {
                    if let (Some(src), Some(dst)) = (hex_code(&tokens[i]), hex_text(&tokens[i + 1])) {
                        map.insert(src, dst);
                    }
                    i += 2;
                }
            }
            "beginbfrange" => {
                i += 1;
                while i + 2 < tokens.len() && tokens[i] != "endbfrange" {
                    let (Some(lo), Some(hi)) = (hex_code(&tokens[i]), hex_code(&tokens[i + 1])) else {
                        i += 1;
                        continue;
                    };
                    if tokens[i + 2] == "[" {
                        let mut j = i + 3;
                        let mut code = lo;
                        while j < tokens.len() && tokens[j] != "]" {
                            if let Some(text) = hex_text(&tokens[j]) {
                                map.insert(code, text);
                            }
                            code += 1;
                            j += 1;
                        }
                        i = j + 1;
                    } else {
                        if let Some(base) = hex_units(&tokens[i + 2]) {
                            for (offset, code) in (lo..=hi).enumerate() {
                                let mut units = base.clone();
                                if let Some(last) = units.last_mut() {
                                    *last = last.wrapping_add(offset as u16);
                                }
                                map.insert(code, String::from_utf16_lossy(&units));
                            }
                        }
                        i += 3;
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    map
}

fn tokenize_cmap(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' => {
                let mut hex = String::from("<");
                for h in chars.by_ref() {
                    if h == '>' {
                        break;
                    }
                    if !h.is_whitespace() {
                        hex.push(h);
                    }
                }
                tokens.push(hex);
            }
            '[' | ']' => tokens.push(c.to_string()),
            '%' => {
                for n in chars.by_ref() {
                    if n == '\n' || n == '\r' {
                        break;
                    }
                }
            }
            c if c.is_whitespace() => {}
            c => {
                let mut word = c.to_string();
                while let Some(&n) = chars.peek() {
                    if n.is_whitespace() || matches!(n, '<' | '[' | ']') {
                        break;
                    }
                    word.push(n);
                    chars.next();
                }
                tokens.push(word);
            }
        }
    }
    tokens
}

fn hex_code(token: &str) -> Option<u32> {
    u32::from_str_radix(token.strip_prefix('<')?, 16).ok()
}

fn hex_units(token: &str) -> Option<Vec<u16>> {
    let hex = token.strip_prefix('<')?;
    if hex.is_empty() || hex.len() % 4 != 0 {
        // Single-byte destinations are rare but legal.
        return u16::from_str_radix(hex, 16).ok().map(|u| vec![u]);
    }
    (0..hex.len())
        .step_by(4)
        .map(|i| u16::from_str_radix(&hex[i..i + 4], 16).ok())
        .collect()
}

fn hex_text(token: &str) -> Option<String> {
    hex_units(token).map(|units| String::from_utf16_lossy(&units))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cmap_chars_and_ranges() {
        let cmap = b"/CIDInit /ProcSet findresource begin
            2 beginbfchar
            <0003> <0020>
            <0024> <00E9>
            endbfchar
            2 beginbfrange
            <0010> <0012> <0041>
            <0020> <0021> [<0046> <0069>]
            endbfrange
            endcmap";
        let map = parse_cmap(cmap);
        assert_eq!(map.get(&0x03).map(String::as_str), Some(" "));
        assert_eq!(map.get(&0x24).map(String::as_str), Some("é"));
        assert_eq!(map.get(&0x12).map(String::as_str), Some("C"));
        assert_eq!(map.get(&0x21).map(String::as_str), Some("i"));
    }

    #[test]
    fn test_win_ansi_decoding() {
        let font = Font {
            default_width: DEFAULT_WIDTH,
            ..Font::default()
        };
        let decoded = font.decode(b"N\xb0 \x80");
        let text: String = decoded.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(text, "N° €");
        assert!(decoded[2].is_space);
        assert_eq!(decoded[0].width, 0.5);
    }

    #[test]
    fn test_glyph_names() {
        assert_eq!(glyph_name_to_text("uni00E9").as_deref(), Some("é"));
        assert_eq!(glyph_name_to_text("degree").as_deref(), Some("°"));
        assert_eq!(glyph_name_to_text("A").as_deref(), Some("A"));
        assert_eq!(glyph_name_to_text("g123"), None);
    }
}
