//! HTML5 entity and numeric character reference decoding.

use std::char;
use std::cmp::min;
use std::str;

use crate::ctype::isdigit;

include!(concat!(env!("OUT_DIR"), "/entitydata.rs"));

fn isxdigit(ch: u8) -> bool {
    ch.is_ascii_hexdigit()
}

/// Tries to decode one character reference sitting at the start of `text`,
/// which begins just past the `&`. On success returns the replacement text
/// and the number of bytes consumed (including the closing `;`).
///
/// Decimal and hexadecimal references take at most eight digits; zero,
/// surrogate, and out-of-range code points decode to U+FFFD.
pub fn unescape(text: &[u8]) -> Option<(Vec<u8>, usize)> {
    if text.len() >= 3 && text[0] == b'#' {
        let mut codepoint: u32 = 0;
        let mut i = 0;

        let num_digits = if isdigit(text[1]) {
            i = 1;
            while i < text.len() && isdigit(text[i]) {
                codepoint = (codepoint * 10) + (text[i] - b'0') as u32;
                codepoint = min(codepoint, 0x11_0000);
                i += 1;
            }
            i - 1
        } else if text[1] == b'x' || text[1] == b'X' {
            i = 2;
            while i < text.len() && isxdigit(text[i]) {
                codepoint = (codepoint * 16) + (text[i] as char).to_digit(16).unwrap_or(0);
                codepoint = min(codepoint, 0x11_0000);
                i += 1;
            }
            i - 2
        } else {
            0
        };

        if (1..=8).contains(&num_digits) && i < text.len() && text[i] == b';' {
            if codepoint == 0 || (0xD800..=0xDFFF).contains(&codepoint) || codepoint >= 0x11_0000
            {
                codepoint = 0xFFFD;
            }
            let ch = char::from_u32(codepoint).unwrap_or('\u{FFFD}');
            let mut buf = [0u8; 4];
            return Some((ch.encode_utf8(&mut buf).as_bytes().to_vec(), i + 1));
        }

        return None;
    }

    let size = min(text.len(), entitydata::MAX_ENTITY_LENGTH + 1);
    for i in entitydata::MIN_ENTITY_LENGTH..size {
        if text[i] == b' ' {
            return None;
        }

        if text[i] == b';' {
            return lookup(&text[..i]).map(|e| (e.as_bytes().to_vec(), i + 1));
        }
    }

    None
}

fn lookup(name: &[u8]) -> Option<&'static str> {
    let name = str::from_utf8(name).ok()?;
    entitydata::ENTITIES.get(name).copied()
}

/// Decodes every character reference in `src`, leaving unmatched `&`s
/// alone.
pub fn unescape_html(src: &[u8]) -> Vec<u8> {
    let size = src.len();
    let mut i = 0;
    let mut v = Vec::with_capacity(size);

    while i < size {
        let org = i;
        while i < size && src[i] != b'&' {
            i += 1;
        }

        if i > org {
            if org == 0 && i >= size {
                return src.to_vec();
            }

            v.extend_from_slice(&src[org..i]);
        }

        if i >= size {
            return v;
        }

        i += 1;
        match unescape(&src[i..]) {
            Some((chs, consumed)) => {
                v.extend_from_slice(&chs);
                i += consumed;
            }
            None => v.push(b'&'),
        }
    }

    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unescaped(s: &str) -> String {
        String::from_utf8(unescape_html(s.as_bytes())).unwrap()
    }

    #[test]
    fn named_entities() {
        assert_eq!(unescaped("&amp;"), "&");
        assert_eq!(unescaped("&nbsp;"), "\u{a0}");
        assert_eq!(unescaped("&ouml;"), "ö");
        assert_eq!(unescaped("&copy; &MadeUpEntity;"), "© &MadeUpEntity;");
        // Without the terminating semicolon, no decode.
        assert_eq!(unescaped("&amp"), "&amp");
    }

    #[test]
    fn numeric_entities() {
        assert_eq!(unescaped("&#35;"), "#");
        assert_eq!(unescaped("&#1234;"), "\u{4d2}");
        assert_eq!(unescaped("&#X22;"), "\"");
        assert_eq!(unescaped("&#xcab;"), "\u{cab}");
    }

    #[test]
    fn invalid_numerics_become_replacement_char() {
        assert_eq!(unescaped("&#0;"), "\u{fffd}");
        assert_eq!(unescaped("&#xd800;"), "\u{fffd}");
        assert_eq!(unescaped("&#99999999;"), "\u{fffd}");
        // Nine digits is too many to be a reference at all.
        assert_eq!(unescaped("&#123456789;"), "&#123456789;");
    }
}
