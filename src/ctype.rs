/// C-style ASCII character classes, operating on bytes. The block grammar is
/// defined entirely in terms of these; Unicode classes only matter to the
/// inline flanking rules.

pub fn isspace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r')
}

pub fn ispunct(ch: u8) -> bool {
    matches!(ch,
        b'!'..=b'/' | b':'..=b'@' | b'['..=b'`' | b'{'..=b'~')
}

pub fn isdigit(ch: u8) -> bool {
    ch.is_ascii_digit()
}

pub fn isalpha(ch: u8) -> bool {
    ch.is_ascii_alphabetic()
}

pub fn isalnum(ch: u8) -> bool {
    ch.is_ascii_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punct_covers_ascii_symbol_ranges() {
        for ch in "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~".bytes() {
            assert!(ispunct(ch), "{:?}", ch as char);
        }
        assert!(!ispunct(b'a'));
        assert!(!ispunct(b' '));
        assert!(!ispunct(b'5'));
    }
}
