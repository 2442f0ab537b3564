//! Small string helpers shared by the block and inline parsers.

use crate::ctype::{ispunct, isspace};
use crate::entity;
use crate::scanners::AutolinkType;
use std::str;

pub fn is_line_end_char(ch: u8) -> bool {
    matches!(ch, 10 | 13)
}

pub fn is_space_or_tab(ch: u8) -> bool {
    matches!(ch, 9 | 32)
}

/// Whether the rest of the line holds nothing but spaces and tabs.
pub fn is_blank(s: &[u8]) -> bool {
    for &c in s {
        match c {
            10 | 13 => return true,
            32 | 9 => (),
            _ => return false,
        }
    }
    true
}

/// Removes backslashes before ASCII punctuation, in place.
pub fn unescape(v: &mut Vec<u8>) {
    let mut w = 0;
    let mut r = 0;
    while r < v.len() {
        if v[r] == b'\\' && r + 1 < v.len() && ispunct(v[r + 1]) {
            r += 1;
        }
        v[w] = v[r];
        w += 1;
        r += 1;
    }
    v.truncate(w);
}

pub fn ltrim_slice(mut i: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = i {
        if isspace(*first) {
            i = rest;
        } else {
            break;
        }
    }
    i
}

pub fn rtrim_slice(mut i: &[u8]) -> &[u8] {
    while let [rest @ .., last] = i {
        if isspace(*last) {
            i = rest;
        } else {
            break;
        }
    }
    i
}

pub fn trim_slice(i: &[u8]) -> &[u8] {
    rtrim_slice(ltrim_slice(i))
}

/// Trims trailing whitespace off a `String`. Whitespace here is ASCII, so
/// the truncation point is always a char boundary.
pub fn rtrim(line: &mut String) {
    let spaces = line
        .as_bytes()
        .iter()
        .rev()
        .take_while(|&&b| isspace(b))
        .count();
    let new_len = line.len() - spaces;
    line.truncate(new_len);
}

/// Trims trailing whitespace off a `&str`, returning the prefix.
pub fn rtrimmed(line: &str) -> &str {
    let spaces = line
        .as_bytes()
        .iter()
        .rev()
        .take_while(|&&b| isspace(b))
        .count();
    &line[..line.len() - spaces]
}

/// Strips an ATX heading's optional closing sequence off `line`. The line
/// still includes the opening marker, so a line that is hashes all the way
/// to the start is left alone.
pub fn chop_trailing_hashtags(line: &str) -> &str {
    let line = rtrimmed(line);
    if line.is_empty() {
        return line;
    }

    let bytes = line.as_bytes();
    let orig_n = line.len() - 1;
    let mut n = orig_n;

    while bytes[n] == b'#' {
        if n == 0 {
            return line;
        }
        n -= 1;
    }

    if n != orig_n && is_space_or_tab(bytes[n]) {
        rtrimmed(&line[..n])
    } else {
        line
    }
}

/// Drops blank lines off the end of accumulated indented code content,
/// leaving the final line ending intact.
pub fn remove_trailing_blank_lines(line: &mut String) {
    let last_nonblank = line
        .as_bytes()
        .iter()
        .rposition(|&c| c != b' ' && c != b'\t' && !is_line_end_char(c));
    let i = match last_nonblank {
        Some(i) => i,
        None => {
            line.clear();
            return;
        }
    };

    let cut = line.as_bytes()[i..]
        .iter()
        .position(|&c| is_line_end_char(c))
        .map(|p| i + p);
    if let Some(cut) = cut {
        line.truncate(cut);
    }
}

/// Borrowing variant of [`remove_trailing_blank_lines`].
pub fn remove_trailing_blank_lines_slice(line: &str) -> &str {
    let last_nonblank = line
        .as_bytes()
        .iter()
        .rposition(|&c| c != b' ' && c != b'\t' && !is_line_end_char(c));
    let i = match last_nonblank {
        Some(i) => i,
        None => return "",
    };

    match line.as_bytes()[i..].iter().position(|&c| is_line_end_char(c)) {
        Some(p) => &line[..i + p],
        None => line,
    }
}

/// Counts the newlines in `s`, and the length of the content after the last
/// one.
pub fn count_newlines(s: &str) -> (usize, usize) {
    let mut nls = 0;
    let mut since_nl = 0;

    for &c in s.as_bytes() {
        if c == b'\n' {
            nls += 1;
            since_nl = 0;
        } else {
            since_nl += 1;
        }
    }

    (nls, since_nl)
}

/// Resolves entities and backslash escapes in a link destination.
pub fn clean_url(url: &[u8]) -> Vec<u8> {
    let url = trim_slice(url);
    if url.is_empty() {
        return vec![];
    }

    let mut b = entity::unescape_html(url);
    unescape(&mut b);
    b
}

/// Strips the delimiters off a link title and resolves entities and
/// escapes.
pub fn clean_title(title: &[u8]) -> Vec<u8> {
    let title_len = title.len();
    if title_len == 0 {
        return vec![];
    }

    let first = title[0];
    let last = title[title_len - 1];

    let mut b = if (first == b'\'' && last == b'\'')
        || (first == b'(' && last == b')')
        || (first == b'"' && last == b'"')
    {
        entity::unescape_html(&title[1..title_len - 1])
    } else {
        entity::unescape_html(title)
    };

    unescape(&mut b);
    b
}

/// Prepares an autolink destination, prefixing `mailto:` for bare email
/// addresses.
pub fn clean_autolink(url: &[u8], kind: AutolinkType) -> Vec<u8> {
    let url = trim_slice(url);
    if url.is_empty() {
        return vec![];
    }

    let mut buf = Vec::with_capacity(url.len());
    if kind == AutolinkType::Email {
        buf.extend_from_slice(b"mailto:");
    }
    buf.extend_from_slice(&entity::unescape_html(url));
    buf
}

/// Normalizes the interior of a code span: line endings become spaces, and
/// one space is stripped from both ends when the content has a non-space
/// character and both ends have one to give.
pub fn normalize_code(v: &[u8]) -> Vec<u8> {
    let mut r = Vec::with_capacity(v.len());
    let mut i = 0;
    let mut contains_nonspace = false;

    while i < v.len() {
        match v[i] {
            b'\r' => {
                if i + 1 == v.len() || v[i + 1] != b'\n' {
                    r.push(b' ');
                }
            }
            b'\n' => {
                r.push(b' ');
            }
            c => r.push(c),
        }
        if v[i] != b' ' && v[i] != b'\r' && v[i] != b'\n' {
            contains_nonspace = true;
        }

        i += 1;
    }

    if contains_nonspace && !r.is_empty() && r[0] == b' ' && r[r.len() - 1] == b' ' {
        r.remove(0);
        r.pop();
    }

    r
}

/// Normalizes a link label for reference-map keys: trim, collapse internal
/// whitespace runs to one space, Unicode case fold.
pub fn normalize_label(i: &str) -> String {
    // trim_slice only removes ASCII whitespace from the ends, so the result
    // is still UTF-8.
    let i = match str::from_utf8(trim_slice(i.as_bytes())) {
        Ok(i) => i,
        Err(_) => return String::new(),
    };

    let mut collapsed = String::with_capacity(i.len());
    let mut last_was_whitespace = false;
    for c in i.chars() {
        if c.is_whitespace() {
            if !last_was_whitespace {
                last_was_whitespace = true;
                collapsed.push(' ');
            }
        } else {
            last_was_whitespace = false;
            collapsed.push(c);
        }
    }

    caseless::default_case_fold_str(&collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_removes_escaping_backslashes() {
        let mut v = b"\\*hello\\_world \\\\ \\a".to_vec();
        unescape(&mut v);
        assert_eq!(v, b"*hello_world \\ \\a".to_vec());
    }

    #[test]
    fn normalize_code_strips_one_surrounding_space() {
        assert_eq!(normalize_code(b" foo "), b"foo".to_vec());
        assert_eq!(normalize_code(b"  foo  "), b" foo ".to_vec());
        assert_eq!(normalize_code(b"   "), b"   ".to_vec());
        assert_eq!(normalize_code(b"foo\nbar"), b"foo bar".to_vec());
        assert_eq!(normalize_code(b"foo\r\nbar"), b"foo bar".to_vec());
    }

    #[test]
    fn normalize_label_folds_and_collapses() {
        assert_eq!(normalize_label("  FoO \t Bar  "), "foo bar");
        assert_eq!(normalize_label("ΑΓΩ"), "αγω");
        assert_eq!(normalize_label("Toujours"), "toujours");
    }

    #[test]
    fn chop_hashtags() {
        assert_eq!(chop_trailing_hashtags("# foo ##"), "# foo");
        assert_eq!(chop_trailing_hashtags("# foo#"), "# foo#");
        assert_eq!(chop_trailing_hashtags("# foo ## b"), "# foo ## b");
        assert_eq!(chop_trailing_hashtags("###"), "###");
        assert_eq!(chop_trailing_hashtags("###     ###"), "###");
    }

    #[test]
    fn trailing_blank_lines() {
        let mut s = "foo\n   \n\t\n".to_string();
        remove_trailing_blank_lines(&mut s);
        assert_eq!(s, "foo");
        let mut s = "foo\nbar  \n\n".to_string();
        remove_trailing_blank_lines(&mut s);
        assert_eq!(s, "foo\nbar  ");
        let mut s = " \n \n".to_string();
        remove_trailing_blank_lines(&mut s);
        assert_eq!(s, "");
    }
}
