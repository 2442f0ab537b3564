//! Recognizers for the grammar fragments the parsers dispatch on.
//!
//! Each function inspects the start of its input and either returns how many
//! bytes the construct occupies, or `None`. None of them allocate; callers
//! decide what to do with a match. Offsets follow the conventions of the
//! call sites in `parser`: the inline HTML scanners start just past the
//! byte(s) their caller already checked.

use crate::ctype::{isalnum, isalpha, isspace};
use crate::strings::{is_line_end_char, is_space_or_tab};

/// Which underline character closed a setext heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetextChar {
    Equals,
    Hyphen,
}

/// Which grammar matched inside an autolink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutolinkType {
    Uri,
    Email,
}

fn is_tag_name_char(ch: u8) -> bool {
    isalnum(ch) || ch == b'-'
}

fn to_lower(ch: u8) -> u8 {
    ch.to_ascii_lowercase()
}

fn starts_with_ignore_case(s: &[u8], prefix: &[u8]) -> bool {
    s.len() >= prefix.len()
        && s.iter()
            .zip(prefix.iter())
            .all(|(&a, &b)| to_lower(a) == b)
}

fn find(s: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || s.len() < needle.len() {
        return None;
    }
    (0..=s.len() - needle.len()).find(|&i| &s[i..i + needle.len()] == needle)
}

fn contains_ignore_case(s: &[u8], needle: &[u8]) -> bool {
    if s.len() < needle.len() {
        return false;
    }
    (0..=s.len() - needle.len())
        .any(|i| starts_with_ignore_case(&s[i..], needle))
}

/// `#{1,6}` followed by spaces, tabs, or the end of the line. Consumes any
/// spaces and tabs after the marker.
pub fn atx_heading_start(s: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i < s.len() && s[i] == b'#' {
        i += 1;
    }
    if i == 0 || i > 6 {
        return None;
    }
    match s.get(i) {
        None => Some(i),
        Some(&c) if is_line_end_char(c) => Some(i),
        Some(&c) if is_space_or_tab(c) => {
            while i < s.len() && is_space_or_tab(s[i]) {
                i += 1;
            }
            Some(i)
        }
        _ => None,
    }
}

/// A setext underline: a run of `=` or `-`, then only spaces and tabs to the
/// end of the line.
pub fn setext_heading_line(s: &[u8]) -> Option<SetextChar> {
    let ch = *s.first()?;
    if ch != b'=' && ch != b'-' {
        return None;
    }
    let mut i = 0;
    while i < s.len() && s[i] == ch {
        i += 1;
    }
    while i < s.len() && is_space_or_tab(s[i]) {
        i += 1;
    }
    match s.get(i) {
        None => {}
        Some(&c) if is_line_end_char(c) => {}
        _ => return None,
    }
    if ch == b'=' {
        Some(SetextChar::Equals)
    } else {
        Some(SetextChar::Hyphen)
    }
}

/// An opening code fence: three or more backticks or tildes. For backtick
/// fences the rest of the line (the info string) may not contain a backtick.
/// Returns the length of the fence run only.
pub fn open_code_fence(s: &[u8]) -> Option<usize> {
    let ch = *s.first()?;
    if ch != b'`' && ch != b'~' {
        return None;
    }
    let mut i = 0;
    while i < s.len() && s[i] == ch {
        i += 1;
    }
    if i < 3 {
        return None;
    }
    if ch == b'`' {
        let mut j = i;
        while j < s.len() && !is_line_end_char(s[j]) {
            if s[j] == b'`' {
                return None;
            }
            j += 1;
        }
    }
    Some(i)
}

/// A closing code fence: a run of the fence character, then only spaces and
/// tabs to the end of the line. The caller compares the run length against
/// the opener.
pub fn close_code_fence(s: &[u8]) -> Option<usize> {
    let ch = *s.first()?;
    if ch != b'`' && ch != b'~' {
        return None;
    }
    let mut i = 0;
    while i < s.len() && s[i] == ch {
        i += 1;
    }
    if i < 3 {
        return None;
    }
    let fence_len = i;
    while i < s.len() && is_space_or_tab(s[i]) {
        i += 1;
    }
    match s.get(i) {
        None => Some(fence_len),
        Some(&c) if is_line_end_char(c) => Some(fence_len),
        _ => None,
    }
}

// The names that open a type 6 HTML block. Sorted for binary search.
const BLOCK_TAG_NAMES: [&str; 63] = [
    "address",
    "article",
    "aside",
    "base",
    "basefont",
    "blockquote",
    "body",
    "caption",
    "center",
    "col",
    "colgroup",
    "dd",
    "details",
    "dialog",
    "dir",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "frame",
    "frameset",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "head",
    "header",
    "hr",
    "html",
    "iframe",
    "legend",
    "li",
    "link",
    "main",
    "menu",
    "menuitem",
    "nav",
    "noframes",
    "ol",
    "optgroup",
    "option",
    "p",
    "param",
    "section",
    "source",
    "summary",
    "table",
    "tbody",
    "td",
    "template",
    "tfoot",
    "th",
    "thead",
    "title",
    "tr",
    "track",
    "ul",
];

// Tag names with a text end condition (type 1 blocks).
const TEXT_TAG_NAMES: [&str; 4] = ["pre", "script", "style", "textarea"];

fn scan_tag_name(s: &[u8]) -> Option<usize> {
    if s.is_empty() || !isalpha(s[0]) {
        return None;
    }
    let mut i = 1;
    while i < s.len() && is_tag_name_char(s[i]) {
        i += 1;
    }
    Some(i)
}

fn tag_name_in(s: &[u8], names: &[&str]) -> bool {
    let lower: Vec<u8> = s.iter().map(|&c| to_lower(c)).collect();
    names
        .binary_search_by(|probe| probe.as_bytes().cmp(&lower[..]))
        .is_ok()
}

fn tag_boundary(c: Option<&u8>) -> bool {
    match c {
        None => true,
        Some(&c) => is_line_end_char(c) || is_space_or_tab(c) || c == b'>',
    }
}

/// Checks `s` (starting at `<`) against HTML block start conditions 1
/// through 6, returning the matching block type.
pub fn html_block_start(s: &[u8]) -> Option<u8> {
    if !s.starts_with(b"<") {
        return None;
    }

    if s.starts_with(b"<!--") {
        return Some(2);
    }
    if s.starts_with(b"<?") {
        return Some(3);
    }
    if s.starts_with(b"<![CDATA[") {
        return Some(5);
    }
    if s.len() >= 3 && s[1] == b'!' && s[2].is_ascii_uppercase() {
        return Some(4);
    }

    for name in &TEXT_TAG_NAMES {
        if starts_with_ignore_case(&s[1..], name.as_bytes()) {
            let rest = &s[1 + name.len()..];
            if tag_boundary(rest.first()) {
                return Some(1);
            }
        }
    }

    let body = if s.len() >= 2 && s[1] == b'/' {
        &s[2..]
    } else {
        &s[1..]
    };
    let name_len = scan_tag_name(body)?;
    if !tag_name_in(&body[..name_len], &BLOCK_TAG_NAMES) {
        return None;
    }
    let rest = &body[name_len..];
    if tag_boundary(rest.first()) || rest.starts_with(b"/>") {
        return Some(6);
    }

    None
}

/// HTML block start condition 7: a complete open or closing tag, alone on
/// its line. Open tags named `pre`, `script`, `style` or `textarea` don't
/// qualify; those open type 1 blocks instead.
pub fn html_block_start_7(s: &[u8]) -> Option<u8> {
    if !s.starts_with(b"<") {
        return None;
    }
    let len = if s.len() >= 2 && s[1] == b'/' {
        html_close_tag(&s[1..])? + 1
    } else {
        let name_len = scan_tag_name(&s[1..])?;
        if tag_name_in(&s[1..1 + name_len], &TEXT_TAG_NAMES) {
            return None;
        }
        html_open_tag(&s[1..])? + 1
    };
    let mut i = len;
    while i < s.len() && is_space_or_tab(s[i]) {
        i += 1;
    }
    match s.get(i) {
        None => Some(7),
        Some(&c) if is_line_end_char(c) => Some(7),
        _ => None,
    }
}

pub fn html_block_end_1(s: &[u8]) -> bool {
    contains_ignore_case(s, b"</script>")
        || contains_ignore_case(s, b"</pre>")
        || contains_ignore_case(s, b"</style>")
        || contains_ignore_case(s, b"</textarea>")
}

pub fn html_block_end_2(s: &[u8]) -> bool {
    find(s, b"-->").is_some()
}

pub fn html_block_end_3(s: &[u8]) -> bool {
    find(s, b"?>").is_some()
}

pub fn html_block_end_4(s: &[u8]) -> bool {
    s.contains(&b'>')
}

pub fn html_block_end_5(s: &[u8]) -> bool {
    find(s, b"]]>").is_some()
}

fn scan_attribute(s: &[u8]) -> Option<usize> {
    // Leading whitespace is required before each attribute.
    let mut i = 0;
    while i < s.len() && isspace(s[i]) {
        i += 1;
    }
    if i == 0 {
        return None;
    }
    if i >= s.len() || !(isalpha(s[i]) || s[i] == b'_' || s[i] == b':') {
        return None;
    }
    i += 1;
    while i < s.len() && (isalnum(s[i]) || matches!(s[i], b':' | b'.' | b'_' | b'-')) {
        i += 1;
    }

    // Optional value specification.
    let mut j = i;
    while j < s.len() && isspace(s[j]) {
        j += 1;
    }
    if j >= s.len() || s[j] != b'=' {
        return Some(i);
    }
    j += 1;
    while j < s.len() && isspace(s[j]) {
        j += 1;
    }
    match s.get(j) {
        Some(&q) if q == b'"' || q == b'\'' => {
            j += 1;
            while j < s.len() && s[j] != q {
                j += 1;
            }
            if j >= s.len() {
                return Some(i);
            }
            Some(j + 1)
        }
        Some(&c) if !isspace(c) && !matches!(c, b'"' | b'\'' | b'=' | b'<' | b'>' | b'`') => {
            let mut k = j;
            while k < s.len()
                && !isspace(s[k])
                && !matches!(s[k], b'"' | b'\'' | b'=' | b'<' | b'>' | b'`')
            {
                k += 1;
            }
            Some(k)
        }
        _ => Some(i),
    }
}

fn html_open_tag(s: &[u8]) -> Option<usize> {
    // `s` starts at the tag name.
    let mut i = scan_tag_name(s)?;
    loop {
        match scan_attribute(&s[i..]) {
            Some(n) => i += n,
            None => break,
        }
    }
    while i < s.len() && isspace(s[i]) {
        i += 1;
    }
    if i < s.len() && s[i] == b'/' {
        i += 1;
    }
    if i < s.len() && s[i] == b'>' {
        Some(i + 1)
    } else {
        None
    }
}

fn html_close_tag(s: &[u8]) -> Option<usize> {
    // `s` starts at the slash.
    if !s.starts_with(b"/") {
        return None;
    }
    let mut i = 1 + scan_tag_name(&s[1..])?;
    while i < s.len() && isspace(s[i]) {
        i += 1;
    }
    if i < s.len() && s[i] == b'>' {
        Some(i + 1)
    } else {
        None
    }
}

/// An inline open or closing tag. `s` starts just past the `<`; the length
/// returned runs through the closing `>`.
pub fn html_tag(s: &[u8]) -> Option<usize> {
    if s.starts_with(b"/") {
        html_close_tag(s)
    } else {
        html_open_tag(s)
    }
}

/// An inline comment body. `s` starts at the first `-` (just past `<!`);
/// the length returned runs through the closing `>`. The empty forms
/// `<!-->` and `<!--->` are handled at the call site.
pub fn html_comment(s: &[u8]) -> Option<usize> {
    if !s.starts_with(b"--") {
        return None;
    }
    let j = find(&s[2..], b"--").map(|p| p + 2)?;
    if s.get(j + 2) != Some(&b'>') {
        return None;
    }
    let text = &s[2..j];
    if text.starts_with(b">") || text.starts_with(b"->") || text.ends_with(b"-") {
        return None;
    }
    Some(j + 3)
}

/// An inline processing instruction body. `s` starts just past the `?`;
/// returns the length of the text before the closing `?>`, which may be
/// zero.
pub fn html_processing_instruction(s: &[u8]) -> Option<usize> {
    find(s, b"?>")
}

/// An inline declaration body. `s` starts just past the `!`; returns the
/// index of the closing `>`.
pub fn html_declaration(s: &[u8]) -> Option<usize> {
    if s.is_empty() || !isalpha(s[0]) {
        return None;
    }
    s.iter().position(|&c| c == b'>')
}

/// An inline CDATA section body. `s` starts just past the `![`; returns the
/// index of the terminating `]]>`.
pub fn html_cdata(s: &[u8]) -> Option<usize> {
    if !s.starts_with(b"CDATA[") {
        return None;
    }
    find(s, b"]]>")
}

/// A URI autolink. `s` starts just past the `<`; the length returned
/// includes the closing `>`.
pub fn autolink_uri(s: &[u8]) -> Option<usize> {
    if s.is_empty() || !isalpha(s[0]) {
        return None;
    }
    let mut i = 1;
    while i < s.len() && i < 32 && (isalnum(s[i]) || matches!(s[i], b'.' | b'+' | b'-')) {
        i += 1;
    }
    if i < 2 || i >= s.len() || s[i] != b':' {
        return None;
    }
    i += 1;
    while i < s.len() {
        match s[i] {
            b'>' => return Some(i + 1),
            b'<' => return None,
            c if c <= 0x20 => return None,
            _ => i += 1,
        }
    }
    None
}

/// An email autolink. `s` starts just past the `<`; the length returned
/// includes the closing `>`.
pub fn autolink_email(s: &[u8]) -> Option<usize> {
    fn is_local_char(c: u8) -> bool {
        isalnum(c)
            || matches!(
                c,
                b'.' | b'!'
                    | b'#'
                    | b'$'
                    | b'%'
                    | b'&'
                    | b'\''
                    | b'*'
                    | b'+'
                    | b'/'
                    | b'='
                    | b'?'
                    | b'^'
                    | b'_'
                    | b'`'
                    | b'{'
                    | b'|'
                    | b'}'
                    | b'~'
                    | b'-'
            )
    }

    fn scan_label(s: &[u8]) -> Option<usize> {
        if s.is_empty() || !isalnum(s[0]) {
            return None;
        }
        let mut i = 1;
        let mut last_alnum = 0;
        while i < s.len() && i <= 62 && (isalnum(s[i]) || s[i] == b'-') {
            if isalnum(s[i]) {
                last_alnum = i;
            }
            i += 1;
        }
        Some(last_alnum + 1)
    }

    let mut i = 0;
    while i < s.len() && is_local_char(s[i]) {
        i += 1;
    }
    if i == 0 || i >= s.len() || s[i] != b'@' {
        return None;
    }
    i += 1;

    i += scan_label(&s[i..])?;
    while i < s.len() && s[i] == b'.' {
        let n = scan_label(&s[i + 1..])?;
        i += 1 + n;
    }

    if i < s.len() && s[i] == b'>' {
        Some(i + 1)
    } else {
        None
    }
}

/// A link title in any of its three delimiter styles, with backslash
/// escapes. Returns the full delimited length.
pub fn link_title(s: &[u8]) -> Option<usize> {
    let open = *s.first()?;
    let close = match open {
        b'"' => b'"',
        b'\'' => b'\'',
        b'(' => b')',
        _ => return None,
    };
    let mut i = 1;
    while i < s.len() {
        match s[i] {
            b'\\' if i + 1 < s.len() && crate::ctype::ispunct(s[i + 1]) => i += 2,
            c if c == close => return Some(i + 1),
            // A parenthesized title may not contain an unescaped `(`.
            b'(' if open == b'(' => return None,
            b'\0' => return None,
            _ => i += 1,
        }
    }
    None
}

/// A run of whitespace, including line endings.
pub fn spacechars(s: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i < s.len() && isspace(s[i]) {
        i += 1;
    }
    if i > 0 {
        Some(i)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atx() {
        assert_eq!(atx_heading_start(b"# foo"), Some(2));
        assert_eq!(atx_heading_start(b"###   foo"), Some(6));
        assert_eq!(atx_heading_start(b"######\n"), Some(6));
        assert_eq!(atx_heading_start(b"#######"), None);
        assert_eq!(atx_heading_start(b"#foo"), None);
        assert_eq!(atx_heading_start(b"#"), Some(1));
    }

    #[test]
    fn setext() {
        assert_eq!(setext_heading_line(b"===\n"), Some(SetextChar::Equals));
        assert_eq!(setext_heading_line(b"-"), Some(SetextChar::Hyphen));
        assert_eq!(setext_heading_line(b"--  \n"), Some(SetextChar::Hyphen));
        assert_eq!(setext_heading_line(b"== =\n"), None);
        assert_eq!(setext_heading_line(b"=a\n"), None);
    }

    #[test]
    fn fences() {
        assert_eq!(open_code_fence(b"```\n"), Some(3));
        assert_eq!(open_code_fence(b"````rust\n"), Some(4));
        assert_eq!(open_code_fence(b"~~~ info with ` tick\n"), Some(3));
        assert_eq!(open_code_fence(b"``` with ` tick\n"), None);
        assert_eq!(open_code_fence(b"``\n"), None);
        assert_eq!(close_code_fence(b"```   \n"), Some(3));
        assert_eq!(close_code_fence(b"``` x\n"), None);
    }

    #[test]
    fn html_blocks() {
        assert_eq!(html_block_start(b"<pre>"), Some(1));
        assert_eq!(html_block_start(b"<SCRIPT src=x>"), Some(1));
        assert_eq!(html_block_start(b"<!-- comment"), Some(2));
        assert_eq!(html_block_start(b"<?php"), Some(3));
        assert_eq!(html_block_start(b"<!DOCTYPE html>"), Some(4));
        assert_eq!(html_block_start(b"<![CDATA[x"), Some(5));
        assert_eq!(html_block_start(b"<div class=x>"), Some(6));
        assert_eq!(html_block_start(b"</table>"), Some(6));
        // First and last of the sorted tag name list.
        assert_eq!(html_block_start(b"<address>"), Some(6));
        assert_eq!(html_block_start(b"<UL"), Some(6));
        assert_eq!(html_block_start(b"<madeup>"), None);
        assert_eq!(html_block_start_7(b"<a href=\"x\">\n"), Some(7));
        assert_eq!(html_block_start_7(b"<a href=\"x\"> y\n"), None);
        assert_eq!(html_block_start_7(b"</pre>\n"), Some(7));
        assert_eq!(html_block_start_7(b"<pre>\n"), None);
    }

    #[test]
    fn inline_tags() {
        assert_eq!(html_tag(b"a>"), Some(2));
        assert_eq!(html_tag(b"a-b data-x=\"1\" >"), Some(16));
        assert_eq!(html_tag(b"br/>"), Some(4));
        assert_eq!(html_tag(b"/div >"), Some(6));
        assert_eq!(html_tag(b"a href='x\ny'>"), Some(13));
        assert_eq!(html_tag(b"33>"), None);
        assert_eq!(html_tag(b"a href=<>"), None);
        assert_eq!(html_comment(b"-- hi -->"), Some(9));
        assert_eq!(html_comment(b"--hi--x-->"), None);
        assert_eq!(html_processing_instruction(b"php ?> rest"), Some(4));
        assert_eq!(html_declaration(b"DOCTYPE html> rest"), Some(12));
        assert_eq!(html_cdata(b"CDATA[>&<]]> rest"), Some(9));
    }

    #[test]
    fn autolinks() {
        assert_eq!(autolink_uri(b"http://example.com>"), Some(19));
        assert_eq!(autolink_uri(b"made-up.scheme:x>"), Some(17));
        assert_eq!(autolink_uri(b"http://has space>"), None);
        assert_eq!(autolink_uri(b"mk:no>"), Some(6));
        // A scheme needs at least two characters.
        assert_eq!(autolink_uri(b"a:no>"), None);
        assert_eq!(autolink_email(b"foo@bar.example.com>"), Some(20));
        assert_eq!(autolink_email(b"foo@bar>"), Some(8));
        assert_eq!(autolink_email(b"foo@bar->"), None);
        assert_eq!(autolink_email(b"foo@@bar>"), None);
    }

    #[test]
    fn titles() {
        assert_eq!(link_title(b"\"title\" rest"), Some(7));
        assert_eq!(link_title(b"'title'"), Some(7));
        assert_eq!(link_title(b"(title)"), Some(7));
        assert_eq!(link_title(b"\"ti\\\"tle\""), Some(9));
        assert_eq!(link_title(b"(ti(tle)"), None);
        assert_eq!(link_title(b"\"unterminated"), None);
    }
}
