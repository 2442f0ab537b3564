use super::*;

#[test]
fn bullet_list() {
    html(
        "- Hello.\n- Hi.\n",
        concat!("<ul>\n", "<li>Hello.</li>\n", "<li>Hi.</li>\n", "</ul>\n"),
    );
}

#[test]
fn ordered_list_start() {
    html(
        "2. Hello.\n3. Hi.\n",
        concat!(
            "<ol start=\"2\">\n",
            "<li>Hello.</li>\n",
            "<li>Hi.</li>\n",
            "</ol>\n"
        ),
    );
}

#[test]
fn ordered_list_paren_delimiter() {
    html(
        "1) a\n2) b\n",
        concat!("<ol>\n", "<li>a</li>\n", "<li>b</li>\n", "</ol>\n"),
    );
}

#[test]
fn changing_marker_starts_new_list() {
    html(
        "- a\n* b\n",
        concat!(
            "<ul>\n",
            "<li>a</li>\n",
            "</ul>\n",
            "<ul>\n",
            "<li>b</li>\n",
            "</ul>\n"
        ),
    );
}

#[test]
fn loose_list() {
    html(
        "- a\n\n- b\n",
        concat!(
            "<ul>\n",
            "<li>\n",
            "<p>a</p>\n",
            "</li>\n",
            "<li>\n",
            "<p>b</p>\n",
            "</li>\n",
            "</ul>\n"
        ),
    );
}

#[test]
fn item_with_two_paragraphs_is_loose() {
    html(
        "- a\n\n  b\n- c\n",
        concat!(
            "<ul>\n",
            "<li>\n",
            "<p>a</p>\n",
            "<p>b</p>\n",
            "</li>\n",
            "<li>\n",
            "<p>c</p>\n",
            "</li>\n",
            "</ul>\n"
        ),
    );
}

#[test]
fn nested_list() {
    html(
        "- a\n  - b\n",
        concat!(
            "<ul>\n",
            "<li>a\n",
            "<ul>\n",
            "<li>b</li>\n",
            "</ul>\n",
            "</li>\n",
            "</ul>\n"
        ),
    );
}

#[test]
fn list_item_with_code_block() {
    html(
        "- a\n\n      code\n",
        concat!(
            "<ul>\n",
            "<li>\n",
            "<p>a</p>\n",
            "<pre><code>code\n",
            "</code></pre>\n",
            "</li>\n",
            "</ul>\n"
        ),
    );
}

#[test]
fn empty_list_item() {
    html(
        "- a\n-\n- b\n",
        concat!(
            "<ul>\n",
            "<li>a</li>\n",
            "<li></li>\n",
            "<li>b</li>\n",
            "</ul>\n"
        ),
    );
}

#[test]
fn ordered_list_interrupting_paragraph_must_start_at_one() {
    html("foo\n1. bar\n", "<p>foo</p>\n<ol>\n<li>bar</li>\n</ol>\n");
    html("foo\n2. bar\n", "<p>foo\n2. bar</p>\n");
}

#[test]
fn empty_item_cannot_interrupt_paragraph() {
    html("foo\n-\n", "<h2>foo</h2>\n");
}

#[test]
fn marker_padding_wide_indent_counts_as_one() {
    // Five or more spaces after the marker leaves the item content as an
    // indented code block offset from the marker itself.
    html(
        "-     code\n",
        concat!(
            "<ul>\n",
            "<li>\n",
            "<pre><code>code\n",
            "</code></pre>\n",
            "</li>\n",
            "</ul>\n"
        ),
    );
}

#[test]
fn blockquote_in_list() {
    html(
        "- > quoted\n",
        concat!(
            "<ul>\n",
            "<li>\n",
            "<blockquote>\n",
            "<p>quoted</p>\n",
            "</blockquote>\n",
            "</li>\n",
            "</ul>\n"
        ),
    );
}

#[test]
fn thematic_break_wins_over_bullet() {
    html(
        "* * *\n",
        "<hr />\n",
    );
}

#[test]
fn ordered_start_number_overflow_is_text() {
    html(
        "1234567890. nope\n",
        "<p>1234567890. nope</p>\n",
    );
}
