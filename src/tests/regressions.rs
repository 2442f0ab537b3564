use super::*;

#[test]
fn setext_over_paragraph_then_text() {
    html("Foo\n---\nbar\n", "<h2>Foo</h2>\n<p>bar</p>\n");
}

#[test]
fn emphasis_across_softbreak() {
    html("*foo\nbar*\n", "<p><em>foo\nbar</em></p>\n");
}

#[test]
fn heading_trailing_spaces_trimmed() {
    html("# foo  \n", "<h1>foo</h1>\n");
}

#[test]
fn heading_contains_inlines() {
    html(
        "# [a](/u) *b*\n",
        "<h1><a href=\"/u\">a</a> <em>b</em></h1>\n",
    );
}

#[test]
fn emphasis_with_quoted_interior() {
    html(
        "**foo \"*bar*\" foo**\n",
        "<p><strong>foo &quot;<em>bar</em>&quot; foo</strong></p>\n",
    );
}

#[test]
fn adjacent_text_nodes_merge() {
    use crate::nodes::NodeValue;
    use crate::{parse_document, Options, Tree};

    let mut tree = Tree::new();
    let root = parse_document(&mut tree, "ab]c\n", &Options::default());

    let paragraph = tree.first_child(root).unwrap();
    let children: Vec<_> = tree.children(paragraph).collect();
    assert_eq!(children.len(), 1);
    assert_eq!(
        tree.ast(children[0]).value,
        NodeValue::Text("ab]c".to_string())
    );
}

#[test]
fn blockquote_trailing_blank_line() {
    html(
        "> foo\n\nbar\n",
        "<blockquote>\n<p>foo</p>\n</blockquote>\n<p>bar</p>\n",
    );
}

#[test]
fn interior_blank_line_splits_paragraphs() {
    html("a\n   \nb\n", "<p>a</p>\n<p>b</p>\n");
}

#[test]
fn multiple_spaces_preserved_in_text() {
    html("a  b\n", "<p>a  b</p>\n");
}

#[test]
fn fence_inside_blockquote() {
    html(
        "> ```\n> foo\n> ```\n",
        "<blockquote>\n<pre><code>foo\n</code></pre>\n</blockquote>\n",
    );
}

#[test]
fn hardbreak_not_at_paragraph_end() {
    html("foo  \n", "<p>foo</p>\n");
}

#[test]
fn strong_swallows_odd_interior_star() {
    // Matches the conformance corpus: the interior "*" cannot pair with
    // either "**" run (sum-of-lengths multiple of 3), so the outer runs
    // match each other and the "*" stays literal.
    html("**foo*bar**\n", "<p><strong>foo*bar</strong></p>\n");
}

#[test]
fn comment_block_closed_midline_then_paragraph() {
    html(
        "<!-- a\n\nok --> x\ny\n",
        "<!-- a\n\nok --> x\n<p>y</p>\n",
    );
}

#[test]
fn link_reference_inside_blockquote() {
    html(
        "> [foo]\n>\n> [foo]: /url\n",
        "<blockquote>\n<p><a href=\"/url\">foo</a></p>\n</blockquote>\n",
    );
}
