use super::*;

#[test]
fn inline_link() {
    html(
        "[foo](/url)\n",
        "<p><a href=\"/url\">foo</a></p>\n",
    );
}

#[test]
fn inline_link_with_title() {
    html(
        "[foo](/url \"the title\")\n",
        "<p><a href=\"/url\" title=\"the title\">foo</a></p>\n",
    );
}

#[test]
fn inline_link_pointy_destination() {
    html(
        "[foo](</my url>)\n",
        "<p><a href=\"/my%20url\">foo</a></p>\n",
    );
}

#[test]
fn inline_link_balanced_parens() {
    html(
        "[foo](/url(a(b)c))\n",
        "<p><a href=\"/url(a(b)c)\">foo</a></p>\n",
    );
}

#[test]
fn inline_link_escapes_in_destination() {
    html(
        "[foo](/url\\(1\\))\n",
        "<p><a href=\"/url(1)\">foo</a></p>\n",
    );
}

#[test]
fn link_text_inlines() {
    html(
        "[*em* `code`](/url)\n",
        "<p><a href=\"/url\"><em>em</em> <code>code</code></a></p>\n",
    );
}

#[test]
fn links_do_not_nest() {
    html(
        "[foo [bar](/u)](/v)\n",
        "<p>[foo <a href=\"/u\">bar</a>](/v)</p>\n",
    );
}

#[test]
fn reference_link_full() {
    html(
        "[bar][foo]\n\n[foo]: /url \"t\"\n",
        "<p><a href=\"/url\" title=\"t\">bar</a></p>\n",
    );
}

#[test]
fn reference_link_collapsed() {
    html(
        "[foo][]\n\n[foo]: /url\n",
        "<p><a href=\"/url\">foo</a></p>\n",
    );
}

#[test]
fn reference_link_shortcut() {
    html(
        "[foo]\n\n[foo]: /url\n",
        "<p><a href=\"/url\">foo</a></p>\n",
    );
}

#[test]
fn reference_definition_produces_no_output() {
    html("[foo]: /url \"title\"\n", "");
}

#[test]
fn reference_labels_case_fold() {
    html(
        "[FOO]\n\n[foo]: /url\n",
        "<p><a href=\"/url\">FOO</a></p>\n",
    );
    html(
        "[ẞ]\n\n[SS]: /url\n",
        "<p><a href=\"/url\">ẞ</a></p>\n",
    );
}

#[test]
fn reference_first_definition_wins() {
    html(
        "[foo]\n\n[foo]: /first\n[foo]: /second\n",
        "<p><a href=\"/first\">foo</a></p>\n",
    );
}

#[test]
fn reference_label_whitespace_normalized() {
    html(
        "[foo  bar]\n\n[Foo\n  Bar]: /url\n",
        "<p><a href=\"/url\">foo  bar</a></p>\n",
    );
}

#[test]
fn undefined_reference_is_text() {
    html("[nope][nada]\n", "<p>[nope][nada]</p>\n");
}

#[test]
fn reference_definition_needs_colon() {
    html("[foo] /url\n", "<p>[foo] /url</p>\n");
}

#[test]
fn reference_definition_multiline() {
    html(
        "[foo]:\n   /url\n   \"title\"\n\n[foo]\n",
        "<p><a href=\"/url\" title=\"title\">foo</a></p>\n",
    );
}

#[test]
fn image() {
    html(
        "![alt text](/img.png \"t\")\n",
        "<p><img src=\"/img.png\" alt=\"alt text\" title=\"t\" /></p>\n",
    );
}

#[test]
fn image_alt_text_is_plain() {
    html(
        "![alt *em* `code`](/img.png)\n",
        "<p><img src=\"/img.png\" alt=\"alt em code\" /></p>\n",
    );
}

#[test]
fn image_reference() {
    html(
        "![alt][ref]\n\n[ref]: /img.png\n",
        "<p><img src=\"/img.png\" alt=\"alt\" /></p>\n",
    );
}

#[test]
fn bracket_without_destination_is_text() {
    html("[foo]\n", "<p>[foo]</p>\n");
    html("![foo]\n", "<p>![foo]</p>\n");
}

#[test]
fn link_destination_href_escaping() {
    html(
        "[a](/url?x='1'&y=\u{e9})\n",
        "<p><a href=\"/url?x=&#x27;1&#x27;&amp;y=%C3%A9\">a</a></p>\n",
    );
}
