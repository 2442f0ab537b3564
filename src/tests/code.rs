use super::*;

#[test]
fn codefence() {
    html(
        concat!("``` rust yum\n", "fn main<'a>();\n", "```\n"),
        concat!(
            "<pre><code class=\"language-rust\">fn main&lt;'a&gt;();\n",
            "</code></pre>\n"
        ),
    );
}

#[test]
fn codefence_tilde() {
    html(
        "~~~\nfoo\n~~~\n",
        concat!("<pre><code>foo\n", "</code></pre>\n"),
    );
}

#[test]
fn codefence_unclosed_runs_to_document_end() {
    html(
        "```\nfoo\n",
        concat!("<pre><code>foo\n", "</code></pre>\n"),
    );
}

#[test]
fn codefence_empty() {
    html("```\n```\n", "<pre><code></code></pre>\n");
}

#[test]
fn codefence_closing_must_be_at_least_as_long() {
    html(
        "````\nfoo\n```\n````\n",
        concat!("<pre><code>foo\n", "```\n", "</code></pre>\n"),
    );
}

#[test]
fn codefence_contents_not_parsed() {
    html(
        "```\n*hi*\n[x]: y\n```\n",
        concat!("<pre><code>*hi*\n", "[x]: y\n", "</code></pre>\n"),
    );
}

#[test]
fn codefence_info_entity_and_escape() {
    html(
        "```a&amp;b\nx\n```\n",
        concat!(
            "<pre><code class=\"language-a&amp;b\">x\n",
            "</code></pre>\n"
        ),
    );
}

#[test]
fn indented_code_block() {
    html(
        "    foo\n    bar\n",
        concat!("<pre><code>foo\n", "bar\n", "</code></pre>\n"),
    );
}

#[test]
fn indented_code_trailing_blank_lines_removed() {
    html(
        "    foo\n\n\n",
        concat!("<pre><code>foo\n", "</code></pre>\n"),
    );
}

#[test]
fn indented_code_cannot_interrupt_paragraph() {
    html("foo\n    bar\n", "<p>foo\nbar</p>\n");
}

#[test]
fn code_span() {
    html("`foo`\n", "<p><code>foo</code></p>\n");
}

#[test]
fn code_span_stripping() {
    // A single leading and trailing space is stripped when both are present.
    html("` `` `\n", "<p><code>``</code></p>\n");
    html("`  ``  `\n", "<p><code> `` </code></p>\n");
}

#[test]
fn code_span_newline_normalized() {
    html("`foo\nbar`\n", "<p><code>foo bar</code></p>\n");
}

#[test]
fn code_span_unmatched() {
    html("`foo\n", "<p>`foo</p>\n");
    html("``foo`\n", "<p>``foo`</p>\n");
}

#[test]
fn code_span_backtick_run_matching() {
    html("``foo ` bar``\n", "<p><code>foo ` bar</code></p>\n");
}

#[test]
fn code_span_binds_tighter_than_emphasis() {
    html("*foo`*`\n", "<p>*foo<code>*</code></p>\n");
}

#[test]
fn default_info_string() {
    html_opts_i("```\nx\n```\n", "<pre><code>x\n</code></pre>\n", |_| ());
    html_opts_i(
        "```\nx\n```\n",
        "<pre><code class=\"language-rust\">x\n</code></pre>\n",
        |opts| opts.parse.default_info_string = Some("rust".to_string()),
    );
}
