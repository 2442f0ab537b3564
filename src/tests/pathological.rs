use super::*;
use ntest::timeout;

// input: python3 -c 'n = 50000; print("*a_ " * n)'
#[test]
#[timeout(4000)]
fn pathological_emphases() {
    let n = 50_000;
    let input = "*a_ ".repeat(n);
    let mut exp = format!("<p>{}", input);
    // Right-most space is trimmed in output.
    exp.pop();
    exp += "</p>\n";

    html(&input, &exp);
}

#[test]
#[timeout(4000)]
fn pathological_nested_brackets() {
    let n = 50_000;
    let input = format!("{}a{}", "[".repeat(n), "]".repeat(n));
    let exp = format!("<p>{}</p>\n", input);

    html(&input, &exp);
}

#[test]
#[timeout(4000)]
fn pathological_link_closers_with_no_openers() {
    let n = 50_000;
    let input = "a]( ".repeat(n);
    let mut exp = format!("<p>{}", input);
    exp.pop();
    exp += "</p>\n";

    html(&input, &exp);
}

#[test]
#[timeout(4000)]
fn pathological_backticks() {
    let n = 10_000;
    let input = format!("{}{}", "e".repeat(n), "`a`".repeat(n));

    // Not interested in the actual html, just that we don't blow up.
    markdown_to_html(&input, &Options::default());
}

#[test]
#[timeout(4000)]
fn pathological_unclosed_inline_html() {
    let n = 10_000;
    let input = "<!- ".repeat(n);

    markdown_to_html(&input, &Options::default());
}

#[test]
#[timeout(4000)]
fn pathological_reference_definitions() {
    let n = 10_000;
    let input = format!("{}{}", "[a]: u\n".repeat(n), "[a] ".repeat(n));

    markdown_to_html(&input, &Options::default());
}

#[test]
#[timeout(4000)]
fn pathological_deeply_nested_lists() {
    // Nesting is capped, so this must neither recurse without bound nor go
    // quadratic.
    let mut input = String::new();
    for i in 0..1_000 {
        input += &format!("{}- a\n", "  ".repeat(i));
    }

    markdown_to_html(&input, &Options::default());
}

#[test]
#[timeout(4000)]
fn pathological_deeply_nested_blockquotes() {
    let n = 10_000;
    let input = format!("{}a\n", "> ".repeat(n));

    markdown_to_html(&input, &Options::default());
}
