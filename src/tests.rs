mod api;
mod code;
mod links;
mod lists;
mod pathological;
mod regressions;

use crate::{markdown_to_html, Options};

#[track_caller]
pub fn html(input: &str, expected: &str) {
    html_opts_i(input, expected, |_| ());
}

#[track_caller]
pub fn html_opts_i<F>(input: &str, expected: &str, opts: F)
where
    F: Fn(&mut Options),
{
    let mut options = Options::default();
    opts(&mut options);

    let output = markdown_to_html(input, &options);
    pretty_assertions::assert_eq!(output, expected);
}

macro_rules! html_opts {
    ([$($optclass:ident.$optname:ident),*], $lhs:expr, $rhs:expr $(,)?) => {
        crate::tests::html_opts_i($lhs, $rhs, |opts| {
            $(opts.$optclass.$optname = true;)*
        })
    };
}

pub(crate) use html_opts;
