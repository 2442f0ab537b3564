/// Umbrella options struct.
#[derive(Default, Debug, Clone)]
pub struct Options {
    /// Options affecting parsing.
    pub parse: ParseOptions,
    /// Options affecting rendering.
    pub render: RenderOptions,
}

/// Options for parser functions.
#[derive(Default, Debug, Clone)]
pub struct ParseOptions {
    /// The default info string for fenced code blocks.
    ///
    /// ```
    /// # use cormark::{markdown_to_html, Options};
    /// let mut options = Options::default();
    /// assert_eq!(markdown_to_html("```\nfn hello();\n```\n", &options),
    ///            "<pre><code>fn hello();\n</code></pre>\n");
    ///
    /// options.parse.default_info_string = Some("rust".into());
    /// assert_eq!(markdown_to_html("```\nfn hello();\n```\n", &options),
    ///            "<pre><code class=\"language-rust\">fn hello();\n</code></pre>\n");
    /// ```
    pub default_info_string: Option<String>,
}

/// Options for formatter functions.
#[derive(Default, Debug, Clone)]
pub struct RenderOptions {
    /// [Soft line breaks](https://spec.commonmark.org/0.30/#soft-line-breaks)
    /// in the input translate into hard line breaks in the output.
    ///
    /// ```
    /// # use cormark::{markdown_to_html, Options};
    /// let mut options = Options::default();
    /// assert_eq!(markdown_to_html("Hello.\nWorld.\n", &options),
    ///            "<p>Hello.\nWorld.</p>\n");
    ///
    /// options.render.hardbreaks = true;
    /// assert_eq!(markdown_to_html("Hello.\nWorld.\n", &options),
    ///            "<p>Hello.<br />\nWorld.</p>\n");
    /// ```
    pub hardbreaks: bool,
}
