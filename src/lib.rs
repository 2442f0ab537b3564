//! A 100% [CommonMark](http://commonmark.org/) Markdown parser and HTML
//! renderer.
//!
//! The design is based on [cmark](https://github.com/github/cmark), so
//! familiarity with that will help.
//!
//! You can use `cormark::markdown_to_html` directly:
//!
//! ```
//! use cormark::{markdown_to_html, Options};
//! assert_eq!(markdown_to_html("Hello, **世界**!", &Options::default()),
//!            "<p>Hello, <strong>世界</strong>!</p>\n");
//! ```
//!
//! Or you can parse the input into an AST yourself, manipulate it, and then
//! use your desired formatter:
//!
//! ```
//! use cormark::{format_document, parse_document, Options, Tree};
//! use cormark::nodes::NodeValue;
//!
//! # fn main() -> std::io::Result<()> {
//! let mut tree = Tree::new();
//! let root = parse_document(
//!     &mut tree,
//!     "This is my input.\n\n1. Also [my](#) input.\n2. Certainly *my* input.\n",
//!     &Options::default(),
//! );
//!
//! for node in tree.descendants(root).collect::<Vec<_>>() {
//!     if let NodeValue::Text(ref mut text) = tree.ast_mut(node).value {
//!         *text = text.replace("my", "your");
//!     }
//! }
//!
//! let mut html = vec![];
//! format_document(&tree, root, &Options::default(), &mut html)?;
//!
//! assert_eq!(
//!     String::from_utf8(html).unwrap(),
//!     "<p>This is your input.</p>\n\
//!      <ol>\n\
//!      <li>Also <a href=\"#\">your</a> input.</li>\n\
//!      <li>Certainly <em>your</em> input.</li>\n\
//!      </ol>\n"
//! );
//! # Ok(())
//! # }
//! ```

mod character_set;
mod ctype;
mod entity;
pub mod html;
pub mod nodes;
mod parser;
mod scanners;
mod strings;
pub mod tree;

#[cfg(test)]
mod tests;

use std::io::BufWriter;

pub use crate::html::format_document;
pub use crate::parser::{
    parse_document, Options, ParseOptions, RenderOptions, ResolvedReference,
};
pub use crate::tree::{NodeId, Tree};

/// Renders Markdown to HTML.
pub fn markdown_to_html(md: &str, options: &Options) -> String {
    let mut tree = Tree::new();
    let root = parse_document(&mut tree, md, options);
    let mut bw = BufWriter::new(Vec::new());
    format_document(&tree, root, options, &mut bw).unwrap();
    String::from_utf8(bw.into_inner().unwrap()).unwrap()
}
