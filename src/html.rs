//! HTML renderering infrastructure for the document AST.

use std::cell::Cell;
use std::io::{self, Write};

use crate::character_set::character_set;
use crate::nodes::{ListType, NodeValue};
use crate::parser::Options;
use crate::tree::{NodeId, Tree};

/// Converts an AST to HTML, writing the result to `output`.
pub fn format_document(
    tree: &Tree,
    root: NodeId,
    options: &Options,
    output: &mut dyn Write,
) -> io::Result<()> {
    let mut writer = WriteWithLast {
        output,
        last_was_newline: Cell::new(true),
    };
    HtmlFormatter::new(tree, options, &mut writer).format(root, false)
}

struct WriteWithLast<'w> {
    output: &'w mut dyn Write,
    last_was_newline: Cell<bool>,
}

impl<'w> Write for WriteWithLast<'w> {
    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let l = buf.len();
        if l > 0 {
            self.last_was_newline.set(buf[l - 1] == b'\n');
        }
        self.output.write(buf)
    }
}

const NEEDS_ESCAPED: [bool; 256] = character_set!(b"\"&<>");

const HREF_SAFE: [bool; 256] = character_set!(
    b"-_.+!*(),%#@?=;:/,+$~",
    b"abcdefghijklmnopqrstuvwxyz",
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZ",
    b"0123456789"
);

/// Writes `buffer` to `output`, escaping `"`, `&`, `<` and `>`.
fn escape(output: &mut dyn Write, buffer: &[u8]) -> io::Result<()> {
    let mut offset = 0;
    for (i, &byte) in buffer.iter().enumerate() {
        if NEEDS_ESCAPED[byte as usize] {
            let esc: &[u8] = match byte {
                b'"' => b"&quot;",
                b'&' => b"&amp;",
                b'<' => b"&lt;",
                b'>' => b"&gt;",
                _ => unreachable!(),
            };
            output.write_all(&buffer[offset..i])?;
            output.write_all(esc)?;
            offset = i + 1;
        }
    }
    output.write_all(&buffer[offset..])?;
    Ok(())
}

/// Writes `buffer` to `output`, percent- or entity-escaping everything that
/// isn't in the URL-safe set.
fn escape_href(output: &mut dyn Write, buffer: &[u8]) -> io::Result<()> {
    let size = buffer.len();
    let mut i = 0;

    while i < size {
        let org = i;
        while i < size && HREF_SAFE[buffer[i] as usize] {
            i += 1;
        }

        if i > org {
            output.write_all(&buffer[org..i])?;
        }

        if i >= size {
            break;
        }

        match buffer[i] {
            b'&' => output.write_all(b"&amp;")?,
            b'\'' => output.write_all(b"&#x27;")?,
            _ => write!(output, "%{:02X}", buffer[i])?,
        }

        i += 1;
    }

    Ok(())
}

struct HtmlFormatter<'t, 'o, 'w, 'x> {
    tree: &'t Tree,
    options: &'o Options,
    output: &'w mut WriteWithLast<'x>,
}

enum Phase {
    Pre,
    Post,
}

impl<'t, 'o, 'w, 'x> HtmlFormatter<'t, 'o, 'w, 'x> {
    fn new(tree: &'t Tree, options: &'o Options, output: &'w mut WriteWithLast<'x>) -> Self {
        HtmlFormatter {
            tree,
            options,
            output,
        }
    }

    /// Ensures the output ends with a newline before writing a block tag.
    fn cr(&mut self) -> io::Result<()> {
        if !self.output.last_was_newline.get() {
            self.output.write_all(b"\n")?;
        }
        Ok(())
    }

    fn format(&mut self, node: NodeId, plain: bool) -> io::Result<()> {
        let mut stack = vec![(node, plain, Phase::Pre)];

        while let Some((node, plain, phase)) = stack.pop() {
            match phase {
                Phase::Pre => {
                    let new_plain = if plain {
                        self.format_node_plain(node)?;
                        plain
                    } else {
                        stack.push((node, false, Phase::Post));
                        self.format_node_enter(node)?
                    };

                    for ch in self.tree.reverse_children(node) {
                        stack.push((ch, new_plain, Phase::Pre));
                    }
                }
                Phase::Post => {
                    debug_assert!(!plain);
                    self.format_node_exit(node)?;
                }
            }
        }

        Ok(())
    }

    // Alt text of an image: child markup is flattened to its text content.
    fn format_node_plain(&mut self, node: NodeId) -> io::Result<()> {
        match self.tree.ast(node).value {
            NodeValue::Text(ref literal) | NodeValue::Code(crate::nodes::NodeCode { ref literal, .. }) => {
                escape(self.output, literal.as_bytes())?;
            }
            NodeValue::LineBreak | NodeValue::SoftBreak => {
                self.output.write_all(b" ")?;
            }
            _ => (),
        }
        Ok(())
    }

    // Returns whether the children should be rendered as plain text.
    fn format_node_enter(&mut self, node: NodeId) -> io::Result<bool> {
        match self.tree.ast(node).value {
            NodeValue::Document => (),
            NodeValue::BlockQuote => {
                self.cr()?;
                self.output.write_all(b"<blockquote>\n")?;
            }
            NodeValue::List(ref nl) => {
                self.cr()?;
                if nl.list_type == ListType::Bullet {
                    self.output.write_all(b"<ul>\n")?;
                } else if nl.start == 1 {
                    self.output.write_all(b"<ol>\n")?;
                } else {
                    write!(self.output, "<ol start=\"{}\">\n", nl.start)?;
                }
            }
            NodeValue::Item(..) => {
                self.cr()?;
                self.output.write_all(b"<li>")?;
            }
            NodeValue::Heading(ref nh) => {
                self.cr()?;
                write!(self.output, "<h{}>", nh.level)?;
            }
            NodeValue::CodeBlock(ref ncb) => {
                self.cr()?;
                self.output.write_all(b"<pre><code")?;
                if !ncb.info.is_empty() {
                    // Only the first word of the info string makes the class.
                    let lang = ncb
                        .info
                        .split_whitespace()
                        .next()
                        .unwrap_or_default();
                    self.output.write_all(b" class=\"language-")?;
                    escape(self.output, lang.as_bytes())?;
                    self.output.write_all(b"\"")?;
                }
                self.output.write_all(b">")?;
                escape(self.output, ncb.literal.as_bytes())?;
                self.output.write_all(b"</code></pre>\n")?;
            }
            NodeValue::HtmlBlock(ref nhb) => {
                self.cr()?;
                self.output.write_all(nhb.literal.as_bytes())?;
                self.cr()?;
            }
            NodeValue::ThematicBreak => {
                self.cr()?;
                self.output.write_all(b"<hr />\n")?;
            }
            NodeValue::Paragraph => {
                if !self.tight_paragraph(node) {
                    self.cr()?;
                    self.output.write_all(b"<p>")?;
                }
            }
            NodeValue::Text(ref literal) => {
                escape(self.output, literal.as_bytes())?;
            }
            NodeValue::LineBreak => {
                self.output.write_all(b"<br />\n")?;
            }
            NodeValue::SoftBreak => {
                if self.options.render.hardbreaks {
                    self.output.write_all(b"<br />\n")?;
                } else {
                    self.output.write_all(b"\n")?;
                }
            }
            NodeValue::Code(ref nc) => {
                self.output.write_all(b"<code>")?;
                escape(self.output, nc.literal.as_bytes())?;
                self.output.write_all(b"</code>")?;
            }
            NodeValue::HtmlInline(ref literal) => {
                self.output.write_all(literal.as_bytes())?;
            }
            NodeValue::Strong => {
                self.output.write_all(b"<strong>")?;
            }
            NodeValue::Emph => {
                self.output.write_all(b"<em>")?;
            }
            NodeValue::Link(ref nl) => {
                self.output.write_all(b"<a href=\"")?;
                escape_href(self.output, nl.url.as_bytes())?;
                if !nl.title.is_empty() {
                    self.output.write_all(b"\" title=\"")?;
                    escape(self.output, nl.title.as_bytes())?;
                }
                self.output.write_all(b"\">")?;
            }
            NodeValue::Image(ref nl) => {
                self.output.write_all(b"<img src=\"")?;
                escape_href(self.output, nl.url.as_bytes())?;
                self.output.write_all(b"\" alt=\"")?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn format_node_exit(&mut self, node: NodeId) -> io::Result<()> {
        match self.tree.ast(node).value {
            NodeValue::BlockQuote => {
                self.cr()?;
                self.output.write_all(b"</blockquote>\n")?;
            }
            NodeValue::List(ref nl) => {
                self.cr()?;
                if nl.list_type == ListType::Bullet {
                    self.output.write_all(b"</ul>\n")?;
                } else {
                    self.output.write_all(b"</ol>\n")?;
                }
            }
            NodeValue::Item(..) => {
                self.output.write_all(b"</li>\n")?;
            }
            NodeValue::Heading(ref nh) => {
                write!(self.output, "</h{}>\n", nh.level)?;
            }
            NodeValue::Paragraph => {
                if !self.tight_paragraph(node) {
                    self.output.write_all(b"</p>\n")?;
                }
            }
            NodeValue::Strong => {
                self.output.write_all(b"</strong>")?;
            }
            NodeValue::Emph => {
                self.output.write_all(b"</em>")?;
            }
            NodeValue::Link(..) => {
                self.output.write_all(b"</a>")?;
            }
            NodeValue::Image(ref nl) => {
                self.output.write_all(b"\"")?;
                if !nl.title.is_empty() {
                    self.output.write_all(b" title=\"")?;
                    escape(self.output, nl.title.as_bytes())?;
                    self.output.write_all(b"\"")?;
                }
                self.output.write_all(b" />")?;
            }
            _ => (),
        }
        Ok(())
    }

    // A paragraph directly inside an item of a tight list gets no <p> tags.
    fn tight_paragraph(&self, node: NodeId) -> bool {
        let tight = self
            .tree
            .parent(node)
            .and_then(|n| self.tree.parent(n))
            .map(|n| self.tree.ast(n).value.clone());
        match tight {
            Some(NodeValue::List(nl)) => nl.tight,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_body_text() {
        let mut out = vec![];
        escape(&mut out, b"Partitioning <3 & </3").unwrap();
        assert_eq!(out, b"Partitioning &lt;3 &amp; &lt;/3");
    }

    #[test]
    fn escapes_href() {
        let mut out = vec![];
        escape_href(&mut out, "https://a.b/c?d='e'&f=\u{e9}".as_bytes()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "https://a.b/c?d=&#x27;e&#x27;&amp;f=%C3%A9"
        );
    }
}
