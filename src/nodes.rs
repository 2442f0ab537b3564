//! The document model: node kinds and their payloads.

/// The core AST node enum. One of these lives in every tree node; block
/// variants and inline variants never share a parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    /// The root of every AST. Contains **blocks**.
    Document,

    /// **Block**. A [block quote](https://spec.commonmark.org/0.30/#block-quotes).
    /// Contains other blocks.
    BlockQuote,

    /// **Block**. A [list](https://spec.commonmark.org/0.30/#lists). Contains
    /// list items of the same type.
    List(NodeList),

    /// **Block**. A [list item](https://spec.commonmark.org/0.30/#list-items).
    /// Contains other blocks.
    Item(NodeList),

    /// **Block**. A [code block](https://spec.commonmark.org/0.30/#fenced-code-blocks),
    /// fenced or indented. Contains raw text; no child nodes.
    CodeBlock(NodeCodeBlock),

    /// **Block**. An [HTML block](https://spec.commonmark.org/0.30/#html-blocks).
    /// Raw text only.
    HtmlBlock(NodeHtmlBlock),

    /// **Block**. A [paragraph](https://spec.commonmark.org/0.30/#paragraphs).
    /// Contains inlines.
    Paragraph,

    /// **Block**. An ATX or setext [heading](https://spec.commonmark.org/0.30/#atx-headings).
    /// Contains inlines.
    Heading(NodeHeading),

    /// **Block**. A [thematic break](https://spec.commonmark.org/0.30/#thematic-breaks).
    /// No children.
    ThematicBreak,

    /// **Inline**. Literal text.
    Text(String),

    /// **Inline**. A [soft line break](https://spec.commonmark.org/0.30/#soft-line-breaks).
    SoftBreak,

    /// **Inline**. A [hard line break](https://spec.commonmark.org/0.30/#hard-line-breaks).
    LineBreak,

    /// **Inline**. A [code span](https://spec.commonmark.org/0.30/#code-spans).
    Code(NodeCode),

    /// **Inline**. [Raw HTML](https://spec.commonmark.org/0.30/#raw-html)
    /// contained inline.
    HtmlInline(String),

    /// **Inline**. [Emphasized](https://spec.commonmark.org/0.30/#emphasis-and-strong-emphasis)
    /// text. Contains inlines.
    Emph,

    /// **Inline**. [Strong](https://spec.commonmark.org/0.30/#emphasis-and-strong-emphasis)
    /// text. Contains inlines.
    Strong,

    /// **Inline**. A [link](https://spec.commonmark.org/0.30/#links). Contains
    /// inlines; autolinks contain exactly one `Text` child.
    Link(NodeLink),

    /// **Inline**. An [image](https://spec.commonmark.org/0.30/#images). The
    /// children form the alt text.
    Image(NodeLink),
}

/// The payload of links and images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLink {
    /// The URL of the link destination.
    pub url: String,

    /// The title of the link, or the empty string when none was given.
    pub title: String,
}

/// The metadata of a list or list item.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NodeList {
    /// Bullet or ordered.
    pub list_type: ListType,

    /// Number of spaces before the list marker.
    pub marker_offset: usize,

    /// Number of columns from the start of the marker to the contained
    /// content.
    pub padding: usize,

    /// For ordered lists, the ordinal the list starts at.
    pub start: usize,

    /// For ordered lists, the delimiter after each number.
    pub delimiter: ListDelimType,

    /// For bullet lists, the marker character (`-`, `+`, or `*`).
    pub bullet_char: u8,

    /// Whether the list is [tight](https://spec.commonmark.org/0.30/#tight),
    /// i.e. item paragraphs are rendered without `<p>` tags.
    pub tight: bool,
}

/// The type of list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListType {
    /// A bullet list, e.g. `* One`.
    Bullet,

    /// An ordered list, e.g. `1. One`.
    Ordered,
}

impl Default for ListType {
    fn default() -> ListType {
        ListType::Bullet
    }
}

/// The delimiter for ordered lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListDelimType {
    /// A period character `.`.
    Period,

    /// A paren character `)`.
    Paren,
}

impl Default for ListDelimType {
    fn default() -> ListDelimType {
        ListDelimType::Period
    }
}

/// The metadata and data of a code block, fenced or indented.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct NodeCodeBlock {
    /// Whether the code block is fenced.
    pub fenced: bool,

    /// For fenced code blocks, the fence character itself (`` ` `` or `~`).
    pub fence_char: u8,

    /// For fenced code blocks, the length of the fence.
    pub fence_length: usize,

    /// For fenced code blocks, the indentation level of the fence.
    pub fence_offset: usize,

    /// For fenced code blocks, the [info string](https://spec.commonmark.org/0.30/#info-string)
    /// after the opening fence, with escapes and entities resolved.
    pub info: String,

    /// The literal contents of the code block.
    pub literal: String,
}

/// The metadata of a heading.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NodeHeading {
    /// The heading level, 1 through 6.
    pub level: u8,

    /// Whether the heading is setext.
    pub setext: bool,
}

/// The metadata of an included HTML block.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NodeHtmlBlock {
    /// Which of the seven start conditions opened this block; determines
    /// the end condition.
    pub block_type: u8,

    /// The literal contents of the HTML block, verbatim.
    pub literal: String,
}

/// An inline code span.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct NodeCode {
    /// The length of the backtick run that delimited the span.
    pub num_backticks: usize,

    /// The contents of the code span, after whitespace normalization.
    pub literal: String,
}

impl NodeValue {
    /// Whether the node is a block node.
    pub fn block(&self) -> bool {
        matches!(
            *self,
            NodeValue::Document
                | NodeValue::BlockQuote
                | NodeValue::List(..)
                | NodeValue::Item(..)
                | NodeValue::CodeBlock(..)
                | NodeValue::HtmlBlock(..)
                | NodeValue::Paragraph
                | NodeValue::Heading(..)
                | NodeValue::ThematicBreak
        )
    }

    /// Whether the node may accumulate unparsed line content during block
    /// parsing.
    pub fn accepts_lines(&self) -> bool {
        matches!(
            *self,
            NodeValue::Paragraph | NodeValue::Heading(..) | NodeValue::CodeBlock(..)
        )
    }

    /// Whether the finished block's content is parsed for inlines.
    pub fn contains_inlines(&self) -> bool {
        matches!(*self, NodeValue::Paragraph | NodeValue::Heading(..))
    }

    /// Whether a node of this kind may contain a child of kind `child`.
    pub fn can_contain_type(&self, child: &NodeValue) -> bool {
        if matches!(*child, NodeValue::Document) {
            return false;
        }
        match *self {
            NodeValue::Document | NodeValue::BlockQuote | NodeValue::Item(..) => {
                child.block() && !matches!(*child, NodeValue::Item(..))
            }
            NodeValue::List(..) => matches!(*child, NodeValue::Item(..)),
            NodeValue::Paragraph
            | NodeValue::Heading(..)
            | NodeValue::Emph
            | NodeValue::Strong
            | NodeValue::Link(..)
            | NodeValue::Image(..) => !child.block(),
            _ => false,
        }
    }

    /// The text of a `Text` inline, if it is one.
    pub fn text(&self) -> Option<&String> {
        match *self {
            NodeValue::Text(ref t) => Some(t),
            _ => None,
        }
    }

    /// Mutable text of a `Text` inline, if it is one.
    pub fn text_mut(&mut self) -> Option<&mut String> {
        match *self {
            NodeValue::Text(ref mut t) => Some(t),
            _ => None,
        }
    }
}

/// A position in a source document, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

impl From<(usize, usize)> for LineColumn {
    fn from((line, column): (usize, usize)) -> LineColumn {
        LineColumn { line, column }
    }
}

/// The span of a node in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sourcepos {
    /// The line and column of the first character of the node.
    pub start: LineColumn,

    /// The line and column of the last character of the node.
    pub end: LineColumn,
}

impl Default for Sourcepos {
    fn default() -> Sourcepos {
        (1, 1, 1, 1).into()
    }
}

impl From<(usize, usize, usize, usize)> for Sourcepos {
    fn from(
        (start_line, start_column, end_line, end_column): (usize, usize, usize, usize),
    ) -> Sourcepos {
        Sourcepos {
            start: LineColumn {
                line: start_line,
                column: start_column,
            },
            end: LineColumn {
                line: end_line,
                column: end_column,
            },
        }
    }
}

impl std::fmt::Display for Sourcepos {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}

/// A single node's data: its kind, literal content while block lines are
/// being accumulated, and its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ast {
    /// The node kind and its payload.
    pub value: NodeValue,

    /// The span this node covers in the source document.
    pub sourcepos: Sourcepos,

    /// Accumulated raw line content, emptied once inlines are parsed.
    pub content: String,

    /// Whether the block is still open to continuation lines.
    pub open: bool,

    /// Whether the last line attributed to this block was blank. Used for
    /// list tightness.
    pub last_line_blank: bool,

    /// Byte offsets into `content` where each source line begins, so inline
    /// source positions can be mapped back through stripped indentation.
    pub line_offsets: Vec<usize>,
}

impl Ast {
    /// Creates a new `Ast`, open, with empty content, starting at the given
    /// position.
    pub fn new(value: NodeValue, start: LineColumn) -> Self {
        Ast {
            value,
            content: String::new(),
            sourcepos: (start.line, start.column, start.line, 0).into(),
            open: true,
            last_line_blank: false,
            line_offsets: Vec::new(),
        }
    }
}
