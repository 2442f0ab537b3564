pub mod inlines;
mod options;

pub use options::{Options, ParseOptions, RenderOptions};

use std::borrow::Cow;
use std::cmp::min;
use std::mem;

use crate::ctype::{isdigit, isspace};
use crate::entity;
use crate::nodes::{
    Ast, ListDelimType, ListType, NodeCodeBlock, NodeHeading, NodeHtmlBlock, NodeList, NodeValue,
};
use crate::scanners;
use crate::strings;
use crate::tree::{NodeId, Tree};

use self::inlines::RefMap;

const TAB_STOP: usize = 4;
const CODE_INDENT: usize = 4;

// Very deeply nested lists can cause quadratic performance.
const MAX_LIST_DEPTH: usize = 100;

/// Parse a Markdown document into `tree`, returning the id of the root
/// `Document` node.
pub fn parse_document(tree: &mut Tree, md: &str, options: &Options) -> NodeId {
    let root = tree.alloc(Ast {
        value: NodeValue::Document,
        content: String::new(),
        sourcepos: (1, 1, 1, 1).into(),
        open: true,
        last_line_blank: false,
        line_offsets: Vec::new(),
    });
    Parser::new(tree, root, options).parse(md)
}

/// Return whether the byte at the given offset passes the callback.
///
/// Returns `false` if the offset is out of bounds.
fn byte_matches<F>(bytes: &[u8], offset: usize, predicate: F) -> bool
where
    F: Fn(u8) -> bool,
{
    bytes.get(offset).map_or(false, |&b| predicate(b))
}

pub struct Parser<'t, 'o> {
    tree: &'t mut Tree,
    options: &'o Options,
    refmap: RefMap,
    root: NodeId,
    current: NodeId,
    line_number: usize,
    offset: usize,
    column: usize,
    thematic_break_kill_pos: usize,
    first_nonspace: usize,
    first_nonspace_column: usize,
    indent: usize,
    blank: bool,
    partially_consumed_tab: bool,
    curline_len: usize,
    curline_end_col: usize,
    last_line_length: usize,
    total_size: usize,
}

/// A reference link's resolved details.
#[derive(Clone, Debug)]
pub struct ResolvedReference {
    /// The destination URL of the reference link.
    pub url: String,

    /// The text of the link.
    pub title: String,
}

/// Open-block continuation data pulled out of the node so the borrow on the
/// tree doesn't outlive the prefix checks.
enum Continuation {
    BlockQuote,
    Item(NodeList),
    CodeBlock,
    HtmlBlock(u8),
    Paragraph,
    Heading,
    Other,
}

impl<'t, 'o> Parser<'t, 'o> {
    fn new(tree: &'t mut Tree, root: NodeId, options: &'o Options) -> Self {
        Parser {
            tree,
            options,
            refmap: RefMap::new(),
            root,
            current: root,
            line_number: 0,
            offset: 0,
            column: 0,
            thematic_break_kill_pos: 0,
            first_nonspace: 0,
            first_nonspace_column: 0,
            indent: 0,
            blank: false,
            partially_consumed_tab: false,
            curline_len: 0,
            curline_end_col: 0,
            last_line_length: 0,
            total_size: 0,
        }
    }

    fn parse(mut self, s: &str) -> NodeId {
        // Insecure characters are replaced up front so the rest of the
        // pipeline never sees a NUL.
        let s: Cow<str> = if s.contains('\0') {
            Cow::Owned(s.replace('\0', "\u{fffd}"))
        } else {
            Cow::Borrowed(s)
        };

        let s = s.as_ref();
        let sb = s.as_bytes();

        let end = s.len();
        self.total_size = end;

        let mut ix = 0;
        let matcher = jetscii::bytes!(b'\r', b'\n');

        while ix < end {
            let mut eol = match matcher.find(&sb[ix..]) {
                Some(offset) => ix + offset,
                None => end,
            };
            if eol < end {
                if sb[eol] == b'\r' {
                    eol += 1;
                    if eol < end && sb[eol] == b'\n' {
                        eol += 1;
                    }
                } else if sb[eol] == b'\n' {
                    eol += 1;
                }
            }

            self.process_line(&s[ix..eol]);

            ix = eol;
        }

        self.finalize_document();
        self.postprocess_text_nodes(self.root);
        self.root
    }

    fn process_line(&mut self, line: &str) {
        // Every line the machine sees ends with a newline, the last line of
        // the input included.
        let new_line: String;
        let line = if line.is_empty()
            || !strings::is_line_end_char(line.as_bytes()[line.len() - 1])
        {
            new_line = [line, "\n"].concat();
            &new_line
        } else {
            line
        };

        let bytes = line.as_bytes();

        self.curline_len = line.len();
        self.curline_end_col = line.len();
        if self.curline_end_col > 0 && bytes[self.curline_end_col - 1] == b'\n' {
            self.curline_end_col -= 1;
        }
        if self.curline_end_col > 0 && bytes[self.curline_end_col - 1] == b'\r' {
            self.curline_end_col -= 1;
        }

        self.offset = 0;
        self.column = 0;
        self.first_nonspace = 0;
        self.first_nonspace_column = 0;
        self.indent = 0;
        self.thematic_break_kill_pos = 0;
        self.blank = false;
        self.partially_consumed_tab = false;

        if self.line_number == 0 && line.len() >= 3 && line.starts_with('\u{feff}') {
            self.offset += 3;
        }

        self.line_number += 1;

        if let Some((last_matched_container, all_matched)) = self.check_open_blocks(line) {
            let mut container = last_matched_container;
            let current = self.current;
            self.open_new_blocks(&mut container, line, all_matched);

            if current == self.current {
                self.add_text_to_container(container, last_matched_container, line);
            }
        }

        self.last_line_length = self.curline_end_col;

        self.curline_len = 0;
        self.curline_end_col = 0;
    }

    ///////////////////////
    // Check open blocks //
    ///////////////////////

    fn check_open_blocks(&mut self, line: &str) -> Option<(NodeId, bool)> {
        let (all_matched, mut container) = self.check_open_blocks_inner(self.root, line)?;

        if !all_matched {
            container = self.tree.parent(container).unwrap();
        }

        Some((container, all_matched))
    }

    fn check_open_blocks_inner(
        &mut self,
        mut container: NodeId,
        line: &str,
    ) -> Option<(bool, NodeId)> {
        let mut all_matched = false;

        loop {
            if !self.last_child_is_open(container) {
                all_matched = true;
                break;
            }
            container = self.tree.last_child(container).unwrap();

            self.find_first_nonspace(line);

            let cont = match self.tree.ast(container).value {
                NodeValue::BlockQuote => Continuation::BlockQuote,
                NodeValue::Item(nl) => Continuation::Item(nl),
                NodeValue::CodeBlock(..) => Continuation::CodeBlock,
                NodeValue::HtmlBlock(ref nhb) => Continuation::HtmlBlock(nhb.block_type),
                NodeValue::Paragraph => Continuation::Paragraph,
                NodeValue::Heading(..) => Continuation::Heading,
                _ => Continuation::Other,
            };

            match cont {
                Continuation::BlockQuote => {
                    if !self.parse_block_quote_prefix(line) {
                        break;
                    }
                }
                Continuation::Item(ref nl) => {
                    if !self.parse_node_item_prefix(line, container, nl) {
                        break;
                    }
                }
                Continuation::CodeBlock => {
                    if !self.parse_code_block_prefix(line, container)? {
                        break;
                    }
                }
                Continuation::HtmlBlock(block_type) => {
                    if !self.parse_html_block_prefix(block_type) {
                        break;
                    }
                }
                Continuation::Paragraph => {
                    if self.blank {
                        break;
                    }
                }
                Continuation::Heading => {
                    break;
                }
                Continuation::Other => {}
            }
        }

        Some((all_matched, container))
    }

    fn find_first_nonspace(&mut self, line: &str) {
        let mut chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
        let bytes = line.as_bytes();

        if self.first_nonspace <= self.offset {
            self.first_nonspace = self.offset;
            self.first_nonspace_column = self.column;

            loop {
                match bytes.get(self.first_nonspace) {
                    Some(b' ') => {
                        self.first_nonspace += 1;
                        self.first_nonspace_column += 1;
                        chars_to_tab -= 1;
                        if chars_to_tab == 0 {
                            chars_to_tab = TAB_STOP;
                        }
                    }
                    Some(b'\t') => {
                        self.first_nonspace += 1;
                        self.first_nonspace_column += chars_to_tab;
                        chars_to_tab = TAB_STOP;
                    }
                    _ => break,
                }
            }
        }

        self.indent = self.first_nonspace_column - self.column;
        self.blank = bytes
            .get(self.first_nonspace)
            .map_or(true, |&b| strings::is_line_end_char(b));
    }

    fn parse_block_quote_prefix(&mut self, line: &str) -> bool {
        let bytes = line.as_bytes();
        let indent = self.indent;
        if indent <= 3 && bytes.get(self.first_nonspace) == Some(&b'>') {
            self.advance_offset(line, indent + 1, true);

            if byte_matches(bytes, self.offset, strings::is_space_or_tab) {
                self.advance_offset(line, 1, true);
            }

            return true;
        }

        false
    }

    fn parse_node_item_prefix(&mut self, line: &str, container: NodeId, nl: &NodeList) -> bool {
        if self.indent >= nl.marker_offset + nl.padding {
            self.advance_offset(line, nl.marker_offset + nl.padding, true);
            true
        } else if self.blank && self.tree.first_child(container).is_some() {
            let offset = self.first_nonspace - self.offset;
            self.advance_offset(line, offset, false);
            true
        } else {
            false
        }
    }

    // `None` means the closing fence swallowed the line: the caller must stop
    // processing it entirely.
    fn parse_code_block_prefix(&mut self, line: &str, container: NodeId) -> Option<bool> {
        let (fenced, fence_char, fence_length, fence_offset) =
            match self.tree.ast(container).value {
                NodeValue::CodeBlock(ref ncb) => (
                    ncb.fenced,
                    ncb.fence_char,
                    ncb.fence_length,
                    ncb.fence_offset,
                ),
                _ => unreachable!(),
            };

        if !fenced {
            if self.indent >= CODE_INDENT {
                self.advance_offset(line, CODE_INDENT, true);
                return Some(true);
            } else if self.blank {
                let offset = self.first_nonspace - self.offset;
                self.advance_offset(line, offset, false);
                return Some(true);
            }
            return Some(false);
        }

        let bytes = line.as_bytes();
        let matched = if self.indent <= 3 && bytes.get(self.first_nonspace) == Some(&fence_char) {
            scanners::close_code_fence(&bytes[self.first_nonspace..]).unwrap_or(0)
        } else {
            0
        };

        if matched >= fence_length {
            self.advance_offset(line, matched, false);
            self.current = self.finalize(container).unwrap();
            self.tree.ast_mut(container).sourcepos.end =
                (self.line_number, self.curline_end_col).into();
            return None;
        }

        let mut i = fence_offset;
        while i > 0 && byte_matches(bytes, self.offset, strings::is_space_or_tab) {
            self.advance_offset(line, 1, true);
            i -= 1;
        }
        Some(true)
    }

    fn parse_html_block_prefix(&self, t: u8) -> bool {
        match t {
            1..=5 => true,
            6 | 7 => !self.blank,
            _ => unreachable!(),
        }
    }

    /////////////////////
    // Open new blocks //
    /////////////////////

    fn open_new_blocks(&mut self, container: &mut NodeId, line: &str, all_matched: bool) {
        let mut maybe_lazy = matches!(self.tree.ast(self.current).value, NodeValue::Paragraph);
        let mut depth = 0;

        while !matches!(
            self.tree.ast(*container).value,
            NodeValue::CodeBlock(..) | NodeValue::HtmlBlock(..)
        ) {
            depth += 1;
            self.find_first_nonspace(line);
            let indented = self.indent >= CODE_INDENT;

            if !((!indented
                && (self.handle_blockquote(container, line)
                    || self.handle_atx_heading(container, line)
                    || self.handle_code_fence(container, line)
                    || self.handle_html_block(container, line)
                    || self.handle_setext_heading(container, line)
                    || self.handle_thematic_break(container, line, all_matched)))
                || self.handle_list(container, line, indented, depth)
                || self.handle_code_block(container, line, indented, maybe_lazy))
            {
                break;
            }

            if self.tree.ast(*container).value.accepts_lines() {
                break;
            }

            maybe_lazy = false;
        }
    }

    fn handle_blockquote(&mut self, container: &mut NodeId, line: &str) -> bool {
        if !self.detect_blockquote(line) {
            return false;
        }

        let blockquote_startpos = self.first_nonspace;

        let offset = self.first_nonspace + 1 - self.offset;
        self.advance_offset(line, offset, false);
        if byte_matches(line.as_bytes(), self.offset, strings::is_space_or_tab) {
            self.advance_offset(line, 1, true);
        }
        *container = self.add_child(*container, NodeValue::BlockQuote, blockquote_startpos + 1);

        true
    }

    fn detect_blockquote(&self, line: &str) -> bool {
        line.as_bytes().get(self.first_nonspace) == Some(&b'>')
    }

    fn handle_atx_heading(&mut self, container: &mut NodeId, line: &str) -> bool {
        let Some(matched) = self.detect_atx_heading(line) else {
            return false;
        };

        let heading_startpos = self.first_nonspace;
        let offset = self.offset;
        self.advance_offset(line, heading_startpos + matched - offset, false);
        *container = self.add_child(
            *container,
            NodeValue::Heading(NodeHeading::default()),
            heading_startpos + 1,
        );

        let bytes = line.as_bytes();
        let mut hashpos = bytes[self.first_nonspace..]
            .iter()
            .position(|&c| c == b'#')
            .unwrap()
            + self.first_nonspace;
        let mut level = 0;
        while hashpos < bytes.len() && bytes[hashpos] == b'#' {
            level += 1;
            hashpos += 1;
        }

        self.tree.ast_mut(*container).value = NodeValue::Heading(NodeHeading {
            level,
            setext: false,
        });

        true
    }

    fn detect_atx_heading(&self, line: &str) -> Option<usize> {
        scanners::atx_heading_start(&line.as_bytes()[self.first_nonspace..])
    }

    fn handle_code_fence(&mut self, container: &mut NodeId, line: &str) -> bool {
        let Some(matched) = self.detect_code_fence(line) else {
            return false;
        };

        let first_nonspace = self.first_nonspace;
        let offset = self.offset;
        let ncb = NodeCodeBlock {
            fenced: true,
            fence_char: line.as_bytes()[first_nonspace],
            fence_length: matched,
            fence_offset: first_nonspace - offset,
            info: String::new(),
            literal: String::new(),
        };
        *container = self.add_child(
            *container,
            NodeValue::CodeBlock(ncb),
            self.first_nonspace + 1,
        );
        self.advance_offset(line, first_nonspace + matched - offset, false);

        true
    }

    fn detect_code_fence(&self, line: &str) -> Option<usize> {
        scanners::open_code_fence(&line.as_bytes()[self.first_nonspace..])
    }

    fn handle_html_block(&mut self, container: &mut NodeId, line: &str) -> bool {
        let Some(matched) = self.detect_html_block(*container, line) else {
            return false;
        };

        let nhb = NodeHtmlBlock {
            block_type: matched,
            literal: String::new(),
        };

        *container = self.add_child(
            *container,
            NodeValue::HtmlBlock(nhb),
            self.first_nonspace + 1,
        );

        true
    }

    fn detect_html_block(&self, container: NodeId, line: &str) -> Option<u8> {
        let bytes = line.as_bytes();
        scanners::html_block_start(&bytes[self.first_nonspace..]).or_else(|| {
            if !matches!(self.tree.ast(container).value, NodeValue::Paragraph) {
                scanners::html_block_start_7(&bytes[self.first_nonspace..])
            } else {
                None
            }
        })
    }

    fn handle_setext_heading(&mut self, container: &mut NodeId, line: &str) -> bool {
        let Some(sc) = self.detect_setext_heading(*container, line) else {
            return false;
        };

        let has_content = {
            let mut content = mem::take(&mut self.tree.ast_mut(*container).content);
            let has_content = self.resolve_reference_link_definitions(&mut content);
            self.tree.ast_mut(*container).content = content;
            has_content
        };
        if has_content {
            self.tree.ast_mut(*container).value = NodeValue::Heading(NodeHeading {
                level: match sc {
                    scanners::SetextChar::Equals => 1,
                    scanners::SetextChar::Hyphen => 2,
                },
                setext: true,
            });
            let adv = self.curline_end_col - self.offset;
            self.advance_offset(line, adv, false);
        }

        true
    }

    fn detect_setext_heading(&self, container: NodeId, line: &str) -> Option<scanners::SetextChar> {
        if matches!(self.tree.ast(container).value, NodeValue::Paragraph) {
            scanners::setext_heading_line(&line.as_bytes()[self.first_nonspace..])
        } else {
            None
        }
    }

    fn handle_thematic_break(
        &mut self,
        container: &mut NodeId,
        line: &str,
        all_matched: bool,
    ) -> bool {
        if self.detect_thematic_break(*container, line, all_matched).is_none() {
            return false;
        }

        *container = self.add_child(*container, NodeValue::ThematicBreak, self.first_nonspace + 1);

        let adv = self.curline_end_col - self.offset;
        self.tree.ast_mut(*container).sourcepos.end =
            (self.line_number, self.curline_end_col).into();
        self.advance_offset(line, adv, false);

        true
    }

    fn detect_thematic_break(
        &mut self,
        container: NodeId,
        line: &str,
        all_matched: bool,
    ) -> Option<usize> {
        if !matches!(
            (&self.tree.ast(container).value, all_matched),
            (&NodeValue::Paragraph, false)
        ) && self.thematic_break_kill_pos <= self.first_nonspace
        {
            let (offset, found) = self.scan_thematic_break_inner(line);
            if !found {
                self.thematic_break_kill_pos = offset;
                None
            } else {
                Some(offset)
            }
        } else {
            None
        }
    }

    fn scan_thematic_break_inner(&self, line: &str) -> (usize, bool) {
        let mut i = self.first_nonspace;

        if i >= line.len() {
            return (i, false);
        }

        let bytes = line.as_bytes();
        let b = bytes[i];
        if b != b'*' && b != b'_' && b != b'-' {
            return (i, false);
        }

        let mut count = 1;
        let mut nextb;
        loop {
            i += 1;
            if i >= line.len() {
                nextb = 255;
                break;
            }
            nextb = bytes[i];

            if nextb == b {
                count += 1;
            } else if nextb != b' ' && nextb != b'\t' {
                break;
            }
        }

        if count >= 3 && (nextb == 255 || nextb == b'\r' || nextb == b'\n') {
            ((i - self.first_nonspace) + 1, true)
        } else {
            (i, false)
        }
    }

    fn handle_list(
        &mut self,
        container: &mut NodeId,
        line: &str,
        indented: bool,
        depth: usize,
    ) -> bool {
        let Some((matched, mut nl)) = self.detect_list(*container, line, indented, depth) else {
            return false;
        };

        let offset = self.first_nonspace + matched - self.offset;
        self.advance_offset(line, offset, false);
        let (save_partially_consumed_tab, save_offset, save_column) =
            (self.partially_consumed_tab, self.offset, self.column);

        let bytes = line.as_bytes();
        while self.column - save_column <= 5
            && byte_matches(bytes, self.offset, strings::is_space_or_tab)
        {
            self.advance_offset(line, 1, true);
        }

        let i = self.column - save_column;
        if !(1..5).contains(&i) || byte_matches(bytes, self.offset, strings::is_line_end_char) {
            nl.padding = matched + 1;
            self.offset = save_offset;
            self.column = save_column;
            self.partially_consumed_tab = save_partially_consumed_tab;
            if i > 0 {
                self.advance_offset(line, 1, true);
            }
        } else {
            nl.padding = matched + i;
        }

        nl.marker_offset = self.indent;

        if match self.tree.ast(*container).value {
            NodeValue::List(ref mnl) => !lists_match(&nl, mnl),
            _ => true,
        } {
            *container = self.add_child(*container, NodeValue::List(nl), self.first_nonspace + 1);
        }

        *container = self.add_child(*container, NodeValue::Item(nl), self.first_nonspace + 1);

        true
    }

    fn detect_list(
        &self,
        container: NodeId,
        line: &str,
        indented: bool,
        depth: usize,
    ) -> Option<(usize, NodeList)> {
        if (!indented || matches!(self.tree.ast(container).value, NodeValue::List(..)))
            && self.indent < 4
            && depth < MAX_LIST_DEPTH
        {
            parse_list_marker(
                line,
                self.first_nonspace,
                matches!(self.tree.ast(container).value, NodeValue::Paragraph),
            )
        } else {
            None
        }
    }

    fn handle_code_block(
        &mut self,
        container: &mut NodeId,
        line: &str,
        indented: bool,
        maybe_lazy: bool,
    ) -> bool {
        if !self.detect_code_block(indented, maybe_lazy) {
            return false;
        }

        self.advance_offset(line, CODE_INDENT, true);
        let ncb = NodeCodeBlock {
            fenced: false,
            fence_char: 0,
            fence_length: 0,
            fence_offset: 0,
            info: String::new(),
            literal: String::new(),
        };
        *container = self.add_child(*container, NodeValue::CodeBlock(ncb), self.offset + 1);

        true
    }

    fn detect_code_block(&self, indented: bool, maybe_lazy: bool) -> bool {
        indented && !maybe_lazy && !self.blank
    }

    //////////
    // Core //
    //////////

    fn advance_offset(&mut self, line: &str, mut count: usize, columns: bool) {
        let bytes = line.as_bytes();
        while count > 0 {
            match bytes[self.offset] {
                b'\t' => {
                    let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
                    if columns {
                        self.partially_consumed_tab = chars_to_tab > count;
                        let chars_to_advance = min(count, chars_to_tab);
                        self.column += chars_to_advance;
                        if !self.partially_consumed_tab {
                            self.offset += 1;
                        };
                        count -= chars_to_advance;
                    } else {
                        self.partially_consumed_tab = false;
                        self.column += chars_to_tab;
                        self.offset += 1;
                        count -= 1;
                    }
                }
                _ => {
                    self.partially_consumed_tab = false;
                    self.offset += 1;
                    self.column += 1;
                    count -= 1;
                }
            }
        }
    }

    fn last_child_is_open(&self, node: NodeId) -> bool {
        self.tree
            .last_child(node)
            .map_or(false, |child| self.tree.ast(child).open)
    }

    fn add_child(&mut self, mut parent: NodeId, value: NodeValue, start_column: usize) -> NodeId {
        while !self.tree.ast(parent).value.can_contain_type(&value) {
            parent = self.finalize(parent).unwrap();
        }

        assert!(start_column > 0);

        let child = Ast::new(value, (self.line_number, start_column).into());
        let node = self.tree.alloc(child);
        self.tree.append(parent, node);
        node
    }

    fn add_text_to_container(
        &mut self,
        mut container: NodeId,
        last_matched_container: NodeId,
        line: &str,
    ) {
        self.find_first_nonspace(line);

        if self.blank {
            if let Some(last_child) = self.tree.last_child(container) {
                self.tree.ast_mut(last_child).last_line_blank = true;
            }
        }

        let container_blank = self.blank
            && match self.tree.ast(container).value {
                NodeValue::BlockQuote | NodeValue::Heading(..) | NodeValue::ThematicBreak => false,
                NodeValue::CodeBlock(ref ncb) => !ncb.fenced,
                NodeValue::Item(..) => {
                    self.tree.first_child(container).is_some()
                        || self.tree.ast(container).sourcepos.start.line != self.line_number
                }
                _ => true,
            };
        self.tree.ast_mut(container).last_line_blank = container_blank;

        let mut tmp = container;
        while let Some(parent) = self.tree.parent(tmp) {
            self.tree.ast_mut(parent).last_line_blank = false;
            tmp = parent;
        }

        if self.current != last_matched_container
            && container == last_matched_container
            && !self.blank
            && matches!(self.tree.ast(self.current).value, NodeValue::Paragraph)
        {
            self.add_line(self.current, line);
        } else {
            while self.current != last_matched_container {
                self.current = self.finalize(self.current).unwrap();
            }

            let add_text_result = match self.tree.ast(container).value {
                NodeValue::CodeBlock(..) => AddTextResult::LiteralText,
                NodeValue::HtmlBlock(ref nhb) => AddTextResult::HtmlBlock(nhb.block_type),
                _ => AddTextResult::Otherwise,
            };

            match add_text_result {
                AddTextResult::LiteralText => {
                    self.add_line(container, line);
                }
                AddTextResult::HtmlBlock(block_type) => {
                    self.add_line(container, line);

                    let tail = &line.as_bytes()[self.first_nonspace..];
                    let matches_end_condition = match block_type {
                        1 => scanners::html_block_end_1(tail),
                        2 => scanners::html_block_end_2(tail),
                        3 => scanners::html_block_end_3(tail),
                        4 => scanners::html_block_end_4(tail),
                        5 => scanners::html_block_end_5(tail),
                        _ => false,
                    };

                    if matches_end_condition {
                        container = self.finalize(container).unwrap();
                    }
                }
                AddTextResult::Otherwise => {
                    if self.blank {
                        // do nothing
                    } else if self.tree.ast(container).value.accepts_lines() {
                        let mut line = line;
                        if let NodeValue::Heading(nh) = self.tree.ast(container).value {
                            if !nh.setext {
                                line = strings::chop_trailing_hashtags(line);
                            }
                        };

                        let count = self.first_nonspace - self.offset;

                        // `chop_trailing_hashtags` can leave the line shorter
                        // than the recorded `first_nonspace`. This happens
                        // with ATX headers containing no header text, multiple
                        // spaces and trailing hashes, e.g.
                        //
                        // ###     ###
                        //
                        // In this case `first_nonspace` indexes into the
                        // second set of hashes, while the chop truncates
                        // `line` to just the first three. There's no text to
                        // add, and no further processing to be done.
                        let have_line_text = self.first_nonspace <= line.len();

                        if have_line_text {
                            self.advance_offset(line, count, false);
                            self.add_line(container, line);
                        }
                    } else {
                        container = self.add_child(
                            container,
                            NodeValue::Paragraph,
                            self.first_nonspace + 1,
                        );
                        let count = self.first_nonspace - self.offset;
                        self.advance_offset(line, count, false);
                        self.add_line(container, line);
                    }
                }
            }

            self.current = container;
        }
    }

    fn add_line(&mut self, node: NodeId, line: &str) {
        if self.partially_consumed_tab {
            self.offset += 1;
            let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
            let ast = self.tree.ast_mut(node);
            assert!(ast.open);
            ast.content.reserve(chars_to_tab);
            for _ in 0..chars_to_tab {
                ast.content.push(' ');
            }
        }
        if self.offset < line.len() {
            let ast = self.tree.ast_mut(node);
            assert!(ast.open);
            // Since whitespace is stripped off the beginning of lines, we need
            // to keep track of how much was stripped off. This allows us to
            // properly calculate inline sourcepos during inline processing.
            ast.line_offsets.push(self.offset);

            ast.content.push_str(&line[self.offset..]);
        }
    }

    fn finalize_document(&mut self) {
        while self.current != self.root {
            self.current = self.finalize(self.current).unwrap();
        }

        self.finalize(self.root);

        self.refmap.max_ref_size = self.total_size.min(100000);

        self.process_inlines();
    }

    fn finalize(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.tree.parent(node);

        {
            let line_number = self.line_number;
            let ast = self.tree.ast_mut(node);
            assert!(ast.open);
            ast.open = false;

            if self.curline_len == 0 {
                ast.sourcepos.end = (line_number, self.last_line_length).into();
            } else if matches!(ast.value, NodeValue::Document) {
                ast.sourcepos.end = (line_number, self.curline_end_col).into();
            } else if matches!(ast.value, NodeValue::ThematicBreak) {
                // sourcepos.end set when the break was opened.
            } else {
                ast.sourcepos.end = (line_number - 1, self.last_line_length).into();
            }
        }

        match self.tree.ast(node).value {
            NodeValue::Paragraph => {
                let mut content = mem::take(&mut self.tree.ast_mut(node).content);
                let has_content = self.resolve_reference_link_definitions(&mut content);
                if !has_content {
                    self.tree.detach(node);
                } else {
                    self.tree.ast_mut(node).content = content;
                }
            }
            NodeValue::CodeBlock(..) => self.finalize_code_block(node),
            NodeValue::HtmlBlock(..) => self.finalize_html_block(node),
            NodeValue::List(..) => {
                if let Some(end) = self.last_descendant_end(node) {
                    self.tree.ast_mut(node).sourcepos.end = end;
                }
                let tight = self.determine_list_tight(node);
                if let NodeValue::List(ref mut nl) = self.tree.ast_mut(node).value {
                    nl.tight = tight;
                }
            }
            _ => (),
        }

        parent
    }

    fn finalize_code_block(&mut self, node: NodeId) {
        let mut content = mem::take(&mut self.tree.ast_mut(node).content);
        let fenced = match self.tree.ast(node).value {
            NodeValue::CodeBlock(ref ncb) => ncb.fenced,
            _ => unreachable!(),
        };

        if !fenced {
            strings::remove_trailing_blank_lines(&mut content);
            content.push('\n');
        } else {
            let mut pos = 0;
            while pos < content.len() {
                if strings::is_line_end_char(content.as_bytes()[pos]) {
                    break;
                }
                pos += 1;
            }

            let unescaped = entity::unescape_html(content[..pos].as_bytes());
            let mut info = strings::trim_slice(&unescaped).to_vec();
            strings::unescape(&mut info);
            let info = String::from_utf8(info).unwrap();
            let info = if info.is_empty() {
                self.options
                    .parse
                    .default_info_string
                    .clone()
                    .unwrap_or(info)
            } else {
                info
            };

            if content.as_bytes().get(pos) == Some(&b'\r') {
                pos += 1;
            }
            if content.as_bytes().get(pos) == Some(&b'\n') {
                pos += 1;
            }

            content.drain(..pos);

            if let NodeValue::CodeBlock(ref mut ncb) = self.tree.ast_mut(node).value {
                ncb.info = info;
            }
        }

        if let NodeValue::CodeBlock(ref mut ncb) = self.tree.ast_mut(node).value {
            ncb.literal = content;
        }
    }

    fn finalize_html_block(&mut self, node: NodeId) {
        let content = mem::take(&mut self.tree.ast_mut(node).content);
        let trimmed = strings::remove_trailing_blank_lines_slice(&content);
        let (num_lines, last_line_len) = strings::count_newlines(trimmed);

        let ast = self.tree.ast_mut(node);
        let end_line = ast.sourcepos.start.line + num_lines;
        let end_col = ast.line_offsets.get(num_lines).copied().unwrap_or(0) + last_line_len;
        ast.sourcepos.end = (end_line, end_col).into();

        if let NodeValue::HtmlBlock(ref mut nhb) = ast.value {
            nhb.literal = content;
        }
    }

    // End position of the deepest last descendant, where one with a non-zero
    // column exists. Used to widen list sourcepos past blank trailing lines.
    fn last_descendant_end(&self, node: NodeId) -> Option<crate::nodes::LineColumn> {
        let last = self.tree.last_child(node)?;
        let end = self.tree.ast(last).sourcepos.end;
        if end.column != 0 {
            Some(end)
        } else {
            None
        }
    }

    fn determine_list_tight(&self, node: NodeId) -> bool {
        let mut ch = self.tree.first_child(node);

        while let Some(item) = ch {
            if self.tree.ast(item).last_line_blank && self.tree.next_sibling(item).is_some() {
                return false;
            }

            let mut subch = self.tree.first_child(item);
            while let Some(subitem) = subch {
                if (self.tree.next_sibling(item).is_some()
                    || self.tree.next_sibling(subitem).is_some())
                    && self.ends_with_blank_line(subitem)
                {
                    return false;
                }
                subch = self.tree.next_sibling(subitem);
            }

            ch = self.tree.next_sibling(item);
        }

        true
    }

    fn ends_with_blank_line(&self, node: NodeId) -> bool {
        let mut it = Some(node);
        while let Some(cur) = it {
            if self.tree.ast(cur).last_line_blank {
                return true;
            }
            match self.tree.ast(cur).value {
                NodeValue::List(..) | NodeValue::Item(..) => it = self.tree.last_child(cur),
                _ => it = None,
            };
        }
        false
    }

    fn resolve_reference_link_definitions(&mut self, content: &mut String) -> bool {
        let mut pos = 0;
        let mut rrs = vec![];

        while pos < content.len() && content.as_bytes()[pos] == b'[' {
            if let Some((offset, rr)) = self.parse_reference_inline(&content[pos..]) {
                pos += offset;
                rrs.extend(rr);
            } else {
                break;
            }
        }

        for (lab, rr) in rrs {
            self.refmap.map.entry(lab).or_insert(rr);
        }

        if pos != 0 {
            content.drain(..pos);
        }

        !strings::is_blank(content.as_bytes())
    }

    fn parse_reference_inline(
        &self,
        content: &str,
    ) -> Option<(usize, Option<(String, ResolvedReference)>)> {
        let mut scanner = inlines::Scanner::new();

        let lab: String = match scanner.link_label(content) {
            Some(lab) if !lab.is_empty() => lab.to_string(),
            _ => return None,
        };

        if scanner.peek_byte(content) != Some(b':') {
            return None;
        }

        scanner.pos += 1;
        scanner.spnl(content);
        let (url, matchlen) = match inlines::manual_scan_link_url(&content.as_bytes()[scanner.pos..])
        {
            Some((url, matchlen)) => (url.to_vec(), matchlen),
            None => return None,
        };
        scanner.pos += matchlen;

        let beforetitle = scanner.pos;
        scanner.spnl(content);
        let title_search = if scanner.pos == beforetitle {
            None
        } else {
            scanners::link_title(&content.as_bytes()[scanner.pos..])
        };
        let title = match title_search {
            Some(matchlen) => {
                let t = &content[scanner.pos..scanner.pos + matchlen];
                scanner.pos += matchlen;
                t
            }
            _ => {
                scanner.pos = beforetitle;
                ""
            }
        };

        scanner.skip_spaces(content);
        if !scanner.skip_line_end(content) {
            if !title.is_empty() {
                scanner.pos = beforetitle;
                scanner.skip_spaces(content);
                if !scanner.skip_line_end(content) {
                    return None;
                }
            } else {
                return None;
            }
        }

        let lab = strings::normalize_label(&lab);
        let mut rr = None;
        if !lab.is_empty() && !self.refmap.map.contains_key(&lab) {
            rr = Some((
                lab,
                ResolvedReference {
                    url: String::from_utf8(strings::clean_url(&url)).unwrap(),
                    title: String::from_utf8(strings::clean_title(title.as_bytes())).unwrap(),
                },
            ));
        }
        Some((scanner.pos, rr))
    }

    /////////////
    // Inlines //
    /////////////

    fn process_inlines(&mut self) {
        let blocks: Vec<NodeId> = self
            .tree
            .descendants(self.root)
            .filter(|&node| self.tree.ast(node).value.contains_inlines())
            .collect();

        for node in blocks {
            self.parse_inlines(node);
        }
    }

    fn parse_inlines(&mut self, node: NodeId) {
        let (mut content, line, block_offsets) = {
            let ast = self.tree.ast_mut(node);
            (
                mem::take(&mut ast.content),
                ast.sourcepos.start.line,
                ast.line_offsets.clone(),
            )
        };
        strings::rtrim(&mut content);

        let mut subj = inlines::Subject::new(
            self.tree,
            content.into_bytes(),
            line,
            block_offsets,
            &mut self.refmap,
        );

        while subj.parse_inline(node) {}
        subj.process_emphasis(0);
        while subj.pop_bracket() {}
    }

    // Adjacent `Text` nodes produced by inline parsing are merged into one, so
    // consumers of the tree see contiguous runs of text as a single node.
    fn postprocess_text_nodes(&mut self, root: NodeId) {
        let mut stack = vec![root];

        while let Some(parent) = stack.pop() {
            let mut it = self.tree.first_child(parent);

            while let Some(node) = it {
                if matches!(self.tree.ast(node).value, NodeValue::Text(..)) {
                    while let Some(ns) = self.tree.next_sibling(node) {
                        let adj = match self.tree.ast_mut(ns).value {
                            NodeValue::Text(ref mut adj) => mem::take(adj),
                            _ => break,
                        };
                        let sp_end = self.tree.ast(ns).sourcepos.end;
                        self.tree.detach(ns);

                        let ast = self.tree.ast_mut(node);
                        ast.value.text_mut().unwrap().push_str(&adj);
                        ast.sourcepos.end = sp_end;
                    }
                } else if self.tree.first_child(node).is_some() {
                    stack.push(node);
                }

                it = self.tree.next_sibling(node);
            }
        }
    }
}

enum AddTextResult {
    LiteralText,
    HtmlBlock(u8),
    Otherwise,
}

fn parse_list_marker(
    line: &str,
    mut pos: usize,
    interrupts_paragraph: bool,
) -> Option<(usize, NodeList)> {
    let bytes = line.as_bytes();
    if pos >= line.len() {
        return None;
    }
    let mut c = bytes[pos];
    let startpos = pos;

    if c == b'*' || c == b'-' || c == b'+' {
        pos += 1;
        if !bytes.get(pos).map_or(true, |&b| isspace(b)) {
            return None;
        }

        if interrupts_paragraph {
            // "However, an empty list item cannot interrupt a paragraph:"
            let mut i = pos;
            if i == bytes.len() {
                return None;
            }

            while strings::is_space_or_tab(bytes[i]) {
                i += 1;
                if i == bytes.len() {
                    return None;
                }
            }
            if strings::is_line_end_char(bytes[i]) {
                return None;
            }
        }

        return Some((
            pos - startpos,
            NodeList {
                list_type: ListType::Bullet,
                marker_offset: 0,
                padding: 0,
                start: 1,
                delimiter: ListDelimType::Period,
                bullet_char: c,
                tight: false,
            },
        ));
    } else if isdigit(c) {
        let mut start: usize = 0;
        let mut digits = 0;

        loop {
            start = (10 * start) + (bytes[pos] - b'0') as usize;
            pos += 1;
            digits += 1;

            if pos == bytes.len() {
                return None;
            }

            if !(digits < 9 && isdigit(bytes[pos])) {
                break;
            }
        }

        if interrupts_paragraph && start != 1 {
            return None;
        }

        c = bytes[pos];
        if c != b'.' && c != b')' {
            return None;
        }

        pos += 1;

        if pos == bytes.len() || !isspace(bytes[pos]) {
            return None;
        }

        if interrupts_paragraph {
            let mut i = pos;
            while strings::is_space_or_tab(bytes[i]) {
                i += 1;
                if i == bytes.len() {
                    return None;
                }
            }
            if strings::is_line_end_char(bytes[i]) {
                return None;
            }
        }

        return Some((
            pos - startpos,
            NodeList {
                list_type: ListType::Ordered,
                marker_offset: 0,
                padding: 0,
                start,
                delimiter: if c == b'.' {
                    ListDelimType::Period
                } else {
                    ListDelimType::Paren
                },
                bullet_char: 0,
                tight: false,
            },
        ));
    }

    None
}

fn lists_match(list_data: &NodeList, item_data: &NodeList) -> bool {
    list_data.list_type == item_data.list_type
        && list_data.delimiter == item_data.delimiter
        && list_data.bullet_char == item_data.bullet_char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_marker_bullet() {
        let (matched, nl) = parse_list_marker("- foo\n", 0, false).unwrap();
        assert_eq!(matched, 1);
        assert_eq!(nl.list_type, ListType::Bullet);
        assert_eq!(nl.bullet_char, b'-');
    }

    #[test]
    fn list_marker_ordered_start_cap() {
        // Nine digits is the most a start number may have.
        assert!(parse_list_marker("123456789. ok\n", 0, false).is_some());
        assert!(parse_list_marker("1234567890. ok\n", 0, false).is_none());
    }

    #[test]
    fn empty_list_item_cannot_interrupt_paragraph() {
        assert!(parse_list_marker("-\n", 0, true).is_none());
        assert!(parse_list_marker("- \n", 0, true).is_none());
        assert!(parse_list_marker("- x\n", 0, true).is_some());
    }

    #[test]
    fn ordered_interrupt_requires_start_one() {
        assert!(parse_list_marker("2. x\n", 0, true).is_none());
        assert!(parse_list_marker("1. x\n", 0, true).is_some());
    }
}
