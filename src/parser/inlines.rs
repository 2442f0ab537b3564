use std::convert::TryFrom;
use std::str;

use rustc_hash::FxHashMap;
use unicode_categories::UnicodeCategories;

use crate::ctype::{ispunct, isspace};
use crate::entity;
use crate::nodes::{Ast, NodeCode, NodeLink, NodeValue};
use crate::parser::ResolvedReference;
use crate::scanners::{self, AutolinkType};
use crate::strings;
use crate::tree::{NodeId, Tree};

const MAXBACKTICKS: usize = 80;
const MAX_LINK_LABEL_LENGTH: usize = 1000;

trait FlankingCheckHelper
where
    Self: Sized + Copy,
{
    fn is_cmark_punctuation(&self) -> bool;
}

impl FlankingCheckHelper for char {
    #[inline]
    fn is_cmark_punctuation(&self) -> bool {
        self.is_punctuation() || self.is_symbol()
    }
}

pub struct RefMap {
    pub map: FxHashMap<String, ResolvedReference>,
    pub(crate) max_ref_size: usize,
    ref_size: usize,
}

impl RefMap {
    pub fn new() -> Self {
        Self {
            map: FxHashMap::default(),
            max_ref_size: usize::MAX,
            ref_size: 0,
        }
    }

    fn lookup(&mut self, lab: &str) -> Option<ResolvedReference> {
        match self.map.get(lab) {
            Some(entry) => {
                let size = entry.url.len() + entry.title.len();
                if size > self.max_ref_size - self.ref_size {
                    None
                } else {
                    self.ref_size += size;
                    Some(entry.clone())
                }
            }
            None => None,
        }
    }
}

pub struct Delimiter {
    inl: NodeId,
    position: usize,
    length: usize,
    delim_char: u8,
    can_open: bool,
    can_close: bool,
    prev: Option<usize>,
    next: Option<usize>,
}

impl std::fmt::Debug for Delimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[pos {}, len {}, delim_char {:?}, open? {} close? {}]",
            self.position, self.length, self.delim_char, self.can_open, self.can_close,
        )
    }
}

struct Bracket {
    inl_text: NodeId,
    position: usize,
    image: bool,
    bracket_after: bool,
}

#[derive(Default)]
struct Flags {
    skip_html_cdata: bool,
    skip_html_declaration: bool,
    skip_html_pi: bool,
    skip_html_comment: bool,
}

pub struct Subject<'t, 'r> {
    tree: &'t mut Tree,
    input: Vec<u8>,
    line: usize,
    pos: usize,
    block_start_line: usize,
    block_offsets: Vec<usize>,
    column_offset: isize,
    line_offset: usize,
    flags: Flags,
    refmap: &'r mut RefMap,
    delimiters: Vec<Delimiter>,
    last_delimiter: Option<usize>,
    brackets: Vec<Bracket>,
    backticks: [usize; MAXBACKTICKS + 1],
    scanned_for_backticks: bool,
    no_link_openers: bool,
    special_chars: [bool; 256],
}

impl<'t, 'r> Subject<'t, 'r> {
    pub fn new(
        tree: &'t mut Tree,
        input: Vec<u8>,
        line: usize,
        block_offsets: Vec<usize>,
        refmap: &'r mut RefMap,
    ) -> Self {
        let mut s = Subject {
            tree,
            input,
            line,
            pos: 0,
            block_start_line: line,
            block_offsets,
            column_offset: 0,
            line_offset: 0,
            flags: Flags::default(),
            refmap,
            delimiters: vec![],
            last_delimiter: None,
            brackets: vec![],
            backticks: [0; MAXBACKTICKS + 1],
            scanned_for_backticks: false,
            no_link_openers: true,
            special_chars: [false; 256],
        };
        for &c in b"\n\r_*`\\&<[]!" {
            s.special_chars[c as usize] = true;
        }
        s
    }

    pub fn pop_bracket(&mut self) -> bool {
        self.brackets.pop().is_some()
    }

    pub fn parse_inline(&mut self, node: NodeId) -> bool {
        let c = match self.peek_char() {
            None => return false,
            Some(ch) => *ch as char,
        };

        let adjusted_line = self.line - self.block_start_line;
        self.line_offset = self.block_offsets[adjusted_line];

        let new_inl: Option<NodeId> = match c {
            '\0' => return false,
            '\r' | '\n' => Some(self.handle_newline()),
            '`' => Some(self.handle_backticks()),
            '\\' => Some(self.handle_backslash()),
            '&' => Some(self.handle_entity()),
            '<' => Some(self.handle_pointy_brace()),
            '*' | '_' => Some(self.handle_delim(c as u8)),
            '[' => {
                self.pos += 1;
                let inl =
                    self.make_inline(NodeValue::Text("[".to_string()), self.pos - 1, self.pos - 1);
                self.push_bracket(false, inl);
                Some(inl)
            }
            ']' => self.handle_close_bracket(),
            '!' => {
                self.pos += 1;
                if self.peek_char() == Some(&(b'[')) {
                    self.pos += 1;
                    let inl = self.make_inline(
                        NodeValue::Text("![".to_string()),
                        self.pos - 2,
                        self.pos - 1,
                    );
                    self.push_bracket(true, inl);
                    Some(inl)
                } else {
                    Some(self.make_inline(
                        NodeValue::Text("!".to_string()),
                        self.pos - 1,
                        self.pos - 1,
                    ))
                }
            }
            _ => {
                let mut endpos = self.find_special_char();
                let mut startpos = self.pos;
                self.pos = endpos;

                if self
                    .peek_char()
                    .map_or(false, |&c| strings::is_line_end_char(c))
                {
                    let trimmed = strings::rtrim_slice(&self.input[startpos..endpos]);
                    endpos = startpos + trimmed.len();
                }

                // if we've just produced a LineBreak, then we should consume
                // any leading space on this line
                if self.tree.last_child(node).map_or(false, |n| {
                    matches!(self.tree.ast(n).value, NodeValue::LineBreak)
                }) {
                    let trimmed = strings::ltrim_slice(&self.input[startpos..endpos]);
                    startpos = endpos - trimmed.len();
                }

                // Don't create empty text nodes - this can happen after
                // trimming trailing whitespace and would cause sourcepos
                // underflow in endpos - 1
                if startpos < endpos {
                    let contents = str::from_utf8(&self.input[startpos..endpos])
                        .unwrap()
                        .to_string();
                    Some(self.make_inline(NodeValue::Text(contents), startpos, endpos - 1))
                } else {
                    None
                }
            }
        };

        if let Some(inl) = new_inl {
            self.tree.append(node, inl);
        }

        true
    }

    // After parsing a block (and sometimes during), this function traverses
    // the stack of `Delimiters`, tokens ("*", "_") that may delimit regions of
    // text for emphasis rendering; looking for pairs of opening and closing
    // delimiters, with the goal of placing the intervening nodes into new
    // emphasis AST nodes.
    //
    // The term stack here is a bit of a misnomer, as the `Delimiters` actually
    // form a doubly-linked list. Items are pushed onto the stack during
    // parsing, but during post-processing are removed from arbitrary
    // locations.
    //
    // The `Delimiter` references AST `Text` nodes, which are also linked into
    // the AST as siblings in the order they are parsed. This function doesn't
    // know a-priori which ones are markdown syntax and which are just text:
    // candidate delimiters that match have their nodes removed from the AST,
    // as they are markdown, and their intervening siblings lowered into a new
    // AST parent node via the `insert_emph` function; candidate delimiters
    // that don't match are left in the tree.
    //
    // The basic algorithm is to start at the bottom of the stack, walk upwards
    // looking for closing delimiters, and from each closing delimiter walk
    // back down the stack looking for its matching opening delimiter. This
    // traversal favors the smallest matching leftmost pairs, e.g.
    //
    //   _a *b c_ d* e_
    //    ~~~~~~
    //
    // (The emphasis region is wavy-underlined)
    //
    // All of the `_` and `*` tokens are scanned as candidates, but only the
    // region "a *b c" is lowered into an `Emph` node; the other candidate
    // delimiters are all actually text.
    //
    // There's some additional trickiness in the logic because "_", "__", and
    // "___" (and etc. etc.) all share the same delim_char, but represent
    // different emphasis. Note also that "_"- and "*"-delimited regions have
    // complex rules for which can be opening and/or closing delimiters,
    // determined in `scan_delims`.
    pub fn process_emphasis(&mut self, stack_bottom: usize) {
        // This array is an important optimization that prevents searching down
        // the stack for openers we've previously searched for and know don't
        // exist, preventing exponential blowup on pathological cases.
        let mut openers_bottom: [usize; 7] = [stack_bottom; 7];

        // This is traversing the stack from the top to the bottom, setting
        // `closer` to the delimiter directly above `stack_bottom`, or the very
        // bottom of the stack when we are processing an entire block.
        let mut candidate = self.last_delimiter;
        let mut closer: Option<usize> = None;
        while candidate.map_or(false, |c| self.delimiters[c].position >= stack_bottom) {
            closer = candidate;
            candidate = self.delimiters[candidate.unwrap()].prev;
        }

        while let Some(c) = closer {
            if self.delimiters[c].can_close {
                // Each time through the outer `closer` loop we reset the
                // opener to the element below the closer, and search down the
                // stack for a matching opener.

                let mut opener = self.delimiters[c].prev;
                let mut opener_found = false;
                let mut mod_three_rule_invoked = false;

                let ix = match self.delimiters[c].delim_char {
                    b'_' => 0,
                    b'*' => {
                        1 + (if self.delimiters[c].can_open { 3 } else { 0 })
                            + (self.delimiters[c].length % 3)
                    }
                    _ => unreachable!(),
                };

                // Here's where we find the opener by searching down the stack,
                // looking for matching delims with the `can_open` flag.
                //
                // This search short-circuits for openers we've previously
                // failed to find, avoiding repeatedly rescanning the bottom of
                // the stack, using the openers_bottom array.
                while opener.map_or(false, |o| self.delimiters[o].position >= openers_bottom[ix]) {
                    let o = opener.unwrap();
                    if self.delimiters[o].can_open
                        && self.delimiters[o].delim_char == self.delimiters[c].delim_char
                    {
                        // This is a bit convoluted; see points 9 and 10 here:
                        // http://spec.commonmark.org/0.28/#can-open-emphasis.
                        // This is to aid processing of runs like this:
                        // “***hello*there**” or “***hello**there*”. In this
                        // case, the middle delimiter can both open and close
                        // emphasis; when trying to find an opening delimiter
                        // that matches the last ** or *, we need to skip it,
                        // and this algorithm ensures we do. (The sum of the
                        // lengths are a multiple of 3.)
                        let odd_match = (self.delimiters[c].can_open
                            || self.delimiters[o].can_close)
                            && ((self.delimiters[o].length + self.delimiters[c].length) % 3 == 0)
                            && !(self.delimiters[o].length % 3 == 0
                                && self.delimiters[c].length % 3 == 0);
                        if !odd_match {
                            opener_found = true;
                            break;
                        } else {
                            mod_three_rule_invoked = true;
                        }
                    }
                    opener = self.delimiters[o].prev;
                }

                let old_c = c;

                if opener_found {
                    // Finally, here's the happy case where the delimiters
                    // match and they are inserted. We get a new closer
                    // delimiter and go around the loop again.
                    //
                    // Note that for "***" and "___" delimiters of length
                    // greater than 2, insert_emph will create a `Strong` node
                    // (i.e. "**"), then _truncate_ the delimiters in place,
                    // turning them into e.g. "*" delimiters, and hand us back
                    // the same mutated closer to be matched again.
                    //
                    // In general though the closer will be the next delimiter
                    // up the stack.
                    closer = self.insert_emph(opener.unwrap(), c);
                } else {
                    // When no matching opener is found we move the closer up
                    // the stack, do some bookkeeping with old_closer (below),
                    // try again.
                    closer = self.delimiters[c].next;
                }

                // If the search for an opener was unsuccessful, then record
                // the position the search started at in the `openers_bottom`
                // so that the `opener` search can avoid looking for this same
                // opener at the bottom of the stack later.
                if !opener_found {
                    if !mod_three_rule_invoked {
                        openers_bottom[ix] = self.delimiters[old_c].position;
                    }

                    // Now that we've failed the `opener` search starting from
                    // `old_closer`, future opener searches will be searching
                    // it for openers - if `old_closer` can't be used as an
                    // opener then we know it's just text - remove it from the
                    // delimiter stack, leaving it in the AST as text.
                    if !self.delimiters[old_c].can_open {
                        self.remove_delimiter(old_c);
                    }
                }
            } else {
                // Closer is !can_close. Move up the stack
                closer = self.delimiters[c].next;
            }
        }

        // At this point the entire delimiter stack from `stack_bottom` up has
        // been scanned for matches, everything left is just text. Pop it all
        // off.
        self.remove_delimiters(stack_bottom);
    }

    fn remove_delimiter(&mut self, delimiter: usize) {
        if self.delimiters[delimiter].next.is_none() {
            assert!(Some(delimiter) == self.last_delimiter);
            self.last_delimiter = self.delimiters[delimiter].prev;
        } else {
            let next = self.delimiters[delimiter].next.unwrap();
            self.delimiters[next].prev = self.delimiters[delimiter].prev;
        }
        if let Some(prev) = self.delimiters[delimiter].prev {
            self.delimiters[prev].next = self.delimiters[delimiter].next;
        }
    }

    fn remove_delimiters(&mut self, stack_bottom: usize) {
        while self
            .last_delimiter
            .map_or(false, |d| self.delimiters[d].position >= stack_bottom)
        {
            self.remove_delimiter(self.last_delimiter.unwrap());
        }
    }

    #[inline]
    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[inline]
    pub fn peek_char(&self) -> Option<&u8> {
        self.peek_char_n(0)
    }

    #[inline]
    fn peek_char_n(&self, n: usize) -> Option<&u8> {
        if self.pos + n >= self.input.len() {
            None
        } else {
            let c = &self.input[self.pos + n];
            assert!(*c > 0);
            Some(c)
        }
    }

    fn find_special_char(&self) -> usize {
        for n in self.pos..self.input.len() {
            if self.special_chars[self.input[n] as usize] {
                return n;
            }
        }

        self.input.len()
    }

    fn adjust_node_newlines(&mut self, node: NodeId, matchlen: usize, extra: usize) {
        let (newlines, since_newline) =
            count_newlines(&self.input[self.pos - matchlen - extra..self.pos - extra]);

        if newlines > 0 {
            self.line += newlines;
            let node_ast = self.tree.ast_mut(node);
            node_ast.sourcepos.end.line += newlines;
            let adjusted_line = self.line - node_ast.sourcepos.start.line;
            node_ast.sourcepos.end.column =
                self.block_offsets[adjusted_line] + since_newline + extra;
            self.column_offset = -(self.pos as isize) + since_newline as isize + extra as isize;
        }
    }

    fn handle_newline(&mut self) -> NodeId {
        let nlpos = self.pos;
        if self.input[self.pos] == b'\r' {
            self.pos += 1;
        }
        if self.input[self.pos] == b'\n' {
            self.pos += 1;
        }
        let inl = if nlpos > 1 && self.input[nlpos - 1] == b' ' && self.input[nlpos - 2] == b' ' {
            self.make_inline(NodeValue::LineBreak, nlpos - 2, self.pos - 1)
        } else {
            self.make_inline(NodeValue::SoftBreak, nlpos, self.pos - 1)
        };
        self.line += 1;
        self.column_offset = -(self.pos as isize);
        self.skip_spaces();
        inl
    }

    fn take_while(&mut self, c: u8) -> usize {
        let start_pos = self.pos;
        while self.peek_char() == Some(&c) {
            self.pos += 1;
        }
        self.pos - start_pos
    }

    fn scan_to_closing_backtick(&mut self, openticklength: usize) -> Option<usize> {
        if openticklength > MAXBACKTICKS {
            return None;
        }

        if self.scanned_for_backticks && self.backticks[openticklength] <= self.pos {
            return None;
        }

        loop {
            while self.peek_char().map_or(false, |&c| c != b'`') {
                self.pos += 1;
            }
            if self.pos >= self.input.len() {
                self.scanned_for_backticks = true;
                return None;
            }
            let numticks = self.take_while(b'`');
            if numticks <= MAXBACKTICKS {
                self.backticks[numticks] = self.pos - numticks;
            }
            if numticks == openticklength {
                return Some(self.pos);
            }
        }
    }

    fn handle_backticks(&mut self) -> NodeId {
        let startpos = self.pos;
        let openticks = self.take_while(b'`');
        let endpos = self.scan_to_closing_backtick(openticks);

        match endpos {
            None => {
                self.pos = startpos + openticks;
                self.make_inline(
                    NodeValue::Text("`".repeat(openticks)),
                    startpos,
                    self.pos - 1,
                )
            }
            Some(endpos) => {
                let buf = strings::normalize_code(
                    &self.input[startpos + openticks..endpos - openticks],
                );
                let code = NodeCode {
                    num_backticks: openticks,
                    literal: String::from_utf8(buf).unwrap(),
                };
                let node = self.make_inline(NodeValue::Code(code), startpos, endpos - 1);
                self.adjust_node_newlines(node, endpos - startpos - openticks, openticks);
                node
            }
        }
    }

    pub fn skip_spaces(&mut self) -> bool {
        let mut skipped = false;
        while self.peek_char().map_or(false, |&c| c == b' ' || c == b'\t') {
            self.pos += 1;
            skipped = true;
        }
        skipped
    }

    fn handle_delim(&mut self, c: u8) -> NodeId {
        let (numdelims, can_open, can_close) = self.scan_delims(c);

        let contents = str::from_utf8(&self.input[self.pos - numdelims..self.pos])
            .unwrap()
            .to_string();
        let inl = self.make_inline(
            NodeValue::Text(contents),
            self.pos - numdelims,
            self.pos - 1,
        );

        if can_open || can_close {
            self.push_delimiter(c, can_open, can_close, inl);
        }

        inl
    }

    #[inline]
    fn get_before_char(&self, pos: usize) -> char {
        if pos == 0 {
            return '\n';
        }
        let mut before_char_pos = pos - 1;
        while before_char_pos > 0 && self.input[before_char_pos] >> 6 == 2 {
            before_char_pos -= 1;
        }
        match unsafe { str::from_utf8_unchecked(&self.input[before_char_pos..pos]) }
            .chars()
            .next()
        {
            Some(x) => x,
            None => '\n',
        }
    }

    fn scan_delims(&mut self, c: u8) -> (usize, bool, bool) {
        let before_char = self.get_before_char(self.pos);

        let mut numdelims = 0;
        while self.peek_char() == Some(&c) {
            numdelims += 1;
            self.pos += 1;
        }

        let after_char = if self.eof() {
            '\n'
        } else {
            match unsafe { str::from_utf8_unchecked(&self.input[self.pos..]) }
                .chars()
                .next()
            {
                Some(x) => x,
                None => '\n',
            }
        };

        let left_flanking = numdelims > 0
            && !after_char.is_whitespace()
            && (!after_char.is_cmark_punctuation()
                || before_char.is_whitespace()
                || before_char.is_cmark_punctuation());
        let right_flanking = numdelims > 0
            && !before_char.is_whitespace()
            && (!before_char.is_cmark_punctuation()
                || after_char.is_whitespace()
                || after_char.is_cmark_punctuation());

        if c == b'_' {
            (
                numdelims,
                left_flanking && (!right_flanking || before_char.is_cmark_punctuation()),
                right_flanking && (!left_flanking || after_char.is_cmark_punctuation()),
            )
        } else {
            (numdelims, left_flanking, right_flanking)
        }
    }

    fn push_delimiter(&mut self, c: u8, can_open: bool, can_close: bool, inl: NodeId) {
        let length = self.tree.ast(inl).value.text().unwrap().len();
        let d = self.delimiters.len();
        self.delimiters.push(Delimiter {
            prev: self.last_delimiter,
            next: None,
            inl,
            position: self.pos,
            length,
            delim_char: c,
            can_open,
            can_close,
        });
        if let Some(prev) = self.last_delimiter {
            self.delimiters[prev].next = Some(d);
        }
        self.last_delimiter = Some(d);
    }

    fn insert_emph(&mut self, opener: usize, closer: usize) -> Option<usize> {
        let opener_inl = self.delimiters[opener].inl;
        let closer_inl = self.delimiters[closer].inl;
        let mut opener_num_chars = self.tree.ast(opener_inl).value.text().unwrap().len();
        let mut closer_num_chars = self.tree.ast(closer_inl).value.text().unwrap().len();
        let use_delims = if closer_num_chars >= 2 && opener_num_chars >= 2 {
            2
        } else {
            1
        };

        opener_num_chars -= use_delims;
        closer_num_chars -= use_delims;

        self.tree
            .ast_mut(opener_inl)
            .value
            .text_mut()
            .unwrap()
            .truncate(opener_num_chars);
        self.tree
            .ast_mut(closer_inl)
            .value
            .text_mut()
            .unwrap()
            .truncate(closer_num_chars);

        // Remove all the candidate delimiters from between the opener and the
        // closer. None of them are matched pairs. They've been scanned
        // already.
        let mut delim = self.delimiters[closer].prev;
        while delim.is_some() && delim != Some(opener) {
            self.remove_delimiter(delim.unwrap());
            delim = self.delimiters[delim.unwrap()].prev;
        }

        let emph = self.make_inline(
            if use_delims == 1 {
                NodeValue::Emph
            } else {
                NodeValue::Strong
            },
            // These are overriden immediately below.
            self.pos,
            self.pos,
        );

        self.tree.ast_mut(emph).sourcepos = (
            self.tree.ast(opener_inl).sourcepos.start.line,
            self.tree.ast(opener_inl).sourcepos.start.column + opener_num_chars,
            self.tree.ast(closer_inl).sourcepos.end.line,
            self.tree.ast(closer_inl).sourcepos.end.column - closer_num_chars,
        )
            .into();

        // Drop all the interior AST nodes into the emphasis node and then
        // insert the emphasis node
        let mut tmp = self.tree.next_sibling(opener_inl).unwrap();
        while tmp != closer_inl {
            let next = self.tree.next_sibling(tmp);
            self.tree.append(emph, tmp);
            if let Some(n) = next {
                tmp = n;
            } else {
                break;
            }
        }
        self.tree.insert_after(opener_inl, emph);

        // Drop completely "used up" delimiters, adjust sourcepos of those not,
        // and return the next closest one for processing.
        if opener_num_chars == 0 {
            self.tree.detach(opener_inl);
            self.remove_delimiter(opener);
        } else {
            self.tree.ast_mut(opener_inl).sourcepos.end.column -= use_delims;
        }

        if closer_num_chars == 0 {
            self.tree.detach(closer_inl);
            self.remove_delimiter(closer);
            self.delimiters[closer].next
        } else {
            self.tree.ast_mut(closer_inl).sourcepos.start.column += use_delims;
            Some(closer)
        }
    }

    fn handle_backslash(&mut self) -> NodeId {
        let startpos = self.pos;
        self.pos += 1;

        if self.peek_char().map_or(false, |&c| ispunct(c)) {
            self.pos += 1;

            self.make_inline(
                NodeValue::Text(String::from_utf8(vec![self.input[self.pos - 1]]).unwrap()),
                self.pos - 2,
                self.pos - 1,
            )
        } else if !self.eof() && self.skip_line_end() {
            let inl = self.make_inline(NodeValue::LineBreak, startpos, self.pos - 1);
            self.line += 1;
            self.column_offset = -(self.pos as isize);
            self.skip_spaces();
            inl
        } else {
            self.make_inline(
                NodeValue::Text("\\".to_string()),
                self.pos - 1,
                self.pos - 1,
            )
        }
    }

    pub fn skip_line_end(&mut self) -> bool {
        let old_pos = self.pos;
        if self.peek_char() == Some(&(b'\r')) {
            self.pos += 1;
        }
        if self.peek_char() == Some(&(b'\n')) {
            self.pos += 1;
        }
        self.pos > old_pos || self.eof()
    }

    fn handle_entity(&mut self) -> NodeId {
        self.pos += 1;

        match entity::unescape(&self.input[self.pos..]) {
            None => self.make_inline(NodeValue::Text("&".to_string()), self.pos - 1, self.pos - 1),
            Some((entity, len)) => {
                self.pos += len;
                self.make_inline(
                    NodeValue::Text(String::from_utf8(entity).unwrap()),
                    self.pos - 1 - len,
                    self.pos - 1,
                )
            }
        }
    }

    fn handle_pointy_brace(&mut self) -> NodeId {
        self.pos += 1;

        if let Some(matchlen) = scanners::autolink_uri(&self.input[self.pos..]) {
            self.pos += matchlen;
            let url = self.input[self.pos - matchlen..self.pos - 1].to_vec();
            return self.make_autolink(
                &url,
                AutolinkType::Uri,
                self.pos - 1 - matchlen,
                self.pos - 1,
            );
        }

        if let Some(matchlen) = scanners::autolink_email(&self.input[self.pos..]) {
            self.pos += matchlen;
            let url = self.input[self.pos - matchlen..self.pos - 1].to_vec();
            return self.make_autolink(
                &url,
                AutolinkType::Email,
                self.pos - 1 - matchlen,
                self.pos - 1,
            );
        }

        // Most comments below are verbatim from cmark upstream.
        let mut matchlen: Option<usize> = None;

        if self.pos + 2 <= self.input.len() {
            let c = self.input[self.pos];
            if c == b'!' && !self.flags.skip_html_comment {
                let c = self.input[self.pos + 1];
                if c == b'-' && self.peek_char_n(2) == Some(&b'-') {
                    if self.peek_char_n(3) == Some(&b'>') {
                        matchlen = Some(4);
                    } else if self.peek_char_n(3) == Some(&b'-')
                        && self.peek_char_n(4) == Some(&b'>')
                    {
                        matchlen = Some(5);
                    } else if let Some(m) = scanners::html_comment(&self.input[self.pos + 1..]) {
                        matchlen = Some(m + 1);
                    } else {
                        self.flags.skip_html_comment = true;
                    }
                } else if c == b'[' {
                    if !self.flags.skip_html_cdata && self.pos + 3 <= self.input.len() {
                        if let Some(m) = scanners::html_cdata(&self.input[self.pos + 2..]) {
                            // The regex doesn't require the final "]]>". But
                            // if we're not at the end of input, it must come
                            // after the match. Otherwise, disable subsequent
                            // scans to avoid quadratic behavior.

                            // Adding 5 to matchlen for prefix "![", suffix
                            // "]]>"
                            if self.pos + m + 5 > self.input.len() {
                                self.flags.skip_html_cdata = true;
                            } else {
                                matchlen = Some(m + 5);
                            }
                        }
                    }
                } else if !self.flags.skip_html_declaration {
                    if let Some(m) = scanners::html_declaration(&self.input[self.pos + 1..]) {
                        // Adding 2 to matchlen for prefix "!", suffix ">"
                        if self.pos + m + 2 > self.input.len() {
                            self.flags.skip_html_declaration = true;
                        } else {
                            matchlen = Some(m + 2);
                        }
                    }
                }
            } else if c == b'?' {
                if !self.flags.skip_html_pi {
                    // Note that we allow an empty match.
                    let m = scanners::html_processing_instruction(&self.input[self.pos + 1..])
                        .unwrap_or(0);
                    // Adding 3 to matchlen for prefix "?", suffix "?>"
                    if self.pos + m + 3 > self.input.len() {
                        self.flags.skip_html_pi = true;
                    } else {
                        matchlen = Some(m + 3);
                    }
                }
            } else {
                matchlen = scanners::html_tag(&self.input[self.pos..]);
            }
        }

        if let Some(matchlen) = matchlen {
            let contents = str::from_utf8(&self.input[self.pos - 1..self.pos + matchlen])
                .unwrap()
                .to_string();
            self.pos += matchlen;
            let inl = self.make_inline(
                NodeValue::HtmlInline(contents),
                self.pos - matchlen - 1,
                self.pos - 1,
            );
            self.adjust_node_newlines(inl, matchlen, 1);
            return inl;
        }

        self.make_inline(NodeValue::Text("<".to_string()), self.pos - 1, self.pos - 1)
    }

    fn push_bracket(&mut self, image: bool, inl_text: NodeId) {
        let len = self.brackets.len();
        if len > 0 {
            self.brackets[len - 1].bracket_after = true;
        }
        self.brackets.push(Bracket {
            inl_text,
            position: self.pos,
            image,
            bracket_after: false,
        });
        if !image {
            self.no_link_openers = false;
        }
    }

    fn handle_close_bracket(&mut self) -> Option<NodeId> {
        self.pos += 1;
        let initial_pos = self.pos;

        let brackets_len = self.brackets.len();
        if brackets_len == 0 {
            return Some(self.make_inline(
                NodeValue::Text("]".to_string()),
                self.pos - 1,
                self.pos - 1,
            ));
        }

        let is_image = self.brackets[brackets_len - 1].image;

        if !is_image && self.no_link_openers {
            self.brackets.pop();
            return Some(self.make_inline(
                NodeValue::Text("]".to_string()),
                self.pos - 1,
                self.pos - 1,
            ));
        }

        let after_link_text_pos = self.pos;

        // Try to find a link destination within parenthesis

        let mut sps = 0;
        let mut url: Vec<u8> = vec![];
        let mut n: usize = 0;
        if self.peek_char() == Some(&(b'(')) && {
            sps = scanners::spacechars(&self.input[self.pos + 1..]).unwrap_or(0);
            let offset = self.pos + 1 + sps;
            offset < self.input.len()
                && match manual_scan_link_url(&self.input[offset..]) {
                    Some((u, n_)) => {
                        url = u.to_vec();
                        n = n_;
                        true
                    }
                    None => false,
                }
        } {
            let starturl = self.pos + 1 + sps;
            let endurl = starturl + n;
            let starttitle = endurl + scanners::spacechars(&self.input[endurl..]).unwrap_or(0);
            let endtitle = if starttitle == endurl {
                starttitle
            } else {
                starttitle + scanners::link_title(&self.input[starttitle..]).unwrap_or(0)
            };
            let endall = endtitle + scanners::spacechars(&self.input[endtitle..]).unwrap_or(0);

            if endall < self.input.len() && self.input[endall] == b')' {
                self.pos = endall + 1;
                let url = strings::clean_url(&url);
                let title = strings::clean_title(&self.input[starttitle..endtitle]);
                self.close_bracket_match(
                    is_image,
                    String::from_utf8(url).unwrap(),
                    String::from_utf8(title).unwrap(),
                );
                return None;
            } else {
                self.pos = after_link_text_pos;
            }
        }

        // Try to see if this is a reference link

        let (mut lab, mut found_label) = match self.link_label() {
            Some(lab) => (lab.to_string(), true),
            None => ("".to_string(), false),
        };

        if !found_label {
            self.pos = initial_pos;
        }

        if (!found_label || lab.is_empty()) && !self.brackets[brackets_len - 1].bracket_after {
            lab = str::from_utf8(
                &self.input[self.brackets[brackets_len - 1].position..initial_pos - 1],
            )
            .unwrap()
            .to_string();
            found_label = true;
        }

        let lab = strings::normalize_label(&lab);
        let reff = if found_label {
            self.refmap.lookup(&lab)
        } else {
            None
        };

        if let Some(reff) = reff {
            self.close_bracket_match(is_image, reff.url.clone(), reff.title);
            return None;
        }

        self.brackets.pop();
        self.pos = initial_pos;
        Some(self.make_inline(NodeValue::Text("]".to_string()), self.pos - 1, self.pos - 1))
    }

    fn close_bracket_match(&mut self, is_image: bool, url: String, title: String) {
        let brackets_len = self.brackets.len();

        let nl = NodeLink { url, title };
        let inl = self.make_inline(
            if is_image {
                NodeValue::Image(nl)
            } else {
                NodeValue::Link(nl)
            },
            // Manually set below.
            self.pos,
            self.pos,
        );

        let bracket_inl_text = self.brackets[brackets_len - 1].inl_text;
        self.tree.ast_mut(inl).sourcepos.start = self.tree.ast(bracket_inl_text).sourcepos.start;
        self.tree.ast_mut(inl).sourcepos.end.column =
            usize::try_from(self.pos as isize + self.column_offset + self.line_offset as isize)
                .unwrap();

        self.tree.insert_before(bracket_inl_text, inl);
        let mut tmpch = self.tree.next_sibling(bracket_inl_text);
        while let Some(tmp) = tmpch {
            tmpch = self.tree.next_sibling(tmp);
            self.tree.append(inl, tmp);
        }
        self.tree.detach(bracket_inl_text);
        self.process_emphasis(self.brackets[brackets_len - 1].position);
        self.brackets.pop();

        if !is_image {
            self.no_link_openers = true;
        }
    }

    pub fn link_label(&mut self) -> Option<&str> {
        let startpos = self.pos;

        if self.peek_char() != Some(&(b'[')) {
            return None;
        }

        self.pos += 1;

        let mut length = 0;
        let mut c = 0;
        while self.peek_char().map_or(false, |&ch| {
            c = ch;
            ch != b'[' && ch != b']'
        }) {
            if c == b'\\' {
                self.pos += 1;
                length += 1;
                if self.peek_char().map_or(false, |&c| ispunct(c)) {
                    self.pos += 1;
                    length += 1;
                }
            } else {
                self.pos += 1;
                length += 1;
            }
            if length > MAX_LINK_LABEL_LENGTH {
                self.pos = startpos;
                return None;
            }
        }

        if c == b']' {
            let raw_label = strings::trim_slice(&self.input[startpos + 1..self.pos]);
            self.pos += 1;
            Some(str::from_utf8(raw_label).unwrap())
        } else {
            self.pos = startpos;
            None
        }
    }

    fn make_inline(&mut self, value: NodeValue, start_column: usize, end_column: usize) -> NodeId {
        let start_column =
            start_column as isize + 1 + self.column_offset + self.line_offset as isize;
        let end_column = end_column as isize + 1 + self.column_offset + self.line_offset as isize;

        let ast = Ast {
            value,
            content: String::new(),
            sourcepos: (
                self.line,
                usize::try_from(start_column).unwrap(),
                self.line,
                usize::try_from(end_column).unwrap(),
            )
                .into(),
            open: false,
            last_line_blank: false,
            line_offsets: Vec::with_capacity(0),
        };
        self.tree.alloc(ast)
    }

    fn make_autolink(
        &mut self,
        url: &[u8],
        kind: AutolinkType,
        start_column: usize,
        end_column: usize,
    ) -> NodeId {
        let inl = self.make_inline(
            NodeValue::Link(NodeLink {
                url: String::from_utf8(strings::clean_autolink(url, kind)).unwrap(),
                title: String::new(),
            }),
            start_column,
            end_column,
        );
        let tnode = self.make_inline(
            NodeValue::Text(String::from_utf8(entity::unescape_html(url)).unwrap()),
            start_column + 1,
            end_column - 1,
        );
        self.tree.append(inl, tnode);
        inl
    }
}

/// A bare cursor over a block's string content, used when looking for link
/// reference definitions during block finalization.
pub struct Scanner {
    pub pos: usize,
}

impl Scanner {
    pub fn new() -> Self {
        Scanner { pos: 0 }
    }

    pub fn peek_byte(&self, s: &str) -> Option<u8> {
        s.as_bytes().get(self.pos).copied()
    }

    pub fn skip_spaces(&mut self, s: &str) -> bool {
        let mut skipped = false;
        while self
            .peek_byte(s)
            .map_or(false, |c| c == b' ' || c == b'\t')
        {
            self.pos += 1;
            skipped = true;
        }
        skipped
    }

    pub fn skip_line_end(&mut self, s: &str) -> bool {
        let old_pos = self.pos;
        if self.peek_byte(s) == Some(b'\r') {
            self.pos += 1;
        }
        if self.peek_byte(s) == Some(b'\n') {
            self.pos += 1;
        }
        self.pos > old_pos || self.pos >= s.len()
    }

    pub fn spnl(&mut self, s: &str) {
        self.skip_spaces(s);
        if self.skip_line_end(s) {
            self.skip_spaces(s);
        }
    }

    pub fn link_label<'s>(&mut self, s: &'s str) -> Option<&'s str> {
        let startpos = self.pos;
        let bytes = s.as_bytes();

        if self.peek_byte(s) != Some(b'[') {
            return None;
        }

        self.pos += 1;

        let mut length = 0;
        let mut c = 0;
        while self.peek_byte(s).map_or(false, |ch| {
            c = ch;
            ch != b'[' && ch != b']'
        }) {
            if c == b'\\' {
                self.pos += 1;
                length += 1;
                if self.peek_byte(s).map_or(false, ispunct) {
                    self.pos += 1;
                    length += 1;
                }
            } else {
                self.pos += 1;
                length += 1;
            }
            if length > MAX_LINK_LABEL_LENGTH {
                self.pos = startpos;
                return None;
            }
        }

        if c == b']' {
            let raw_label = strings::trim_slice(&bytes[startpos + 1..self.pos]);
            self.pos += 1;
            Some(str::from_utf8(raw_label).unwrap())
        } else {
            self.pos = startpos;
            None
        }
    }
}

pub fn manual_scan_link_url(input: &[u8]) -> Option<(&[u8], usize)> {
    let len = input.len();
    let mut i = 0;

    if i < len && input[i] == b'<' {
        i += 1;
        while i < len {
            let b = input[i];
            if b == b'>' {
                i += 1;
                break;
            } else if b == b'\\' {
                i += 2;
            } else if b == b'\n' || b == b'<' {
                return None;
            } else {
                i += 1;
            }
        }
    } else {
        return manual_scan_link_url_2(input);
    }

    if i >= len {
        None
    } else {
        Some((&input[1..i - 1], i))
    }
}

pub fn manual_scan_link_url_2(input: &[u8]) -> Option<(&[u8], usize)> {
    let len = input.len();
    let mut i = 0;
    let mut nb_p = 0;

    while i < len {
        if input[i] == b'\\' && i + 1 < len && ispunct(input[i + 1]) {
            i += 2;
        } else if input[i] == b'(' {
            nb_p += 1;
            i += 1;
            if nb_p > 32 {
                return None;
            }
        } else if input[i] == b')' {
            if nb_p == 0 {
                break;
            }
            nb_p -= 1;
            i += 1;
        } else if isspace(input[i]) || input[i].is_ascii_control() {
            if i == 0 {
                return None;
            }
            break;
        } else {
            i += 1;
        }
    }

    if i >= len || nb_p != 0 {
        None
    } else {
        Some((&input[..i], i))
    }
}

pub fn count_newlines(input: &[u8]) -> (usize, usize) {
    let mut nls = 0;
    let mut since_nl = 0;

    for &c in input {
        if c == b'\n' {
            nls += 1;
            since_nl = 0;
        } else {
            since_nl += 1;
        }
    }

    (nls, since_nl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_url_pointy() {
        let (url, len) = manual_scan_link_url(b"<foo bar>)").unwrap();
        assert_eq!(url, b"foo bar");
        assert_eq!(len, 9);
    }

    #[test]
    fn link_url_pointy_rejects_newline() {
        assert!(manual_scan_link_url(b"<foo\nbar>").is_none());
    }

    #[test]
    fn link_url_bare_balanced_parens() {
        let (url, len) = manual_scan_link_url_2(b"foo(and(bar)) baz").unwrap();
        assert_eq!(url, b"foo(and(bar))");
        assert_eq!(len, 13);
    }

    #[test]
    fn link_url_bare_paren_cap() {
        let deep = "(".repeat(33);
        assert!(manual_scan_link_url_2(deep.as_bytes()).is_none());
    }

    #[test]
    fn newline_counting() {
        assert_eq!(count_newlines(b"a\nbc\ndef"), (2, 3));
        assert_eq!(count_newlines(b"abc"), (0, 3));
    }

    #[test]
    fn scanner_link_label() {
        let mut sc = Scanner::new();
        assert_eq!(sc.link_label("[foo]: /url"), Some("foo"));
        assert_eq!(sc.pos, 5);
    }

    #[test]
    fn scanner_link_label_unclosed() {
        let mut sc = Scanner::new();
        assert_eq!(sc.link_label("[foo"), None);
        assert_eq!(sc.pos, 0);
    }
}
