//! Re-emitter: applies synthesized edits to the tree and prints it back as Go.
//!
//! Layout follows gofmt:
//! - tab indentation by block depth, `case`/`default` at switch depth, labels outdented
//! - one statement per line; control statement blocks always span lines, short
//!   function bodies written on one line stay there
//! - line breaks inside a statement are kept, continuation lines indented per open bracket line
//! - struct fields, grouped specs, `key: value` lists and trailing comments align in columns
//! - at most one blank line between elements, none after `{` or before `}`
//! - comments stay at their source positions

use crate::compiler::align::{tabwrite, Hints, CELL, SECTION};
use crate::compiler::ast::*;
use crate::compiler::synth::SynthesizedEdit;
use crate::compiler::tokens::{Comment, Span, TokenKind};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Apply edits in place. Consumed directive comments are removed.
pub fn apply_edits(unit: &mut SourceUnit, mut edits: Vec<SynthesizedEdit>) {
    let consumed: HashSet<usize> = edits.iter().map(|e| e.directive_offset).collect();
    unit.comments.retain(|c| !consumed.contains(&c.span.start));

    // Deepest and latest first, so earlier paths and indices stay valid.
    edits.sort_by(|a, b| {
        let ka = a.candidate.block.key(a.candidate.index);
        let kb = b.candidate.block.key(b.candidate.index);
        kb.cmp(&ka)
    });

    for edit in edits {
        let path = edit.candidate.block.clone();
        let index = edit.candidate.index;
        let Some(block) = path.block_at_mut(&mut unit.root) else {
            warn!(line = edit.candidate.statement_line, "edit target block vanished");
            continue;
        };
        if let Some(Stmt::Source(stmt)) = block.stmts.get_mut(index) {
            if let Some(Piece::Token(tok)) = stmt.pieces.get_mut(edit.candidate.target_piece) {
                tok.text = edit.renamed_target.clone();
            }
        }
        block.stmts.insert(index + 1, Stmt::ErrCheck(edit.inserted));

        for depth in 0..=path.0.len() {
            if let Some(b) = BlockPath(path.0[..depth].to_vec()).block_at_mut(&mut unit.root) {
                b.edited = true;
            }
        }
    }
}

/// Print a unit with the canonical layout.
pub fn print(unit: &SourceUnit) -> String {
    let mut printer = Printer::new(&unit.comments);
    printer.items(&unit.root.stmts, 0, usize::MAX);
    printer.comments_before(usize::MAX, 0);
    printer.finish()
}

/// Apply `edits` and print the result.
pub fn emit(mut unit: SourceUnit, edits: Vec<SynthesizedEdit>) -> String {
    apply_edits(&mut unit, edits);
    print(&unit)
}

/// gofmt keeps a function body on one line up to this width, header included.
const MAX_INLINE_WIDTH: usize = 100;
const MAX_INLINE_STMTS: usize = 5;

struct Prev {
    end: usize,
    end_line: usize,
    opener: bool,
}

struct Printer<'a> {
    out: String,
    comments: &'a [Comment],
    /// Next comment to print
    next: usize,
    /// Last source line that produced output
    last_line: usize,
    /// Indent of the output line being written
    line_indent: usize,
    /// No blank line may be opened before the next element
    fresh: bool,
    /// The next line starts an alignment section
    section: bool,
    /// Cell ends owed before a trailing comment on this line
    pad: usize,
}

impl<'a> Printer<'a> {
    fn new(comments: &'a [Comment]) -> Self {
        Self {
            out: String::new(),
            comments,
            next: 0,
            last_line: 0,
            line_indent: 0,
            fresh: true,
            section: false,
            pad: 0,
        }
    }

    fn finish(mut self) -> String {
        self.out = tabwrite(&self.out);
        let len = self.out.trim_end().len();
        self.out.truncate(len);
        self.out.push('\n');
        self.out
    }

    fn newline(&mut self, indent: usize) {
        if !self.out.is_empty() {
            let len = self.out.trim_end_matches([' ', '\t']).len();
            self.out.truncate(len);
            self.out.push('\n');
        }
        if std::mem::take(&mut self.section) {
            self.out.push(SECTION);
        }
        for _ in 0..indent {
            self.out.push('\t');
        }
        self.line_indent = indent;
        self.pad = 0;
    }

    /// Start a new output line for source `line`, keeping one blank line if the source had any.
    fn break_line(&mut self, line: usize, indent: usize) {
        if !self.fresh && self.last_line > 0 && line > self.last_line + 1 {
            self.newline(0);
        }
        self.newline(indent);
        self.fresh = false;
    }

    fn write_comment(&mut self, comment: &Comment, indent: usize) {
        if !self.out.is_empty() && comment.span.line == self.last_line {
            if comment.is_block {
                self.out.push(' ');
            } else {
                for _ in 0..self.pad.max(1) {
                    self.out.push(CELL);
                }
            }
            self.pad = 0;
        } else {
            self.break_line(comment.span.line, indent);
        }
        self.out.push_str(comment.text.trim_end());
        self.last_line = self.last_line.max(comment.end_line());
    }

    fn comments_before(&mut self, limit: usize, indent: usize) {
        let comments = self.comments;
        while let Some(c) = comments.get(self.next) {
            if c.span.start >= limit {
                break;
            }
            self.write_comment(c, indent);
            self.next += 1;
        }
    }

    /// Comments left on the current line before `limit`.
    fn trailing(&mut self, limit: usize) {
        let comments = self.comments;
        while let Some(c) = comments.get(self.next) {
            if c.span.start >= limit || c.span.line != self.last_line {
                break;
            }
            self.write_comment(c, self.line_indent);
            self.next += 1;
        }
    }

    fn items(&mut self, stmts: &[Stmt], indent: usize, limit: usize) {
        // (previous statement spanned lines, its leading keyword)
        let mut prev: Option<(bool, Option<TokenKind>)> = None;
        for (i, stmt) in stmts.iter().enumerate() {
            let next_start = stmts[i + 1..]
                .iter()
                .find_map(Stmt::start)
                .map(|s| s.start)
                .unwrap_or(limit);
            match stmt {
                Stmt::ErrCheck(check) => {
                    self.err_check(check, indent);
                    prev = Some((true, None));
                }
                Stmt::Source(s) => {
                    let keyword = leading_kind(&s.pieces);
                    if let Some((multiline, prev_keyword)) = prev {
                        // Declarations align until the keyword changes, statements until
                        // one spans lines.
                        self.section =
                            if indent == 0 { prev_keyword != keyword } else { multiline };
                    }
                    let own =
                        if s.shape == Shape::Label { indent.saturating_sub(1) } else { indent };
                    let start = s.start();
                    self.comments_before(start.start, indent);
                    self.break_line(start.line, own);
                    let mark = self.out.len();
                    if s.shape == Shape::Clause {
                        self.clause(s, own, next_start);
                    } else {
                        self.stmt(&s.pieces, own);
                        self.trailing(next_start);
                    }
                    prev = Some((self.out[mark..].contains('\n'), keyword));
                }
            }
        }
    }

    fn stmt(&mut self, pieces: &[Piece], base: usize) {
        let hints = Hints::for_stmt(pieces);
        // Source line of every bracket still open in this statement
        let mut open_lines: Vec<usize> = Vec::new();
        // Output offset of every `func` keyword, by piece index
        let mut funcs: HashMap<usize, usize> = HashMap::new();
        let mut prev: Option<Prev> = None;

        for (i, piece) in pieces.iter().enumerate() {
            let span: Span = match piece {
                Piece::Token(t) if t.implicit => continue,
                Piece::Token(t) => t.span,
                Piece::Block(b) => match b.start() {
                    Some(span) => span,
                    None => continue,
                },
            };

            match &prev {
                Some(p) if span.line > p.end_line => {
                    let closers = pieces[i..]
                        .iter()
                        .take_while(|p| match p {
                            Piece::Token(t) => t.kind.is_closer() && t.span.line == span.line,
                            Piece::Block(_) => false,
                        })
                        .count();
                    let remaining = open_lines.len().saturating_sub(closers);
                    let mut lines = open_lines[..remaining].to_vec();
                    lines.dedup();
                    let cont = if closers == 0 && remaining == 0 { 1 } else { lines.len() };
                    if p.opener {
                        self.fresh = true;
                    }
                    if hints.sections.contains(&i) {
                        self.section = true;
                    }
                    self.comments_before(span.start, base + cont);
                    if closers > 0 {
                        self.fresh = true;
                    }
                    self.break_line(span.line, base + cont);
                }
                Some(p) => {
                    let end = p.end;
                    self.comments_before(span.start, base);
                    match hints.cells.get(&i) {
                        Some(&n) => (0..n).for_each(|_| self.out.push(CELL)),
                        None if span.start > end => self.out.push(' '),
                        None => {}
                    }
                }
                None => self.comments_before(span.start, base),
            }

            match piece {
                Piece::Token(tok) => {
                    if tok.kind == TokenKind::Func {
                        funcs.insert(i, self.out.len());
                    }
                    self.out.push_str(&tok.text);
                    self.last_line = tok.end_line();
                    if tok.kind.is_opener() {
                        open_lines.push(span.line);
                    } else if tok.kind.is_closer() {
                        open_lines.pop();
                    }
                    self.pad = hints.pad.get(&i).copied().unwrap_or(0);
                    prev = Some(Prev {
                        end: span.end,
                        end_line: tok.end_line(),
                        opener: tok.kind.is_opener(),
                    });

                }
                Piece::Block(b) => {
                    let header = owner_func(pieces, i)
                        .and_then(|f| funcs.get(&f))
                        .and_then(|&at| self.header_width(at));
                    self.block(b, header);
                    self.pad = 0;
                    let end = b.close.as_ref().map(|c| c.span.end).unwrap_or(span.end);
                    prev = Some(Prev { end, end_line: self.last_line, opener: false });
                }
            }
        }
    }

    /// Width of the function header written since `at`, if it is still on the current line.
    fn header_width(&self, at: usize) -> Option<usize> {
        let header = self.out.get(at..)?.trim_end();
        (!header.contains('\n')).then(|| header.chars().count())
    }

    /// Body width of a function body gofmt would keep on one line.
    fn inline_width(&self, b: &Block) -> Option<usize> {
        let (Some(open), Some(close)) = (&b.open, &b.close) else {
            return None;
        };
        if b.kind != BlockKind::Braced
            || b.results.is_none()
            || b.edited
            || open.span.line != close.span.line
            || b.stmts.len() > MAX_INLINE_STMTS
        {
            return None;
        }
        let mut width = 0;
        for (j, stmt) in b.stmts.iter().enumerate() {
            let Stmt::Source(s) = stmt else { return None };
            if s.shape == Shape::Label {
                return None;
            }
            if j > 0 {
                width += 2;
            }
            width += self.pieces_width(&s.pieces)?;
        }
        for c in self.comments.iter() {
            if c.span.start > open.span.start && c.span.end <= close.span.start {
                width += c.text.chars().count() + 1;
            }
        }
        Some(width)
    }

    fn pieces_width(&self, pieces: &[Piece]) -> Option<usize> {
        let mut width = 0;
        let mut prev_end: Option<usize> = None;
        for piece in pieces {
            let (start, end) = match piece {
                Piece::Token(t) if t.implicit => continue,
                Piece::Token(t) if t.text.contains('\n') => return None,
                Piece::Token(t) => {
                    width += t.text.chars().count();
                    (t.span.start, t.span.end)
                }
                Piece::Block(b) => {
                    let body = self.inline_width(b)?;
                    width += if body == 0 { 2 } else { body + 4 };
                    let open = b.open.as_ref()?;
                    (open.span.start, b.close.as_ref()?.span.end)
                }
            };
            if prev_end.is_some_and(|e| start > e) {
                width += 1;
            }
            prev_end = Some(end);
        }
        Some(width)
    }

    fn block(&mut self, b: &Block, header: Option<usize>) {
        let (Some(open), Some(close)) = (&b.open, &b.close) else {
            return;
        };
        let base = self.line_indent;
        let inline = header
            .zip(self.inline_width(b))
            .is_some_and(|(h, w)| h + w <= MAX_INLINE_WIDTH);
        self.out.push('{');
        self.last_line = open.span.line;

        if inline {
            let before = self.next;
            let mut printed = false;
            for (j, stmt) in b.stmts.iter().enumerate() {
                let Stmt::Source(s) = stmt else { continue };
                if j > 0 {
                    self.out.push(';');
                }
                self.comments_before(s.start().start, base);
                self.out.push(' ');
                self.stmt(&s.pieces, base);
                printed = true;
            }
            self.comments_before(close.span.start, base);
            if printed || self.next != before {
                self.out.push_str(" }");
            } else {
                self.out.push('}');
            }
            self.last_line = close.span.line;
            return;
        }

        self.fresh = true;
        let indent = if b.kind == BlockKind::Cases { base } else { base + 1 };
        self.items(&b.stmts, indent, close.span.start);
        self.comments_before(close.span.start, indent);
        self.newline(base);
        self.out.push('}');
        self.last_line = close.span.line;
        self.fresh = false;
    }
    fn clause(&mut self, s: &SourceStmt, indent: usize, limit: usize) {
        let (head, body) = match s.pieces.split_last() {
            Some((Piece::Block(body), head)) => (head, Some(body)),
            _ => (&s.pieces[..], None),
        };
        self.stmt(head, indent);
        let Some(body) = body else { return };

        let body_start = body.start().map(|sp| sp.start).unwrap_or(limit);
        self.trailing(body_start);
        self.fresh = true;
        self.items(&body.stmts, indent + 1, limit);

        // Comments up to the next clause: indented ones belong to this body.
        let case_col = s.start().col;
        let comments = self.comments;
        while let Some(c) = comments.get(self.next) {
            if c.span.start >= limit {
                break;
            }
            let at = if c.span.col > case_col { indent + 1 } else { indent };
            self.write_comment(c, at);
            self.next += 1;
        }
        self.fresh = false;
    }

    fn err_check(&mut self, check: &ErrCheck, indent: usize) {
        self.newline(indent);
        self.out.push_str(&check.header());
        self.newline(indent + 1);
        self.out.push_str(&check.ret.render());
        self.newline(indent);
        self.out.push('}');
        self.fresh = false;
    }
}

fn leading_kind(pieces: &[Piece]) -> Option<TokenKind> {
    pieces.iter().find_map(|p| match p {
        Piece::Token(t) if !t.implicit => Some(t.kind),
        _ => None,
    })
}

/// The `func` keyword whose signature ends at the body in `pieces[block]`.
fn owner_func(pieces: &[Piece], block: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, piece) in pieces[..block].iter().enumerate().rev() {
        let Piece::Token(t) = piece else { return None };
        if t.kind.is_closer() {
            depth += 1;
        } else if t.kind.is_opener() {
            depth = depth.checked_sub(1)?;
        } else if depth == 0 && t.kind == TokenKind::Func {
            return Some(i);
        }
    }
    None
}
