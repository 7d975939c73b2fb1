//! Column alignment in the manner of gofmt's tabwriter pass.
//!
//! The printer ends alignment cells with [`CELL`] and marks lines that start a
//! new section with [`SECTION`]. [`tabwrite`] then pads every cell of a column
//! block to the block's width. A block is a run of consecutive lines at the same
//! indent that all have a cell in that column; section marks, indent changes and
//! lines without the cell end it. Columns whose cells are all empty take no room.
//!
//! [`Hints`] decides where a statement gets cells: struct fields, grouped
//! `var`/`const`/`type` specs and `key: value` elements of multi-line lists.

use crate::compiler::ast::Piece;
use crate::compiler::tokens::{Token, TokenKind};
use std::collections::{HashMap, HashSet};
use std::ops::Range;

/// Ends an alignment cell
pub const CELL: char = '\u{b}';
/// Starts a line that does not align with the lines above it
pub const SECTION: char = '\u{c}';

/// Keys up to this size always align with their neighbours.
const SMALL_SIZE: usize = 40;
/// A key this many times larger or smaller than the running geometric mean starts a section.
const SIZE_RATIO: f64 = 2.5;

struct Line<'a> {
    indent: usize,
    cells: Vec<&'a str>,
    rest: &'a str,
    section: bool,
}

impl<'a> Line<'a> {
    fn parse(raw: &'a str) -> Self {
        let section = raw.starts_with(SECTION);
        let body = raw.trim_start_matches(SECTION);
        let indent = body.bytes().take_while(|&b| b == b'\t').count();
        let mut cells: Vec<&str> = body[indent..].split(CELL).collect();
        let rest = cells.pop().unwrap_or("");
        Self { indent, cells, rest, section }
    }

    fn render(&self, widths: &[usize], out: &mut String) {
        for _ in 0..self.indent {
            out.push('\t');
        }
        for (cell, &width) in self.cells.iter().zip(widths) {
            out.push_str(cell);
            for _ in cell.chars().count()..width {
                out.push(' ');
            }
        }
        out.push_str(self.rest);
        if self.rest.is_empty() {
            let len = out.trim_end_matches(' ').len();
            out.truncate(len);
        }
    }
}

/// Replace cell and section marks with space padding.
pub fn tabwrite(text: &str) -> String {
    if !text.contains([CELL, SECTION]) {
        return text.to_string();
    }
    let lines: Vec<Line> = text.split('\n').map(Line::parse).collect();
    let mut widths: Vec<Vec<usize>> = lines.iter().map(|l| vec![0; l.cells.len()]).collect();

    let mut start = 0;
    for i in 1..=lines.len() {
        if i == lines.len() || lines[i].section || lines[i].indent != lines[i - 1].indent {
            columns(&lines, &mut widths, start..i, 0);
            start = i;
        }
    }

    let mut out = String::with_capacity(text.len());
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        line.render(&widths[i], &mut out);
    }
    out
}

fn columns(lines: &[Line], widths: &mut [Vec<usize>], rows: Range<usize>, column: usize) {
    let mut row = rows.start;
    while row < rows.end {
        if column >= lines[row].cells.len() {
            row += 1;
            continue;
        }
        let first = row;
        let mut width = 0;
        let mut empty = true;
        while row < rows.end && column < lines[row].cells.len() {
            let w = lines[row].cells[column].chars().count();
            width = width.max(w + 1);
            empty &= w == 0;
            row += 1;
        }
        if empty {
            width = 0;
        }
        for w in &mut widths[first..row] {
            w[column] = width;
        }
        columns(lines, widths, first..row, column + 1);
    }
}

/// Where the printer places cells inside one statement, keyed by piece index
#[derive(Debug, Default)]
pub struct Hints {
    /// Cell ends written before a piece instead of its separating space
    pub cells: HashMap<usize, usize>,
    /// Pieces that start a new section when they begin a line
    pub sections: HashSet<usize>,
    /// Cell ends owed before a trailing comment that follows a piece
    pub pad: HashMap<usize, usize>,
}

impl Hints {
    pub fn for_stmt(pieces: &[Piece]) -> Self {
        let mut hints = Hints::default();
        let group = decl_group(pieces);
        for (i, piece) in pieces.iter().enumerate() {
            let Piece::Token(tok) = piece else { continue };
            if !tok.kind.is_opener() {
                continue;
            }
            let Some(close) = matching(pieces, i) else { continue };
            match (tok.kind, group) {
                (TokenKind::LParen, Some((keyword, at))) if at == i => {
                    hints.specs(keyword, pieces, i, close)
                }
                (TokenKind::LParen, _) => hints.exprs(pieces, i, close),
                (TokenKind::LBrace, _) => match prev_kind(pieces, i) {
                    Some(TokenKind::Struct) => hints.fields(pieces, i, close),
                    Some(TokenKind::Interface) => {
                        let elems = split(pieces, i, close, TokenKind::Semicolon);
                        hints.break_after_multiline(pieces, &elems);
                    }
                    _ => hints.exprs(pieces, i, close),
                },
                _ => {}
            }
        }
        hints
    }

    fn break_after_multiline(&mut self, pieces: &[Piece], elems: &[Range<usize>]) {
        for pair in elems.windows(2) {
            if spans_lines(pieces, &pair[0]) {
                self.sections.insert(pair[1].start);
            }
        }
    }

    /// Elements of a call or composite literal; `key: value` values align.
    fn exprs(&mut self, pieces: &[Piece], open: usize, close: usize) {
        let elems = split(pieces, open, close, TokenKind::Comma);
        let Some(mut prev_line) = last_line(&pieces[open]) else { return };
        let mut size = 0;
        let mut ln_sum = 0.0;
        let mut count = 0usize;
        let mut prev_break: Option<usize> = None;

        for (i, elem) in elems.iter().enumerate() {
            let Some((line, end_line)) = lines(pieces, elem) else { continue };
            let colon = key_colon(pieces, elem);
            let prev_size = size;
            size = match (width(pieces, elem.clone()), colon) {
                (Some(_), Some(c)) => width(pieces, elem.start..c).unwrap_or(0),
                (Some(w), None) => w,
                (None, _) => 0,
            };

            let mut use_ff = true;
            if prev_size > 0 && size > 0 {
                if count == 0 || (prev_size <= SMALL_SIZE && size <= SMALL_SIZE) {
                    use_ff = false;
                } else {
                    let mean = (ln_sum / count as f64).exp();
                    let ratio = size as f64 / mean;
                    use_ff = SIZE_RATIO * ratio <= 1.0 || SIZE_RATIO <= ratio;
                }
            }

            let needs_break = prev_line < line;
            if needs_break && i == 0 {
                prev_break = Some(0);
            } else if needs_break {
                let crowded = prev_break.map_or(true, |b| b + 1 < i);
                if use_ff || crowded {
                    self.sections.insert(elem.start);
                }
                if use_ff || crowded || line > prev_line + 1 {
                    ln_sum = 0.0;
                    count = 0;
                }
                prev_break = Some(i);
            }

            if elems.len() > 1 && needs_break && size > 0 {
                if let Some(c) = colon {
                    self.cells.insert(c + 1, 1);
                }
            }
            if size > 0 {
                ln_sum += (size as f64).ln();
                count += 1;
            }
            prev_line = end_line;
        }
    }

    /// Fields of a multi-line struct: names, types, tags and comments in columns.
    fn fields(&mut self, pieces: &[Piece], open: usize, close: usize) {
        if last_line(&pieces[open]) == first_line(&pieces[close]) {
            return;
        }
        let elems = split(pieces, open, close, TokenKind::Semicolon);
        self.break_after_multiline(pieces, &elems);
        if elems.len() < 2 {
            return;
        }
        for elem in &elems {
            let toks = tokens(pieces, elem);
            let Some(&(last, last_tok)) = toks.last() else { continue };
            let tag = (toks.len() > 1 && last_tok.kind == TokenKind::String).then_some(last);
            let named = is_named_field(&toks);
            if named {
                if let Some(&(ty, _)) = toks.get(names_end(&toks) + 1) {
                    self.cells.insert(ty, 1);
                }
            }
            let extra = match (tag, named) {
                (Some(t), true) => {
                    self.cells.insert(t, 2);
                    0
                }
                (Some(t), false) => {
                    self.cells.insert(t, 1);
                    0
                }
                (None, true) => 1,
                (None, false) => 2,
            };
            self.pad.insert(last, extra);
        }
    }

    /// Specs of a parenthesized `var`, `const`, `type` or `import` declaration.
    fn specs(&mut self, keyword: TokenKind, pieces: &[Piece], open: usize, close: usize) {
        let elems = split(pieces, open, close, TokenKind::Semicolon);
        self.break_after_multiline(pieces, &elems);
        if elems.len() < 2 {
            return;
        }
        match keyword {
            TokenKind::Var | TokenKind::Const => self.value_specs(pieces, &elems),
            TokenKind::Type => {
                for elem in &elems {
                    let toks = tokens(pieces, elem);
                    let Some(&(name, name_tok)) = toks.first() else { continue };
                    let mut next = name + 1;
                    if let Some(Piece::Token(t)) = pieces.get(next) {
                        if t.kind == TokenKind::LBracket && t.span.start == name_tok.span.end {
                            next = matching(pieces, next).map_or(next, |c| c + 1);
                        }
                    }
                    if next < elem.end {
                        self.cells.insert(next, 1);
                    }
                }
            }
            _ => {}
        }
    }

    fn value_specs(&mut self, pieces: &[Piece], elems: &[Range<usize>]) {
        struct Spec {
            ty: Option<usize>,
            eq: Option<usize>,
            last: usize,
        }
        let mut specs = Vec::new();
        for elem in elems {
            let toks = tokens(pieces, elem);
            let Some(&(last, _)) = toks.last() else { continue };
            let rest = &toks[(names_end(&toks) + 1).min(toks.len())..];
            let mut depth = 0usize;
            let mut eq = None;
            for &(i, t) in rest {
                if t.kind.is_opener() {
                    depth += 1;
                } else if t.kind.is_closer() {
                    depth = depth.saturating_sub(1);
                } else if depth == 0 && t.kind == TokenKind::Assign {
                    eq = Some(i);
                    break;
                }
            }
            let ty = rest.first().map(|&(i, _)| i).filter(|&i| Some(i) != eq);
            specs.push(Spec { ty, eq, last });
        }

        let keep = keep_type_column(specs.iter().map(|s| (s.ty.is_some(), s.eq.is_some())));
        for (spec, keep) in specs.iter().zip(keep) {
            let mut extra = 3;
            if let Some(ty) = spec.ty {
                self.cells.insert(ty, 1);
            }
            if spec.ty.is_some() || keep {
                extra -= 1;
            }
            if let Some(eq) = spec.eq {
                let n = if spec.ty.is_none() && keep { 2 } else { 1 };
                self.cells.insert(eq, n);
                extra -= 1;
            }
            self.pad.insert(spec.last, extra);
        }
    }
}

/// For each `(has type, has values)` spec: whether its run of valued specs keeps a type column.
fn keep_type_column(specs: impl Iterator<Item = (bool, bool)>) -> Vec<bool> {
    let mut keep = Vec::new();
    let mut run: Option<usize> = None;
    let mut typed = false;
    for (i, (has_type, has_values)) in specs.enumerate() {
        keep.push(false);
        if has_values {
            if run.is_none() {
                run = Some(i);
                typed = false;
            }
        } else if let Some(start) = run.take() {
            keep[start..i].fill(typed);
        }
        if has_type {
            typed = true;
        }
    }
    if let Some(start) = run {
        let end = keep.len();
        keep[start..end].fill(typed);
    }
    keep
}

/// `var (`, `const (`, `type (` or `import (`: the keyword and the index of `(`.
fn decl_group(pieces: &[Piece]) -> Option<(TokenKind, usize)> {
    let mut toks = pieces.iter().enumerate().filter_map(|(i, p)| match p {
        Piece::Token(t) if !t.implicit => Some((i, t)),
        _ => None,
    });
    let (_, keyword) = toks.next()?;
    let (at, paren) = toks.next()?;
    let grouped = matches!(
        keyword.kind,
        TokenKind::Var | TokenKind::Const | TokenKind::Type | TokenKind::Import
    );
    (grouped && paren.kind == TokenKind::LParen).then_some((keyword.kind, at))
}

fn matching(pieces: &[Piece], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, piece) in pieces.iter().enumerate().skip(open) {
        let Piece::Token(t) = piece else { continue };
        if t.kind.is_opener() {
            depth += 1;
        } else if t.kind.is_closer() {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

fn prev_kind(pieces: &[Piece], i: usize) -> Option<TokenKind> {
    pieces[..i].iter().rev().find_map(|p| match p {
        Piece::Token(t) if !t.implicit => Some(t.kind),
        _ => None,
    })
}

/// Elements between `open` and `close` separated by `sep` at the group's own depth.
fn split(pieces: &[Piece], open: usize, close: usize, sep: TokenKind) -> Vec<Range<usize>> {
    let mut elems = Vec::new();
    let mut depth = 0usize;
    let mut start = open + 1;
    for i in open + 1..=close {
        let Piece::Token(t) = &pieces[i] else { continue };
        let end = i == close || (depth == 0 && t.kind == sep);
        if end {
            if let Some(range) = trim(pieces, start..i) {
                elems.push(range);
            }
            start = i + 1;
        } else if t.kind.is_opener() {
            depth += 1;
        } else if t.kind.is_closer() {
            depth = depth.saturating_sub(1);
        }
    }
    elems
}

/// Drops implicit semicolons from both ends; `None` when nothing else is left.
fn trim(pieces: &[Piece], range: Range<usize>) -> Option<Range<usize>> {
    let real = |i: &usize| !matches!(&pieces[*i], Piece::Token(t) if t.implicit);
    let start = range.clone().find(real)?;
    let end = range.rev().find(real)? + 1;
    Some(start..end)
}

fn tokens<'p>(pieces: &'p [Piece], range: &Range<usize>) -> Vec<(usize, &'p Token)> {
    range
        .clone()
        .filter_map(|i| match &pieces[i] {
            Piece::Token(t) if !t.implicit => Some((i, t)),
            _ => None,
        })
        .collect()
}

/// Position in `toks` of the last name of a leading `a, b, c` list.
fn names_end(toks: &[(usize, &Token)]) -> usize {
    let mut k = 0;
    while k + 2 < toks.len()
        && toks[k + 1].1.kind == TokenKind::Comma
        && toks[k + 2].1.kind == TokenKind::Ident
    {
        k += 2;
    }
    k
}

fn is_named_field(toks: &[(usize, &Token)]) -> bool {
    match toks {
        [(_, a), (_, b), ..] if a.kind == TokenKind::Ident => match b.kind {
            TokenKind::Comma => true,
            TokenKind::Dot | TokenKind::String => false,
            // `A [2]int` names a field, `T[int]` embeds a generic type
            TokenKind::LBracket => b.span.start > a.span.end,
            _ => true,
        },
        _ => false,
    }
}

fn key_colon(pieces: &[Piece], range: &Range<usize>) -> Option<usize> {
    let mut depth = 0usize;
    for (i, t) in tokens(pieces, range) {
        if t.kind.is_opener() {
            depth += 1;
        } else if t.kind.is_closer() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && t.kind == TokenKind::Colon {
            return Some(i);
        }
    }
    None
}

fn first_line(piece: &Piece) -> Option<usize> {
    match piece {
        Piece::Token(t) if !t.implicit => Some(t.span.line),
        Piece::Token(_) => None,
        Piece::Block(b) => b.start().map(|s| s.line),
    }
}

fn last_line(piece: &Piece) -> Option<usize> {
    match piece {
        Piece::Token(t) if !t.implicit => Some(t.end_line()),
        Piece::Token(_) => None,
        Piece::Block(b) => b.end_line(),
    }
}

fn lines(pieces: &[Piece], range: &Range<usize>) -> Option<(usize, usize)> {
    let slice = &pieces[range.clone()];
    Some((slice.iter().find_map(first_line)?, slice.iter().rev().find_map(last_line)?))
}

fn spans_lines(pieces: &[Piece], range: &Range<usize>) -> bool {
    let edited = pieces[range.clone()].iter().any(|p| matches!(p, Piece::Block(b) if b.edited));
    edited || lines(pieces, range).is_some_and(|(start, end)| start != end)
}

/// Printed width of a single-line token run; `None` if it holds a block or a line break.
fn width(pieces: &[Piece], range: Range<usize>) -> Option<usize> {
    let (start, end) = lines(pieces, &range)?;
    if start != end {
        return None;
    }
    let mut width = 0;
    let mut prev_end: Option<usize> = None;
    for piece in &pieces[range] {
        let Piece::Token(t) = piece else { return None };
        if t.implicit {
            continue;
        }
        if prev_end.is_some_and(|end| t.span.start > end) {
            width += 1;
        }
        width += t.text.chars().count();
        prev_end = Some(t.span.end);
    }
    Some(width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::{SourceStmt, Stmt};
    use crate::compiler::lexer::lex;
    use crate::compiler::parser::parse;

    fn first_stmt(src: &str) -> SourceStmt {
        let unit = parse(lex(src).unwrap()).unwrap();
        match unit.root.stmts.into_iter().next() {
            Some(Stmt::Source(s)) => s,
            other => panic!("expected a statement, got {:?}", other),
        }
    }

    fn text(pieces: &[Piece], i: usize) -> &str {
        match &pieces[i] {
            Piece::Token(t) => &t.text,
            Piece::Block(_) => "{block}",
        }
    }

    fn by_text<'p>(pieces: &'p [Piece], map: &HashMap<usize, usize>) -> Vec<(&'p str, usize)> {
        let mut out: Vec<_> = map.iter().map(|(&i, &n)| (text(pieces, i), n)).collect();
        out.sort();
        out
    }

    #[test]
    fn test_tabwrite_pads_column_blocks() {
        let text = "\tA\u{b}int\u{b}// a\n\tBBBB\u{b}string\u{b}// b\n\tC\u{b}bool";
        assert_eq!(tabwrite(text), "\tA    int    // a\n\tBBBB string // b\n\tC    bool");
    }

    #[test]
    fn test_tabwrite_breaks_on_sections_and_indent() {
        let text = "x := 1\u{b}// a\n\u{c}yyyy := 2\u{b}// b\n\tz := 3\u{b}// c\nw\u{b}// d";
        assert_eq!(tabwrite(text), "x := 1 // a\nyyyy := 2 // b\n\tz := 3 // c\nw // d");
    }

    #[test]
    fn test_tabwrite_discards_empty_columns() {
        let text = "A\u{b}int\u{b}\u{b}`json:\"a\"`\nBB\u{b}bool\u{b}\u{b}`json:\"b\"`";
        assert_eq!(tabwrite(text), "A  int  `json:\"a\"`\nBB bool `json:\"b\"`");
        assert_eq!(tabwrite("plain\n\ttext"), "plain\n\ttext");
    }

    #[test]
    fn test_struct_field_hints() {
        let s = first_stmt(
            "package p\n\
             type T struct {\n\
             \tA int `tag`\n\
             \tio.Reader\n\
             \tB, C string\n\
             }\n",
        );
        let hints = Hints::for_stmt(&s.pieces);
        assert_eq!(
            by_text(&s.pieces, &hints.cells),
            vec![("`tag`", 2), ("int", 1), ("string", 1)]
        );
        assert_eq!(
            by_text(&s.pieces, &hints.pad),
            vec![("Reader", 2), ("`tag`", 0), ("string", 1)]
        );
    }

    #[test]
    fn test_value_spec_hints_keep_type_column() {
        let s = first_stmt("package p\nvar (\n\ta int = 1\n\tbb = 2\n\tc\n)\n");
        let hints = Hints::for_stmt(&s.pieces);
        assert_eq!(by_text(&s.pieces, &hints.cells), vec![("=", 1), ("=", 2), ("int", 1)]);
        assert_eq!(by_text(&s.pieces, &hints.pad), vec![("1", 1), ("2", 1), ("c", 3)]);

        let specs = [(true, true), (false, true), (false, false)];
        assert_eq!(keep_type_column(specs.into_iter()), vec![true, true, false]);

    }

    #[test]
    fn test_key_value_hints_respect_size_ratio() {
        let src = "package p\n\
                   var m = map[string]int{\n\
                   \t\"a\": 1,\n\
                   \t\"bb\": 2,\n\
                   \t\"a_very_long_key_that_is_far_beyond_the_small_limit\": 3,\n\
                   }\n";
        let s = first_stmt(src);
        let hints = Hints::for_stmt(&s.pieces);
        assert_eq!(hints.cells.len(), 3);
        assert_eq!(hints.sections.len(), 1);
        let section = hints.sections.iter().next().copied().unwrap();
        assert!(text(&s.pieces, section).starts_with("\"a_very"));
    }
}
