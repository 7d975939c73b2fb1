//! Recursive descent parser building the block/statement tree of a Go file.
//!
//! Statements keep their original tokens; only code blocks (function bodies,
//! `if`/`for`/`switch`/`select` bodies, bare blocks) become tree nodes.
//! Composite literals and struct/interface bodies stay balanced token groups.

use crate::compiler::ast::*;
use crate::compiler::lexer::Lexed;
use crate::compiler::tokens::{Comment, Span, Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected {found} at line {line}, col {col}; expected {expected}")]
    Unexpected { found: String, expected: String, line: usize, col: usize },
    #[error("unexpected end of file at line {line}, col {col}; expected {expected}")]
    UnexpectedEof { expected: String, line: usize, col: usize },
}

impl ParseError {
    pub fn position(&self) -> (usize, usize) {
        match self {
            ParseError::Unexpected { line, col, .. }
            | ParseError::UnexpectedEof { line, col, .. } => (*line, *col),
        }
    }
}

/// Where a token scan stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    /// At a depth-0 `;` or `}`
    Statement,
    /// At the depth-0 `{` opening a body
    Header,
    /// At the depth-0 `:` ending a case expression list
    Clause,
}

fn prev_kind(out: &[Piece]) -> Option<TokenKind> {
    match out.last()? {
        Piece::Token(t) => Some(t.kind),
        Piece::Block(_) => Some(TokenKind::RBrace),
    }
}

fn starts_type(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident
            | TokenKind::Star
            | TokenKind::LBracket
            | TokenKind::Map
            | TokenKind::Chan
            | TokenKind::Func
            | TokenKind::Struct
            | TokenKind::Interface
            | TokenKind::Arrow
    )
}

/// Splits the left-hand side of a depth-0 `=`/`:=` into target ranges.
fn assign_shape(pieces: &[Piece]) -> Shape {
    let mut depth = 0usize;
    let mut targets = Vec::new();
    let mut seg_start = 0;
    for (i, piece) in pieces.iter().enumerate() {
        let Piece::Token(tok) = piece else { continue };
        match tok.kind {
            k if k.is_opener() => depth += 1,
            k if k.is_closer() => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                targets.push(seg_start..i);
                seg_start = i + 1;
            }
            TokenKind::Assign | TokenKind::Define if depth == 0 => {
                targets.push(seg_start..i);
                return Shape::Assign(Assign { op: tok.kind, targets });
            }
            _ => {}
        }
    }
    Shape::Other
}

/// Counts comma-separated entries of a parenthesized list stored in `pieces`.
fn count_entries(pieces: &[Piece]) -> usize {
    let inner = match pieces.len() {
        0..=2 => return 0,
        n => &pieces[1..n - 1],
    };
    let mut depth = 0usize;
    let mut count = 0;
    let mut non_empty = false;
    for piece in inner {
        match piece {
            Piece::Token(t) if t.implicit => {}
            Piece::Token(t) if t.kind == TokenKind::Comma && depth == 0 => {
                if non_empty {
                    count += 1;
                }
                non_empty = false;
            }
            Piece::Token(t) => {
                if t.kind.is_opener() {
                    depth += 1;
                } else if t.kind.is_closer() {
                    depth = depth.saturating_sub(1);
                }
                non_empty = true;
            }
            Piece::Block(_) => non_empty = true,
        }
    }
    if non_empty {
        count += 1;
    }
    count
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_else(Span::dummy);
            tokens.push(Token::new(TokenKind::Eof, "", span));
        }
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_nth(&self, n: usize) -> TokenKind {
        self.tokens.get(self.pos + n).map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn bump(&mut self, out: &mut Vec<Piece>) {
        let tok = self.advance();
        out.push(Piece::Token(tok));
    }

    fn error(&self, expected: &str) -> ParseError {
        let tok = self.current();
        if tok.kind == TokenKind::Eof {
            ParseError::UnexpectedEof {
                expected: expected.to_string(),
                line: tok.span.line,
                col: tok.span.col,
            }
        } else {
            ParseError::Unexpected {
                found: tok.describe(),
                expected: expected.to_string(),
                line: tok.span.line,
                col: tok.span.col,
            }
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.peek_kind() == kind {
            Ok(self.advance())
        } else {
            Err(self.error(&format!("'{}'", kind)))
        }
    }

    fn skip_semicolons(&mut self) {
        while self.peek_kind() == TokenKind::Semicolon {
            self.advance();
        }
    }

    fn end_stmt(&mut self) -> Result<(), ParseError> {
        match self.peek_kind() {
            TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::RBrace | TokenKind::Eof | TokenKind::Case | TokenKind::Default => Ok(()),
            _ => Err(self.error("';' or newline")),
        }
    }

    // ── File ──

    pub fn parse_file(mut self, comments: Vec<Comment>) -> Result<SourceUnit, ParseError> {
        let mut root = Block::new(BlockKind::Root);
        self.skip_semicolons();
        if self.peek_kind() != TokenKind::Package {
            return Err(self.error("package clause"));
        }
        let mut pieces = Vec::new();
        self.bump(&mut pieces);
        let name = self.expect(TokenKind::Ident)?;
        let package = name.text.clone();
        pieces.push(Piece::Token(name));
        self.end_stmt()?;
        root.stmts.push(Stmt::Source(SourceStmt { shape: Shape::Other, pieces }));

        loop {
            self.skip_semicolons();
            let stmt = match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Func => self.parse_func_decl()?,
                _ => self.parse_simple()?,
            };
            root.stmts.push(Stmt::Source(stmt));
            self.end_stmt()?;
        }
        Ok(SourceUnit { package, root, comments })
    }

    fn parse_func_decl(&mut self) -> Result<SourceStmt, ParseError> {
        let mut pieces = Vec::new();
        self.bump(&mut pieces);
        if self.peek_kind() == TokenKind::LParen {
            self.scan_group(&mut pieces)?;
        }
        let name = self.expect(TokenKind::Ident)?;
        pieces.push(Piece::Token(name));
        if self.peek_kind() == TokenKind::LBracket {
            self.scan_group(&mut pieces)?;
        }
        if self.peek_kind() != TokenKind::LParen {
            return Err(self.error("parameter list"));
        }
        self.scan_group(&mut pieces)?;
        let results = self.scan_results(&mut pieces)?;
        if self.peek_kind() == TokenKind::LBrace {
            let body = self.parse_braced(Some(results))?;
            pieces.push(Piece::Block(body));
        }
        Ok(SourceStmt { shape: Shape::Other, pieces })
    }

    // ── Types and signatures ──

    fn scan_results(&mut self, out: &mut Vec<Piece>) -> Result<usize, ParseError> {
        match self.peek_kind() {
            TokenKind::LParen => {
                let start = out.len();
                self.scan_group(out)?;
                Ok(count_entries(&out[start..]))
            }
            k if starts_type(k) => {
                self.skip_type(out)?;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn skip_type(&mut self, out: &mut Vec<Piece>) -> Result<(), ParseError> {
        match self.peek_kind() {
            TokenKind::Star | TokenKind::Arrow => {
                self.bump(out);
                self.skip_type(out)
            }
            TokenKind::Chan => {
                self.bump(out);
                if self.peek_kind() == TokenKind::Arrow {
                    self.bump(out);
                }
                self.skip_type(out)
            }
            TokenKind::LBracket => {
                self.scan_group(out)?;
                self.skip_type(out)
            }
            TokenKind::Map => {
                self.bump(out);
                if self.peek_kind() != TokenKind::LBracket {
                    return Err(self.error("'['"));
                }
                self.scan_group(out)?;
                self.skip_type(out)
            }
            TokenKind::Func => {
                self.bump(out);
                if self.peek_kind() != TokenKind::LParen {
                    return Err(self.error("parameter list"));
                }
                self.scan_group(out)?;
                self.scan_results(out).map(|_| ())
            }
            TokenKind::Struct | TokenKind::Interface => {
                self.bump(out);
                if self.peek_kind() != TokenKind::LBrace {
                    return Err(self.error("'{'"));
                }
                self.scan_group(out)
            }
            TokenKind::LParen => self.scan_group(out),
            TokenKind::Ident => {
                self.bump(out);
                while self.peek_kind() == TokenKind::Dot && self.peek_nth(1) == TokenKind::Ident {
                    self.bump(out);
                    self.bump(out);
                }
                if self.peek_kind() == TokenKind::LBracket {
                    self.scan_group(out)?;
                }
                Ok(())
            }
            _ => Err(self.error("type")),
        }
    }

    /// `func` inside a statement: a literal gets its body parsed as a block.
    /// Returns whether a body was consumed.
    fn scan_func(&mut self, out: &mut Vec<Piece>) -> Result<bool, ParseError> {
        let literal = !matches!(
            prev_kind(out),
            Some(
                TokenKind::Ident
                    | TokenKind::RBracket
                    | TokenKind::Star
                    | TokenKind::Chan
                    | TokenKind::RParen
                    | TokenKind::Arrow
            )
        );
        self.bump(out);
        if self.peek_kind() != TokenKind::LParen {
            return Ok(false);
        }
        self.scan_group(out)?;
        let results = self.scan_results(out)?;
        if literal && self.peek_kind() == TokenKind::LBrace {
            let body = self.parse_braced(Some(results))?;
            out.push(Piece::Block(body));
            return Ok(true);
        }
        Ok(false)
    }

    // ── Token scanning ──

    /// Consumes a balanced `(...)`, `[...]` or `{...}` group.
    fn scan_group(&mut self, out: &mut Vec<Piece>) -> Result<(), ParseError> {
        let open = self.advance();
        let Some(closer) = open.kind.closer() else {
            return Err(ParseError::Unexpected {
                found: open.describe(),
                expected: "'(', '[' or '{'".to_string(),
                line: open.span.line,
                col: open.span.col,
            });
        };
        out.push(Piece::Token(open));
        loop {
            match self.peek_kind() {
                k if k == closer => {
                    self.bump(out);
                    return Ok(());
                }
                TokenKind::Eof | TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    return Err(self.error(&format!("'{}'", closer)));
                }
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                    self.scan_group(out)?
                }
                TokenKind::Func => {
                    self.scan_func(out)?;
                }
                _ => self.bump(out),
            }
        }
    }

    fn scan(&mut self, mode: Scan, out: &mut Vec<Piece>) -> Result<(), ParseError> {
        // Set while the tokens so far spell a composite literal type whose `{` follows.
        let mut composite_next = false;
        loop {
            let kind = self.peek_kind();
            match (kind, mode) {
                (TokenKind::Eof, Scan::Statement) => return Ok(()),
                (TokenKind::Eof, Scan::Header) => return Err(self.error("'{'")),
                (TokenKind::Eof, Scan::Clause) => return Err(self.error("':'")),
                (TokenKind::Semicolon, Scan::Statement) => return Ok(()),
                (TokenKind::Semicolon, Scan::Header) if self.current().implicit => {
                    return Err(self.error("'{'"));
                }
                (TokenKind::Semicolon, Scan::Clause) => return Err(self.error("':'")),
                (TokenKind::RBrace, Scan::Statement) => return Ok(()),
                (TokenKind::Colon, Scan::Clause) => return Ok(()),
                (TokenKind::LBrace, Scan::Header) if !composite_next => return Ok(()),
                (TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace, _) => {
                    return Err(self.error(match mode {
                        Scan::Header => "'{'",
                        Scan::Clause => "':'",
                        Scan::Statement => "';' or newline",
                    }));
                }
                _ => {}
            }
            match kind {
                TokenKind::LBrace => {
                    self.scan_group(out)?;
                    composite_next = false;
                }
                TokenKind::LBracket => {
                    let type_start = !prev_kind(out).is_some_and(|k| k.ends_operand());
                    self.scan_group(out)?;
                    if type_start {
                        composite_next = true;
                    }
                }
                TokenKind::LParen => {
                    let after_func = prev_kind(out) == Some(TokenKind::Func);
                    self.scan_group(out)?;
                    composite_next = composite_next && after_func;
                }
                TokenKind::Map => {
                    self.bump(out);
                    composite_next = true;
                }
                TokenKind::Struct | TokenKind::Interface => {
                    self.bump(out);
                    if self.peek_kind() == TokenKind::LBrace {
                        self.scan_group(out)?;
                    }
                    composite_next = true;
                }
                TokenKind::Func => {
                    if self.scan_func(out)? {
                        composite_next = false;
                    }
                }
                TokenKind::Ident
                | TokenKind::Dot
                | TokenKind::Star
                | TokenKind::Chan
                | TokenKind::Arrow => {
                    self.bump(out);
                }
                _ => {
                    self.bump(out);
                    composite_next = false;
                }
            }
        }
    }

    // ── Statements ──

    fn parse_stmt(&mut self) -> Result<SourceStmt, ParseError> {
        match self.peek_kind() {
            TokenKind::If => {
                let mut pieces = Vec::new();
                self.parse_if(&mut pieces)?;
                Ok(SourceStmt { shape: Shape::Other, pieces })
            }
            TokenKind::For => {
                let mut pieces = Vec::new();
                self.bump(&mut pieces);
                self.scan(Scan::Header, &mut pieces)?;
                let body = self.parse_braced(None)?;
                pieces.push(Piece::Block(body));
                Ok(SourceStmt { shape: Shape::Other, pieces })
            }
            TokenKind::Switch | TokenKind::Select => {
                let mut pieces = Vec::new();
                self.bump(&mut pieces);
                self.scan(Scan::Header, &mut pieces)?;
                let body = self.parse_cases()?;
                pieces.push(Piece::Block(body));
                Ok(SourceStmt { shape: Shape::Other, pieces })
            }
            TokenKind::LBrace => {
                let body = self.parse_braced(None)?;
                Ok(SourceStmt { shape: Shape::Other, pieces: vec![Piece::Block(body)] })
            }
            TokenKind::Ident if self.peek_nth(1) == TokenKind::Colon => {
                let mut pieces = Vec::new();
                self.bump(&mut pieces);
                self.bump(&mut pieces);
                Ok(SourceStmt { shape: Shape::Label, pieces })
            }
            _ => self.parse_simple(),
        }
    }

    fn parse_if(&mut self, pieces: &mut Vec<Piece>) -> Result<(), ParseError> {
        self.bump(pieces);
        self.scan(Scan::Header, pieces)?;
        let body = self.parse_braced(None)?;
        pieces.push(Piece::Block(body));
        if self.peek_kind() == TokenKind::Else {
            self.bump(pieces);
            match self.peek_kind() {
                TokenKind::If => self.parse_if(pieces)?,
                TokenKind::LBrace => {
                    let body = self.parse_braced(None)?;
                    pieces.push(Piece::Block(body));
                }
                _ => return Err(self.error("'if' or '{'")),
            }
        }
        Ok(())
    }

    fn parse_simple(&mut self) -> Result<SourceStmt, ParseError> {
        let first = self.peek_kind();
        if matches!(
            first,
            TokenKind::RBrace
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::Eof
                | TokenKind::Case
                | TokenKind::Default
                | TokenKind::Else
        ) {
            return Err(self.error("statement"));
        }
        let mut pieces = Vec::new();
        self.scan(Scan::Statement, &mut pieces)?;
        let shape = match first {
            TokenKind::Var
            | TokenKind::Const
            | TokenKind::Type
            | TokenKind::Import
            | TokenKind::Package => Shape::Other,

            _ => assign_shape(&pieces),
        };
        Ok(SourceStmt { shape, pieces })
    }

    fn parse_braced(&mut self, results: Option<usize>) -> Result<Block, ParseError> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut block = Block::new(BlockKind::Braced);
        block.open = Some(open);
        block.results = results;
        loop {
            self.skip_semicolons();
            match self.peek_kind() {
                TokenKind::RBrace => break,
                TokenKind::Eof => return Err(self.error("'}'")),
                _ => {}
            }
            let stmt = self.parse_stmt()?;
            let label = stmt.shape == Shape::Label;
            block.stmts.push(Stmt::Source(stmt));
            if !label {
                self.end_stmt()?;
            }
        }
        block.close = Some(self.advance());
        Ok(block)
    }

    fn parse_cases(&mut self) -> Result<Block, ParseError> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut block = Block::new(BlockKind::Cases);
        block.open = Some(open);
        loop {
            self.skip_semicolons();
            match self.peek_kind() {
                TokenKind::RBrace => break,
                TokenKind::Case | TokenKind::Default => {
                    let clause = self.parse_clause()?;
                    block.stmts.push(Stmt::Source(clause));
                }
                _ => return Err(self.error("'case' or 'default'")),
            }
        }
        block.close = Some(self.advance());
        Ok(block)
    }

    fn parse_clause(&mut self) -> Result<SourceStmt, ParseError> {
        let mut pieces = Vec::new();
        let is_case = self.peek_kind() == TokenKind::Case;
        self.bump(&mut pieces);
        if is_case {
            self.scan(Scan::Clause, &mut pieces)?;
        }
        let colon = self.expect(TokenKind::Colon)?;
        pieces.push(Piece::Token(colon));
        let mut body = Block::new(BlockKind::Clause);
        loop {
            self.skip_semicolons();
            if matches!(
                self.peek_kind(),
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
            ) {
                break;
            }
            let stmt = self.parse_stmt()?;
            let label = stmt.shape == Shape::Label;
            body.stmts.push(Stmt::Source(stmt));
            if !label {
                self.end_stmt()?;
            }
        }
        pieces.push(Piece::Block(body));
        Ok(SourceStmt { shape: Shape::Clause, pieces })
    }
}

/// Parse lexed tokens into a [`SourceUnit`].
pub fn parse(lexed: Lexed) -> Result<SourceUnit, ParseError> {
    Parser::new(lexed.tokens).parse_file(lexed.comments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::lex;

    fn parse_src(src: &str) -> SourceUnit {
        parse(lex(src).unwrap()).unwrap()
    }

    fn source(stmt: &Stmt) -> &SourceStmt {
        match stmt {
            Stmt::Source(s) => s,
            Stmt::ErrCheck(_) => panic!("unexpected inserted statement"),
        }
    }

    fn blocks(stmt: &SourceStmt) -> Vec<&Block> {
        stmt.pieces
            .iter()
            .filter_map(|p| match p {
                Piece::Block(b) => Some(b),
                Piece::Token(_) => None,
            })
            .collect()
    }

    fn func_body<'a>(unit: &'a SourceUnit, index: usize) -> &'a Block {
        blocks(source(&unit.root.stmts[index]))[0]
    }

    #[test]
    fn test_package_clause_required() {
        let err = parse(lex("func main() {}\n").unwrap()).unwrap_err();
        assert!(matches!(err, ParseError::Unexpected { line: 1, col: 1, .. }), "got: {}", err);
    }

    #[test]
    fn test_result_counts() {
        let unit = parse_src(
            "package p\n\
             func a() {}\n\
             func b() error { return nil }\n\
             func c() (int, error) { return 0, nil }\n\
             func d() (x, y int, err error) { return }\n\
             func (s *S) e() func() error { return nil }\n\
             func f[T any](v T) []T { return nil }\n",
        );
        assert_eq!(unit.package, "p");
        let counts: Vec<Option<usize>> = (1..=6).map(|i| func_body(&unit, i).results).collect();
        assert_eq!(counts, vec![Some(0), Some(1), Some(2), Some(3), Some(1), Some(1)]);
    }

    #[test]
    fn test_assignment_targets() {
        let unit = parse_src(
            "package p\n\
             func f() {\n\
             \tv, _ := g(a, b)\n\
             \tx[i], y = 1, 2\n\
             \tz += 1\n\
             }\n",
        );
        let body = func_body(&unit, 1);
        let first = source(&body.stmts[0]);
        match &first.shape {
            Shape::Assign(a) => {
                assert_eq!(a.op, TokenKind::Define);
                assert_eq!(a.targets.len(), 2);
                assert!(first.lone_token(&a.targets[1]).unwrap().is_ident("_"));
            }
            other => panic!("expected assignment, got: {:?}", other),
        }
        match &source(&body.stmts[1]).shape {
            Shape::Assign(a) => assert_eq!(a.targets, vec![0..4, 5..6]),
            other => panic!("expected assignment, got: {:?}", other),
        }
        assert_eq!(source(&body.stmts[2]).shape, Shape::Other);
    }

    #[test]
    fn test_if_else_chain_blocks() {
        let unit = parse_src(
            "package p\n\
             func f() {\n\
             \tif a {\n\
             \t} else if b {\n\
             \t} else {\n\
             \t}\n\
             }\n",
        );
        let stmt = source(&func_body(&unit, 1).stmts[0]);
        assert_eq!(blocks(stmt).len(), 3);
    }

    #[test]
    fn test_switch_clauses() {
        let unit = parse_src(
            "package p\n\
             func f(x int) {\n\
             \tswitch x {\n\
             \tcase 1, 2:\n\
             \t\ta()\n\
             \t\tb()\n\
             \tdefault:\n\
             \t}\n\
             }\n",
        );
        let stmt = source(&func_body(&unit, 1).stmts[0]);
        let cases = blocks(stmt)[0];
        assert_eq!(cases.kind, BlockKind::Cases);
        assert_eq!(cases.stmts.len(), 2);
        let first = source(&cases.stmts[0]);
        assert_eq!(first.shape, Shape::Clause);
        assert_eq!(blocks(first)[0].stmts.len(), 2);
        assert!(blocks(source(&cases.stmts[1]))[0].stmts.is_empty());
    }

    #[test]
    fn test_composite_literal_in_header() {
        let unit = parse_src(
            "package p\n\
             func f() {\n\
             \tfor _, v := range []int{1, 2} {\n\
             \t\tuse(v)\n\
             \t}\n\
             \tif m := map[string]struct{}{}; m != nil {\n\
             \t}\n\
             }\n",
        );
        let body = func_body(&unit, 1);
        assert_eq!(body.stmts.len(), 2);
        let loop_body = blocks(source(&body.stmts[0]))[0];
        assert_eq!(loop_body.stmts.len(), 1);
    }

    #[test]
    fn test_func_literal_becomes_block() {
        let unit = parse_src(
            "package p\n\
             var h = func(x int) (int, error) {\n\
             \treturn x, nil\n\
             }\n\
             func f() {\n\
             \tgo func() {\n\
             \t\twork()\n\
             \t}()\n\
             \tvar cb func() error\n\
             }\n",
        );
        let lit = blocks(source(&unit.root.stmts[1]))[0];
        assert_eq!(lit.results, Some(2));
        let body = func_body(&unit, 2);
        assert_eq!(blocks(source(&body.stmts[0]))[0].results, Some(0));
        assert!(blocks(source(&body.stmts[1])).is_empty());
    }

    #[test]
    fn test_labels_and_struct_bodies() {
        let unit = parse_src(
            "package p\n\
             type T struct {\n\
             \tA int\n\
             \tB string\n\
             }\n\
             func f() {\n\
             outer:\n\
             \tfor {\n\
             \t\tbreak outer\n\
             \t}\n\
             }\n",
        );
        assert_eq!(unit.root.stmts.len(), 3);
        let body = func_body(&unit, 2);
        assert_eq!(source(&body.stmts[0]).shape, Shape::Label);
        assert_eq!(body.stmts.len(), 2);
    }

    #[test]
    fn test_unbalanced_errors() {
        let err = parse(lex("package p\nfunc f() {\n\tg(a\n}\n").unwrap()).unwrap_err();
        assert!(matches!(err, ParseError::Unexpected { .. }), "got: {}", err);
        let err = parse(lex("package p\n}\n").unwrap()).unwrap_err();
        assert_eq!(err.position(), (2, 1));
        let err = parse(lex("package p\nfunc f() {\n").unwrap()).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }), "got: {}", err);
    }
}
