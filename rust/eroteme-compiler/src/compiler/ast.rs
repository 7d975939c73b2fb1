use crate::compiler::tokens::{Comment, Span, Token, TokenKind};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A parsed Go source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUnit {
    pub package: String,
    /// Top-level declarations, in source order
    pub root: Block,
    /// Every comment of the file, keyed by position rather than attached to nodes
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    /// The file itself
    Root,
    /// `{ ... }` holding statements
    Braced,
    /// `{ ... }` of a `switch`/`select`, holding clauses
    Cases,
    /// Statements after `case ...:`/`default:`; no braces of its own
    Clause,
}

/// A statement list with the braces that delimit it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    pub open: Option<Token>,
    pub close: Option<Token>,
    pub stmts: Vec<Stmt>,
    /// Declared result count when this block is a function body
    pub results: Option<usize>,
    /// Set once an edit has been applied inside this block
    pub edited: bool,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self { kind, open: None, close: None, stmts: Vec::new(), results: None, edited: false }
    }

    pub fn start(&self) -> Option<Span> {
        match &self.open {
            Some(tok) => Some(tok.span),
            None => self.stmts.iter().find_map(Stmt::start),
        }
    }

    pub fn end_line(&self) -> Option<usize> {
        match &self.close {
            Some(tok) => Some(tok.end_line()),
            None => self.stmts.iter().rev().find_map(Stmt::end_line),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Source(SourceStmt),
    ErrCheck(ErrCheck),
}

impl Stmt {
    pub fn start(&self) -> Option<Span> {
        match self {
            Stmt::Source(s) => Some(s.start()),
            Stmt::ErrCheck(_) => None,
        }
    }

    pub fn end_line(&self) -> Option<usize> {
        match self {
            Stmt::Source(s) => Some(s.end_line()),
            Stmt::ErrCheck(_) => None,
        }
    }
}

/// A statement as written: its tokens in order, with nested code blocks in place
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStmt {
    pub shape: Shape,
    pub pieces: Vec<Piece>,
}

impl SourceStmt {
    pub fn start(&self) -> Span {
        self.pieces
            .iter()
            .find_map(|p| match p {
                Piece::Token(t) => Some(t.span),
                Piece::Block(b) => b.start(),
            })
            .unwrap_or_else(Span::dummy)
    }

    pub fn line(&self) -> usize {
        self.start().line
    }

    pub fn end_line(&self) -> usize {
        self.pieces
            .iter()
            .rev()
            .find_map(|p| match p {
                Piece::Token(t) if !t.implicit => Some(t.end_line()),
                Piece::Token(_) => None,
                Piece::Block(b) => b.end_line(),
            })
            .unwrap_or_else(|| self.line())
    }

    /// The single token making up `range`, if it is exactly one token.
    pub fn lone_token(&self, range: &Range<usize>) -> Option<&Token> {
        match &self.pieces[range.clone()] {
            [Piece::Token(t)] => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Piece {
    Token(Token),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    /// `a, b = ...` / `a, b := ...`
    Assign(Assign),
    /// `Label:`
    Label,
    /// `case ...:` / `default:` with its clause block as last piece
    Clause,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assign {
    pub op: TokenKind,
    /// Piece ranges of the left-hand side targets
    pub targets: Vec<Range<usize>>,
}

/// The inserted `if <ident> != nil { return ... }` statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrCheck {
    pub cond: Condition,
    pub ret: ReturnStmt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub lhs: Expr,
    pub op: TokenKind,
    pub rhs: Expr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub results: Vec<Expr>,
}

impl ErrCheck {
    pub fn new(ident: &str, results: Vec<Expr>) -> Self {
        Self {
            cond: Condition {
                lhs: Expr::ident(ident),
                op: TokenKind::NotEq,
                rhs: Expr::ident("nil"),
            },

            ret: ReturnStmt { results },
        }
    }

    pub fn header(&self) -> String {
        format!("if {} {} {} {{", self.cond.lhs.text, self.cond.op, self.cond.rhs.text)
    }
}

impl ReturnStmt {
    pub fn render(&self) -> String {
        let exprs: Vec<&str> = self.results.iter().map(|e| e.text.as_str()).collect();
        if exprs.is_empty() {
            "return".to_string()
        } else {
            format!("return {}", exprs.join(", "))
        }
    }
}

/// An expression kept as tokens plus its normalized spelling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub tokens: Vec<Token>,
    pub text: String,
}

impl Expr {
    pub fn ident(name: &str) -> Self {
        Self { tokens: vec![Token::synthetic(TokenKind::Ident, name)], text: name.to_string() }
    }

    /// Tokens separated by whitespace in the source get one space, adjacent ones none.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        let mut text = String::new();
        let mut prev_end: Option<usize> = None;
        for tok in &tokens {
            if let Some(end) = prev_end {
                if tok.span.start > end {
                    text.push(' ');
                }
            }
            text.push_str(&tok.text);
            prev_end = Some(tok.span.end);
        }
        Self { tokens, text }
    }
}

/// Location of a block as (statement index, piece index) steps from the root
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockPath(pub Vec<(usize, usize)>);

impl BlockPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, stmt: usize, piece: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push((stmt, piece));
        Self(steps)
    }

    pub fn block_at<'a>(&self, root: &'a Block) -> Option<&'a Block> {
        let mut block = root;
        for &(stmt, piece) in &self.0 {
            block = match block.stmts.get(stmt)? {
                Stmt::Source(s) => match s.pieces.get(piece)? {
                    Piece::Block(b) => b,
                    Piece::Token(_) => return None,
                },
                Stmt::ErrCheck(_) => return None,
            };
        }
        Some(block)
    }

    pub fn block_at_mut<'a>(&self, root: &'a mut Block) -> Option<&'a mut Block> {
        let mut block = root;
        for &(stmt, piece) in &self.0 {
            block = match block.stmts.get_mut(stmt)? {
                Stmt::Source(s) => match s.pieces.get_mut(piece)? {
                    Piece::Block(b) => b,
                    Piece::Token(_) => return None,
                },
                Stmt::ErrCheck(_) => return None,
            };
        }
        Some(block)
    }

    /// Flattened ordering key of a statement at `index` inside this block.
    pub fn key(&self, index: usize) -> Vec<usize> {
        let mut key: Vec<usize> = self.0.iter().flat_map(|&(s, p)| [s, p]).collect();
        key.push(index);
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: TokenKind, text: &str, start: usize) -> Token {
        Token::new(kind, text, Span::new(start, start + text.len(), 1, start + 1))
    }

    #[test]
    fn expr_text_keeps_adjacency() {
        let e = Expr::from_tokens(vec![
            tok(TokenKind::Ident, "fmt", 0),
            tok(TokenKind::Dot, ".", 3),
            tok(TokenKind::Ident, "Errorf", 4),
            tok(TokenKind::LParen, "(", 10),
            tok(TokenKind::Ident, "a", 11),
            tok(TokenKind::Plus, "+", 13),
            tok(TokenKind::Ident, "b", 15),
            tok(TokenKind::RParen, ")", 16),
        ]);
        assert_eq!(e.text, "fmt.Errorf(a + b)");
    }

    #[test]
    fn err_check_renders() {
        let check = ErrCheck::new("err", vec![Expr::ident("nil"), Expr::ident("err")]);
        assert_eq!(check.header(), "if err != nil {");
        assert_eq!(check.ret.render(), "return nil, err");
    }

    #[test]
    fn path_keys_order_nested_after_outer() {
        let outer = BlockPath::root().child(1, 3);
        let inner = outer.child(4, 2);
        assert!(inner.key(0) > outer.key(2));
        assert!(outer.key(5) > inner.key(0));
    }

    #[test]
    fn path_resolves_nested_block() {
        let mut inner = Block::new(BlockKind::Braced);
        inner.results = Some(2);
        let stmt = SourceStmt {
            shape: Shape::Other,
            pieces: vec![Piece::Token(tok(TokenKind::Func, "func", 0)), Piece::Block(inner)],
        };
        let mut root = Block::new(BlockKind::Root);
        root.stmts.push(Stmt::Source(stmt));
        let path = BlockPath::root().child(0, 1);
        assert_eq!(path.block_at(&root).and_then(|b| b.results), Some(2));
        assert!(BlockPath::root().child(0, 0).block_at(&root).is_none());
    }
}
