//! Go lexer with automatic semicolon insertion and a comment side table.

use crate::compiler::tokens::{Comment, Span, Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at line {line}, col {col}")]
    UnexpectedChar { ch: char, line: usize, col: usize },
    #[error("unterminated string at line {line}, col {col}")]
    UnterminatedString { line: usize, col: usize },
    #[error("unterminated raw string at line {line}, col {col}")]
    UnterminatedRawString { line: usize, col: usize },
    #[error("unterminated rune literal at line {line}, col {col}")]
    UnterminatedRune { line: usize, col: usize },
    #[error("unterminated comment at line {line}, col {col}")]
    UnterminatedComment { line: usize, col: usize },
}

impl LexError {
    pub fn position(&self) -> (usize, usize) {
        match self {
            LexError::UnexpectedChar { line, col, .. }
            | LexError::UnterminatedString { line, col }
            | LexError::UnterminatedRawString { line, col }
            | LexError::UnterminatedRune { line, col }
            | LexError::UnterminatedComment { line, col } => (*line, *col),
        }
    }
}

/// Tokens and comments of one source text, both in source order.
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
}

// Longest spellings first so that the first prefix match wins.
const OPERATORS: &[(&str, TokenKind)] = &[
    ("<<=", TokenKind::ShlAssign),
    (">>=", TokenKind::ShrAssign),
    ("&^=", TokenKind::AndNotAssign),
    ("...", TokenKind::Ellipsis),
    ("&&", TokenKind::AndAnd),
    ("||", TokenKind::OrOr),
    ("<-", TokenKind::Arrow),
    ("++", TokenKind::Inc),
    ("--", TokenKind::Dec),
    ("==", TokenKind::Eq),
    ("!=", TokenKind::NotEq),
    ("<=", TokenKind::LtEq),
    (">=", TokenKind::GtEq),
    (":=", TokenKind::Define),
    ("+=", TokenKind::PlusAssign),
    ("-=", TokenKind::MinusAssign),
    ("*=", TokenKind::StarAssign),
    ("/=", TokenKind::SlashAssign),
    ("%=", TokenKind::PercentAssign),
    ("&=", TokenKind::AmpAssign),
    ("|=", TokenKind::PipeAssign),
    ("^=", TokenKind::CaretAssign),
    ("<<", TokenKind::Shl),
    (">>", TokenKind::Shr),
    ("&^", TokenKind::AndNot),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("&", TokenKind::Amp),
    ("|", TokenKind::Pipe),
    ("^", TokenKind::Caret),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    ("=", TokenKind::Assign),
    ("!", TokenKind::Not),
    ("~", TokenKind::Tilde),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    (",", TokenKind::Comma),
    (".", TokenKind::Dot),
    (";", TokenKind::Semicolon),
    (":", TokenKind::Colon),
];

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    byte_offset: usize,
    tokens: Vec<Token>,
    comments: Vec<Comment>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            byte_offset: 0,
            tokens: Vec::new(),
            comments: Vec::new(),
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        self.byte_offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn span_here(&self) -> Span {
        Span::new(self.byte_offset, self.byte_offset, self.line, self.col)
    }

    fn span_from(&self, so: usize, sl: usize, sc: usize) -> Span {
        Span::new(so, self.byte_offset, sl, sc)
    }

    fn text_from(&self, start_pos: usize) -> String {
        self.source[start_pos..self.pos].iter().collect()
    }

    /// Inserts a semicolon if the previous token can end a statement.
    fn insert_semicolon(&mut self, span: Span) {
        let ends = self.tokens.last().map(|t| t.kind.ends_line()).unwrap_or(false);
        if ends {
            self.tokens.push(Token::implicit_semicolon(span));
        }
    }

    fn push(&mut self, kind: TokenKind, start_pos: usize, so: usize, sl: usize, sc: usize) {
        let text = self.text_from(start_pos);
        let span = self.span_from(so, sl, sc);
        self.tokens.push(Token::new(kind, text, span));
    }

    fn read_line_comment(&mut self) {
        let (start, so, sl, sc) = (self.pos, self.byte_offset, self.line, self.col);
        while matches!(self.current(), Some(c) if c != '\n') {
            self.advance();
        }
        let mut text = self.text_from(start);
        // CRLF sources leave a carriage return before the newline
        if text.ends_with('\r') {
            text.pop();
        }
        let span = self.span_from(so, sl, sc);
        self.comments.push(Comment { text, span, is_block: false });
    }

    fn read_block_comment(&mut self) -> Result<(), LexError> {
        let (start, so, sl, sc) = (self.pos, self.byte_offset, self.line, self.col);
        self.advance();
        self.advance();
        loop {
            match self.current() {
                None => return Err(LexError::UnterminatedComment { line: sl, col: sc }),
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    self.advance();
                    break;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        let text = self.text_from(start);
        let span = self.span_from(so, sl, sc);
        let multi_line = text.contains('\n');
        self.comments.push(Comment { text, span, is_block: true });
        if multi_line {
            self.insert_semicolon(Span::new(so, so, sl, sc));
        }
        Ok(())
    }

    fn read_quoted(&mut self, quote: char) -> Result<(), LexError> {
        let (start, so, sl, sc) = (self.pos, self.byte_offset, self.line, self.col);
        let unterminated = || {
            if quote == '"' {
                LexError::UnterminatedString { line: sl, col: sc }
            } else {
                LexError::UnterminatedRune { line: sl, col: sc }
            }
        };
        self.advance();
        loop {
            match self.current() {
                None | Some('\n') => return Err(unterminated()),
                Some('\\') => {
                    self.advance();
                    if matches!(self.current(), None | Some('\n')) {
                        return Err(unterminated());
                    }
                    self.advance();
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        let kind = if quote == '"' { TokenKind::String } else { TokenKind::Char };
        self.push(kind, start, so, sl, sc);
        Ok(())
    }

    fn read_raw_string(&mut self) -> Result<(), LexError> {
        let (start, so, sl, sc) = (self.pos, self.byte_offset, self.line, self.col);
        self.advance();
        loop {
            match self.advance() {
                None => return Err(LexError::UnterminatedRawString { line: sl, col: sc }),
                Some('`') => break,
                Some(_) => {}
            }
        }
        self.push(TokenKind::String, start, so, sl, sc);
        Ok(())
    }

    fn read_number(&mut self) {
        let (start, so, sl, sc) = (self.pos, self.byte_offset, self.line, self.col);
        let hex = self.current() == Some('0') && matches!(self.peek(), Some('x' | 'X'));
        let mut seen_dot = false;
        let mut seen_exp = false;
        let mut prev = '\0';
        while let Some(ch) = self.current() {
            let exponent = if hex { matches!(ch, 'p' | 'P') } else { matches!(ch, 'e' | 'E') };
            if exponent {
                seen_exp = true;
            } else if ch == '.' {
                if seen_dot || seen_exp {
                    break;
                }
                seen_dot = true;
            } else if matches!(ch, '+' | '-') {
                let after_exp =
                    if hex { matches!(prev, 'p' | 'P') } else { matches!(prev, 'e' | 'E') };

                if !after_exp {
                    break;
                }
            } else if !(ch.is_ascii_alphanumeric() || ch == '_') {
                break;
            }
            prev = ch;
            self.advance();
        }
        let text = self.text_from(start);
        let kind = if text.ends_with('i') {
            TokenKind::Imag
        } else if seen_dot || seen_exp {
            TokenKind::Float
        } else {
            TokenKind::Int
        };
        self.push(kind, start, so, sl, sc);
    }

    fn read_ident(&mut self) {
        let (start, so, sl, sc) = (self.pos, self.byte_offset, self.line, self.col);
        while matches!(self.current(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        let text = self.text_from(start);
        let kind = TokenKind::keyword(&text).unwrap_or(TokenKind::Ident);
        self.push(kind, start, so, sl, sc);
    }

    fn read_operator(&mut self) -> Result<(), LexError> {
        let (start, so, sl, sc) = (self.pos, self.byte_offset, self.line, self.col);
        let rest = &self.source[self.pos..];
        let found = OPERATORS.iter().find(|(spelling, _)| {
            let n = spelling.chars().count();
            rest.len() >= n && spelling.chars().zip(rest.iter()).all(|(a, b)| a == *b)
        });
        match found {
            Some(&(spelling, kind)) => {
                for _ in 0..spelling.chars().count() {
                    self.advance();
                }
                self.push(kind, start, so, sl, sc);
                Ok(())
            }
            None => Err(LexError::UnexpectedChar {
                ch: self.current().unwrap_or('\0'),
                line: sl,
                col: sc,
            }),
        }
    }

    pub fn tokenize(mut self) -> Result<Lexed, LexError> {
        while let Some(ch) = self.current() {
            match ch {
                '\n' => {
                    let span = self.span_here();
                    self.insert_semicolon(span);
                    self.advance();
                }
                ' ' | '\t' | '\r' | '\u{feff}' => {
                    self.advance();
                }
                '/' if self.peek() == Some('/') => self.read_line_comment(),
                '/' if self.peek() == Some('*') => self.read_block_comment()?,
                '"' | '\'' => self.read_quoted(ch)?,
                '`' => self.read_raw_string()?,
                '0'..='9' => self.read_number(),
                '.' if matches!(self.peek(), Some(d) if d.is_ascii_digit()) => self.read_number(),
                c if c.is_alphabetic() || c == '_' => self.read_ident(),
                _ => self.read_operator()?,
            }
        }
        let end = self.span_here();
        self.insert_semicolon(end);
        self.tokens.push(Token::new(TokenKind::Eof, "", end));
        Ok(Lexed { tokens: self.tokens, comments: self.comments })
    }
}

/// Lex `source` in one call.
pub fn lex(source: &str) -> Result<Lexed, LexError> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_assignment() {
        let lexed = lex("v, _ := f(x)").unwrap();
        let texts: Vec<&str> = lexed.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["v", ",", "_", ":=", "f", "(", "x", ")", "", ""]);
        assert_eq!(lexed.tokens[3].kind, TokenKind::Define);
        assert!(lexed.tokens[8].implicit);
    }

    #[test]
    fn test_semicolon_insertion() {
        let k = kinds("a++\nb = c +\nd\n");
        assert_eq!(
            k,
            vec![
                TokenKind::Ident,
                TokenKind::Inc,
                TokenKind::Semicolon,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Ident,
                TokenKind::Plus,
                TokenKind::Ident,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_longest_operator_match() {
        let k = kinds("x &^= y <<= 2");
        assert_eq!(k[1], TokenKind::AndNotAssign);
        assert_eq!(k[3], TokenKind::ShlAssign);
        assert_eq!(kinds("<-ch")[0], TokenKind::Arrow);
        assert_eq!(kinds("f(a...)")[3], TokenKind::Ellipsis);
    }

    #[test]
    fn test_numbers() {
        let lexed = lex("0x1e+2 1e+2 .5 3i 1_000 0x1p-2").unwrap();
        let got: Vec<(TokenKind, &str)> = lexed
            .tokens
            .iter()
            .filter(|t| !t.implicit && t.kind != TokenKind::Eof)
            .map(|t| (t.kind, t.text.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                (TokenKind::Int, "0x1e"),
                (TokenKind::Plus, "+"),
                (TokenKind::Int, "2"),
                (TokenKind::Float, "1e+2"),
                (TokenKind::Float, ".5"),
                (TokenKind::Imag, "3i"),
                (TokenKind::Int, "1_000"),
                (TokenKind::Float, "0x1p-2"),
            ]
        );
    }

    #[test]
    fn test_comments_are_side_table() {
        let lexed = lex("x := 1 //? a, b\n/* c */ y()").unwrap();
        assert_eq!(lexed.comments.len(), 2);
        assert_eq!(lexed.comments[0].text, "//? a, b");
        assert_eq!(lexed.comments[0].span.line, 1);
        assert!(!lexed.comments[0].is_block);
        assert!(lexed.comments[1].is_block);
        assert!(lexed.tokens.iter().all(|t| !t.text.contains("//")));
    }

    #[test]
    fn test_multiline_block_comment_ends_statement() {
        let k = kinds("a /* x\ny */ b");
        assert_eq!(k[1], TokenKind::Semicolon);
    }

    #[test]
    fn test_raw_string_spans_lines() {
        let lexed = lex("s := `a\nb`\n").unwrap();
        let raw = &lexed.tokens[2];
        assert_eq!(raw.kind, TokenKind::String);
        assert_eq!(raw.end_line(), 2);
    }

    #[test]
    fn test_unterminated_literals() {
        assert!(matches!(
            lex("s := \"abc\n"),
            Err(LexError::UnterminatedString { line: 1, col: 6 })
        ));
        assert!(matches!(lex("r := 'a"), Err(LexError::UnterminatedRune { .. })));
        assert!(matches!(lex("s := `abc"), Err(LexError::UnterminatedRawString { .. })));
        assert!(matches!(lex("/* abc"), Err(LexError::UnterminatedComment { .. })));
    }

    #[test]
    fn test_unexpected_char() {
        let err = lex("x := 1\ny := @").unwrap_err();
        assert_eq!(err, LexError::UnexpectedChar { ch: '@', line: 2, col: 6 });
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let lexed = lex(r#"s := "a\"b, c""#).unwrap();
        assert_eq!(lexed.tokens[2].text, r#""a\"b, c""#);
    }
}
