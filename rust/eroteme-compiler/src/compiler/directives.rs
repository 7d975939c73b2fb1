//! Directive collection: finds sigil comments and parses their return lists.

use crate::compiler::ast::Expr;
use crate::compiler::lexer::lex;
use crate::compiler::tokens::{Comment, TokenKind};
use crate::diagnostics::{Warning, WarningKind};
use regex::Regex;
use std::collections::BTreeMap;
use tracing::trace;

/// A parsed directive comment
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub line: usize,
    pub col: usize,
    /// Byte offset of the comment, used to drop it once consumed
    pub offset: usize,
    pub raw_text: String,
    /// Empty means "return the error alone"
    pub return_exprs: Vec<Expr>,
}

/// Directives keyed by the source line of their comment.
pub type DirectiveMap = BTreeMap<usize, Directive>;

pub struct Collector {
    pattern: Regex,
}

impl Collector {
    pub fn new(sigil: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(r"^{}(?s:(.*))$", regex::escape(sigil)))?;
        Ok(Self { pattern })
    }

    fn payload<'c>(&self, comment: &'c Comment) -> Option<&'c str> {
        let caps = self.pattern.captures(&comment.text)?;
        let payload = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        if comment.is_block {
            Some(payload.strip_suffix("*/").unwrap_or(payload))
        } else {
            Some(payload)
        }
    }

    pub fn collect(&self, comments: &[Comment], warnings: &mut Vec<Warning>) -> DirectiveMap {
        let mut map = DirectiveMap::new();
        for comment in comments {
            let Some(payload) = self.payload(comment) else { continue };
            let (line, col) = (comment.span.line, comment.span.col);
            let mut return_exprs = Vec::new();
            let mut malformed = None;
            for text in split_exprs(payload) {
                match parse_expr(&text) {
                    Ok(expr) => return_exprs.push(expr),
                    Err(reason) => {
                        malformed = Some(reason);
                        break;
                    }
                }
            }
            if let Some(reason) = malformed {
                warnings.push(Warning::new(
                    WarningKind::MalformedDirective,
                    line,
                    col,
                    format!("directive dropped: {}", reason),
                ));
                continue;
            }
            trace!(line, exprs = return_exprs.len(), "directive");
            let directive = Directive {
                line,
                col,
                offset: comment.span.start,
                raw_text: comment.text.clone(),
                return_exprs,
            };
            if let Some(shadowed) = map.insert(line, directive) {
                warnings.push(Warning::new(
                    WarningKind::AmbiguousDirective,
                    shadowed.line,
                    shadowed.col,
                    format!(
                        "directive at column {} is shadowed by a later directive on line {}",
                        shadowed.col, line
                    ),
                ));
            }
        }
        map
    }
}

/// Splits a payload on commas that are outside brackets and literals.
pub fn split_exprs(payload: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in payload.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' && q != '`' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' | '`' => {
                quote = Some(ch);
                current.push(ch);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);
    parts.into_iter().map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect()
}

fn is_operand(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::Imag
            | TokenKind::Char
            | TokenKind::String

    )
}

/// Lexes one return expression; rejects comments and juxtaposed operands.
fn parse_expr(text: &str) -> Result<Expr, String> {
    let lexed = lex(text).map_err(|e| format!("`{}` is not a Go expression ({})", text, e))?;
    if !lexed.comments.is_empty() {
        return Err(format!("`{}` contains a comment", text));
    }
    let tokens: Vec<_> = lexed
        .tokens
        .into_iter()
        .filter(|t| !t.implicit && t.kind != TokenKind::Eof)
        .collect();
    let mut depth = 0usize;
    for pair in tokens.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.kind.is_opener() {
            depth += 1;
        } else if a.kind.is_closer() {
            depth = depth.saturating_sub(1);
        }
        if depth == 0 && is_operand(a.kind) && is_operand(b.kind) {
            return Err(format!("missing ',' between `{}` and `{}`", a.text, b.text));
        }
    }
    if tokens.is_empty() {
        return Err(format!("`{}` is empty", text));
    }
    Ok(Expr::from_tokens(tokens))
}
