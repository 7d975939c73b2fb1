//! Warnings collected during a transformation and rich diagnostics for display.

use crate::compiler::lexer::LexError;
use crate::compiler::parser::ParseError;
use crate::TransformError;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter};

/// Non-fatal findings; a warning never stops the file from being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// A directive has no eligible assignment on its line, or an eligible
    /// assignment has no directive
    DirectiveMismatch,
    /// Return expressions do not match the enclosing function's results
    ArityMismatch,
    /// Two directives on one line; the later one wins
    AmbiguousDirective,
    /// A directive payload is not a list of Go expressions
    MalformedDirective,
}

impl WarningKind {
    pub fn code(self) -> &'static str {
        match self {
            WarningKind::DirectiveMismatch => "W001",
            WarningKind::ArityMismatch => "W002",
            WarningKind::AmbiguousDirective => "W003",
            WarningKind::MalformedDirective => "W004",
        }
    }

    fn help(self) -> &'static str {
        match self {
            WarningKind::DirectiveMismatch => {
                "put the directive on the first line of an assignment whose second target is `_`"
            }
            WarningKind::ArityMismatch => "list one return expression per declared result",
            WarningKind::AmbiguousDirective => "keep a single directive per line",
            WarningKind::MalformedDirective => "separate return expressions with commas",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, line: usize, col: usize, message: impl Into<String>) -> Self {
        Self { kind, line, col, message: message.into() }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {} [{}]", self.line, self.col, self.message, self.kind)
    }
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A rendered diagnostic with source context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<String>,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub col: Option<usize>,
    pub source_line: Option<String>,
    pub underline: Option<String>,
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    /// Render with ANSI colors for terminal
    pub fn render_ansi(&self) -> String {
        let mut out = String::new();

        let severity_label = match self.severity {
            Severity::Error => red("error"),
            Severity::Warning => yellow("warning"),
        };
        if let Some(ref code) = self.code {
            out.push_str(&format!("{}[{}]: ", severity_label, bold(code)));
        } else {
            out.push_str(&format!("{}: ", severity_label));
        }
        out.push_str(&bold(&self.message));
        out.push('\n');

        if let Some(location) = self.location() {
            out.push_str(&format!("  {} {}\n", cyan("-->"), location));
        }

        if let (Some(line_num), Some(ref line_text), Some(ref underline)) =
            (self.line, &self.source_line, &self.underline)
        {
            out.push_str(&format!("   {}\n", cyan("|")));
            let gutter = cyan(&line_num.to_string());
            out.push_str(&format!("{:>3} {} {}\n", gutter, cyan("|"), line_text));
            let marker = match self.severity {
                Severity::Error => red(underline),
                Severity::Warning => yellow(underline),
            };
            out.push_str(&format!("   {} {}\n", cyan("|"), marker));
        }

        if !self.suggestions.is_empty() {
            out.push_str(&format!("   {}\n", cyan("|")));
            for suggestion in &self.suggestions {
                out.push_str(&format!("   {} {}: {}\n", cyan("="), cyan("help"), suggestion));
            }
        }

        out
    }

    /// Render without colors (for pipes, tests)
    pub fn render_plain(&self) -> String {
        let mut out = String::new();

        let severity_label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        if let Some(ref code) = self.code {
            out.push_str(&format!("{}[{}]: ", severity_label, code));
        } else {
            out.push_str(&format!("{}: ", severity_label));
        }
        out.push_str(&self.message);
        out.push('\n');

        if let Some(location) = self.location() {
            out.push_str(&format!("  --> {}\n", location));
        }

        if let (Some(line_num), Some(ref line_text), Some(ref underline)) =
            (self.line, &self.source_line, &self.underline)
        {
            out.push_str("   |\n");
            out.push_str(&format!("{:>3} | {}\n", line_num, line_text));
            out.push_str(&format!("   | {}\n", underline));
        }

        if !self.suggestions.is_empty() {
            out.push_str("   |\n");
            for suggestion in &self.suggestions {
                out.push_str(&format!("   = help: {}\n", suggestion));
            }
        }

        out
    }

    fn location(&self) -> Option<String> {
        match (&self.file, self.line, self.col) {
            (Some(file), Some(line), Some(col)) => Some(format!("{}:{}:{}", file, line, col)),
            (Some(file), Some(line), None) => Some(format!("{}:{}", file, line)),
            (Some(file), None, _) => Some(file.clone()),
            _ => None,
        }
    }
}

// ANSI color helpers
fn red(s: &str) -> String {
    format!("\x1b[31m{}\x1b[0m", s)
}

fn yellow(s: &str) -> String {
    format!("\x1b[33m{}\x1b[0m", s)
}

fn cyan(s: &str) -> String {
    format!("\x1b[36m{}\x1b[0m", s)
}

fn bold(s: &str) -> String {
    format!("\x1b[1m{}\x1b[0m", s)
}

fn get_source_line(source: &str, line: usize) -> Option<String> {
    if line == 0 {
        return None;
    }
    source.lines().nth(line - 1).map(|s| s.to_string())
}

fn make_underline(col: usize, len: usize) -> String {
    format!("{}{}", " ".repeat(col.saturating_sub(1)), "^".repeat(len.max(1)))
}

#[allow(clippy::too_many_arguments)]
fn located(
    severity: Severity,
    code: &str,
    message: String,
    source: &str,
    filename: &str,
    (line, col): (usize, usize),
    width: usize,
    suggestions: Vec<String>,
) -> Diagnostic {
    let source_line = get_source_line(source, line);
    let underline = source_line.as_ref().map(|_| make_underline(col, width));
    Diagnostic {
        severity,
        code: Some(code.to_string()),
        message,
        file: Some(filename.to_string()),
        line: Some(line),
        col: Some(col),
        source_line,
        underline,
        suggestions,
    }
}

/// Convert a collected warning into a diagnostic pointing at its source line.
pub fn format_warning(warning: &Warning, source: &str, filename: &str) -> Diagnostic {
    // Directive warnings underline the whole comment text.
    let width = get_source_line(source, warning.line)
        .map(|l| l.chars().count().saturating_sub(warning.col.saturating_sub(1)))
        .unwrap_or(1);
    located(
        Severity::Warning,
        warning.kind.code(),
        warning.message.clone(),
        source,
        filename,
        (warning.line, warning.col),
        width,
        vec![warning.kind.help().to_string()],
    )
}

/// Convert a fatal transformation error into a diagnostic.
pub fn format_transform_error(error: &TransformError, source: &str, filename: &str) -> Diagnostic {
    match error {
        TransformError::Lex(e) => format_lex_error(e, source, filename),
        TransformError::Parse(e) => format_parse_error(e, source, filename),
        TransformError::Sigil(e) => Diagnostic {
            severity: Severity::Error,
            code: Some("E020".to_string()),
            message: format!("invalid directive sigil: {}", e),
            file: Some(filename.to_string()),
            line: None,
            col: None,
            source_line: None,
            underline: None,
            suggestions: vec![],
        },
    }
}

fn format_lex_error(error: &LexError, source: &str, filename: &str) -> Diagnostic {
    let (code, message, suggestion) = match error {
        LexError::UnexpectedChar { ch, .. } => {
            ("E001", format!("unexpected character '{}'", ch), None)
        }
        LexError::UnterminatedString { .. } => {
            ("E002", "unterminated string literal".to_string(), Some("add a closing quote"))
        }
        LexError::UnterminatedRawString { .. } => {
            ("E003", "unterminated raw string literal".to_string(), Some("add a closing backquote"))
        }
        LexError::UnterminatedRune { .. } => {
            ("E004", "unterminated rune literal".to_string(), Some("add a closing single quote"))
        }
        LexError::UnterminatedComment { .. } => {
            ("E005", "unterminated comment".to_string(), Some("close the comment with `*/`"))
        }
    };
    located(
        Severity::Error,
        code,
        message,
        source,
        filename,
        error.position(),
        1,
        suggestion.map(|s| vec![s.to_string()]).unwrap_or_default(),
    )
}

fn format_parse_error(error: &ParseError, source: &str, filename: &str) -> Diagnostic {
    match error {
        ParseError::Unexpected { found, expected, line, col } => located(
            Severity::Error,
            "E010",
            format!("unexpected {}, expected {}", found, expected),
            source,
            filename,
            (*line, *col),
            1,
            vec![],
        ),
        ParseError::UnexpectedEof { expected, line, col } => located(
            Severity::Error,
            "E011",
            format!("unexpected end of file, expected {}", expected),
            source,
            filename,
            (*line, *col),
            1,
            vec!["check for a missing closing brace".to_string()],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_get_source_line() {
        let source = "line 1\nline 2\nline 3\n";
        assert_eq!(get_source_line(source, 1), Some("line 1".to_string()));
        assert_eq!(get_source_line(source, 3), Some("line 3".to_string()));
        assert_eq!(get_source_line(source, 4), None);
        assert_eq!(get_source_line(source, 0), None);
    }

    #[test]
    fn test_make_underline() {
        assert_eq!(make_underline(1, 3), "^^^");
        assert_eq!(make_underline(5, 2), "    ^^");
        assert_eq!(make_underline(3, 0), "  ^");
    }

    #[test]
    fn test_warning_kind_names_and_codes() {
        let names: Vec<String> = WarningKind::iter().map(|k| k.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "directive-mismatch",
                "arity-mismatch",
                "ambiguous-directive",
                "malformed-directive"
            ]
        );
        let codes: std::collections::HashSet<&str> =
            WarningKind::iter().map(|k| k.code()).collect();

        assert_eq!(codes.len(), 4);
    }

    #[test]
    fn test_format_warning() {
        let source = "package p\nfunc f() {\n\tx := 1 //? err\n}\n";
        let warning = Warning::new(WarningKind::DirectiveMismatch, 3, 9, "no eligible assignment");
        let diag = format_warning(&warning, source, "a.go");
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.code.as_deref(), Some("W001"));
        assert_eq!(diag.underline.as_deref(), Some("        ^^^^^^^"));
        let plain = diag.render_plain();
        assert!(plain.contains("warning[W001]: no eligible assignment"), "got: {}", plain);
        assert!(plain.contains("a.go:3:9"), "got: {}", plain);
    }

    #[test]
    fn test_format_parse_error() {
        let error = ParseError::Unexpected {
            found: "'}'".to_string(),
            expected: "statement".to_string(),
            line: 2,
            col: 1,
        };
        let diag = format_transform_error(&TransformError::Parse(error), "package p\n}\n", "b.go");
        assert_eq!(diag.code.as_deref(), Some("E010"));
        assert_eq!(diag.source_line.as_deref(), Some("}"));
        assert!(diag.render_ansi().contains("\x1b["));
    }

    #[test]
    fn test_warning_serializes_kebab_case() {
        let warning = Warning::new(WarningKind::AmbiguousDirective, 4, 2, "shadowed");
        let json = serde_json::to_string(&warning).unwrap();
        assert!(json.contains("\"ambiguous-directive\""), "got: {}", json);
    }
}
