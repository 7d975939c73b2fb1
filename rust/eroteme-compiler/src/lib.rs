//! Eroteme engine
//!
//! Rewrites Go sources carrying `//?` directive comments: `v, _ := f() //?`
//! becomes `v, err := f()` followed by `if err != nil { return err }`.

pub mod compiler;
pub mod diagnostics;

use compiler::ast::SourceUnit;
use compiler::directives::Collector;
use compiler::lexer::LexError;
use compiler::parser::ParseError;
use compiler::synth::SynthesizedEdit;
use diagnostics::Warning;
use thiserror::Error;
use tracing::debug;

// ── Transform options ───────────────────────────────────────────────

/// Knobs of one transformation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    /// Comment prefix marking a directive. Default: `//?`.
    pub sigil: String,
    /// Identifier that replaces the blank target. Default: `err`.
    pub error_ident: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self { sigil: "//?".to_string(), error_ident: "err".to_string() }
    }
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("invalid directive sigil: {0}")]
    Sigil(#[from] regex::Error),
}

impl TransformError {
    /// Source position of the failure, when it has one.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            TransformError::Lex(e) => Some(e.position()),
            TransformError::Parse(e) => Some(e.position()),
            TransformError::Sigil(_) => None,
        }
    }
}

/// Result of transforming one source text
#[derive(Debug, Clone)]
pub struct Transformed {
    pub output: String,
    /// False means `output` is the input, byte for byte
    pub changed: bool,
    pub edits: usize,
    /// Sorted by position
    pub warnings: Vec<Warning>,
}

// ── Pipeline ────────────────────────────────────────────────────────

/// Lex and parse a Go source file.
pub fn parse_source(source: &str) -> Result<SourceUnit, TransformError> {
    let lexed = compiler::lexer::lex(source)?;
    debug!(tokens = lexed.tokens.len(), comments = lexed.comments.len(), "lexed");
    let unit = compiler::parser::parse(lexed)?;
    debug!(package = %unit.package, decls = unit.root.stmts.len(), "parsed");
    Ok(unit)
}

/// Transform with default options.
pub fn transform(source: &str) -> Result<Transformed, TransformError> {
    transform_with_options(source, &TransformOptions::default())
}

/// Run the whole pipeline on one source text.
///
/// Parse failures are errors; everything else that keeps a directive from
/// applying is reported as a warning and leaves that site untouched.
pub fn transform_with_options(
    source: &str,
    options: &TransformOptions,
) -> Result<Transformed, TransformError> {

    let collector = Collector::new(&options.sigil)?;
    let unit = parse_source(source)?;

    let mut warnings = Vec::new();
    let directives = collector.collect(&unit.comments, &mut warnings);
    debug!(directives = directives.len(), "collected directives");

    let pairs = compiler::locate::locate(&unit, &directives, &mut warnings);
    debug!(candidates = pairs.len(), "located candidates");

    let mut edits: Vec<SynthesizedEdit> = Vec::with_capacity(pairs.len());
    for (directive, candidate) in pairs {
        match compiler::synth::synthesize(&directive, candidate, &options.error_ident) {
            Ok(edit) => edits.push(edit),
            Err(warning) => warnings.push(warning),
        }
    }
    warnings.sort_by_key(|w| (w.line, w.col));

    if edits.is_empty() {
        debug!(warnings = warnings.len(), "no edits");
        return Ok(Transformed { output: source.to_string(), changed: false, edits: 0, warnings });
    }

    let count = edits.len();
    let output = compiler::emit::emit(unit, edits);
    debug!(edits = count, warnings = warnings.len(), "applied edits");
    Ok(Transformed { changed: output != source, output, edits: count, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::WarningKind;

    #[test]
    fn test_no_directive_is_byte_identical() {
        let src = "package p\n\nfunc  f()   {\n}\n";
        let out = transform(src).unwrap();
        assert!(!out.changed);
        assert_eq!(out.output, src);
        assert_eq!(out.edits, 0);
    }

    #[test]
    fn test_parse_error_has_position() {
        let err = transform("package p\nfunc f() {\n").unwrap_err();
        assert!(matches!(err, TransformError::Parse(_)));
        assert_eq!(err.position().map(|(line, _)| line), Some(3));
    }

    #[test]
    fn test_warnings_sorted_by_line() {
        let src = "package p\n\
                   \n\
                   func f() error {\n\
                   \tg() //?\n\
                   \ta, _ := h() //? 1, 2\n\
                   \treturn nil\n\
                   }\n";
        let out = transform(src).unwrap();
        let kinds: Vec<_> = out.warnings.iter().map(|w| (w.line, w.kind)).collect();
        assert_eq!(
            kinds,
            vec![(4, WarningKind::DirectiveMismatch), (5, WarningKind::ArityMismatch)]
        );
        assert!(!out.changed);
    }

    #[test]
    fn test_custom_error_ident() {
        let options = TransformOptions {
            error_ident: "e".to_string(),
            ..TransformOptions::default()
        };
        let src = "package p\n\nfunc f() error {\n\t_, _ = g() //?\n\treturn nil\n}\n";
        let out = transform_with_options(src, &options).unwrap();
        assert!(
            out.output.contains("\t_, e = g()\n\tif e != nil {\n\t\treturn e\n\t}\n"),
            "got:\n{}",
            out.output
        );
    }
}
