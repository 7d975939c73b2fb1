use crate::compiler::ast::{ErrCheck, Expr};
use crate::compiler::directives::Directive;
use crate::compiler::locate::AssignmentCandidate;
use crate::diagnostics::{Warning, WarningKind};

/// The rename plus inserted check for one eligible assignment
#[derive(Debug, Clone)]
pub struct SynthesizedEdit {
    pub candidate: AssignmentCandidate,
    pub renamed_target: String,
    pub inserted: ErrCheck,
    /// Offset of the consumed directive comment
    pub directive_offset: usize,
}

/// Builds the edit for a directive/candidate pair, or the reason it is skipped.
pub fn synthesize(
    directive: &Directive,
    candidate: AssignmentCandidate,
    error_ident: &str,
) -> Result<SynthesizedEdit, Warning> {
    let results: Vec<Expr> = if directive.return_exprs.is_empty() {
        vec![Expr::ident(error_ident)]
    } else {
        directive.return_exprs.clone()
    };

    if let Some(declared) = candidate.results {
        if declared != results.len() {
            return Err(Warning::new(
                WarningKind::ArityMismatch,
                directive.line,
                directive.col,
                format!(
                    "directive returns {} value{} but the enclosing function declares {} result{}",
                    results.len(),
                    if results.len() == 1 { "" } else { "s" },
                    declared,
                    if declared == 1 { "" } else { "s" },
                ),
            ));
        }
    }

    Ok(SynthesizedEdit {
        candidate,
        renamed_target: error_ident.to_string(),
        inserted: ErrCheck::new(error_ident, results),
        directive_offset: directive.offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::BlockPath;

    fn directive(exprs: &[&str]) -> Directive {
        Directive {
            line: 4,
            col: 20,
            offset: 77,
            raw_text: "//?".to_string(),
            return_exprs: exprs.iter().map(|e| Expr::ident(e)).collect(),
        }
    }

    fn candidate(results: Option<usize>) -> AssignmentCandidate {
        AssignmentCandidate {
            statement_line: 4,
            targets: vec!["v".to_string(), "_".to_string()],
            block: BlockPath::root().child(1, 5),
            index: 0,
            target_piece: 2,
            results,
        }
    }

    #[test]
    fn default_return_is_error_ident() {
        let edit = synthesize(&directive(&[]), candidate(Some(1)), "err").unwrap();
        assert_eq!(edit.renamed_target, "err");
        assert_eq!(edit.inserted.header(), "if err != nil {");
        assert_eq!(edit.inserted.ret.render(), "return err");
        assert_eq!(edit.directive_offset, 77);
    }

    #[test]
    fn explicit_returns_kept_in_order() {
        let edit = synthesize(&directive(&["v", "e"]), candidate(Some(2)), "e").unwrap();
        assert_eq!(edit.inserted.header(), "if e != nil {");
        assert_eq!(edit.inserted.ret.render(), "return v, e");
    }

    #[test]
    fn arity_mismatch_skips_edit() {
        let warning =
            synthesize(&directive(&["a", "b", "c"]), candidate(Some(2)), "err").unwrap_err();

        assert_eq!(warning.kind, WarningKind::ArityMismatch);
        assert_eq!((warning.line, warning.col), (4, 20));
        assert!(warning.message.contains("3 values"), "got: {}", warning.message);

        let warning = synthesize(&directive(&[]), candidate(Some(0)), "err").unwrap_err();
        assert!(warning.message.contains("declares 0 results"), "got: {}", warning.message);
    }

    #[test]
    fn unknown_function_skips_arity_check() {
        assert!(synthesize(&directive(&["a", "b", "c"]), candidate(None), "err").is_ok());
    }
}
