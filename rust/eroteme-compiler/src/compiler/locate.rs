//! Eligibility locator: joins directives to the assignments on their lines.

use crate::compiler::ast::*;
use crate::compiler::directives::{Directive, DirectiveMap};
use crate::compiler::tokens::Token;
use crate::diagnostics::{Warning, WarningKind};
use std::collections::{HashMap, HashSet};

/// An assignment whose second target is the blank identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentCandidate {
    pub statement_line: usize,
    pub targets: Vec<String>,
    /// Block holding the statement
    pub block: BlockPath,
    /// Position of the statement in `block`
    pub index: usize,
    /// Piece index of the `_` target inside the statement
    pub target_piece: usize,
    /// Declared result count of the innermost enclosing function
    pub results: Option<usize>,
}

fn target_text(stmt: &SourceStmt, range: &std::ops::Range<usize>) -> String {
    let tokens: Vec<Token> = stmt.pieces[range.clone()]
        .iter()
        .filter_map(|p| match p {
            Piece::Token(t) if !t.implicit => Some(t.clone()),
            _ => None,
        })
        .collect();
    Expr::from_tokens(tokens).text
}

struct Walker<'a> {
    directives: &'a DirectiveMap,
    consumed: HashSet<usize>,
    /// Why the last multi-target assignment on a line was not eligible
    rejected: HashMap<usize, String>,
    pairs: Vec<(Directive, AssignmentCandidate)>,
    warnings: Vec<Warning>,
}

impl Walker<'_> {
    fn walk_block(&mut self, block: &Block, path: &BlockPath, results: Option<usize>) {
        let results = block.results.or(results);
        for (i, stmt) in block.stmts.iter().enumerate() {
            let Stmt::Source(stmt) = stmt else { continue };
            if let Shape::Assign(assign) = &stmt.shape {
                if assign.targets.len() >= 2 {
                    self.consider(stmt, assign, path, i, results);
                }
            }
            for (p, piece) in stmt.pieces.iter().enumerate() {
                if let Piece::Block(child) = piece {
                    self.walk_block(child, &path.child(i, p), results);
                }
            }
        }
    }

    fn consider(
        &mut self,
        stmt: &SourceStmt,
        assign: &Assign,
        path: &BlockPath,
        index: usize,
        results: Option<usize>,
    ) {
        let line = stmt.line();
        let second = &assign.targets[1];
        let blank = stmt.lone_token(second).filter(|t| t.is_ident("_"));
        let Some(directive) = self.directives.get(&line) else {
            if blank.is_some() {
                self.warnings.push(Warning::new(
                    WarningKind::DirectiveMismatch,
                    line,
                    stmt.start().col,
                    "second value discarded into `_` on a line without a directive",
                ));
            }
            return;
        };
        if blank.is_none() {
            self.rejected.entry(line).or_insert_with(|| {
                format!("second target `{}` is not `_`", target_text(stmt, second))
            });
            return;
        }
        if !self.consumed.insert(line) {
            self.warnings.push(Warning::new(
                WarningKind::DirectiveMismatch,
                directive.line,
                directive.col,
                format!(
                    "directive on line {} already applies to an earlier assignment; \
                     later assignment ignored",
                    line
                ),
            ));
            return;
        }
        let candidate = AssignmentCandidate {
            statement_line: line,
            targets: assign.targets.iter().map(|r| target_text(stmt, r)).collect(),
            block: path.clone(),
            index,
            target_piece: second.start,
            results,
        };
        self.pairs.push((directive.clone(), candidate));
    }
}

/// Finds the eligible assignment for each directive, in declaration order.
pub fn locate(
    unit: &SourceUnit,
    directives: &DirectiveMap,
    warnings: &mut Vec<Warning>,
) -> Vec<(Directive, AssignmentCandidate)> {
    let mut walker = Walker {
        directives,
        consumed: HashSet::new(),
        rejected: HashMap::new(),
        pairs: Vec::new(),
        warnings: Vec::new(),
    };
    walker.walk_block(&unit.root, &BlockPath::root(), None);

    for (line, directive) in directives {
        if walker.consumed.contains(line) {
            continue;
        }
        let reason = walker.rejected.remove(line).unwrap_or_else(|| {
            "no assignment with two or more targets starts on this line".to_string()
        });

        walker.warnings.push(Warning::new(
            WarningKind::DirectiveMismatch,
            directive.line,
            directive.col,
            format!("directive ignored: {}", reason),
        ));
    }
    warnings.append(&mut walker.warnings);
    walker.pairs
}
