//! Parallel batch runner.
//!
//! Files are fed to a fixed set of scoped worker threads over a channel.
//! Each worker runs the whole pipeline for one file at a time: read,
//! transform, then write/check/print. Reports come back tagged with the
//! file's walk index and are returned in walk order, whatever order the
//! workers finished in.
//!
//! The stop flag is checked before each file starts; files not started once
//! it is set are reported as skipped. A file already being written always
//! finishes its atomic replace.

use crate::error::FileError;
use crate::write::write_atomic;
use eroteme_compiler::diagnostics::{format_transform_error, format_warning, Diagnostic};
use eroteme_compiler::{transform_with_options, TransformOptions};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Rewrite files in place
    Write,
    /// Report files that would change
    Check,
    /// Print transformed content
    Stdout,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub mode: Mode,
    /// Worker threads; 0 means one per CPU
    pub jobs: usize,
    pub transform: TransformOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { mode: Mode::Write, jobs: 0, transform: TransformOptions::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    Unchanged,
    Rewritten { edits: usize },
    WouldRewrite { edits: usize },
    Printed { edits: usize },
    /// Not started because the run was interrupted
    Skipped,
    Failed { error: String },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. } | Outcome::Skipped)
    }

    pub fn edits(&self) -> usize {
        match self {
            Outcome::Rewritten { edits }
            | Outcome::WouldRewrite { edits }
            | Outcome::Printed { edits } => *edits,
            _ => 0,
        }
    }
}

/// What happened to one file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Warnings, or the fatal error when the file could not be parsed
    pub diagnostics: Vec<Diagnostic>,
    /// Transformed text in `Mode::Stdout`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl FileReport {
    fn new(path: &Path, outcome: Outcome) -> Self {
        Self { path: path.to_path_buf(), outcome, diagnostics: Vec::new(), output: None }
    }

    fn failed(error: FileError) -> Self {
        Self::new(error.path(), Outcome::Failed { error: error.to_string() })
    }
}

/// Totals over a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub skipped: usize,
    pub edits: usize,
    pub warnings: usize,
}

impl Summary {
    pub fn of(reports: &[FileReport]) -> Self {
        let mut summary = Summary { files: reports.len(), ..Summary::default() };
        for report in reports {
            match &report.outcome {
                Outcome::Unchanged => summary.unchanged += 1,
                Outcome::Rewritten { .. } | Outcome::WouldRewrite { .. } => summary.changed += 1,
                Outcome::Printed { edits } if *edits > 0 => summary.changed += 1,
                Outcome::Printed { .. } => summary.unchanged += 1,
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Failed { .. } => summary.failed += 1,
            }
            summary.edits += report.outcome.edits();
            summary.warnings += report
                .diagnostics
                .iter()
                .filter(|d| d.severity == eroteme_compiler::diagnostics::Severity::Warning)
                .count();
        }
        summary
    }
}

/// Exit status for a finished run: 1 if any file failed or was skipped, or
/// (in check mode) would change; 0 otherwise.
pub fn exit_code(reports: &[FileReport], mode: Mode) -> i32 {
    let failed = reports.iter().any(|r| r.outcome.is_failure());
    let would_change = mode == Mode::Check
        && reports.iter().any(|r| matches!(r.outcome, Outcome::WouldRewrite { .. }));
    if failed || would_change {
        1
    } else {
        0
    }
}

/// Run the pipeline for one file.
pub fn process_file(path: &Path, options: &BatchOptions) -> FileReport {
    let filename = path.display().to_string();
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(source) => {
            return FileReport::failed(FileError::Read { path: path.to_path_buf(), source })
        }
    };

    let result = match transform_with_options(&source, &options.transform) {
        Ok(result) => result,
        Err(e) => {
            debug!(file = %filename, error = %e, "transform failed");
            let mut report = FileReport::new(path, Outcome::Failed { error: e.to_string() });
            report.diagnostics.push(format_transform_error(&e, &source, &filename));
            return report;
        }
    };

    let diagnostics: Vec<Diagnostic> = result
        .warnings
        .iter()
        .map(|w| format_warning(w, &source, &filename))
        .collect();
    let edits = result.edits;
    let mut output = None;
    let outcome = match options.mode {
        Mode::Stdout => {
            output = Some(result.output);
            Outcome::Printed { edits }
        }
        _ if !result.changed => Outcome::Unchanged,
        Mode::Check => Outcome::WouldRewrite { edits },
        Mode::Write => match write_atomic(path, &result.output) {
            Ok(()) => Outcome::Rewritten { edits },
            Err(e) => Outcome::Failed { error: e.to_string() },
        },
    };
    debug!(file = %filename, edits, warnings = diagnostics.len(), "file done");
    FileReport { path: path.to_path_buf(), outcome, diagnostics, output }
}

/// Process every walked file on a pool of `options.jobs` workers.
///
/// Walk errors are reported in place as failures. The result has one report
/// per entry of `files`, in the same order.
pub fn run(
    files: Vec<Result<PathBuf, FileError>>,
    options: &BatchOptions,
    stop: &AtomicBool,
) -> Vec<FileReport> {
    let total = files.len();
    let mut slots: Vec<Option<FileReport>> = vec![None; total];
    let mut jobs = Vec::with_capacity(total);
    for (index, file) in files.into_iter().enumerate() {
        match file {
            Ok(path) => jobs.push((index, path)),
            Err(error) => slots[index] = Some(FileReport::failed(error)),
        }
    }

    let workers = match options.jobs {
        0 => num_cpus::get().max(1),
        n => n,
    }
    .min(jobs.len().max(1));
    info!(files = jobs.len(), workers, "starting batch");

    let (job_tx, job_rx) = crossbeam_channel::unbounded::<(usize, PathBuf)>();
    let (done_tx, done_rx) = crossbeam_channel::unbounded::<(usize, FileReport)>();
    for job in jobs {
        // The receiver is alive until the end of this function.
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let done_tx = done_tx.clone();
            scope.spawn(move || {
                for (index, path) in job_rx.iter() {
                    let report = if stop.load(Ordering::Acquire) {
                        FileReport::new(&path, Outcome::Skipped)
                    } else {
                        process_file(&path, options)
                    };
                    if done_tx.send((index, report)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(done_tx);
        for (index, report) in done_rx.iter() {
            slots[index] = Some(report);
        }
    });

    slots.into_iter().flatten().collect()
}
