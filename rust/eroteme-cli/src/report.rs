//! Rendering of batch results, for people or as JSON lines.
//!
//! Transformed text (stdout mode) goes to `out`; statuses and diagnostics go
//! to `err` so piped output stays clean. In write and check mode statuses go
//! to `out`.

use crate::batch::{FileReport, Mode, Outcome, Summary};
use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};

/// ANSI styles of human output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Green,
    Yellow,
    Red,
    Gray,
    Bold,
}

impl Style {
    fn code(self) -> &'static str {
        match self {
            Style::Green => "32",
            Style::Yellow => "33",
            Style::Red => "31",
            Style::Gray => "90",
            Style::Bold => "1",
        }
    }

    pub fn paint(self, s: &str) -> String {
        format!("\x1b[{}m{}\x1b[0m", self.code(), s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MessageFormat {
    #[default]
    Human,
    Json,
}

pub struct Reporter {
    pub format: MessageFormat,
    pub mode: Mode,
    /// Emit ANSI colors in human output
    pub color: bool,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: &'a Summary,
}

impl Reporter {
    pub fn render(
        &self,
        reports: &[FileReport],
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> io::Result<()> {
        match self.format {
            MessageFormat::Human => self.render_human(reports, out, err),
            MessageFormat::Json => self.render_json(reports, out),
        }
    }

    fn paint(&self, style: Style, s: &str) -> String {
        if self.color {
            style.paint(s)
        } else {
            s.to_string()
        }
    }

    /// Right-aligned status word, bold in `style` when colored.
    fn label(&self, label: &str, style: Style) -> String {
        if self.color {
            format!("\x1b[1;{}m{:>12}\x1b[0m", style.code(), label)
        } else {
            format!("{:>12}", label)
        }
    }

    fn status(&self, report: &FileReport) -> Option<String> {
        let path = report.path.display().to_string();
        let edits = |n: usize| {
            let plural = if n == 1 { "" } else { "s" };
            self.paint(Style::Gray, &format!("({} edit{})", n, plural))
        };
        let line = match &report.outcome {
            Outcome::Unchanged | Outcome::Printed { .. } => return None,
            Outcome::Rewritten { edits: n } => {
                format!("{} {} {}", self.label("Rewrote", Style::Green), path, edits(*n))
            }
            Outcome::WouldRewrite { edits: n } => {
                format!("{} {} {}", self.label("Would rewrite", Style::Yellow), path, edits(*n))
            }
            Outcome::Skipped => format!("{} {}", self.label("Skipped", Style::Gray), path),
            Outcome::Failed { error } => format!("{} {}", self.paint(Style::Red, "error:"), error),
        };
        Some(line)
    }

    fn render_human(
        &self,
        reports: &[FileReport],
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> io::Result<()> {
        for report in reports {
            if let Some(text) = &report.output {
                out.write_all(text.as_bytes())?;
            }
            // Parse failures carry their own error diagnostic.
            let has_error_diag =
                !report.diagnostics.is_empty() && matches!(report.outcome, Outcome::Failed { .. });
            if !has_error_diag {
                if let Some(line) = self.status(report) {
                    match (self.mode, &report.outcome) {
                        (Mode::Stdout, _) | (_, Outcome::Failed { .. }) => {
                            writeln!(err, "{}", line)?
                        }
                        _ => writeln!(out, "{}", line)?,
                    }
                }
            }
            for diagnostic in &report.diagnostics {
                let rendered =
                    if self.color { diagnostic.render_ansi() } else { diagnostic.render_plain() };
                write!(err, "{}", rendered)?;
            }
        }

        let summary = Summary::of(reports);
        let verb = if self.mode == Mode::Check { "would change" } else { "changed" };
        let plural = if summary.files == 1 { "" } else { "s" };
        let mut line = format!("{} file{}, {} {}", summary.files, plural, summary.changed, verb);
        if summary.warnings > 0 {
            let warnings = format!("{} warning(s)", summary.warnings);
            line.push_str(&format!(", {}", self.paint(Style::Yellow, &warnings)));
        }
        if summary.failed > 0 {
            let failed = format!("{} failed", summary.failed);
            line.push_str(&format!(", {}", self.paint(Style::Red, &failed)));
        }
        if summary.skipped > 0 {
            line.push_str(&format!(", {} skipped", summary.skipped));
        }
        writeln!(err, "{}", self.paint(Style::Bold, &line))
    }

    fn render_json(&self, reports: &[FileReport], out: &mut dyn Write) -> io::Result<()> {
        for report in reports {
            writeln!(out, "{}", serde_json::to_string(report).map_err(io::Error::other)?)?;
        }
        let summary = SummaryLine { summary: &Summary::of(reports) };
        writeln!(out, "{}", serde_json::to_string(&summary).map_err(io::Error::other)?)
    }
}
