#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(unused_must_use)]

//! Let Diagnostics
//!
//! Thin wrappers over `codespan` and `codespan-reporting` so that the outline
//! reader, the resolver and the CLI all produce diagnostics the same way.
//!
//! - Builders for errors/warnings with a primary label
//! - Help notes with a consistent `help:` prefix
//! - A terminal `Reporter` that also counts what it printed

use colored::Colorize;

pub use codespan::{FileId, Files, Span};
pub use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
pub use codespan_reporting::term;
pub use codespan_reporting::term::termcolor;

pub type Diag = Diagnostic<FileId>;
pub type Lbl = Label<FileId>;

pub mod prelude {
    pub use super::{
        Diag, FileId, Files, Lbl, Reporter, Severity, Span, Tally, error, error_with, help,
        label_primary, label_secondary, warning,
    };
}

// -------------------------------------------------------------------------------------------------
// Builders
// -------------------------------------------------------------------------------------------------

/// Error diagnostic with a single primary label at `span`.
pub fn error(message: impl Into<String>, file_id: FileId, span: Span) -> Diag {
    Diagnostic::error()
        .with_message(message)
        .with_labels(vec![Label::primary(file_id, span)])
}

/// Error diagnostic with a code and a single primary label.
///
/// Example:
/// let d = error_with("E0102", "Module `Iterables::Lists` not found", file, span);
pub fn error_with(
    code: impl Into<String>,
    message: impl Into<String>,
    file_id: FileId,
    span: Span,
) -> Diag {
    Diagnostic::error()
        .with_code(code)
        .with_message(message)
        .with_labels(vec![Label::primary(file_id, span)])
}

pub fn warning(message: impl Into<String>, file_id: FileId, span: Span) -> Diag {
    Diagnostic::warning()
        .with_message(message)
        .with_labels(vec![Label::primary(file_id, span)])
}

pub fn label_primary(file_id: FileId, span: Span, message: impl Into<String>) -> Lbl {
    Label::primary(file_id, span).with_message(message)
}

pub fn label_secondary(file_id: FileId, span: Span, message: impl Into<String>) -> Lbl {
    Label::secondary(file_id, span).with_message(message)
}

/// Prefix a note with `help:` unless it already has one.
pub fn help(msg: impl Into<String>) -> String {
    let m: String = msg.into();
    if m.starts_with("help:") {
        m
    } else {
        format!("help: {}", m)
    }
}

pub fn is_error(diag: &Diag) -> bool {
    matches!(diag.severity, Severity::Error | Severity::Bug)
}

// -------------------------------------------------------------------------------------------------
// Reporter
// -------------------------------------------------------------------------------------------------

/// Counts of emitted diagnostics by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub errors: usize,
    pub warnings: usize,
}

impl Tally {
    pub fn record(&mut self, diag: &Diag) {
        match diag.severity {
            Severity::Error | Severity::Bug => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Note | Severity::Help => {}
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// One-line summary, e.g. `2 errors, 1 warning`.
    pub fn summary(&self) -> String {
        fn plural(n: usize, word: &str) -> String {
            if n == 1 {
                format!("{} {}", n, word)
            } else {
                format!("{} {}s", n, word)
            }
        }
        format!(
            "{}, {}",
            plural(self.errors, "error"),
            plural(self.warnings, "warning")
        )
    }
}

/// Terminal reporter for diagnostics.
///
/// Wraps `codespan-reporting::term::emit` with a stderr stream and keeps a
/// running [`Tally`] of everything emitted.
pub struct Reporter {
    writer: termcolor::StandardStream,
    config: term::Config,
    tally: Tally,
}

impl Reporter {
    pub fn new(color: termcolor::ColorChoice) -> Self {
        Self {
            writer: termcolor::StandardStream::stderr(color),
            config: term::Config::default(),
            tally: Tally::default(),
        }
    }

    pub fn emit(
        &mut self,
        files: &Files<String>,
        diag: &Diag,
    ) -> Result<(), codespan_reporting::files::Error> {
        self.tally.record(diag);
        term::emit(&mut self.writer.lock(), &self.config, files, diag)
    }

    pub fn emit_all<'a, I>(
        &mut self,
        files: &Files<String>,
        diagnostics: I,
    ) -> Result<(), codespan_reporting::files::Error>
    where
        I: IntoIterator<Item = &'a Diag>,
    {
        let mut lock = self.writer.lock();
        for d in diagnostics {
            self.tally.record(d);
            term::emit(&mut lock, &self.config, files, d)?;
        }
        Ok(())
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// Print the colored summary line for everything emitted so far.
    pub fn print_summary(&self, subject: &str) {
        let tally = self.tally;
        if tally.has_errors() {
            eprintln!("{} {}: {}", "error:".red().bold(), subject, tally.summary());
        } else if tally.warnings > 0 {
            eprintln!("{} {}: {}", "warning:".yellow().bold(), subject, tally.summary());
        } else {
            eprintln!("{} {}", "ok:".green().bold(), subject);
        }
    }
}

/// Render diagnostics to a plain string (no color), mainly for tests and logs.
pub fn render_plain<'a, I>(
    files: &Files<String>,
    diagnostics: I,
) -> Result<String, codespan_reporting::files::Error>
where
    I: IntoIterator<Item = &'a Diag>,
{
    let mut buffer = termcolor::Buffer::no_color();
    let config = term::Config::default();
    for d in diagnostics {
        term::emit(&mut buffer, &config, files, d)?;
    }
    Ok(String::from_utf8_lossy(buffer.as_slice()).into_owned())
}
