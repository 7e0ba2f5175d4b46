//! GitHub Actions workflow-command annotations.
//!
//! Lines such as `::warning::Failed to add comment` written to stdout are
//! surfaced in the workflow summary, which lets pipeline authors tell a skip
//! (notice) from a real problem (warning/error) without opening the log.

use std::fmt;
use std::io::{self, Write};

/// Annotation severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationLevel {
    Notice,
    Warning,
    Error,
}

impl fmt::Display for AnnotationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notice => write!(f, "notice"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single annotation line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub level: AnnotationLevel,
    pub message: String,
}

impl Annotation {
    pub fn notice(message: impl Into<String>) -> Self {
        Self {
            level: AnnotationLevel::Notice,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: AnnotationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: AnnotationLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "::{}::{}", self.level, escape_data(&self.message))
    }
}

/// Escape a message for a workflow command (`%`, CR and LF).
#[must_use]
pub fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Write annotations one per line.
pub fn write_annotations<W: Write>(out: &mut W, annotations: &[Annotation]) -> io::Result<()> {
    for annotation in annotations {
        writeln!(out, "{annotation}")?;
    }
    out.flush()
}

/// Write annotations to stdout.
pub fn emit(annotations: &[Annotation]) -> io::Result<()> {
    write_annotations(&mut io::stdout().lock(), annotations)
}
