//! Diagnostics produced by the assembler and the sandboxes.

use std::fmt;

use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};

/// Position of a diagnostic inside the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Byte offset into the source text
    pub offset: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column, counted in chars
    pub column: usize,
}

impl Location {
    /// Resolve a byte offset against `source`.
    pub fn resolve(source: &str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &source[..offset];
        let line_start = before.rfind('\n').map_or(0, |index| index + 1);
        Self {
            offset,
            line: before.matches('\n').count() + 1,
            column: before[line_start..].chars().count() + 1,
        }
    }
}

/// A human-readable failure description, optionally pointing into the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    message: String,
    location: Option<Location>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    /// Diagnostic anchored at `offset` bytes into `source`.
    pub fn at(message: impl Into<String>, source: &str, offset: usize) -> Self {
        Self {
            message: message.into(),
            location: Some(Location::resolve(source, offset)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }

    /// Render an annotated source report.
    ///
    /// Falls back to the plain message when the diagnostic has no location
    /// or the location does not fit `source`.
    pub fn render(&self, filename: &str, source: &str) -> String {
        let Some(location) = self.location else {
            return self.to_string();
        };
        if location.offset > source.len() || !source.is_char_boundary(location.offset) {
            return self.to_string();
        }
        let width = source[location.offset..]
            .chars()
            .next()
            .map_or(0, char::len_utf8);
        let span = location.offset..location.offset + width;

        let mut report_bytes = Vec::new();
        let written = Report::build(ReportKind::Error, (filename, span.clone()))
            .with_config(
                Config::default()
                    .with_color(false)
                    .with_index_type(IndexType::Byte),
            )
            .with_message(&self.message)
            .with_label(Label::new((filename, span)).with_message(&self.message))
            .finish()
            .write((filename, Source::from(source)), &mut report_bytes);
        match written {
            Ok(()) => String::from_utf8_lossy(&report_bytes).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(
                f,
                "{} (at {}:{})",
                self.message, location.line, location.column
            ),
            None => f.write_str(&self.message),
        }
    }
}

impl From<String> for Diagnostic {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for Diagnostic {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
