//! File-backed source surface.

use std::cell::Cell;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::source::SourceSurface;

/// Re-reads a file on every tick.
///
/// Read failures skip the tick. They are logged once per distinct error kind
/// rather than once per frame.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    last_error: Cell<Option<ErrorKind>>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_error: Cell::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceSurface for FileSource {
    fn read(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(text) => {
                if self.last_error.take().is_some() {
                    info!("{} is readable again", self.path.display());
                }
                Some(text)
            }
            Err(error) => {
                if self.last_error.replace(Some(error.kind())) != Some(error.kind()) {
                    warn!("Failed to read {}: {error}", self.path.display());
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_current_contents() {
        let path = std::env::temp_dir().join(format!("livewat-source-{}.wat", std::process::id()));
        let source = FileSource::new(&path);
        assert_eq!(source.read(), None);

        fs::write(&path, "(module)").unwrap();
        assert_eq!(source.read().as_deref(), Some("(module)"));

        fs::write(&path, "(module (func))").unwrap();
        assert_eq!(source.read().as_deref(), Some("(module (func))"));

        fs::remove_file(&path).unwrap();
        assert_eq!(source.read(), None);
    }
}
