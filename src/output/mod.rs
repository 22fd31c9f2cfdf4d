//! Where generated files and table listings end up

mod listing;

pub use listing::{write_table_list, ListFormat, TableListing};

use crate::generator::OutputFile;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;

pub trait Writer {
    /// Persist one file, returning the path it was written to
    fn write(&self, file: &OutputFile) -> io::Result<PathBuf>;
}

/// Writes files below a root directory, creating directories as needed.
/// Existing files are overwritten.
#[derive(Debug, Clone)]
pub struct FileWriter {
    root: PathBuf,
}

impl FileWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Writer for FileWriter {
    fn write(&self, file: &OutputFile) -> io::Result<PathBuf> {
        let path = self.root.join(&file.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&path)?;
        out.write_all(file.content.as_bytes())?;
        out.flush()?;

        debug!(path = %path.display(), bytes = file.content.len(), "wrote file");
        Ok(path)
    }
}
