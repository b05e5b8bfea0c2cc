//! Temporary artifact sinks.

use crate::config::Config;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// An open artifact being written.
pub trait TempHandle: Write + Send {
    /// Returns where the artifact lives.
    fn path(&self) -> &Path;
}

/// Creates and deletes export artifacts.
pub trait TempSink: Send + Sync {
    /// Creates a new, uniquely named artifact with the given extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be created.
    fn open_for_write(&self, extension: &str) -> io::Result<Box<dyn TempHandle>>;

    /// Deletes an artifact. Deleting a missing artifact succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact exists but cannot be removed.
    fn delete(&self, path: &Path) -> io::Result<()>;
}

/// Writes artifacts as `<dir>/<prefix>-<uuid>.<ext>` files.
#[derive(Debug, Clone)]
pub struct FsTempSink {
    dir: PathBuf,
    prefix: String,
}

impl FsTempSink {
    /// Creates a sink writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Creates a sink from the export settings of a [`Config`].
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.export_dir.clone(), config.export_prefix.clone())
    }

    /// Returns the target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TempSink for FsTempSink {
    fn open_for_write(&self, extension: &str) -> io::Result<Box<dyn TempHandle>> {
        fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(format!("{}-{}.{extension}", self.prefix, Uuid::new_v4()));
        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        debug!(path = %path.display(), "export artifact created");
        Ok(Box::new(FsTempHandle {
            path,
            writer: BufWriter::new(file),
        }))
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

struct FsTempHandle {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Write for FsTempHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl TempHandle for FsTempHandle {
    fn path(&self) -> &Path {
        &self.path
    }
}
