//! Logging setup
//!
//! Builds the `tracing` subscriber used by the binary (JSON to stdout, plus
//! an optional size-rotated log file) and provides the rolling writer that
//! backs the file layer.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Default maximum log file size (10MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default number of rotated files kept next to the active one
pub const DEFAULT_MAX_FILES: usize = 5;

/// Install the global subscriber
///
/// `RUST_LOG` wins over `log_level` when set.
pub fn init_tracing(log_level: &str, log_file: Option<&Path>) -> io::Result<()> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let console_layer = fmt::layer().json().with_filter(filter());
    let registry = tracing_subscriber::registry().with(console_layer);

    match log_file {
        Some(path) => {
            let writer = RollingFileWriter::with_defaults(path)?;
            let file_layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            registry.with(file_layer).init();
            tracing::info!(path = %path.display(), "File logging enabled");
        }
        None => registry.init(),
    }

    Ok(())
}

/// A log file writer that rotates by size
///
/// The active file is `<path>`; rotated files are `<path>.1` (newest)
/// through `<path>.<max_files>` (oldest).
#[derive(Debug, Clone)]
pub struct RollingFileWriter {
    inner: Arc<Mutex<RollingState>>,
}

#[derive(Debug)]
struct RollingState {
    base_path: PathBuf,
    file: File,
    written: u64,
    max_size: u64,
    max_files: usize,
}

impl RollingFileWriter {
    /// Open (or create) `path` for appending
    pub fn new(path: impl AsRef<Path>, max_size: u64, max_files: usize) -> io::Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        if let Some(parent) = base_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let written = fs::metadata(&base_path).map(|m| m.len()).unwrap_or(0);
        let file = open_append(&base_path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(RollingState {
                base_path,
                file,
                written,
                max_size,
                max_files: max_files.max(1),
            })),
        })
    }

    /// 10MB per file, five rotated files
    pub fn with_defaults(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(path, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_FILES)
    }

    fn state(&self) -> MutexGuard<'_, RollingState> {
        // A panic mid-write leaves the state usable; keep logging.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl RollingState {
    fn rotated_path(&self, index: usize) -> PathBuf {
        let mut name = self.base_path.as_os_str().to_owned();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        let oldest = self.rotated_path(self.max_files);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.max_files).rev() {
            let from = self.rotated_path(index);
            if from.exists() {
                fs::rename(&from, self.rotated_path(index + 1))?;
            }
        }
        fs::rename(&self.base_path, self.rotated_path(1))?;

        self.file = open_append(&self.base_path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state();
        if state.written > 0 && state.written + buf.len() as u64 > state.max_size {
            state.rotate()?;
        }
        let n = state.file.write(buf)?;
        state.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.state().file.flush()
    }
}

impl<'a> fmt::MakeWriter<'a> for RollingFileWriter {
    type Writer = RollingFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_writer_creates_file_and_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("rotator.log");

        let mut writer = RollingFileWriter::with_defaults(&path).unwrap();
        writer.write_all(b"{\"msg\":\"Using API key\"}\n").unwrap();
        writer.flush().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("Using API key"));
    }

    #[test]
    fn test_rotation_keeps_bounded_history() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rotator.log");

        let mut writer = RollingFileWriter::new(&path, 64, 2).unwrap();
        for i in 0..20 {
            let line = format!("line {:02}: API key failed, trying next\n", i);
            writer.write_all(line.as_bytes()).unwrap();
        }
        writer.flush().unwrap();

        assert!(path.exists());
        assert!(dir.path().join("rotator.log.1").exists());
        assert!(dir.path().join("rotator.log.2").exists());
        assert!(!dir.path().join("rotator.log.3").exists());

        // Newest line lives in the active file
        let active = fs::read_to_string(&path).unwrap();
        assert!(active.contains("line 19"));
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rotator.log");
        fs::write(&path, "existing\n").unwrap();

        let mut writer = RollingFileWriter::with_defaults(&path).unwrap();
        writer.write_all(b"appended\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "existing\nappended\n");
    }
}
