//! Rolling Logger
//!
//! File logger with size-based rotation and an in-memory circular buffer of
//! the most recent lines. `init_logger` installs a `tracing-subscriber` fmt
//! subscriber, which also picks up records emitted through the `log` facade.

use std::collections::VecDeque;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;

/// Rotate the log file once it grows past this many bytes
pub const DEFAULT_MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;

/// Number of recent lines kept in memory
pub const DEFAULT_BUFFER_LINES: usize = 500;

static LOGGER: OnceLock<RollingWriter> = OnceLock::new();

struct Sink {
    path: PathBuf,
    rotated_path: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
    lines: VecDeque<String>,
    capacity: usize,
    partial: String,
}

impl Sink {
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        fs::rename(&self.path, &self.rotated_path)?;
        self.file = open_append(&self.path)?;
        self.written = 0;
        Ok(())
    }

    fn remember(&mut self, buf: &[u8]) {
        self.partial.push_str(&String::from_utf8_lossy(buf));
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']).to_string();
            if self.lines.len() == self.capacity {
                self.lines.pop_front();
            }
            self.lines.push_back(line);
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Writer shared between the subscriber and the in-memory buffer
#[derive(Clone)]
pub struct RollingWriter {
    sink: Arc<Mutex<Sink>>,
}

impl RollingWriter {
    /// Open (or create) `<log_dir>/<app_name>.log`
    pub fn new(
        log_dir: &Path,
        app_name: &str,
        max_bytes: u64,
        capacity: usize,
    ) -> io::Result<Self> {
        fs::create_dir_all(log_dir)?;
        let path = log_dir.join(format!("{}.log", app_name));
        let rotated_path = log_dir.join(format!("{}.log.1", app_name));
        let file = open_append(&path)?;
        let written = file.metadata()?.len();

        Ok(Self {
            sink: Arc::new(Mutex::new(Sink {
                path,
                rotated_path,
                file,
                written,
                max_bytes,
                lines: VecDeque::with_capacity(capacity),
                capacity: capacity.max(1),
                partial: String::new(),
            })),
        })
    }

    fn sink(&self) -> MutexGuard<'_, Sink> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Path of the active log file
    pub fn path(&self) -> PathBuf {
        self.sink().path.clone()
    }

    /// The last `n` complete lines, oldest first
    pub fn recent_lines(&self, n: usize) -> Vec<String> {
        let sink = self.sink();
        let skip = sink.lines.len().saturating_sub(n);
        sink.lines.iter().skip(skip).cloned().collect()
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut sink = self.sink();
        if sink.written > 0 && sink.written + buf.len() as u64 > sink.max_bytes {
            sink.rotate()?;
        }
        sink.file.write_all(buf)?;
        sink.written += buf.len() as u64;
        sink.remember(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink().file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Install the global logger writing under `log_dir`.
///
/// Calling it again after a successful init is a no-op.
pub fn init_logger(log_dir: PathBuf, app_name: &str) -> Result<(), String> {
    if LOGGER.get().is_some() {
        return Ok(());
    }

    let writer = RollingWriter::new(
        &log_dir,
        app_name,
        DEFAULT_MAX_FILE_BYTES,
        DEFAULT_BUFFER_LINES,
    )
    .map_err(|e| format!("Failed to open log file in {}: {}", log_dir.display(), e))?;

    tracing_subscriber::fmt()
        .with_writer(writer.clone())
        .with_timer(LocalTime)
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish()
        .try_init()
        .map_err(|e| format!("Failed to install subscriber: {}", e))?;

    let _ = LOGGER.set(writer);
    log::info!("{} logging to {}", app_name, log_dir.display());
    Ok(())
}

fn ensure_initialized() -> Result<(), String> {
    LOGGER
        .get()
        .map(|_| ())
        .ok_or_else(|| "Logger not initialized".to_string())
}

/// Log an error line
pub fn error(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::error!("{}", msg);
    Ok(())
}

/// The last `n` lines written by the global logger
pub fn recent(n: usize) -> Vec<String> {
    LOGGER.get().map(|w| w.recent_lines(n)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_keeps_last_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RollingWriter::new(dir.path(), "test", DEFAULT_MAX_FILE_BYTES, 3).unwrap();

        for i in 0..5 {
            writeln!(writer, "line {}", i).unwrap();
        }

        assert_eq!(writer.recent_lines(10), vec!["line 2", "line 3", "line 4"]);
        assert_eq!(writer.recent_lines(1), vec!["line 4"]);
    }

    #[test]
    fn test_partial_lines_wait_for_newline() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer =
            RollingWriter::new(dir.path(), "test", DEFAULT_MAX_FILE_BYTES, 10).unwrap();

        writer.write_all(b"hel").unwrap();
        assert!(writer.recent_lines(10).is_empty());
        writer.write_all(b"lo\n").unwrap();
        assert_eq!(writer.recent_lines(10), vec!["hello"]);
    }

    #[test]
    fn test_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RollingWriter::new(dir.path(), "app", 16, 10).unwrap();

        writer.write_all(b"0123456789\n").unwrap();
        writer.write_all(b"abcdefghij\n").unwrap();
        writer.flush().unwrap();

        let rotated = fs::read_to_string(dir.path().join("app.log.1")).unwrap();
        let current = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert_eq!(rotated, "0123456789\n");
        assert_eq!(current, "abcdefghij\n");
        assert_eq!(writer.path(), dir.path().join("app.log"));
    }

    #[test]
    fn test_helpers_require_init() {
        if LOGGER.get().is_none() {
            assert!(error("not yet").is_err());
            assert!(recent(5).is_empty());
        }
    }
}
