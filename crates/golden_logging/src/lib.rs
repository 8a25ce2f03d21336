//! Logging setup for the golden image tools.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "golden=info,golden_core=info";
const VERBOSE_CONSOLE_FILTER: &str = "golden=debug,golden_core=debug";
const MAX_LOG_FILES: usize = 5;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging configuration for a golden binary.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Mirror debug output on stderr
    pub verbose: bool,
    /// Only errors on stderr (machine-readable output on stdout)
    pub quiet: bool,
}

/// Initialize tracing with a rolling file writer and stderr output.
///
/// The file always receives `RUST_LOG` (or the default filter). Stderr gets
/// warnings by default so progress bars stay readable.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = ensure_logs_dir().context("Failed to ensure log directory")?;
    let file_writer = RotatingLog::open(log_dir, config.app_name, MAX_LOG_FILES, MAX_LOG_FILE_SIZE)
        .with_context(|| format!("Failed to open log file for {}", config.app_name))?;

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_filter = if config.quiet {
        EnvFilter::new("error")
    } else if config.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(VERBOSE_CONSOLE_FILTER))
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file_writer))
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

/// Get the golden home directory: ~/.golden_image, or `GOLDEN_HOME`
pub fn golden_home() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var("GOLDEN_HOME") {
        return Ok(PathBuf::from(override_path));
    }
    dirs::home_dir()
        .map(|home| home.join(".golden_image"))
        .context("Could not determine home directory (set GOLDEN_HOME)")
}

/// Get the logs directory: ~/.golden_image/logs
pub fn logs_dir() -> Result<PathBuf> {
    Ok(golden_home()?.join("logs"))
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir()?;
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

/// Size-capped log file: `<app>.log` plus `<app>.log.1` up to
/// `<app>.log.<keep - 1>`, newest first
struct RotatingLog {
    dir: PathBuf,
    app: String,
    keep: usize,
    limit: u64,
    file: File,
    written: u64,
}

impl RotatingLog {
    fn open(dir: PathBuf, app: &str, keep: usize, limit: u64) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        let file = open_append(&dir.join(format!("{app}.log")))?;
        let written = file.metadata()?.len();
        Ok(Self {
            dir,
            app: app.to_string(),
            keep: keep.max(2),
            limit,
            file,
            written,
        })
    }

    fn path(&self, generation: usize) -> PathBuf {
        match generation {
            0 => self.dir.join(format!("{}.log", self.app)),
            n => self.dir.join(format!("{}.log.{}", self.app, n)),
        }
    }

    /// Shift every generation up by one; the oldest is overwritten
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        for generation in (0..self.keep - 1).rev() {
            let from = self.path(generation);
            if from.exists() {
                fs::rename(&from, self.path(generation + 1))?;
            }
        }
        self.file = open_append(&self.path(0))?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // A single oversized record still goes into a fresh file
        if self.written > 0 && self.written + buf.len() as u64 > self.limit {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_keeps_bounded_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RotatingLog::open(dir.path().to_path_buf(), "golden", 3, 16).unwrap();

        for _ in 0..10 {
            log.write_all(b"0123456789").unwrap();
        }
        log.flush().unwrap();

        assert!(dir.path().join("golden.log").exists());
        assert!(dir.path().join("golden.log.1").exists());
        assert!(dir.path().join("golden.log.2").exists());
        assert!(!dir.path().join("golden.log.3").exists());

        let current = fs::metadata(dir.path().join("golden.log")).unwrap().len();
        assert!(current <= 16);
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut log = RotatingLog::open(dir.path().to_path_buf(), "app", 2, 1024).unwrap();
            log.write_all(b"first\n").unwrap();
        }
        let mut log = RotatingLog::open(dir.path().to_path_buf(), "app", 2, 1024).unwrap();
        log.write_all(b"second\n").unwrap();
        log.flush().unwrap();

        let content = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_oversized_write_lands_in_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RotatingLog::open(dir.path().to_path_buf(), "app", 2, 4).unwrap();

        log.write_all(b"ab").unwrap();
        log.write_all(b"0123456789").unwrap();
        log.flush().unwrap();

        assert_eq!(fs::read(dir.path().join("app.log.1")).unwrap(), b"ab");
        assert_eq!(fs::read(dir.path().join("app.log")).unwrap(), b"0123456789");
    }
}
