use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::fmt::MakeWriter;

use super::app_paths::AppPaths;

/// Global log file, set once by [`init_tracing`]
static LOG_FILE: OnceLock<LogFile> = OnceLock::new();

/// Log directory, falling back to the temp dir when the data dir is unusable
fn get_log_dir() -> PathBuf {
    AppPaths::log_dir().unwrap_or_else(|_| std::env::temp_dir().join("absensi-web"))
}

/// Timestamped log file shared by every tracing writer
#[derive(Clone)]
pub struct LogFile {
    file: Arc<Mutex<Option<File>>>,
    path: PathBuf,
}

impl LogFile {
    pub fn create_in(log_dir: &Path) -> Self {
        let _ = std::fs::create_dir_all(log_dir);

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = log_dir.join(format!("absensi-web_{}.log", timestamp));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok();

        #[cfg(unix)]
        {
            let latest = log_dir.join("latest.log");
            let _ = std::fs::remove_file(&latest);
            let _ = std::os::unix::fs::symlink(&path, &latest);
        }

        Self {
            file: Arc::new(Mutex::new(file)),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                file.write_all(buf)?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                file.flush()?;
            }
        }
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Initialize tracing into a per-run log file
///
/// `RUST_LOG` wins over the default filter, which is `info` or `debug` with
/// `verbose`. Returns the log file path.
pub fn init_tracing(verbose: bool) -> PathBuf {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let log_file = LOG_FILE
        .get_or_init(|| LogFile::create_in(&get_log_dir()))
        .clone();
    let path = log_file.path().to_path_buf();

    let fmt_layer = fmt::layer()
        .with_writer(log_file)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .compact();

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();

    tracing::info!(target: "absensi_web", "Logging initialized at {}", path.display());
    path
}

/// Path of the active log file, if logging was initialized
pub fn log_path() -> Option<PathBuf> {
    LOG_FILE.get().map(|log| log.path().to_path_buf())
}
