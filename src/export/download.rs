use anyhow::Result;

/// MIME type of every download the exporter produces
pub const CSV_MIME: &str = "text/csv";

/// A CSV file ready to hand to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDownload {
    pub filename: String,
    pub content: String,
}

impl CsvDownload {
    pub fn new(content: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        CSV_MIME
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Where a finished CSV file is delivered
///
/// In the browser this is the native save-file flow; in the terminal it is a
/// directory on disk.
pub trait DownloadSink {
    fn deliver(&mut self, download: CsvDownload) -> Result<()>;
}

/// Sink that keeps every download in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub downloads: Vec<CsvDownload>,
}

impl DownloadSink for MemorySink {
    fn deliver(&mut self, download: CsvDownload) -> Result<()> {
        self.downloads.push(download);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use self::native::DirectorySink;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use super::{CsvDownload, DownloadSink};
    use anyhow::{Context, Result};
    use std::fs;
    use std::path::{Path, PathBuf};

    /// Writes each download as a file inside a directory
    ///
    /// The filename is taken as given; keeping it inside the directory is up
    /// to the caller.
    #[derive(Debug, Clone)]
    pub struct DirectorySink {
        dir: PathBuf,
        last_written: Option<PathBuf>,
    }

    impl DirectorySink {
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            Self {
                dir: dir.into(),
                last_written: None,
            }
        }

        /// Path of the most recently written file
        pub fn last_written(&self) -> Option<&Path> {
            self.last_written.as_deref()
        }
    }

    impl DownloadSink for DirectorySink {
        fn deliver(&mut self, download: CsvDownload) -> Result<()> {
            fs::create_dir_all(&self.dir)
                .with_context(|| format!("Could not create {}", self.dir.display()))?;
            let path = self.dir.join(&download.filename);
            fs::write(&path, download.content.as_bytes())
                .with_context(|| format!("Could not write {}", path.display()))?;
            tracing::info!(
                target: "export",
                "Wrote {} bytes of {} to {}",
                download.len(),
                download.mime_type(),
                path.display()
            );
            self.last_written = Some(path);
            Ok(())
        }
    }
}
