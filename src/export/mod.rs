//! Table to CSV export
//!
//! Reads every row of every table in a document, turns the rendered cell
//! text into CSV and hands the result to a [`DownloadSink`]. The document is
//! anything implementing [`TableSource`]: parsed server HTML on the native
//! side, the live DOM in the browser.

mod csv_text;
mod download;
pub mod html;

pub use csv_text::{rows_to_csv, QuoteStyle};
pub use download::{CsvDownload, DownloadSink, MemorySink, CSV_MIME};
#[cfg(not(target_arch = "wasm32"))]
pub use download::DirectorySink;
pub use html::HtmlDocument;

use anyhow::Result;

/// Rendered cell text, row by row, in document order
pub type TableRows = Vec<Vec<String>>;

/// A document whose tables can be read
pub trait TableSource {
    /// Every `tr` inside a `table`, each as its `td`/`th` cell texts
    fn table_rows(&self) -> Result<TableRows>;
}

/// Rows that were already extracted, e.g. the last fetch of a watched page
impl TableSource for TableRows {
    fn table_rows(&self) -> Result<TableRows> {
        Ok(self.clone())
    }
}

/// Handles exporting document tables to CSV downloads
#[derive(Debug, Clone, Copy, Default)]
pub struct TableCsvExporter {
    style: QuoteStyle,
}

impl TableCsvExporter {
    pub fn new(style: QuoteStyle) -> Self {
        Self { style }
    }

    /// Build the CSV text for every table in `source`
    pub fn to_csv(&self, source: &dyn TableSource) -> Result<String> {
        let rows = source.table_rows()?;
        tracing::debug!(target: "export", "Serializing {} table rows", rows.len());
        rows_to_csv(&rows, self.style)
    }

    /// Export every table in `source` as a download named `filename`
    pub fn export(
        &self,
        source: &dyn TableSource,
        filename: &str,
        sink: &mut dyn DownloadSink,
    ) -> Result<()> {
        let csv = self.to_csv(source)?;
        download_csv(&csv, filename, sink)
    }
}

/// Export every table in `source` with the dashboard's quoting
pub fn export_table_to_csv(
    source: &dyn TableSource,
    filename: &str,
    sink: &mut dyn DownloadSink,
) -> Result<()> {
    TableCsvExporter::default().export(source, filename, sink)
}

/// Deliver already-built CSV text as a `text/csv` file named `filename`
pub fn download_csv(csv: &str, filename: &str, sink: &mut dyn DownloadSink) -> Result<()> {
    tracing::info!(target: "export", "Downloading {} ({} bytes)", filename, csv.len());
    sink.deliver(CsvDownload::new(csv, filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_delivers_named_csv() {
        let source: TableRows = vec![
            vec!["Name".to_string(), "Score".to_string()],
            vec!["Ann".to_string(), "10".to_string()],
        ];
        let mut sink = MemorySink::default();
        export_table_to_csv(&source, "scores.csv", &mut sink).unwrap();

        assert_eq!(sink.downloads.len(), 1);
        let download = &sink.downloads[0];
        assert_eq!(download.filename, "scores.csv");
        assert_eq!(download.mime_type(), "text/csv");
        assert_eq!(download.content, "\"Name\",\"Score\"\n\"Ann\",\"10\"");
    }

    #[test]
    fn test_no_tables_gives_empty_download() {
        let mut sink = MemorySink::default();
        export_table_to_csv(&TableRows::new(), "empty.csv", &mut sink).unwrap();
        assert!(sink.downloads[0].is_empty());
    }

    #[test]
    fn test_download_csv_passes_text_through() {
        let mut sink = MemorySink::default();
        download_csv("a,b\n1,2", "raw.csv", &mut sink).unwrap();
        assert_eq!(sink.downloads[0], CsvDownload::new("a,b\n1,2", "raw.csv"));
    }
}
