use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::str::FromStr;

use crate::config::config::ServerConfig;
use crate::export::HtmlDocument;

/// Report pages served by the attendance server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// Latest 100 tap records, newest first
    Log,
    /// Total IN count per student
    Rekap,
    /// Students whose latest record is an IN
    BelumOut,
}

impl Page {
    pub fn path(self) -> &'static str {
        match self {
            Page::Log => "/log",
            Page::Rekap => "/rekap",
            Page::BelumOut => "/belum-out",
        }
    }

    /// Short name used in default export filenames
    pub fn slug(self) -> &'static str {
        match self {
            Page::Log => "log",
            Page::Rekap => "rekap",
            Page::BelumOut => "belum_out",
        }
    }

    /// Default export filename, e.g. `rekap_20260101_093000.csv`
    pub fn export_filename(self) -> String {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        format!("{}_{}.csv", self.slug(), timestamp)
    }

    pub fn title(self) -> &'static str {
        match self {
            Page::Log => "Attendance log",
            Page::Rekap => "Attendance summary",
            Page::BelumOut => "Not checked out",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Page {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('/').to_ascii_lowercase().as_str() {
            "log" => Ok(Page::Log),
            "rekap" => Ok(Page::Rekap),
            "belum-out" | "belum_out" | "belumout" => Ok(Page::BelumOut),
            other => Err(anyhow!(
                "Unknown page '{}' (expected log, rekap or belum-out)",
                other
            )),
        }
    }
}

/// Blocking client for the attendance server's HTML pages
#[derive(Clone)]
pub struct PageClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl PageClient {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn page_url(&self, page: Page) -> String {
        format!("{}{}", self.base_url, page.path())
    }

    /// Fetch the rendered HTML of a page
    pub fn fetch_html(&self, page: Page) -> Result<String> {
        let url = self.page_url(page);
        tracing::debug!(target: "client", "GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("Could not reach {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{} returned HTTP {}", url, status));
        }

        let body = response
            .text()
            .with_context(|| format!("Could not read response from {}", url))?;
        tracing::debug!(target: "client", "Received {} bytes from {}", body.len(), url);
        Ok(body)
    }

    /// Fetch and parse a page
    pub fn fetch_document(&self, page: Page) -> Result<HtmlDocument> {
        Ok(HtmlDocument::parse(&self.fetch_html(page)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_parsing() {
        assert_eq!("log".parse::<Page>().unwrap(), Page::Log);
        assert_eq!("/rekap".parse::<Page>().unwrap(), Page::Rekap);
        assert_eq!("belum-out".parse::<Page>().unwrap(), Page::BelumOut);
        assert_eq!("BELUM_OUT".parse::<Page>().unwrap(), Page::BelumOut);
        assert!("students".parse::<Page>().is_err());
    }

    #[test]
    fn test_export_filename_shape() {
        let name = Page::Rekap.export_filename();
        assert!(name.starts_with("rekap_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(name.len(), "rekap_20260101_093000.csv".len());
    }

    #[test]
    fn test_page_url_joins_base() {
        let config = ServerConfig {
            base_url: "http://raspberrypi.local:5000/".to_string(),
            timeout_secs: 5,
        };
        let client = PageClient::new(&config).unwrap();
        assert_eq!(
            client.page_url(Page::BelumOut),
            "http://raspberrypi.local:5000/belum-out"
        );
    }
}
