use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use std::fs;
use std::path::{Path, PathBuf};

use absensi_web::client::{Page, PageClient};
use absensi_web::config::Config;
use absensi_web::export::{DirectorySink, HtmlDocument, QuoteStyle, TableCsvExporter, TableSource};

use crate::watch::{run_watch, WatchOptions};

#[derive(Debug, Parser)]
#[command(
    name = "absensi-web",
    version,
    about = "Export and watch the attendance dashboard from the terminal"
)]
pub struct Cli {
    /// Attendance server base URL (overrides config and ABSENSI_URL)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Export every table on a report page to a CSV file
    Export {
        /// Report page: log, rekap or belum-out
        #[arg(default_value = "log")]
        page: Page,

        /// Read a saved HTML page instead of fetching from the server
        #[arg(long)]
        file: Option<PathBuf>,

        /// Output filename (default: <page>_<timestamp>.csv)
        #[arg(short, long)]
        output: Option<String>,

        /// Directory to write into (overrides config)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Double quotes inside cells instead of copying them verbatim
        #[arg(long)]
        escaped: bool,
    },

    /// Show a report page and keep it refreshed while live
    Watch {
        /// Report page: log, rekap or belum-out
        #[arg(default_value = "log")]
        page: Page,

        /// Start with live refresh switched off
        #[arg(long)]
        paused: bool,

        /// Refresh period in milliseconds (overrides config)
        #[arg(long)]
        period_ms: Option<u64>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Write a commented default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
}

/// Effective configuration: file, then environment, then `--url`
fn load_config(path: &Path, url: Option<String>) -> Result<Config> {
    let mut config = Config::load_or_default(path)?;
    if let Some(url) = url {
        config.server.base_url = url;
    }
    Ok(config)
}

pub fn run(cli: Cli) -> Result<()> {
    let config_path = Config::get_config_path()?;

    match cli.command {
        // Only `config show` reads the file, so a broken one can be replaced
        Commands::Config { action } => run_config(&config_path, cli.url, action),
        Commands::Export {
            page,
            file,
            output,
            dir,
            escaped,
        } => {
            let config = load_config(&config_path, cli.url)?;
            let style = if escaped {
                QuoteStyle::Escaped
            } else {
                config.export.quote_style
            };
            let dir = dir
                .or_else(|| config.export.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            run_export(&config, page, file.as_deref(), output, dir, style)
        }
        Commands::Watch {
            page,
            paused,
            period_ms,
        } => {
            let config = load_config(&config_path, cli.url)?;
            let client = PageClient::new(&config.server)?;
            let period = match period_ms {
                Some(ms) => std::time::Duration::from_millis(ms.max(100)),
                None => config.refresh.period(),
            };
            let options = WatchOptions {
                page,
                period,
                start_live: config.refresh.start_live && !paused,
                exporter: TableCsvExporter::new(config.export.quote_style),
                output_dir: config
                    .export
                    .output_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(".")),
            };
            run_watch(&client, options)
        }
    }
}

fn run_export(
    config: &Config,
    page: Page,
    file: Option<&Path>,
    output: Option<String>,
    dir: PathBuf,
    style: QuoteStyle,
) -> Result<()> {
    let (html, default_name) = match file {
        Some(path) => {
            let html = fs::read_to_string(path)
                .with_context(|| format!("Could not read {}", path.display()))?;
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "table".to_string());
            (html, format!("{}.csv", stem))
        }
        None => {
            let client = PageClient::new(&config.server)?;
            println!(
                "{}",
                format!("Fetching {}", client.page_url(page)).cyan()
            );
            (client.fetch_html(page)?, page.export_filename())
        }
    };

    let filename = output.unwrap_or(default_name);
    let rows = HtmlDocument::parse(&html).table_rows()?;
    if rows.is_empty() {
        println!("{}", "No table rows found; writing an empty file.".yellow());
    }

    let mut sink = DirectorySink::new(dir);
    TableCsvExporter::new(style).export(&rows, &filename, &mut sink)?;

    let written = sink
        .last_written()
        .ok_or_else(|| anyhow!("Export produced no file"))?;
    println!(
        "{}",
        format!("✓ Exported {} rows to {}", rows.len(), written.display()).green()
    );
    Ok(())
}

fn run_config(path: &Path, url: Option<String>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                return Err(anyhow!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                ));
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, Config::create_default_with_comments())?;
            println!("Configuration file created at: {}", path.display());
        }
        ConfigAction::Show => {
            let config = load_config(path, url)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }
    Ok(())
}
