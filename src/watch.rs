use anyhow::{anyhow, Result};
use crossterm::style::Stylize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use absensi_web::client::{Page, PageClient};
use absensi_web::display::{clear_screen, display_rows, LiveBadge};
use absensi_web::export::{DirectorySink, TableCsvExporter, TableRows, TableSource};
use absensi_web::refresh::{AutoRefreshController, RefreshState, TokioIntervalTimer};

pub struct WatchOptions {
    pub page: Page,
    pub period: Duration,
    pub start_live: bool,
    pub exporter: TableCsvExporter,
    pub output_dir: PathBuf,
}

/// A line typed while watching
#[derive(Debug, PartialEq, Eq)]
enum WatchCommand {
    Toggle,
    Reload,
    Export(Option<String>),
    Quit,
    Help,
    Unknown(String),
}

impl WatchCommand {
    fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        match parts.next() {
            None | Some("t") | Some("toggle") => WatchCommand::Toggle,
            Some("r") | Some("reload") => WatchCommand::Reload,
            Some("e") | Some("export") => WatchCommand::Export(parts.next().map(str::to_string)),
            Some("q") | Some("quit") | Some("exit") => WatchCommand::Quit,
            Some("h") | Some("help") | Some("?") => WatchCommand::Help,
            Some(other) => WatchCommand::Unknown(other.to_string()),
        }
    }
}

fn print_commands() {
    println!(
        "{}",
        "[Enter] toggle live  [r] reload  [e <file>] export CSV  [q] quit".dark_grey()
    );
}

/// Run watch mode until the user quits, stdin and Ctrl+C included
pub fn run_watch(client: &PageClient, options: WatchOptions) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(watch_loop(client, options));
    // The stdin reader never returns on its own
    runtime.shutdown_background();
    result
}

async fn fetch_rows(client: &PageClient, page: Page) -> Result<TableRows> {
    let client = client.clone();
    tokio::task::spawn_blocking(move || client.fetch_document(page)?.table_rows()).await?
}

struct Screen<'a> {
    client: &'a PageClient,
    page: Page,
    badge: LiveBadge,
    rows: TableRows,
}

impl Screen<'_> {
    async fn reload(&mut self) {
        match fetch_rows(self.client, self.page).await {
            Ok(rows) => self.rows = rows,
            Err(e) => {
                // Keep showing the last good table
                tracing::warn!(target: "watch", "Reload failed: {:#}", e);
                eprintln!("{}", format!("Reload failed: {:#}", e).red());
                return;
            }
        }
        self.draw();
    }

    fn draw(&self) {
        clear_screen();
        display_rows(self.page, &self.rows, &self.badge);
        print_commands();
    }
}

async fn watch_loop(client: &PageClient, options: WatchOptions) -> Result<()> {
    let (tx, mut reload_rx) = mpsc::unbounded_channel();
    let timer = TokioIntervalTimer::sending(tx, ());
    let badge = LiveBadge::new();

    let mut screen = Screen {
        client,
        page: options.page,
        badge: badge.clone(),
        rows: TableRows::new(),
    };
    screen.reload().await;

    let mut controller = AutoRefreshController::attach_with_period(
        Some(options.start_live),
        Some(badge),
        timer,
        options.period,
    )
    .ok_or_else(|| anyhow!("Live toggle unavailable"))?;
    tracing::info!(
        target: "watch",
        "Watching {} every {:?} (live: {})",
        client.page_url(options.page),
        options.period,
        options.start_live
    );
    screen.draw();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            Some(()) = reload_rx.recv() => {
                screen.reload().await;
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    // Nothing more to read; keep refreshing until Ctrl+C
                    stdin_open = false;
                    continue;
                };
                match WatchCommand::parse(&line) {
                    WatchCommand::Toggle => {
                        if controller.toggle() == RefreshState::Stopped {
                            // Drop a tick that raced with the cancel
                            while reload_rx.try_recv().is_ok() {}
                        }
                        screen.draw();
                    }
                    WatchCommand::Reload => screen.reload().await,
                    WatchCommand::Export(name) => {
                        let filename = name.unwrap_or_else(|| options.page.export_filename());
                        let mut sink = DirectorySink::new(&options.output_dir);
                        match options.exporter.export(&screen.rows, &filename, &mut sink) {
                            Ok(()) => {
                                let written = sink
                                    .last_written()
                                    .map(|p| p.display().to_string())
                                    .unwrap_or(filename);
                                println!("{}", format!("✓ Exported to {}", written).green());
                            }
                            Err(e) => eprintln!("{}", format!("Export error: {:#}", e).red()),
                        }
                    }
                    WatchCommand::Quit => break,
                    WatchCommand::Help => print_commands(),
                    WatchCommand::Unknown(cmd) => {
                        eprintln!("{}", format!("Unknown command '{}'", cmd).red());
                        print_commands();
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.stop();
    println!("\nGoodbye!");
    Ok(())
}
