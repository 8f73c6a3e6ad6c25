#[cfg(not(target_arch = "wasm32"))]
mod cli;
#[cfg(not(target_arch = "wasm32"))]
mod watch;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;
    use crossterm::style::Stylize;

    let args = cli::Cli::parse();
    absensi_web::utils::logging::init_tracing(args.verbose);

    if let Err(e) = cli::run(args) {
        tracing::error!(target: "absensi_web", "{:#}", e);
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(path) = absensi_web::utils::logging::log_path() {
            eprintln!("   Log: {}", path.display());
        }
        std::process::exit(1);
    }
}

// The browser build is driven by the library's wasm entry point
#[cfg(target_arch = "wasm32")]
fn main() {}
