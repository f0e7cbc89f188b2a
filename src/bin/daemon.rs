//! Proofer daemon for unattended ingestion.
//!
//! Polls the projects directory and ingests every uploaded archive it
//! finds: gallery record, notification email, extraction.
//!
//! ## Usage
//!
//! ```bash
//! proofer-daemon              # Run in foreground
//! proofer-daemon --once       # Scan once and exit
//! ```

use anyhow::Result;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

use proofer::logging::{self, Fallback};
use proofer::projects::ScanProgress;
use proofer::{App, Config};

struct DaemonArgs {
    /// Overrides `[daemon] poll_interval` when set
    poll_interval: Option<u64>,
    once: bool,
    config_path: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = parse_args();

    logging::init(Fallback::Stderr)?;

    info!("Proofer daemon starting...");

    let config = match args.config_path {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let poll_interval = args.poll_interval.unwrap_or(config.daemon.poll_interval);

    let app = App::new(config)?;
    info!("Database opened at {:?}", app.config.db_path());

    if args.once {
        info!("Running in single-shot mode");
        run_scan(&app)?;
    } else {
        info!("Running in daemon mode, polling every {} seconds", poll_interval);
        run_daemon_loop(&app, poll_interval);
    }

    info!("Proofer daemon stopped");
    Ok(())
}

fn parse_args() -> DaemonArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = DaemonArgs {
        poll_interval: None,
        once: false,
        config_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--once" | "-1" => {
                parsed.once = true;
            }
            "--interval" | "-i" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse() {
                        Ok(interval) => parsed.poll_interval = Some(interval),
                        Err(_) => eprintln!("Ignoring invalid interval: {}", args[i + 1]),
                    }
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    parsed.config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    parsed
}

fn print_help() {
    println!(
        r#"proofer-daemon - Background archive ingestion for Proofer

USAGE:
    proofer-daemon [OPTIONS]

OPTIONS:
    --once, -1          Scan once and exit
    --interval, -i N    Poll interval in seconds (default: [daemon] poll_interval)
    --config, -c PATH   Path to config file
    --help, -h          Show this help message

ENVIRONMENT:
    PROOFER_CONFIG      Path to config file (overrides default location)
    PROOFER_LOG         Log level (trace, debug, info, warn, error)

Each scan looks for uploaded archives under [projects] root_dir, creates
a gallery, notifies the photographer and extracts the photos.
"#
    );
}

fn run_daemon_loop(app: &App, poll_interval: u64) {
    loop {
        if let Err(e) = run_scan(app) {
            error!("Scan failed: {:#}", e);
        }

        thread::sleep(Duration::from_secs(poll_interval));
    }
}

fn run_scan(app: &App) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let report = app.scan(Some(tx))?;

    for event in rx.try_iter() {
        match event {
            ScanProgress::Ingested { slug, files } => {
                info!("Project {} ingested ({} files)", slug, files)
            }
            ScanProgress::Error { slug, message } => {
                warn!("Project {} will be retried: {}", slug, message)
            }
            _ => {}
        }
    }

    if report.ingested.is_empty() && report.failures.is_empty() {
        info!("No pending archives in {} projects", report.projects.len());
    } else {
        info!(
            "Scan complete: {} ingested, {} failed",
            report.ingested.len(),
            report.failures.len()
        );
    }

    Ok(())
}
