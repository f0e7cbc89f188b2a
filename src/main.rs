use anyhow::{bail, Result};
use serde::Serialize;
use std::path::PathBuf;

use proofer::config::Config;
use proofer::logging::{self, Fallback};
use proofer::projects::list_projects;
use proofer::App;

enum Command {
    Scan,
    Projects,
    Photos { slug: String },
    Toggle { slug: String, filename: String },
    Status { slug: String, filename: String },
    Accepted { slug: String },
    Galleries,
    Verify { slug: String, token: String },
}

struct Args {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut positional = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("proofer {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    match parse_command(&positional) {
        Some(command) => Args {
            config_path,
            command,
        },
        None => {
            print_help();
            std::process::exit(1);
        }
    }
}

fn parse_command(args: &[String]) -> Option<Command> {
    let (name, rest) = args.split_first()?;
    let command = match (name.as_str(), rest) {
        ("scan", []) => Command::Scan,
        ("projects", []) => Command::Projects,
        ("photos", [slug]) => Command::Photos { slug: slug.clone() },
        ("toggle", [slug, filename]) => Command::Toggle {
            slug: slug.clone(),
            filename: filename.clone(),
        },
        ("status", [slug, filename]) => Command::Status {
            slug: slug.clone(),
            filename: filename.clone(),
        },
        ("accepted", [slug]) => Command::Accepted { slug: slug.clone() },
        ("galleries", []) => Command::Galleries,
        ("verify", [slug, token]) => Command::Verify {
            slug: slug.clone(),
            token: token.clone(),
        },
        _ => return None,
    };
    Some(command)
}

fn print_help() {
    println!(
        r#"proofer - proofing galleries for photoshoots

USAGE:
    proofer [OPTIONS] <COMMAND>

COMMANDS:
    scan                    Ingest uploaded archives in every project
    projects                List projects
    photos <slug>           List a project's photos as JSON
    toggle <slug> <file>    Flip a photo's accepted flag
    status <slug> <file>    Show a photo's accepted flag (yes/no)
    accepted <slug>         List accepted photos
    galleries               List galleries as JSON
    verify <slug> <token>   Check a gallery access token

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    PROOFER_CONFIG      Path to config file (overrides default location)
    PROOFER_LOG         Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/proofer/config.toml

See also: proofer-daemon --help"#
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args();

    let _ = logging::init(Fallback::File(logging::default_log_dir()));

    let config = match args.config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    let app = App::new(config)?;

    match args.command {
        Command::Scan => {
            let report = app.scan(None)?;
            for outcome in &report.ingested {
                println!(
                    "{}: extracted {} files ({:?})",
                    outcome.slug, outcome.extracted.files, outcome.provisioned
                );
            }
            for failure in &report.failures {
                eprintln!("{}: {}", failure.slug, failure.message);
            }
            for slug in &report.busy {
                println!("{}: in progress elsewhere, skipped", slug);
            }
            println!(
                "{} projects, {} ingested, {} failed",
                report.projects.len(),
                report.ingested.len(),
                report.failures.len()
            );
            if !report.failures.is_empty() {
                std::process::exit(2);
            }
        }
        Command::Projects => {
            print_json(&list_projects(&app.config.projects.root_dir)?)?;
        }
        Command::Photos { slug } => match app.library().list_photos(&slug)? {
            Some(photos) => print_json(&photos)?,
            None => bail!("Project not found: {}", slug),
        },
        Command::Toggle { slug, filename } => {
            let accepted = app.library().toggle_accepted(&slug, &filename)?;
            println!("{}", proofer::db::AcceptedStatus::from(accepted));
        }
        Command::Status { slug, filename } => {
            println!("{}", app.library().accepted_status(&slug, &filename)?);
        }
        Command::Accepted { slug } => {
            for filename in app.library().accepted_photos(&slug)? {
                println!("{}", filename);
            }
        }
        Command::Galleries => {
            print_json(&app.db.get_all_galleries()?)?;
        }
        Command::Verify { slug, token } => {
            if app.provisioner().verify_access(&slug, &token)? {
                println!("ok");
            } else {
                println!("denied");
                std::process::exit(3);
            }
        }
    }

    Ok(())
}
