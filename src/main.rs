mod cli;
mod discover;
mod error;
mod report;
mod scan;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use hashscan_config::Config;
use hashscan_store::Database;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Open (creating if needed) the configured catalog.
pub(crate) async fn open_catalog(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Catalog)?;
    }
    Database::connect(&config.database, config.workers).await.or_raise(|| ErrorKind::Catalog)
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    cli.apply(&mut config);
    config.validate().or_raise(|| ErrorKind::Config)
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    match &cli.command {
        Command::Scan(args) => {
            let summary = scan::run(&config, args).await?;
            let tally = summary.tally;
            println!(
                "queued {} files ({} unreadable): {} hashed, {} skipped, {} unchanged containers, {} not saved",
                summary.discovery.queued, summary.discovery.unreadable, tally.hashed, tally.skipped, tally.matched, tally.unsaved,
            );
            match summary.pool {
                Some(report) if !report.is_clean() => {
                    let exits: Vec<String> = report.exits.iter().map(ToString::to_string).collect();
                    println!("workers: {}", exits.join(", "));
                },
                Some(_) => {},
                None => println!("scan interrupted"),
            }
            if args.dry_run {
                println!("dry run: nothing was written to {}", config.database.display());
            }
        },
        Command::Duplicates(args) => print!("{}", report::run(&config, args).await?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:?}");
            return ExitCode::FAILURE;
        },
    };
    init_tracing(&config.log_level);
    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:?}");
            ExitCode::FAILURE
        },
    }
}
