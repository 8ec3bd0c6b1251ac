//! fach-watch CLI
//!
//! Run-once entry point; an external scheduler (cron) drives periodic runs.
//! Running two instances against the same state files is not supported.

use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand};
use fach_watch::{
    config::SmtpCredentials,
    error::Result,
    models::Config,
    pipeline,
    services::{FacHabitatSource, SmtpNotifier},
    storage::{DailyGate, StateStore},
};

/// fach-watch - Fac-Habitat availability watcher
#[derive(Parser, Debug)]
#[command(name = "fach-watch", version, about = "Fac-Habitat availability watcher")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape once, send any due notifications, and exit
    Run,

    /// Validate configuration and credentials
    Validate,

    /// Show persisted state without touching the network
    Status,
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, config_level: &str) {
    let level = if verbose { "debug" } else { config_level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config);
    init_logging(cli.verbose, &config.logging.level);

    let state = StateStore::new(&config.paths.state_file);
    let gate = DailyGate::new(&config.paths.daily_marker_file);

    match cli.command {
        Command::Run => {
            config.validate()?;
            let credentials = SmtpCredentials::from_env(&config.email.sender)?;

            let source = FacHabitatSource::new(config.watch.clone())?;
            let notifier = SmtpNotifier::new(&config.email, &credentials)?;

            let summary =
                pipeline::run_watch(&source, &notifier, &state, &gate, Local::now()).await?;

            log::info!(
                "Run complete: {} scraped, {} new, {} degraded keys",
                summary.scraped,
                summary.new_count,
                summary.degraded_keys
            );
            if summary.degraded_keys > 0 {
                log::warn!(
                    "{} record(s) fell back to positional keys; expect repeat alerts for them",
                    summary.degraded_keys
                );
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({} departments, {} recipients)",
                config.watch.departments.len(),
                config.email.unique_recipients().len()
            );

            match SmtpCredentials::from_env(&config.email.sender) {
                Ok(_) => log::info!("✓ SMTP credentials present"),
                Err(e) => {
                    log::error!("Credential check failed: {}", e);
                    return Err(e);
                }
            }

            log::info!("All validations passed!");
        }

        Command::Status => {
            log::info!("State file: {}", config.paths.state_file);
            let keys = state.load().await;
            log::info!("{} key(s) persisted", keys.len());
            for key in &keys {
                log::debug!("  {}", key);
            }

            log::info!("Daily marker: {}", config.paths.daily_marker_file);
            let today = Local::now().date_naive();
            if gate.should_send_today(today).await {
                log::info!("Daily summary for {} not sent yet", today);
            } else {
                log::info!("Daily summary for {} already sent", today);
            }
        }
    }

    Ok(())
}
