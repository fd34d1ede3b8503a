//! Packlingo - Resumable Modpack Translation
//!
//! Main entry point: loads configuration, sets up logging, arms the
//! cancellation signal and dispatches CLI commands.

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use packlingo::cli::{Args, Commands, DictAction};
use packlingo::config::Config;
use packlingo::dictionary::DictionaryCache;
use packlingo::error::PacklingoError;
use packlingo::pipeline::{collect_status, Pipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("packlingo.toml").exists() {
                Config::from_file("packlingo.toml")?
            } else {
                Config::default()
            }
        }
    };
    config.apply_env_overrides();

    setup_logging(&config, args.verbose)?;
    info!("Starting Packlingo - Resumable Modpack Translation");

    match args.command {
        Commands::Translate {
            input_dir,
            output_dir,
            target_lang,
        } => {
            if let Some(lang) = target_lang {
                config.translation.target_lang = lang;
            }
            info!(
                "Translating {} -> {} (target: {})",
                input_dir.display(),
                output_dir.display(),
                config.translation.target_lang
            );

            let cancel = CancellationToken::new();
            arm_cancel_signal(cancel.clone());

            let pipeline = Pipeline::new(config, cancel)?;
            match pipeline.run(&input_dir, &output_dir).await {
                Ok(_) => {}
                Err(PacklingoError::Cancelled) => {
                    info!("Interrupted by user, progress saved");
                    std::process::exit(130);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Status {
            input_dir,
            output_dir,
        } => {
            let report = collect_status(&config, &input_dir, &output_dir);
            if report.is_empty() {
                println!("No content categories found under {}", input_dir.display());
            } else {
                println!("{:<15} {:>10} {:>10}", "Category", "Complete", "Pending");
                println!("{}", "-".repeat(37));
                for status in report {
                    println!(
                        "{:<15} {:>10} {:>10}",
                        status.category, status.complete, status.pending
                    );
                }
            }
        }
        Commands::Dict { action } => {
            let cache = DictionaryCache::new(&config.dictionary.url, config.work_dir());
            match action {
                DictAction::Fetch => {
                    let bytes = cache.fetch().await?;
                    println!(
                        "Dictionary cached at {} ({} bytes)",
                        cache.cache_path().display(),
                        bytes
                    );
                }
                DictAction::Info => {
                    println!("Cache path: {}", cache.cache_path().display());
                    match cache.cached_size().await {
                        Some(size) => {
                            let dict = cache.load().await;
                            println!("Size: {:.1} KB", size as f64 / 1024.0);
                            println!("Entries: {}", dict.len());
                        }
                        None => println!("Not cached yet"),
                    }
                }
                DictAction::Clear => {
                    if cache.clear().await? {
                        println!("Cached dictionary removed");
                    } else {
                        println!("No cached dictionary to remove");
                    }
                }
            }
        }
    }

    info!("Packlingo finished");
    Ok(())
}

/// Cancel the token on the first Ctrl-C so in-flight work can flush its
/// checkpoint before the process exits.
fn arm_cancel_signal(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Cancellation requested, finishing current file...");
            cancel.cancel();
        }
    });
}

/// Setup logging to both console and a daily-rolling file.
fn setup_logging(config: &Config, verbose: bool) -> Result<()> {
    let log_dir = config.work_dir().join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "packlingo.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer().with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
