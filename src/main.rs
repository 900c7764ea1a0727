use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use catalog_porter::AppConfig;
use catalog_porter::config::LoggingConfig;
use catalog_porter::jobs::{LocaleFixOutcome, LocaleFixer, TransferOutcome, Transporter};
use catalog_porter::store::Database;

#[derive(Debug, Parser)]
#[command(name = "catalog-porter", version, about = "Catalog maintenance jobs for product pages")]
struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Extra config file layered over config/")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "CODE", help = "Override migration.target_locale")]
    locale: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Move product pages into the target locale and under its product index
    #[command(name = "fix-product-locales")]
    FixProductLocales(FixLocalesArgs),
    /// Create published product pages from scraped items not transferred yet
    #[command(name = "transfer-scraped-items")]
    TransferScrapedItems(TransferArgs),
}

#[derive(Debug, Args)]
struct FixLocalesArgs {
    #[arg(long, help = "Delete all product pages instead of fixing them")]
    delete_all: bool,
}

#[derive(Debug, Args)]
struct TransferArgs {
    #[arg(long, value_name = "N", help = "Override migration.transfer_batch_size")]
    batch_size: Option<usize>,
}

fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("catalog_porter={}", config.level)))?;
    let stdout_layer = fmt::layer().with_target(false);

    match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "catalog-porter.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(locale) = cli.locale {
        config.migration.target_locale = locale;
        config.validate()?;
    }

    // Keep the guard alive so the file writer flushes on exit.
    let _guard = init_tracing(&config.logging)?;

    let db = Database::connect(&config.database).await?;

    match cli.command {
        Commands::FixProductLocales(args) => {
            let fixer = LocaleFixer::new(&config.migration);
            match fixer.run(&db, args.delete_all).await? {
                LocaleFixOutcome::MissingIndexPage { locale } => {
                    println!("Nothing changed: no product index page for locale '{locale}'.");
                }
                LocaleFixOutcome::DeletedAll { deleted } => {
                    println!("Deleted {deleted} product pages.");
                }
                LocaleFixOutcome::Reconciled(report) => {
                    println!("Fixed locale for {} pages", report.fixed_locale);
                    println!("Moved {} pages to correct parent", report.moved);
                    println!("Skipped {} duplicates", report.skipped_duplicates);
                    if report.failed_moves + report.failed_relabels > 0 {
                        println!(
                            "{} moves and {} locale updates failed; see the log above",
                            report.failed_moves, report.failed_relabels
                        );
                    }
                }
            }
        }
        Commands::TransferScrapedItems(args) => {
            let mut transporter = Transporter::new(&config.migration);
            if let Some(batch_size) = args.batch_size.filter(|size| *size > 0) {
                transporter = transporter.with_batch_size(batch_size);
            }
            match transporter.run(&db).await? {
                TransferOutcome::MissingIndexPage { locale } => {
                    println!("Nothing transferred: no product index page for locale '{locale}'.");
                }
                TransferOutcome::NothingToDo => {
                    println!("Nothing to transfer.");
                }
                TransferOutcome::Transferred(report) => {
                    println!(
                        "Transferred {} items ({} skipped, {} new images, {} reused)",
                        report.transferred.len(),
                        report.skipped.len(),
                        report.images_created,
                        report.images_reused
                    );
                }
            }
        }
    }

    db.close().await;
    info!("Done");
    Ok(())
}
