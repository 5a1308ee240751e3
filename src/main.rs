use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::env;
use tracing::{error, info};

use revus::db::Database;
use revus::environment;
use revus::fetch::{HttpReviewSource, PaginatedCollector, MAX_PAGE_SIZE, PAGE_DELAY};
use revus::logging::configure_logging;
use revus::pipeline::PipelineOrchestrator;
use revus::TARGET_PIPELINE;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect, normalize, and persist reviews for every configured app
    Ingest {
        /// Reviews to collect per app
        #[arg(short, long, default_value = "400")]
        target: usize,

        /// Page size requested from the review API
        #[arg(short, long, default_value_t = MAX_PAGE_SIZE)]
        page_size: usize,
    },

    /// Report stored review and bank counts without ingesting anything
    Verify,
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { target, page_size } => {
            let database_path =
                env::var("DATABASE_PATH").unwrap_or_else(|_| "revus.db".to_string());
            let raw = environment::get_env_var_as_vec("REVUS_APPS", ';');
            let apps = environment::parse_app_specs(&raw);
            if apps.is_empty() {
                info!(
                    target: TARGET_PIPELINE,
                    "No apps configured in REVUS_APPS; nothing to ingest"
                );
                return Ok(());
            }

            let api_url = env::var("REVIEW_API_URL")
                .map_err(|_| anyhow!("REVIEW_API_URL environment variable required"))?;
            let source = HttpReviewSource::new(&api_url)?;
            let collector = PaginatedCollector::new(page_size, PAGE_DELAY);
            let orchestrator = PipelineOrchestrator::new(source, collector, target);

            let report = orchestrator.run(&database_path, &apps).await?;
            for outcome in &report.apps {
                info!(
                    target: TARGET_PIPELINE,
                    "{} ({}): {:?}, collected {}, normalized {}, inserted {}",
                    outcome.bank_name,
                    outcome.app_id,
                    outcome.status,
                    outcome.collected,
                    outcome.normalized,
                    outcome.inserted
                );
            }
            info!(
                target: TARGET_PIPELINE,
                "Store now holds {} reviews across {} banks",
                report.total_reviews, report.total_banks
            );

            if report.all_apps_failed() {
                error!(target: TARGET_PIPELINE, "Every configured app failed");
                std::process::exit(1);
            }
        }
        Commands::Verify => {
            let db = Database::instance().await;
            let reviews = db.count_reviews().await?;
            let banks = db.count_banks().await?;
            info!(
                target: TARGET_PIPELINE,
                "{} reviews across {} banks", reviews, banks
            );
        }
    }

    Ok(())
}
