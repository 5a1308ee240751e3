//! End-to-end ingestion orchestration.
//!
//! Sequences schema provisioning, per-app collect/normalize/persist, and the
//! final count verification. Per-app failures are isolated: one app failing
//! at any stage is recorded in the run report and the run moves on. Only a
//! setup failure (storage unreachable, DDL refused) aborts the run.

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::db::Database;
use crate::environment::AppSpec;
use crate::fetch::{PaginatedCollector, ReviewSource};
use crate::normalize;
use crate::TARGET_PIPELINE;

/// Where one app's processing ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppStatus {
    /// Collected, normalized, and persisted without error. Covers the case
    /// of a partial collection that still persisted cleanly.
    Succeeded,
    /// Collection failed before the first page; nothing persisted.
    FetchFailed,
    /// Everything normalized away or the source had nothing; nothing to persist.
    Empty,
    /// The batch transaction was rolled back.
    PersistFailed,
}

#[derive(Debug)]
pub struct AppOutcome {
    pub bank_name: String,
    pub app_id: String,
    pub status: AppStatus,
    pub collected: usize,
    pub normalized: usize,
    pub dropped_invalid: usize,
    pub dropped_duplicates: usize,
    pub inserted: u64,
    pub error: Option<String>,
}

impl AppOutcome {
    /// An app with a genuinely empty source is a skip, not a failure; an
    /// empty result caused by a fetch error is.
    pub fn failed(&self) -> bool {
        match self.status {
            AppStatus::FetchFailed | AppStatus::PersistFailed => true,
            AppStatus::Empty => self.error.is_some(),
            AppStatus::Succeeded => false,
        }
    }
}

/// Report for one full ingestion run.
#[derive(Debug)]
pub struct IngestReport {
    pub apps: Vec<AppOutcome>,
    pub total_reviews: i64,
    pub total_banks: i64,
}

impl IngestReport {
    pub fn succeeded_apps(&self) -> usize {
        self.apps
            .iter()
            .filter(|a| matches!(a.status, AppStatus::Succeeded))
            .count()
    }

    /// The run counts as failed only when apps were configured and every one
    /// of them actually failed. Error-free empty apps are skips and keep the
    /// run green.
    pub fn all_apps_failed(&self) -> bool {
        !self.apps.is_empty() && self.apps.iter().all(AppOutcome::failed)
    }
}

pub struct PipelineOrchestrator<S: ReviewSource> {
    source: S,
    collector: PaginatedCollector,
    target_per_app: usize,
}

impl<S: ReviewSource> PipelineOrchestrator<S> {
    pub fn new(source: S, collector: PaginatedCollector, target_per_app: usize) -> Self {
        Self {
            source,
            collector,
            target_per_app,
        }
    }

    /// Run the full pipeline: provision schema, process each app, verify.
    ///
    /// Returns `Err` only on setup failure; per-app failures are folded into
    /// the report.
    pub async fn run(&self, database_path: &str, apps: &[AppSpec]) -> Result<IngestReport> {
        let db = Database::new(database_path)
            .await
            .with_context(|| format!("provisioning review store at {database_path}"))?;

        let mut outcomes = Vec::with_capacity(apps.len());
        for app in apps {
            outcomes.push(self.process_app(&db, app).await);
        }

        // Verification always runs once the schema is ready, even if every
        // app failed; the counts then simply reflect partial or zero data.
        let total_reviews = db.count_reviews().await.context("counting reviews")?;
        let total_banks = db.count_banks().await.context("counting banks")?;
        info!(
            target: TARGET_PIPELINE,
            "Run verified: {} reviews across {} banks", total_reviews, total_banks
        );

        Ok(IngestReport {
            apps: outcomes,
            total_reviews,
            total_banks,
        })
    }

    async fn process_app(&self, db: &Database, app: &AppSpec) -> AppOutcome {
        info!(
            target: TARGET_PIPELINE,
            "Processing '{}' ({}), target {} reviews",
            app.bank_name, app.app_id, self.target_per_app
        );

        let collected = self
            .collector
            .collect(&self.source, app, self.target_per_app)
            .await;
        let fetch_error = collected.error.as_ref().map(|e| e.to_string());
        if let Some(err) = &fetch_error {
            warn!(
                target: TARGET_PIPELINE,
                "Collection for '{}' stopped early with {} reviews: {}",
                app.bank_name, collected.reviews.len(), err
            );
        }

        if collected.reviews.is_empty() {
            let status = if fetch_error.is_some() {
                AppStatus::FetchFailed
            } else {
                AppStatus::Empty
            };
            return AppOutcome {
                bank_name: app.bank_name.clone(),
                app_id: app.app_id.clone(),
                status,
                collected: 0,
                normalized: 0,
                dropped_invalid: 0,
                dropped_duplicates: 0,
                inserted: 0,
                error: fetch_error,
            };
        }

        let collected_count = collected.reviews.len();
        let batch = normalize::normalize(collected.reviews, &app.bank_name, "Google Play");
        let normalized_count = batch.reviews.len();

        if batch.reviews.is_empty() {
            warn!(
                target: TARGET_PIPELINE,
                "All {} collected reviews for '{}' dropped during normalization",
                collected_count, app.bank_name
            );
            return AppOutcome {
                bank_name: app.bank_name.clone(),
                app_id: app.app_id.clone(),
                status: AppStatus::Empty,
                collected: collected_count,
                normalized: 0,
                dropped_invalid: batch.dropped_invalid,
                dropped_duplicates: batch.dropped_duplicates,
                inserted: 0,
                error: fetch_error,
            };
        }

        let persisted = async {
            let bank_id = db.resolve_bank(&app.bank_name).await?;
            db.upsert_reviews(&batch.reviews, bank_id).await
        }
        .await;

        match persisted {
            Ok(inserted) => {
                info!(
                    target: TARGET_PIPELINE,
                    "Persisted '{}': {} collected, {} normalized, {} newly inserted",
                    app.bank_name, collected_count, normalized_count, inserted
                );
                AppOutcome {
                    bank_name: app.bank_name.clone(),
                    app_id: app.app_id.clone(),
                    status: AppStatus::Succeeded,
                    collected: collected_count,
                    normalized: normalized_count,
                    dropped_invalid: batch.dropped_invalid,
                    dropped_duplicates: batch.dropped_duplicates,
                    inserted,
                    error: fetch_error,
                }
            }
            Err(err) => {
                error!(
                    target: TARGET_PIPELINE,
                    "Persistence failed for '{}', batch rolled back: {}", app.bank_name, err
                );
                AppOutcome {
                    bank_name: app.bank_name.clone(),
                    app_id: app.app_id.clone(),
                    status: AppStatus::PersistFailed,
                    collected: collected_count,
                    normalized: normalized_count,
                    dropped_invalid: batch.dropped_invalid,
                    dropped_duplicates: batch.dropped_duplicates,
                    inserted: 0,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}
