use rand::Rng;
use sqlx::Row;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, instrument};

use super::core::{Database, DbLockErrorExt};
use crate::TARGET_DB;

impl Database {
    /// Resolve a bank name to its surrogate key, inserting the bank row on
    /// first reference. The insert-ignore plus re-select sequence leans on the
    /// UNIQUE constraint, so two callers racing on the same name converge on
    /// a single winning row.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn resolve_bank(&self, bank_name: &str) -> Result<i64, sqlx::Error> {
        if bank_name.trim().is_empty() {
            error!(target: TARGET_DB, "Attempted to resolve an empty bank name");
            return Err(sqlx::Error::Protocol("Empty bank name provided".into()));
        }

        let mut backoff = 100; // initial delay in milliseconds
        let max_retries = 5;

        for attempt in 1..=max_retries {
            let result = sqlx::query(
                r#"
                INSERT INTO banks (bank_name)
                VALUES (?1)
                ON CONFLICT(bank_name) DO NOTHING
                "#,
            )
            .bind(bank_name)
            .execute(self.pool())
            .await;

            match result {
                Ok(outcome) => {
                    if outcome.rows_affected() > 0 {
                        debug!(target: TARGET_DB, "Inserted new bank: {}", bank_name);
                    }
                    // Whether we inserted or lost a race, the row exists now.
                    let row = sqlx::query("SELECT bank_id FROM banks WHERE bank_name = ?1")
                        .bind(bank_name)
                        .fetch_one(self.pool())
                        .await?;
                    let bank_id: i64 = row.get("bank_id");
                    debug!(target: TARGET_DB, "Resolved bank '{}' to id {}", bank_name, bank_id);
                    return Ok(bank_id);
                }
                Err(err) => {
                    if err.is_database_lock_error() {
                        info!(target: TARGET_DB, "Database is locked, waiting {}ms before retrying attempt {}/{}: {}", backoff, attempt, max_retries, bank_name);
                        sleep(Duration::from_millis(backoff)).await;
                        backoff = backoff.saturating_mul(2); // exponential backoff
                        if attempt == max_retries {
                            // Introduce some randomness to avoid the "thundering herd problem"
                            let random_jitter = rand::rng().random_range(0..200);
                            backoff += random_jitter;
                            sleep(Duration::from_millis(backoff)).await;
                        }
                    } else {
                        error!(target: TARGET_DB, "Failed to resolve bank '{}': {}", bank_name, err);
                        return Err(err);
                    }
                }
            }
        }

        Err(sqlx::Error::Protocol(
            "Maximum retries exceeded for resolving bank".into(),
        ))
    }

    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn count_banks(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM banks")
            .fetch_one(self.pool())
            .await?;

        let count: i64 = row.get("count");
        debug!(target: TARGET_DB, "Counted {} banks", count);
        Ok(count)
    }

    /// Administrative removal of a bank; associated reviews go with it via
    /// the ON DELETE CASCADE rule. Not used by the ingestion path.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn delete_bank(&self, bank_name: &str) -> Result<u64, sqlx::Error> {
        let affected_rows = sqlx::query("DELETE FROM banks WHERE bank_name = ?1")
            .bind(bank_name)
            .execute(self.pool())
            .await?
            .rows_affected();

        info!(target: TARGET_DB, "Deleted bank '{}' ({} row)", bank_name, affected_rows);
        Ok(affected_rows)
    }
}
