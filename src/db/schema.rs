use tracing::info;

use super::core::Database;
use crate::TARGET_DB;

impl Database {
    pub(crate) async fn initialize_schema(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS banks (
                bank_id INTEGER PRIMARY KEY AUTOINCREMENT,
                bank_name TEXT NOT NULL UNIQUE
            );
            CREATE INDEX IF NOT EXISTS idx_banks_bank_name ON banks (bank_name);

            -- review_id is a deterministic 64-bit digest of the review content,
            -- so re-ingesting the same input is a no-op.
            CREATE TABLE IF NOT EXISTS reviews (
                review_id INTEGER PRIMARY KEY,
                review_text TEXT NOT NULL,
                sentiment_label TEXT,
                sentiment_score REAL,
                identified_themes TEXT,
                rating INTEGER NOT NULL,
                review_date TEXT NOT NULL,
                source TEXT NOT NULL,
                bank_id INTEGER NOT NULL,
                FOREIGN KEY (bank_id) REFERENCES banks (bank_id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_reviews_bank_id ON reviews (bank_id);
            CREATE INDEX IF NOT EXISTS idx_reviews_review_date ON reviews (review_date);
            CREATE INDEX IF NOT EXISTS idx_reviews_rating ON reviews (rating);
            "#,
        )
        .execute(&mut *conn)
        .await?;
        info!(target: TARGET_DB, "Tables ensured to exist");

        Ok(())
    }
}
