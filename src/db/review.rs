use sqlx::Row;
use tracing::{debug, error, instrument};

use super::core::Database;
use crate::normalize::Review;
use crate::TARGET_DB;

impl Database {
    /// Bulk-insert a batch of canonical reviews for an already-resolved bank.
    /// Conflicting primary keys are no-ops; existing rows are never
    /// overwritten. The whole batch is one transaction: on any unexpected
    /// error the transaction is rolled back in full and the error surfaced.
    ///
    /// Returns the number of rows actually inserted.
    #[instrument(target = "db", level = "info", skip(self, reviews))]
    pub async fn upsert_reviews(
        &self,
        reviews: &[Review],
        bank_id: i64,
    ) -> Result<u64, sqlx::Error> {
        if reviews.is_empty() {
            debug!(target: TARGET_DB, "No reviews to insert for bank_id {}", bank_id);
            return Ok(0);
        }

        let mut transaction = self.pool().begin().await?;
        let mut inserted = 0u64;

        for review in reviews {
            let result = sqlx::query(
                r#"
                INSERT INTO reviews (
                    review_id, review_text, sentiment_label, sentiment_score,
                    identified_themes, rating, review_date, source, bank_id
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(review_id) DO NOTHING
                "#,
            )
            .bind(review.review_id)
            .bind(&review.text)
            .bind(&review.sentiment_label)
            .bind(review.sentiment_score)
            .bind(&review.themes)
            .bind(review.rating)
            .bind(&review.date)
            .bind(&review.source)
            .bind(bank_id)
            .execute(&mut *transaction)
            .await;

            match result {
                Ok(outcome) => {
                    inserted += outcome.rows_affected();
                }
                Err(err) => {
                    error!(target: TARGET_DB, "Failed to insert review {}: {}, rolling back batch", review.review_id, err);
                    transaction.rollback().await?;
                    return Err(err);
                }
            }
        }

        transaction.commit().await?;
        debug!(
            target: TARGET_DB,
            "Inserted {} of {} reviews for bank_id {} ({} already present)",
            inserted,
            reviews.len(),
            bank_id,
            reviews.len() as u64 - inserted
        );
        Ok(inserted)
    }

    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn count_reviews(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM reviews")
            .fetch_one(self.pool())
            .await?;

        let count: i64 = row.get("count");
        debug!(target: TARGET_DB, "Counted {} reviews", count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Review;
    use tempfile::tempdir;

    fn review(text: &str, bank: &str, date: &str) -> Review {
        Review::new(
            text.to_string(),
            5,
            date.to_string(),
            bank.to_string(),
            "Google Play".to_string(),
            None,
            None,
            None,
        )
    }

    async fn test_db(dir: &tempfile::TempDir) -> Database {
        let path = dir.path().join("revus-test.db");
        Database::new(path.to_str().expect("utf-8 path"))
            .await
            .expect("create test database")
    }

    #[tokio::test]
    async fn schema_initialization_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        let db = test_db(&dir).await;
        // Second run against an existing file must not error.
        db.initialize_schema().await.expect("re-initialize schema");
        assert_eq!(db.count_reviews().await.expect("count"), 0);
        assert_eq!(db.count_banks().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn bank_resolution_is_deterministic() {
        let dir = tempdir().expect("tempdir");
        let db = test_db(&dir).await;

        let first = db.resolve_bank("Dashen").await.expect("resolve");
        let second = db.resolve_bank("Dashen").await.expect("resolve again");
        let other = db.resolve_bank("Abyssinia").await.expect("resolve other");

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(db.count_banks().await.expect("count"), 2);
    }

    #[tokio::test]
    async fn concurrent_bank_resolution_converges_on_one_row() {
        let dir = tempdir().expect("tempdir");
        let db = test_db(&dir).await;

        let (a, b, c) = tokio::join!(
            db.resolve_bank("Dashen"),
            db.resolve_bank("Dashen"),
            db.resolve_bank("Dashen"),
        );
        let a = a.expect("resolve");
        let b = b.expect("resolve");
        let c = c.expect("resolve");

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(db.count_banks().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn empty_bank_name_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let db = test_db(&dir).await;
        assert!(db.resolve_bank("  ").await.is_err());
    }

    #[tokio::test]
    async fn duplicate_review_ids_are_noops() {
        let dir = tempdir().expect("tempdir");
        let db = test_db(&dir).await;
        let bank_id = db.resolve_bank("Dashen").await.expect("resolve");

        let batch = vec![
            review("Good app", "Dashen", "2024-01-02"),
            review("Crashes on login", "Dashen", "2024-01-03"),
        ];

        let first_run = db.upsert_reviews(&batch, bank_id).await.expect("insert");
        assert_eq!(first_run, 2);

        let second_run = db.upsert_reviews(&batch, bank_id).await.expect("re-insert");
        assert_eq!(second_run, 0);
        assert_eq!(db.count_reviews().await.expect("count"), 2);
    }

    #[tokio::test]
    async fn existing_rows_are_never_overwritten() {
        let dir = tempdir().expect("tempdir");
        let db = test_db(&dir).await;
        let bank_id = db.resolve_bank("Dashen").await.expect("resolve");

        let original = review("Good app", "Dashen", "2024-01-02");
        db.upsert_reviews(&[original.clone()], bank_id)
            .await
            .expect("insert");

        // Same identity, different rating: first successful insert wins.
        let mut conflicting = original.clone();
        conflicting.rating = 1;
        db.upsert_reviews(&[conflicting], bank_id)
            .await
            .expect("conflict insert");

        let row = sqlx::query("SELECT rating FROM reviews WHERE review_id = ?1")
            .bind(original.review_id)
            .fetch_one(db.pool())
            .await
            .expect("fetch row");
        let rating: i64 = row.get("rating");
        assert_eq!(rating, 5);
    }

    #[tokio::test]
    async fn deleting_a_bank_cascades_to_its_reviews() {
        let dir = tempdir().expect("tempdir");
        let db = test_db(&dir).await;

        let dashen = db.resolve_bank("Dashen").await.expect("resolve");
        let boa = db.resolve_bank("Abyssinia").await.expect("resolve");
        db.upsert_reviews(&[review("Good app", "Dashen", "2024-01-02")], dashen)
            .await
            .expect("insert");
        db.upsert_reviews(&[review("Slow transfers", "Abyssinia", "2024-01-02")], boa)
            .await
            .expect("insert");

        db.delete_bank("Dashen").await.expect("delete");

        assert_eq!(db.count_banks().await.expect("count"), 1);
        assert_eq!(db.count_reviews().await.expect("count"), 1);
    }
}
