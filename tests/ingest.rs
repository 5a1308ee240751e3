//! Full-pipeline integration tests against a file-backed store.

use std::time::Duration;

use tempfile::TempDir;

use revus::db::Database;
use revus::environment::AppSpec;
use revus::fetch::{PaginatedCollector, RawReview, StaticReviewSource};
use revus::pipeline::{AppStatus, PipelineOrchestrator};

fn raw(content: &str, score: f64, posted_at: &str) -> RawReview {
    RawReview {
        content: Some(content.to_string()),
        score: Some(score),
        posted_at: Some(posted_at.to_string()),
        sentiment_label: None,
        sentiment_score: None,
        themes: None,
    }
}

fn pages() -> Vec<Vec<RawReview>> {
    vec![
        vec![
            raw("Transfers fail every weekend", 1.0, "2024-03-01"),
            raw("Clean interface, fast login", 5.0, "2024-03-02"),
            raw("  ", 3.0, "2024-03-02"),
        ],
        vec![
            raw("Clean interface, fast login", 5.0, "2024-03-02"),
            raw("OTP never arrives", 2.0, "2024-03-04 10:15:00"),
        ],
    ]
}

fn orchestrator(source: StaticReviewSource) -> PipelineOrchestrator<StaticReviewSource> {
    let collector = PaginatedCollector::new(10, Duration::ZERO);
    PipelineOrchestrator::new(source, collector, 400)
}

#[tokio::test]
async fn repeated_runs_do_not_grow_the_store() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("ingest.db");
    let db_path = db_path.to_str().unwrap();
    let apps = vec![AppSpec {
        bank_name: "Commercial Bank".to_string(),
        app_id: "com.cbe.mobile".to_string(),
    }];

    let first = orchestrator(StaticReviewSource::new(pages()))
        .run(db_path, &apps)
        .await
        .unwrap();
    assert_eq!(first.apps.len(), 1);
    assert_eq!(first.apps[0].status, AppStatus::Succeeded);
    assert_eq!(first.apps[0].collected, 5);
    // One blank-text drop, one cross-page duplicate drop.
    assert_eq!(first.apps[0].dropped_invalid, 1);
    assert_eq!(first.apps[0].dropped_duplicates, 1);
    assert_eq!(first.apps[0].inserted, 3);
    assert_eq!(first.total_reviews, 3);
    assert_eq!(first.total_banks, 1);

    let second = orchestrator(StaticReviewSource::new(pages()))
        .run(db_path, &apps)
        .await
        .unwrap();
    assert_eq!(second.apps[0].status, AppStatus::Succeeded);
    assert_eq!(second.apps[0].inserted, 0);
    assert_eq!(second.total_reviews, 3);
    assert_eq!(second.total_banks, 1);
}

#[tokio::test]
async fn one_failing_app_does_not_stop_the_others() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("ingest.db");
    let db_path = db_path.to_str().unwrap();
    let apps = vec![
        AppSpec {
            bank_name: "Dashen".to_string(),
            app_id: "com.dashen.superapp".to_string(),
        },
        AppSpec {
            bank_name: "Abyssinia".to_string(),
            app_id: "com.boa.mobile".to_string(),
        },
    ];

    // The source serves one page and then fails every fetch: the first app
    // persists a partial collection, the second app gets nothing.
    let source = StaticReviewSource::failing_after(pages(), 1);
    let report = orchestrator(source).run(db_path, &apps).await.unwrap();

    assert_eq!(report.apps[0].status, AppStatus::Succeeded);
    assert!(report.apps[0].error.is_some());
    assert_eq!(report.apps[0].inserted, 2);

    assert_eq!(report.apps[1].status, AppStatus::FetchFailed);
    assert!(report.apps[1].error.is_some());
    assert_eq!(report.apps[1].inserted, 0);

    assert!(!report.all_apps_failed());
    assert_eq!(report.total_reviews, 2);
    assert_eq!(report.total_banks, 1);
}

#[tokio::test]
async fn empty_sources_are_skips_not_run_failures() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("ingest.db");
    let db_path = db_path.to_str().unwrap();
    let apps = vec![AppSpec {
        bank_name: "Dashen".to_string(),
        app_id: "com.dashen.superapp".to_string(),
    }];

    // The source terminates cleanly with nothing to serve.
    let report = orchestrator(StaticReviewSource::new(vec![Vec::new()]))
        .run(db_path, &apps)
        .await
        .unwrap();

    assert_eq!(report.apps[0].status, AppStatus::Empty);
    assert!(report.apps[0].error.is_none());
    assert!(!report.all_apps_failed());
    assert_eq!(report.total_reviews, 0);
}

#[tokio::test]
async fn same_text_under_different_banks_is_kept_for_both() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("ingest.db");
    let db_path = db_path.to_str().unwrap();
    let apps = vec![
        AppSpec {
            bank_name: "Dashen".to_string(),
            app_id: "com.dashen.superapp".to_string(),
        },
        AppSpec {
            bank_name: "Abyssinia".to_string(),
            app_id: "com.boa.mobile".to_string(),
        },
    ];

    let page = vec![vec![raw("Good app", 4.0, "2024-03-01")]];
    let report = orchestrator(StaticReviewSource::new(page))
        .run(db_path, &apps)
        .await
        .unwrap();

    // Identity includes the bank, so the shared text lands once per bank.
    assert_eq!(report.succeeded_apps(), 2);
    assert_eq!(report.total_banks, 2);

    let db = Database::new(db_path).await.unwrap();
    assert_eq!(db.count_reviews().await.unwrap(), 2);
}
