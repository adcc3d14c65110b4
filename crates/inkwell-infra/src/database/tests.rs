use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult, Transaction};
use serde_json::json;

use inkwell_core::RepoError;
use inkwell_core::domain::{PostPatch, PostStatus, RawTimestamp};
use inkwell_core::ports::{CommentRepository, PostQuery, PostRepository, ProfileRepository};
use inkwell_core::records::{CommentRecord, ProfilePatch, Stored};

use super::PostgresStore;
use super::entity::{comment, post, user};

fn post_row(id: &str, status: Option<&str>) -> post::Model {
    post::Model {
        id: id.to_owned(),
        title: Some("Rust in Production".to_owned()),
        excerpt: None,
        content: Some("Body".to_owned()),
        categories: Some(json!(["Tech"])),
        tags: Some(json!(["rust", 7])),
        image_url: None,
        timestamp: Some(Utc.timestamp_millis_opt(1_717_243_200_123).unwrap().into()),
        status: status.map(str::to_owned),
        author: Some(json!({ "id": "u1", "name": "Ada" })),
        author_id: Some("u1".to_owned()),
        comment_count: Some(2),
        last_modified_at: None,
    }
}

fn exec(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

#[tokio::test]
async fn test_find_post_maps_row_to_record() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_row("p1", Some("published"))]])
        .into_connection();
    let store = PostgresStore::new(db);

    let found = PostRepository::find_by_id(&store, "p1").await.unwrap().unwrap();

    assert_eq!(found.id, "p1");
    let record = found.record;
    assert_eq!(record.status, Some(PostStatus::Published));
    assert_eq!(record.categories, Some(vec!["Tech".to_owned()]));
    // A list with a non-string entry is unreadable, not half-read.
    assert_eq!(record.tags, None);
    assert_eq!(record.author.and_then(|a| a.name).as_deref(), Some("Ada"));
    assert_eq!(record.comment_count, Some(2));
    assert_eq!(
        record.timestamp.and_then(|t| t.to_datetime()).map(|t| t.timestamp_millis()),
        Some(1_717_243_200_123)
    );
}

#[tokio::test]
async fn test_unknown_status_reads_as_missing() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_row("p1", Some("archived"))]])
        .into_connection();
    let store = PostgresStore::new(db);

    let posts = store.query(&PostQuery::all()).await.unwrap();
    assert_eq!(posts[0].record.status, None);
}

#[tokio::test]
async fn test_query_filters_in_sql() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_row("p1", Some("draft"))]])
        .into_connection();
    let store = PostgresStore::new(db);

    let posts = store
        .query(&PostQuery::by_author("u1", PostStatus::Draft))
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);
}

#[tokio::test]
async fn test_update_reports_missing_row() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec(1), exec(0)])
        .into_connection();
    let store = PostgresStore::new(db);

    let patch = PostPatch::status(PostStatus::Published);
    assert!(PostRepository::update(&store, "p1", patch.clone()).await.unwrap());
    assert!(!PostRepository::update(&store, "gone", patch).await.unwrap());
}

#[tokio::test]
async fn test_insert_returns_generated_id() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec(1)])
        .into_connection();
    let store = PostgresStore::new(db);

    let id = PostRepository::insert(&store, Default::default()).await.unwrap();
    assert_eq!(id.len(), 32);
}

fn sql_of(log: &[Transaction]) -> Vec<Vec<String>> {
    log.iter()
        .map(|txn| txn.statements().iter().map(|stmt| stmt.sql.clone()).collect())
        .collect()
}

#[tokio::test]
async fn test_cascade_delete_runs_in_one_transaction() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec(3), exec(1)])
        .into_connection();
    let store = PostgresStore::new(db);

    store.delete_cascade("p1").await.unwrap();

    let log = sql_of(&store.into_db().into_transaction_log());
    assert_eq!(log.len(), 1);
    let statements = &log[0];
    assert_eq!(statements.len(), 4);
    assert_eq!(statements[0], "BEGIN");
    assert!(statements[1].starts_with(r#"DELETE FROM "comments""#));
    assert!(statements[2].starts_with(r#"DELETE FROM "posts""#));
    assert_eq!(statements[3], "COMMIT");
}

#[tokio::test]
async fn test_cascade_delete_failure_is_never_committed() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<comment::Model>::new()])
        .append_exec_results([exec(2)])
        .append_exec_errors([DbErr::Custom("post row locked".to_owned())])
        .into_connection();
    let store = PostgresStore::new(db);

    let sizes = Arc::new(Mutex::new(Vec::new()));
    let sink = sizes.clone();
    let _sub = store
        .watch(
            "p1",
            Arc::new(move |snapshot: Vec<Stored<CommentRecord>>| {
                sink.lock().unwrap().push(snapshot.len());
            }),
        )
        .await
        .unwrap();

    let err = store.delete_cascade("p1").await.unwrap_err();
    assert!(matches!(err, RepoError::Query(_)));

    // The initial snapshot read runs outside any transaction.
    let log: Vec<_> = sql_of(&store.into_db().into_transaction_log())
        .into_iter()
        .filter(|statements| statements.first().map(String::as_str) == Some("BEGIN"))
        .collect();
    assert_eq!(log.len(), 1);
    let statements = &log[0];
    assert!(statements.iter().any(|sql| sql.starts_with(r#"DELETE FROM "comments""#)));
    assert!(!statements.iter().any(|sql| sql == "COMMIT"));
    assert_eq!(statements.last().map(String::as_str), Some("ROLLBACK"));

    // Only the initial snapshot; a failed delete announces nothing.
    assert_eq!(*sizes.lock().unwrap(), vec![0]);
}

#[tokio::test]
async fn test_comment_insert_pushes_fresh_snapshot() {
    let row = comment::Model {
        id: "c1".to_owned(),
        post_id: "p1".to_owned(),
        user_id: Some("u2".to_owned()),
        user: Some(json!({ "id": "u2", "name": "Grace" })),
        content: Some("Nice".to_owned()),
        timestamp: Some(Utc::now().into()),
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<comment::Model>::new(), vec![row]])
        .append_exec_results([exec(1)])
        .into_connection();
    let store = PostgresStore::new(db);

    let sizes = Arc::new(Mutex::new(Vec::new()));
    let sink = sizes.clone();
    let _sub = store
        .watch(
            "p1",
            Arc::new(move |snapshot: Vec<Stored<CommentRecord>>| {
                sink.lock().unwrap().push(snapshot.len());
            }),
        )
        .await
        .unwrap();

    CommentRepository::insert(&store, "p1", CommentRecord::default())
        .await
        .unwrap();

    assert_eq!(*sizes.lock().unwrap(), vec![0, 1]);
}

#[tokio::test]
async fn test_profile_round_trip_through_rows() {
    let now = Utc::now();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![user::Model {
            id: "u1".to_owned(),
            name: Some("Ada".to_owned()),
            email: Some("ada@example.com".to_owned()),
            avatar_url: None,
            bio: Some(String::new()),
            created_at: Some(now.into()),
            last_updated_at: None,
        }]])
        .into_connection();
    let store = PostgresStore::new(db);

    let record = ProfileRepository::find_by_id(&store, "u1").await.unwrap().unwrap();
    assert_eq!(record.name.as_deref(), Some("Ada"));
    assert!(matches!(record.created_at, Some(RawTimestamp::Native(_))));
}

#[tokio::test]
async fn test_profile_update_of_missing_row_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec(0)])
        .into_connection();
    let store = PostgresStore::new(db);

    let patch = ProfilePatch {
        bio: Some("hello".to_owned()),
        ..ProfilePatch::default()
    };
    let err = ProfileRepository::update(&store, "u1", patch).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound));
}
