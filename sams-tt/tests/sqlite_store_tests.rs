//! Integration tests for the SQLite course store
//!
//! Tests cover:
//! - Record round trip (proposal order, votes, final timetable)
//! - `put` replacing every row of a course
//! - `put_vote` touching only the voter's row
//! - Course isolation inside shared tables
//! - State surviving a reopen of the database file

use chrono::{TimeZone, Utc};
use sams_common::catalog::Catalog;
use sams_common::events::EventBus;
use sams_common::users::UserDirectory;
use sams_tt::models::{FinalTimetable, Timetable, TimetableEntry};
use sams_tt::store::{CourseStore, SqliteCourseStore};
use sams_tt::voting::{Caller, CourseRecord, TimetableVoting, VoteLedger};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Test helper: in-memory database with the timetable schema
async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should open in-memory database");
    sams_common::db::create_timetable_tables(&pool)
        .await
        .expect("Should create tables");
    pool
}

fn candidate(option: u32, day: &str) -> Timetable {
    Timetable {
        option,
        schedule: vec![
            TimetableEntry {
                day: day.to_string(),
                time: "09:00 - 10:00".to_string(),
                subject: "Circuit Theory".to_string(),
                faculty: "Dr. Emily Wilson".to_string(),
                classroom: "Electronics Lab".to_string(),
            },
            TimetableEntry {
                day: day.to_string(),
                time: "14:00 - 15:00".to_string(),
                subject: "Engineering Physics".to_string(),
                faculty: "Prof. Robert Davis".to_string(),
                classroom: "Classroom B2".to_string(),
            },
        ],
        reasoning: format!("option {} keeps {} light", option, day),
    }
}

fn voting_record() -> CourseRecord {
    let votes: VoteLedger = [("5", 2), ("6", 3), ("7", 2)]
        .into_iter()
        .map(|(u, o)| (u.to_string(), o))
        .collect();

    CourseRecord {
        proposals: Some(vec![
            candidate(3, "Wednesday"),
            candidate(1, "Monday"),
            candidate(2, "Tuesday"),
        ]),
        votes,
        final_timetable: None,
    }
}

fn finalized_record() -> CourseRecord {
    CourseRecord {
        proposals: None,
        votes: VoteLedger::new(),
        final_timetable: Some(FinalTimetable {
            timetable: candidate(2, "Tuesday"),
            votes: 2,
            finalized_at: Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap(),
        }),
    }
}

#[tokio::test]
async fn test_unknown_course_is_empty() {
    let store = SqliteCourseStore::new(setup_test_db().await);
    assert!(store.get("EE201").await.unwrap().is_empty());
    assert_eq!(store.backend_name(), "sqlite");
}

#[tokio::test]
async fn test_voting_record_round_trip() {
    let store = SqliteCourseStore::new(setup_test_db().await);
    let record = voting_record();

    store.put("EE201", &record).await.unwrap();
    let loaded = store.get("EE201").await.unwrap();

    assert_eq!(loaded, record);
    assert_eq!(loaded.options(), vec![3, 1, 2]);
    assert_eq!(loaded.votes.tally(&[1, 2, 3]), vec![0, 2, 1]);
}

#[tokio::test]
async fn test_finalized_record_round_trip() {
    let store = SqliteCourseStore::new(setup_test_db().await);
    let record = finalized_record();

    store.put("EE201", &record).await.unwrap();

    assert_eq!(store.get("EE201").await.unwrap(), record);
}

#[tokio::test]
async fn test_put_replaces_all_rows() {
    let pool = setup_test_db().await;
    let store = SqliteCourseStore::new(pool.clone());

    store.put("EE201", &voting_record()).await.unwrap();
    store.put("EE201", &finalized_record()).await.unwrap();

    assert_eq!(store.get("EE201").await.unwrap(), finalized_record());

    let (proposals,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM timetable_proposals WHERE course_id = 'EE201'")
            .fetch_one(&pool)
            .await
            .unwrap();
    let (votes,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM timetable_votes WHERE course_id = 'EE201'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(proposals, 0);
    assert_eq!(votes, 0);

    store.put("EE201", &CourseRecord::default()).await.unwrap();
    assert!(store.get("EE201").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_put_vote_upserts_single_row() {
    let pool = setup_test_db().await;
    let store = SqliteCourseStore::new(pool.clone());
    store.put("EE201", &voting_record()).await.unwrap();

    // Marker that a full rewrite of the course would erase
    sqlx::query("UPDATE timetable_proposals SET reasoning = 'marker' WHERE course_id = 'EE201' AND option = 1")
        .execute(&pool)
        .await
        .unwrap();

    store.put_vote("EE201", "6", 1).await.unwrap();
    store.put_vote("EE201", "8", 3).await.unwrap();

    let loaded = store.get("EE201").await.unwrap();
    assert_eq!(loaded.votes.vote_of("6"), Some(1));
    assert_eq!(loaded.votes.vote_of("8"), Some(3));
    assert_eq!(loaded.votes.tally(&[1, 2, 3]), vec![1, 2, 1]);
    assert_eq!(loaded.options(), vec![3, 1, 2]);

    let marker = loaded
        .proposals
        .as_ref()
        .unwrap()
        .iter()
        .find(|t| t.option == 1)
        .unwrap();
    assert_eq!(marker.reasoning, "marker");

    let (votes,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM timetable_votes WHERE course_id = 'EE201'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(votes, 4);
}

#[tokio::test]
async fn test_courses_share_tables_without_leaking() {
    let store = SqliteCourseStore::new(setup_test_db().await);

    store.put("EE201", &voting_record()).await.unwrap();
    store.put("CS101", &finalized_record()).await.unwrap();
    store.put("CS101", &CourseRecord::default()).await.unwrap();

    assert_eq!(store.get("EE201").await.unwrap(), voting_record());
    assert!(store.get("CS101").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_workflow_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("sams.db");

    {
        let pool = sams_common::db::init_database(&db_path).await.unwrap();
        let voting = TimetableVoting::new(
            Arc::new(SqliteCourseStore::new(pool.clone())),
            Arc::new(Catalog::seeded()),
            Arc::new(UserDirectory::seeded()),
            EventBus::new(16),
        );

        voting
            .publish(
                &Caller::faculty("11"),
                "EE201",
                vec![candidate(1, "Monday"), candidate(2, "Tuesday")],
            )
            .await
            .unwrap();
        voting.cast_vote(&Caller::student("5", "EE201"), "EE201", 2).await.unwrap();
        voting.cast_vote(&Caller::student("6", "EE201"), "EE201", 2).await.unwrap();
        pool.close().await;
    }

    let pool = sams_common::db::init_database(&db_path).await.unwrap();
    let voting = TimetableVoting::new(
        Arc::new(SqliteCourseStore::new(pool)),
        Arc::new(Catalog::seeded()),
        Arc::new(UserDirectory::seeded()),
        EventBus::new(16),
    );

    let results = voting.results("EE201", "5").await.unwrap();
    assert_eq!(results.counts, vec![0, 2]);
    assert_eq!(results.user_vote, Some(2));

    let final_timetable = voting.finalize(&Caller::admin("1"), "EE201").await.unwrap();
    assert_eq!(final_timetable.timetable.option, 2);
    assert_eq!(
        voting.final_timetable("EE201").await.unwrap(),
        Some(final_timetable)
    );
    assert!(voting.proposed_timetables("EE201").await.unwrap().is_none());
}
