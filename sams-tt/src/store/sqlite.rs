//! SQLite course store
//!
//! Row per proposal, row per vote, row per final timetable. `put` rewrites
//! all rows of a course inside one transaction; `put_vote` upserts a single
//! vote row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sams_common::{Error, Result};
use sqlx::SqlitePool;

use super::CourseStore;
use crate::models::{FinalTimetable, Timetable, TimetableEntry};
use crate::voting::{CourseRecord, VoteLedger};

pub struct SqliteCourseStore {
    db: SqlitePool,
}

impl SqliteCourseStore {
    /// Wrap a pool whose schema was created by `sams_common::db`
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

fn to_option(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::Internal(format!("invalid option value {} in database", value)))
}

fn encode_schedule(schedule: &[TimetableEntry]) -> Result<String> {
    serde_json::to_string(schedule)
        .map_err(|e| Error::Internal(format!("Failed to serialize schedule: {}", e)))
}

fn decode_schedule(json: &str) -> Result<Vec<TimetableEntry>> {
    serde_json::from_str(json).map_err(|e| Error::Internal(format!("Failed to parse stored schedule: {}", e)))
}

#[async_trait]
impl CourseStore for SqliteCourseStore {
    async fn get(&self, course_id: &str) -> Result<CourseRecord> {
        let proposal_rows = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT option, schedule_json, reasoning FROM timetable_proposals WHERE course_id = ? ORDER BY position",
        )
        .bind(course_id)
        .fetch_all(&self.db)
        .await?;

        let proposals = if proposal_rows.is_empty() {
            None
        } else {
            let mut candidates = Vec::with_capacity(proposal_rows.len());
            for (option, schedule_json, reasoning) in proposal_rows {
                candidates.push(Timetable {
                    option: to_option(option)?,
                    schedule: decode_schedule(&schedule_json)?,
                    reasoning,
                });
            }
            Some(candidates)
        };

        let vote_rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT user_id, option FROM timetable_votes WHERE course_id = ?",
        )
        .bind(course_id)
        .fetch_all(&self.db)
        .await?;

        let votes = vote_rows
            .into_iter()
            .map(|(user_id, option)| to_option(option).map(|o| (user_id, o)))
            .collect::<Result<VoteLedger>>()?;

        let final_row = sqlx::query_as::<_, (i64, String, String, i64, String)>(
            "SELECT option, schedule_json, reasoning, votes, finalized_at FROM final_timetables WHERE course_id = ?",
        )
        .bind(course_id)
        .fetch_optional(&self.db)
        .await?;

        let final_timetable = match final_row {
            Some((option, schedule_json, reasoning, votes, finalized_at)) => {
                let finalized_at = DateTime::parse_from_rfc3339(&finalized_at)
                    .map_err(|e| Error::Internal(format!("invalid finalized_at '{}': {}", finalized_at, e)))?
                    .with_timezone(&Utc);
                Some(FinalTimetable {
                    timetable: Timetable {
                        option: to_option(option)?,
                        schedule: decode_schedule(&schedule_json)?,
                        reasoning,
                    },
                    votes: to_option(votes)?,
                    finalized_at,
                })
            }
            None => None,
        };

        Ok(CourseRecord {
            proposals,
            votes,
            final_timetable,
        })
    }

    async fn put(&self, course_id: &str, record: &CourseRecord) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM timetable_proposals WHERE course_id = ?")
            .bind(course_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM timetable_votes WHERE course_id = ?")
            .bind(course_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM final_timetables WHERE course_id = ?")
            .bind(course_id)
            .execute(&mut *tx)
            .await?;

        if let Some(proposals) = &record.proposals {
            for (position, candidate) in proposals.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO timetable_proposals (course_id, option, position, schedule_json, reasoning) VALUES (?, ?, ?, ?, ?)",
                )
                .bind(course_id)
                .bind(i64::from(candidate.option))
                .bind(position as i64)
                .bind(encode_schedule(&candidate.schedule)?)
                .bind(&candidate.reasoning)
                .execute(&mut *tx)
                .await?;
            }
        }

        for (user_id, option) in record.votes.iter() {
            sqlx::query("INSERT INTO timetable_votes (course_id, user_id, option) VALUES (?, ?, ?)")
                .bind(course_id)
                .bind(user_id)
                .bind(i64::from(option))
                .execute(&mut *tx)
                .await?;
        }

        if let Some(final_timetable) = &record.final_timetable {
            sqlx::query(
                "INSERT INTO final_timetables (course_id, option, schedule_json, reasoning, votes, finalized_at) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(course_id)
            .bind(i64::from(final_timetable.timetable.option))
            .bind(encode_schedule(&final_timetable.timetable.schedule)?)
            .bind(&final_timetable.timetable.reasoning)
            .bind(i64::from(final_timetable.votes))
            .bind(final_timetable.finalized_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn put_vote(&self, course_id: &str, user_id: &str, option: u32) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO timetable_votes (course_id, user_id, option)
            VALUES (?, ?, ?)
            ON CONFLICT(course_id, user_id) DO UPDATE SET
                option = excluded.option,
                cast_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .bind(i64::from(option))
        .execute(&self.db)
        .await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
