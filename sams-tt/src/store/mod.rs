//! Course state persistence
//!
//! A store maps a course id to its [`CourseRecord`]. Callers serialize
//! mutations per course (see [`crate::voting::TimetableVoting`]); a store only
//! has to make each write atomic.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryCourseStore;
pub use sqlite::SqliteCourseStore;

use async_trait::async_trait;
use sams_common::Result;

use crate::voting::CourseRecord;

#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Current record; an empty record for courses never written
    async fn get(&self, course_id: &str) -> Result<CourseRecord>;

    /// Replace the whole record in one atomic write
    async fn put(&self, course_id: &str, record: &CourseRecord) -> Result<()>;

    /// Record one user's choice, replacing any earlier one, leaving
    /// proposals and the final timetable untouched
    ///
    /// The caller has already checked `option` against the open proposal set.
    async fn put_vote(&self, course_id: &str, user_id: &str, option: u32) -> Result<()>;

    /// Backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}
