//! Timetable data types
//!
//! Field names follow the schedule generator's JSON contract
//! (`option`, `schedule`, `reasoning`; `day`, `time`, `subject`, `faculty`, `classroom`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scheduled occupation of a time slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub day: String,
    pub time: String,
    pub subject: String,
    pub faculty: String,
    pub classroom: String,
}

/// A ranked candidate weekly timetable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timetable {
    /// Rank / identifier, unique within one proposal batch (1 = generator's top pick)
    pub option: u32,
    pub schedule: Vec<TimetableEntry>,
    pub reasoning: String,
}

/// The committed timetable of a course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalTimetable {
    #[serde(flatten)]
    pub timetable: Timetable,
    /// Votes the winning option received
    pub votes: u32,
    pub finalized_at: DateTime<Utc>,
}

/// Inputs for the schedule generator (all human-readable names)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableConstraints {
    pub course_name: String,
    pub semester: u32,
    pub subjects: Vec<String>,
    pub faculties: Vec<String>,
    pub classrooms: Vec<String>,
    pub time_slots: Vec<String>,
}

/// Vote tally as seen by one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResults {
    /// Option identifiers, in candidate order
    pub options: Vec<u32>,
    /// Vote count per option, aligned with `options`
    pub counts: Vec<u32>,
    /// The querying user's current vote
    pub user_vote: Option<u32>,
    pub total_votes: u32,
}

/// Lifecycle phase of a course's timetable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoursePhase {
    NoProposal,
    Voting,
    Finalized,
}

/// Summary of a course's timetable state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseStatus {
    pub course_id: String,
    pub phase: CoursePhase,
    pub options: Vec<u32>,
    pub total_votes: u32,
    pub finalized_option: Option<u32>,
}
