//! Timetable proposal, voting and finalization
//!
//! State machine per course: `NoProposal → Voting → Finalized`, re-opening to
//! `Voting` whenever a new proposal set is published.

pub mod ledger;
pub mod record;
pub mod service;

pub use ledger::VoteLedger;
pub use record::{validate_proposals, CourseRecord};
pub use service::TimetableVoting;

use sams_common::users::{Action, Role, User};
use thiserror::Error;

use crate::generator::GeneratorError;

/// Timetable workflow errors
#[derive(Debug, Error)]
pub enum VotingError {
    /// Malformed input (empty or inconsistent proposal batch, bad semester, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown course, no open proposal set, or an option that is not proposed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not possible in the current state (e.g. finalize with zero votes)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller's role or enrollment does not allow the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Schedule candidate generation failed
    #[error("Schedule generator error: {0}")]
    Generator(#[from] GeneratorError),

    /// Persistence failure
    #[error("Storage error: {0}")]
    Store(sams_common::Error),
}

impl From<sams_common::Error> for VotingError {
    fn from(err: sams_common::Error) -> Self {
        match err {
            sams_common::Error::NotFound(msg) => VotingError::NotFound(msg),
            sams_common::Error::InvalidInput(msg) => VotingError::Validation(msg),
            other => VotingError::Store(other),
        }
    }
}

/// Identity and role of whoever invokes a mutating operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
    /// Enrolled course for students
    pub course_id: Option<String>,
}

impl Caller {
    pub fn new(user_id: &str, role: Role, course_id: Option<&str>) -> Self {
        Self {
            user_id: user_id.to_string(),
            role,
            course_id: course_id.map(str::to_string),
        }
    }

    pub fn faculty(user_id: &str) -> Self {
        Self::new(user_id, Role::Faculty, None)
    }

    pub fn admin(user_id: &str) -> Self {
        Self::new(user_id, Role::Admin, None)
    }

    pub fn student(user_id: &str, course_id: &str) -> Self {
        Self::new(user_id, Role::Student, Some(course_id))
    }

    /// Check that this caller may perform `action` on `course_id`
    pub fn authorize(&self, action: Action, course_id: &str) -> Result<(), VotingError> {
        if !self.role.permits(action) {
            return Err(VotingError::Forbidden(format!(
                "role '{}' may not perform {:?}",
                self.role, action
            )));
        }

        // Students act only on the course they are enrolled in
        if self.role == Role::Student && self.course_id.as_deref() != Some(course_id) {
            return Err(VotingError::Forbidden(format!(
                "student '{}' is not enrolled in course '{}'",
                self.user_id, course_id
            )));
        }

        Ok(())
    }
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            role: user.role,
            course_id: user.course_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_limited_to_own_course() {
        let student = Caller::student("3", "CS101");
        assert!(student.authorize(Action::CastVote, "CS101").is_ok());
        assert!(matches!(
            student.authorize(Action::CastVote, "EE201"),
            Err(VotingError::Forbidden(_))
        ));
        assert!(matches!(
            student.authorize(Action::FinalizeTimetable, "CS101"),
            Err(VotingError::Forbidden(_))
        ));
    }

    #[test]
    fn test_student_without_enrollment_cannot_vote() {
        let student = Caller::new("9", Role::Student, None);
        assert!(matches!(
            student.authorize(Action::CastVote, "CS101"),
            Err(VotingError::Forbidden(_))
        ));
        assert!(matches!(
            student.authorize(Action::CastVote, "EE201"),
            Err(VotingError::Forbidden(_))
        ));
    }

    #[test]
    fn test_faculty_and_admin_manage_any_course() {
        for caller in [Caller::faculty("2"), Caller::admin("1")] {
            assert!(caller.authorize(Action::PublishProposals, "EE201").is_ok());
            assert!(caller.authorize(Action::FinalizeTimetable, "CS101").is_ok());
            assert!(caller.authorize(Action::CastVote, "CS101").is_err());
        }
    }

    #[test]
    fn test_common_error_mapping() {
        assert!(matches!(
            VotingError::from(sams_common::Error::NotFound("x".into())),
            VotingError::NotFound(_)
        ));
        assert!(matches!(
            VotingError::from(sams_common::Error::InvalidInput("x".into())),
            VotingError::Validation(_)
        ));
        assert!(matches!(
            VotingError::from(sams_common::Error::Internal("x".into())),
            VotingError::Store(_)
        ));
    }
}
