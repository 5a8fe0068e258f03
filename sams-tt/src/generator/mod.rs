//! Schedule candidate generation
//!
//! The scheduling itself is done by an external service behind
//! [`ScheduleGenerator`]. This module owns the contract around it: bounded
//! retries with a per-attempt timeout, and validation of whatever
//! comes back.

pub mod constraints;
pub mod gemini;

pub use constraints::{build_constraints, ConstraintSelection};
pub use gemini::GeminiGenerator;

use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

use crate::models::{Timetable, TimetableConstraints};

/// Schedule generator errors
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// No generator available (missing API key)
    #[error("Schedule generator not configured: {0}")]
    NotConfigured(String),

    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Attempt exceeded its time budget
    #[error("Generator request timed out after {0:?}")]
    Timeout(Duration),

    /// Generator API returned an error response
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Response could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Response parsed but violates the candidate contract
    #[error("Invalid generator payload: {0}")]
    InvalidPayload(String),
}

impl GeneratorError {
    /// Whether another attempt may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            GeneratorError::Network(_) | GeneratorError::Timeout(_) => true,
            GeneratorError::Api { status, .. } => *status == 429 || *status >= 500,
            GeneratorError::NotConfigured(_)
            | GeneratorError::Parse(_)
            | GeneratorError::InvalidPayload(_) => false,
        }
    }
}

/// External schedule candidate generator
#[async_trait]
pub trait ScheduleGenerator: Send + Sync {
    /// Generator identifier for logs (e.g. "gemini")
    fn name(&self) -> &'static str;

    /// Produce ranked candidate timetables for `constraints`
    async fn generate(
        &self,
        constraints: &TimetableConstraints,
    ) -> Result<Vec<Timetable>, GeneratorError>;
}

/// Retry budget for generator calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (minimum 1)
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(60),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

/// Call the generator, retrying transient failures with exponential backoff
///
/// Every attempt is bounded by `policy.attempt_timeout`. Returned candidates
/// are validated against `constraints` and sorted by option rank; an invalid
/// payload is not retried.
pub async fn generate_with_retry(
    generator: &dyn ScheduleGenerator,
    constraints: &TimetableConstraints,
    policy: &RetryPolicy,
) -> Result<Vec<Timetable>, GeneratorError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff = policy.initial_backoff;
    let mut attempt = 0;

    loop {
        attempt += 1;

        let outcome = match tokio::time::timeout(policy.attempt_timeout, generator.generate(constraints)).await {
            Ok(result) => result,
            Err(_) => Err(GeneratorError::Timeout(policy.attempt_timeout)),
        };

        match outcome {
            Ok(mut candidates) => {
                validate_candidates(constraints, &candidates)?;
                candidates.sort_by_key(|c| c.option);

                if attempt > 1 {
                    tracing::info!(
                        generator = generator.name(),
                        attempt,
                        "Schedule generation succeeded after retry"
                    );
                }
                return Ok(candidates);
            }
            Err(err) if err.is_transient() && attempt < max_attempts => {
                tracing::warn!(
                    generator = generator.name(),
                    attempt,
                    max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Schedule generation failed, will retry after backoff"
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(policy.max_backoff);
            }
            Err(err) => {
                tracing::error!(
                    generator = generator.name(),
                    attempt,
                    error = %err,
                    "Schedule generation failed"
                );
                return Err(err);
            }
        }
    }
}

/// Check generator output against the constraints it was given
///
/// Requires at least one candidate, unique option ids, entries that only name
/// subjects/faculty/classrooms/time slots from the constraint lists, and no
/// `(day, time)` slot used twice within a candidate.
pub fn validate_candidates(
    constraints: &TimetableConstraints,
    candidates: &[Timetable],
) -> Result<(), GeneratorError> {
    if candidates.is_empty() {
        return Err(GeneratorError::InvalidPayload("no timetables returned".to_string()));
    }

    let subjects: HashSet<&str> = constraints.subjects.iter().map(String::as_str).collect();
    let faculties: HashSet<&str> = constraints.faculties.iter().map(String::as_str).collect();
    let classrooms: HashSet<&str> = constraints.classrooms.iter().map(String::as_str).collect();
    let time_slots: HashSet<&str> = constraints.time_slots.iter().map(String::as_str).collect();

    let mut options = HashSet::new();
    for candidate in candidates {
        if !options.insert(candidate.option) {
            return Err(GeneratorError::InvalidPayload(format!(
                "duplicate option {}",
                candidate.option
            )));
        }
        if candidate.schedule.is_empty() {
            return Err(GeneratorError::InvalidPayload(format!(
                "option {} has an empty schedule",
                candidate.option
            )));
        }

        let mut slots = HashSet::new();
        for entry in &candidate.schedule {
            let unknown = if !subjects.contains(entry.subject.as_str()) {
                Some(("subject", &entry.subject))
            } else if !faculties.contains(entry.faculty.as_str()) {
                Some(("faculty", &entry.faculty))
            } else if !classrooms.contains(entry.classroom.as_str()) {
                Some(("classroom", &entry.classroom))
            } else if !time_slots.contains(entry.time.as_str()) {
                Some(("time slot", &entry.time))
            } else {
                None
            };

            if let Some((kind, name)) = unknown {
                return Err(GeneratorError::InvalidPayload(format!(
                    "option {} references unknown {} '{}'",
                    candidate.option, kind, name
                )));
            }

            if entry.day.trim().is_empty() {
                return Err(GeneratorError::InvalidPayload(format!(
                    "option {} has an entry without a day",
                    candidate.option
                )));
            }

            if !slots.insert((entry.day.as_str(), entry.time.as_str())) {
                return Err(GeneratorError::InvalidPayload(format!(
                    "option {} double-books {} {}",
                    candidate.option, entry.day, entry.time
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimetableEntry;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn constraints() -> TimetableConstraints {
        TimetableConstraints {
            course_name: "Computer Science".to_string(),
            semester: 2,
            subjects: vec!["Data Structures".to_string(), "Algorithms".to_string()],
            faculties: vec!["Dr. Jane Doe".to_string(), "Prof. Robert Davis".to_string()],
            classrooms: vec!["Classroom A1".to_string()],
            time_slots: vec!["09:00 - 10:00".to_string(), "10:00 - 11:00".to_string()],
        }
    }

    fn entry(day: &str, time: &str, subject: &str, faculty: &str) -> TimetableEntry {
        TimetableEntry {
            day: day.to_string(),
            time: time.to_string(),
            subject: subject.to_string(),
            faculty: faculty.to_string(),
            classroom: "Classroom A1".to_string(),
        }
    }

    fn valid_candidate(option: u32) -> Timetable {
        Timetable {
            option,
            schedule: vec![
                entry("Monday", "09:00 - 10:00", "Data Structures", "Dr. Jane Doe"),
                entry("Monday", "10:00 - 11:00", "Algorithms", "Prof. Robert Davis"),
            ],
            reasoning: "balanced".to_string(),
        }
    }

    /// Replays scripted outcomes, one per call
    struct ScriptedGenerator {
        outcomes: Mutex<Vec<Result<Vec<Timetable>, GeneratorError>>>,
        calls: AtomicU32,
    }

    impl ScriptedGenerator {
        fn new(mut outcomes: Vec<Result<Vec<Timetable>, GeneratorError>>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ScheduleGenerator for ScriptedGenerator {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn generate(
            &self,
            _constraints: &TimetableConstraints,
        ) -> Result<Vec<Timetable>, GeneratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(GeneratorError::Network("script exhausted".to_string())))
        }
    }

    /// Never answers
    struct StalledGenerator;

    #[async_trait]
    impl ScheduleGenerator for StalledGenerator {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn generate(
            &self,
            _constraints: &TimetableConstraints,
        ) -> Result<Vec<Timetable>, GeneratorError> {
            std::future::pending().await
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            attempt_timeout: Duration::from_millis(50),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(GeneratorError::Network("reset".into()).is_transient());
        assert!(GeneratorError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(GeneratorError::Api { status: 503, body: String::new() }.is_transient());
        assert!(GeneratorError::Api { status: 429, body: String::new() }.is_transient());
        assert!(!GeneratorError::Api { status: 400, body: String::new() }.is_transient());
        assert!(!GeneratorError::Parse("bad json".into()).is_transient());
        assert!(!GeneratorError::InvalidPayload("dup".into()).is_transient());
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let generator = ScriptedGenerator::new(vec![
            Err(GeneratorError::Network("connection reset".into())),
            Err(GeneratorError::Api { status: 503, body: "overloaded".into() }),
            Ok(vec![valid_candidate(2), valid_candidate(1)]),
        ]);

        let candidates = generate_with_retry(&generator, &constraints(), &fast_policy(3))
            .await
            .unwrap();

        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
        let options: Vec<u32> = candidates.iter().map(|c| c.option).collect();
        assert_eq!(options, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let generator = ScriptedGenerator::new(vec![
            Err(GeneratorError::Network("down".into())),
            Err(GeneratorError::Network("down".into())),
            Ok(vec![valid_candidate(1)]),
        ]);

        let result = generate_with_retry(&generator, &constraints(), &fast_policy(2)).await;

        assert!(matches!(result, Err(GeneratorError::Network(_))));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_parse_error_not_retried() {
        let generator = ScriptedGenerator::new(vec![
            Err(GeneratorError::Parse("not json".into())),
            Ok(vec![valid_candidate(1)]),
        ]);

        let result = generate_with_retry(&generator, &constraints(), &fast_policy(3)).await;

        assert!(matches!(result, Err(GeneratorError::Parse(_))));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_timeout() {
        let result = generate_with_retry(&StalledGenerator, &constraints(), &fast_policy(2)).await;
        assert!(matches!(result, Err(GeneratorError::Timeout(_))));
    }

    #[test]
    fn test_rejects_unknown_names() {
        let mut candidate = valid_candidate(1);
        candidate.schedule[0].classroom = "Rooftop".to_string();

        let err = validate_candidates(&constraints(), &[candidate]).unwrap_err();
        assert!(err.to_string().contains("Rooftop"));
    }

    #[test]
    fn test_rejects_double_booked_slot() {
        let mut candidate = valid_candidate(1);
        candidate.schedule[1].time = "09:00 - 10:00".to_string();

        assert!(matches!(
            validate_candidates(&constraints(), &[candidate]),
            Err(GeneratorError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_rejects_empty_and_duplicate_batches() {
        assert!(validate_candidates(&constraints(), &[]).is_err());
        assert!(validate_candidates(&constraints(), &[valid_candidate(1), valid_candidate(1)]).is_err());
        assert!(validate_candidates(&constraints(), &[valid_candidate(1), valid_candidate(2)]).is_ok());
    }
}
