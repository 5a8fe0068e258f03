//! Timetable workflow service
//!
//! Entry point for every timetable operation. Mutations of one course are
//! serialized by a per-course async lock held across load, transition and
//! commit; different courses proceed in parallel.

use chrono::Utc;
use sams_common::catalog::Catalog;
use sams_common::events::{EventBus, SamsEvent};
use sams_common::users::{Action, UserDirectory};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{Caller, CourseRecord, VotingError};
use crate::generator::{self, ConstraintSelection, RetryPolicy, ScheduleGenerator};
use crate::models::{CourseStatus, FinalTimetable, Timetable, VoteResults};
use crate::store::CourseStore;

type CourseLock = Arc<tokio::sync::Mutex<()>>;

pub struct TimetableVoting {
    store: Arc<dyn CourseStore>,
    catalog: Arc<Catalog>,
    directory: Arc<UserDirectory>,
    events: EventBus,
    generator: Option<Arc<dyn ScheduleGenerator>>,
    retry: RetryPolicy,
    locks: Mutex<HashMap<String, CourseLock>>,
}

impl TimetableVoting {
    pub fn new(
        store: Arc<dyn CourseStore>,
        catalog: Arc<Catalog>,
        directory: Arc<UserDirectory>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            catalog,
            directory,
            events,
            generator: None,
            retry: RetryPolicy::default(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Enable schedule generation
    pub fn with_generator(mut self, generator: Arc<dyn ScheduleGenerator>, retry: RetryPolicy) -> Self {
        self.generator = Some(generator);
        self.retry = retry;
        self
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Lock guarding mutations of one course (created on first use)
    fn course_lock(&self, course_id: &str) -> CourseLock {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(course_id.to_string()).or_default().clone()
    }

    fn require_course(&self, course_id: &str) -> Result<(), VotingError> {
        self.catalog.require_course(course_id)?;
        Ok(())
    }

    /// Open voting on `candidates`, replacing any proposals, votes and final timetable
    ///
    /// Returns the published option ids in published order.
    pub async fn publish(
        &self,
        caller: &Caller,
        course_id: &str,
        candidates: Vec<Timetable>,
    ) -> Result<Vec<u32>, VotingError> {
        caller.authorize(Action::PublishProposals, course_id)?;
        self.require_course(course_id)?;

        let lock = self.course_lock(course_id);
        let _guard = lock.lock().await;

        let current = self.store.get(course_id).await?;
        let next = current.with_proposals(candidates).map_err(|e| {
            tracing::warn!(course_id = %course_id, error = %e, "Rejected proposal set");
            e
        })?;
        self.store.put(course_id, &next).await?;

        let options = next.options();
        tracing::info!(
            course_id = %course_id,
            published_by = %caller.user_id,
            options = ?options,
            discarded_votes = current.votes.voter_count(),
            replaced_final = current.final_timetable.is_some(),
            "Published timetable proposals"
        );

        self.events.emit_lossy(SamsEvent::TimetableProposed {
            course_id: course_id.to_string(),
            options: options.clone(),
            timestamp: Utc::now(),
        });

        Ok(options)
    }

    /// Record the caller's vote, replacing any earlier one
    pub async fn cast_vote(
        &self,
        caller: &Caller,
        course_id: &str,
        option: u32,
    ) -> Result<VoteResults, VotingError> {
        caller.authorize(Action::CastVote, course_id)?;
        self.require_course(course_id)?;

        let lock = self.course_lock(course_id);
        let _guard = lock.lock().await;

        let current = self.store.get(course_id).await?;
        let next = current.with_vote(&caller.user_id, option).map_err(|e| {
            tracing::warn!(course_id = %course_id, option, error = %e, "Rejected vote");
            e
        })?;
        self.store.put_vote(course_id, &caller.user_id, option).await?;

        let results = next.results_for(&caller.user_id);
        tracing::info!(
            course_id = %course_id,
            user_id = %caller.user_id,
            option,
            previous = ?current.votes.vote_of(&caller.user_id),
            total_votes = results.total_votes,
            "Vote recorded"
        );

        self.events.emit_lossy(SamsEvent::VoteCast {
            course_id: course_id.to_string(),
            option,
            total_votes: results.total_votes,
            timestamp: Utc::now(),
        });

        Ok(results)
    }

    /// Close voting and commit the winning candidate
    pub async fn finalize(&self, caller: &Caller, course_id: &str) -> Result<FinalTimetable, VotingError> {
        caller.authorize(Action::FinalizeTimetable, course_id)?;
        self.require_course(course_id)?;

        let lock = self.course_lock(course_id);
        let _guard = lock.lock().await;

        let current = self.store.get(course_id).await?;
        let (next, final_timetable) = current.finalized(Utc::now()).map_err(|e| {
            tracing::warn!(course_id = %course_id, error = %e, "Finalize rejected");
            e
        })?;
        self.store.put(course_id, &next).await?;

        tracing::info!(
            course_id = %course_id,
            finalized_by = %caller.user_id,
            option = final_timetable.timetable.option,
            votes = final_timetable.votes,
            "Timetable finalized"
        );

        self.events.emit_lossy(SamsEvent::TimetableFinalized {
            course_id: course_id.to_string(),
            option: final_timetable.timetable.option,
            votes: final_timetable.votes,
            timestamp: final_timetable.finalized_at,
        });

        Ok(final_timetable)
    }

    pub async fn proposed_timetables(&self, course_id: &str) -> Result<Option<Vec<Timetable>>, VotingError> {
        self.require_course(course_id)?;
        tracing::debug!(course_id = %course_id, "Loading proposed timetables");
        Ok(self.store.get(course_id).await?.proposals)
    }

    /// Tally for `user_id`; empty when no proposals are open
    pub async fn results(&self, course_id: &str, user_id: &str) -> Result<VoteResults, VotingError> {
        self.require_course(course_id)?;
        tracing::debug!(course_id = %course_id, user_id = %user_id, "Loading vote results");
        Ok(self.store.get(course_id).await?.results_for(user_id))
    }

    pub async fn final_timetable(&self, course_id: &str) -> Result<Option<FinalTimetable>, VotingError> {
        self.require_course(course_id)?;
        tracing::debug!(course_id = %course_id, "Loading final timetable");
        Ok(self.store.get(course_id).await?.final_timetable)
    }

    pub async fn status(&self, course_id: &str) -> Result<CourseStatus, VotingError> {
        self.require_course(course_id)?;
        let record: CourseRecord = self.store.get(course_id).await?;
        Ok(record.status(course_id))
    }

    /// Ask the schedule generator for candidates without publishing them
    ///
    /// Runs outside the course lock; no store is touched.
    pub async fn generate(
        &self,
        caller: &Caller,
        course_id: &str,
        selection: &ConstraintSelection,
    ) -> Result<Vec<Timetable>, VotingError> {
        caller.authorize(Action::GenerateTimetables, course_id)?;

        let backend = self.generator.as_ref().ok_or_else(|| {
            generator::GeneratorError::NotConfigured("no schedule generator API key configured".to_string())
        })?;

        let constraints = generator::build_constraints(&self.catalog, &self.directory, course_id, selection)?;

        tracing::info!(
            course_id = %course_id,
            semester = selection.semester,
            generator = backend.name(),
            subjects = constraints.subjects.len(),
            "Generating timetable candidates"
        );

        let candidates = generator::generate_with_retry(&**backend, &constraints, &self.retry).await?;
        let options: Vec<u32> = candidates.iter().map(|c| c.option).collect();

        self.events.emit_lossy(SamsEvent::TimetableGenerated {
            course_id: course_id.to_string(),
            semester: selection.semester,
            options,
            timestamp: Utc::now(),
        });

        Ok(candidates)
    }

    /// Generate candidates and publish them as the new proposal set
    pub async fn generate_and_publish(
        &self,
        caller: &Caller,
        course_id: &str,
        selection: &ConstraintSelection,
    ) -> Result<Vec<Timetable>, VotingError> {
        let candidates = self.generate(caller, course_id, selection).await?;
        self.publish(caller, course_id, candidates.clone()).await?;
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimetableEntry;
    use crate::store::MemoryCourseStore;

    fn service() -> TimetableVoting {
        TimetableVoting::new(
            Arc::new(MemoryCourseStore::new()),
            Arc::new(Catalog::seeded()),
            Arc::new(UserDirectory::seeded()),
            EventBus::new(16),
        )
    }

    fn candidate(option: u32, day: &str) -> Timetable {
        Timetable {
            option,
            schedule: vec![TimetableEntry {
                day: day.to_string(),
                time: "09:00 - 10:00".to_string(),
                subject: "Data Structures".to_string(),
                faculty: "Dr. Jane Doe".to_string(),
                classroom: "Classroom A1".to_string(),
            }],
            reasoning: String::new(),
        }
    }

    #[tokio::test]
    async fn test_course_lock_shared_per_course() {
        let voting = service();
        let a = voting.course_lock("CS101");
        let b = voting.course_lock("CS101");
        let c = voting.course_lock("EE201");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn test_unknown_course_is_not_found() {
        let voting = service();
        let result = voting
            .publish(&Caller::faculty("2"), "XX999", vec![candidate(1, "Monday")])
            .await;
        assert!(matches!(result, Err(VotingError::NotFound(_))));
        assert!(matches!(voting.status("XX999").await, Err(VotingError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_events_emitted_for_transitions() {
        let voting = service();
        let mut rx = voting.events.subscribe();

        voting
            .publish(&Caller::faculty("2"), "CS101", vec![candidate(1, "Monday"), candidate(2, "Tuesday")])
            .await
            .unwrap();
        voting.cast_vote(&Caller::student("3", "CS101"), "CS101", 2).await.unwrap();
        voting.finalize(&Caller::admin("1"), "CS101").await.unwrap();

        assert_eq!(rx.recv().await.unwrap().event_type(), "TimetableProposed");
        match rx.recv().await.unwrap() {
            SamsEvent::VoteCast { option, total_votes, .. } => {
                assert_eq!(option, 2);
                assert_eq!(total_votes, 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
        match rx.recv().await.unwrap() {
            SamsEvent::TimetableFinalized { option, votes, .. } => {
                assert_eq!(option, 2);
                assert_eq!(votes, 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_without_generator() {
        let voting = service();
        let result = voting
            .generate(&Caller::faculty("2"), "CS101", &ConstraintSelection::for_semester(1))
            .await;
        assert!(matches!(
            result,
            Err(VotingError::Generator(generator::GeneratorError::NotConfigured(_)))
        ));
    }
}
