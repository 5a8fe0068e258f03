//! Per-course timetable state and its transitions
//!
//! A [`CourseRecord`] is the unit of storage and locking: the proposal set,
//! the vote ledger and the final timetable of one course. Transitions take
//! `&self` and return a new record, so a rejected operation can never leave a
//! half-applied state behind.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use super::ledger::VoteLedger;
use super::VotingError;
use crate::models::{CoursePhase, CourseStatus, FinalTimetable, Timetable, VoteResults};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseRecord {
    /// Candidates open for voting, in published order
    pub proposals: Option<Vec<Timetable>>,
    pub votes: VoteLedger,
    pub final_timetable: Option<FinalTimetable>,
}

impl CourseRecord {
    pub fn phase(&self) -> CoursePhase {
        if self.proposals.is_some() {
            CoursePhase::Voting
        } else if self.final_timetable.is_some() {
            CoursePhase::Finalized
        } else {
            CoursePhase::NoProposal
        }
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_none() && self.votes.is_empty() && self.final_timetable.is_none()
    }

    /// Option identifiers of the live proposal set (empty when none)
    pub fn options(&self) -> Vec<u32> {
        self.proposals
            .as_ref()
            .map(|p| p.iter().map(|t| t.option).collect())
            .unwrap_or_default()
    }

    /// Open voting on `candidates`, discarding votes and any final timetable
    pub fn with_proposals(&self, candidates: Vec<Timetable>) -> Result<Self, VotingError> {
        validate_proposals(&candidates)?;

        Ok(Self {
            proposals: Some(candidates),
            votes: VoteLedger::new(),
            final_timetable: None,
        })
    }

    /// Record (or replace) `user_id`'s vote
    pub fn with_vote(&self, user_id: &str, option: u32) -> Result<Self, VotingError> {
        let proposals = self
            .proposals
            .as_ref()
            .ok_or_else(|| VotingError::NotFound("no timetable proposals are open for voting".to_string()))?;

        if !proposals.iter().any(|t| t.option == option) {
            return Err(VotingError::NotFound(format!(
                "option {} is not among the proposed timetables",
                option
            )));
        }

        let mut next = self.clone();
        next.votes.cast(user_id, option);
        Ok(next)
    }

    /// Tally as seen by `user_id`
    pub fn results_for(&self, user_id: &str) -> VoteResults {
        if self.proposals.is_none() {
            return VoteResults::default();
        }

        let options = self.options();
        let counts = self.votes.tally(&options);
        let total_votes = counts.iter().sum();

        VoteResults {
            options,
            counts,
            user_vote: self.votes.vote_of(user_id),
            total_votes,
        }
    }

    /// Close voting: commit the winner, drop proposals and votes
    ///
    /// The winner has the highest count; ties go to the lowest option id.
    /// Fails with `NotFound` when voting is not open and `Conflict` when no
    /// votes were cast.
    pub fn finalized(&self, now: DateTime<Utc>) -> Result<(Self, FinalTimetable), VotingError> {
        let proposals = self
            .proposals
            .as_ref()
            .ok_or_else(|| VotingError::NotFound("no timetable proposals to finalize".to_string()))?;

        let options: Vec<u32> = proposals.iter().map(|t| t.option).collect();
        let counts = self.votes.tally(&options);

        let (winner, votes) = select_winner(proposals, &counts).ok_or_else(|| {
            VotingError::Conflict("no votes have been cast; cannot determine a winning timetable".to_string())
        })?;

        let final_timetable = FinalTimetable {
            timetable: winner.clone(),
            votes,
            finalized_at: now,
        };

        let next = Self {
            proposals: None,
            votes: VoteLedger::new(),
            final_timetable: Some(final_timetable.clone()),
        };

        Ok((next, final_timetable))
    }

    pub fn status(&self, course_id: &str) -> CourseStatus {
        CourseStatus {
            course_id: course_id.to_string(),
            phase: self.phase(),
            options: self.options(),
            total_votes: self.votes.voter_count() as u32,
            finalized_option: self.final_timetable.as_ref().map(|f| f.timetable.option),
        }
    }
}

/// Highest count wins, lowest option id among tied maxima; `None` with zero votes
fn select_winner<'a>(proposals: &'a [Timetable], counts: &[u32]) -> Option<(&'a Timetable, u32)> {
    let mut best: Option<(&Timetable, u32)> = None;

    for (candidate, &count) in proposals.iter().zip(counts) {
        if count == 0 {
            continue;
        }
        best = match best {
            Some((leader, leader_count))
                if leader_count > count
                    || (leader_count == count && leader.option < candidate.option) =>
            {
                Some((leader, leader_count))
            }
            _ => Some((candidate, count)),
        };
    }

    best
}

/// Publish-time checks: non-empty, unique options, no slot used twice per candidate
pub fn validate_proposals(candidates: &[Timetable]) -> Result<(), VotingError> {
    if candidates.is_empty() {
        return Err(VotingError::Validation(
            "at least one candidate timetable is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for candidate in candidates {
        if !seen.insert(candidate.option) {
            return Err(VotingError::Validation(format!(
                "duplicate option identifier {}",
                candidate.option
            )));
        }

        let mut slots = HashSet::new();
        for entry in &candidate.schedule {
            if !slots.insert((entry.day.as_str(), entry.time.as_str())) {
                return Err(VotingError::Validation(format!(
                    "option {} schedules {} {} more than once",
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

    fn entry(day: &str, time: &str) -> TimetableEntry {
        TimetableEntry {
            day: day.to_string(),
            time: time.to_string(),
            subject: "Algorithms".to_string(),
            faculty: "Prof. Robert Davis".to_string(),
            classroom: "Classroom A1".to_string(),
        }
    }

    fn candidate(option: u32) -> Timetable {
        Timetable {
            option,
            schedule: vec![entry("Monday", "09:00 - 10:00")],
            reasoning: format!("option {}", option),
        }
    }

    fn voting_on(options: &[u32]) -> CourseRecord {
        CourseRecord::default()
            .with_proposals(options.iter().map(|&o| candidate(o)).collect())
            .unwrap()
    }

    fn with_votes(mut record: CourseRecord, votes: &[(usize, u32)]) -> CourseRecord {
        let mut voter = 0;
        for &(count, option) in votes {
            for _ in 0..count {
                record = record.with_vote(&format!("student-{}", voter), option).unwrap();
                voter += 1;
            }
        }
        record
    }

    #[test]
    fn test_phase_transitions() {
        let empty = CourseRecord::default();
        assert_eq!(empty.phase(), CoursePhase::NoProposal);
        assert!(empty.is_empty());

        let voting = with_votes(voting_on(&[1, 2]), &[(1, 2)]);
        assert_eq!(voting.phase(), CoursePhase::Voting);

        let (finalized, _) = voting.finalized(Utc::now()).unwrap();
        assert_eq!(finalized.phase(), CoursePhase::Finalized);

        let reopened = finalized.with_proposals(vec![candidate(1)]).unwrap();
        assert_eq!(reopened.phase(), CoursePhase::Voting);
        assert!(reopened.final_timetable.is_none());
    }

    #[test]
    fn test_tie_goes_to_lowest_option() {
        let record = with_votes(voting_on(&[1, 2, 3]), &[(5, 1), (5, 2), (2, 3)]);
        let (_, final_timetable) = record.finalized(Utc::now()).unwrap();
        assert_eq!(final_timetable.timetable.option, 1);
        assert_eq!(final_timetable.votes, 5);
    }

    #[test]
    fn test_tie_uses_option_id_not_position() {
        let record = with_votes(voting_on(&[3, 2, 1]), &[(2, 3), (2, 2), (1, 1)]);
        let (_, final_timetable) = record.finalized(Utc::now()).unwrap();
        assert_eq!(final_timetable.timetable.option, 2);
    }

    #[test]
    fn test_strict_majority_wins() {
        let record = with_votes(voting_on(&[1, 2, 3]), &[(1, 1), (3, 3)]);
        let (_, final_timetable) = record.finalized(Utc::now()).unwrap();
        assert_eq!(final_timetable.timetable.option, 3);
        assert_eq!(final_timetable.votes, 3);
    }

    #[test]
    fn test_zero_votes_is_conflict() {
        let record = voting_on(&[1, 2, 3]);
        assert!(matches!(
            record.finalized(Utc::now()),
            Err(VotingError::Conflict(_))
        ));
    }

    #[test]
    fn test_finalize_without_proposals_is_not_found() {
        assert!(matches!(
            CourseRecord::default().finalized(Utc::now()),
            Err(VotingError::NotFound(_))
        ));
    }

    #[test]
    fn test_vote_for_unknown_option_rejected() {
        let record = voting_on(&[1, 2, 3]);
        assert!(matches!(
            record.with_vote("u1", 4),
            Err(VotingError::NotFound(_))
        ));
        assert!(matches!(
            CourseRecord::default().with_vote("u1", 1),
            Err(VotingError::NotFound(_))
        ));
    }

    #[test]
    fn test_results_without_proposals_are_empty() {
        let results = CourseRecord::default().results_for("u1");
        assert!(results.counts.is_empty());
        assert_eq!(results.user_vote, None);
    }

    #[test]
    fn test_validation_rejects_bad_batches() {
        assert!(matches!(
            validate_proposals(&[]),
            Err(VotingError::Validation(_))
        ));
        assert!(matches!(
            validate_proposals(&[candidate(1), candidate(1)]),
            Err(VotingError::Validation(_))
        ));

        let mut clash = candidate(2);
        clash.schedule.push(entry("Monday", "09:00 - 10:00"));
        assert!(matches!(
            validate_proposals(&[candidate(1), clash]),
            Err(VotingError::Validation(_))
        ));
    }
}
