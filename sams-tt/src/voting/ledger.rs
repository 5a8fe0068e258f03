//! Vote ledger: one live choice per user

use std::collections::BTreeMap;

/// Per-course record of each user's current choice
///
/// Counts are never stored; [`VoteLedger::tally`] derives them against the
/// option list of the live proposal set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteLedger {
    votes: BTreeMap<String, u32>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `option` as the user's choice, returning the choice it replaced
    pub fn cast(&mut self, user_id: &str, option: u32) -> Option<u32> {
        self.votes.insert(user_id.to_string(), option)
    }

    pub fn vote_of(&self, user_id: &str) -> Option<u32> {
        self.votes.get(user_id).copied()
    }

    /// Number of distinct users with a live vote
    pub fn voter_count(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.votes.iter().map(|(user, &option)| (user.as_str(), option))
    }

    /// Vote counts aligned with `options`
    pub fn tally(&self, options: &[u32]) -> Vec<u32> {
        options
            .iter()
            .map(|option| self.votes.values().filter(|&&v| v == *option).count() as u32)
            .collect()
    }
}

impl FromIterator<(String, u32)> for VoteLedger {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self {
            votes: iter.into_iter().collect(),
        }
    }
}
