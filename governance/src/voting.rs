//! Quorum voting over a single pending action.
//!
//! The threshold is a strict majority of the roster size captured when the
//! session opens. Approval needs `yes * 2 > eligible`; rejection needs
//! `no * 2 >= eligible`. Whichever side crosses first finalizes the session,
//! inside the vote call that crossed it.

use std::collections::BTreeMap;

use guild_types::Principal;
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;
use crate::registry::PolicyRegistry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
    Yes,
    No,
}

impl From<bool> for VoteChoice {
    fn from(yes: bool) -> Self {
        if yes {
            Self::Yes
        } else {
            Self::No
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Pending,
    Approved,
    Rejected,
}

/// Tally as `(yes, no, total)` where `total` is the number of votes cast.
pub type VotingResults = (usize, usize, usize);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingSession {
    eligible_count: usize,
    votes: BTreeMap<Principal, VoteChoice>,
    yes: usize,
    no: usize,
    outcome: Outcome,
}

impl VotingSession {
    /// Open a session with the initiator's yes already recorded.
    ///
    /// With a single eligible voter the implicit yes is already a majority
    /// and the session opens `Approved`.
    pub fn open(eligible_count: usize, initiator: Principal) -> Result<Self, GovernanceError> {
        if eligible_count == 0 {
            return Err(GovernanceError::InvalidQuorum);
        }
        let mut session = Self {
            eligible_count,
            votes: BTreeMap::new(),
            yes: 0,
            no: 0,
            outcome: Outcome::Pending,
        };
        session.record(initiator, VoteChoice::Yes);
        Ok(session)
    }

    /// Cast a vote. Returns the outcome after this vote; `Approved` means
    /// this call approved the session.
    pub fn vote(
        &mut self,
        roster: &PolicyRegistry,
        member: &Principal,
        choice: VoteChoice,
    ) -> Result<Outcome, GovernanceError> {
        if self.outcome != Outcome::Pending {
            return Err(GovernanceError::AlreadyFinalized);
        }
        if !roster.is_member(member) {
            return Err(GovernanceError::NotEligible(member.clone()));
        }
        if self.votes.contains_key(member) {
            return Err(GovernanceError::AlreadyVoted(member.clone()));
        }
        self.record(member.clone(), choice);
        Ok(self.outcome)
    }

    fn record(&mut self, member: Principal, choice: VoteChoice) {
        self.votes.insert(member, choice);
        match choice {
            VoteChoice::Yes => self.yes += 1,
            VoteChoice::No => self.no += 1,
        }
        if self.yes * 2 > self.eligible_count {
            self.outcome = Outcome::Approved;
        } else if self.no * 2 >= self.eligible_count {
            self.outcome = Outcome::Rejected;
        }
    }

    /// Check a deserialized session against its own vote record: the tally
    /// must match the recorded votes and the outcome must match the tally.
    pub(crate) fn validate(&self) -> Result<(), String> {
        let yes = self.votes.values().filter(|c| **c == VoteChoice::Yes).count();
        let no = self.votes.len() - yes;
        if self.eligible_count == 0 {
            return Err("session has no eligible voters".to_string());
        }
        if (yes, no) != (self.yes, self.no) {
            return Err(format!(
                "tally ({}, {}) disagrees with recorded votes ({yes}, {no})",
                self.yes, self.no
            ));
        }
        let approved = yes * 2 > self.eligible_count;
        let rejected = no * 2 >= self.eligible_count;
        let consistent = match self.outcome {
            Outcome::Pending => !approved && !rejected,
            Outcome::Approved => approved,
            Outcome::Rejected => rejected,
        };
        if !consistent {
            return Err(format!(
                "outcome {:?} does not follow from tally ({yes}, {no}) of {}",
                self.outcome, self.eligible_count
            ));
        }
        Ok(())
    }

    pub fn results(&self) -> VotingResults {
        (self.yes, self.no, self.yes + self.no)
    }

    pub fn is_finished(&self) -> bool {
        self.outcome != Outcome::Pending
    }

    pub fn is_approved(&self) -> bool {
        self.outcome == Outcome::Approved
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn eligible_count(&self) -> usize {
        self.eligible_count
    }

    pub fn has_voted(&self, member: &Principal) -> bool {
        self.votes.contains_key(member)
    }

    pub fn vote_of(&self, member: &Principal) -> Option<VoteChoice> {
        self.votes.get(member).copied()
    }
}
