//! Propose / toggle-upvote / pick-winner ledger shared by question authoring and answering.

use std::collections::HashSet;

use uuid::Uuid;

use crate::state::game::{PlayerId, ProposalId};

/// A team-submitted candidate awaiting the team's upvotes.
#[derive(Debug, Clone)]
pub struct Proposal<T> {
    /// Unique identifier for this proposal.
    pub id: ProposalId,
    /// Question draft or chosen answer index.
    pub payload: T,
    /// Player who created the proposal.
    pub submitted_by: PlayerId,
    /// Players currently upvoting; the submitter is included on creation.
    pub upvoters: HashSet<PlayerId>,
}

/// Ordered list of proposals owned by a single team.
#[derive(Debug, Clone)]
pub struct ProposalList<T> {
    proposals: Vec<Proposal<T>>,
}

impl<T> Default for ProposalList<T> {
    fn default() -> Self {
        Self {
            proposals: Vec::new(),
        }
    }
}

impl<T> ProposalList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new proposal pre-upvoted by its submitter and return its id.
    pub fn propose(&mut self, submitter: PlayerId, payload: T) -> ProposalId {
        let id = Uuid::new_v4();
        self.proposals.push(Proposal {
            id,
            payload,
            submitted_by: submitter,
            upvoters: HashSet::from([submitter]),
        });
        id
    }

    /// Add `voter` to the proposal's upvoters, or remove them if already present.
    ///
    /// Returns `false` when no proposal carries `proposal_id`.
    pub fn toggle_upvote(&mut self, proposal_id: ProposalId, voter: PlayerId) -> bool {
        let Some(proposal) = self.proposals.iter_mut().find(|p| p.id == proposal_id) else {
            return false;
        };

        if !proposal.upvoters.remove(&voter) {
            proposal.upvoters.insert(voter);
        }
        true
    }

    /// Proposals ordered by upvote count, highest first. Ties keep submission order.
    pub fn ranked(&self) -> Vec<&Proposal<T>> {
        let mut ranked: Vec<&Proposal<T>> = self.proposals.iter().collect();
        // `sort_by` is stable, which is what keeps ties in submission order.
        ranked.sort_by(|a, b| b.upvoters.len().cmp(&a.upvoters.len()));
        ranked
    }

    /// Payload of the most upvoted proposal, earliest first on ties.
    pub fn pick_winner(&self) -> Option<&T> {
        self.ranked().first().map(|proposal| &proposal.payload)
    }

    /// Proposals in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &Proposal<T>> {
        self.proposals.iter()
    }

    /// Number of proposals submitted so far.
    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    /// Whether nothing has been proposed yet.
    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}
