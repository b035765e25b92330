//! Vote tallying: ranking, winner and percentage computation.

use serde::Serialize;

use crate::models::Proposal;

/// A proposal with its 1-based position in the ranking.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RankedProposal {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub rank: usize,
}

/// Order proposals by descending vote count.
///
/// The sort is stable: proposals with equal votes keep their input order and
/// receive consecutive ranks (no shared ranks).
pub fn rank(options: &[Proposal]) -> Vec<RankedProposal> {
    let mut sorted: Vec<&Proposal> = options.iter().collect();
    sorted.sort_by(|a, b| b.votes.cmp(&a.votes));

    sorted
        .into_iter()
        .enumerate()
        .map(|(index, proposal)| RankedProposal {
            proposal: proposal.clone(),
            rank: index + 1,
        })
        .collect()
}

/// The rank-1 proposal, provided it received at least one vote.
pub fn winner(ranked: &[RankedProposal]) -> Option<&RankedProposal> {
    ranked
        .first()
        .filter(|top| top.rank == 1 && top.proposal.votes > 0)
}

/// Share of `votes` in `total` as a whole percent, rounded half-up.
///
/// Each share is rounded on its own, so a set of percentages may not sum to 100.
pub fn percentage(votes: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    // round(votes * 100 / total) in integer arithmetic: floor((200v + t) / 2t)
    ((votes * 200 + total) / (total * 2)) as u32
}

pub fn total_votes(options: &[Proposal]) -> u64 {
    options.iter().map(|o| u64::from(o.votes)).sum()
}

/// Ranking, totals and per-option shares of one session.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub ranked: Vec<RankedProposal>,
    pub total_votes: u64,
    /// Percentages aligned with `ranked`.
    pub percentages: Vec<u32>,
    pub winner_id: Option<i64>,
}

impl Tally {
    pub fn winner(&self) -> Option<&RankedProposal> {
        winner(&self.ranked)
    }

    /// Share of the winner, or zero without a winner.
    pub fn win_percentage(&self) -> u32 {
        self.winner()
            .map(|w| percentage(u64::from(w.proposal.votes), self.total_votes))
            .unwrap_or(0)
    }

    pub fn has_votes(&self) -> bool {
        self.total_votes > 0
    }
}

pub fn tally(options: &[Proposal]) -> Tally {
    let ranked = rank(options);
    let total = total_votes(options);
    let percentages = ranked
        .iter()
        .map(|r| percentage(u64::from(r.proposal.votes), total))
        .collect();
    let winner_id = winner(&ranked).map(|w| w.proposal.id);

    Tally {
        ranked,
        total_votes: total,
        percentages,
        winner_id,
    }
}
