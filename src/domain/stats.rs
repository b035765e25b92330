//! Aggregate statistics over groups and sessions.
//!
//! Every function is total: empty input yields zero-valued results.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::ranking::tally;
use super::status::resolve_status;
use crate::models::{Group, GroupSummary, Proposal, SessionStatus, VotingSession};

/// How many completed sessions the results overview inspects.
pub const RECENT_WINS_LIMIT: usize = 10;

const NO_CUISINE: &str = "N/A";

fn count_with_status(sessions: &[VotingSession], now: DateTime<Utc>, status: SessionStatus) -> usize {
    sessions
        .iter()
        .filter(|s| resolve_status(s, now) == status)
        .count()
}

pub fn active_session_count(sessions: &[VotingSession], now: DateTime<Utc>) -> usize {
    count_with_status(sessions, now, SessionStatus::Active)
}

pub fn completed_session_count(sessions: &[VotingSession], now: DateTime<Utc>) -> usize {
    count_with_status(sessions, now, SessionStatus::Completed)
}

pub fn expired_session_count(sessions: &[VotingSession], now: DateTime<Utc>) -> usize {
    count_with_status(sessions, now, SessionStatus::Expired)
}

/// Locked sessions created within the last seven days.
///
/// This keys on the session's creation time, not on when it was locked, so a
/// long-running session locked today is not counted.
pub fn weekly_win_count(sessions: &[VotingSession], now: DateTime<Utc>) -> usize {
    let week_ago = now - Duration::days(7);
    sessions
        .iter()
        .filter(|s| s.locked && s.created_at >= week_ago)
        .count()
}

/// Per-group counters shown on group cards.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    /// Sessions not locked (an expired but unlocked session still counts).
    pub active_votes: usize,
    pub total_sessions: usize,
    pub member_count: usize,
}

pub fn group_stats(group: &Group) -> GroupStats {
    GroupStats {
        active_votes: group.voting_sessions.iter().filter(|s| !s.locked).count(),
        total_sessions: group.voting_sessions.len(),
        member_count: group.members.len(),
    }
}

/// A finished session together with its winning proposal.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentWin {
    pub session_id: i64,
    pub session_title: String,
    pub session_date: DateTime<Utc>,
    pub group: GroupSummary,
    pub winner: Proposal,
    pub total_votes: u64,
    pub win_percentage: u32,
}

/// Winners of the most recently created locked sessions across `groups`.
///
/// Sessions are ordered newest first by creation time; only the first `limit`
/// are inspected and those without a winner are skipped.
pub fn recent_wins(groups: &[Group], limit: usize) -> Vec<RecentWin> {
    let mut completed: Vec<(&Group, &VotingSession)> = groups
        .iter()
        .flat_map(|g| g.voting_sessions.iter().map(move |s| (g, s)))
        .filter(|(_, s)| s.locked)
        .collect();
    completed.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));

    completed
        .into_iter()
        .take(limit)
        .filter_map(|(group, session)| {
            let result = tally(&session.options);
            let top = result.winner()?;
            Some(RecentWin {
                session_id: session.id,
                session_title: session.title.clone(),
                session_date: session.created_at,
                group: group.summary(),
                winner: top.proposal.clone(),
                total_votes: result.total_votes,
                win_percentage: result.win_percentage(),
            })
        })
        .collect()
}

/// Headline numbers of the results overview.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSummary {
    pub total_wins: usize,
    pub total_votes: u64,
    pub most_popular_cuisine: String,
}

pub fn results_summary(wins: &[RecentWin]) -> ResultsSummary {
    // Insertion-ordered so ties resolve to the cuisine seen first.
    let mut cuisine_counts: Vec<(&str, usize)> = Vec::new();
    for cuisine in wins.iter().filter_map(|w| w.winner.cuisine.as_deref()) {
        match cuisine_counts.iter_mut().find(|(c, _)| *c == cuisine) {
            Some((_, count)) => *count += 1,
            None => cuisine_counts.push((cuisine, 1)),
        }
    }

    let mut most_popular = (NO_CUISINE, 0);
    for (cuisine, count) in cuisine_counts {
        if count > most_popular.1 {
            most_popular = (cuisine, count);
        }
    }

    ResultsSummary {
        total_wins: wins.len(),
        total_votes: wins.iter().map(|w| w.total_votes).sum(),
        most_popular_cuisine: most_popular.0.to_string(),
    }
}

/// Groups whose name contains `term`, ignoring case. A blank term keeps all.
pub fn filter_groups<'a>(groups: &'a [Group], term: &str) -> Vec<&'a Group> {
    let needle = term.to_lowercase();
    groups
        .iter()
        .filter(|g| g.name.to_lowercase().contains(&needle))
        .collect()
}

/// Coarse relative age of `date`, in whole elapsed days.
pub fn time_ago(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    // Future dates read as today.
    let days = (now - date).num_days().max(0);
    match days {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        d if d < 7 => format!("{} days ago", d),
        d if d < 30 => format!("{} weeks ago", d / 7),
        d => format!("{} months ago", d / 30),
    }
}
