//! Client-side entity cache keyed by id.
//!
//! Entities are stored flat (groups, sessions and options in separate maps)
//! with ordered index lists linking them. Nested views such as a session with
//! its options are assembled on demand, so an updated option is visible in
//! every view that includes it.

mod picker;
mod watcher;

pub use picker::{DinnerPicker, HomeStats, SessionSnapshot};
pub use watcher::SessionWatcher;

use std::collections::{HashMap, HashSet};

use crate::models::{Group, Proposal, VotingSession};

#[derive(Debug, Default)]
pub struct EntityStore {
    groups: HashMap<i64, Group>,
    group_order: Vec<i64>,
    sessions: HashMap<i64, VotingSession>,
    group_sessions: HashMap<i64, Vec<i64>>,
    options: HashMap<i64, Proposal>,
    session_options: HashMap<i64, Vec<i64>>,
    stale: HashSet<i64>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a group. Embedded sessions, when present, replace the group's
    /// session index; an empty list leaves the known sessions alone.
    pub fn put_group(&mut self, mut group: Group) {
        let sessions = std::mem::take(&mut group.voting_sessions);
        let group_id = group.id;

        if !self.group_order.contains(&group_id) {
            self.group_order.push(group_id);
        }
        self.groups.insert(group_id, group);

        if !sessions.is_empty() {
            self.put_sessions(group_id, sessions);
        }
    }

    /// Replace the known group list, keeping the given order.
    pub fn put_groups(&mut self, groups: Vec<Group>) {
        self.group_order.clear();
        for group in groups {
            self.put_group(group);
        }
    }

    /// Store a session and its embedded options, and mark it fresh.
    pub fn put_session(&mut self, mut session: VotingSession) {
        let options = std::mem::take(&mut session.options);
        let session_id = session.id;

        let index = self.group_sessions.entry(session.group_id).or_default();
        if !index.contains(&session_id) {
            // Unknown sessions are the newest ones.
            index.insert(0, session_id);
        }

        self.sessions.insert(session_id, session);
        self.put_options(session_id, options);
    }

    /// Replace a group's session index, keeping the given order.
    pub fn put_sessions(&mut self, group_id: i64, sessions: Vec<VotingSession>) {
        let ids = sessions.iter().map(|s| s.id).collect();
        for session in sessions {
            self.put_session(session);
        }
        self.group_sessions.insert(group_id, ids);
    }

    /// Replace a session's options.
    pub fn put_options(&mut self, session_id: i64, options: Vec<Proposal>) {
        if let Some(old_ids) = self.session_options.remove(&session_id) {
            for id in old_ids {
                self.options.remove(&id);
            }
        }

        let ids = options.iter().map(|o| o.id).collect();
        for option in options {
            self.options.insert(option.id, option);
        }
        self.session_options.insert(session_id, ids);
        self.stale.remove(&session_id);
    }

    /// Merge a single changed option (new or updated).
    pub fn apply_option(&mut self, option: Proposal) {
        let session_id = option
            .voting_session_id
            .or_else(|| self.owning_session(option.id));

        if let Some(session_id) = session_id {
            let index = self.session_options.entry(session_id).or_default();
            if !index.contains(&option.id) {
                index.push(option.id);
            }
        }
        self.options.insert(option.id, option);
    }

    fn owning_session(&self, option_id: i64) -> Option<i64> {
        self.session_options
            .iter()
            .find(|(_, ids)| ids.contains(&option_id))
            .map(|(session_id, _)| *session_id)
    }

    pub fn option(&self, option_id: i64) -> Option<&Proposal> {
        self.options.get(&option_id)
    }

    /// Session id an option belongs to, if known.
    pub fn session_of_option(&self, option_id: i64) -> Option<i64> {
        self.options
            .get(&option_id)
            .and_then(|o| o.voting_session_id)
            .or_else(|| self.owning_session(option_id))
    }

    /// A group with its known sessions (each with options) attached.
    pub fn group(&self, group_id: i64) -> Option<Group> {
        let mut group = self.groups.get(&group_id)?.clone();
        group.voting_sessions = self.group_sessions(group_id);
        Some(group)
    }

    /// A session with its current options attached.
    pub fn session(&self, session_id: i64) -> Option<VotingSession> {
        let mut session = self.sessions.get(&session_id)?.clone();
        session.options = self.session_options(session_id);
        Some(session)
    }

    pub fn session_options(&self, session_id: i64) -> Vec<Proposal> {
        self.session_options
            .get(&session_id)
            .map(|ids| ids.iter().filter_map(|id| self.options.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    pub fn groups(&self) -> Vec<Group> {
        self.group_order
            .iter()
            .filter_map(|id| self.group(*id))
            .collect()
    }

    pub fn group_sessions(&self, group_id: i64) -> Vec<VotingSession> {
        self.group_sessions
            .get(&group_id)
            .map(|ids| ids.iter().filter_map(|id| self.session(*id)).collect())
            .unwrap_or_default()
    }

    /// Every known session, across all groups.
    pub fn all_sessions(&self) -> Vec<VotingSession> {
        self.groups()
            .into_iter()
            .flat_map(|g| g.voting_sessions)
            .collect()
    }

    /// Mark a session as needing a re-fetch.
    pub fn invalidate_session(&mut self, session_id: i64) {
        self.stale.insert(session_id);
    }

    /// Unknown sessions count as stale.
    pub fn is_stale(&self, session_id: i64) -> bool {
        self.stale.contains(&session_id) || !self.sessions.contains_key(&session_id)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
