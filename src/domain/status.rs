//! Session lifecycle resolution.

use chrono::{DateTime, Utc};

use crate::models::{SessionStatus, VotingSession};

/// Derive the status label of a session.
///
/// Rule order matters: a manually locked session reads as `completed` even
/// when its deadline has also passed.
pub fn resolve_status(session: &VotingSession, now: DateTime<Utc>) -> SessionStatus {
    if session.locked {
        SessionStatus::Completed
    } else if deadline_passed(session, now) {
        SessionStatus::Expired
    } else {
        SessionStatus::Active
    }
}

/// Whether voting controls must be disabled: locked, or past the deadline.
pub fn is_session_locked(session: &VotingSession, now: DateTime<Utc>) -> bool {
    session.locked || deadline_passed(session, now)
}

fn deadline_passed(session: &VotingSession, now: DateTime<Utc>) -> bool {
    session.deadline.is_some_and(|deadline| deadline < now)
}

impl VotingSession {
    pub fn status(&self, now: DateTime<Utc>) -> SessionStatus {
        resolve_status(self, now)
    }

    pub fn is_effectively_locked(&self, now: DateTime<Utc>) -> bool {
        is_session_locked(self, now)
    }
}
