//! High-level client combining the API, the entity cache and the vote gate.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::{EntityStore, SessionWatcher};
use crate::client::{ApiClient, ClientError, VoteGate};
use crate::config::ClientConfig;
use crate::domain::{
    active_session_count, completed_session_count, recent_wins, tally, weekly_win_count,
    RecentWin, Tally, RECENT_WINS_LIMIT,
};
use crate::models::{
    Group, NewGroup, NewProposal, NewSession, Proposal, SessionStatus, VotingSession,
};

/// Everything a session view renders, computed at one instant.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session: VotingSession,
    pub status: SessionStatus,
    /// Locked or past its deadline; voting controls are disabled.
    pub voting_closed: bool,
    pub tally: Tally,
    /// A mutation happened since the last fetch.
    pub stale: bool,
}

impl SessionSnapshot {
    pub fn new(session: VotingSession, now: DateTime<Utc>, stale: bool) -> Self {
        Self {
            status: session.status(now),
            voting_closed: session.is_effectively_locked(now),
            tally: tally(&session.options),
            stale,
            session,
        }
    }
}

/// Dashboard counters over everything loaded so far.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HomeStats {
    pub group_count: usize,
    pub active_sessions: usize,
    pub completed_sessions: usize,
    pub weekly_wins: usize,
}

pub struct DinnerPicker {
    client: ApiClient,
    store: Arc<RwLock<EntityStore>>,
    gate: VoteGate,
    config: ClientConfig,
}

impl DinnerPicker {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = ApiClient::new(&config)?;
        Ok(Self {
            client,
            store: Arc::new(RwLock::new(EntityStore::new())),
            gate: VoteGate::new(config.vote_cooldown),
            config,
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn store(&self) -> Arc<RwLock<EntityStore>> {
        self.store.clone()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Groups of the configured user, replacing the cached group list.
    pub async fn load_user_groups(&self) -> Result<Vec<Group>, ClientError> {
        let groups = self.client.user_groups(self.config.user_id).await?;
        let mut store = self.store.write().await;
        store.put_groups(groups);
        Ok(store.groups())
    }

    pub async fn load_group(&self, group_id: i64) -> Result<Group, ClientError> {
        let group = self.client.get_group(group_id).await?;
        let mut store = self.store.write().await;
        store.put_group(group);
        store
            .group(group_id)
            .ok_or_else(|| ClientError::Decode(format!("group {} missing after load", group_id)))
    }

    pub async fn load_group_sessions(&self, group_id: i64) -> Result<Vec<VotingSession>, ClientError> {
        let sessions = self.client.group_sessions(group_id).await?;
        let mut store = self.store.write().await;
        store.put_sessions(group_id, sessions);
        Ok(store.group_sessions(group_id))
    }

    /// Fetch a session with its options and cache it.
    pub async fn refresh_session(&self, session_id: i64) -> Result<VotingSession, ClientError> {
        let session = self.client.get_session(session_id).await?;
        let mut store = self.store.write().await;
        store.put_session(session);
        store.session(session_id).ok_or_else(|| {
            ClientError::Decode(format!("session {} missing after refresh", session_id))
        })
    }

    pub async fn create_group(&self, request: &NewGroup) -> Result<Group, ClientError> {
        let group = self.client.create_group(request).await?;
        tracing::info!(group_id = group.id, name = %group.name, "Group created");
        self.store.write().await.put_group(group.clone());
        Ok(group)
    }

    pub async fn create_session(&self, request: &NewSession) -> Result<VotingSession, ClientError> {
        let session = self.client.create_session(request).await?;
        tracing::info!(session_id = session.id, group_id = session.group_id, "Session created");
        self.store.write().await.put_session(session.clone());
        Ok(session)
    }

    /// Closed sessions are rejected before any request is made.
    async fn ensure_open(&self, session_id: i64) -> Result<(), ClientError> {
        let store = self.store.read().await;
        if let Some(session) = store.session(session_id) {
            if session.is_effectively_locked(Utc::now()) {
                return Err(ClientError::StateConflict(
                    "Voting is closed for this session".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub async fn add_option(&self, request: &NewProposal) -> Result<Proposal, ClientError> {
        self.ensure_open(request.voting_session_id).await?;

        let result = self.client.add_option(request).await;
        if matches!(&result, Err(e) if e.is_local()) {
            return result;
        }
        if let Ok(option) = &result {
            self.store.write().await.apply_option(option.clone());
        }
        self.invalidate_and_refetch(request.voting_session_id).await;
        result
    }

    /// Vote on an option.
    ///
    /// Rejected locally when the session is closed, when downvoting an option
    /// with no votes, or while another vote on the same option is in flight
    /// or cooling down.
    pub async fn vote(&self, option_id: i64, delta: i32) -> Result<Proposal, ClientError> {
        let (session_id, votes) = {
            let store = self.store.read().await;
            (
                store.session_of_option(option_id),
                store.option(option_id).map(|o| o.votes),
            )
        };

        if let Some(session_id) = session_id {
            self.ensure_open(session_id).await?;
        }
        if delta < 0 && votes == Some(0) {
            return Err(ClientError::StateConflict(
                "Cannot remove a vote from an option with no votes".to_string(),
            ));
        }

        let _permit = self.gate.try_acquire(option_id)?;

        let result = self.client.vote(option_id, delta).await;
        if matches!(&result, Err(e) if e.is_local()) {
            return result;
        }
        match &result {
            Ok(option) => {
                tracing::debug!(option_id, delta, votes = option.votes, "Vote recorded");
                self.store.write().await.apply_option(option.clone());
            }
            Err(e) => tracing::warn!(option_id, delta, error = %e, "Vote failed"),
        }

        let session_id = match &result {
            Ok(option) => option.voting_session_id.or(session_id),
            Err(_) => session_id,
        };
        if let Some(session_id) = session_id {
            self.invalidate_and_refetch(session_id).await;
        }
        result
    }

    pub async fn set_locked(&self, session_id: i64, locked: bool) -> Result<VotingSession, ClientError> {
        let session = self.client.lock_session(session_id, locked).await?;
        tracing::info!(session_id, locked, "Session lock changed");
        let mut store = self.store.write().await;
        store.put_session(session);
        store.session(session_id).ok_or_else(|| {
            ClientError::Decode(format!("session {} missing after lock", session_id))
        })
    }

    /// The refetch is best effort: a failure leaves the session stale.
    async fn invalidate_and_refetch(&self, session_id: i64) {
        self.store.write().await.invalidate_session(session_id);
        if let Err(e) = self.refresh_session(session_id).await {
            tracing::warn!(session_id, error = %e, "Refetch after mutation failed");
        }
    }

    /// Cached view of a session, or `None` if it was never loaded.
    pub async fn session_snapshot(&self, session_id: i64) -> Option<SessionSnapshot> {
        let store = self.store.read().await;
        let session = store.session(session_id)?;
        Some(SessionSnapshot::new(session, Utc::now(), store.is_stale(session_id)))
    }

    pub async fn home_stats(&self) -> HomeStats {
        let store = self.store.read().await;
        let sessions = store.all_sessions();
        let now = Utc::now();
        HomeStats {
            group_count: store.groups().len(),
            active_sessions: active_session_count(&sessions, now),
            completed_sessions: completed_session_count(&sessions, now),
            weekly_wins: weekly_win_count(&sessions, now),
        }
    }

    pub async fn recent_wins(&self) -> Vec<RecentWin> {
        recent_wins(&self.store.read().await.groups(), RECENT_WINS_LIMIT)
    }

    /// Start polling a session in the background at the configured interval.
    pub fn watch_session(&self, session_id: i64) -> SessionWatcher {
        SessionWatcher::spawn(
            self.client.clone(),
            self.store.clone(),
            session_id,
            self.config.poll_interval,
        )
    }
}
