//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    timestamp, Group, GroupSummary, Member, NewGroup, NewProposal, NewSession, PriceRange,
    Proposal, VotingSession,
};

const GROUP_COLUMNS: &str = "id, name, description, emoji_icon, color_theme, created_at";
const SESSION_COLUMNS: &str = "id, title, description, group_id, deadline, locked, created_at";
const OPTION_COLUMNS: &str =
    "id, name, link, image_url, cuisine, price_range, votes, voting_session_id, created_at";

/// Vote counts saturate here so they always fit the `u32` wire type.
const MAX_VOTES: i64 = u32::MAX as i64;

/// Fixed-width UTC timestamps, so text comparison in SQL matches time order.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        self.get_revision_id().await
    }

    // ==================== USER OPERATIONS ====================

    pub async fn count_users(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Create a user and return its ID.
    pub async fn create_user(
        &self,
        name: &str,
        email: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<i64, AppError> {
        let result =
            sqlx::query("INSERT INTO users (name, email, avatar, created_at) VALUES (?, ?, ?, ?)")
                .bind(name)
                .bind(email)
                .bind(avatar)
                .bind(format_timestamp(Utc::now()))
                .execute(&self.pool)
                .await?;

        self.increment_revision().await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn user_exists(&self, id: i64) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    // ==================== GROUP OPERATIONS ====================

    /// List all groups, newest first.
    pub async fn list_groups(&self) -> Result<Vec<Group>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM dinner_groups ORDER BY created_at DESC, id DESC",
            GROUP_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_groups(rows).await
    }

    /// List the groups a user belongs to, newest first.
    pub async fn list_user_groups(&self, user_id: i64) -> Result<Vec<Group>, AppError> {
        let rows = sqlx::query(
            "SELECT g.id, g.name, g.description, g.emoji_icon, g.color_theme, g.created_at \
             FROM dinner_groups g JOIN group_members m ON m.group_id = g.id \
             WHERE m.user_id = ? ORDER BY g.created_at DESC, g.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_groups(rows).await
    }

    /// Get a group by ID, with members and sessions.
    pub async fn get_group(&self, id: i64) -> Result<Option<Group>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM dinner_groups WHERE id = ?",
            GROUP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate_group(&row).await?)),
            None => Ok(None),
        }
    }

    /// Create a group; `admin_user_id`, if it names an existing user, joins
    /// it as admin.
    pub async fn create_group(
        &self,
        request: &NewGroup,
        admin_user_id: Option<i64>,
    ) -> Result<Group, AppError> {
        let now = format_timestamp(Utc::now());
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO dinner_groups (name, description, emoji_icon, color_theme, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.emoji_icon)
        .bind(&request.color_theme)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        let group_id = result.last_insert_rowid();

        if let Some(user_id) = admin_user_id {
            sqlx::query(
                "INSERT INTO group_members (group_id, user_id, is_admin, joined_at) \
                 SELECT ?, id, 1, ? FROM users WHERE id = ?",
            )
            .bind(group_id)
            .bind(&now)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.increment_revision().await?;

        self.get_group(group_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Group {} vanished after insert", group_id)))
    }

    /// Delete a group together with its sessions and options.
    pub async fn delete_group(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM dinner_groups WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Group {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    async fn hydrate_groups(&self, rows: Vec<SqliteRow>) -> Result<Vec<Group>, AppError> {
        let mut groups = Vec::with_capacity(rows.len());
        for row in &rows {
            groups.push(self.hydrate_group(row).await?);
        }
        Ok(groups)
    }

    async fn hydrate_group(&self, row: &SqliteRow) -> Result<Group, AppError> {
        let mut group = group_from_row(row);
        group.members = self.list_members(group.id).await?;
        group.voting_sessions = self.list_group_sessions(group.id, false).await?;
        Ok(group)
    }

    async fn list_members(&self, group_id: i64) -> Result<Vec<Member>, AppError> {
        let rows = sqlx::query(
            "SELECT u.id, u.name, u.email, u.avatar, m.is_admin, m.joined_at \
             FROM group_members m JOIN users u ON u.id = m.user_id \
             WHERE m.group_id = ? ORDER BY m.joined_at, u.id",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(member_from_row).collect())
    }

    // ==================== SESSION OPERATIONS ====================

    /// Sessions of a group, newest first, each with its options. With
    /// `with_group`, every session also carries the group summary.
    pub async fn list_group_sessions(
        &self,
        group_id: i64,
        with_group: bool,
    ) -> Result<Vec<VotingSession>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM voting_sessions WHERE group_id = ? ORDER BY created_at DESC, id DESC",
            SESSION_COLUMNS
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        let summary = if with_group {
            self.group_summary(group_id).await?
        } else {
            None
        };

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut session = session_from_row(row);
            session.options = self.list_session_options(session.id).await?;
            session.group = summary.clone();
            sessions.push(session);
        }
        Ok(sessions)
    }

    /// Get a session by ID with its options and group summary.
    pub async fn get_session(&self, id: i64) -> Result<Option<VotingSession>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM voting_sessions WHERE id = ?",
            SESSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut session = session_from_row(&row);
        session.options = self.list_session_options(session.id).await?;
        session.group = self.group_summary(session.group_id).await?;
        Ok(Some(session))
    }

    pub async fn create_session(&self, request: &NewSession) -> Result<VotingSession, AppError> {
        if self.group_summary(request.group_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Group {} not found",
                request.group_id
            )));
        }

        let result = sqlx::query(
            "INSERT INTO voting_sessions (title, description, group_id, deadline, locked, created_at) VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(request.title.trim())
        .bind(&request.description)
        .bind(request.group_id)
        .bind(request.deadline.map(format_timestamp))
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        let id = result.last_insert_rowid();
        self.get_session(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Session {} vanished after insert", id)))
    }

    pub async fn set_session_locked(&self, id: i64, locked: bool) -> Result<VotingSession, AppError> {
        let result = sqlx::query("UPDATE voting_sessions SET locked = ? WHERE id = ?")
            .bind(locked as i32)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Session {} not found", id)));
        }

        self.increment_revision().await?;

        self.get_session(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))
    }

    async fn group_summary(&self, group_id: i64) -> Result<Option<GroupSummary>, AppError> {
        let row = sqlx::query("SELECT id, name, emoji_icon, color_theme FROM dinner_groups WHERE id = ?")
            .bind(group_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| GroupSummary {
            id: row.get("id"),
            name: row.get("name"),
            emoji_icon: row.get("emoji_icon"),
            color_theme: row.get("color_theme"),
        }))
    }

    // ==================== OPTION OPERATIONS ====================

    /// Options of a session, most votes first, then in insertion order.
    pub async fn list_session_options(&self, session_id: i64) -> Result<Vec<Proposal>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM options WHERE voting_session_id = ? ORDER BY votes DESC, id ASC",
            OPTION_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(option_from_row).collect())
    }

    pub async fn session_exists(&self, session_id: i64) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM voting_sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Add an option to an open session.
    ///
    /// The open-session check and the insert are a single statement, so a
    /// concurrent lock cannot slip in between.
    pub async fn add_option(&self, request: &NewProposal) -> Result<Proposal, AppError> {
        let now = Utc::now();
        let price_range = request
            .price_range
            .as_deref()
            .and_then(PriceRange::parse_label)
            .map(|p| p.as_str());

        let result = sqlx::query(
            "INSERT INTO options (name, link, image_url, cuisine, price_range, votes, voting_session_id, created_at) \
             SELECT ?, ?, ?, ?, ?, 0, id, ? FROM voting_sessions \
             WHERE id = ? AND locked = 0 AND (deadline IS NULL OR deadline >= ?)",
        )
        .bind(request.name.trim())
        .bind(request.link.trim())
        .bind(&request.image_url)
        .bind(&request.cuisine)
        .bind(price_range)
        .bind(format_timestamp(now))
        .bind(request.voting_session_id)
        .bind(format_timestamp(now))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.closed_session_error(request.voting_session_id).await?);
        }

        self.increment_revision().await?;

        let id = result.last_insert_rowid();
        self.get_option(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Option {} vanished after insert", id)))
    }

    pub async fn get_option(&self, id: i64) -> Result<Option<Proposal>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM options WHERE id = ?", OPTION_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(option_from_row))
    }

    /// Apply `delta` to an option's votes, never going below zero.
    ///
    /// Rejected when the option's session is locked or past its deadline.
    pub async fn vote(&self, option_id: i64, delta: i64) -> Result<Proposal, AppError> {
        let result = sqlx::query(
            "UPDATE options SET votes = MIN(MAX(0, votes + ?), ?) \
             WHERE id = ? AND voting_session_id IN ( \
                 SELECT id FROM voting_sessions \
                 WHERE locked = 0 AND (deadline IS NULL OR deadline >= ?))",
        )
        .bind(delta)
        .bind(MAX_VOTES)
        .bind(option_id)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let option = self
                .get_option(option_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Option {} not found", option_id)))?;
            let session_id = option.voting_session_id.unwrap_or_default();
            return Err(self.closed_session_error(session_id).await?);
        }

        self.increment_revision().await?;

        self.get_option(option_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Option {} not found", option_id)))
    }

    /// Explain why a session refused a write.
    async fn closed_session_error(&self, session_id: i64) -> Result<AppError, AppError> {
        let row = sqlx::query("SELECT locked FROM voting_sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            None => AppError::NotFound(format!("Session {} not found", session_id)),
            Some(row) if row.get::<i32, _>("locked") != 0 => {
                AppError::Forbidden("Session is locked".to_string())
            }
            Some(_) => AppError::Forbidden("Voting deadline has passed".to_string()),
        })
    }
}

// Helper functions for row conversion

fn timestamp_from_row(row: &SqliteRow, column: &str) -> DateTime<Utc> {
    let raw: String = row.get(column);
    timestamp::parse(&raw).unwrap_or_default()
}

fn optional_timestamp_from_row(row: &SqliteRow, column: &str) -> Option<DateTime<Utc>> {
    let raw: Option<String> = row.get(column);
    raw.as_deref().and_then(timestamp::parse)
}

fn group_from_row(row: &SqliteRow) -> Group {
    Group {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        emoji_icon: row.get("emoji_icon"),
        color_theme: row.get("color_theme"),
        members: Vec::new(),
        created_at: timestamp_from_row(row, "created_at"),
        voting_sessions: Vec::new(),
    }
}

fn member_from_row(row: &SqliteRow) -> Member {
    let is_admin: i32 = row.get("is_admin");
    Member {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        avatar: row.get("avatar"),
        is_admin: is_admin != 0,
        joined_at: optional_timestamp_from_row(row, "joined_at"),
    }
}

fn session_from_row(row: &SqliteRow) -> VotingSession {
    let locked: i32 = row.get("locked");
    VotingSession {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        group_id: row.get("group_id"),
        deadline: optional_timestamp_from_row(row, "deadline"),
        locked: locked != 0,
        options: Vec::new(),
        created_at: timestamp_from_row(row, "created_at"),
        group: None,
    }
}

fn option_from_row(row: &SqliteRow) -> Proposal {
    let votes: i64 = row.get("votes");
    let price_range: Option<String> = row.get("price_range");
    Proposal {
        id: row.get("id"),
        name: row.get("name"),
        link: row.get("link"),
        image_url: row.get("image_url"),
        cuisine: row.get("cuisine"),
        price_range: price_range.as_deref().and_then(PriceRange::parse_label),
        votes: u32::try_from(votes.clamp(0, MAX_VOTES)).unwrap_or(u32::MAX),
        created_at: timestamp_from_row(row, "created_at"),
        voting_session_id: Some(row.get("voting_session_id")),
    }
}
