//! Groups and their members.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, GroupSummary, VotingSession};

pub const DEFAULT_EMOJI_ICON: &str = "🍽️";
pub const DEFAULT_COLOR_THEME: &str = "#667eea";

fn default_emoji_icon() -> String {
    DEFAULT_EMOJI_ICON.to_string()
}

fn default_color_theme() -> String {
    DEFAULT_COLOR_THEME.to_string()
}

/// A person belonging to a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Emoji or image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub joined_at: Option<DateTime<Utc>>,
}

/// A set of members who jointly decide where to eat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_emoji_icon")]
    pub emoji_icon: String,
    #[serde(default = "default_color_theme")]
    pub color_theme: String,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub voting_sessions: Vec<VotingSession>,
}

impl Group {
    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            id: self.id,
            name: self.name.clone(),
            emoji_icon: Some(self.emoji_icon.clone()),
            color_theme: Some(self.color_theme.clone()),
        }
    }
}

/// Request body for creating a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_emoji_icon")]
    pub emoji_icon: String,
    #[serde(default = "default_color_theme")]
    pub color_theme: String,
}

impl NewGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            emoji_icon: default_emoji_icon(),
            color_theme: default_color_theme(),
        }
    }

    /// Trim text fields and substitute defaults for blank icon/theme values.
    pub fn sanitized(&self) -> Self {
        let emoji_icon = self.emoji_icon.trim();
        let color_theme = self.color_theme.trim();
        Self {
            name: self.name.trim().to_string(),
            description: self
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            emoji_icon: if emoji_icon.is_empty() {
                default_emoji_icon()
            } else {
                emoji_icon.to_string()
            },
            color_theme: if color_theme.is_empty() {
                default_color_theme()
            } else {
                color_theme.to_string()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_decodes_with_missing_collections() {
        let group: Group = serde_json::from_value(json!({
            "id": 7,
            "name": "Work Team",
            "createdAt": "2024-03-01T12:00:00"
        }))
        .unwrap();

        assert!(group.members.is_empty());
        assert!(group.voting_sessions.is_empty());
        assert_eq!(group.emoji_icon, DEFAULT_EMOJI_ICON);
        assert_eq!(group.color_theme, DEFAULT_COLOR_THEME);
    }

    #[test]
    fn test_new_group_sanitized() {
        let request = NewGroup {
            name: "  Lunch Crew ".to_string(),
            description: Some("   ".to_string()),
            emoji_icon: " ".to_string(),
            color_theme: "#f093fb".to_string(),
        };

        let clean = request.sanitized();
        assert_eq!(clean.name, "Lunch Crew");
        assert!(clean.description.is_none());
        assert_eq!(clean.emoji_icon, DEFAULT_EMOJI_ICON);
        assert_eq!(clean.color_theme, "#f093fb");
    }
}
