//! Restaurant proposals ("options") offered inside a voting session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::timestamp;

/// Price bracket of a restaurant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PriceRange {
    #[serde(rename = "$")]
    Budget,
    #[serde(rename = "$$")]
    Moderate,
    #[serde(rename = "$$$")]
    Expensive,
}

impl PriceRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceRange::Budget => "$",
            PriceRange::Moderate => "$$",
            PriceRange::Expensive => "$$$",
        }
    }

    pub fn parse_label(s: &str) -> Option<Self> {
        match s.trim() {
            "$" => Some(PriceRange::Budget),
            "$$" => Some(PriceRange::Moderate),
            "$$$" => Some(PriceRange::Expensive),
            _ => None,
        }
    }
}

impl std::fmt::Display for PriceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown price labels decode as "no price range" rather than failing the payload.
fn lenient_price_range<'de, D>(deserializer: D) -> Result<Option<PriceRange>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(PriceRange::parse_label))
}

/// A candidate restaurant within a session, carrying its vote count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: i64,
    pub name: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_price_range",
        skip_serializing_if = "Option::is_none"
    )]
    pub price_range: Option<PriceRange>,
    /// Never negative; a missing count reads as zero.
    #[serde(default)]
    pub votes: u32,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voting_session_id: Option<i64>,
}

impl Proposal {
    /// Downvoting is only offered while the option still has votes.
    pub fn can_downvote(&self) -> bool {
        self.votes > 0
    }
}

/// Request body for proposing a restaurant.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewProposal {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub price_range: Option<String>,
    #[serde(default)]
    pub voting_session_id: i64,
}

/// Request body for changing an option's vote count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VoteRequest {
    pub delta: i32,
}
