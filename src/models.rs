use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type UserId = u64;
pub type ThreadId = u64;

// Forum user as the store keeps it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub joined_on: DateTime<Utc>,
    // None means the user never posted
    pub last_posted_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ban_message: Option<String>,
}

impl UserRecord {
    pub fn new(id: UserId, username: impl Into<String>, joined_on: DateTime<Utc>) -> Self {
        Self {
            id,
            username: username.into(),
            joined_on,
            last_posted_on: None,
            ban_message: None,
        }
    }

    pub fn is_banned(&self) -> bool {
        self.ban_message.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub thread_id: ThreadId,
    pub poster_id: UserId,
    pub content: String,
    pub posted_on: DateTime<Utc>,
}

// Thread summary for the forum index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadSummary {
    pub thread_id: ThreadId,
    pub posts: usize,
    pub last_post_on: DateTime<Utc>,
}

/// Permissions the ACL can grant. The string form is what seed files and
/// logs use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CanOmitFloodProtection,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::CanOmitFloodProtection => "can_omit_flood_protection",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "can_omit_flood_protection" => Ok(Capability::CanOmitFloodProtection),
            other => Err(format!("unknown capability: {other}")),
        }
    }
}

// POST /api/users body
#[derive(Debug, Deserialize)]
pub struct NewUserRequest {
    pub username: String,
}

// POST /api/threads/{id}/posts body
#[derive(Debug, Deserialize)]
pub struct NewPostRequest {
    pub content: String,
}
