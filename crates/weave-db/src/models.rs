//! Database row types. Distinct from the weave-types API models so the
//! storage layer can carry fields (password hashes, owner ids) that never
//! leave the server as-is.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use weave_types::models::{Block, Channel, Role, User, UserSummary};

pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct ChannelRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_username: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct BlockRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_username: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: String,
    pub channel_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything the unlink cascade needs to decide, read in one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkState {
    pub block_owner_id: Uuid,
    /// `None` when the channel does not exist.
    pub channel_owner_id: Option<Uuid>,
    pub total_links: i64,
    pub linked_to_target: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<ChannelRow> for Channel {
    fn from(row: ChannelRow) -> Self {
        Channel {
            id: row.id,
            title: row.title,
            description: row.description,
            owner: UserSummary {
                id: row.owner_id,
                username: row.owner_username,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<BlockRow> for Block {
    fn from(row: BlockRow) -> Self {
        Block {
            id: row.id,
            title: row.title,
            description: row.description,
            content: row.content,
            owner: UserSummary {
                id: row.owner_id,
                username: row.owner_username,
            },
            channel_ids: row.channel_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
