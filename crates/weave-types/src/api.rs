use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Role, User};

// -- JWT Claims --

/// Claims carried by every bearer token. The identity middleware turns these
/// into the request's actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// -- Channels --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChannelRequest {
    pub title: String,
    pub description: Option<String>,
}

/// Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateChannelRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteChannelResponse {
    pub success: bool,
    pub message: String,
    pub blocks_deleted: usize,
    pub blocks_unlinked: usize,
}

// -- Blocks --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBlockRequest {
    pub channel_id: Uuid,
    pub content: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateBlockRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteBlockResponse {
    pub success: bool,
    pub message: String,
}

// -- Listings --

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub query: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64, offset: u32) -> Self {
        let has_more = u64::from(offset) + (items.len() as u64) < total_count;
        Self {
            items,
            total_count,
            has_more,
        }
    }
}
