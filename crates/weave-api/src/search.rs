use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

use weave_db::Database;
use weave_db::search::PageRequest;
use weave_types::api::{Page, PageQuery};
use weave_types::models::{Block, Channel};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// A validated listing window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageParams {
    pub query: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl PageParams {
    pub fn first(limit: u32) -> Self {
        Self {
            query: None,
            limit,
            offset: 0,
        }
    }

    fn to_request(&self) -> PageRequest {
        PageRequest {
            query: self.query.clone(),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

impl TryFrom<PageQuery> for PageParams {
    type Error = ApiError;

    fn try_from(q: PageQuery) -> Result<Self, Self::Error> {
        let limit = q.limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 || limit > MAX_LIMIT {
            return Err(ApiError::invalid(format!("limit must be between 1 and {}", MAX_LIMIT)));
        }

        // A blank query lists everything.
        let query = q
            .query
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            query,
            limit,
            offset: q.offset.unwrap_or(0),
        })
    }
}

pub fn list_blocks_for_channel(
    db: &Database,
    channel_id: Uuid,
    params: PageParams,
) -> Result<Page<Block>, ApiError> {
    let (rows, total) = db.search_blocks(Some(channel_id), &params.to_request())?;
    let items = rows.into_iter().map(Block::from).collect();
    Ok(Page::new(items, total, params.offset))
}

pub fn search_blocks(db: &Database, params: PageParams) -> Result<Page<Block>, ApiError> {
    let (rows, total) = db.search_blocks(None, &params.to_request())?;
    let items = rows.into_iter().map(Block::from).collect();
    Ok(Page::new(items, total, params.offset))
}

pub fn search_channels(db: &Database, params: PageParams) -> Result<Page<Channel>, ApiError> {
    let (rows, total) = db.search_channels(&params.to_request())?;
    let items = rows.into_iter().map(Channel::from).collect();
    Ok(Page::new(items, total, params.offset))
}

pub async fn get_search_blocks(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let params = PageParams::try_from(query)?;
    let page = blocking(&state, move |state| search_blocks(&state.db, params)).await?;
    Ok(Json(page))
}

pub async fn get_search_channels(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let params = PageParams::try_from(query)?;
    let page = blocking(&state, move |state| search_channels(&state.db, params)).await?;
    Ok(Json(page))
}
