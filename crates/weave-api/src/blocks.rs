use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use weave_db::models::BlockRow;
use weave_db::{Database, blocks, links};
use weave_types::api::{CreateBlockRequest, DeleteBlockResponse, UpdateBlockRequest};
use weave_types::models::{Block, Channel};

use crate::auth::AppState;
use crate::blocking;
use crate::cascade;
use crate::error::ApiError;
use crate::middleware::{Actor, MaybeActor};
use crate::ownership::{Entity, resolve_owner};
use crate::permissions::{require_authenticated, require_creator_role, require_ownership};
use crate::validation::{self, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN};

pub fn find_block(db: &Database, id: Uuid) -> Result<Block, ApiError> {
    db.get_block(id)?
        .map(Block::from)
        .ok_or_else(|| ApiError::not_found("Block not found"))
}

/// Channels the block is currently linked to, newest channel first.
pub fn connected_channels(db: &Database, block_id: Uuid) -> Result<Vec<Channel>, ApiError> {
    if db.get_block(block_id)?.is_none() {
        return Err(ApiError::not_found("Block not found"));
    }
    let rows = db.channels_for_block(block_id)?;
    Ok(rows.into_iter().map(Channel::from).collect())
}

/// Create a block and its first link in one unit; the channel must exist.
pub fn create_block(
    db: &Database,
    actor: Option<&Actor>,
    req: CreateBlockRequest,
) -> Result<Block, ApiError> {
    let actor = require_authenticated(actor)?;
    require_creator_role(actor)?;

    if req.content.trim().is_empty() {
        return Err(ApiError::invalid("content must not be empty"));
    }
    validation::optional("title", req.title.as_deref(), MAX_TITLE_LEN)?;
    validation::optional("description", req.description.as_deref(), MAX_DESCRIPTION_LEN)?;

    let block_id = Uuid::new_v4();
    let row = db.transaction(|tx| -> Result<BlockRow, ApiError> {
        resolve_owner(tx, Entity::Channel(req.channel_id))?;

        let now = weave_db::now_timestamp();
        blocks::insert_block(
            tx,
            block_id,
            actor.id,
            req.title.as_deref(),
            req.description.as_deref(),
            &req.content,
            &now,
        )?;
        links::insert_link(tx, block_id, req.channel_id, &now)?;

        blocks::query_block(tx, block_id)?
            .ok_or_else(|| ApiError::OperationFailed("created block was not readable".into()))
    })?;

    info!(%block_id, channel_id = %req.channel_id, owner_id = %actor.id, "Block created");
    Ok(row.into())
}

/// Owner-only patch; absent fields keep their stored value.
pub fn update_block(
    db: &Database,
    id: Uuid,
    req: UpdateBlockRequest,
    actor: Option<&Actor>,
) -> Result<Block, ApiError> {
    let actor = require_authenticated(actor)?;

    if let Some(content) = &req.content {
        if content.trim().is_empty() {
            return Err(ApiError::invalid("content must not be empty"));
        }
    }
    validation::optional("title", req.title.as_deref(), MAX_TITLE_LEN)?;
    validation::optional("description", req.description.as_deref(), MAX_DESCRIPTION_LEN)?;

    let row = db.transaction(|tx| -> Result<BlockRow, ApiError> {
        let owner = resolve_owner(tx, Entity::Block(id))?;
        require_ownership(&owner, actor.id)?;

        blocks::update_block(
            tx,
            id,
            req.title.as_deref(),
            req.description.as_deref(),
            req.content.as_deref(),
            &weave_db::now_timestamp(),
        )?;
        blocks::query_block(tx, id)?.ok_or_else(|| ApiError::not_found("Block not found"))
    })?;

    Ok(row.into())
}

pub fn delete_block_from_channel(
    db: &Database,
    block_id: Uuid,
    channel_id: Uuid,
    actor: Option<&Actor>,
) -> Result<DeleteBlockResponse, ApiError> {
    let actor = require_authenticated(actor)?;
    let outcome = cascade::unlink_or_delete(db, block_id, channel_id, actor.id)?;
    Ok(DeleteBlockResponse {
        success: true,
        message: outcome.message().to_string(),
    })
}

// -- Handlers --

pub async fn get_block(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let block = blocking(&state, move |state| find_block(&state.db, id)).await?;
    Ok(Json(block))
}

pub async fn get_block_channels(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let channels = blocking(&state, move |state| connected_channels(&state.db, id)).await?;
    Ok(Json(channels))
}

pub async fn post_block(
    State(state): State<AppState>,
    MaybeActor(actor): MaybeActor,
    Json(req): Json<CreateBlockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let block = blocking(&state, move |state| create_block(&state.db, actor.as_ref(), req)).await?;
    Ok((StatusCode::CREATED, Json(block)))
}

pub async fn patch_block(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeActor(actor): MaybeActor,
    Json(req): Json<UpdateBlockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let block =
        blocking(&state, move |state| update_block(&state.db, id, req, actor.as_ref())).await?;
    Ok(Json(block))
}

pub async fn remove_block_from_channel(
    State(state): State<AppState>,
    Path((channel_id, block_id)): Path<(Uuid, Uuid)>,
    MaybeActor(actor): MaybeActor,
) -> Result<impl IntoResponse, ApiError> {
    let response = blocking(&state, move |state| {
        delete_block_from_channel(&state.db, block_id, channel_id, actor.as_ref())
    })
    .await?;
    Ok(Json(response))
}
