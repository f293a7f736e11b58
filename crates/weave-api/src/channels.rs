use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use weave_db::models::ChannelRow;
use weave_db::{Database, channels};
use weave_types::api::{
    CreateChannelRequest, DeleteChannelResponse, PageQuery, UpdateChannelRequest,
};
use weave_types::models::Channel;

use crate::auth::AppState;
use crate::blocking;
use crate::cascade;
use crate::error::ApiError;
use crate::middleware::{Actor, MaybeActor};
use crate::ownership::{Entity, resolve_owner};
use crate::permissions::{require_authenticated, require_creator_role, require_ownership};
use crate::search::{PageParams, list_blocks_for_channel};
use crate::validation::{self, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN};

pub fn find_channel(db: &Database, id: Uuid) -> Result<Channel, ApiError> {
    db.get_channel(id)?
        .map(Channel::from)
        .ok_or_else(|| ApiError::not_found("Channel not found"))
}

pub fn channels_by_user(db: &Database, user_id: Uuid) -> Result<Vec<Channel>, ApiError> {
    if db.get_user_by_id(user_id)?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    let rows = db.list_channels_by_owner(user_id)?;
    Ok(rows.into_iter().map(Channel::from).collect())
}

pub fn my_channels(db: &Database, actor: Option<&Actor>) -> Result<Vec<Channel>, ApiError> {
    let actor = require_authenticated(actor)?;
    let rows = db.list_channels_by_owner(actor.id)?;
    Ok(rows.into_iter().map(Channel::from).collect())
}

pub fn create_channel(
    db: &Database,
    actor: Option<&Actor>,
    req: CreateChannelRequest,
) -> Result<Channel, ApiError> {
    let actor = require_authenticated(actor)?;
    require_creator_role(actor)?;

    let title = validation::required("title", &req.title, MAX_TITLE_LEN)?;
    validation::optional("description", req.description.as_deref(), MAX_DESCRIPTION_LEN)?;

    let id = Uuid::new_v4();
    let row = db.transaction(|tx| -> Result<ChannelRow, ApiError> {
        channels::insert_channel(
            tx,
            id,
            actor.id,
            &title,
            req.description.as_deref(),
            &weave_db::now_timestamp(),
        )?;
        channels::query_channel(tx, id)?
            .ok_or_else(|| ApiError::OperationFailed("created channel was not readable".into()))
    })?;

    info!(channel_id = %id, owner_id = %actor.id, "Channel created");
    Ok(row.into())
}

/// Owner-only patch; absent fields keep their stored value.
pub fn update_channel(
    db: &Database,
    id: Uuid,
    req: UpdateChannelRequest,
    actor: Option<&Actor>,
) -> Result<Channel, ApiError> {
    let actor = require_authenticated(actor)?;

    let title = req
        .title
        .as_deref()
        .map(|t| validation::required("title", t, MAX_TITLE_LEN))
        .transpose()?;
    validation::optional("description", req.description.as_deref(), MAX_DESCRIPTION_LEN)?;

    let row = db.transaction(|tx| -> Result<ChannelRow, ApiError> {
        let owner = resolve_owner(tx, Entity::Channel(id))?;
        require_ownership(&owner, actor.id)?;

        channels::update_channel(
            tx,
            id,
            title.as_deref(),
            req.description.as_deref(),
            &weave_db::now_timestamp(),
        )?;
        channels::query_channel(tx, id)?.ok_or_else(|| ApiError::not_found("Channel not found"))
    })?;

    Ok(row.into())
}

pub fn delete_channel(
    db: &Database,
    id: Uuid,
    actor: Option<&Actor>,
) -> Result<DeleteChannelResponse, ApiError> {
    let actor = require_authenticated(actor)?;
    let summary = cascade::delete_channel(db, id, actor.id)?;
    Ok(DeleteChannelResponse {
        success: true,
        message: "Channel deleted".into(),
        blocks_deleted: summary.blocks_deleted,
        blocks_unlinked: summary.blocks_unlinked,
    })
}

// -- Handlers --

pub async fn get_channel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let channel = blocking(&state, move |state| find_channel(&state.db, id)).await?;
    Ok(Json(channel))
}

pub async fn get_channel_blocks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let params = PageParams::try_from(query)?;
    let page = blocking(&state, move |state| list_blocks_for_channel(&state.db, id, params)).await?;
    Ok(Json(page))
}

pub async fn get_user_channels(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let channels = blocking(&state, move |state| channels_by_user(&state.db, user_id)).await?;
    Ok(Json(channels))
}

pub async fn get_my_channels(
    State(state): State<AppState>,
    MaybeActor(actor): MaybeActor,
) -> Result<impl IntoResponse, ApiError> {
    let channels = blocking(&state, move |state| my_channels(&state.db, actor.as_ref())).await?;
    Ok(Json(channels))
}

pub async fn post_channel(
    State(state): State<AppState>,
    MaybeActor(actor): MaybeActor,
    Json(req): Json<CreateChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let channel =
        blocking(&state, move |state| create_channel(&state.db, actor.as_ref(), req)).await?;
    Ok((StatusCode::CREATED, Json(channel)))
}

pub async fn patch_channel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeActor(actor): MaybeActor,
    Json(req): Json<UpdateChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let channel =
        blocking(&state, move |state| update_channel(&state.db, id, req, actor.as_ref())).await?;
    Ok(Json(channel))
}

pub async fn remove_channel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeActor(actor): MaybeActor,
) -> Result<impl IntoResponse, ApiError> {
    let response =
        blocking(&state, move |state| delete_channel(&state.db, id, actor.as_ref())).await?;
    Ok(Json(response))
}
