use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::{debug, info};
use uuid::Uuid;

use weave_db::models::BlockRow;
use weave_db::{Database, blocks, links};
use weave_types::models::Block;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::middleware::MaybeActor;
use crate::ownership::{Entity, resolve_owner};
use crate::permissions::{require_authenticated, require_either_ownership};

/// Link `block_id` into `channel_id`. Either endpoint's owner may do this;
/// linking an already linked pair changes nothing.
pub fn connect_block_to_channel(
    db: &Database,
    block_id: Uuid,
    channel_id: Uuid,
    actor_id: Uuid,
) -> Result<Block, ApiError> {
    let (row, created) = db.transaction(|tx| -> Result<(BlockRow, bool), ApiError> {
        let block_owner = resolve_owner(tx, Entity::Block(block_id))?;
        let channel_owner = resolve_owner(tx, Entity::Channel(channel_id))?;
        require_either_ownership(&block_owner, &channel_owner, actor_id)?;

        let created = links::insert_link(tx, block_id, channel_id, &weave_db::now_timestamp())?;
        let row = blocks::query_block(tx, block_id)?
            .ok_or_else(|| ApiError::not_found("Block not found"))?;
        Ok((row, created))
    })?;

    if created {
        info!(%block_id, %channel_id, %actor_id, "Block linked");
    } else {
        debug!(%block_id, %channel_id, "Block already linked");
    }
    Ok(row.into())
}

pub async fn put_block_in_channel(
    State(state): State<AppState>,
    Path((channel_id, block_id)): Path<(Uuid, Uuid)>,
    MaybeActor(actor): MaybeActor,
) -> Result<impl IntoResponse, ApiError> {
    let actor = require_authenticated(actor.as_ref())?.id;
    let block = blocking(&state, move |state| {
        connect_block_to_channel(&state.db, block_id, channel_id, actor)
    })
    .await?;
    Ok(Json(block))
}

#[cfg(test)]
mod tests {
    use weave_types::models::Role;

    use super::*;
    use crate::testing::{TestWorld, link_count};

    #[test]
    fn relinking_is_idempotent() {
        let world = TestWorld::new();
        let owner = world.user("owner", Role::Creator);
        let a = world.channel(&owner, "a");
        let b = world.channel(&owner, "b");
        let block = world.block(&owner, a, "twice");

        let first = connect_block_to_channel(&world.db, block, b, owner.id).unwrap();
        let second = connect_block_to_channel(&world.db, block, b, owner.id).unwrap();
        assert_eq!(first.channel_ids, second.channel_ids);
        assert_eq!(link_count(&world.db, block), 2);
    }

    #[test]
    fn either_endpoint_owner_may_link() {
        let world = TestWorld::new();
        let block_owner = world.user("block_owner", Role::Creator);
        let channel_owner = world.user("channel_owner", Role::Creator);
        let home = world.channel(&block_owner, "home");
        let theirs = world.channel(&channel_owner, "theirs");
        let spare = world.channel(&channel_owner, "spare");
        let block = world.block(&block_owner, home, "portable");

        // Block owner pushes into a foreign channel.
        connect_block_to_channel(&world.db, block, theirs, block_owner.id).unwrap();
        // Channel owner pulls a foreign block into their own channel.
        let linked = connect_block_to_channel(&world.db, block, spare, channel_owner.id).unwrap();
        assert_eq!(linked.channel_ids.len(), 3);
    }

    #[test]
    fn stranger_cannot_link() {
        let world = TestWorld::new();
        let owner = world.user("owner", Role::Creator);
        let stranger = world.user("stranger", Role::Creator);
        let a = world.channel(&owner, "a");
        let b = world.channel(&owner, "b");
        let block = world.block(&owner, a, "private");

        let err = connect_block_to_channel(&world.db, block, b, stranger.id).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(link_count(&world.db, block), 1);
    }

    #[test]
    fn missing_endpoints_are_not_found() {
        let world = TestWorld::new();
        let owner = world.user("owner", Role::Creator);
        let a = world.channel(&owner, "a");
        let block = world.block(&owner, a, "x");

        assert!(matches!(
            connect_block_to_channel(&world.db, Uuid::new_v4(), a, owner.id),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            connect_block_to_channel(&world.db, block, Uuid::new_v4(), owner.id),
            Err(ApiError::NotFound(_))
        ));
    }
}
