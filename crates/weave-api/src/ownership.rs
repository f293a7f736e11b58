use uuid::Uuid;

use weave_db::{Connection, blocks, channels};

use crate::error::ApiError;
use crate::permissions::OwnerId;

/// An ownable entity, addressed by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Block(Uuid),
    Channel(Uuid),
}

/// Owner of `entity`, or `NotFound` if it does not exist.
pub fn resolve_owner(conn: &Connection, entity: Entity) -> Result<OwnerId, ApiError> {
    let owner = match entity {
        Entity::Block(id) => blocks::block_owner(conn, id)?,
        Entity::Channel(id) => channels::channel_owner(conn, id)?,
    };

    owner.map(OwnerId).ok_or_else(|| match entity {
        Entity::Block(_) => ApiError::not_found("Block not found"),
        Entity::Channel(_) => ApiError::not_found("Channel not found"),
    })
}
