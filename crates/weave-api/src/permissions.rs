//! Authorization predicates shared by every mutating path.
//!
//! All checks are pure functions of their arguments: no store access, no
//! state. Callers fetch ownership first (see [`crate::ownership`]) and pass
//! it in.

use uuid::Uuid;

use weave_db::models::{BlockRow, ChannelRow};
use weave_types::models::Role;

use crate::error::ApiError;
use crate::middleware::Actor;

/// Anything with a single owning user.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

/// A bare owner id, for when only the ownership fact was fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerId(pub Uuid);

impl Owned for OwnerId {
    fn owner_id(&self) -> Uuid {
        self.0
    }
}

impl Owned for ChannelRow {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Owned for BlockRow {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// Which endpoints of a pair the actor owns. At least one is true whenever
/// [`require_either_ownership`] succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairControl {
    pub first: bool,
    pub second: bool,
}

pub fn require_authenticated(actor: Option<&Actor>) -> Result<&Actor, ApiError> {
    actor.ok_or(ApiError::Unauthenticated)
}

pub fn require_creator_role(actor: &Actor) -> Result<(), ApiError> {
    if actor.role != Role::Creator {
        return Err(ApiError::forbidden("Creator role required"));
    }
    Ok(())
}

pub fn require_ownership(resource: &impl Owned, actor_id: Uuid) -> Result<(), ApiError> {
    if resource.owner_id() != actor_id {
        return Err(ApiError::forbidden("Not authorized - you don't own this resource"));
    }
    Ok(())
}

/// Passes if the actor owns either resource; a link between two resources
/// may be managed from either side.
pub fn require_either_ownership(
    first: &impl Owned,
    second: &impl Owned,
    actor_id: Uuid,
) -> Result<PairControl, ApiError> {
    let control = PairControl {
        first: first.owner_id() == actor_id,
        second: second.owner_id() == actor_id,
    };

    if !control.first && !control.second {
        return Err(ApiError::forbidden(
            "Not authorized - you must own either the block or the channel",
        ));
    }
    Ok(control)
}
