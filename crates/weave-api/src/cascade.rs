//! Deletion cascades: deciding, per request, whether a removal only drops a
//! link edge or destroys the block behind it.
//!
//! Every decision reads link counts and writes within one IMMEDIATE
//! transaction, so two requests racing to remove a block's last link are
//! serialised: the loser sees the winner's result instead of a stale count.

use tracing::{info, warn};
use uuid::Uuid;

use weave_db::{Connection, Database, blocks, channels, links};

use crate::error::ApiError;
use crate::ownership::{Entity, resolve_owner};
use crate::permissions::{OwnerId, require_either_ownership, require_ownership};

/// How an unlink request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlinkOutcome {
    /// The block's owner removed its last link; the block is gone.
    FullyDeleted,
    /// The block's owner removed one of several links.
    RemovedKeptElsewhere,
    /// A channel owner removed someone else's block from their channel.
    RemovedFromChannel,
    /// The block no longer existed when the request ran.
    AlreadyDeleted,
}

impl UnlinkOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::FullyDeleted => "Block fully deleted",
            Self::RemovedKeptElsewhere => {
                "Block removed from this channel; it still exists in other channels"
            }
            Self::RemovedFromChannel => "Block removed from your channel",
            Self::AlreadyDeleted => "Block was already deleted",
        }
    }
}

/// Remove `block_id` from `channel_id` on behalf of `actor_id`.
///
/// The block is destroyed only when the actor owns it and this was its last
/// link. A channel owner acting on someone else's block only ever drops the
/// edge, even if that leaves the block with no links at all.
///
/// A missing block in an existing channel is a no-op success, since a
/// concurrent request may already have removed it. If the channel is missing
/// too, the request is `NotFound`.
pub fn unlink_or_delete(
    db: &Database,
    block_id: Uuid,
    channel_id: Uuid,
    actor_id: Uuid,
) -> Result<UnlinkOutcome, ApiError> {
    let outcome = db
        .transaction(|tx| -> Result<UnlinkOutcome, ApiError> {
            let Some(state) = links::link_state(tx, block_id, channel_id)? else {
                if channels::channel_owner(tx, channel_id)?.is_none() {
                    return Err(ApiError::not_found("Block is not connected to this channel"));
                }
                return Ok(UnlinkOutcome::AlreadyDeleted);
            };
            let (Some(channel_owner), true) = (state.channel_owner_id, state.linked_to_target)
            else {
                return Err(ApiError::not_found("Block is not connected to this channel"));
            };

            let control = require_either_ownership(
                &OwnerId(state.block_owner_id),
                &OwnerId(channel_owner),
                actor_id,
            )?;
            let is_block_owner = control.first;

            if is_block_owner && state.total_links == 1 {
                delete_block_completely(tx, block_id)?;
                return Ok(UnlinkOutcome::FullyDeleted);
            }

            if !links::remove_link(tx, block_id, channel_id)? {
                return Err(ApiError::DeletionFailed(
                    "link edge disappeared during removal".into(),
                ));
            }

            Ok(if is_block_owner {
                UnlinkOutcome::RemovedKeptElsewhere
            } else {
                UnlinkOutcome::RemovedFromChannel
            })
        })
        .map_err(ApiError::into_deletion_failure)?;

    match outcome {
        UnlinkOutcome::AlreadyDeleted => {
            warn!(%block_id, %channel_id, %actor_id, "Unlink target already deleted; nothing to do")
        }
        _ => info!(%block_id, %channel_id, %actor_id, ?outcome, "Unlink applied"),
    }
    Ok(outcome)
}

/// Totals reported once a channel deletion has fully committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelDeletion {
    pub blocks_deleted: usize,
    pub blocks_unlinked: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepStep {
    Deleted,
    Unlinked,
    Skipped,
}

/// Delete a channel owned by `actor_id`.
///
/// Each linked block is handled in its own transaction: blocks whose only
/// link is this channel are destroyed, the rest just lose the edge. A final
/// transaction sweeps any block linked in the meantime and removes the
/// channel itself.
pub fn delete_channel(
    db: &Database,
    channel_id: Uuid,
    actor_id: Uuid,
) -> Result<ChannelDeletion, ApiError> {
    let owner = db.with_conn(|conn| channels::channel_owner(conn, channel_id))?;
    let owner = owner.ok_or_else(|| ApiError::not_found("Channel not found"))?;
    require_ownership(&OwnerId(owner), actor_id)?;

    let block_ids = db.with_conn(|conn| links::blocks_in_channel(conn, channel_id))?;

    let mut summary = ChannelDeletion::default();
    for block_id in block_ids {
        let step = db
            .transaction(|tx| sweep_block(tx, block_id, channel_id))
            .map_err(ApiError::into_deletion_failure)?;
        summary.record(step);
    }

    let late = db
        .transaction(|tx| -> Result<ChannelDeletion, ApiError> {
            resolve_owner(tx, Entity::Channel(channel_id))?;

            let mut late = ChannelDeletion::default();
            for block_id in links::blocks_in_channel(tx, channel_id)? {
                late.record(sweep_block(tx, block_id, channel_id)?);
            }
            channels::delete_channel_row(tx, channel_id)?;
            Ok(late)
        })
        .map_err(ApiError::into_deletion_failure)?;

    summary.blocks_deleted += late.blocks_deleted;
    summary.blocks_unlinked += late.blocks_unlinked;

    info!(
        %channel_id,
        blocks_deleted = summary.blocks_deleted,
        blocks_unlinked = summary.blocks_unlinked,
        "Channel deleted"
    );
    Ok(summary)
}

impl ChannelDeletion {
    fn record(&mut self, step: SweepStep) {
        match step {
            SweepStep::Deleted => self.blocks_deleted += 1,
            SweepStep::Unlinked => self.blocks_unlinked += 1,
            SweepStep::Skipped => {}
        }
    }
}

/// One block of a channel deletion. The link count is re-read here, inside
/// the caller's transaction, not taken from the earlier listing.
fn sweep_block(conn: &Connection, block_id: Uuid, channel_id: Uuid) -> Result<SweepStep, ApiError> {
    if !links::is_linked(conn, block_id, channel_id)? {
        return Ok(SweepStep::Skipped);
    }

    if links::link_count(conn, block_id)? == 1 {
        delete_block_completely(conn, block_id)?;
        Ok(SweepStep::Deleted)
    } else {
        links::remove_link(conn, block_id, channel_id)?;
        Ok(SweepStep::Unlinked)
    }
}

/// Destroy a block and all its edges. Only reachable after one of the
/// cascades above has decided destruction is warranted.
pub(crate) fn delete_block_completely(conn: &Connection, block_id: Uuid) -> Result<(), ApiError> {
    if !blocks::delete_block_completely(conn, block_id)? {
        return Err(ApiError::DeletionFailed(format!(
            "block {} was not removed",
            block_id
        )));
    }
    Ok(())
}
