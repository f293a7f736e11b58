//! Link edges between blocks and channels.
//!
//! Plain functions over a `&Connection` so the cascade code can compose them
//! inside a single [`Database::transaction`](crate::Database::transaction).

use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use crate::models::LinkState;
use crate::{OptionalExt, parse_uuid};

/// Owners, total link count and target-link presence for one block/channel
/// pair. `None` means the block itself does not exist.
pub fn link_state(conn: &Connection, block_id: Uuid, channel_id: Uuid) -> Result<Option<LinkState>> {
    let row = conn
        .query_row(
            "SELECT b.owner_id,
                    (SELECT owner_id FROM channels WHERE id = ?2),
                    (SELECT COUNT(*) FROM block_links WHERE block_id = b.id),
                    EXISTS(SELECT 1 FROM block_links WHERE block_id = b.id AND channel_id = ?2)
             FROM blocks b
             WHERE b.id = ?1",
            [block_id.to_string(), channel_id.to_string()],
            |row| {
                let block_owner: String = row.get(0)?;
                let channel_owner: Option<String> = row.get(1)?;
                Ok(LinkState {
                    block_owner_id: parse_uuid(0, &block_owner)?,
                    channel_owner_id: channel_owner.map(|o| parse_uuid(1, &o)).transpose()?,
                    total_links: row.get(2)?,
                    linked_to_target: row.get(3)?,
                })
            },
        )
        .optional()?;

    Ok(row)
}

/// Creates the edge if absent. Returns true only when a new edge was written.
pub fn insert_link(conn: &Connection, block_id: Uuid, channel_id: Uuid, now: &str) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO block_links (block_id, channel_id, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![block_id.to_string(), channel_id.to_string(), now],
    )?;
    Ok(inserted > 0)
}

pub fn remove_link(conn: &Connection, block_id: Uuid, channel_id: Uuid) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM block_links WHERE block_id = ?1 AND channel_id = ?2",
        [block_id.to_string(), channel_id.to_string()],
    )?;
    Ok(removed > 0)
}

pub fn is_linked(conn: &Connection, block_id: Uuid, channel_id: Uuid) -> Result<bool> {
    let linked = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM block_links WHERE block_id = ?1 AND channel_id = ?2)",
        [block_id.to_string(), channel_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(linked)
}

pub fn link_count(conn: &Connection, block_id: Uuid) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM block_links WHERE block_id = ?1",
        [block_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Ids of every block currently linked to `channel_id`.
pub fn blocks_in_channel(conn: &Connection, channel_id: Uuid) -> Result<Vec<Uuid>> {
    let mut stmt =
        conn.prepare("SELECT block_id FROM block_links WHERE channel_id = ?1 ORDER BY rowid")?;
    let ids = stmt
        .query_map([channel_id.to_string()], |row| {
            let id: String = row.get(0)?;
            parse_uuid(0, &id)
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}
