use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use crate::models::ChannelRow;
use crate::{Database, OptionalExt, parse_timestamp, parse_uuid};

pub(crate) const CHANNEL_SELECT: &str =
    "SELECT c.id, c.owner_id, u.username, c.title, c.description, c.created_at, c.updated_at
     FROM channels c
     JOIN users u ON u.id = c.owner_id";

impl Database {
    pub fn get_channel(&self, id: Uuid) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| query_channel(conn, id))
    }

    pub fn list_channels_by_owner(&self, owner_id: Uuid) -> Result<Vec<ChannelRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE c.owner_id = ?1 ORDER BY c.created_at DESC, c.rowid DESC",
                CHANNEL_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id.to_string()], row_to_channel)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Channels a block is linked to, newest channel first.
    pub fn channels_for_block(&self, block_id: Uuid) -> Result<Vec<ChannelRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} JOIN block_links l ON l.channel_id = c.id
                 WHERE l.block_id = ?1
                 ORDER BY c.created_at DESC, c.rowid DESC",
                CHANNEL_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([block_id.to_string()], row_to_channel)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

pub fn insert_channel(
    conn: &Connection,
    id: Uuid,
    owner_id: Uuid,
    title: &str,
    description: Option<&str>,
    now: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO channels (id, owner_id, title, description, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        rusqlite::params![id.to_string(), owner_id.to_string(), title, description, now],
    )?;
    Ok(())
}

pub fn query_channel(conn: &Connection, id: Uuid) -> Result<Option<ChannelRow>> {
    let sql = format!("{} WHERE c.id = ?1", CHANNEL_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id.to_string()], row_to_channel).optional()?;
    Ok(row)
}

pub fn channel_owner(conn: &Connection, id: Uuid) -> Result<Option<Uuid>> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT owner_id FROM channels WHERE id = ?1",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    Ok(owner.map(|o| parse_uuid(0, &o)).transpose()?)
}

/// `None` fields keep their stored value. Returns false if no such channel.
pub fn update_channel(
    conn: &Connection,
    id: Uuid,
    title: Option<&str>,
    description: Option<&str>,
    now: &str,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE channels
         SET title = COALESCE(?2, title),
             description = COALESCE(?3, description),
             updated_at = ?4
         WHERE id = ?1",
        rusqlite::params![id.to_string(), title, description, now],
    )?;
    Ok(changed > 0)
}

/// Removes the channel row and every link edge still touching it.
pub fn delete_channel_row(conn: &Connection, id: Uuid) -> Result<bool> {
    conn.execute("DELETE FROM block_links WHERE channel_id = ?1", [id.to_string()])?;
    let deleted = conn.execute("DELETE FROM channels WHERE id = ?1", [id.to_string()])?;
    Ok(deleted > 0)
}

pub(crate) fn row_to_channel(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChannelRow> {
    let id: String = row.get(0)?;
    let owner_id: String = row.get(1)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    Ok(ChannelRow {
        id: parse_uuid(0, &id)?,
        owner_id: parse_uuid(1, &owner_id)?,
        owner_username: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        created_at: parse_timestamp(5, &created_at)?,
        updated_at: parse_timestamp(6, &updated_at)?,
    })
}
