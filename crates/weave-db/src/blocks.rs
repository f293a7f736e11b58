use std::collections::HashMap;

use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use crate::models::BlockRow;
use crate::{Database, OptionalExt, parse_timestamp, parse_uuid};

pub(crate) const BLOCK_COLUMNS: &str =
    "b.id, b.owner_id, u.username, b.title, b.description, b.content, b.created_at, b.updated_at";

impl Database {
    /// Looks a block up regardless of how many channels it is linked to.
    pub fn get_block(&self, id: Uuid) -> Result<Option<BlockRow>> {
        self.with_conn(|conn| query_block(conn, id))
    }
}

pub fn insert_block(
    conn: &Connection,
    id: Uuid,
    owner_id: Uuid,
    title: Option<&str>,
    description: Option<&str>,
    content: &str,
    now: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO blocks (id, owner_id, title, description, content, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        rusqlite::params![id.to_string(), owner_id.to_string(), title, description, content, now],
    )?;
    Ok(())
}

pub fn query_block(conn: &Connection, id: Uuid) -> Result<Option<BlockRow>> {
    let sql = format!(
        "SELECT {} FROM blocks b JOIN users u ON u.id = b.owner_id WHERE b.id = ?1",
        BLOCK_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id.to_string()], row_to_block).optional()?;

    match row {
        Some(mut block) => {
            block.channel_ids = channel_ids_for(conn, id)?;
            Ok(Some(block))
        }
        None => Ok(None),
    }
}

pub fn block_owner(conn: &Connection, id: Uuid) -> Result<Option<Uuid>> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT owner_id FROM blocks WHERE id = ?1",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    Ok(owner.map(|o| parse_uuid(0, &o)).transpose()?)
}

/// `None` fields keep their stored value. Returns false if no such block.
pub fn update_block(
    conn: &Connection,
    id: Uuid,
    title: Option<&str>,
    description: Option<&str>,
    content: Option<&str>,
    now: &str,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE blocks
         SET title = COALESCE(?2, title),
             description = COALESCE(?3, description),
             content = COALESCE(?4, content),
             updated_at = ?5
         WHERE id = ?1",
        rusqlite::params![id.to_string(), title, description, content, now],
    )?;
    Ok(changed > 0)
}

/// Unconditionally removes a block and every link edge it has.
///
/// No ownership or link-count check happens here; callers decide whether
/// destruction is allowed before calling it.
pub fn delete_block_completely(conn: &Connection, id: Uuid) -> Result<bool> {
    conn.execute("DELETE FROM block_links WHERE block_id = ?1", [id.to_string()])?;
    let deleted = conn.execute("DELETE FROM blocks WHERE id = ?1", [id.to_string()])?;
    Ok(deleted > 0)
}

fn channel_ids_for(conn: &Connection, block_id: Uuid) -> Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(
        "SELECT channel_id FROM block_links WHERE block_id = ?1 ORDER BY created_at, rowid",
    )?;
    let ids = stmt
        .query_map([block_id.to_string()], |row| {
            let id: String = row.get(0)?;
            parse_uuid(0, &id)
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Batch-fill `channel_ids` for a page of blocks (one query, not N).
pub(crate) fn attach_channel_ids(conn: &Connection, blocks: &mut [BlockRow]) -> Result<()> {
    if blocks.is_empty() {
        return Ok(());
    }

    let ids: Vec<String> = blocks.iter().map(|b| b.id.to_string()).collect();
    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT block_id, channel_id FROM block_links
         WHERE block_id IN ({})
         ORDER BY created_at, rowid",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> = ids
        .iter()
        .map(|id| id as &dyn rusqlite::types::ToSql)
        .collect();

    let pairs = stmt
        .query_map(params.as_slice(), |row| {
            let block_id: String = row.get(0)?;
            let channel_id: String = row.get(1)?;
            Ok((parse_uuid(0, &block_id)?, parse_uuid(1, &channel_id)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut by_block: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (block_id, channel_id) in pairs {
        by_block.entry(block_id).or_default().push(channel_id);
    }
    for block in blocks.iter_mut() {
        block.channel_ids = by_block.remove(&block.id).unwrap_or_default();
    }

    Ok(())
}

pub(crate) fn row_to_block(row: &rusqlite::Row<'_>) -> rusqlite::Result<BlockRow> {
    let id: String = row.get(0)?;
    let owner_id: String = row.get(1)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(BlockRow {
        id: parse_uuid(0, &id)?,
        owner_id: parse_uuid(1, &owner_id)?,
        owner_username: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        content: row.get(5)?,
        channel_ids: Vec::new(),
        created_at: parse_timestamp(6, &created_at)?,
        updated_at: parse_timestamp(7, &updated_at)?,
    })
}
