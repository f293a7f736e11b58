//! Filtered, paginated listings: a count query plus a bounded listing query
//! sharing the same filter, newest first.

use anyhow::Result;
use rusqlite::types::ToSql;
use uuid::Uuid;

use crate::Database;
use crate::blocks::{BLOCK_COLUMNS, attach_channel_ids, row_to_block};
use crate::channels::{CHANNEL_SELECT, row_to_channel};
use crate::models::{BlockRow, ChannelRow};

/// One listing window. `query` is matched as a case-insensitive substring.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub query: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Database {
    /// Blocks, optionally restricted to one channel, with the total number of
    /// matches ignoring the window.
    pub fn search_blocks(
        &self,
        channel_id: Option<Uuid>,
        page: &PageRequest,
    ) -> Result<(Vec<BlockRow>, u64)> {
        self.with_conn(|conn| {
            let channel = channel_id.map(|id| id.to_string());
            let pattern = page.query.as_deref().map(like_pattern);

            let mut params: Vec<&dyn ToSql> = Vec::new();
            let mut join = String::new();
            let mut filter = String::new();

            if let Some(channel) = &channel {
                params.push(channel);
                join = format!(
                    "JOIN block_links l ON l.block_id = b.id AND l.channel_id = ?{}",
                    params.len()
                );
            }
            if let Some(pattern) = &pattern {
                params.push(pattern);
                let n = params.len();
                filter = format!(
                    "WHERE b.title LIKE ?{n} ESCAPE '\\'
                        OR b.description LIKE ?{n} ESCAPE '\\'
                        OR b.content LIKE ?{n} ESCAPE '\\'"
                );
            }

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM blocks b {} {}", join, filter),
                params.as_slice(),
                |row| row.get(0),
            )?;

            let limit = i64::from(page.limit);
            let offset = i64::from(page.offset);
            let mut list_params = params.clone();
            list_params.push(&limit);
            list_params.push(&offset);

            let sql = format!(
                "SELECT {} FROM blocks b JOIN users u ON u.id = b.owner_id {} {}
                 ORDER BY b.created_at DESC, b.rowid DESC
                 LIMIT ?{} OFFSET ?{}",
                BLOCK_COLUMNS,
                join,
                filter,
                list_params.len() - 1,
                list_params.len()
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt
                .query_map(list_params.as_slice(), row_to_block)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            attach_channel_ids(conn, &mut rows)?;
            Ok((rows, total as u64))
        })
    }

    pub fn search_channels(&self, page: &PageRequest) -> Result<(Vec<ChannelRow>, u64)> {
        self.with_conn(|conn| {
            let pattern = page.query.as_deref().map(like_pattern);

            let mut params: Vec<&dyn ToSql> = Vec::new();
            let mut filter = String::new();
            if let Some(pattern) = &pattern {
                params.push(pattern);
                filter = "WHERE c.title LIKE ?1 ESCAPE '\\' OR c.description LIKE ?1 ESCAPE '\\'"
                    .to_string();
            }

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM channels c {}", filter),
                params.as_slice(),
                |row| row.get(0),
            )?;

            let limit = i64::from(page.limit);
            let offset = i64::from(page.offset);
            let mut list_params = params.clone();
            list_params.push(&limit);
            list_params.push(&offset);

            let sql = format!(
                "{} {} ORDER BY c.created_at DESC, c.rowid DESC LIMIT ?{} OFFSET ?{}",
                CHANNEL_SELECT,
                filter,
                list_params.len() - 1,
                list_params.len()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(list_params.as_slice(), row_to_channel)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows, total as u64))
        })
    }
}

/// `%needle%` with LIKE metacharacters in the needle escaped by `\`.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
