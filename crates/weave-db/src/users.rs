use anyhow::{Result, anyhow};
use rusqlite::Connection;
use uuid::Uuid;
use weave_types::models::Role;

use crate::models::UserRow;
use crate::{Database, OptionalExt, now_timestamp, parse_timestamp, parse_uuid};

const USER_COLUMNS: &str = "id, username, email, password, role, created_at, updated_at";

impl Database {
    pub fn create_user(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO users (id, username, email, password, role, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![id.to_string(), username, email, password_hash, role.as_str(), now],
            )?;
            query_user(conn, "id", &id.to_string())?
                .ok_or_else(|| anyhow!("User vanished after insert: {}", id))
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))
    }
}

/// `column` is always one of the fixed unique columns above, never input.
fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt.query_row([value], row_to_user).optional()?;
    Ok(row)
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    let id: String = row.get(0)?;
    let role: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    Ok(UserRow {
        id: parse_uuid(0, &id)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: role.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
        })?,
        created_at: parse_timestamp(5, &created_at)?,
        updated_at: parse_timestamp(6, &updated_at)?,
    })
}
