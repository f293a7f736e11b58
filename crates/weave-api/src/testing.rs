//! Fixtures for unit tests: an in-memory store plus shortcuts for seeding it.

use uuid::Uuid;

use weave_db::{Database, blocks, channels, links};
use weave_types::models::Role;

use crate::middleware::Actor;

pub struct TestWorld {
    pub db: Database,
}

impl TestWorld {
    pub fn new() -> Self {
        Self {
            db: Database::open_in_memory().unwrap(),
        }
    }

    pub fn user(&self, username: &str, role: Role) -> Actor {
        let id = Uuid::new_v4();
        let email = format!("{}@example.com", username);
        self.db
            .create_user(id, username, &email, "not-a-real-hash", role)
            .unwrap();
        Actor {
            id,
            username: username.to_string(),
            role,
        }
    }

    pub fn channel(&self, owner: &Actor, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.db
            .with_conn_mut(|conn| {
                channels::insert_channel(conn, id, owner.id, title, None, &weave_db::now_timestamp())
            })
            .unwrap();
        id
    }

    /// A block owned by `owner`, linked into `channel`.
    pub fn block(&self, owner: &Actor, channel: Uuid, content: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.db
            .with_conn_mut(|conn| {
                let now = weave_db::now_timestamp();
                blocks::insert_block(conn, id, owner.id, None, None, content, &now)?;
                links::insert_link(conn, id, channel, &now)?;
                Ok(())
            })
            .unwrap();
        id
    }
}

pub fn link_count(db: &Database, block_id: Uuid) -> i64 {
    db.with_conn(|conn| links::link_count(conn, block_id)).unwrap()
}
