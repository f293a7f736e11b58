//! End-to-end tests over the HTTP surface.
//!
//! Each test builds the full router on a private in-memory store and drives
//! it with `tower::ServiceExt::oneshot`, so routing, actor resolution,
//! serialisation and the cascades are exercised together.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use weave_api::auth::AppStateInner;
use weave_api::routes::router;
use weave_db::Database;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct TestApp {
    router: Router,
}

struct Session {
    token: String,
    id: String,
}

impl TestApp {
    fn new() -> Self {
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
            token_ttl: chrono::Duration::hours(1),
        });
        Self {
            router: router(state),
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(val) => builder.body(Body::from(val.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = self.router.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn register(&self, username: &str, role: &str) -> Session {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "correct horse battery",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        Session {
            token: body["token"].as_str().unwrap().to_string(),
            id: body["user"]["id"].as_str().unwrap().to_string(),
        }
    }

    async fn create_channel(&self, who: &Session, title: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/channels",
                Some(&who.token),
                Some(json!({ "title": title })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create channel failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_block(&self, who: &Session, channel: &str, content: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/blocks",
                Some(&who.token),
                Some(json!({ "channel_id": channel, "content": content })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create block failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_then_login() {
    let app = TestApp::new();
    let session = app.register("alice", "CREATOR").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "correct horse battery" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], session.id.as_str());
    assert_eq!(body["user"]["role"], "CREATOR");
    assert!(body["user"].get("password").is_none());

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = TestApp::new();
    app.register("alice", "CREATOR").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "username": "alice2",
                "email": "alice@example.com",
                "password": "long enough",
                "role": "VISITOR",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn bad_tokens_are_rejected_but_anonymous_reads_pass() {
    let app = TestApp::new();
    let owner = app.register("owner", "CREATOR").await;
    let channel = app.create_channel(&owner, "Public").await;

    let (status, _) = app
        .send(Method::GET, &format!("/channels/{}", channel), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(Method::GET, &format!("/channels/{}", channel), Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(Method::POST, "/channels", None, Some(json!({ "title": "nope" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, _) = app.send(Method::GET, "/me/channels", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn visitors_cannot_author() {
    let app = TestApp::new();
    let owner = app.register("owner", "CREATOR").await;
    let visitor = app.register("visitor", "VISITOR").await;
    let channel = app.create_channel(&owner, "Gallery").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/channels",
            Some(&visitor.token),
            Some(json!({ "title": "mine" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = app
        .send(
            Method::POST,
            "/blocks",
            Some(&visitor.token),
            Some(json!({ "channel_id": channel, "content": "hello" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Cascades
// ---------------------------------------------------------------------------

#[tokio::test]
async fn channel_owner_removes_foreign_block_without_deleting_it() {
    let app = TestApp::new();
    let u1 = app.register("user1", "CREATOR").await;
    let u2 = app.register("user2", "CREATOR").await;
    let c1 = app.create_channel(&u1, "C1").await;
    let x = app.create_block(&u2, &c1, "X").await;

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/channels/{}/blocks/{}", c1, x),
            Some(&u1.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Block removed from your channel");

    let (status, body) = app.send(Method::GET, &format!("/blocks/{}", x), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["channel_ids"], json!([]));
    assert_eq!(body["owner"]["id"], u2.id.as_str());

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/channels/{}/blocks/{}", c1, x),
            Some(&u2.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Block is not connected to this channel");
}

#[tokio::test]
async fn owner_unlinks_block_from_each_channel_in_turn() {
    let app = TestApp::new();
    let u1 = app.register("user1", "CREATOR").await;
    let u2 = app.register("user2", "CREATOR").await;
    let c1 = app.create_channel(&u1, "C1").await;
    let c2 = app.create_channel(&u1, "C2").await;
    let y = app.create_block(&u2, &c1, "Y").await;

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/channels/{}/blocks/{}", c2, y),
            Some(&u2.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["channel_ids"].as_array().unwrap().len(), 2);

    let (_, body) = app
        .send(
            Method::DELETE,
            &format!("/channels/{}/blocks/{}", c1, y),
            Some(&u2.token),
            None,
        )
        .await;
    assert_eq!(
        body["message"],
        "Block removed from this channel; it still exists in other channels"
    );

    let (_, body) = app
        .send(Method::GET, &format!("/channels/{}/blocks", c2), None, None)
        .await;
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["items"][0]["id"], y.as_str());

    let (_, body) = app
        .send(
            Method::DELETE,
            &format!("/channels/{}/blocks/{}", c2, y),
            Some(&u2.token),
            None,
        )
        .await;
    assert_eq!(body["message"], "Block fully deleted");

    let (status, _) = app.send(Method::GET, &format!("/blocks/{}", y), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/channels/{}/blocks/{}", c2, y),
            Some(&u2.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Block was already deleted");
}

#[tokio::test]
async fn connecting_requires_owning_an_endpoint_and_is_idempotent() {
    let app = TestApp::new();
    let owner = app.register("owner", "CREATOR").await;
    let stranger = app.register("stranger", "CREATOR").await;
    let a = app.create_channel(&owner, "a").await;
    let b = app.create_channel(&owner, "b").await;
    let block = app.create_block(&owner, &a, "content").await;
    let uri = format!("/channels/{}/blocks/{}", b, block);

    let (status, _) = app.send(Method::PUT, &uri, Some(&stranger.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, first) = app.send(Method::PUT, &uri, Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = app.send(Method::PUT, &uri, Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["channel_ids"], second["channel_ids"]);

    let (_, channels) = app
        .send(Method::GET, &format!("/blocks/{}/channels", block), None, None)
        .await;
    assert_eq!(channels.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn deleting_a_channel_cascades() {
    let app = TestApp::new();
    let owner = app.register("owner", "CREATOR").await;
    let guest = app.register("guest", "CREATOR").await;
    let doomed = app.create_channel(&owner, "doomed").await;
    let kept = app.create_channel(&guest, "kept").await;

    let exclusive = app.create_block(&guest, &doomed, "only here").await;
    let shared = app.create_block(&guest, &kept, "both").await;
    app.send(
        Method::PUT,
        &format!("/channels/{}/blocks/{}", doomed, shared),
        Some(&guest.token),
        None,
    )
    .await;

    let (status, _) = app
        .send(Method::DELETE, &format!("/channels/{}", doomed), Some(&guest.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::DELETE, &format!("/channels/{}", doomed), Some(&owner.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "message": "Channel deleted",
            "blocks_deleted": 1,
            "blocks_unlinked": 1,
        })
    );

    let (status, _) = app
        .send(Method::GET, &format!("/blocks/{}", exclusive), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, page) = app
        .send(Method::GET, &format!("/channels/{}/blocks", doomed), None, None)
        .await;
    assert_eq!(page, json!({ "items": [], "total_count": 0, "has_more": false }));

    let (_, page) = app
        .send(Method::GET, &format!("/channels/{}/blocks", kept), None, None)
        .await;
    assert_eq!(page["items"][0]["id"], shared.as_str());
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_pages_and_validates_limits() {
    let app = TestApp::new();
    let owner = app.register("owner", "CREATOR").await;
    let channel = app.create_channel(&owner, "Typography").await;
    for i in 0..3 {
        app.create_block(&owner, &channel, &format!("Serif specimen {}", i))
            .await;
    }
    app.create_block(&owner, &channel, "unrelated").await;

    let (status, page) = app
        .send(Method::GET, "/search/blocks?query=serif&limit=2", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total_count"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["has_more"], true);

    let (_, page) = app
        .send(Method::GET, "/search/blocks?query=serif&limit=2&offset=2", None, None)
        .await;
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["has_more"], false);

    let (_, page) = app
        .send(Method::GET, "/search/channels?query=TYPO", None, None)
        .await;
    assert_eq!(page["items"][0]["id"], channel.as_str());

    let (status, body) = app
        .send(Method::GET, "/search/blocks?limit=101", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_failed");
}

#[tokio::test]
async fn channel_listings_by_owner() {
    let app = TestApp::new();
    let owner = app.register("owner", "CREATOR").await;
    let other = app.register("other", "CREATOR").await;
    app.create_channel(&owner, "one").await;
    app.create_channel(&owner, "two").await;
    app.create_channel(&other, "three").await;

    let (_, mine) = app
        .send(Method::GET, "/me/channels", Some(&owner.token), None)
        .await;
    let titles: Vec<&str> = mine
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["two", "one"]);

    let (status, theirs) = app
        .send(Method::GET, &format!("/users/{}/channels", other.id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(theirs.as_array().unwrap().len(), 1);
}
