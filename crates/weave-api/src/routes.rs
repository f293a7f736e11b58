use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::auth::{self, AppState};
use crate::middleware::resolve_actor;
use crate::{blocks, channels, linking, search};

/// Every HTTP route. Handlers see an optional actor resolved from the bearer
/// token; each decides for itself whether one is required.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/blocks", post(blocks::post_block))
        .route("/blocks/{id}", get(blocks::get_block).patch(blocks::patch_block))
        .route("/blocks/{id}/channels", get(blocks::get_block_channels))
        .route("/channels", post(channels::post_channel))
        .route(
            "/channels/{id}",
            get(channels::get_channel)
                .patch(channels::patch_channel)
                .delete(channels::remove_channel),
        )
        .route("/channels/{id}/blocks", get(channels::get_channel_blocks))
        .route(
            "/channels/{id}/blocks/{block_id}",
            put(linking::put_block_in_channel).delete(blocks::remove_block_from_channel),
        )
        .route("/users/{id}/channels", get(channels::get_user_channels))
        .route("/me/channels", get(channels::get_my_channels))
        .route("/search/blocks", get(search::get_search_blocks))
        .route("/search/channels", get(search::get_search_channels))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_actor))
        .with_state(state)
}
