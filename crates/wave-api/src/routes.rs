use axum::{
    Json, Router, middleware,
    routing::{get, patch, post},
};
use serde_json::{Value, json};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{chats, emotions, shares, users};

/// All API routes. Transport layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(hello))
        .route("/v1/user/register", post(users::register))
        .route("/v1/user/login", post(users::login));

    let protected_routes = Router::new()
        .route("/v1/user/{user_id}", patch(users::update_user))
        .route("/v1/users/{user_id}", get(users::read_user))
        .route("/v1/user/emotion/new", post(emotions::new_emotion))
        .route("/v1/user/emotions", get(emotions::get_emotions))
        .route("/v1/user/emotions/lists", get(emotions::list_emotions))
        .route("/v1/user/emotions/shared", get(shares::shared_with_me))
        .route(
            "/v1/user/emotion/{emotion_id}/share",
            get(shares::share_recipients).post(shares::share_emotion),
        )
        .route(
            "/v1/user/emotion/{emotion_id}/chats",
            get(chats::get_chats).post(chats::post_chat),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn hello() -> Json<Value> {
    Json(json!({ "Hello": "World" }))
}
