use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;

use wave_db::models::{ChatRow, EmotionRow};
use wave_types::api::{ChatCreate, ChatResponse, Claims};
use wave_types::validate::Validate;

use crate::error::ApiError;
use crate::state::{AppState, with_db};

/// GET /v1/user/emotion/{emotion_id}/chats: the entry's thread, oldest
/// first. Visible to the owner and to users it was shared with.
pub async fn get_chats(
    State(state): State<AppState>,
    Path(emotion_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ChatResponse>>, ApiError> {
    thread_access(&state, emotion_id, &claims.user_id).await?;

    let rows = with_db(&state, move |db| db.get_chats_for_emotion(emotion_id)).await?;
    Ok(Json(rows.into_iter().map(to_response).collect()))
}

/// POST /v1/user/emotion/{emotion_id}/chats: the caller is the sender; the
/// receiver must also have access to the entry.
pub async fn post_chat(
    State(state): State<AppState>,
    Path(emotion_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<ChatCreate>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let emotion = thread_access(&state, emotion_id, &claims.user_id).await?;

    if req.receiver_id == claims.user_id {
        return Err(ApiError::BadRequest("Cannot send a message to yourself".into()));
    }
    let receiver = req.receiver_id.clone();
    let receiver_allowed = receiver == emotion.owner_id
        || with_db(&state, move |db| db.is_shared_with(emotion_id, &receiver)).await?;
    if !receiver_allowed {
        return Err(ApiError::BadRequest(
            "Receiver has no access to this emotion".into(),
        ));
    }

    let sender = claims.user_id.clone();
    let row = with_db(&state, move |db| {
        db.insert_chat(emotion_id, &sender, &req.receiver_id, &req.content)
    })
    .await?;

    info!("Chat {} posted on emotion {}", row.id, emotion_id);
    Ok((StatusCode::CREATED, Json(to_response(row))))
}

/// Load the entry and check that `user_id` owns it or has a share grant.
async fn thread_access(state: &AppState, emotion_id: i64, user_id: &str) -> Result<EmotionRow, ApiError> {
    let uid = user_id.to_string();
    let (emotion, shared) = with_db(state, move |db| {
        let Some(emotion) = db.get_emotion(emotion_id)? else {
            return Ok((None, false));
        };
        let shared = emotion.owner_id != uid && db.is_shared_with(emotion_id, &uid)?;
        Ok((Some(emotion), shared))
    })
    .await?;

    let emotion = emotion.ok_or_else(|| ApiError::not_found("Emotion"))?;
    if emotion.owner_id != user_id && !shared {
        return Err(ApiError::Forbidden(
            "You don't have access to this emotion".into(),
        ));
    }
    Ok(emotion)
}

fn to_response(row: ChatRow) -> ChatResponse {
    ChatResponse {
        id: row.id,
        emotion_id: row.emotion_id,
        sender_id: row.sender_id,
        receiver_id: row.receiver_id,
        content: row.content,
        created_at: row.created_at,
    }
}
