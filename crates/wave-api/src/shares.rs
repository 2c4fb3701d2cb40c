use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;

use wave_types::api::{Claims, EmotionListResponse, ShareRequest, ShareResponse};

use crate::emotions::to_list_item;
use crate::error::ApiError;
use crate::state::{AppState, with_db};

/// POST /v1/user/emotion/{emotion_id}/share: only the owner may grant.
pub async fn share_emotion(
    State(state): State<AppState>,
    Path(emotion_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<ShareRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let emotion = with_db(&state, move |db| db.get_emotion(emotion_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Emotion"))?;

    if emotion.owner_id != claims.user_id {
        return Err(ApiError::Forbidden(
            "Only the owner can share this emotion".into(),
        ));
    }
    if req.user_id == emotion.owner_id {
        return Err(ApiError::BadRequest(
            "Cannot share an emotion with its owner".into(),
        ));
    }

    let recipient = req.user_id.clone();
    if with_db(&state, move |db| db.get_user_by_id(&recipient))
        .await?
        .is_none()
    {
        return Err(ApiError::not_found("User"));
    }

    let recipient = req.user_id.clone();
    let grant = with_db(&state, move |db| db.share_emotion(emotion_id, &recipient))
        .await
        .map_err(|e| match e {
            ApiError::Conflict(_) => {
                ApiError::BadRequest("Emotion already shared with this user".into())
            }
            other => other,
        })?;

    info!("Emotion {} shared with user {}", emotion_id, grant.user_id);

    Ok((
        StatusCode::CREATED,
        Json(ShareResponse {
            emotion_id: grant.emotion_id,
            user_id: grant.user_id,
            shared_at: grant.shared_at,
        }),
    ))
}

/// GET /v1/user/emotion/{emotion_id}/share: the entry's grants, owner only.
pub async fn share_recipients(
    State(state): State<AppState>,
    Path(emotion_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ShareResponse>>, ApiError> {
    let (emotion, grants) = with_db(&state, move |db| {
        let Some(emotion) = db.get_emotion(emotion_id)? else {
            return Ok((None, Vec::new()));
        };
        let grants = db.get_share_recipients(emotion_id)?;
        Ok((Some(emotion), grants))
    })
    .await?;

    let emotion = emotion.ok_or_else(|| ApiError::not_found("Emotion"))?;
    if emotion.owner_id != claims.user_id {
        return Err(ApiError::Forbidden(
            "Only the owner can see who this emotion is shared with".into(),
        ));
    }

    Ok(Json(
        grants
            .into_iter()
            .map(|grant| ShareResponse {
                emotion_id: grant.emotion_id,
                user_id: grant.user_id,
                shared_at: grant.shared_at,
            })
            .collect(),
    ))
}

/// GET /v1/user/emotions/shared: entries other users shared with the caller.
pub async fn shared_with_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<EmotionListResponse>, ApiError> {
    let rows = with_db(&state, move |db| db.get_emotions_shared_with(&claims.user_id)).await?;

    Ok(Json(EmotionListResponse {
        total: rows.len() as i64,
        emotions: rows.into_iter().map(to_list_item).collect(),
    }))
}
