use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::info;

use wave_db::models::{EmotionRow, NewEmotion};
use wave_types::api::{
    Claims, EmotionCreate, EmotionListItem, EmotionListResponse, EmotionResponse,
    EmotionsReadResponse,
};
use wave_types::validate::Validate;

use crate::error::ApiError;
use crate::pagination::PageWindow;
use crate::state::{AppState, with_db};

#[derive(Debug, Deserialize)]
pub struct EmotionsQuery {
    pub user_id: String,
    #[serde(rename = "from", default = "default_from")]
    pub from: i64,
    #[serde(default = "default_to")]
    pub to: i64,
}

fn default_from() -> i64 {
    1
}

fn default_to() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: String,
}

/// POST /v1/user/emotion/new
pub async fn new_emotion(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<EmotionCreate>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let owner_id = req.id.clone();
    if with_db(&state, move |db| db.get_user_by_id(&owner_id))
        .await?
        .is_none()
    {
        return Err(ApiError::BadRequest("User id invalid".into()));
    }

    let new_emotion = NewEmotion {
        owner_id: req.id,
        cards: [req.card1, req.card2, req.card3],
        before_levels: [
            req.before_card1_level,
            req.before_card2_level,
            req.before_card3_level,
        ],
        after_levels: [
            req.after_card1_level,
            req.after_card2_level,
            req.after_card3_level,
        ],
        story: req.story,
        thoughts_action: req.thoughts_action,
        consequences: req.consequences,
        feeling_of_consequences: req.feeling_of_consequences,
        result_of_expect: req.result_of_expect,
        take_out: req.take_out,
    };

    let row = with_db(&state, move |db| db.create_emotion(&new_emotion)).await?;
    info!("Emotion {} created for user {}", row.id, row.owner_id);

    Ok((StatusCode::CREATED, Json(to_response(row, true))))
}

/// GET /v1/user/emotions?user_id=&from=&to=: newest first, 1-based
/// inclusive range.
pub async fn get_emotions(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    WithRejection(Query(query), _): WithRejection<Query<EmotionsQuery>, ApiError>,
) -> Result<Json<EmotionsReadResponse>, ApiError> {
    let window = PageWindow::from_range(query.from, query.to);

    let rows = with_db(&state, move |db| {
        if db.get_user_by_id(&query.user_id)?.is_none() {
            return Ok(None);
        }
        db.get_user_emotions(&query.user_id, window.skip, window.limit)
            .map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("User"))?;

    let (rows, more_emotions) = window.split(rows);

    Ok(Json(EmotionsReadResponse {
        emotions: rows.into_iter().map(|row| to_response(row, false)).collect(),
        more_emotions,
    }))
}

/// GET /v1/user/emotions/lists?user_id=: every entry, list shape.
pub async fn list_emotions(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, ApiError>,
) -> Result<Json<EmotionListResponse>, ApiError> {
    let (rows, total) = with_db(&state, move |db| db.get_user_emotion_list(&query.user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(EmotionListResponse {
        emotions: rows.into_iter().map(to_list_item).collect(),
        total,
    }))
}

pub(crate) fn to_response(row: EmotionRow, with_owner: bool) -> EmotionResponse {
    EmotionResponse {
        id: row.id,
        owner_id: with_owner.then_some(row.owner_id),
        card1: row.card1,
        card2: row.card2,
        card3: row.card3,
        before_card1_level: row.before_card1_level,
        before_card2_level: row.before_card2_level,
        before_card3_level: row.before_card3_level,
        story: row.story,
        thoughts_action: row.thoughts_action,
        consequences: row.consequences,
        feeling_of_consequences: row.feeling_of_consequences,
        result_of_expect: row.result_of_expect,
        take_out: row.take_out,
        after_card1_level: row.after_card1_level,
        after_card2_level: row.after_card2_level,
        after_card3_level: row.after_card3_level,
        create: row.created_at,
    }
}

pub(crate) fn to_list_item(row: EmotionRow) -> EmotionListItem {
    EmotionListItem {
        id: row.id,
        owner_id: row.owner_id,
        card1: row.card1,
        card2: row.card2,
        card3: row.card3,
        result_of_expect: row.result_of_expect,
        create: row.created_at,
    }
}
