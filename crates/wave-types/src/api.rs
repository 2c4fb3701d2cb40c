use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// -- Identity claims --

/// Decoded bearer token claims. `user_id` mirrors `sub` because handlers
/// authorize on it by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
}

// -- Users --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public profile. Timestamps carry the offset they are rendered in: UTC
/// right after registration, the user's own zone when read back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub birthday: Option<DateTime<FixedOffset>>,
    pub occupation: Option<String>,
    pub timezone: String,
    pub sign_up_day: DateTime<FixedOffset>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub token_type: String,
}

/// PATCH body. The outer `Option` is "was the field sent"; the inner one is
/// "does it carry a value". Empty strings arrive as `Some(None)`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserUpdate {
    #[serde(default, deserialize_with = "blank_as_unset")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "blank_as_unset")]
    pub birthday: Option<Option<String>>,
    #[serde(default, deserialize_with = "blank_as_unset")]
    pub occupation: Option<Option<String>>,
    #[serde(default, deserialize_with = "blank_as_unset")]
    pub timezone: Option<Option<String>>,
}

fn blank_as_unset<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(Some(value.filter(|v| !v.is_empty())))
}

// -- Emotions --

/// New journal entry. `id` is the owner's user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionCreate {
    pub id: String,
    pub card1: i64,
    pub card2: i64,
    pub card3: i64,
    pub before_card1_level: i64,
    pub before_card2_level: i64,
    pub before_card3_level: i64,
    #[serde(default)]
    pub story: Option<String>,
    #[serde(default)]
    pub thoughts_action: Option<String>,
    #[serde(default)]
    pub consequences: Option<String>,
    #[serde(default)]
    pub feeling_of_consequences: Option<String>,
    #[serde(default)]
    pub result_of_expect: Option<String>,
    #[serde(default)]
    pub take_out: Option<String>,
    pub after_card1_level: i64,
    pub after_card2_level: i64,
    pub after_card3_level: i64,
}

/// Full entry. `create` is the server-assigned creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionResponse {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub owner_id: Option<String>,
    pub card1: i64,
    pub card2: i64,
    pub card3: i64,
    pub before_card1_level: i64,
    pub before_card2_level: i64,
    pub before_card3_level: i64,
    pub story: Option<String>,
    pub thoughts_action: Option<String>,
    pub consequences: Option<String>,
    pub feeling_of_consequences: Option<String>,
    pub result_of_expect: Option<String>,
    pub take_out: Option<String>,
    pub after_card1_level: i64,
    pub after_card2_level: i64,
    pub after_card3_level: i64,
    pub create: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmotionsReadResponse {
    pub emotions: Vec<EmotionResponse>,
    pub more_emotions: bool,
}

/// Lighter row for list views: the cards and outcome, no narrative text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionListItem {
    pub id: i64,
    pub owner_id: String,
    pub card1: i64,
    pub card2: i64,
    pub card3: i64,
    pub result_of_expect: Option<String>,
    pub create: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmotionListResponse {
    pub emotions: Vec<EmotionListItem>,
    pub total: i64,
}

// -- Sharing --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShareRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShareResponse {
    pub emotion_id: i64,
    pub user_id: String,
    pub shared_at: DateTime<Utc>,
}

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatCreate {
    pub receiver_id: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: i64,
    pub emotion_id: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
