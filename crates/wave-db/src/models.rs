/// Row types mapped straight from SQLite rows.
/// Distinct from wave-types API models to keep the DB layer independent.
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub birthday: Option<DateTime<Utc>>,
    pub occupation: Option<String>,
    pub timezone: String,
    pub sign_up_day: DateTime<Utc>,
}

/// Insert payload for `create_user`. `sign_up_day` is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub birthday: Option<DateTime<Utc>>,
    pub occupation: Option<String>,
    pub timezone: String,
}

/// Field-level patch for a user row. `None` leaves the column alone; for the
/// nullable columns `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub birthday: Option<Option<DateTime<Utc>>>,
    pub occupation: Option<Option<String>>,
    pub timezone: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.birthday.is_none()
            && self.occupation.is_none()
            && self.timezone.is_none()
    }
}

/// Sign-in record owned by the built-in identity provider. Kept apart from
/// `users`: the account exists before the profile row does.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRow {
    pub uid: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub uid: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmotionRow {
    pub id: i64,
    pub owner_id: String,
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
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `create_emotion`. The id and `created_at` are assigned
/// by the store.
#[derive(Debug, Clone)]
pub struct NewEmotion {
    pub owner_id: String,
    pub cards: [i64; 3],
    pub before_levels: [i64; 3],
    pub after_levels: [i64; 3],
    pub story: Option<String>,
    pub thoughts_action: Option<String>,
    pub consequences: Option<String>,
    pub feeling_of_consequences: Option<String>,
    pub result_of_expect: Option<String>,
    pub take_out: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShareRow {
    pub emotion_id: i64,
    pub user_id: String,
    pub shared_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRow {
    pub id: i64,
    pub emotion_id: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
