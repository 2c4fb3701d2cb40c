use crate::models::{
    AccountRow, ChatRow, EmotionRow, NewAccount, NewEmotion, NewUser, ShareRow, UserChanges,
    UserRow,
};
use crate::{Database, DbError, timestamp};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, ffi, params, params_from_iter};

const USER_SELECT: &str =
    "SELECT id, email, name, birthday, occupation, timezone, sign_up_day FROM users";

const EMOTION_SELECT: &str = "SELECT e.id, e.owner_id, e.card1, e.card2, e.card3,
        e.before_card1_level, e.before_card2_level, e.before_card3_level,
        e.story, e.thoughts_action, e.consequences, e.feeling_of_consequences,
        e.result_of_expect, e.take_out,
        e.after_card1_level, e.after_card2_level, e.after_card3_level,
        e.created_at
    FROM emotions e";

const ACCOUNT_SELECT: &str =
    "SELECT uid, email, password_hash, display_name, created_at FROM identity_accounts";

const CHAT_SELECT: &str =
    "SELECT id, emotion_id, sender_id, receiver_id, content, created_at FROM chats";

impl Database {
    // -- Users --

    /// Insert a user whose id was issued by the identity provider.
    /// Duplicate id or email surfaces as `DbError::Conflict`.
    pub fn create_user(&self, user: &NewUser) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            let birthday = user.birthday.as_ref().map(timestamp::to_text);
            conn.execute(
                "INSERT INTO users (id, email, name, birthday, occupation, timezone, sign_up_day)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user.id,
                    user.email,
                    user.name,
                    birthday,
                    user.occupation,
                    user.timezone,
                    timestamp::to_text(&timestamp::now()),
                ],
            )
            .map_err(classify)?;

            query_user_by_id(conn, &user.id)?
                .ok_or_else(|| anyhow::anyhow!("User {} vanished after insert", user.id))
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(&format!("{USER_SELECT} WHERE email = ?1"), [email], map_user)
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Apply a field-level patch. Returns the updated row, or `None` when no
    /// user has that id.
    pub fn update_user(&self, id: &str, changes: &UserChanges) -> Result<Option<UserRow>> {
        self.with_conn_mut(|conn| {
            if changes.is_empty() {
                return query_user_by_id(conn, id);
            }

            let mut columns: Vec<&str> = Vec::new();
            let mut values: Vec<Value> = Vec::new();

            if let Some(name) = &changes.name {
                columns.push("name");
                values.push(Value::Text(name.clone()));
            }
            if let Some(birthday) = &changes.birthday {
                columns.push("birthday");
                values.push(optional_text(birthday.as_ref().map(timestamp::to_text)));
            }
            if let Some(occupation) = &changes.occupation {
                columns.push("occupation");
                values.push(optional_text(occupation.clone()));
            }
            if let Some(timezone) = &changes.timezone {
                columns.push("timezone");
                values.push(Value::Text(timezone.clone()));
            }

            let assignments: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(i, column)| format!("{} = ?{}", column, i + 1))
                .collect();
            let sql = format!(
                "UPDATE users SET {} WHERE id = ?{}",
                assignments.join(", "),
                columns.len() + 1
            );
            values.push(Value::Text(id.to_string()));
            conn.execute(&sql, params_from_iter(values.iter()))
                .map_err(classify)?;

            query_user_by_id(conn, id)
        })
    }

    // -- Emotions --

    /// Insert a journal entry stamped with the current UTC time.
    pub fn create_emotion(&self, emotion: &NewEmotion) -> Result<EmotionRow> {
        self.with_conn_mut(|conn| insert_emotion(conn, emotion, &timestamp::now()))
    }

    pub fn get_emotion(&self, id: i64) -> Result<Option<EmotionRow>> {
        self.with_conn(|conn| query_emotion_by_id(conn, id))
    }

    /// Newest-first page of a user's entries. Returns up to `limit + 1` rows:
    /// the extra row is a lookahead probe telling the caller another page
    /// exists.
    pub fn get_user_emotions(&self, user_id: &str, skip: i64, limit: i64) -> Result<Vec<EmotionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{EMOTION_SELECT}
                 WHERE e.owner_id = ?1
                 ORDER BY e.created_at DESC, e.id DESC
                 LIMIT ?2 OFFSET ?3"
            ))?;

            let rows = stmt
                .query_map(params![user_id, limit.saturating_add(1), skip], map_emotion)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Every entry a user owns, newest first, with its count. Both reads
    /// share one snapshot so the two always agree. `None` when the user does
    /// not exist.
    pub fn get_user_emotion_list(&self, user_id: &str) -> Result<Option<(Vec<EmotionRow>, i64)>> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            if query_user_by_id(&tx, user_id)?.is_none() {
                return Ok(None);
            }
            let rows = query_all_user_emotions(&tx, user_id)?;
            let total = query_count_user_emotions(&tx, user_id)?;

            tx.commit()?;
            Ok(Some((rows, total)))
        })
    }

    // -- Identity accounts --

    /// Insert a sign-in account. A taken email or uid is a `DbError::Conflict`.
    pub fn create_account(&self, account: &NewAccount) -> Result<AccountRow> {
        self.with_conn_mut(|conn| {
            let created_at = timestamp::now();
            conn.execute(
                "INSERT INTO identity_accounts (uid, email, password_hash, display_name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    account.uid,
                    account.email,
                    account.password_hash,
                    account.display_name,
                    timestamp::to_text(&created_at),
                ],
            )
            .map_err(classify)?;

            Ok(AccountRow {
                uid: account.uid.clone(),
                email: account.email.clone(),
                password_hash: account.password_hash.clone(),
                display_name: account.display_name.clone(),
                created_at,
            })
        })
    }

    pub fn get_account_by_email(&self, email: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(&format!("{ACCOUNT_SELECT} WHERE email = ?1"), [email], map_account)
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_account_by_uid(&self, uid: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(&format!("{ACCOUNT_SELECT} WHERE uid = ?1"), [uid], map_account)
                .optional()?;
            Ok(row)
        })
    }

    /// Returns `false` when no account has that uid.
    pub fn set_account_display_name(&self, uid: &str, display_name: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE identity_accounts SET display_name = ?1 WHERE uid = ?2",
                params![display_name, uid],
            )?;
            Ok(updated > 0)
        })
    }

    pub fn delete_account(&self, uid: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM identity_accounts WHERE uid = ?1", [uid])?;
            Ok(deleted > 0)
        })
    }

    // -- Sharing --

    /// Grant `user_id` access to an entry. A second grant for the same pair
    /// is a `DbError::Conflict`.
    pub fn share_emotion(&self, emotion_id: i64, user_id: &str) -> Result<ShareRow> {
        self.with_conn_mut(|conn| {
            let shared_at = timestamp::now();
            conn.execute(
                "INSERT INTO emotion_shared_with (emotion_id, user_id, shared_at) VALUES (?1, ?2, ?3)",
                params![emotion_id, user_id, timestamp::to_text(&shared_at)],
            )
            .map_err(classify)?;

            Ok(ShareRow {
                emotion_id,
                user_id: user_id.to_string(),
                shared_at,
            })
        })
    }

    pub fn is_shared_with(&self, emotion_id: i64, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM emotion_shared_with WHERE emotion_id = ?1 AND user_id = ?2)",
                params![emotion_id, user_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    pub fn get_share_recipients(&self, emotion_id: i64) -> Result<Vec<ShareRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT emotion_id, user_id, shared_at FROM emotion_shared_with
                 WHERE emotion_id = ?1
                 ORDER BY shared_at, user_id",
            )?;

            let rows = stmt
                .query_map([emotion_id], |row| {
                    Ok(ShareRow {
                        emotion_id: row.get(0)?,
                        user_id: row.get(1)?,
                        shared_at: timestamp::get(row, 2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Entries other users have shared with `user_id`, most recently shared
    /// first.
    pub fn get_emotions_shared_with(&self, user_id: &str) -> Result<Vec<EmotionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{EMOTION_SELECT}
                 JOIN emotion_shared_with s ON s.emotion_id = e.id
                 WHERE s.user_id = ?1
                 ORDER BY s.shared_at DESC, e.id DESC"
            ))?;

            let rows = stmt
                .query_map([user_id], map_emotion)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Chat --

    pub fn insert_chat(
        &self,
        emotion_id: i64,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
    ) -> Result<ChatRow> {
        self.with_conn_mut(|conn| {
            let created_at = timestamp::now();
            conn.execute(
                "INSERT INTO chats (emotion_id, sender_id, receiver_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    emotion_id,
                    sender_id,
                    receiver_id,
                    content,
                    timestamp::to_text(&created_at)
                ],
            )
            .map_err(classify)?;

            Ok(ChatRow {
                id: conn.last_insert_rowid(),
                emotion_id,
                sender_id: sender_id.to_string(),
                receiver_id: receiver_id.to_string(),
                content: content.to_string(),
                created_at,
            })
        })
    }

    /// Messages on an entry's thread, oldest first.
    pub fn get_chats_for_emotion(&self, emotion_id: i64) -> Result<Vec<ChatRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{CHAT_SELECT} WHERE emotion_id = ?1 ORDER BY created_at, id"
            ))?;

            let rows = stmt
                .query_map([emotion_id], |row| {
                    Ok(ChatRow {
                        id: row.get(0)?,
                        emotion_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        receiver_id: row.get(3)?,
                        content: row.get(4)?,
                        created_at: timestamp::get(row, 5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn insert_emotion(conn: &Connection, emotion: &NewEmotion, created_at: &DateTime<Utc>) -> Result<EmotionRow> {
    conn.execute(
        "INSERT INTO emotions (
            owner_id, card1, card2, card3,
            before_card1_level, before_card2_level, before_card3_level,
            story, thoughts_action, consequences, feeling_of_consequences,
            result_of_expect, take_out,
            after_card1_level, after_card2_level, after_card3_level,
            created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            emotion.owner_id,
            emotion.cards[0],
            emotion.cards[1],
            emotion.cards[2],
            emotion.before_levels[0],
            emotion.before_levels[1],
            emotion.before_levels[2],
            emotion.story,
            emotion.thoughts_action,
            emotion.consequences,
            emotion.feeling_of_consequences,
            emotion.result_of_expect,
            emotion.take_out,
            emotion.after_levels[0],
            emotion.after_levels[1],
            emotion.after_levels[2],
            timestamp::to_text(created_at),
        ],
    )
    .map_err(classify)?;

    let id = conn.last_insert_rowid();
    query_emotion_by_id(conn, id)?.ok_or_else(|| anyhow::anyhow!("Emotion {} vanished after insert", id))
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(&format!("{USER_SELECT} WHERE id = ?1"), [id], map_user)
        .optional()?;
    Ok(row)
}

fn query_all_user_emotions(conn: &Connection, user_id: &str) -> Result<Vec<EmotionRow>> {
    let mut stmt = conn.prepare(&format!(
        "{EMOTION_SELECT}
         WHERE e.owner_id = ?1
         ORDER BY e.created_at DESC, e.id DESC"
    ))?;

    let rows = stmt
        .query_map([user_id], map_emotion)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_count_user_emotions(conn: &Connection, user_id: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM emotions WHERE owner_id = ?1",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn query_emotion_by_id(conn: &Connection, id: i64) -> Result<Option<EmotionRow>> {
    let row = conn
        .query_row(&format!("{EMOTION_SELECT} WHERE e.id = ?1"), [id], map_emotion)
        .optional()?;
    Ok(row)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        birthday: timestamp::get_opt(row, 3)?,
        occupation: row.get(4)?,
        timezone: row.get(5)?,
        sign_up_day: timestamp::get(row, 6)?,
    })
}

fn map_account(row: &Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        uid: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        display_name: row.get(3)?,
        created_at: timestamp::get(row, 4)?,
    })
}

fn map_emotion(row: &Row<'_>) -> rusqlite::Result<EmotionRow> {
    Ok(EmotionRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        card1: row.get(2)?,
        card2: row.get(3)?,
        card3: row.get(4)?,
        before_card1_level: row.get(5)?,
        before_card2_level: row.get(6)?,
        before_card3_level: row.get(7)?,
        story: row.get(8)?,
        thoughts_action: row.get(9)?,
        consequences: row.get(10)?,
        feeling_of_consequences: row.get(11)?,
        result_of_expect: row.get(12)?,
        take_out: row.get(13)?,
        after_card1_level: row.get(14)?,
        after_card2_level: row.get(15)?,
        after_card3_level: row.get(16)?,
        created_at: timestamp::get(row, 17)?,
    })
}

fn optional_text(value: Option<String>) -> Value {
    value.map(Value::Text).unwrap_or(Value::Null)
}

/// Lift SQLite constraint failures into `DbError` so callers can tell a
/// duplicate or a dangling reference from a storage fault.
fn classify(err: rusqlite::Error) -> anyhow::Error {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        let detail = message.clone().unwrap_or_else(|| failure.to_string());
        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                return DbError::Conflict(detail).into();
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return DbError::MissingReference(detail).into(),
            ffi::SQLITE_CONSTRAINT_CHECK => return DbError::Check(detail).into(),
            _ => {}
        }
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_user(id: &str, email: &str) -> NewUser {
        NewUser {
            id: id.into(),
            email: email.into(),
            name: "Test User".into(),
            birthday: None,
            occupation: None,
            timezone: "UTC".into(),
        }
    }

    fn new_emotion(owner_id: &str) -> NewEmotion {
        NewEmotion {
            owner_id: owner_id.into(),
            cards: [1, 2, 3],
            before_levels: [5, 3, 4],
            after_levels: [4, 5, 3],
            story: Some("Today, I had a challenging situation at work".into()),
            thoughts_action: None,
            consequences: None,
            feeling_of_consequences: None,
            result_of_expect: Some("yes".into()),
            take_out: None,
        }
    }

    fn db_with_user(id: &str) -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&new_user(id, &format!("{id}@example.com"))).unwrap();
        db
    }

    /// Inserts `count` entries for `owner`, one minute apart, oldest first.
    fn seed_entries(db: &Database, owner: &str, count: usize) -> Vec<EmotionRow> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        db.with_conn_mut(|conn| {
            (0..count)
                .map(|i| {
                    let at = base + chrono::Duration::minutes(i as i64);
                    insert_emotion(conn, &new_emotion(owner), &at)
                })
                .collect()
        })
        .unwrap()
    }

    fn count(db: &Database, user_id: &str) -> i64 {
        db.with_conn(|conn| query_count_user_emotions(conn, user_id)).unwrap()
    }

    fn conflict(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<DbError>(), Some(DbError::Conflict(_)))
    }

    #[test]
    fn create_and_find_user() {
        let db = Database::open_in_memory().unwrap();
        let created = db.create_user(&new_user("uid-1", "ada@example.com")).unwrap();
        assert_eq!(created.timezone, "UTC");

        let by_email = db.get_user_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(by_email, created);
        assert!(db.get_user_by_id("uid-1").unwrap().is_some());
        assert!(db.get_user_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn email_lookup_is_case_sensitive() {
        let db = db_with_user("uid-1");
        assert!(db.get_user_by_email("UID-1@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&new_user("uid-1", "ada@example.com")).unwrap();

        let err = db.create_user(&new_user("uid-2", "ada@example.com")).unwrap_err();
        assert!(conflict(&err));

        let err = db.create_user(&new_user("uid-1", "other@example.com")).unwrap_err();
        assert!(conflict(&err));

        let users: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(users, 1);
    }

    #[test]
    fn update_user_patches_only_given_fields() {
        let db = Database::open_in_memory().unwrap();
        let mut user = new_user("uid-1", "ada@example.com");
        user.occupation = Some("Engineer".into());
        db.create_user(&user).unwrap();

        let birthday = Utc.with_ymd_and_hms(1990, 5, 17, 0, 0, 0).unwrap();
        let updated = db
            .update_user(
                "uid-1",
                &UserChanges {
                    birthday: Some(Some(birthday)),
                    timezone: Some("Asia/Taipei".into()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Test User");
        assert_eq!(updated.occupation.as_deref(), Some("Engineer"));
        assert_eq!(updated.birthday, Some(birthday));
        assert_eq!(updated.timezone, "Asia/Taipei");

        let cleared = db
            .update_user(
                "uid-1",
                &UserChanges {
                    occupation: Some(None),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(cleared.occupation, None);
        assert_eq!(cleared.birthday, Some(birthday));
    }

    #[test]
    fn update_unknown_user_returns_none() {
        let db = Database::open_in_memory().unwrap();
        let changes = UserChanges {
            name: Some("Nobody".into()),
            ..Default::default()
        };
        assert!(db.update_user("missing", &changes).unwrap().is_none());
        assert!(db.update_user("missing", &UserChanges::default()).unwrap().is_none());
    }

    #[test]
    fn empty_patch_returns_current_row() {
        let db = db_with_user("uid-1");
        let before = db.get_user_by_id("uid-1").unwrap();
        let after = db.update_user("uid-1", &UserChanges::default()).unwrap();
        assert_eq!(after, before);
    }

    #[test]
    fn create_emotion_assigns_id_and_timestamp() {
        let db = db_with_user("uid-1");
        let before = timestamp::now();
        let row = db.create_emotion(&new_emotion("uid-1")).unwrap();

        assert!(row.id > 0);
        assert_eq!(row.owner_id, "uid-1");
        assert_eq!((row.card1, row.card2, row.card3), (1, 2, 3));
        assert_eq!(row.result_of_expect.as_deref(), Some("yes"));
        assert!(row.created_at >= before);
        assert_eq!(db.get_emotion(row.id).unwrap(), Some(row));
    }

    #[test]
    fn emotion_for_unknown_owner_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let err = db.create_emotion(&new_emotion("ghost")).unwrap_err();
        assert!(matches!(err.downcast_ref::<DbError>(), Some(DbError::MissingReference(_))));
    }

    #[test]
    fn store_rejects_unknown_result_of_expect() {
        let db = db_with_user("uid-1");
        let mut emotion = new_emotion("uid-1");
        emotion.result_of_expect = Some("maybe".into());

        let err = db.create_emotion(&emotion).unwrap_err();
        assert!(matches!(err.downcast_ref::<DbError>(), Some(DbError::Check(_))));
        assert_eq!(count(&db, "uid-1"), 0);
    }

    #[test]
    fn store_rejects_out_of_range_card() {
        let db = db_with_user("uid-1");
        let mut emotion = new_emotion("uid-1");
        emotion.cards[0] = 6;

        assert!(db.create_emotion(&emotion).is_err());
        assert_eq!(count(&db, "uid-1"), 0);
    }

    #[test]
    fn null_result_of_expect_is_allowed() {
        let db = db_with_user("uid-1");
        let mut emotion = new_emotion("uid-1");
        emotion.result_of_expect = None;
        assert_eq!(db.create_emotion(&emotion).unwrap().result_of_expect, None);
    }

    #[test]
    fn user_emotions_are_newest_first_with_lookahead() {
        let db = db_with_user("uid-1");
        let seeded = seed_entries(&db, "uid-1", 12);

        let page = db.get_user_emotions("uid-1", 0, 10).unwrap();
        assert_eq!(page.len(), 11);
        assert_eq!(page[0].id, seeded[11].id);
        assert!(page.windows(2).all(|w| w[0].created_at > w[1].created_at));

        let tail = db.get_user_emotions("uid-1", 10, 10).unwrap();
        let ids: Vec<i64> = tail.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![seeded[1].id, seeded[0].id]);
    }

    #[test]
    fn equal_timestamps_fall_back_to_id() {
        let db = db_with_user("uid-1");
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let ids: Vec<i64> = db
            .with_conn_mut(|conn| {
                (0..3)
                    .map(|_| insert_emotion(conn, &new_emotion("uid-1"), &at).map(|e| e.id))
                    .collect()
            })
            .unwrap();

        let page: Vec<i64> = db
            .get_user_emotions("uid-1", 0, 10)
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(page, ids.into_iter().rev().collect::<Vec<_>>());
    }

    #[test]
    fn listing_is_scoped_to_owner() {
        let db = db_with_user("uid-1");
        db.create_user(&new_user("uid-2", "two@example.com")).unwrap();
        seed_entries(&db, "uid-1", 3);
        seed_entries(&db, "uid-2", 2);

        assert_eq!(count(&db, "uid-1"), 3);
        assert_eq!(count(&db, "uid-2"), 2);
        assert_eq!(db.get_user_emotion_list("uid-2").unwrap().unwrap().0.len(), 2);
        assert!(db.get_user_emotions("nobody", 0, 10).unwrap().is_empty());
    }

    #[test]
    fn emotion_list_count_matches_rows() {
        let db = db_with_user("uid-1");
        let seeded = seed_entries(&db, "uid-1", 4);

        let (rows, total) = db.get_user_emotion_list("uid-1").unwrap().unwrap();
        assert_eq!(total, 4);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].id, seeded[3].id);

        let (rows, total) = db.get_user_emotion_list("uid-1").unwrap().unwrap();
        assert_eq!((rows.len() as i64, total), (4, 4));

        assert!(db.get_user_emotion_list("nobody").unwrap().is_none());
    }

    #[test]
    fn emotion_list_on_file_backed_reader() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("wave.db")).unwrap();
        db.create_user(&new_user("uid-1", "ada@example.com")).unwrap();
        db.create_emotion(&new_emotion("uid-1")).unwrap();
        db.create_emotion(&new_emotion("uid-1")).unwrap();

        let (rows, total) = db.get_user_emotion_list("uid-1").unwrap().unwrap();
        assert_eq!((rows.len(), total), (2, 2));
    }

    #[test]
    fn sharing_is_unique_per_pair() {
        let db = db_with_user("owner");
        db.create_user(&new_user("friend", "friend@example.com")).unwrap();
        let entry = db.create_emotion(&new_emotion("owner")).unwrap();

        let grant = db.share_emotion(entry.id, "friend").unwrap();
        assert_eq!(grant.user_id, "friend");
        assert!(db.is_shared_with(entry.id, "friend").unwrap());
        assert!(!db.is_shared_with(entry.id, "owner").unwrap());

        let err = db.share_emotion(entry.id, "friend").unwrap_err();
        assert!(conflict(&err));
        assert_eq!(db.get_share_recipients(entry.id).unwrap(), vec![grant]);
    }

    #[test]
    fn shared_entries_are_listed_for_recipient() {
        let db = db_with_user("owner");
        db.create_user(&new_user("friend", "friend@example.com")).unwrap();
        let first = db.create_emotion(&new_emotion("owner")).unwrap();
        let second = db.create_emotion(&new_emotion("owner")).unwrap();
        db.create_emotion(&new_emotion("owner")).unwrap();

        db.share_emotion(first.id, "friend").unwrap();
        db.share_emotion(second.id, "friend").unwrap();

        let shared: Vec<i64> = db
            .get_emotions_shared_with("friend")
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(shared, vec![second.id, first.id]);
        assert!(db.get_emotions_shared_with("owner").unwrap().is_empty());
    }

    #[test]
    fn chat_thread_is_oldest_first() {
        let db = db_with_user("owner");
        db.create_user(&new_user("friend", "friend@example.com")).unwrap();
        let entry = db.create_emotion(&new_emotion("owner")).unwrap();

        let first = db.insert_chat(entry.id, "owner", "friend", "How did it go?").unwrap();
        let second = db.insert_chat(entry.id, "friend", "owner", "Better than expected").unwrap();

        let thread = db.get_chats_for_emotion(entry.id).unwrap();
        assert_eq!(thread, vec![first, second]);
        assert!(db.get_chats_for_emotion(entry.id + 1).unwrap().is_empty());
    }

    fn new_account(uid: &str, email: &str) -> NewAccount {
        NewAccount {
            uid: uid.into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            display_name: "Ada".into(),
        }
    }

    #[test]
    fn accounts_are_unique_by_email() {
        let db = Database::open_in_memory().unwrap();
        let created = db.create_account(&new_account("uid-1", "ada@example.com")).unwrap();

        let err = db.create_account(&new_account("uid-2", "ada@example.com")).unwrap_err();
        assert!(conflict(&err));

        assert_eq!(db.get_account_by_email("ada@example.com").unwrap(), Some(created.clone()));
        assert_eq!(db.get_account_by_uid("uid-1").unwrap(), Some(created));
        assert!(db.get_account_by_uid("uid-2").unwrap().is_none());
    }

    #[test]
    fn account_display_name_and_removal() {
        let db = Database::open_in_memory().unwrap();
        db.create_account(&new_account("uid-1", "ada@example.com")).unwrap();

        assert!(db.set_account_display_name("uid-1", "Ada L.").unwrap());
        assert!(!db.set_account_display_name("ghost", "Nobody").unwrap());
        assert_eq!(
            db.get_account_by_uid("uid-1").unwrap().unwrap().display_name,
            "Ada L."
        );

        assert!(db.delete_account("uid-1").unwrap());
        assert!(!db.delete_account("uid-1").unwrap());
        db.create_account(&new_account("uid-3", "ada@example.com")).unwrap();
    }

    #[test]
    fn chat_requires_existing_users() {
        let db = db_with_user("owner");
        let entry = db.create_emotion(&new_emotion("owner")).unwrap();
        let err = db.insert_chat(entry.id, "owner", "ghost", "hello").unwrap_err();
        assert!(matches!(err.downcast_ref::<DbError>(), Some(DbError::MissingReference(_))));
    }
}
