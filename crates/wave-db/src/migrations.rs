use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const LATEST_VERSION: i64 = 3;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, emotions)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                name        TEXT NOT NULL,
                birthday    TEXT,
                occupation  TEXT,
                timezone    TEXT NOT NULL DEFAULT 'UTC',
                sign_up_day TEXT NOT NULL
            );

            CREATE TABLE emotions (
                id                      INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id                TEXT NOT NULL REFERENCES users(id),
                card1                   INTEGER NOT NULL CHECK (card1 BETWEEN 1 AND 5),
                card2                   INTEGER NOT NULL CHECK (card2 BETWEEN 1 AND 5),
                card3                   INTEGER NOT NULL CHECK (card3 BETWEEN 1 AND 5),
                before_card1_level      INTEGER NOT NULL CHECK (before_card1_level BETWEEN 1 AND 5),
                before_card2_level      INTEGER NOT NULL CHECK (before_card2_level BETWEEN 1 AND 5),
                before_card3_level      INTEGER NOT NULL CHECK (before_card3_level BETWEEN 1 AND 5),
                story                   TEXT,
                thoughts_action         TEXT,
                consequences            TEXT,
                feeling_of_consequences TEXT,
                result_of_expect        TEXT,
                take_out                TEXT,
                after_card1_level       INTEGER NOT NULL CHECK (after_card1_level BETWEEN 1 AND 5),
                after_card2_level       INTEGER NOT NULL CHECK (after_card2_level BETWEEN 1 AND 5),
                after_card3_level       INTEGER NOT NULL CHECK (after_card3_level BETWEEN 1 AND 5),
                created_at              TEXT NOT NULL,
                CONSTRAINT check_valid_result_of_expect
                    CHECK (result_of_expect IN ('yes', 'no', 'unclear'))
            );

            CREATE INDEX idx_emotions_owner
                ON emotions(owner_id, created_at DESC, id DESC);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (sharing, chat)");
        conn.execute_batch(
            "
            CREATE TABLE emotion_shared_with (
                emotion_id  INTEGER NOT NULL REFERENCES emotions(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                shared_at   TEXT NOT NULL,
                PRIMARY KEY (emotion_id, user_id)
            );

            CREATE INDEX idx_shared_with_user
                ON emotion_shared_with(user_id, shared_at);

            CREATE TABLE chats (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                emotion_id  INTEGER NOT NULL REFERENCES emotions(id),
                sender_id   TEXT NOT NULL REFERENCES users(id),
                receiver_id TEXT NOT NULL REFERENCES users(id),
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_chats_emotion
                ON chats(emotion_id, created_at, id);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    if version < 3 {
        info!("Running migration v3 (identity accounts)");
        conn.execute_batch(
            "
            CREATE TABLE identity_accounts (
                uid           TEXT PRIMARY KEY,
                email         TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                display_name  TEXT NOT NULL,
                created_at    TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (3);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
