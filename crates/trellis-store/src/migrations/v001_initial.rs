//! v001 -- Initial schema creation.
//!
//! Creates the five core tables: `users`, `connections`, `messages`,
//! `work_experience`, and `education`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY NOT NULL,  -- opaque login id
    password_salt TEXT NOT NULL,              -- hex-encoded 16-byte salt
    password_hash TEXT NOT NULL,              -- hex BLAKE3(salt || password)
    email         TEXT NOT NULL,
    name          TEXT,
    date_of_birth TEXT,                       -- YYYY-MM-DD
    created_at    TEXT NOT NULL               -- ISO-8601 / RFC-3339
);

CREATE INDEX IF NOT EXISTS idx_users_name ON users(name);

-- ----------------------------------------------------------------
-- Connections
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS connections (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    from_id      TEXT NOT NULL,               -- FK -> users(user_id), requester
    to_id        TEXT NOT NULL,               -- FK -> users(user_id), recipient
    status       TEXT NOT NULL,               -- Requested | Accepted | Rejected
    pair_lo      TEXT NOT NULL,               -- min(from_id, to_id)
    pair_hi      TEXT NOT NULL,               -- max(from_id, to_id)
    requested_at TEXT NOT NULL,

    FOREIGN KEY (from_id) REFERENCES users(user_id) ON DELETE CASCADE,
    FOREIGN KEY (to_id)   REFERENCES users(user_id) ON DELETE CASCADE,
    CHECK (from_id != to_id)
);

-- At most one live edge per unordered pair; rejected edges are kept as
-- history and may be superseded by a fresh request.
CREATE UNIQUE INDEX IF NOT EXISTS idx_connections_live_pair
    ON connections(pair_lo, pair_hi) WHERE status != 'Rejected';

CREATE INDEX IF NOT EXISTS idx_connections_from ON connections(from_id, status);
CREATE INDEX IF NOT EXISTS idx_connections_to   ON connections(to_id, status);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id                  TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    sender_id           TEXT NOT NULL,              -- FK -> users(user_id)
    receiver_id         TEXT NOT NULL,              -- FK -> users(user_id)
    contents            TEXT NOT NULL,
    sent_at             TEXT NOT NULL,              -- ISO-8601
    delivery_status     TEXT NOT NULL,              -- Delivered | Failed
    deleted_by_sender   INTEGER NOT NULL DEFAULT 0, -- boolean 0/1, set-only
    deleted_by_receiver INTEGER NOT NULL DEFAULT 0, -- boolean 0/1, set-only

    FOREIGN KEY (sender_id)   REFERENCES users(user_id) ON DELETE CASCADE,
    FOREIGN KEY (receiver_id) REFERENCES users(user_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_sender
    ON messages(sender_id, sent_at);
CREATE INDEX IF NOT EXISTS idx_messages_receiver
    ON messages(receiver_id, sent_at);

-- ----------------------------------------------------------------
-- Work experience
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS work_experience (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    TEXT NOT NULL,                 -- FK -> users(user_id)
    company    TEXT NOT NULL,
    role       TEXT NOT NULL,
    location   TEXT,
    start_date TEXT NOT NULL,                 -- YYYY-MM-DD
    end_date   TEXT,                          -- NULL = current position

    FOREIGN KEY (user_id) REFERENCES users(user_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_work_user ON work_experience(user_id, start_date DESC);

-- ----------------------------------------------------------------
-- Education
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS education (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     TEXT NOT NULL,                -- FK -> users(user_id)
    institution TEXT NOT NULL,
    major       TEXT NOT NULL,
    degree      TEXT NOT NULL,
    start_date  TEXT NOT NULL,                -- YYYY-MM-DD
    end_date    TEXT,

    FOREIGN KEY (user_id) REFERENCES users(user_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_education_user ON education(user_id, start_date DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
