//! Database schema and migrations for Mailcast.
//!
//! Migrations are applied in order when the database is opened.

/// Database migrations.
///
/// Each migration is a SQL script executed in its own transaction.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Accounts - users and groups
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL,
    password    TEXT NOT NULL,           -- Argon2 hash
    email       TEXT,
    phone       TEXT,
    country     TEXT,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    last_login  TEXT,
    is_active   INTEGER NOT NULL DEFAULT 1
);

CREATE UNIQUE INDEX idx_users_username_nocase ON users(username COLLATE NOCASE);
CREATE UNIQUE INDEX idx_users_email ON users(email) WHERE email IS NOT NULL;

CREATE TABLE groups (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE user_groups (
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    group_id    INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, group_id)
);
"#,
    // v2: Session and one-time tokens
    r#"
CREATE TABLE refresh_tokens (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token       TEXT NOT NULL UNIQUE,
    expires_at  TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    revoked_at  TEXT
);

CREATE INDEX idx_refresh_tokens_user_id ON refresh_tokens(user_id);

CREATE TABLE one_time_tokens (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token_hash  TEXT NOT NULL UNIQUE,    -- SHA-256 hex of the token
    purpose     TEXT NOT NULL,           -- 'password_reset'
    expires_at  TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    used_at     TEXT
);

CREATE INDEX idx_one_time_tokens_user_id ON one_time_tokens(user_id);
"#,
    // v3: Recipients and messages
    r#"
CREATE TABLE recipients (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    email       TEXT NOT NULL UNIQUE,
    full_name   TEXT NOT NULL,
    comment     TEXT NOT NULL DEFAULT '',
    owner_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_recipients_owner_id ON recipients(owner_id);

CREATE TABLE messages (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    subject     TEXT NOT NULL,
    body        TEXT NOT NULL,
    owner_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_messages_owner_id ON messages(owner_id);
"#,
    // v4: Mailings and their recipient sets
    r#"
CREATE TABLE mailings (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    start_time  TEXT,
    end_time    TEXT,
    status      TEXT NOT NULL DEFAULT 'created',  -- 'created', 'started', 'finished'
    message_id  INTEGER NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
    owner_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_mailings_owner_id ON mailings(owner_id);
CREATE INDEX idx_mailings_status ON mailings(status);

CREATE TABLE mailing_recipients (
    mailing_id    INTEGER NOT NULL REFERENCES mailings(id) ON DELETE CASCADE,
    recipient_id  INTEGER NOT NULL REFERENCES recipients(id) ON DELETE CASCADE,
    PRIMARY KEY (mailing_id, recipient_id)
);

CREATE INDEX idx_mailing_recipients_recipient_id ON mailing_recipients(recipient_id);
"#,
    // v5: Per-recipient send attempts
    r#"
CREATE TABLE mailing_attempts (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    mailing_id       INTEGER NOT NULL REFERENCES mailings(id) ON DELETE CASCADE,
    attempt_time     TEXT NOT NULL,
    status           TEXT NOT NULL,      -- 'success', 'failed'
    server_response  TEXT NOT NULL DEFAULT ''
);

CREATE INDEX idx_mailing_attempts_mailing_id ON mailing_attempts(mailing_id);
"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_not_empty() {
        assert!(!MIGRATIONS.is_empty());
    }

    #[test]
    fn test_first_migration_creates_users() {
        assert!(MIGRATIONS[0].contains("CREATE TABLE users"));
    }

    #[test]
    fn test_mailing_tables_cascade() {
        let mailings = MIGRATIONS[3];
        assert!(mailings.contains("CREATE TABLE mailings"));
        assert!(mailings.contains("REFERENCES messages(id) ON DELETE CASCADE"));
        assert!(mailings.contains("CREATE TABLE mailing_recipients"));

        let attempts = MIGRATIONS[4];
        assert!(attempts.contains("CREATE TABLE mailing_attempts"));
        assert!(attempts.contains("REFERENCES mailings(id) ON DELETE CASCADE"));
    }
}
