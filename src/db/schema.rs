//! SQL DDL for initializing the database schema.

/// SQLite schema includes:
/// - `users` table (local login identities bridged to upstream developer ids)
/// - `dynamic_settings` table (runtime-tunable values, JSON scalars)
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Local accounts
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY NOT NULL,
    email TEXT NOT NULL UNIQUE, -- lower-cased
    password_hash TEXT NOT NULL, -- argon2id PHC string
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    dev_id TEXT NOT NULL UNIQUE, -- dashed UUID
    login_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL -- RFC3339
);

-- ---------------------------------------------------------------------------
-- Dynamic settings
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS dynamic_settings (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL, -- JSON scalar
    updated_at TEXT NOT NULL -- RFC3339
);
"#;
