//! SQL DDL for initializing the database schema.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema includes:
/// - `sessions` table (one row per Twitch identity, `twitch_id` is the key)
/// - `settings` table (key/value application settings)
/// - `charade_sets` table (named word sets bound to channels)
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Authenticated Twitch sessions (one-account-per-device in practice)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS sessions (
    twitch_id TEXT PRIMARY KEY NOT NULL,
    display_name TEXT NOT NULL,
    username TEXT NOT NULL,
    email TEXT NULL,
    avatar_url TEXT NOT NULL,
    access_token TEXT NOT NULL,
    refresh_token TEXT NOT NULL,
    expires_in INTEGER NULL, -- token TTL in seconds
    token_obtained_at TEXT NOT NULL, -- RFC3339
    auth_payload TEXT NULL, -- raw callback payload, opaque JSON
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_sessions_display_name ON sessions(display_name);

-- ---------------------------------------------------------------------------
-- Application settings
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS settings (
    id INTEGER PRIMARY KEY NOT NULL,
    key TEXT UNIQUE NOT NULL,
    value TEXT NOT NULL,
    description TEXT NULL,
    updated_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_settings_key ON settings(key);

-- ---------------------------------------------------------------------------
-- Charade sets (channels/words/settings are opaque JSON text)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS charade_sets (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    channels TEXT NOT NULL,
    words TEXT NOT NULL,
    settings TEXT NOT NULL DEFAULT '{}',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_charade_sets_is_active ON charade_sets(is_active);
"#;
