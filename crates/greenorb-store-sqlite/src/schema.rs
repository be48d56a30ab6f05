//! SQL schema for the GreenOrb SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Events are append-only. The only DELETE runs inside a clear and
-- removes what the new `cleared` row supersedes.
CREATE TABLE IF NOT EXISTS events (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id     TEXT NOT NULL UNIQUE,
    recorded_at  TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    kind         TEXT NOT NULL,   -- discriminant of EventKind variant
    payload      TEXT NOT NULL    -- JSON payload (inner data only)
);

-- The activity feed is a bounded ring; old rows are deleted on insert.
CREATE TABLE IF NOT EXISTS activity (
    entry_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    recorded_at  TEXT NOT NULL,
    stage        TEXT,            -- NULL for system lines
    level        TEXT NOT NULL,
    message      TEXT NOT NULL
);

PRAGMA user_version = 1;
";
