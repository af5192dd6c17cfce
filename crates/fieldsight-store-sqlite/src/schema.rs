//! SQL schema for the FieldSight SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! layout for future migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per site-log entry. The entry's own fields live in fields_json;
-- table_name is one of the five log tables.
CREATE TABLE IF NOT EXISTS log_records (
    id          TEXT PRIMARY KEY,
    table_name  TEXT NOT NULL,
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC, fixed width; server-assigned
    user_id     TEXT,
    fields_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS daily_tasks (
    id              TEXT PRIMARY KEY,
    title           TEXT NOT NULL,
    task_date       TEXT NOT NULL,   -- YYYY-MM-DD
    status          TEXT NOT NULL DEFAULT 'ongoing',
    verified        INTEGER NOT NULL DEFAULT 0,
    verified_by     TEXT,
    verified_at     TEXT,
    remarks         TEXT,
    carry_over_from TEXT,            -- root of the carry-over chain
    user_id         TEXT,
    updated_by      TEXT,
    updated_at      TEXT,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS profiles (
    id            TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL,     -- 'admin' | 'supervisor'
    full_name     TEXT,
    ic_last4      TEXT,
    created_at    TEXT NOT NULL
);

-- Bearer sessions; only the SHA-256 of the token is kept.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    profile_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS log_records_table_idx ON log_records(table_name, created_at);
CREATE INDEX IF NOT EXISTS daily_tasks_date_idx  ON daily_tasks(task_date, created_at);
CREATE INDEX IF NOT EXISTS sessions_profile_idx  ON sessions(profile_id);

-- At most one carried copy of a root per day.
CREATE UNIQUE INDEX IF NOT EXISTS daily_tasks_carry_idx
    ON daily_tasks(task_date, carry_over_from) WHERE carry_over_from IS NOT NULL;

PRAGMA user_version = 2;
";
