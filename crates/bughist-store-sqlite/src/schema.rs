//! SQL schema for the bughist SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS bugs (
    bug_id    INTEGER PRIMARY KEY,
    reporter  TEXT NOT NULL
);

-- One row per version. valid_from is unique within a bug because versions
-- never overlap.
CREATE TABLE IF NOT EXISTS versions (
    bug_id       INTEGER NOT NULL REFERENCES bugs(bug_id),
    valid_from   TEXT NOT NULL,   -- RFC 3339 UTC, nanosecond precision
    valid_to     TEXT NOT NULL,   -- exclusive
    modified_by  TEXT NOT NULL,
    annotation   TEXT,
    facets       TEXT NOT NULL DEFAULT '{}',   -- JSON object of raw facets
    derived      TEXT,                         -- JSON DerivedAttributes or NULL
    PRIMARY KEY (bug_id, valid_from),
    CHECK (valid_from < valid_to)
);

PRAGMA user_version = 1;
";
