//! SQL schema for the drugwatch SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Drugs are created on first sighting and never updated or deleted.
CREATE TABLE IF NOT EXISTS drugs (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS sources (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL UNIQUE,
    display_name  TEXT NOT NULL,
    url           TEXT NOT NULL,
    handle        TEXT NOT NULL DEFAULT '',
    created_ts    INTEGER NOT NULL,   -- set once
    updated_ts    INTEGER NOT NULL    -- refreshed on every scan
);

-- Hits are only ever inserted or deleted (by compaction), never updated.
CREATE TABLE IF NOT EXISTS hits (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    drug_id    INTEGER NOT NULL REFERENCES drugs(id),
    source_id  INTEGER NOT NULL REFERENCES sources(id),
    hit_ts     INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS hits_pair_idx ON hits(drug_id, source_id);
CREATE INDEX IF NOT EXISTS hits_ts_idx   ON hits(hit_ts);

PRAGMA user_version = 1;
";
