//! SQL schema for the Roster SQLite document store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per document; collections share the table.
CREATE TABLE IF NOT EXISTS documents (
    collection  TEXT NOT NULL,
    doc_id      TEXT NOT NULL,   -- hyphenated lowercase UUID; store-assigned
    body        TEXT NOT NULL,   -- JSON object, never contains the id
    PRIMARY KEY (collection, doc_id)
);

PRAGMA user_version = 1;
";
