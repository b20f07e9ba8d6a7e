//! Embedded SQLite document store for Roster.
//!
//! Documents are stored as JSON text and queried with SQLite's JSON
//! functions. Wraps [`tokio_rusqlite`] so all database access runs on a
//! dedicated thread without blocking the async runtime.
//!
//! Used for local development and as the in-process backend in tests.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteCollection, SqliteStore};
