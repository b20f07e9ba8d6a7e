//! MongoDB backend for the Roster document store.
//!
//! One [`MongoStore`] is created per process at startup and shared by every
//! request; the driver pools connections internally.

mod convert;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{MongoCollection, MongoConfig, MongoStore};
