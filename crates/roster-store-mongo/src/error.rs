//! Error type for `roster-store-mongo`.

use mongodb::bson;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The server was unreachable or rejected the credentials at startup.
  #[error("could not connect to mongodb: {0}")]
  Connection(#[source] mongodb::error::Error),

  #[error("mongodb error: {0}")]
  Driver(#[from] mongodb::error::Error),

  #[error("bson serialization error: {0}")]
  Bson(#[from] bson::ser::Error),

  #[error("store generated a non-ObjectId identifier: {0}")]
  UnexpectedId(String),

  #[error("stored document is not an object")]
  NotAnObject,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
