//! The `DocumentStore` / `Collection` traits and supporting query types.
//!
//! The traits are implemented by storage backends (`roster-store-mongo`,
//! `roster-store-sqlite`). The HTTP layer depends on this abstraction, not on
//! any concrete backend.

use std::{fmt, future::Future};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// A schema-flexible record: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// A store-generated document identifier in its textual form.
///
/// Backends parse it into their native identifier type. A string that does
/// not parse can never match a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for DocumentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<String> for DocumentId {
  fn from(s: String) -> Self { Self(s) }
}

impl From<&str> for DocumentId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// One predicate over a document. Paths are dotted (`address.country`).
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
  /// The document identifier equals this id.
  Id(DocumentId),
  /// The value at `path` equals `value` exactly.
  Eq { path: String, value: Value },
  /// The value at `path` is greater than or equal to `value`.
  Gte { path: String, value: Value },
}

/// A conjunction of [`Condition`]s. The empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
  conditions: Vec<Condition>,
}

impl Filter {
  pub fn new() -> Self { Self::default() }

  /// A filter matching the single document with identifier `id`.
  pub fn by_id(id: impl Into<DocumentId>) -> Self {
    Self { conditions: vec![Condition::Id(id.into())] }
  }

  pub fn eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
    self.conditions.push(Condition::Eq {
      path:  path.into(),
      value: value.into(),
    });
    self
  }

  pub fn gte(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
    self.conditions.push(Condition::Gte {
      path:  path.into(),
      value: value.into(),
    });
    self
  }

  pub fn conditions(&self) -> &[Condition] { &self.conditions }

  pub fn is_empty(&self) -> bool { self.conditions.is_empty() }
}

// ─── Patch ───────────────────────────────────────────────────────────────────

/// A partial update with field-level "set" semantics.
///
/// Every listed path is replaced with its new value; fields not mentioned are
/// left untouched. Dotted paths address nested fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
  set: Vec<(String, Value)>,
}

impl Patch {
  pub fn new() -> Self { Self::default() }

  pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
    self.set.push((path.into(), value.into()));
    self
  }

  /// Add `value` under `path`, serialising it first.
  pub fn set_serialized<T: Serialize>(self, path: impl Into<String>, value: &T) -> Result<Self> {
    Ok(self.set(path, serde_json::to_value(value)?))
  }

  pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.set.iter().map(|(p, v)| (p.as_str(), v))
  }

  pub fn is_empty(&self) -> bool { self.set.is_empty() }

  /// Merge the patch into `doc` in place. Returns `true` if anything changed.
  ///
  /// Missing intermediate objects along a dotted path are created; a
  /// non-object intermediate value is overwritten with an object.
  pub fn apply(&self, doc: &mut Document) -> bool {
    let mut modified = false;
    for (path, value) in &self.set {
      let mut segments = path.split('.').peekable();
      let mut target = &mut *doc;
      while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
          if target.get(segment) != Some(value) {
            target.insert(segment.to_owned(), value.clone());
            modified = true;
          }
          break;
        }
        let entry = target
          .entry(segment.to_owned())
          .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
          *entry = Value::Object(Map::new());
          modified = true;
        }
        target = match entry {
          Value::Object(map) => map,
          _ => unreachable!("entry was just made an object"),
        };
      }
    }
    modified
  }
}

// ─── Projection ──────────────────────────────────────────────────────────────

/// The set of top-level fields returned by [`Collection::find`]. The document
/// identifier is never part of a projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
  fields: Vec<String>,
}

impl Projection {
  pub fn new<I, F>(fields: I) -> Self
  where
    I: IntoIterator<Item = F>,
    F: Into<String>,
  {
    Self { fields: fields.into_iter().map(Into::into).collect() }
  }

  pub fn fields(&self) -> &[String] { &self.fields }

  /// Drop every field of `doc` not named in the projection.
  pub fn apply(&self, mut doc: Document) -> Document {
    doc.retain(|k, _| self.fields.iter().any(|f| f == k));
    doc
  }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// The result of [`Collection::update_one`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
  /// Number of documents matching the filter (0 or 1).
  pub matched:  u64,
  /// Number of documents whose contents actually changed (0 or 1).
  pub modified: u64,
}

/// Convert a serialisable value into a [`Document`].
pub fn to_document<T: Serialize>(value: &T) -> Result<Document> {
  match serde_json::to_value(value)? {
    Value::Object(map) => Ok(map),
    _ => Err(Error::NotAnObject),
  }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// A process-wide handle to a document database.
///
/// Implementations are created once at startup and shared (behind an `Arc`)
/// by every request; [`DocumentStore::collection`] is cheap.
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
  type Collection: Collection<Error = Self::Error>;

  /// A handle to the named collection. Collections are created lazily on
  /// first insert.
  fn collection(&self, name: &str) -> Self::Collection;

  /// Release the underlying connection(s).
  fn close(self) -> impl Future<Output = Result<(), Self::Error>> + Send
  where
    Self: Sized;
}

/// Single-document operations over one collection.
///
/// Each operation is atomic at the single-document level only.
pub trait Collection: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert `doc` and return the identifier the store generated for it.
  /// Any identifier key already present in `doc` is discarded.
  fn insert_one(
    &self,
    doc: Document,
  ) -> impl Future<Output = Result<DocumentId, Self::Error>> + Send + '_;

  /// Return every document matching `filter`, restricted to `projection`
  /// when given. Identifiers are not included in the returned documents.
  fn find<'a>(
    &'a self,
    filter: &'a Filter,
    projection: Option<&'a Projection>,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + 'a;

  /// Return the first document matching `filter`, or `None`.
  fn find_one<'a>(
    &'a self,
    filter: &'a Filter,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + 'a;

  /// Apply `patch` to the first document matching `filter`.
  fn update_one<'a>(
    &'a self,
    filter: &'a Filter,
    patch: &'a Patch,
  ) -> impl Future<Output = Result<UpdateOutcome, Self::Error>> + Send + 'a;

  /// Delete the first document matching `filter`; returns the number deleted.
  fn delete_one<'a>(
    &'a self,
    filter: &'a Filter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;
}
