//! Translation between the store-neutral query types and BSON.

use mongodb::bson::{self, Bson, Document as BsonDocument, doc, oid::ObjectId};
use roster_core::store::{Condition, Document, Filter, Patch, Projection};
use serde_json::Value;

use crate::{Error, Result};

pub const ID_FIELD: &str = "_id";

/// Compile `filter` to a query document. Returns `None` when the filter can
/// never match, i.e. an identifier is not a valid `ObjectId`.
pub fn filter_to_bson(filter: &Filter) -> Result<Option<BsonDocument>> {
  let mut clauses = Vec::with_capacity(filter.conditions().len());

  for condition in filter.conditions() {
    let clause = match condition {
      Condition::Id(id) => match ObjectId::parse_str(id.as_str()) {
        Ok(oid) => single(ID_FIELD, oid),
        Err(_) => return Ok(None),
      },
      Condition::Eq { path, value } => {
        single(path, doc! { "$eq": bson::to_bson(value)? })
      }
      Condition::Gte { path, value } => {
        single(path, doc! { "$gte": bson::to_bson(value)? })
      }
    };
    clauses.push(clause);
  }

  Ok(Some(match clauses.len() {
    0 => BsonDocument::new(),
    1 => clauses.remove(0),
    _ => doc! { "$and": clauses },
  }))
}

fn single(key: &str, value: impl Into<Bson>) -> BsonDocument {
  let mut out = BsonDocument::new();
  out.insert(key, value);
  out
}

/// A `$set` update document for `patch`.
pub fn patch_to_bson(patch: &Patch) -> Result<BsonDocument> {
  let mut set = BsonDocument::new();
  for (path, value) in patch.fields() {
    set.insert(path, bson::to_bson(value)?);
  }
  Ok(doc! { "$set": set })
}

/// An inclusion projection that always excludes the identifier.
pub fn projection_to_bson(projection: &Projection) -> BsonDocument {
  let mut out = single(ID_FIELD, 0);
  for field in projection.fields() {
    out.insert(field.as_str(), 1);
  }
  out
}

/// Serialise a JSON document for insertion, dropping any identifier so the
/// server generates one.
pub fn document_to_bson(mut doc: Document) -> Result<BsonDocument> {
  doc.remove(ID_FIELD);
  Ok(bson::to_document(&doc)?)
}

/// Relaxed extended JSON view of a stored document, identifier removed.
pub fn document_from_bson(mut doc: BsonDocument) -> Result<Document> {
  doc.remove(ID_FIELD);
  match Bson::Document(doc).into_relaxed_extjson() {
    Value::Object(map) => Ok(map),
    _ => Err(Error::NotAnObject),
  }
}
