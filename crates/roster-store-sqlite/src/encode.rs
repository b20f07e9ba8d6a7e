//! Translation between document-store concepts and SQLite.
//!
//! Identifiers are stored as hyphenated lowercase UUIDs. Filters compile to a
//! `WHERE` clause over `json_extract`; JSON paths and values are always bound
//! as parameters, never spliced into SQL text.

use roster_core::store::{Condition, Document, DocumentId, Filter};
use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Identifiers ─────────────────────────────────────────────────────────────

pub fn new_id() -> String { Uuid::new_v4().hyphenated().to_string() }

/// Normalise `id` to its stored form, or `None` if it is not a UUID.
pub fn parse_id(id: &DocumentId) -> Option<String> {
  Uuid::parse_str(id.as_str())
    .ok()
    .map(|u| u.hyphenated().to_string())
}

// ─── Paths and values ────────────────────────────────────────────────────────

/// Dotted field path to an SQLite JSON path: `address.country` →
/// `$."address"."country"`.
pub fn json_path(path: &str) -> String {
  let mut out = String::from("$");
  for segment in path.split('.') {
    out.push_str(".\"");
    out.push_str(segment);
    out.push('"');
  }
  out
}

/// The SQL value `json_extract` yields for an equal JSON scalar.
pub fn sql_value(v: &Value) -> SqlValue {
  match v {
    Value::Null => SqlValue::Null,
    Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    Value::Number(n) => match n.as_i64() {
      Some(i) => SqlValue::Integer(i),
      None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
    },
    Value::String(s) => SqlValue::Text(s.clone()),
    other => SqlValue::Text(other.to_string()),
  }
}

/// The `json_type` names a range comparison against `v` is restricted to, so
/// that ordering never crosses value types.
fn comparable_types(v: &Value) -> &'static str {
  match v {
    Value::Number(_) => "('integer', 'real')",
    Value::String(_) => "('text')",
    Value::Bool(_) => "('true', 'false')",
    _ => "('null')",
  }
}

// ─── Filters ─────────────────────────────────────────────────────────────────

/// A compiled `WHERE` clause with its positional parameters.
pub struct SqlFilter {
  pub clause: String,
  pub params: Vec<SqlValue>,
}

/// Compile `filter` for `collection`. Returns `None` when the filter can
/// never match, e.g. because an identifier is not a valid UUID.
pub fn compile_filter(collection: &str, filter: &Filter) -> Option<SqlFilter> {
  let mut clause = String::from("collection = ?1");
  let mut params = vec![SqlValue::Text(collection.to_owned())];

  for condition in filter.conditions() {
    match condition {
      Condition::Id(id) => {
        params.push(SqlValue::Text(parse_id(id)?));
        clause.push_str(&format!(" AND doc_id = ?{}", params.len()));
      }
      Condition::Eq { path, value } => {
        params.push(SqlValue::Text(json_path(path)));
        let p = params.len();
        params.push(sql_value(value));
        clause.push_str(&format!(" AND json_extract(body, ?{p}) = ?{}", p + 1));
      }
      Condition::Gte { path, value } => {
        params.push(SqlValue::Text(json_path(path)));
        let p = params.len();
        params.push(sql_value(value));
        clause.push_str(&format!(
          " AND json_type(body, ?{p}) IN {} AND json_extract(body, ?{p}) >= ?{}",
          comparable_types(value),
          p + 1
        ));
      }
    }
  }

  Some(SqlFilter { clause, params })
}

// ─── Bodies ──────────────────────────────────────────────────────────────────

pub fn encode_body(doc: &Document) -> Result<String> { Ok(serde_json::to_string(doc)?) }

pub fn decode_body(doc_id: &str, body: &str) -> Result<Document> {
  match serde_json::from_str(body)? {
    Value::Object(map) => Ok(map),
    _ => Err(Error::CorruptDocument(doc_id.to_owned())),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn json_path_quotes_each_segment() {
    assert_eq!(json_path("address.country"), r#"$."address"."country""#);
    assert_eq!(json_path("age"), r#"$."age""#);
  }

  #[test]
  fn malformed_id_never_matches() {
    assert!(compile_filter("students", &Filter::by_id("not-a-uuid")).is_none());
  }

  #[test]
  fn id_is_normalised() {
    let id = Uuid::new_v4();
    let upper = id.hyphenated().to_string().to_uppercase();
    assert_eq!(
      parse_id(&DocumentId::new(upper)),
      Some(id.hyphenated().to_string())
    );
  }

  #[test]
  fn filter_numbers_parameters_in_order() {
    let f = Filter::new().eq("address.country", "UK").gte("age", 18);
    let sql = compile_filter("students", &f).unwrap();
    assert_eq!(sql.params.len(), 5);
    assert!(sql.clause.contains("json_extract(body, ?2) = ?3"));
    assert!(sql.clause.contains("json_extract(body, ?4) >= ?5"));
    assert_eq!(sql.params[4], SqlValue::Integer(18));
  }

  #[test]
  fn bool_maps_to_integer() {
    assert_eq!(sql_value(&json!(true)), SqlValue::Integer(1));
  }
}
