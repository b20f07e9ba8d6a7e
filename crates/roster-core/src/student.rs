//! The student record, its partial-update form, and list queries.
//!
//! The store-generated identifier is not a field of any of these types: it is
//! never accepted from a client and only ever returned by the create handler.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  store::{Document, Filter, Patch, Projection, to_document},
};

/// Name of the nested field holding the country, used by list filtering.
pub const COUNTRY_PATH: &str = "address.country";

// ─── Records ─────────────────────────────────────────────────────────────────

/// A postal address attached to a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
  pub city:    String,
  pub country: String,
}

impl Address {
  pub fn validate(&self) -> Result<()> {
    non_blank("address.city", &self.city)?;
    non_blank("address.country", &self.country)
  }
}

/// A complete student record.
///
/// Accepted as the body of a create request and returned by fetch-by-id.
/// Unknown input fields (including any client-supplied `id`) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub name:    String,
  pub age:     u32,
  pub address: Address,
}

impl Student {
  pub fn validate(&self) -> Result<()> {
    non_blank("name", &self.name)?;
    self.address.validate()
  }

  pub fn to_document(&self) -> Result<Document> { to_document(self) }

  pub fn from_document(doc: Document) -> Result<Self> {
    Ok(serde_json::from_value(doc.into())?)
  }
}

/// The projection of a student returned by list requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSummary {
  pub name: String,
  pub age:  u32,
}

impl StudentSummary {
  pub fn projection() -> Projection { Projection::new(["name", "age"]) }

  pub fn from_document(doc: Document) -> Result<Self> {
    Ok(serde_json::from_value(doc.into())?)
  }
}

// ─── Partial update ──────────────────────────────────────────────────────────

/// A partial student record; absent and `null` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StudentUpdate {
  #[serde(default)]
  pub name:    Option<String>,
  #[serde(default)]
  pub age:     Option<u32>,
  /// Replaces the stored address as a whole when present.
  #[serde(default)]
  pub address: Option<Address>,
}

impl StudentUpdate {
  pub fn validate(&self) -> Result<()> {
    if let Some(name) = &self.name {
      non_blank("name", name)?;
    }
    if let Some(address) = &self.address {
      address.validate()?;
    }
    Ok(())
  }

  /// Build a patch containing only the fields present in this update.
  pub fn to_patch(&self) -> Result<Patch> {
    let mut patch = Patch::new();
    if let Some(name) = &self.name {
      patch = patch.set("name", name.as_str());
    }
    if let Some(age) = self.age {
      patch = patch.set("age", age);
    }
    if let Some(address) = &self.address {
      patch = patch.set_serialized("address", address)?;
    }
    Ok(patch)
  }
}

// ─── List query ──────────────────────────────────────────────────────────────

/// Optional list filters; both combine with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StudentQuery {
  /// Exact match against `address.country`.
  pub country: Option<String>,
  /// Inclusive lower bound on `age`.
  pub age:     Option<u32>,
}

impl StudentQuery {
  pub fn to_filter(&self) -> Filter {
    let mut filter = Filter::new();
    if let Some(country) = &self.country {
      filter = filter.eq(COUNTRY_PATH, country.as_str());
    }
    if let Some(age) = self.age {
      filter = filter.gte("age", age);
    }
    filter
  }
}

fn non_blank(field: &'static str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::InvalidField {
      field,
      reason: "must not be blank",
    });
  }
  Ok(())
}
