//! Handlers for `/students` endpoints.
//!
//! | Method   | Path             | Notes |
//! |----------|------------------|-------|
//! | `POST`   | `/students/`     | Body: [`Student`]; returns 201 + `{"id": ...}` |
//! | `GET`    | `/students/`     | Optional `?country=` (exact) and `?age=` (inclusive minimum) |
//! | `GET`    | `/students/{id}` | `{name, age, address}`; 404 if missing or malformed id |
//! | `PATCH`  | `/students/{id}` | Body: [`StudentUpdate`]; returns 204 |
//! | `DELETE` | `/students/{id}` | Returns 200 + `{}`; 404 if nothing was deleted |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use roster_core::{
  store::{Collection, DocumentId, DocumentStore, Filter},
  student::{Student, StudentQuery, StudentSummary, StudentUpdate},
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
  AppState,
  error::ApiError,
  extract::{ApiJson, ApiPath, ApiQuery},
};

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Created {
  pub id: DocumentId,
}

/// `POST /students/` returns 201 + the generated id.
#[tracing::instrument(name = "create_student", skip_all)]
pub async fn create<S>(
  State(state): State<AppState<S>>,
  ApiJson(student): ApiJson<Student>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore,
{
  student.validate()?;

  let id = state
    .students()
    .insert_one(student.to_document()?)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(%id, "created student");
  Ok((StatusCode::CREATED, Json(Created { id })))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StudentList {
  pub data: Vec<StudentSummary>,
}

/// `GET /students/[?country=<country>][&age=<min age>]`
#[tracing::instrument(
  name = "list_students",
  skip_all,
  fields(country = ?query.country, age = ?query.age)
)]
pub async fn list<S>(
  State(state): State<AppState<S>>,
  ApiQuery(query): ApiQuery<StudentQuery>,
) -> Result<Json<StudentList>, ApiError>
where
  S: DocumentStore,
{
  let filter = query.to_filter();
  let projection = StudentSummary::projection();

  let docs = state
    .students()
    .find(&filter, Some(&projection))
    .await
    .map_err(ApiError::store)?;

  let data = docs
    .into_iter()
    .map(StudentSummary::from_document)
    .collect::<Result<Vec<_>, _>>()?;

  Ok(Json(StudentList { data }))
}

// ─── Fetch ───────────────────────────────────────────────────────────────────

/// `GET /students/{id}`
#[tracing::instrument(name = "fetch_student", skip_all, fields(id = %id))]
pub async fn fetch<S>(
  State(state): State<AppState<S>>,
  ApiPath(id): ApiPath<String>,
) -> Result<Json<Student>, ApiError>
where
  S: DocumentStore,
{
  let doc = state
    .students()
    .find_one(&Filter::by_id(id))
    .await
    .map_err(ApiError::store)?
    .ok_or_else(ApiError::student_not_found)?;

  Ok(Json(Student::from_document(doc)?))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PATCH /students/{id}` merges the present fields; returns 204.
#[tracing::instrument(name = "update_student", skip_all, fields(id = %id))]
pub async fn update<S>(
  State(state): State<AppState<S>>,
  ApiPath(id): ApiPath<String>,
  ApiJson(update): ApiJson<StudentUpdate>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore,
{
  let students = state.students();
  let filter = Filter::by_id(id);

  students
    .find_one(&filter)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(ApiError::student_not_found)?;

  update.validate()?;

  let patch = update.to_patch()?;
  if patch.is_empty() {
    return Ok(StatusCode::NO_CONTENT);
  }

  let outcome = students
    .update_one(&filter, &patch)
    .await
    .map_err(ApiError::store)?;

  // Deleted between the lookup and the write.
  if outcome.matched == 0 {
    return Err(ApiError::student_not_found());
  }

  tracing::debug!(modified = outcome.modified, "updated student");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /students/{id}` returns 200 + `{}`.
#[tracing::instrument(name = "delete_student", skip_all, fields(id = %id))]
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  ApiPath(id): ApiPath<String>,
) -> Result<Json<Map<String, Value>>, ApiError>
where
  S: DocumentStore,
{
  let deleted = state
    .students()
    .delete_one(&Filter::by_id(id))
    .await
    .map_err(ApiError::store)?;

  if deleted == 0 {
    return Err(ApiError::student_not_found());
  }

  tracing::info!("deleted student");
  Ok(Json(Map::new()))
}
