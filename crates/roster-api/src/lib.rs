//! JSON REST API for Roster.
//!
//! Exposes an axum [`Router`] backed by any
//! [`roster_core::store::DocumentStore`]. CORS, tracing middleware and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = roster_api::api_router(AppState::new(store, "students"));
//! ```

pub mod error;
pub mod extract;
pub mod students;

use std::sync::Arc;

use axum::{Router, routing::get};
use roster_core::store::DocumentStore;

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers: the process-wide store handle
/// and the name of the student collection.
pub struct AppState<S> {
  pub store:      Arc<S>,
  pub collection: Arc<str>,
}

// Not derived: cloning the state must not require `S: Clone`.
impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      collection: Arc::clone(&self.collection),
    }
  }
}

impl<S: DocumentStore> AppState<S> {
  pub fn new(store: Arc<S>, collection: impl Into<Arc<str>>) -> Self {
    Self {
      store,
      collection: collection.into(),
    }
  }

  /// A handle to the student collection.
  pub fn students(&self) -> S::Collection { self.store.collection(&self.collection) }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the immutable dispatch table for `state`.
///
/// The returned `Router<()>` can be merged or nested into any parent router
/// regardless of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: DocumentStore + 'static,
{
  Router::new()
    .route(
      "/students/",
      get(students::list::<S>).post(students::create::<S>),
    )
    .route(
      "/students",
      get(students::list::<S>).post(students::create::<S>),
    )
    .route(
      "/students/{id}",
      get(students::fetch::<S>)
        .patch(students::update::<S>)
        .delete(students::delete::<S>),
    )
    .with_state(state)
}
