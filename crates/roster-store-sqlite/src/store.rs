//! [`SqliteStore`], the SQLite implementation of [`DocumentStore`].

use std::path::Path;

use rusqlite::{OptionalExtension as _, params_from_iter};

use roster_core::store::{
  Collection, Document, DocumentId, DocumentStore, Filter, Patch, Projection,
  UpdateOutcome,
};

use crate::{
  Error, Result,
  encode::{compile_filter, decode_body, encode_body, new_id},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A document store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened sqlite document store");
    Ok(store)
  }

  /// Open an in-memory store, for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

impl DocumentStore for SqliteStore {
  type Error = Error;
  type Collection = SqliteCollection;

  fn collection(&self, name: &str) -> SqliteCollection {
    SqliteCollection {
      conn: self.conn.clone(),
      name: name.to_owned(),
    }
  }

  async fn close(self) -> Result<()> {
    self.conn.close().await?;
    tracing::debug!("closed sqlite document store");
    Ok(())
  }
}

// ─── Collection ──────────────────────────────────────────────────────────────

/// One named collection inside a [`SqliteStore`].
#[derive(Clone)]
pub struct SqliteCollection {
  conn: tokio_rusqlite::Connection,
  name: String,
}

/// Wrap a crate error so it can cross the `tokio_rusqlite` closure boundary.
fn other(e: Error) -> tokio_rusqlite::Error { tokio_rusqlite::Error::Other(Box::new(e)) }

impl Collection for SqliteCollection {
  type Error = Error;

  async fn insert_one(&self, mut doc: Document) -> Result<DocumentId> {
    doc.remove("_id");
    let id = new_id();
    let body = encode_body(&doc)?;
    let collection = self.name.clone();
    let id_str = id.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3)",
          rusqlite::params![collection, id_str, body],
        )?;
        Ok(())
      })
      .await?;

    Ok(DocumentId::new(id))
  }

  async fn find(
    &self,
    filter: &Filter,
    projection: Option<&Projection>,
  ) -> Result<Vec<Document>> {
    let Some(sql) = compile_filter(&self.name, filter) else {
      return Ok(Vec::new());
    };

    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT doc_id, body FROM documents WHERE {} ORDER BY rowid",
          sql.clause
        ))?;
        let rows = stmt
          .query_map(params_from_iter(sql.params.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .iter()
      .map(|(id, body)| -> Result<Document> {
        let doc = decode_body(id, body)?;
        Ok(match projection {
          Some(p) => p.apply(doc),
          None => doc,
        })
      })
      .collect()
  }

  async fn find_one(&self, filter: &Filter) -> Result<Option<Document>> {
    let Some(sql) = compile_filter(&self.name, filter) else {
      return Ok(None);
    };

    let row: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT doc_id, body FROM documents WHERE {} ORDER BY rowid LIMIT 1",
                sql.clause
              ),
              params_from_iter(sql.params.iter()),
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    row.map(|(id, body)| decode_body(&id, &body)).transpose()
  }

  async fn update_one(&self, filter: &Filter, patch: &Patch) -> Result<UpdateOutcome> {
    let Some(sql) = compile_filter(&self.name, filter) else {
      return Ok(UpdateOutcome::default());
    };
    let patch = patch.clone();
    let collection = self.name.clone();

    // Read, merge and write back on the connection thread so no other
    // operation interleaves with the merge.
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let found: Option<(String, String)> = tx
          .query_row(
            &format!(
              "SELECT doc_id, body FROM documents WHERE {} ORDER BY rowid LIMIT 1",
              sql.clause
            ),
            params_from_iter(sql.params.iter()),
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;

        let Some((doc_id, body)) = found else {
          return Ok(UpdateOutcome::default());
        };

        let mut doc = decode_body(&doc_id, &body).map_err(other)?;
        let modified = patch.apply(&mut doc);
        if modified {
          let body = encode_body(&doc).map_err(other)?;
          tx.execute(
            "UPDATE documents SET body = ?1 WHERE collection = ?2 AND doc_id = ?3",
            rusqlite::params![body, collection, doc_id],
          )?;
        }
        tx.commit()?;

        Ok(UpdateOutcome {
          matched:  1,
          modified: u64::from(modified),
        })
      })
      .await?;

    Ok(outcome)
  }

  async fn delete_one(&self, filter: &Filter) -> Result<u64> {
    let Some(sql) = compile_filter(&self.name, filter) else {
      return Ok(0);
    };

    let deleted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          &format!(
            "DELETE FROM documents WHERE rowid = (
               SELECT rowid FROM documents WHERE {} ORDER BY rowid LIMIT 1
             )",
            sql.clause
          ),
          params_from_iter(sql.params.iter()),
        )?;
        Ok(n)
      })
      .await?;

    Ok(deleted as u64)
  }
}
