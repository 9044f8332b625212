//! [`SqliteStore`] — the SQLite implementation of [`RecordStore`].

use std::path::Path;

use drugwatch_core::{
  model::{Drug, DrugId, Hit, HitId, Source, SourceId, SourceMeta},
  store::{HitFilter, RecordStore},
};
use rusqlite::OptionalExtension as _;

use crate::{
  encode::{
    DRUG_COLUMNS, HIT_COLUMNS, SOURCE_COLUMNS, decode_drug, decode_hit, decode_source,
    encode_hit_filter,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A drugwatch record store backed by a single SQLite file.
///
/// The first write after a commit opens a transaction; nothing is durable
/// until [`commit`](RecordStore::commit). Cloning is cheap — the inner
/// connection is reference-counted, so clones share the transaction.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Open a transaction unless one is already running.
fn begin(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  if conn.is_autocommit() {
    conn.execute_batch("BEGIN IMMEDIATE")?;
  }
  Ok(())
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
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

  /// Close the connection. Uncommitted writes are discarded.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  /// Whether writes are pending a commit.
  pub async fn in_transaction(&self) -> Result<bool> {
    Ok(self.conn.call(|conn| Ok(!conn.is_autocommit())).await?)
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  // ── Drugs ─────────────────────────────────────────────────────────────────

  async fn find_drug_by_name<'a>(&'a self, name: &'a str) -> Result<Option<Drug>> {
    let name = name.to_owned();

    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!("SELECT {DRUG_COLUMNS} FROM drugs WHERE name = ?1"),
                rusqlite::params![name],
                decode_drug,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn find_drug_by_id(&self, id: DrugId) -> Result<Option<Drug>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!("SELECT {DRUG_COLUMNS} FROM drugs WHERE id = ?1"),
                rusqlite::params![id.0],
                decode_drug,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn create_drug<'a>(&'a self, name: &'a str) -> Result<Drug> {
    let name = name.to_owned();

    let drug = self
      .conn
      .call(move |conn| {
        begin(conn)?;
        conn.execute("INSERT INTO drugs (name) VALUES (?1)", rusqlite::params![name])?;
        Ok(Drug { id: DrugId(conn.last_insert_rowid()), name })
      })
      .await?;

    tracing::trace!(id = %drug.id, name = %drug.name, "inserted drug");
    Ok(drug)
  }

  // ── Sources ───────────────────────────────────────────────────────────────

  async fn find_source_by_name<'a>(&'a self, name: &'a str) -> Result<Option<Source>> {
    let name = name.to_owned();

    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!("SELECT {SOURCE_COLUMNS} FROM sources WHERE name = ?1"),
                rusqlite::params![name],
                decode_source,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn find_source_by_id(&self, id: SourceId) -> Result<Option<Source>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!("SELECT {SOURCE_COLUMNS} FROM sources WHERE id = ?1"),
                rusqlite::params![id.0],
                decode_source,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn create_source<'a>(&'a self, meta: &'a SourceMeta, ts: i64) -> Result<Source> {
    let meta = meta.clone();

    let source = self
      .conn
      .call(move |conn| {
        begin(conn)?;
        conn.execute(
          "INSERT INTO sources (name, display_name, url, handle, created_ts, updated_ts)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![meta.name, meta.display_name, meta.url, meta.handle, ts],
        )?;
        Ok(Source {
          id: SourceId(conn.last_insert_rowid()),
          meta,
          created_ts: ts,
          updated_ts: ts,
        })
      })
      .await?;

    tracing::trace!(id = %source.id, name = %source.meta.name, "inserted source");
    Ok(source)
  }

  async fn update_source_timestamp(&self, id: SourceId, ts: i64) -> Result<()> {
    let changed = self
      .conn
      .call(move |conn| {
        begin(conn)?;
        Ok(conn.execute(
          "UPDATE sources SET updated_ts = ?2 WHERE id = ?1",
          rusqlite::params![id.0, ts],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::SourceNotFound(id));
    }
    Ok(())
  }

  // ── Hits ──────────────────────────────────────────────────────────────────

  async fn count_hits(&self, drug: DrugId, source: Option<SourceId>) -> Result<u64> {
    let (drug, source) = encode_hit_filter(HitFilter { drug: Some(drug), source });

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM hits
           WHERE drug_id = ?1 AND (?2 IS NULL OR source_id = ?2)",
          rusqlite::params![drug, source],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(count as u64)
  }

  async fn list_drug_ids_with_hits(&self) -> Result<Vec<DrugId>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt =
            conn.prepare("SELECT DISTINCT drug_id FROM hits ORDER BY drug_id")?;
          let rows = stmt
            .query_map([], |row| row.get(0).map(DrugId))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn list_source_ids_for_drug(&self, drug: DrugId) -> Result<Vec<SourceId>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT DISTINCT source_id FROM hits WHERE drug_id = ?1 ORDER BY source_id",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![drug.0], |row| row.get(0).map(SourceId))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn list_source_names_for_drug(&self, drug: DrugId) -> Result<Vec<String>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT s.name FROM sources s
             WHERE s.id IN (SELECT source_id FROM hits WHERE drug_id = ?1)
             ORDER BY s.id",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![drug.0], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn list_hits(&self, filter: HitFilter) -> Result<Vec<Hit>> {
    let (drug, source) = encode_hit_filter(filter);

    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT {HIT_COLUMNS} FROM hits
             WHERE (?1 IS NULL OR drug_id = ?1)
               AND (?2 IS NULL OR source_id = ?2)
             ORDER BY hit_ts DESC, id DESC"
          ))?;
          let rows = stmt
            .query_map(rusqlite::params![drug, source], decode_hit)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn insert_hit(&self, drug: DrugId, source: SourceId, ts: i64) -> Result<Hit> {
    let id = self
      .conn
      .call(move |conn| {
        begin(conn)?;
        conn.execute(
          "INSERT INTO hits (drug_id, source_id, hit_ts) VALUES (?1, ?2, ?3)",
          rusqlite::params![drug.0, source.0, ts],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Hit { id: HitId(id), drug_id: drug, source_id: source, hit_ts: ts })
  }

  async fn delete_hit(&self, id: HitId) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        begin(conn)?;
        conn.execute("DELETE FROM hits WHERE id = ?1", rusqlite::params![id.0])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Transactions ──────────────────────────────────────────────────────────

  async fn commit(&self) -> Result<()> {
    let committed = self
      .conn
      .call(|conn| {
        if conn.is_autocommit() {
          return Ok(false);
        }
        conn.execute_batch("COMMIT")?;
        Ok(true)
      })
      .await?;

    tracing::debug!(committed, "commit");
    Ok(())
  }

  async fn rollback(&self) -> Result<()> {
    let rolled_back = self
      .conn
      .call(|conn| {
        if conn.is_autocommit() {
          return Ok(false);
        }
        conn.execute_batch("ROLLBACK")?;
        Ok(true)
      })
      .await?;

    tracing::debug!(rolled_back, "rollback");
    Ok(())
  }
}
