//! [`SqliteStore`]: the SQLite implementation of the timeline collaborators.

use std::path::Path;

use bughist_core::{
  store::{SaveMode, SaveReport, TimelineLookup, TimelineSink},
  timeline::{BugId, Timeline},
  version::PersistenceState,
};
use rusqlite::OptionalExtension as _;

use crate::{
  Result,
  encode::{RawVersion, encode_bug_id},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A bug timeline store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// How a single version row is written.
enum Write {
  Insert(RawVersion),
  Update(RawVersion),
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
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

// ─── Lookup ──────────────────────────────────────────────────────────────────

impl TimelineLookup for SqliteStore {
  type Error = crate::Error;

  async fn find_timeline(&self, id: BugId) -> Result<Option<Timeline>> {
    let id_val = encode_bug_id(id)?;

    let raw: Option<(String, Vec<RawVersion>)> = self
      .conn
      .call(move |conn| {
        let reporter: Option<String> = conn
          .query_row(
            "SELECT reporter FROM bugs WHERE bug_id = ?1",
            rusqlite::params![id_val],
            |row| row.get(0),
          )
          .optional()?;
        let Some(reporter) = reporter else {
          return Ok(None);
        };

        let mut stmt = conn.prepare(
          "SELECT valid_from, valid_to, modified_by, annotation, facets, derived
           FROM versions
           WHERE bug_id = ?1
           ORDER BY valid_from",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_val], |row| {
            Ok(RawVersion {
              valid_from:  row.get(0)?,
              valid_to:    row.get(1)?,
              modified_by: row.get(2)?,
              annotation:  row.get(3)?,
              facets:      row.get(4)?,
              derived:     row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((reporter, rows)))
      })
      .await?;

    let Some((reporter, raws)) = raw else {
      return Ok(None);
    };
    // A bug row without versions carries no history to rebase onto.
    if raws.is_empty() {
      return Ok(None);
    }

    let mut timeline = Timeline::new(id, reporter);
    for raw in raws {
      timeline.append(raw.into_version()?)?;
    }
    tracing::debug!(bug_id = id, versions = timeline.len(), "loaded timeline");
    Ok(Some(timeline))
  }
}

// ─── Sink ────────────────────────────────────────────────────────────────────

impl TimelineSink for SqliteStore {
  type Error = crate::Error;

  async fn save_timeline(&self, timeline: &Timeline) -> Result<SaveReport> {
    let id_val = encode_bug_id(timeline.id())?;
    let reporter = timeline.reporter().to_owned();
    let mode = if timeline.never_saved() {
      SaveMode::Insert
    } else {
      SaveMode::Update
    };

    let mut writes = Vec::with_capacity(timeline.len());
    let mut skipped = 0;
    for version in timeline {
      let raw = RawVersion::from_version(version)?;
      match (mode, version.persistence_state()) {
        (SaveMode::Insert, _) | (SaveMode::Update, PersistenceState::New) => {
          writes.push(Write::Insert(raw));
        }
        (SaveMode::Update, PersistenceState::Dirty) => {
          writes.push(Write::Update(raw));
        }
        (SaveMode::Update, PersistenceState::Saved) => skipped += 1,
      }
    }

    let (inserted, updated) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if mode == SaveMode::Insert {
          tx.execute(
            "INSERT INTO bugs (bug_id, reporter) VALUES (?1, ?2)
             ON CONFLICT (bug_id) DO UPDATE SET reporter = excluded.reporter",
            rusqlite::params![id_val, reporter],
          )?;
        }

        let (mut inserted, mut updated) = (0_usize, 0_usize);
        for write in writes {
          match write {
            Write::Insert(raw) => {
              tx.execute(
                "INSERT INTO versions (
                   bug_id, valid_from, valid_to, modified_by, annotation,
                   facets, derived
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                  id_val,
                  raw.valid_from,
                  raw.valid_to,
                  raw.modified_by,
                  raw.annotation,
                  raw.facets,
                  raw.derived,
                ],
              )?;
              inserted += 1;
            }
            Write::Update(raw) => {
              let changed = tx.execute(
                "UPDATE versions
                 SET valid_to = ?3, modified_by = ?4, annotation = ?5,
                     facets = ?6, derived = ?7
                 WHERE bug_id = ?1 AND valid_from = ?2",
                rusqlite::params![
                  id_val,
                  raw.valid_from,
                  raw.valid_to,
                  raw.modified_by,
                  raw.annotation,
                  raw.facets,
                  raw.derived,
                ],
              )?;
              // A dirty version must already be stored.
              if changed != 1 {
                return Err(rusqlite::Error::QueryReturnedNoRows.into());
              }
              updated += 1;
            }
          }
        }

        tx.commit()?;
        Ok((inserted, updated))
      })
      .await?;

    Ok(SaveReport { mode, inserted, updated, skipped })
  }
}
