//! Error type for `bughist-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] bughist_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// SQLite integers are signed; larger ids cannot be stored.
  #[error("bug id {0} does not fit into an SQLite integer")]
  BugIdOutOfRange(u64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
