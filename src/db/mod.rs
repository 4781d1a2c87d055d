use std::time::Duration;
use rusqlite::{Params, Row};
use r2d2_sqlite::SqliteConnectionManager;
use eyre::WrapErr;
use color_eyre::Result;
use crate::config::Config;
use crate::content::CoreResult;
pub mod entities;
mod mappers;
mod helpers;
mod schema;
pub mod articles;
pub mod taxonomy;
pub mod reactions;
pub mod rate_limits;

pub use helpers::{connection, SlugTable};
pub use rate_limits::SqliteBucketStore;

// Type alias to make function signatures much clearer:
pub type Pool = r2d2::Pool<SqliteConnectionManager>;

/**
 * Every connection gets foreign keys (the cascades depend on
 * it), WAL so readers don't block the writer, and a busy
 * timeout. When the busy timeout runs out the statement fails
 * with SQLITE_BUSY, which ends up as a transient failure.
 */
pub fn open_pool(config: &Config) -> Result<Pool> {
  let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
  let manager = SqliteConnectionManager::file(&config.db_path)
    .with_init(move |c| {
      c.busy_timeout(busy_timeout)?;
      c.pragma_update(None, "foreign_keys", "ON")?;
      // journal_mode answers with the new mode, we don't need it.
      c.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))
    });
  r2d2::Pool::builder()
    .max_size(config.pool_size)
    .connection_timeout(Duration::from_secs(config.pool_timeout_secs))
    .build(manager)
    .context("Database connection failed")
}

pub fn init_schema(pool: &Pool) -> CoreResult<()> {
  let conn = connection(pool)?;
  conn.execute_batch(schema::SCHEMA)?;
  Ok(())
}

// Stole most of the signature from the rustqlite doc.
// Careful to use a later version of the crate,
// Google takes you to old versions of the doc.
fn select_many<T, P, F>(
  pool: &Pool,
  query: &str,
  params: P,
  mapper: F
) -> CoreResult<Vec<T>>
  where
    P: Params,
    F: FnMut(&Row<'_>) -> Result<T, rusqlite::Error>,
{
  let conn = connection(pool)?;
  let mut stmt = conn.prepare(query)?;
  let rows = stmt.query_map(params, mapper)?
    .collect::<Result<Vec<T>, rusqlite::Error>>()?;
  Ok(rows)
}

#[cfg(test)]
pub mod test_support {
  use super::*;
  use tempfile::TempDir;

  // The TempDir has to outlive the pool or the file (and its
  // WAL friends) disappear under SQLite.
  pub struct TestDb {
    pub pool: Pool,
    _dir: TempDir
  }

  pub fn test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("Could not create temp dir");
    let path = dir.path().join("content-test.db");
    let config = Config::for_database(path.to_str().expect("Temp path is not UTF-8"));
    let pool = open_pool(&config).expect("Could not open test pool");
    init_schema(&pool).expect("Could not create schema");
    TestDb { pool, _dir: dir }
  }
}
