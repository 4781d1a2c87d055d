use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Transaction, TransactionBehavior};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use log::error;
use crate::content::{CoreError, CoreResult};
use crate::content::slugs::{SlugAllocator, SlugStore};
use super::Pool;

// Tables that carry a unique slug. Table names can't be bound
// as statement parameters, this keeps them out of user input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlugTable {
  Articles,
  Categories,
  Tags
}

impl SlugTable {

  pub fn table_name(&self) -> &'static str {
    match self {
      SlugTable::Articles => "articles",
      SlugTable::Categories => "categories",
      SlugTable::Tags => "tags"
    }
  }

  // Same limits the old models had on their slug columns.
  pub fn max_slug_length(&self) -> usize {
    match self {
      SlugTable::Articles => 255,
      SlugTable::Categories | SlugTable::Tags => 100
    }
  }

}

pub fn slug_exists(
  conn: &Connection,
  table: SlugTable,
  slug: &str
) -> CoreResult<bool> {
  let found: Option<i64> = conn.query_row(
    &format!("SELECT 1 FROM {} WHERE slug = ?", table.table_name()),
    params![slug],
    |row| row.get(0)
  ).optional()?;
  Ok(found.is_some())
}

// Glues the slug allocator to a table: probe with a SELECT,
// insert in an IMMEDIATE transaction so a unique violation
// rolls back everything the insert closure did.
struct SlugInsert<'a, F> {
  conn: &'a mut Connection,
  table: SlugTable,
  insert: F
}

impl<'a, F> SlugStore for SlugInsert<'a, F>
  where F: FnMut(&Transaction<'_>, &str) -> CoreResult<i64>
{
  type Inserted = i64;

  fn slug_taken(&mut self, slug: &str) -> CoreResult<bool> {
    slug_exists(self.conn, self.table, slug)
  }

  fn insert_with_slug(&mut self, slug: &str) -> CoreResult<i64> {
    let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let id = (self.insert)(&tx, slug)?;
    tx.commit()?;
    Ok(id)
  }
}

// Returns the slug that was used and the new row id.
pub fn insert_with_unique_slug<F>(
  conn: &mut Connection,
  table: SlugTable,
  text: &str,
  max_retries: u32,
  insert: F
) -> CoreResult<(String, i64)>
  where F: FnMut(&Transaction<'_>, &str) -> CoreResult<i64>
{
  let allocator = SlugAllocator::new(table.max_slug_length(), max_retries);
  let mut store = SlugInsert { conn, table, insert };
  allocator.allocate(&mut store, text)
}

pub fn connection(
  pool: &Pool
) -> CoreResult<PooledConnection<SqliteConnectionManager>> {
  Ok(pool.get()?)
}

// Unique violations are what the retry loops look for, foreign
// keys mean something referenced doesn't exist, other
// constraints (CHECK, NOT NULL) are bad input.
impl From<rusqlite::Error> for CoreError {
  fn from(e: rusqlite::Error) -> Self {
    match &e {
      rusqlite::Error::SqliteFailure(err, _) => match err.code {
        ErrorCode::ConstraintViolation => match err.extended_code {
          ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            CoreError::Conflict(e.to_string()),
          ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            CoreError::NotFound("Referenced entity does not exist".to_string()),
          _ => CoreError::Validation(e.to_string())
        },
        ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked =>
          CoreError::TransientStore(e.to_string()),
        _ => {
          error!("Database error - {}", e);
          CoreError::Store(e.to_string())
        }
      },
      rusqlite::Error::QueryReturnedNoRows =>
        CoreError::NotFound("No matching row".to_string()),
      _ => {
        error!("Database error - {}", e);
        CoreError::Store(e.to_string())
      }
    }
  }
}

// The only way r2d2 fails on get() is not getting a connection
// in time.
impl From<r2d2::Error> for CoreError {
  fn from(e: r2d2::Error) -> Self {
    CoreError::TransientStore(format!("Could not get a database connection - {}", e))
  }
}

/**
 * Runs f again when it fails with a conflict, for the "someone
 * inserted the row between my read and my insert" case. Every
 * other error goes straight back to the caller.
 */
pub fn retry_on_conflict<T, F>(
  max_retries: u32,
  what: &str,
  mut f: F
) -> CoreResult<T>
  where F: FnMut() -> CoreResult<T>
{
  let mut attempts: u32 = 0;
  loop {
    match f() {
      Err(CoreError::Conflict(msg)) if attempts < max_retries => {
        attempts += 1;
        log::debug!("Conflict during {} (attempt {}), retrying - {}", what, attempts, msg);
      },
      other => return other
    }
  }
}
