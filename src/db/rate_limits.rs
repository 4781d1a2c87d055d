use rusqlite::params;
use log::debug;
use crate::content::CoreResult;
use crate::content::rate_limit::{BucketStore, WindowHit};
use super::helpers::connection;
use super::Pool;

// One statement does the whole reset/refuse/count dance. In the
// DO UPDATE part every column name refers to the row as it was
// before the update, SQLite evaluates all the CASEs against the
// old values.
const HIT_QUERY: &'static str = "
INSERT INTO rate_limit_buckets (key, count, window_start, expires_at, last_allowed)
  VALUES (?1, 1, ?2, ?2 + ?3, 1)
ON CONFLICT (key) DO UPDATE SET
  count = CASE
    WHEN ?2 - window_start >= ?3 THEN 1
    WHEN count >= ?4 THEN count
    ELSE count + 1 END,
  last_allowed = CASE
    WHEN ?2 - window_start >= ?3 THEN 1
    WHEN count >= ?4 THEN 0
    ELSE 1 END,
  expires_at = CASE
    WHEN ?2 - window_start >= ?3 THEN ?2 + ?3
    ELSE expires_at END,
  window_start = CASE
    WHEN ?2 - window_start >= ?3 THEN ?2
    ELSE window_start END
RETURNING count, window_start, last_allowed";

/**
 * Bucket store shared by every process using the same database
 * file. The upsert is atomic on its own so there's no
 * transaction around it.
 */
#[derive(Clone)]
pub struct SqliteBucketStore {
  pool: Pool
}

impl SqliteBucketStore {
  pub fn new(pool: Pool) -> Self {
    Self { pool }
  }
}

impl BucketStore for SqliteBucketStore {

  fn hit(
    &self,
    key: &str,
    limit: u32,
    window_secs: i64,
    now: i64
  ) -> CoreResult<WindowHit> {
    let conn = connection(&self.pool)?;
    let hit = conn.query_row(
      HIT_QUERY,
      params![key, now, window_secs, limit],
      |row| Ok(WindowHit {
        count: row.get(0)?,
        window_start: row.get(1)?,
        allowed: row.get(2)?
      })
    )?;
    Ok(hit)
  }

  fn purge_expired(&self, now: i64) -> CoreResult<usize> {
    let conn = connection(&self.pool)?;
    let purged = conn.execute(
      "DELETE FROM rate_limit_buckets WHERE expires_at <= ?",
      params![now]
    )?;
    debug!("Purged {} expired rate limit buckets", purged);
    Ok(purged)
  }

}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::content::rate_limit::{bucket_key, RateDecision, RateLimiter, RateSpec};
  use crate::db::test_support::test_db;
  use std::sync::Arc;
  use std::thread;

  #[test]
  fn sixth_hit_is_refused_until_the_window_resets() {
    let db = test_db();
    let limiter = RateLimiter::new(SqliteBucketStore::new(db.pool.clone()));
    let rate = RateSpec { limit: 5, window_secs: 60 };
    let key = bucket_key("articles", "42");
    for t in 0..5 {
      assert!(limiter.hit_at(&key, rate, 1000 + t).unwrap().is_allowed());
    }
    assert_eq!(
      RateDecision::Limited { retry_after: 30 },
      limiter.hit_at(&key, rate, 1030).unwrap()
    );
    assert_eq!(
      RateDecision::Allowed { remaining: 4 },
      limiter.hit_at(&key, rate, 1060).unwrap()
    );
  }

  #[test]
  fn refused_hits_do_not_count() {
    let db = test_db();
    let store = SqliteBucketStore::new(db.pool.clone());
    store.hit("k", 2, 60, 0).unwrap();
    store.hit("k", 2, 60, 1).unwrap();
    let refused = store.hit("k", 2, 60, 2).unwrap();
    assert_eq!(WindowHit { allowed: false, count: 2, window_start: 0 }, refused);
    let refused = store.hit("k", 2, 60, 3).unwrap();
    assert_eq!(2, refused.count);
  }

  #[test]
  fn boundary_burst_is_admitted() {
    let db = test_db();
    let store = SqliteBucketStore::new(db.pool.clone());
    let allowed = (0..10)
      .filter(|i| store.hit("burst", 5, 60, if *i < 5 { 59 } else { 119 }).unwrap().allowed)
      .count();
    assert_eq!(10, allowed);
  }

  #[test]
  fn concurrent_hits_never_exceed_limit() {
    let db = test_db();
    let limiter = Arc::new(RateLimiter::new(SqliteBucketStore::new(db.pool.clone())));
    let rate = RateSpec { limit: 25, window_secs: 3600 };
    let handles: Vec<_> = (0..6).map(|_| {
      let limiter = Arc::clone(&limiter);
      thread::spawn(move || {
        (0..10)
          .filter(|_| limiter.hit_at("shared", rate, 5000).unwrap().is_allowed())
          .count()
      })
    }).collect();
    let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(25, allowed);
  }

  #[test]
  fn purge_drops_only_expired_buckets() {
    let db = test_db();
    let store = SqliteBucketStore::new(db.pool.clone());
    store.hit("old", 5, 60, 0).unwrap();
    store.hit("fresh", 5, 60, 100).unwrap();
    assert_eq!(1, store.purge_expired(120).unwrap());
    assert_eq!(2, store.hit("fresh", 5, 60, 120).unwrap().count);
    assert_eq!(1, store.hit("old", 5, 60, 121).unwrap().count);
  }
}
