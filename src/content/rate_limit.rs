use std::collections::HashMap;
use std::str::FromStr;
use std::sync::RwLock;
use log::{error, warn};
use crate::utils::time_utils::current_timestamp;
use super::error::{CoreError, CoreResult};

/**
 * Fixed window rate limiting. The counter for a key resets at
 * window boundaries instead of sliding, which means a client can
 * get up to twice the limit through if it hits right before and
 * right after a boundary. That's how it's always worked, it's
 * not a bug.
 */

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSpec {
  pub limit: u32,
  pub window_secs: i64
}

// Parses the "<count>/<period>" format, e.g. "100/h", "5/m",
// or with a multiplier "10/30s". Unknown period units count
// as hours.
impl FromStr for RateSpec {
  type Err = CoreError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (count, period) = s.trim().split_once('/')
      .ok_or_else(|| CoreError::Validation(format!("Invalid rate: {}", s)))?;
    let limit: u32 = count.trim().parse()
      .map_err(|_| CoreError::Validation(format!("Invalid rate count: {}", s)))?;
    if limit == 0 {
      return Err(CoreError::validation("Rate limit count must be at least 1"));
    }
    let period = period.trim();
    let unit = period.chars().last()
      .ok_or_else(|| CoreError::Validation(format!("Missing rate period: {}", s)))?;
    let unit_secs: i64 = match unit {
      's' => 1,
      'm' => 60,
      'h' => 3600,
      'd' => 86400,
      _ => 3600
    };
    let multiplier = &period[..period.len() - unit.len_utf8()];
    let multiplier: i64 = if multiplier.is_empty() {
      1
    } else {
      multiplier.parse()
        .map_err(|_| CoreError::Validation(format!("Invalid rate period: {}", s)))?
    };
    if multiplier <= 0 {
      return Err(CoreError::Validation(format!("Invalid rate period: {}", s)));
    }
    let window_secs = multiplier.checked_mul(unit_secs)
      .ok_or_else(|| CoreError::Validation(format!("Rate period is too long: {}", s)))?;
    Ok(RateSpec {
      limit,
      window_secs
    })
  }
}

// What a store hands back after a hit was recorded (or refused).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowHit {
  pub allowed: bool,
  pub count: u32,
  pub window_start: i64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateDecision {
  Allowed { remaining: u32 },
  Limited { retry_after: i64 }
}

impl RateDecision {
  pub fn is_allowed(&self) -> bool {
    matches!(self, RateDecision::Allowed { .. })
  }

  // For callers that treat a refusal as an error, gives the
  // remaining hits otherwise.
  pub fn into_result(self) -> CoreResult<u32> {
    match self {
      RateDecision::Allowed { remaining } => Ok(remaining),
      RateDecision::Limited { retry_after } => Err(CoreError::RateLimited(retry_after))
    }
  }
}

/**
 * The atomic primitive a shared cache has to provide: reset the
 * bucket if its window is over, refuse without counting when
 * the bucket is full, count the hit otherwise. All of that has
 * to happen as one step for a given key or concurrent hits can
 * get through above the limit.
 */
pub trait BucketStore: Send + Sync {
  fn hit(
    &self,
    key: &str,
    limit: u32,
    window_secs: i64,
    now: i64
  ) -> CoreResult<WindowHit>;

  // Returns how many buckets were dropped.
  fn purge_expired(&self, now: i64) -> CoreResult<usize>;
}

pub fn bucket_key(resource: &str, subject: &str) -> String {
  format!("ratelimit:{}:{}", resource, subject)
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
  count: u32,
  window_start: i64,
  window_secs: i64
}

/**
 * Single process bucket store. The write lock makes the whole
 * check-and-increment atomic, but it's obviously not shared
 * between processes.
 */
pub struct MemoryBucketStore {
  buckets: RwLock<HashMap<String, Bucket>>
}

impl MemoryBucketStore {
  pub fn new() -> Self {
    Self {
      buckets: RwLock::new(HashMap::new())
    }
  }
}

impl Default for MemoryBucketStore {
  fn default() -> Self {
    Self::new()
  }
}

impl BucketStore for MemoryBucketStore {

  fn hit(
    &self,
    key: &str,
    limit: u32,
    window_secs: i64,
    now: i64
  ) -> CoreResult<WindowHit> {
    let mut buckets = self.buckets.write()
      .map_err(|e| {
        error!("Could not get a write handle on the rate limit \
          buckets, SHOULD NEVER HAPPEN - {}", e);
        CoreError::Store("Rate limit buckets lock is poisoned".to_string())
      })?;
    let bucket = buckets.entry(key.to_string())
      .or_insert(Bucket { count: 0, window_start: now, window_secs });
    if now - bucket.window_start >= window_secs {
      *bucket = Bucket { count: 0, window_start: now, window_secs };
    }
    let allowed = bucket.count < limit;
    if allowed {
      bucket.count += 1;
    }
    Ok(WindowHit {
      allowed,
      count: bucket.count,
      window_start: bucket.window_start
    })
  }

  fn purge_expired(&self, now: i64) -> CoreResult<usize> {
    let mut buckets = self.buckets.write()
      .map_err(|_| CoreError::Store("Rate limit buckets lock is poisoned".to_string()))?;
    let before = buckets.len();
    buckets.retain(|_, b| now - b.window_start < b.window_secs);
    Ok(before - buckets.len())
  }

}

pub struct RateLimiter<S: BucketStore> {
  store: S
}

impl<S: BucketStore> RateLimiter<S> {

  pub fn new(store: S) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn hit(&self, key: &str, rate: RateSpec) -> CoreResult<RateDecision> {
    self.hit_at(key, rate, current_timestamp())
  }

  pub fn hit_at(
    &self,
    key: &str,
    rate: RateSpec,
    now: i64
  ) -> CoreResult<RateDecision> {
    if rate.limit == 0 || rate.window_secs <= 0 {
      return Err(CoreError::validation("Rate limit and window must be positive"));
    }
    let hit = self.store.hit(key, rate.limit, rate.window_secs, now)?;
    if hit.allowed {
      Ok(RateDecision::Allowed {
        remaining: rate.limit.saturating_sub(hit.count)
      })
    } else {
      let retry_after = (hit.window_start + rate.window_secs - now).max(1);
      warn!(target: "audit", "rate_limit_exceeded | key: {} | retry_after: {}s", key, retry_after);
      Ok(RateDecision::Limited { retry_after })
    }
  }

}
