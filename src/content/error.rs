use derive_more::Display;

// The four kinds callers actually have to branch on are Validation,
// Conflict, RateLimited and TransientStore. NotFound and Store are
// there because a store can also just not have the row, or be broken
// in a way retrying won't fix.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum CoreError {
  #[display(fmt = "Validation failure: {}", _0)]
  Validation(String),
  #[display(fmt = "Conflict: {}", _0)]
  Conflict(String),
  // Seconds until the window resets.
  #[display(fmt = "Rate limited, retry in {} seconds", _0)]
  RateLimited(i64),
  #[display(fmt = "Transient store failure: {}", _0)]
  TransientStore(String),
  #[display(fmt = "Not found: {}", _0)]
  NotFound(String),
  #[display(fmt = "Store failure: {}", _0)]
  Store(String)
}

impl std::error::Error for CoreError {}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {

  pub fn validation(msg: &str) -> Self {
    CoreError::Validation(String::from(msg))
  }

  pub fn conflict(msg: &str) -> Self {
    CoreError::Conflict(String::from(msg))
  }

  pub fn not_found(msg: &str) -> Self {
    CoreError::NotFound(String::from(msg))
  }

  pub fn is_conflict(&self) -> bool {
    matches!(self, CoreError::Conflict(_))
  }

  // Transient failures never leave anything behind, the caller
  // decides if it wants to try again.
  pub fn is_transient(&self) -> bool {
    matches!(self, CoreError::TransientStore(_))
  }

}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_keeps_the_kind_visible() {
    let e = CoreError::conflict("slug taken");
    assert_eq!("Conflict: slug taken", e.to_string());
    assert!(e.is_conflict());
    assert!(!e.is_transient());
  }

  #[test]
  fn transient_is_only_transient() {
    let e = CoreError::TransientStore("database is locked".to_string());
    assert!(e.is_transient());
    assert!(!CoreError::validation("nope").is_transient());
  }
}
