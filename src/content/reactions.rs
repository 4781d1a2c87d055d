use std::str::FromStr;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use super::error::CoreError;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
  #[display(fmt = "like")]
  Like,
  #[display(fmt = "dislike")]
  Dislike
}

impl ReactionKind {

  // Stored as is_like in the database.
  pub fn is_like(&self) -> bool {
    matches!(self, ReactionKind::Like)
  }

  pub fn from_is_like(is_like: bool) -> Self {
    if is_like { ReactionKind::Like } else { ReactionKind::Dislike }
  }

}

impl FromStr for ReactionKind {
  type Err = CoreError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "like" => Ok(ReactionKind::Like),
      "dislike" => Ok(ReactionKind::Dislike),
      _ => Err(CoreError::Validation(format!("Invalid reaction type: {}", s)))
    }
  }
}

// State of one (user, article) pair. None means there's no
// row at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionState {
  None,
  Liked,
  Disliked
}

impl ReactionState {

  pub fn kind(&self) -> Option<ReactionKind> {
    match self {
      ReactionState::None => None,
      ReactionState::Liked => Some(ReactionKind::Like),
      ReactionState::Disliked => Some(ReactionKind::Dislike)
    }
  }

}

impl From<Option<ReactionKind>> for ReactionState {
  fn from(kind: Option<ReactionKind>) -> Self {
    match kind {
      None => ReactionState::None,
      Some(ReactionKind::Like) => ReactionState::Liked,
      Some(ReactionKind::Dislike) => ReactionState::Disliked
    }
  }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionSignal {
  #[display(fmt = "reaction added")]
  Added,
  #[display(fmt = "reaction removed")]
  Removed,
  #[display(fmt = "reaction changed")]
  Changed
}

// What the store has to do to the row for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowChange {
  Insert(ReactionKind),
  Delete,
  Update(ReactionKind)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
  pub next: ReactionState,
  pub signal: ReactionSignal,
  pub change: RowChange
}

/**
 * The whole like/dislike table. Asking for what you already
 * have removes it, asking for the other one flips it.
 */
pub fn transition(current: ReactionState, requested: ReactionKind) -> Transition {
  use ReactionKind::*;
  use ReactionState::*;
  let (next, signal, change) = match (current, requested) {
    (None, Like) => (Liked, ReactionSignal::Added, RowChange::Insert(Like)),
    (None, Dislike) => (Disliked, ReactionSignal::Added, RowChange::Insert(Dislike)),
    (Liked, Like) => (None, ReactionSignal::Removed, RowChange::Delete),
    (Disliked, Dislike) => (None, ReactionSignal::Removed, RowChange::Delete),
    (Liked, Dislike) => (Disliked, ReactionSignal::Changed, RowChange::Update(Dislike)),
    (Disliked, Like) => (Liked, ReactionSignal::Changed, RowChange::Update(Like))
  };
  Transition { next, signal, change }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReactionCounts {
  pub like_count: i64,
  pub dislike_count: i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionOutcome {
  pub signal: ReactionSignal,
  pub state: ReactionState,
  pub counts: ReactionCounts
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkSignal {
  #[display(fmt = "bookmark added")]
  Added,
  #[display(fmt = "bookmark removed")]
  Removed
}

impl BookmarkSignal {
  pub fn is_bookmarked(&self) -> bool {
    matches!(self, BookmarkSignal::Added)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_reaction_kind() {
    assert_eq!(ReactionKind::Like, "like".parse().unwrap());
    assert_eq!(ReactionKind::Dislike, "dislike".parse().unwrap());
    let bad: Result<ReactionKind, CoreError> = "love".parse();
    assert!(matches!(bad, Err(CoreError::Validation(_))));
  }

  #[test]
  fn same_kind_twice_goes_back_to_none() {
    let first = transition(ReactionState::None, ReactionKind::Like);
    assert_eq!(ReactionState::Liked, first.next);
    assert_eq!(ReactionSignal::Added, first.signal);
    let second = transition(first.next, ReactionKind::Like);
    assert_eq!(ReactionState::None, second.next);
    assert_eq!(ReactionSignal::Removed, second.signal);
    assert_eq!(RowChange::Delete, second.change);
  }

  #[test]
  fn switching_kind_updates_in_place() {
    let t = transition(ReactionState::Liked, ReactionKind::Dislike);
    assert_eq!(ReactionState::Disliked, t.next);
    assert_eq!(ReactionSignal::Changed, t.signal);
    assert_eq!(RowChange::Update(ReactionKind::Dislike), t.change);
    let back = transition(t.next, ReactionKind::Like);
    assert_eq!(ReactionState::Liked, back.next);
    assert_eq!(RowChange::Update(ReactionKind::Like), back.change);
  }

  #[test]
  fn next_state_always_matches_row_change() {
    let states = [ReactionState::None, ReactionState::Liked, ReactionState::Disliked];
    let kinds = [ReactionKind::Like, ReactionKind::Dislike];
    for state in states.iter() {
      for kind in kinds.iter() {
        let t = transition(*state, *kind);
        let row_after = match t.change {
          RowChange::Insert(k) | RowChange::Update(k) => Some(k),
          RowChange::Delete => None
        };
        assert_eq!(t.next.kind(), row_after);
      }
    }
  }

  #[test]
  fn reaction_kind_serializes_lowercase() {
    assert_eq!("\"dislike\"", serde_json::to_string(&ReactionKind::Dislike).unwrap());
    assert_eq!("like", ReactionKind::Like.to_string());
  }
}
