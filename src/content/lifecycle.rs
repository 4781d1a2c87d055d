use std::str::FromStr;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use super::error::{CoreError, CoreResult};

// Average reading speed used to compute reading_time.
const WORDS_PER_MINUTE: f64 = 200.0;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
  #[display(fmt = "draft")]
  Draft,
  #[display(fmt = "pending")]
  Pending,
  #[display(fmt = "published")]
  Published,
  #[display(fmt = "rejected")]
  Rejected,
  #[display(fmt = "archived")]
  Archived
}

impl Status {
  pub fn as_str(&self) -> &'static str {
    match self {
      Status::Draft => "draft",
      Status::Pending => "pending",
      Status::Published => "published",
      Status::Rejected => "rejected",
      Status::Archived => "archived"
    }
  }
}

impl FromStr for Status {
  type Err = CoreError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "draft" => Ok(Status::Draft),
      "pending" => Ok(Status::Pending),
      "published" => Ok(Status::Published),
      "rejected" => Ok(Status::Rejected),
      "archived" => Ok(Status::Archived),
      _ => Err(CoreError::Validation(format!("Unknown status: {}", s)))
    }
  }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusAction {
  #[display(fmt = "publish")]
  Publish,
  #[display(fmt = "unpublish")]
  Unpublish,
  #[display(fmt = "approve")]
  Approve,
  #[display(fmt = "reject")]
  Reject,
  #[display(fmt = "archive")]
  Archive
}

impl FromStr for StatusAction {
  type Err = CoreError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "publish" => Ok(StatusAction::Publish),
      "unpublish" => Ok(StatusAction::Unpublish),
      "approve" => Ok(StatusAction::Approve),
      "reject" => Ok(StatusAction::Reject),
      "archive" => Ok(StatusAction::Archive),
      _ => Err(CoreError::Validation(format!("Invalid action: {}", s)))
    }
  }
}

impl StatusAction {

  /**
   * The transition table. Everything not listed is a conflict,
   * there's no way to write an arbitrary status.
   * Archived articles can only be left through an explicit
   * publish, unpublish (back to draft) or reject.
   */
  pub fn target(&self, from: Status) -> CoreResult<Status> {
    use Status::*;
    let allowed = match (self, from) {
      (StatusAction::Publish, _) => Some(Published),
      (StatusAction::Unpublish, _) => Some(Draft),
      (StatusAction::Approve, Pending) => Some(Published),
      (StatusAction::Approve, _) => None,
      (StatusAction::Reject, _) => Some(Rejected),
      (StatusAction::Archive, _) => Some(Archived)
    };
    allowed.ok_or_else(|| CoreError::Conflict(
      format!("Cannot {} an article that is {}", self, from)
    ))
  }

  // Publish date is only ever set once, later publications keep
  // the original date.
  pub fn stamps_publish_date(&self) -> bool {
    matches!(self, StatusAction::Publish | StatusAction::Approve)
  }

  // Actions the author can do on their own articles, the rest
  // needs a privileged user.
  pub fn author_allowed(&self) -> bool {
    matches!(self, StatusAction::Publish | StatusAction::Unpublish)
  }

}

/**
 * Status an article starts with. Privileged creators get what
 * they ask for (pending if they ask nothing), everyone else
 * gets pending unless they explicitly want a draft.
 */
pub fn initial_status(requested: Option<Status>, privileged: bool) -> Status {
  match (requested, privileged) {
    (Some(status), true) => status,
    (None, _) => Status::Pending,
    (Some(Status::Draft), false) => Status::Draft,
    (Some(_), false) => Status::Pending
  }
}

// Views count when the article is published and the viewer
// isn't its author. Anonymous viewers always count.
pub fn counts_view(status: Status, author_id: i64, viewer_id: Option<i64>) -> bool {
  status == Status::Published && viewer_id != Some(author_id)
}

pub fn reading_time(content: &str) -> i64 {
  let words = content.split_whitespace().count() as f64;
  // Halves go to the even minute, 2.5 is 2.
  let minutes = (words / WORDS_PER_MINUTE).round_ties_even() as i64;
  minutes.max(1)
}

#[cfg(test)]
mod tests {
  use super::*;

  const ALL: [Status; 5] = [
    Status::Draft,
    Status::Pending,
    Status::Published,
    Status::Rejected,
    Status::Archived
  ];

  #[test]
  fn status_round_trips_through_str() {
    for s in ALL.iter() {
      assert_eq!(*s, s.as_str().parse::<Status>().unwrap());
      assert_eq!(s.as_str(), s.to_string());
    }
    assert!(matches!("deleted".parse::<Status>(), Err(CoreError::Validation(_))));
  }

  #[test]
  fn approve_only_from_pending() {
    assert_eq!(Status::Published, StatusAction::Approve.target(Status::Pending).unwrap());
    for s in ALL.iter().filter(|s| **s != Status::Pending) {
      assert!(matches!(StatusAction::Approve.target(*s), Err(CoreError::Conflict(_))));
    }
  }

  #[test]
  fn publish_works_from_anywhere() {
    for s in ALL.iter() {
      assert_eq!(Status::Published, StatusAction::Publish.target(*s).unwrap());
    }
  }

  #[test]
  fn unpublish_and_archive_work_from_anywhere() {
    for s in ALL.iter() {
      assert_eq!(Status::Draft, StatusAction::Unpublish.target(*s).unwrap());
      assert_eq!(Status::Archived, StatusAction::Archive.target(*s).unwrap());
    }
  }

  #[test]
  fn reject_works_from_anywhere() {
    for s in ALL.iter() {
      assert_eq!(Status::Rejected, StatusAction::Reject.target(*s).unwrap());
    }
  }

  #[test]
  fn initial_status_for_creators() {
    assert_eq!(Status::Pending, initial_status(None, false));
    assert_eq!(Status::Pending, initial_status(None, true));
    assert_eq!(Status::Draft, initial_status(Some(Status::Draft), false));
    assert_eq!(Status::Pending, initial_status(Some(Status::Published), false));
    assert_eq!(Status::Published, initial_status(Some(Status::Published), true));
    assert_eq!(Status::Archived, initial_status(Some(Status::Archived), true));
  }

  #[test]
  fn views_only_count_on_published_and_not_for_author() {
    assert!(counts_view(Status::Published, 1, None));
    assert!(counts_view(Status::Published, 1, Some(2)));
    assert!(!counts_view(Status::Published, 1, Some(1)));
    assert!(!counts_view(Status::Draft, 1, Some(2)));
  }

  #[test]
  fn reading_time_is_at_least_a_minute() {
    assert_eq!(1, reading_time(""));
    assert_eq!(1, reading_time("a few words"));
    let long = "word ".repeat(1000);
    assert_eq!(5, reading_time(&long));
    let longer = "word ".repeat(700);
    // 3.5 goes to the even 4, 2.5 to the even 2:
    assert_eq!(4, reading_time(&longer));
    assert_eq!(2, reading_time(&"word ".repeat(500)));
  }
}
