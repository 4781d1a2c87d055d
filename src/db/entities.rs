use serde::{Deserialize, Serialize};
use crate::content::CoreError;
use crate::content::lifecycle::Status;

// Plain rows, the app module has DTOs for the outside world.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
  pub id: i64,
  pub title: String,
  pub slug: String,
  pub excerpt: String,
  pub content: String,
  pub status: Status,
  pub publish_date: Option<i64>,
  pub created_at: i64,
  pub last_modified: i64,
  pub author_id: i64,
  pub featured: bool,
  pub views: i64,
  pub reading_time: i64
}

#[derive(Debug, Clone, Default)]
pub struct NewArticle {
  pub title: String,
  pub excerpt: String,
  pub content: String,
  pub status: Option<Status>,
  pub category_ids: Vec<i64>,
  pub tag_ids: Vec<i64>
}

// Object I use to fit my "update only what's in
// the request body" agenda. There's no slug in
// there on purpose, slugs never change.
#[derive(Debug, Clone, Default)]
pub struct ArticleUpdate {
  pub title: Option<String>,
  pub excerpt: Option<String>,
  pub content: Option<String>
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
  pub id: i64,
  pub name: String,
  pub slug: String,
  pub description: String,
  pub featured_image: Option<String>,
  pub parent_id: Option<i64>
}

#[derive(Debug, Clone, Default)]
pub struct NewCategory {
  pub name: String,
  pub description: String,
  pub featured_image: Option<String>,
  pub parent_id: Option<i64>
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
  pub id: i64,
  pub name: String,
  pub slug: String
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewOutcome {
  pub counted: bool,
  pub views: i64
}

// One entry per id of a bulk approve/reject.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome {
  pub id: i64,
  pub result: Result<Status, CoreError>
}
