use serde::{Deserialize, Serialize};
use derive_more::Display;
use crate::content::CoreError;
use crate::content::lifecycle::Status;
use crate::content::reactions::{
  BookmarkSignal,
  ReactionCounts,
  ReactionKind,
  ReactionOutcome
};
use crate::db::entities::*;
use crate::utils::{serde_utils, time_utils};

// Entities go out through these with the From trait, dates
// become strings and field names camelCase.

pub use crate::db::entities::Tag as TagDto;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDto {
  pub id: i64,
  pub title: String,
  pub slug: String,
  pub excerpt: String,
  pub content: String,
  pub status: Status,
  pub publish_date: Option<String>,
  pub created_at: String,
  pub last_modified: String,
  pub author_id: i64,
  pub featured: bool,
  pub views: i64,
  pub reading_time: i64
}

impl From<Article> for ArticleDto {
  fn from(article: Article) -> Self {
    Self {
      id: article.id,
      title: article.title,
      slug: article.slug,
      excerpt: article.excerpt,
      content: article.content,
      status: article.status,
      publish_date: article.publish_date.map(time_utils::timestamp_to_date_string),
      created_at: time_utils::timestamp_to_date_string(article.created_at),
      last_modified: time_utils::timestamp_to_date_string(article.last_modified),
      author_id: article.author_id,
      featured: article.featured,
      views: article.views,
      reading_time: article.reading_time
    }
  }
}

// What GET on a single article sends: the article plus its
// taxonomy, the reaction counts and what the current user did
// with it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetailDto {
  #[serde(flatten)]
  pub article: ArticleDto,
  pub categories: Vec<CategoryDto>,
  pub tags: Vec<TagDto>,
  pub like_count: i64,
  pub dislike_count: i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_reaction: Option<ReactionKind>,
  pub is_bookmarked: bool
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
  pub id: i64,
  pub name: String,
  pub slug: String,
  pub description: String,
  pub featured_image: Option<String>,
  pub parent_id: Option<i64>
}

impl From<Category> for CategoryDto {
  fn from(category: Category) -> Self {
    Self {
      id: category.id,
      name: category.name,
      slug: category.slug,
      description: category.description,
      featured_image: category.featured_image,
      parent_id: category.parent_id
    }
  }
}

/* --- Request bodies --- */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticleBody {
  pub title: String,
  #[serde(default)]
  pub excerpt: String,
  #[serde(default)]
  pub content: String,
  pub status: Option<Status>,
  #[serde(default)]
  pub category_ids: Vec<i64>,
  #[serde(default)]
  pub tag_ids: Vec<i64>
}

impl From<NewArticleBody> for NewArticle {
  fn from(body: NewArticleBody) -> Self {
    Self {
      title: body.title,
      excerpt: body.excerpt,
      content: body.content,
      status: body.status,
      category_ids: body.category_ids,
      tag_ids: body.tag_ids
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ArticleUpdateBody {
  pub title: Option<String>,
  pub excerpt: Option<String>,
  pub content: Option<String>
}

impl From<ArticleUpdateBody> for ArticleUpdate {
  fn from(body: ArticleUpdateBody) -> Self {
    Self {
      title: body.title,
      excerpt: body.excerpt,
      content: body.content
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategoryBody {
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub featured_image: Option<String>,
  pub parent_id: Option<i64>
}

// The editors send empty strings for "no image".
impl From<NewCategoryBody> for NewCategory {
  fn from(body: NewCategoryBody) -> Self {
    Self {
      name: body.name,
      description: body.description,
      featured_image: serde_utils::empty_string_to_none(body.featured_image),
      parent_id: body.parent_id
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct NewTagBody {
  pub name: String
}

#[derive(Debug, Deserialize)]
pub struct ReactionBody {
  #[serde(rename = "type", alias = "reaction")]
  pub kind: ReactionKind
}

#[derive(Debug, Deserialize)]
pub struct StatusActionBody {
  pub action: String
}

#[derive(Debug, Deserialize)]
pub struct BulkActionBody {
  pub ids: Vec<i64>,
  pub action: String
}

/* --- End request bodies --- */

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionResponse {
  pub status: String,
  pub message: String,
  pub reaction: Option<ReactionKind>,
  #[serde(flatten)]
  pub counts: ReactionCounts
}

impl From<ReactionOutcome> for ReactionResponse {
  fn from(outcome: ReactionOutcome) -> Self {
    Self {
      status: JsonStatusType::Success.to_string(),
      message: outcome.signal.to_string(),
      reaction: outcome.state.kind(),
      counts: outcome.counts
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkResponse {
  pub status: String,
  pub message: String,
  pub is_bookmarked: bool
}

impl From<BookmarkSignal> for BookmarkResponse {
  fn from(signal: BookmarkSignal) -> Self {
    Self {
      status: JsonStatusType::Success.to_string(),
      message: signal.to_string(),
      is_bookmarked: signal.is_bookmarked()
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
  pub counted: bool,
  pub views: i64
}

impl From<ViewOutcome> for ViewResponse {
  fn from(outcome: ViewOutcome) -> Self {
    Self {
      counted: outcome.counted,
      views: outcome.views
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedResponse {
  pub id: i64,
  pub featured: bool
}

// One per id, either the new status or what went wrong.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItemDto {
  pub id: i64,
  pub status: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub article_status: Option<Status>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>
}

impl From<BulkOutcome> for BulkItemDto {
  fn from(outcome: BulkOutcome) -> Self {
    match outcome.result {
      Ok(status) => Self {
        id: outcome.id,
        status: JsonStatusType::Success.to_string(),
        article_status: Some(status),
        message: None
      },
      Err(e) => Self {
        id: outcome.id,
        status: match e {
          CoreError::Conflict(_) => "conflict",
          CoreError::NotFound(_) => "not found",
          _ => "error"
        }.to_string(),
        article_status: None,
        message: Some(e.to_string())
      }
    }
  }
}

// I use this in most responses that don't send an entity.
#[derive(Debug, Deserialize, Serialize)]
pub struct JsonStatus {
  pub status: String,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub id: Option<i64>
}

#[derive(Debug, Display)]
pub enum JsonStatusType {
  #[display(fmt = "success")]
  Success,
  #[display(fmt = "error")]
  Error
}

impl JsonStatus {
  pub fn new(status: JsonStatusType, message: &str) -> Self {
    Self {
      status: status.to_string(),
      message: String::from(message),
      id: None
    }
  }

  pub fn new_with_id(
    status: JsonStatusType,
    message: &str,
    id: i64
  ) -> Self {
    Self {
      status: status.to_string(),
      message: String::from(message),
      id: Some(id)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::content::reactions::{ReactionSignal, ReactionState};

  fn article() -> Article {
    Article {
      id: 3,
      title: "Some title".to_string(),
      slug: "some-title".to_string(),
      excerpt: "Some excerpt".to_string(),
      content: "Some content".to_string(),
      status: Status::Published,
      publish_date: Some(1615150740),
      created_at: 1615150740,
      last_modified: 1615150740,
      author_id: 1,
      featured: false,
      views: 12,
      reading_time: 1
    }
  }

  #[test]
  fn article_to_dto() {
    let dto: ArticleDto = article().into();
    assert_eq!(Some("2021-03-07T20:59:00Z".to_string()), dto.publish_date);
    let json = serde_json::to_value(&dto).unwrap();
    assert_eq!("published", json["status"]);
    assert_eq!(1, json["readingTime"]);
  }

  #[test]
  fn unpublished_article_has_no_publish_date() {
    let mut sut = article();
    sut.publish_date = None;
    let dto: ArticleDto = sut.into();
    assert_eq!(None, dto.publish_date);
  }

  #[test]
  fn reaction_response_flattens_counts() {
    let response: ReactionResponse = ReactionOutcome {
      signal: ReactionSignal::Changed,
      state: ReactionState::Disliked,
      counts: ReactionCounts { like_count: 2, dislike_count: 1 }
    }.into();
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!("reaction changed", json["message"]);
    assert_eq!("dislike", json["reaction"]);
    assert_eq!(2, json["likeCount"]);
    assert_eq!(1, json["dislikeCount"]);
  }

  #[test]
  fn empty_image_url_is_none_for_new_category() {
    let body = NewCategoryBody {
      name: "Cat".to_string(),
      description: String::new(),
      featured_image: Some("".to_string()),
      parent_id: None
    };
    let category: NewCategory = body.into();
    assert_eq!(None, category.featured_image);
  }

  #[test]
  fn reaction_body_takes_type_or_reaction() {
    let body: ReactionBody = serde_json::from_str(r#"{"type": "like"}"#).unwrap();
    assert_eq!(ReactionKind::Like, body.kind);
    let body: ReactionBody = serde_json::from_str(r#"{"reaction": "dislike"}"#).unwrap();
    assert_eq!(ReactionKind::Dislike, body.kind);
  }

  #[test]
  fn bulk_outcome_reports_failures() {
    let item: BulkItemDto = BulkOutcome {
      id: 4,
      result: Err(CoreError::conflict("Cannot approve an article that is published"))
    }.into();
    assert_eq!("conflict", item.status);
    assert!(item.article_status.is_none());
    let item: BulkItemDto = BulkOutcome { id: 5, result: Ok(Status::Published) }.into();
    assert_eq!("success", item.status);
  }
}
