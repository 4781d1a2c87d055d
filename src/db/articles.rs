use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use log::{debug, info};
use crate::content::{CoreError, CoreResult};
use crate::content::lifecycle::{self, Status, StatusAction};
use crate::utils::text_utils;
use crate::utils::time_utils::current_timestamp;
use super::entities::*;
use super::helpers::{connection, insert_with_unique_slug, SlugTable};
use super::mappers::{map_article, ARTICLE_FIELDS};
use super::{select_many, Pool};

const MAX_TITLE_LENGTH: usize = 255;

fn article_by_id_conn(
  conn: &Connection,
  id: i64
) -> CoreResult<Option<Article>> {
  let article = conn.query_row(
    &format!("SELECT {} FROM articles WHERE id = ?", ARTICLE_FIELDS),
    params![id],
    map_article
  ).optional()?;
  Ok(article)
}

pub fn article_by_id(
  pool: &Pool,
  id: i64
) -> CoreResult<Option<Article>> {
  let conn = connection(pool)?;
  article_by_id_conn(&conn, id)
}

pub fn article_by_slug(
  pool: &Pool,
  slug: &str
) -> CoreResult<Option<Article>> {
  let conn = connection(pool)?;
  let article = conn.query_row(
    &format!("SELECT {} FROM articles WHERE slug = ?", ARTICLE_FIELDS),
    params![slug],
    map_article
  ).optional()?;
  Ok(article)
}

pub fn articles_by_author(
  pool: &Pool,
  author_id: i64
) -> CoreResult<Vec<Article>> {
  select_many(
    pool,
    &format!(
      "SELECT {} FROM articles WHERE author_id = ? ORDER BY created_at DESC, id DESC",
      ARTICLE_FIELDS
    ),
    params![author_id],
    map_article
  )
}

fn validated_title(title: &str) -> CoreResult<String> {
  let title = text_utils::required_text(title)
    .ok_or_else(|| CoreError::validation("Title cannot be empty"))?;
  if text_utils::exceeds_length(&title, MAX_TITLE_LENGTH) {
    return Err(CoreError::Validation(
      format!("Title cannot be longer than {} characters", MAX_TITLE_LENGTH)
    ));
  }
  Ok(title)
}

fn unique_ids(ids: &[i64]) -> Vec<i64> {
  let mut ids = ids.to_vec();
  ids.sort_unstable();
  ids.dedup();
  ids
}

/**
 * Creates the article with its slug, categories and tags in one
 * transaction. The slug comes from the title and is never
 * touched again after this.
 * privileged decides which initial statuses are allowed, see
 * lifecycle::initial_status.
 */
pub fn create_article(
  pool: &Pool,
  new_article: &NewArticle,
  author_id: i64,
  privileged: bool,
  slug_max_retries: u32
) -> CoreResult<Article> {
  let title = validated_title(&new_article.title)?;
  let status = lifecycle::initial_status(new_article.status, privileged);
  let category_ids = unique_ids(&new_article.category_ids);
  let tag_ids = unique_ids(&new_article.tag_ids);
  let reading_time = lifecycle::reading_time(&new_article.content);
  let now = current_timestamp();
  let publish_date = if status == Status::Published { Some(now) } else { None };

  let mut conn = connection(pool)?;
  let (slug, id) = insert_with_unique_slug(
    &mut conn,
    SlugTable::Articles,
    &title,
    slug_max_retries,
    |tx, slug| {
      tx.execute(
        "INSERT INTO articles (title, slug, excerpt, content, status, publish_date, \
          created_at, last_modified, author_id, reading_time) \
          VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8, ?9)",
        params![
          title,
          slug,
          new_article.excerpt,
          new_article.content,
          status,
          publish_date,
          now,
          author_id,
          reading_time
        ]
      )?;
      let id = tx.last_insert_rowid();
      for category_id in category_ids.iter() {
        tx.execute(
          "INSERT INTO article_categories (article_id, category_id) VALUES (?1, ?2)",
          params![id, category_id]
        )?;
      }
      for tag_id in tag_ids.iter() {
        tx.execute(
          "INSERT INTO article_tags (article_id, tag_id) VALUES (?1, ?2)",
          params![id, tag_id]
        )?;
      }
      Ok(id)
    }
  )?;
  info!(target: "audit", "article_created | user: {} | Article ID: {} | slug: {} | status: {}",
    author_id, id, slug, status);
  // Committed already, no more reads that could fail past here.
  Ok(Article {
    id,
    title,
    slug,
    excerpt: new_article.excerpt.clone(),
    content: new_article.content.clone(),
    status,
    publish_date,
    created_at: now,
    last_modified: now,
    author_id,
    featured: false,
    views: 0,
    reading_time
  })
}

// Slug stays what it was, whatever happens to the title.
pub fn update_article(
  pool: &Pool,
  id: i64,
  update: &ArticleUpdate
) -> CoreResult<Article> {
  let title = match &update.title {
    Some(title) => Some(validated_title(title)?),
    None => None
  };
  let mut conn = connection(pool)?;
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let current = article_by_id_conn(&tx, id)?
    .ok_or_else(|| CoreError::not_found("Article not found"))?;
  let content = update.content.clone().unwrap_or(current.content);
  tx.execute(
    "UPDATE articles SET title = ?1, excerpt = ?2, content = ?3, reading_time = ?4, \
      last_modified = ?5 WHERE id = ?6",
    params![
      title.unwrap_or(current.title),
      update.excerpt.clone().unwrap_or(current.excerpt),
      content,
      lifecycle::reading_time(&content),
      current_timestamp(),
      id
    ]
  )?;
  let updated = article_by_id_conn(&tx, id)?
    .ok_or_else(|| CoreError::not_found("Article not found"))?;
  tx.commit()?;
  info!(target: "audit", "article_updated | Article ID: {}", id);
  Ok(updated)
}

// Reactions, bookmarks and category/tag links go away with the
// article through ON DELETE CASCADE.
pub fn delete_article(
  pool: &Pool,
  id: i64
) -> CoreResult<()> {
  let conn = connection(pool)?;
  let deleted = conn.execute("DELETE FROM articles WHERE id = ?", params![id])?;
  if deleted == 0 {
    return Err(CoreError::not_found("Article not found"));
  }
  info!(target: "audit", "article_deleted | Article ID: {}", id);
  Ok(())
}

/**
 * Applies a status action as a compare-and-set on the status we
 * read. If another request changed the status in between, the
 * update matches nothing and we start over from a fresh read,
 * which might now legitimately refuse the action.
 */
pub fn apply_status_action(
  pool: &Pool,
  id: i64,
  action: StatusAction,
  max_retries: u32
) -> CoreResult<Article> {
  let conn = connection(pool)?;
  let mut attempts: u32 = 0;
  loop {
    let current = article_by_id_conn(&conn, id)?
      .ok_or_else(|| CoreError::not_found("Article not found"))?;
    let target = action.target(current.status)?;
    let updated = conn.query_row(
      &format!(
        "UPDATE articles SET status = ?1, last_modified = ?2, \
          publish_date = CASE WHEN ?3 THEN COALESCE(publish_date, ?2) ELSE publish_date END \
          WHERE id = ?4 AND status = ?5 RETURNING {}",
        ARTICLE_FIELDS
      ),
      params![
        target,
        current_timestamp(),
        action.stamps_publish_date(),
        id,
        current.status
      ],
      map_article
    ).optional()?;
    match updated {
      Some(article) => {
        info!(target: "audit", "article_{} | Article ID: {} | {} -> {}",
          action, id, current.status, article.status);
        return Ok(article);
      },
      None => {
        attempts += 1;
        if attempts > max_retries {
          return Err(CoreError::Conflict(
            format!("Status of article {} keeps changing, giving up on {}", id, action)
          ));
        }
        debug!("Status of article {} changed during {}, reading it again", id, action);
      }
    }
  }
}

// Every id gets its own transition, one article refusing the
// action doesn't stop the others.
pub fn apply_status_action_bulk(
  pool: &Pool,
  ids: &[i64],
  action: StatusAction,
  max_retries: u32
) -> Vec<BulkOutcome> {
  unique_ids(ids).into_iter()
    .map(|id| BulkOutcome {
      id,
      result: apply_status_action(pool, id, action, max_retries)
        .map(|article| article.status)
    })
    .collect()
}

// Flips the flag in the database itself, two admins clicking at
// the same time end up where they started.
pub fn toggle_featured(
  pool: &Pool,
  id: i64
) -> CoreResult<bool> {
  let conn = connection(pool)?;
  let featured: Option<bool> = conn.query_row(
    "UPDATE articles SET featured = NOT featured, last_modified = ?2 \
      WHERE id = ?1 RETURNING featured",
    params![id, current_timestamp()],
    |row| row.get(0)
  ).optional()?;
  let featured = featured.ok_or_else(|| CoreError::not_found("Article not found"))?;
  info!(target: "audit", "article_{} | Article ID: {}",
    if featured { "featured" } else { "unfeatured" }, id);
  Ok(featured)
}

/**
 * views = views + 1 in a single statement, never a value we read
 * earlier. The WHERE clause holds the counting rule (published,
 * viewer isn't the author), if it doesn't match we still look
 * the article up to tell "not counted" apart from "not found".
 */
pub fn record_view(
  pool: &Pool,
  id: i64,
  viewer_id: Option<i64>
) -> CoreResult<ViewOutcome> {
  let conn = connection(pool)?;
  let views: Option<i64> = conn.query_row(
    "UPDATE articles SET views = views + 1 \
      WHERE id = ?1 AND status = ?2 AND (?3 IS NULL OR author_id != ?3) \
      RETURNING views",
    params![id, Status::Published, viewer_id],
    |row| row.get(0)
  ).optional()?;
  match views {
    Some(views) => Ok(ViewOutcome { counted: true, views }),
    None => {
      let views: Option<i64> = conn.query_row(
        "SELECT views FROM articles WHERE id = ?",
        params![id],
        |row| row.get(0)
      ).optional()?;
      views
        .map(|views| ViewOutcome { counted: false, views })
        .ok_or_else(|| CoreError::not_found("Article not found"))
    }
  }
}
