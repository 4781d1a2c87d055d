use super::entities::*;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Row, Error};
use crate::content::CoreError;
use crate::content::lifecycle::Status;

// Column order for every query going through map_article.
pub const ARTICLE_FIELDS: &'static str = "id, title, slug, excerpt, content, status, \
  publish_date, created_at, last_modified, author_id, featured, views, reading_time";

pub const CATEGORY_FIELDS: &'static str = "id, name, slug, description, featured_image, parent_id";

pub const TAG_FIELDS: &'static str = "id, name, slug";

// Status goes in the database as its lowercase name.
impl ToSql for Status {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(ToSqlOutput::from(self.as_str()))
  }
}

impl FromSql for Status {
  fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
    value.as_str()?
      .parse()
      .map_err(|e: CoreError| FromSqlError::Other(Box::new(e)))
  }
}

pub fn map_article(row: &Row) -> Result<Article, Error> {
  Ok(Article {
    id: row.get(0)?,
    title: row.get(1)?,
    slug: row.get(2)?,
    excerpt: row.get(3)?,
    content: row.get(4)?,
    status: row.get(5)?,
    publish_date: row.get(6)?,
    created_at: row.get(7)?,
    last_modified: row.get(8)?,
    author_id: row.get(9)?,
    featured: row.get(10)?,
    views: row.get(11)?,
    reading_time: row.get(12)?
  })
}

pub fn map_category(row: &Row) -> Result<Category, Error> {
  Ok(Category {
    id: row.get(0)?,
    name: row.get(1)?,
    slug: row.get(2)?,
    description: row.get(3)?,
    featured_image: row.get(4)?,
    parent_id: row.get(5)?
  })
}

pub fn map_tag(row: &Row) -> Result<Tag, Error> {
  Ok(Tag {
    id: row.get(0)?,
    name: row.get(1)?,
    slug: row.get(2)?
  })
}
