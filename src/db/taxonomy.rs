use rusqlite::{params, OptionalExtension};
use log::info;
use crate::content::{CoreError, CoreResult};
use crate::utils::text_utils;
use super::entities::*;
use super::helpers::{connection, insert_with_unique_slug, SlugTable};
use super::mappers::{map_category, map_tag, CATEGORY_FIELDS, TAG_FIELDS};
use super::{select_many, Pool};

const MAX_NAME_LENGTH: usize = 100;

fn validated_name(name: &str) -> CoreResult<String> {
  let name = text_utils::required_text(name)
    .ok_or_else(|| CoreError::validation("Name cannot be empty"))?;
  if text_utils::exceeds_length(&name, MAX_NAME_LENGTH) {
    return Err(CoreError::Validation(
      format!("Name cannot be longer than {} characters", MAX_NAME_LENGTH)
    ));
  }
  Ok(name)
}

/**
 * A missing parent shows up as a foreign key violation on
 * insert, which we report as not found. Blank image URLs are
 * the same as no image.
 */
pub fn create_category(
  pool: &Pool,
  new_category: &NewCategory,
  slug_max_retries: u32
) -> CoreResult<Category> {
  let name = validated_name(&new_category.name)?;
  let featured_image = new_category.featured_image.as_ref()
    .and_then(|url| text_utils::required_text(url));
  if let Some(url) = &featured_image {
    if !text_utils::is_valid_image_url(url) {
      return Err(CoreError::validation(
        "Featured image must be a .jpg, .jpeg, .png or .gif URL"
      ));
    }
  }
  let mut conn = connection(pool)?;
  let (slug, id) = insert_with_unique_slug(
    &mut conn,
    SlugTable::Categories,
    &name,
    slug_max_retries,
    |tx, slug| {
      tx.execute(
        "INSERT INTO categories (name, slug, description, featured_image, parent_id) \
          VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
          name,
          slug,
          new_category.description,
          featured_image,
          new_category.parent_id
        ]
      )?;
      Ok(tx.last_insert_rowid())
    }
  )?;
  info!(target: "audit", "category_created | Category ID: {} | slug: {}", id, slug);
  Ok(Category {
    id,
    name,
    slug,
    description: new_category.description.clone(),
    featured_image,
    parent_id: new_category.parent_id
  })
}

pub fn create_tag(
  pool: &Pool,
  name: &str,
  slug_max_retries: u32
) -> CoreResult<Tag> {
  let name = validated_name(name)?;
  let mut conn = connection(pool)?;
  let (slug, id) = insert_with_unique_slug(
    &mut conn,
    SlugTable::Tags,
    &name,
    slug_max_retries,
    |tx, slug| {
      tx.execute(
        "INSERT INTO tags (name, slug) VALUES (?1, ?2)",
        params![name, slug]
      )?;
      Ok(tx.last_insert_rowid())
    }
  )?;
  info!(target: "audit", "tag_created | Tag ID: {} | slug: {}", id, slug);
  Ok(Tag { id, name, slug })
}

pub fn category_by_slug(
  pool: &Pool,
  slug: &str
) -> CoreResult<Option<Category>> {
  let conn = connection(pool)?;
  let category = conn.query_row(
    &format!("SELECT {} FROM categories WHERE slug = ?", CATEGORY_FIELDS),
    params![slug],
    map_category
  ).optional()?;
  Ok(category)
}

pub fn tag_by_slug(
  pool: &Pool,
  slug: &str
) -> CoreResult<Option<Tag>> {
  let conn = connection(pool)?;
  let tag = conn.query_row(
    &format!("SELECT {} FROM tags WHERE slug = ?", TAG_FIELDS),
    params![slug],
    map_tag
  ).optional()?;
  Ok(tag)
}

pub fn categories_for_article(
  pool: &Pool,
  article_id: i64
) -> CoreResult<Vec<Category>> {
  select_many(
    pool,
    "SELECT c.id, c.name, c.slug, c.description, c.featured_image, c.parent_id \
      FROM categories c, article_categories ac \
      WHERE ac.category_id = c.id AND ac.article_id = ? ORDER BY c.name",
    params![article_id],
    map_category
  )
}

pub fn tags_for_article(
  pool: &Pool,
  article_id: i64
) -> CoreResult<Vec<Tag>> {
  select_many(
    pool,
    "SELECT t.id, t.name, t.slug FROM tags t, article_tags art \
      WHERE art.tag_id = t.id AND art.article_id = ? ORDER BY t.name",
    params![article_id],
    map_tag
  )
}
