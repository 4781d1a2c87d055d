use deunicode::deunicode;
use lazy_static::lazy_static;
use log::{debug, info};
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use super::error::{CoreError, CoreResult};

// Used when a title has nothing we can transliterate
// (only emoji-less symbols, punctuation, empty...).
const FALLBACK_PREFIX: &'static str = "item";
const FALLBACK_TOKEN_LENGTH: usize = 8;

/**
 * Anything that can hold slugs behind a uniqueness constraint.
 * The probe is only an optimization, the insert is the actual
 * source of truth and has to fail with CoreError::Conflict
 * when the slug is already taken.
 */
pub trait SlugStore {
  type Inserted;

  fn slug_taken(&mut self, slug: &str) -> CoreResult<bool>;

  fn insert_with_slug(&mut self, slug: &str) -> CoreResult<Self::Inserted>;
}

pub fn slugify(text: &str) -> String {
  lazy_static! {
    static ref STRIP_REGEX: Regex = Regex::new(r"[^\w\s-]").unwrap();
    static ref SEPARATOR_REGEX: Regex = Regex::new(r"[-\s]+").unwrap();
  }
  // deunicode gives us plain ASCII, so \w can't sneak
  // non-latin letters back in after this.
  let ascii = deunicode(text).to_lowercase();
  let stripped = STRIP_REGEX.replace_all(&ascii, "");
  SEPARATOR_REGEX.replace_all(stripped.trim(), "-")
    .trim_matches(|c: char| c == '-' || c == '_')
    .to_string()
}

pub fn fallback_slug() -> String {
  let token: String = rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(FALLBACK_TOKEN_LENGTH)
    .map(char::from)
    .collect();
  format!("{}-{}", FALLBACK_PREFIX, token.to_lowercase())
}

// Slugs are pure ASCII at this point so cutting at a byte
// index is safe.
fn truncate_slug(slug: String, max_length: usize) -> String {
  if slug.len() <= max_length {
    return slug;
  }
  slug[..max_length].trim_end_matches('-').to_string()
}

pub fn candidate(base: &str, suffix: u32) -> String {
  match suffix {
    0 => base.to_string(),
    n => format!("{}-{}", base, n)
  }
}

pub struct SlugAllocator {
  max_length: usize,
  max_retries: u32
}

impl SlugAllocator {

  pub fn new(max_length: usize, max_retries: u32) -> Self {
    Self {
      max_length,
      max_retries
    }
  }

  pub fn base_slug(&self, text: &str) -> String {
    let slug = truncate_slug(slugify(text), self.max_length);
    if slug.is_empty() {
      fallback_slug()
    } else {
      slug
    }
  }

  // Generate candidate, try to insert, bump the suffix when
  // someone else got there first. The probe saves us most
  // of the failed inserts but two concurrent creations with
  // the same title can both see a free slug, one of them
  // will get the constraint violation and keep looping.
  pub fn allocate<S: SlugStore>(
    &self,
    store: &mut S,
    text: &str
  ) -> CoreResult<(String, S::Inserted)> {
    let base = self.base_slug(text);
    let mut suffix: u32 = 0;
    let mut conflicts: u32 = 0;
    loop {
      let slug = candidate(&base, suffix);
      if store.slug_taken(&slug)? {
        suffix += 1;
        continue;
      }
      match store.insert_with_slug(&slug) {
        Ok(inserted) => return Ok((slug, inserted)),
        Err(CoreError::Conflict(msg)) => {
          conflicts += 1;
          info!(target: "audit", "slug_collision | slug: {} | attempt: {}", slug, conflicts);
          debug!("Slug insert conflict for {}: {}", slug, msg);
          if conflicts > self.max_retries {
            return Err(CoreError::Conflict(format!(
              "Could not allocate a unique slug for '{}' after {} collisions",
              base, conflicts
            )));
          }
          suffix += 1;
        },
        Err(e) => return Err(e)
      }
    }
  }

}
