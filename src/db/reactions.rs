use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use log::info;
use crate::content::{CoreError, CoreResult};
use crate::content::lifecycle::Status;
use crate::content::reactions::*;
use crate::utils::time_utils::current_timestamp;
use super::entities::Article;
use super::helpers::{connection, retry_on_conflict};
use super::mappers::map_article;
use super::{select_many, Pool};

// Reactions and bookmarks only exist on published articles,
// anything else looks like it doesn't exist.
fn ensure_published(conn: &Connection, article_id: i64) -> CoreResult<()> {
  let status: Option<Status> = conn.query_row(
    "SELECT status FROM articles WHERE id = ?",
    params![article_id],
    |row| row.get(0)
  ).optional()?;
  match status {
    Some(Status::Published) => Ok(()),
    _ => Err(CoreError::not_found("Article not found"))
  }
}

fn current_reaction(
  conn: &Connection,
  user_id: i64,
  article_id: i64
) -> CoreResult<ReactionState> {
  let is_like: Option<bool> = conn.query_row(
    "SELECT is_like FROM article_reactions WHERE user_id = ?1 AND article_id = ?2",
    params![user_id, article_id],
    |row| row.get(0)
  ).optional()?;
  Ok(is_like.map(ReactionKind::from_is_like).into())
}

// Counted from the rows, there's no denormalized counter that
// could drift away from them.
fn counts(conn: &Connection, article_id: i64) -> CoreResult<ReactionCounts> {
  let counts = conn.query_row(
    "SELECT COALESCE(SUM(is_like = 1), 0), COALESCE(SUM(is_like = 0), 0) \
      FROM article_reactions WHERE article_id = ?",
    params![article_id],
    |row| Ok(ReactionCounts {
      like_count: row.get(0)?,
      dislike_count: row.get(1)?
    })
  )?;
  Ok(counts)
}

fn apply_change(
  conn: &Connection,
  user_id: i64,
  article_id: i64,
  change: RowChange
) -> CoreResult<()> {
  let affected = match change {
    RowChange::Insert(kind) => conn.execute(
      "INSERT INTO article_reactions (user_id, article_id, is_like, created_at) \
        VALUES (?1, ?2, ?3, ?4)",
      params![user_id, article_id, kind.is_like(), current_timestamp()]
    )?,
    RowChange::Delete => conn.execute(
      "DELETE FROM article_reactions WHERE user_id = ?1 AND article_id = ?2",
      params![user_id, article_id]
    )?,
    RowChange::Update(kind) => conn.execute(
      "UPDATE article_reactions SET is_like = ?3 WHERE user_id = ?1 AND article_id = ?2",
      params![user_id, article_id, kind.is_like()]
    )?
  };
  // The row we read isn't there anymore, somebody else got in
  // between. Treated like a unique violation so the caller
  // reads again.
  if affected == 0 {
    return Err(CoreError::conflict("Reaction changed while being updated"));
  }
  Ok(())
}

/**
 * Like/dislike toggle for one user on one article. The read
 * and the write happen in the same IMMEDIATE transaction, on
 * top of that the unique (user, article) index catches double
 * inserts and we just start over when it does.
 */
pub fn react(
  pool: &Pool,
  user_id: i64,
  article_id: i64,
  kind: ReactionKind,
  max_retries: u32
) -> CoreResult<ReactionOutcome> {
  let mut conn = connection(pool)?;
  let outcome = retry_on_conflict(max_retries, "reaction toggle", || {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    ensure_published(&tx, article_id)?;
    let current = current_reaction(&tx, user_id, article_id)?;
    let t = transition(current, kind);
    apply_change(&tx, user_id, article_id, t.change)?;
    let counts = counts(&tx, article_id)?;
    tx.commit()?;
    Ok(ReactionOutcome {
      signal: t.signal,
      state: t.next,
      counts
    })
  })?;
  info!(target: "audit", "{} | user: {} | Article ID: {} | {}",
    outcome.signal, user_id, article_id, kind);
  Ok(outcome)
}

pub fn toggle_bookmark(
  pool: &Pool,
  user_id: i64,
  article_id: i64,
  max_retries: u32
) -> CoreResult<BookmarkSignal> {
  let mut conn = connection(pool)?;
  let signal = retry_on_conflict(max_retries, "bookmark toggle", || {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    ensure_published(&tx, article_id)?;
    // Deleting first tells us if it was there.
    let removed = tx.execute(
      "DELETE FROM bookmarked_articles WHERE user_id = ?1 AND article_id = ?2",
      params![user_id, article_id]
    )?;
    let signal = if removed > 0 {
      BookmarkSignal::Removed
    } else {
      tx.execute(
        "INSERT INTO bookmarked_articles (user_id, article_id, created_at) \
          VALUES (?1, ?2, ?3)",
        params![user_id, article_id, current_timestamp()]
      )?;
      BookmarkSignal::Added
    };
    tx.commit()?;
    Ok(signal)
  })?;
  info!(target: "audit", "{} | user: {} | Article ID: {}", signal, user_id, article_id);
  Ok(signal)
}

pub fn user_reaction(
  pool: &Pool,
  user_id: i64,
  article_id: i64
) -> CoreResult<Option<ReactionKind>> {
  let conn = connection(pool)?;
  Ok(current_reaction(&conn, user_id, article_id)?.kind())
}

pub fn is_bookmarked(
  pool: &Pool,
  user_id: i64,
  article_id: i64
) -> CoreResult<bool> {
  let conn = connection(pool)?;
  let found: Option<i64> = conn.query_row(
    "SELECT 1 FROM bookmarked_articles WHERE user_id = ?1 AND article_id = ?2",
    params![user_id, article_id],
    |row| row.get(0)
  ).optional()?;
  Ok(found.is_some())
}

pub fn reaction_counts(
  pool: &Pool,
  article_id: i64
) -> CoreResult<ReactionCounts> {
  let conn = connection(pool)?;
  counts(&conn, article_id)
}

// Articles that stopped being published stay out of the
// lists but keep their rows, in case they come back.
pub fn list_bookmarked(
  pool: &Pool,
  user_id: i64
) -> CoreResult<Vec<Article>> {
  select_many(
    pool,
    "SELECT a.id, a.title, a.slug, a.excerpt, a.content, a.status, a.publish_date, \
      a.created_at, a.last_modified, a.author_id, a.featured, a.views, a.reading_time \
      FROM articles a, bookmarked_articles b \
      WHERE b.article_id = a.id AND b.user_id = ?1 AND a.status = ?2 \
      ORDER BY b.created_at DESC, b.id DESC",
    params![user_id, Status::Published],
    map_article
  )
}

pub fn list_reacted(
  pool: &Pool,
  user_id: i64,
  kind: ReactionKind
) -> CoreResult<Vec<Article>> {
  select_many(
    pool,
    "SELECT a.id, a.title, a.slug, a.excerpt, a.content, a.status, a.publish_date, \
      a.created_at, a.last_modified, a.author_id, a.featured, a.views, a.reading_time \
      FROM articles a, article_reactions r \
      WHERE r.article_id = a.id AND r.user_id = ?1 AND r.is_like = ?2 AND a.status = ?3 \
      ORDER BY r.created_at DESC, r.id DESC",
    params![user_id, kind.is_like(), Status::Published],
    map_article
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::content::lifecycle::StatusAction;
  use crate::db::articles;
  use crate::db::entities::NewArticle;
  use crate::db::test_support::test_db;
  use std::thread;

  fn published(pool: &Pool, title: &str) -> Article {
    articles::create_article(pool, &NewArticle {
      title: title.to_string(),
      status: Some(Status::Published),
      ..Default::default()
    }, 1, true, 10).unwrap()
  }

  fn rows_for(pool: &Pool, article_id: i64) -> i64 {
    let conn = connection(pool).unwrap();
    conn.query_row(
      "SELECT count(*) FROM article_reactions WHERE article_id = ?",
      params![article_id],
      |row| row.get(0)
    ).unwrap()
  }

  #[test]
  fn like_twice_goes_back_to_nothing() {
    let db = test_db();
    let article = published(&db.pool, "Likeable");
    let first = react(&db.pool, 2, article.id, ReactionKind::Like, 3).unwrap();
    assert_eq!(ReactionSignal::Added, first.signal);
    assert_eq!(ReactionState::Liked, first.state);
    assert_eq!(ReactionCounts { like_count: 1, dislike_count: 0 }, first.counts);
    let second = react(&db.pool, 2, article.id, ReactionKind::Like, 3).unwrap();
    assert_eq!(ReactionSignal::Removed, second.signal);
    assert_eq!(ReactionState::None, second.state);
    assert_eq!(ReactionCounts::default(), second.counts);
    assert_eq!(None, user_reaction(&db.pool, 2, article.id).unwrap());
  }

  #[test]
  fn like_then_dislike_keeps_a_single_row() {
    let db = test_db();
    let article = published(&db.pool, "Divisive");
    react(&db.pool, 2, article.id, ReactionKind::Like, 3).unwrap();
    let changed = react(&db.pool, 2, article.id, ReactionKind::Dislike, 3).unwrap();
    assert_eq!(ReactionSignal::Changed, changed.signal);
    assert_eq!(ReactionCounts { like_count: 0, dislike_count: 1 }, changed.counts);
    assert_eq!(1, rows_for(&db.pool, article.id));
    assert_eq!(Some(ReactionKind::Dislike), user_reaction(&db.pool, 2, article.id).unwrap());
  }

  #[test]
  fn counts_always_match_the_rows() {
    let db = test_db();
    let article = published(&db.pool, "Crowded");
    for user in 1..=6 {
      let kind = if user % 3 == 0 { ReactionKind::Dislike } else { ReactionKind::Like };
      react(&db.pool, user, article.id, kind, 3).unwrap();
    }
    let counts = reaction_counts(&db.pool, article.id).unwrap();
    assert_eq!(ReactionCounts { like_count: 4, dislike_count: 2 }, counts);
    assert_eq!(rows_for(&db.pool, article.id), counts.like_count + counts.dislike_count);
  }

  #[test]
  fn concurrent_toggles_from_one_user_never_duplicate() {
    let db = test_db();
    let article = published(&db.pool, "Hammered");
    let handles: Vec<_> = (0..4).map(|_| {
      let pool = db.pool.clone();
      let id = article.id;
      thread::spawn(move || {
        for _ in 0..5 {
          react(&pool, 9, id, ReactionKind::Like, 5).unwrap();
        }
      })
    }).collect();
    for h in handles {
      h.join().unwrap();
    }
    // 20 toggles in total, an even number ends with no reaction:
    assert_eq!(0, rows_for(&db.pool, article.id));
    assert_eq!(ReactionCounts::default(), reaction_counts(&db.pool, article.id).unwrap());
  }

  #[test]
  fn reacting_to_unpublished_article_is_not_found() {
    let db = test_db();
    let article = published(&db.pool, "Retired");
    articles::apply_status_action(&db.pool, article.id, StatusAction::Unpublish, 3).unwrap();
    let result = react(&db.pool, 2, article.id, ReactionKind::Like, 3);
    assert!(matches!(result, Err(CoreError::NotFound(_))));
    let result = toggle_bookmark(&db.pool, 2, 999, 3);
    assert!(matches!(result, Err(CoreError::NotFound(_))));
  }

  #[test]
  fn bookmark_toggles() {
    let db = test_db();
    let article = published(&db.pool, "Keeper");
    assert_eq!(BookmarkSignal::Added, toggle_bookmark(&db.pool, 3, article.id, 3).unwrap());
    assert!(is_bookmarked(&db.pool, 3, article.id).unwrap());
    assert!(!is_bookmarked(&db.pool, 4, article.id).unwrap());
    assert_eq!(BookmarkSignal::Removed, toggle_bookmark(&db.pool, 3, article.id, 3).unwrap());
    assert!(!is_bookmarked(&db.pool, 3, article.id).unwrap());
  }

  #[test]
  fn lists_only_show_what_the_user_did() {
    let db = test_db();
    let liked = published(&db.pool, "Liked one");
    let disliked = published(&db.pool, "Disliked one");
    react(&db.pool, 5, liked.id, ReactionKind::Like, 3).unwrap();
    react(&db.pool, 5, disliked.id, ReactionKind::Dislike, 3).unwrap();
    react(&db.pool, 6, disliked.id, ReactionKind::Like, 3).unwrap();
    toggle_bookmark(&db.pool, 5, disliked.id, 3).unwrap();

    let likes = list_reacted(&db.pool, 5, ReactionKind::Like).unwrap();
    assert_eq!(vec![liked.id], likes.iter().map(|a| a.id).collect::<Vec<i64>>());
    let dislikes = list_reacted(&db.pool, 5, ReactionKind::Dislike).unwrap();
    assert_eq!(vec![disliked.id], dislikes.iter().map(|a| a.id).collect::<Vec<i64>>());
    let bookmarks = list_bookmarked(&db.pool, 5).unwrap();
    assert_eq!(1, bookmarks.len());
    assert_eq!("disliked-one", bookmarks[0].slug);
    assert!(list_bookmarked(&db.pool, 6).unwrap().is_empty());
  }
}
