use std::env;
use color_eyre::Result;
use eyre::{eyre, WrapErr};
use dotenv::dotenv;
use log::{error, info};
use getopts::Options;
use blog_content_core::config::Config;
use blog_content_core::content::lifecycle::StatusAction;
use blog_content_core::content::rate_limit::BucketStore;
use blog_content_core::db::{self, articles, Pool, SqliteBucketStore};
use blog_content_core::utils::time_utils::current_timestamp;

// Copy pasted this from getopts doc.
fn print_usage(program: &str, opts: Options) {
  let brief = format!("Usage: {} [options]", program);
  print!("{}", opts.usage(&brief));
}

// "1,2, 3" -> [1, 2, 3]
fn parse_ids(value: &str) -> Result<Vec<i64>> {
  value.split(',')
    .map(|id| id.trim())
    .filter(|id| !id.is_empty())
    .map(|id| id.parse::<i64>().wrap_err_with(|| format!("Invalid article id: {}", id)))
    .collect()
}

fn run_bulk(pool: &Pool, ids: &[i64], action: StatusAction, max_retries: u32) -> Result<()> {
  if ids.is_empty() {
    return Err(eyre!("No article id provided for {}", action));
  }
  let mut failures = 0;
  for outcome in articles::apply_status_action_bulk(pool, ids, action, max_retries) {
    match outcome.result {
      Ok(status) => info!("Article {} is now {}", outcome.id, status),
      Err(e) => {
        failures += 1;
        error!("Could not {} article {} - {}", action, outcome.id, e);
      }
    }
  }
  if failures > 0 {
    return Err(eyre!("{} of {} articles could not be updated", failures, ids.len()));
  }
  Ok(())
}

/**
 * Administration tasks that don't go through the HTTP API:
 * schema creation, archiving (the only way to reach archived
 * outside of the admin routes), moderation in bulk and rate
 * limit housekeeping.
 */
fn main() -> Result<()> {
  color_eyre::install()?;
  dotenv().ok();
  if env::var("RUST_LOG").is_err() {
    env::set_var("RUST_LOG", "info");
  }
  env_logger::init();

  let args: Vec<String> = env::args().collect();
  let program = args[0].clone();
  let mut opts = Options::new();
  opts.optflag("i", "init-schema", "Create the database tables if they don't exist");
  opts.optopt("a", "archive", "Archive an article", "ID");
  opts.optopt("p", "approve", "Approve pending articles", "ID[,ID...]");
  opts.optopt("r", "reject", "Reject articles", "ID[,ID...]");
  opts.optflag("", "purge-rate-limits", "Delete expired rate limit buckets");
  opts.optflag("h", "help", "Program usage");
  let opt_matches = opts.parse(&args[1..])?;
  if opt_matches.opt_present("h") {
    print_usage(&program, opts);
    return Ok(());
  }

  let config = Config::from_env()?;
  let pool = db::open_pool(&config)?;
  let mut did_something = false;

  if opt_matches.opt_present("i") {
    db::init_schema(&pool).context("Creating the database schema")?;
    info!("Schema is ready in {}", config.db_path);
    did_something = true;
  }

  if let Some(id) = opt_matches.opt_str("a") {
    let id: i64 = id.trim().parse()
      .wrap_err_with(|| format!("Invalid article id: {}", id))?;
    let article = articles::apply_status_action(
      &pool,
      id,
      StatusAction::Archive,
      config.conflict_max_retries
    ).context("Archiving article")?;
    info!("Archived article {} ({})", article.id, article.slug);
    did_something = true;
  }

  if let Some(ids) = opt_matches.opt_str("p") {
    run_bulk(&pool, &parse_ids(&ids)?, StatusAction::Approve, config.conflict_max_retries)?;
    did_something = true;
  }

  if let Some(ids) = opt_matches.opt_str("r") {
    run_bulk(&pool, &parse_ids(&ids)?, StatusAction::Reject, config.conflict_max_retries)?;
    did_something = true;
  }

  if opt_matches.opt_present("purge-rate-limits") {
    let purged = SqliteBucketStore::new(pool.clone())
      .purge_expired(current_timestamp())
      .context("Purging rate limit buckets")?;
    info!("Purged {} expired rate limit buckets", purged);
    did_something = true;
  }

  if !did_something {
    print_usage(&program, opts);
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ids_are_split_on_commas() {
    assert_eq!(vec![1, 2, 3], parse_ids("1,2, 3").unwrap());
    assert_eq!(vec![7], parse_ids("7,").unwrap());
    assert!(parse_ids("1,two").is_err());
  }
}
