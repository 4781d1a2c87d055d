// Adding the context method to errors:
use eyre::WrapErr;
use color_eyre::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
  pub db_path: String,
  pub bind_address: String,
  // Connection pool and SQLite lock waiting. Running out of
  // either is reported as a transient failure.
  pub pool_size: u32,
  pub pool_timeout_secs: u64,
  pub busy_timeout_ms: u64,
  // Retry bounds for the slug allocation loop and for
  // reaction/status races.
  pub slug_max_retries: u32,
  pub conflict_max_retries: u32,
  // Rate limiter settings, "<count>/<period>" strings:
  pub rl_default_rate: String,
  pub rl_write_rate: String,
  pub rl_reaction_rate: String
}

impl Config {

  pub fn from_env() -> Result<Config> {
    // The leading :: is there because this module is also
    // called config.
    // RUST_LOG is already set in main.rs if it was absent.
    // You have to use lowercase when compared to what's in
    // the .env file.
    let c = ::config::Config::builder()
      .set_default("bind_address", "127.0.0.1:8080")?
      .set_default("pool_size", 8)?
      .set_default("pool_timeout_secs", 5)?
      .set_default("busy_timeout_ms", 3000)?
      .set_default("slug_max_retries", 10)?
      .set_default("conflict_max_retries", 5)?
      .set_default("rl_default_rate", "100/h")?
      .set_default("rl_write_rate", "20/m")?
      .set_default("rl_reaction_rate", "60/m")?
      .add_source(::config::Environment::default())
      .build()
      .context("Reading configuration sources")?;
    // The error has to be given a context for
    // color_eyre to work here:
    c.try_deserialize()
      .context("Loading configuration from env")
  }

  // Same defaults as from_env, for the tests where only the
  // database matters.
  pub fn for_database(db_path: &str) -> Config {
    Config {
      db_path: db_path.to_string(),
      bind_address: "127.0.0.1:8080".to_string(),
      pool_size: 8,
      pool_timeout_secs: 5,
      busy_timeout_ms: 3000,
      slug_max_retries: 10,
      conflict_max_retries: 5,
      rl_default_rate: "100/h".to_string(),
      rl_write_rate: "20/m".to_string(),
      rl_reaction_rate: "60/m".to_string()
    }
  }

}
