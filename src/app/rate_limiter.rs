use actix_web::HttpRequest;
use log::debug;
use crate::config::Config;
use crate::content::CoreResult;
use crate::content::rate_limit::{bucket_key, RateSpec};
use super::error::Error;
use super::helpers::{self, Identity};
use super::AppState;

/**
 * The rates protected endpoints are throttled with, parsed
 * once at startup. A typo in one of them should stop the
 * server from starting, not show up on the first request.
 */
#[derive(Debug, Clone, Copy)]
pub struct Throttles {
  pub default: RateSpec,
  pub write: RateSpec,
  pub reaction: RateSpec
}

impl Throttles {
  pub fn from_config(config: &Config) -> CoreResult<Self> {
    Ok(Self {
      default: config.rl_default_rate.parse()?,
      write: config.rl_write_rate.parse()?,
      reaction: config.rl_reaction_rate.parse()?
    })
  }
}

// Call first thing in the handler, before any actual work.
pub fn throttle(
  app_state: &AppState,
  req: &HttpRequest,
  identity: &Identity,
  resource: &str,
  rate: RateSpec
) -> Result<(), Error> {
  let key = bucket_key(resource, &helpers::rate_limit_subject(identity, req));
  let remaining = app_state.rate_limiter.hit(&key, rate)?.into_result()?;
  debug!("Rate limit for {}: {} left", key, remaining);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_rates_parse() {
    let throttles = Throttles::from_config(&Config::for_database(":memory:")).unwrap();
    assert_eq!(RateSpec { limit: 100, window_secs: 3600 }, throttles.default);
    assert_eq!(RateSpec { limit: 20, window_secs: 60 }, throttles.write);
    assert_eq!(RateSpec { limit: 60, window_secs: 60 }, throttles.reaction);
  }

  #[test]
  fn broken_rate_is_refused() {
    let mut config = Config::for_database(":memory:");
    config.rl_write_rate = "lots".to_string();
    assert!(Throttles::from_config(&config).is_err());
  }
}
