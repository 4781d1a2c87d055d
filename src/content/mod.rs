/*
 * The content module groups the parts of the backend where
 * concurrent requests can actually step on each other: slugs,
 * rate limiting, reactions and the article lifecycle.
 * Everything in here is storage agnostic, the SQLite side of
 * things lives in the db module.
 */

pub mod error;
pub mod slugs;
pub mod rate_limit;
pub mod reactions;
pub mod lifecycle;

pub use error::{CoreError, CoreResult};
