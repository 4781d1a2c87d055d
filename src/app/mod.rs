use actix_web::{middleware, web, App, HttpServer};
use color_eyre::Result;
use eyre::WrapErr;
use log::{debug, info};
// I think we have to add crate here because
// of the other crate named "config" that we
// use as a dependency.
use crate::config::Config;
use crate::content::CoreResult;
use crate::content::rate_limit::RateLimiter;
use crate::db::{self, Pool, SqliteBucketStore};
use error::Error;
use rate_limiter::Throttles;
mod handlers;
mod dtos;
mod error;
mod helpers;
mod rate_limiter;

// Declare app state struct:
pub struct AppState {
  pub pool: Pool,
  // Buckets live in the database so every worker (and every
  // process using the same file) shares them.
  pub rate_limiter: RateLimiter<SqliteBucketStore>,
  pub throttles: Throttles,
  pub slug_max_retries: u32,
  pub conflict_max_retries: u32
}

impl AppState {

  pub fn new(pool: Pool, config: &Config) -> CoreResult<Self> {
    Ok(Self {
      rate_limiter: RateLimiter::new(SqliteBucketStore::new(pool.clone())),
      throttles: Throttles::from_config(config)?,
      slug_max_retries: config.slug_max_retries,
      conflict_max_retries: config.conflict_max_retries,
      pool
    })
  }

}

// Function to start the server, main.rs runs it in the actix
// runtime.
pub async fn run() -> Result<()> {
  let config = Config::from_env()?;
  debug!("Current config: {:?}", config);
  let pool = db::open_pool(&config)?;
  db::init_schema(&pool)
    .context("Creating the database schema")?;

  let bind_address = config.bind_address.clone();
  let app_state = web::Data::new(
    AppState::new(pool, &config)
      .context("Invalid rate limit configuration")?
  );

  info!("Listening on {}", bind_address);
  HttpServer::new(move|| {
    App::new()
      .app_data(app_state.clone())
      // Our own error type so these come out as JSON too:
      .app_data(web::PathConfig::default().error_handler(|_, _| {
        Error::BadRequest("Invalid path arguments".to_string()).into()
      }))
      .app_data(web::JsonConfig::default().error_handler(|e, _| {
        Error::BadRequest(format!("Invalid request body - {}", e)).into()
      }))
      .wrap(middleware::Logger::default())
      .configure(base_endpoints_config)
      .default_service(web::route().to(handlers::not_found))
  })
  .bind(bind_address)?
  .run()
  .await
  .context("Start Actix web server")
}

// Route configuration:
pub(crate) fn base_endpoints_config(cfg: &mut web::ServiceConfig) {
  cfg.route("/health", web::get().to(handlers::health))
    .route("/articles", web::post().to(handlers::create_article))
    .route("/articles/{slug}", web::get().to(handlers::article))
    .route("/articles/{slug}", web::put().to(handlers::update_article))
    .route("/articles/{slug}", web::delete().to(handlers::delete_article))
    .route("/articles/{slug}/publish", web::post().to(handlers::publish_article))
    .route("/articles/{slug}/unpublish", web::post().to(handlers::unpublish_article))
    .route("/articles/{slug}/like", web::post().to(handlers::react))
    .route("/articles/{slug}/bookmark", web::post().to(handlers::bookmark))
    .route("/articles/{id}/views", web::post().to(handlers::record_view))
    .route("/me/bookmarks", web::get().to(handlers::my_bookmarks))
    .route("/me/likes", web::get().to(handlers::my_likes))
    .route("/me/dislikes", web::get().to(handlers::my_dislikes))
    .route("/categories", web::post().to(handlers::create_category))
    .route("/tags", web::post().to(handlers::create_tag))
    .route("/admin/articles/bulk-action", web::post().to(handlers::bulk_moderate))
    .route("/admin/articles/{id}/action", web::post().to(handlers::moderate_article))
    .route("/admin/articles/{id}/feature", web::post().to(handlers::toggle_featured))
    .route("/admin/articles/{id}/archive", web::post().to(handlers::archive_article));
}
