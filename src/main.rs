use color_eyre::Result;
use dotenv::dotenv;
use std::env;
use blog_content_core::app;

#[actix_web::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  dotenv().ok();
  // Default to info logging when RUST_LOG isn't set, the
  // audit records are logged at that level.
  if env::var("RUST_LOG").is_err() {
    env::set_var("RUST_LOG", "info");
  }
  env_logger::init();

  app::run().await
}
