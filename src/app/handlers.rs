use actix_web::{
  web,
  HttpResponse,
  HttpRequest,
  Result
};
use crate::content::lifecycle::{self, Status, StatusAction};
use crate::content::reactions::ReactionKind;
use crate::db::entities::*;
use crate::db::{self, articles, reactions, taxonomy};
use super::dtos::*;
use super::error::Error;
use super::helpers::{self, Identity};
use super::rate_limiter::throttle;
use super::AppState;

// Module with all the API handler functions. Identity comes
// from headers set upstream, see helpers::identity.

// Bulk actions on more than this many articles are refused:
const MAX_BULK_IDS: usize = 100;

fn article_or_404(
  pool: &db::Pool,
  slug: &str
) -> Result<Article, Error> {
  articles::article_by_slug(pool, slug)?
    .ok_or_else(|| Error::NotFound("Article does not exist".to_string()))
}

// Returns the article if the identity is allowed to modify it.
fn managed_article(
  pool: &db::Pool,
  slug: &str,
  identity: &Identity
) -> Result<Article, Error> {
  identity.require_user()?;
  let article = article_or_404(pool, slug)?;
  if !identity.can_manage(article.author_id) {
    return Err(Error::Forbidden("Not your article".to_string()));
  }
  Ok(article)
}

fn parse_admin_action(action: &str) -> Result<StatusAction, Error> {
  match action.parse::<StatusAction>()? {
    action @ StatusAction::Approve | action @ StatusAction::Reject => Ok(action),
    other => Err(Error::BadRequest(format!("{} is not a moderation action", other)))
  }
}

pub async fn health(
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  // Fails with a 503 when the pool can't hand out a connection:
  db::connection(&app_state.pool)?;
  Ok(HttpResponse::Ok().json(JsonStatus::new(JsonStatusType::Success, "ok")))
}

// Default response when no route matched the request:
pub async fn not_found() -> Result<HttpResponse, Error> {
  Err(Error::NotFound(String::from("Endpoint doesn't exist")))
}

pub async fn create_article(
  app_state: web::Data<AppState>,
  body: web::Json<NewArticleBody>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let identity = helpers::identity(&req)?;
  let user_id = identity.require_user()?;
  throttle(&app_state, &req, &identity, "articles", app_state.throttles.write)?;
  let article = articles::create_article(
    &app_state.pool,
    &body.into_inner().into(),
    user_id,
    identity.privileged,
    app_state.slug_max_retries
  )?;
  Ok(HttpResponse::Created().json(ArticleDto::from(article)))
}

/**
 * Unpublished articles are only there for their author and the
 * admins, everyone else gets a 403. Reading a published article
 * counts a view unless it's the author reading it.
 */
pub async fn article(
  app_state: web::Data<AppState>,
  path: web::Path<(String,)>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let identity = helpers::identity(&req)?;
  let slug = path.into_inner().0;
  let mut article = article_or_404(&app_state.pool, &slug)?;
  if article.status != Status::Published && !identity.can_manage(article.author_id) {
    return Err(Error::Forbidden("Article is not published".to_string()));
  }
  if lifecycle::counts_view(article.status, article.author_id, identity.user_id) {
    let outcome = articles::record_view(&app_state.pool, article.id, identity.user_id)?;
    article.views = outcome.views;
  }
  let counts = reactions::reaction_counts(&app_state.pool, article.id)?;
  let (user_reaction, is_bookmarked) = match identity.user_id {
    Some(user_id) => (
      reactions::user_reaction(&app_state.pool, user_id, article.id)?,
      reactions::is_bookmarked(&app_state.pool, user_id, article.id)?
    ),
    None => (None, false)
  };
  let categories = taxonomy::categories_for_article(&app_state.pool, article.id)?;
  let tags = taxonomy::tags_for_article(&app_state.pool, article.id)?;
  Ok(HttpResponse::Ok().json(ArticleDetailDto {
    article: article.into(),
    categories: categories.into_iter().map(Into::into).collect(),
    tags,
    like_count: counts.like_count,
    dislike_count: counts.dislike_count,
    user_reaction,
    is_bookmarked
  }))
}

pub async fn update_article(
  app_state: web::Data<AppState>,
  path: web::Path<(String,)>,
  body: web::Json<ArticleUpdateBody>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let identity = helpers::identity(&req)?;
  let article = managed_article(&app_state.pool, &path.into_inner().0, &identity)?;
  let updated = articles::update_article(
    &app_state.pool,
    article.id,
    &body.into_inner().into()
  )?;
  Ok(HttpResponse::Ok().json(ArticleDto::from(updated)))
}

pub async fn delete_article(
  app_state: web::Data<AppState>,
  path: web::Path<(String,)>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let identity = helpers::identity(&req)?;
  let article = managed_article(&app_state.pool, &path.into_inner().0, &identity)?;
  articles::delete_article(&app_state.pool, article.id)?;
  Ok(HttpResponse::Ok().json(
    JsonStatus::new_with_id(JsonStatusType::Success, "Article deleted", article.id)
  ))
}

fn author_status_action(
  app_state: &AppState,
  slug: &str,
  req: &HttpRequest,
  action: StatusAction
) -> Result<HttpResponse, Error> {
  let identity = helpers::identity(req)?;
  if !action.author_allowed() {
    identity.require_privileged()?;
  }
  let article = managed_article(&app_state.pool, slug, &identity)?;
  let updated = articles::apply_status_action(
    &app_state.pool,
    article.id,
    action,
    app_state.conflict_max_retries
  )?;
  Ok(HttpResponse::Ok().json(ArticleDto::from(updated)))
}

pub async fn publish_article(
  app_state: web::Data<AppState>,
  path: web::Path<(String,)>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  author_status_action(&app_state, &path.into_inner().0, &req, StatusAction::Publish)
}

pub async fn unpublish_article(
  app_state: web::Data<AppState>,
  path: web::Path<(String,)>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  author_status_action(&app_state, &path.into_inner().0, &req, StatusAction::Unpublish)
}

pub async fn react(
  app_state: web::Data<AppState>,
  path: web::Path<(String,)>,
  body: web::Json<ReactionBody>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let identity = helpers::identity(&req)?;
  let user_id = identity.require_user()?;
  throttle(&app_state, &req, &identity, "reactions", app_state.throttles.reaction)?;
  let article = article_or_404(&app_state.pool, &path.into_inner().0)?;
  let outcome = reactions::react(
    &app_state.pool,
    user_id,
    article.id,
    body.kind,
    app_state.conflict_max_retries
  )?;
  Ok(HttpResponse::Ok().json(ReactionResponse::from(outcome)))
}

pub async fn bookmark(
  app_state: web::Data<AppState>,
  path: web::Path<(String,)>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let identity = helpers::identity(&req)?;
  let user_id = identity.require_user()?;
  throttle(&app_state, &req, &identity, "reactions", app_state.throttles.reaction)?;
  let article = article_or_404(&app_state.pool, &path.into_inner().0)?;
  let signal = reactions::toggle_bookmark(
    &app_state.pool,
    user_id,
    article.id,
    app_state.conflict_max_retries
  )?;
  Ok(HttpResponse::Ok().json(BookmarkResponse::from(signal)))
}

pub async fn record_view(
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let identity = helpers::identity(&req)?;
  throttle(&app_state, &req, &identity, "views", app_state.throttles.default)?;
  let outcome = articles::record_view(&app_state.pool, path.into_inner().0, identity.user_id)?;
  Ok(HttpResponse::Ok().json(ViewResponse::from(outcome)))
}

fn article_list(articles: Vec<Article>) -> HttpResponse {
  HttpResponse::Ok().json(
    articles.into_iter().map(Into::into).collect::<Vec<ArticleDto>>()
  )
}

pub async fn my_bookmarks(
  app_state: web::Data<AppState>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let user_id = helpers::identity(&req)?.require_user()?;
  Ok(article_list(reactions::list_bookmarked(&app_state.pool, user_id)?))
}

pub async fn my_likes(
  app_state: web::Data<AppState>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let user_id = helpers::identity(&req)?.require_user()?;
  Ok(article_list(reactions::list_reacted(&app_state.pool, user_id, ReactionKind::Like)?))
}

pub async fn my_dislikes(
  app_state: web::Data<AppState>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let user_id = helpers::identity(&req)?.require_user()?;
  Ok(article_list(reactions::list_reacted(&app_state.pool, user_id, ReactionKind::Dislike)?))
}

pub async fn create_category(
  app_state: web::Data<AppState>,
  body: web::Json<NewCategoryBody>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let identity = helpers::identity(&req)?;
  identity.require_privileged()?;
  throttle(&app_state, &req, &identity, "categories", app_state.throttles.write)?;
  let category = taxonomy::create_category(
    &app_state.pool,
    &body.into_inner().into(),
    app_state.slug_max_retries
  )?;
  Ok(HttpResponse::Created().json(CategoryDto::from(category)))
}

pub async fn create_tag(
  app_state: web::Data<AppState>,
  body: web::Json<NewTagBody>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let identity = helpers::identity(&req)?;
  identity.require_user()?;
  throttle(&app_state, &req, &identity, "tags", app_state.throttles.write)?;
  let tag: TagDto = taxonomy::create_tag(&app_state.pool, &body.name, app_state.slug_max_retries)?;
  Ok(HttpResponse::Created().json(tag))
}

pub async fn moderate_article(
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>,
  body: web::Json<StatusActionBody>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  helpers::identity(&req)?.require_privileged()?;
  let action = parse_admin_action(&body.action)?;
  let updated = articles::apply_status_action(
    &app_state.pool,
    path.into_inner().0,
    action,
    app_state.conflict_max_retries
  )?;
  Ok(HttpResponse::Ok().json(ArticleDto::from(updated)))
}

pub async fn bulk_moderate(
  app_state: web::Data<AppState>,
  body: web::Json<BulkActionBody>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  helpers::identity(&req)?.require_privileged()?;
  let action = parse_admin_action(&body.action)?;
  if body.ids.is_empty() || body.ids.len() > MAX_BULK_IDS {
    return Err(Error::BadRequest(
      format!("Provide between 1 and {} article ids", MAX_BULK_IDS)
    ));
  }
  let outcomes: Vec<BulkItemDto> = articles::apply_status_action_bulk(
    &app_state.pool,
    &body.ids,
    action,
    app_state.conflict_max_retries
  ).into_iter().map(Into::into).collect();
  Ok(HttpResponse::Ok().json(outcomes))
}

pub async fn toggle_featured(
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  helpers::identity(&req)?.require_privileged()?;
  let id = path.into_inner().0;
  let featured = articles::toggle_featured(&app_state.pool, id)?;
  Ok(HttpResponse::Ok().json(FeaturedResponse { id, featured }))
}

pub async fn archive_article(
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  helpers::identity(&req)?.require_privileged()?;
  let archived = articles::apply_status_action(
    &app_state.pool,
    path.into_inner().0,
    StatusAction::Archive,
    app_state.conflict_max_retries
  )?;
  Ok(HttpResponse::Ok().json(ArticleDto::from(archived)))
}
