use actix_web::{
  error::ResponseError,
  http::StatusCode,
  HttpResponse
};
use derive_more::Display;
use log::error;
use crate::content::CoreError;
use super::dtos::{JsonStatus, JsonStatusType};

// The full message of the server side errors only goes to the
// logs, random internet people get the generic display.
#[derive(Debug, Display)]
pub enum Error {
  #[display(fmt = "Database Error")]
  DatabaseError(String),
  #[display(fmt = "Service temporarily unavailable, try again")]
  ServiceUnavailable(String),
  #[display(fmt = "Forbidden: {}", _0)]
  Forbidden(String),
  #[display(fmt = "Not Found: {}", _0)]
  NotFound(String),
  #[display(fmt = "Bad Request: {}", _0)]
  BadRequest(String),
  #[display(fmt = "Conflict: {}", _0)]
  Conflict(String),
  // Holds the Retry-After value in seconds.
  #[display(fmt = "Too many requests")]
  TooManyRequests(i64)
}

impl ResponseError for Error {
  fn status_code(&self) -> StatusCode {
    match self {
      Error::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
      Error::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      Error::Forbidden(_) => StatusCode::FORBIDDEN,
      Error::NotFound(_) => StatusCode::NOT_FOUND,
      Error::BadRequest(_) => StatusCode::BAD_REQUEST,
      Error::Conflict(_) => StatusCode::CONFLICT,
      Error::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS
    }
  }

  fn error_response(&self) -> HttpResponse {
    let mut response = HttpResponse::build(self.status_code());
    if let Error::TooManyRequests(retry_after) = self {
      response.insert_header(("Retry-After", retry_after.to_string()));
    }
    response.json(JsonStatus::new(JsonStatusType::Error, &self.to_string()))
  }
}

impl From<CoreError> for Error {
  fn from(e: CoreError) -> Self {
    match e {
      CoreError::Validation(msg) => Error::BadRequest(msg),
      CoreError::Conflict(msg) => Error::Conflict(msg),
      CoreError::NotFound(msg) => Error::NotFound(msg),
      CoreError::RateLimited(retry_after) => Error::TooManyRequests(retry_after),
      CoreError::TransientStore(msg) => {
        error!("Transient store failure - {}", msg);
        Error::ServiceUnavailable(msg)
      },
      CoreError::Store(msg) => {
        error!("Store failure - {}", msg);
        Error::DatabaseError(msg)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn core_errors_map_to_status_codes() {
    let cases = vec![
      (CoreError::validation("bad"), StatusCode::BAD_REQUEST),
      (CoreError::conflict("taken"), StatusCode::CONFLICT),
      (CoreError::not_found("gone"), StatusCode::NOT_FOUND),
      (CoreError::RateLimited(30), StatusCode::TOO_MANY_REQUESTS),
      (CoreError::TransientStore("locked".to_string()), StatusCode::SERVICE_UNAVAILABLE),
      (CoreError::Store("disk I/O".to_string()), StatusCode::INTERNAL_SERVER_ERROR)
    ];
    for (core, status) in cases {
      assert_eq!(status, Error::from(core).status_code());
    }
  }

  #[test]
  fn store_details_are_not_displayed() {
    let e = Error::from(CoreError::Store("no such table: articles".to_string()));
    assert_eq!("Database Error", e.to_string());
  }

  #[test]
  fn too_many_requests_sets_retry_after() {
    let response = Error::from(CoreError::RateLimited(42)).error_response();
    assert_eq!(StatusCode::TOO_MANY_REQUESTS, response.status());
    assert_eq!("42", response.headers().get("Retry-After").unwrap().to_str().unwrap());
  }
}
