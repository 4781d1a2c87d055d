use actix_web::HttpRequest;
use std::net::IpAddr;
use std::str::FromStr;
use regex::Regex;
use lazy_static::lazy_static;
use super::error::Error;

// Headers set by the auth layer sitting in front of us.
pub const USER_ID_HEADER: &'static str = "X-User-Id";
pub const USER_ROLE_HEADER: &'static str = "X-User-Role";
const PRIVILEGED_ROLE: &'static str = "admin";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Identity {
  pub user_id: Option<i64>,
  pub privileged: bool
}

impl Identity {

  pub fn require_user(&self) -> Result<i64, Error> {
    self.user_id
      .ok_or_else(|| Error::Forbidden("Authentication required".to_string()))
  }

  pub fn require_privileged(&self) -> Result<i64, Error> {
    let user_id = self.require_user()?;
    if self.privileged {
      Ok(user_id)
    } else {
      Err(Error::Forbidden("Admin role required".to_string()))
    }
  }

  // Authors manage their own articles, admins manage all of them.
  pub fn can_manage(&self, author_id: i64) -> bool {
    self.privileged || self.user_id == Some(author_id)
  }

}

// Extracting Actix header values is kinda convoluted, they can
// fail to convert to str because of invalid characters.
pub fn header_value(req: &HttpRequest, name: &str) -> String {
  req.headers().get(name)
    .map(|h| String::from(h.to_str().unwrap_or("")))
    .unwrap_or(String::new())
}

// A user id header that's there but isn't a number is a
// broken upstream, not an anonymous user.
pub fn identity(req: &HttpRequest) -> Result<Identity, Error> {
  let raw_id = header_value(req, USER_ID_HEADER);
  let user_id = match raw_id.trim() {
    "" => None,
    id => Some(id.parse::<i64>()
      .map_err(|_| Error::BadRequest(format!("Invalid {} header", USER_ID_HEADER)))?)
  };
  let role = header_value(req, USER_ROLE_HEADER);
  Ok(Identity {
    user_id,
    privileged: user_id.is_some() && role.trim().eq_ignore_ascii_case(PRIVILEGED_ROLE)
  })
}

pub fn real_ip_addr(req: &HttpRequest) -> Option<IpAddr> {
  // The goal of the regex is to remove the port part
  // from the "IP address" that Actix gives us, which
  // may or may not have a port part.
  lazy_static! {
    static ref PORT_REGEX: Regex = Regex::new(
      r"(.+):\d+$"
    ).unwrap();
  }

  req.connection_info().realip_remote_addr()
    .and_then(|ip| {
      // Bare IPv6 addresses also end with ":<digits>",
      // try them as they are first.
      IpAddr::from_str(ip)
        .or_else(|_| IpAddr::from_str(&PORT_REGEX.replace(ip, "$1")))
        .ok()
    })
}

// Who a rate limit bucket belongs to: the user when we know
// them, the client IP otherwise.
pub fn rate_limit_subject(identity: &Identity, req: &HttpRequest) -> String {
  match identity.user_id {
    Some(id) => format!("user:{}", id),
    None => real_ip_addr(req)
      .map(|ip| format!("ip:{}", ip))
      .unwrap_or_else(|| "ip:unknown".to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::test::TestRequest;

  #[test]
  fn anonymous_identity() {
    let req = TestRequest::default().to_http_request();
    let identity = identity(&req).unwrap();
    assert_eq!(Identity { user_id: None, privileged: false }, identity);
    assert!(identity.require_user().is_err());
  }

  #[test]
  fn admin_role_is_privileged() {
    let req = TestRequest::default()
      .insert_header((USER_ID_HEADER, "4"))
      .insert_header((USER_ROLE_HEADER, "Admin"))
      .to_http_request();
    let identity = identity(&req).unwrap();
    assert_eq!(Some(4), identity.user_id);
    assert!(identity.privileged);
    assert!(identity.can_manage(99));
  }

  #[test]
  fn role_without_user_is_not_privileged() {
    let req = TestRequest::default()
      .insert_header((USER_ROLE_HEADER, "admin"))
      .to_http_request();
    assert!(!identity(&req).unwrap().privileged);
  }

  #[test]
  fn garbage_user_id_is_a_bad_request() {
    let req = TestRequest::default()
      .insert_header((USER_ID_HEADER, "robert'); DROP TABLE"))
      .to_http_request();
    assert!(matches!(identity(&req), Err(Error::BadRequest(_))));
  }

  #[test]
  fn author_can_manage_only_own_articles() {
    let identity = Identity { user_id: Some(2), privileged: false };
    assert!(identity.can_manage(2));
    assert!(!identity.can_manage(3));
    assert!(identity.require_privileged().is_err());
  }

  #[test]
  fn rate_limit_subject_prefers_user() {
    let req = TestRequest::default()
      .peer_addr("10.0.0.8:4567".parse().unwrap())
      .to_http_request();
    let anonymous = Identity { user_id: None, privileged: false };
    assert_eq!("ip:10.0.0.8", rate_limit_subject(&anonymous, &req));
    let user = Identity { user_id: Some(12), privileged: false };
    assert_eq!("user:12", rate_limit_subject(&user, &req));
  }
}
