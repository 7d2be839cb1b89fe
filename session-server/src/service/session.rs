//! Session management
//!
//! The gate middleware admits requests carrying a valid session token and rejects everything else
//! with `401 {"error": "Unauthorized"}` before any wrapped handler runs.

use actix_web::body::{EitherBody, MessageBody};
use actix_web::cookie::time::Duration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::error::ErrorInternalServerError;
use actix_web::http::header;
use actix_web::middleware::Next;
use actix_web::web::Data;
use actix_web::{Error, HttpMessage, HttpResponse, ResponseError};
use tracing::debug;

use crate::model::Model;
use crate::model::error::Error as AuthError;
use crate::model::token::SessionToken;
use crate::model::users::User;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session_token";

/// Identity of an admitted request
///
/// Inserted into the request by the gate, handlers take it as `ReqData<Authenticated>`.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// User owning the session
    pub user: User,
    /// Raw session token the request was authenticated with
    pub token: SessionToken,
}

/// Session cookie attributes
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    /// Mark cookies `Secure`
    pub secure: bool,
    /// Cookie lifetime, matching the session lifetime
    pub lifetime_days: u32,
}

impl CookiePolicy {
    /// Cookie carrying the session token
    pub fn session_cookie(&self, token: &SessionToken) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, token.as_str().to_owned())
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(Duration::days(self.lifetime_days.into()))
            .finish()
    }

    /// Cookie instructing the client to drop the session cookie
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(SESSION_COOKIE, "")
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .finish();
        cookie.make_removal();
        cookie
    }
}

/// Extracts the session token, preferring the cookie over the `Authorization: Bearer` header
fn extract_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_owned());
        }
    }

    let token = req
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();

    (!token.is_empty()).then(|| token.to_owned())
}

pub async fn middleware<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error>
where
    B: MessageBody + 'static,
{
    let Some(token) = extract_token(&req) else {
        debug!("Request without session token rejected");
        return Ok(reject(req));
    };

    let model: Data<Model> = req
        .app_data()
        .cloned()
        .ok_or_else(|| ErrorInternalServerError("Missing model"))?;

    let Some(user) = model.auth().validate(&token).await? else {
        debug!("Request with invalid session token rejected");
        return Ok(reject(req));
    };

    req.extensions_mut().insert(Authenticated {
        user,
        token: token.into(),
    });

    next.call(req)
        .await
        .map(ServiceResponse::map_into_left_body)
}

fn reject<B>(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
    let response: HttpResponse = AuthError::Unauthorized.error_response();
    req.into_response(response).map_into_right_body()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn token_from_cookie() {
        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE, "cookie-token"))
            .insert_header((header::AUTHORIZATION, "Bearer header-token"))
            .to_srv_request();
        assert_eq!(extract_token(&req).as_deref(), Some("cookie-token"));
    }

    #[test]
    fn token_from_bearer_header() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer header-token"))
            .to_srv_request();
        assert_eq!(extract_token(&req).as_deref(), Some("header-token"));
    }

    #[test]
    fn empty_cookie_falls_back_to_header() {
        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE, ""))
            .insert_header((header::AUTHORIZATION, "Bearer header-token"))
            .to_srv_request();
        assert_eq!(extract_token(&req).as_deref(), Some("header-token"));
    }

    #[test]
    fn no_token() {
        let req = TestRequest::default().to_srv_request();
        assert_eq!(extract_token(&req), None);

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer "))
            .to_srv_request();
        assert_eq!(extract_token(&req), None);

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_srv_request();
        assert_eq!(extract_token(&req), None);

        let req = TestRequest::default()
            .cookie(Cookie::new("other_cookie", "token"))
            .to_srv_request();
        assert_eq!(extract_token(&req), None);
    }

    #[test]
    fn session_cookie_attributes() {
        let policy = CookiePolicy {
            secure: true,
            lifetime_days: 7,
        };
        let token = SessionToken::from("token");

        let cookie = policy.session_cookie(&token);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(7 * 86400)));

        let cookie = CookiePolicy {
            secure: false,
            ..policy
        }
        .session_cookie(&token);
        assert_eq!(cookie.secure(), Some(false));
    }

    #[test]
    fn removal_cookie_expires() {
        let policy = CookiePolicy {
            secure: false,
            lifetime_days: 7,
        };

        let cookie = policy.removal_cookie();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }
}
