//! Utilities for services building

use actix_web::http::StatusCode;
use actix_web::web::{Data, Json, ReqData, ServiceConfig};
use actix_web::{HttpResponse, ResponseError, middleware, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;


pub mod session;

use crate::model::Model;
use crate::model::auth::SignedIn;
use crate::model::error::Error;
use crate::model::token::SessionToken;
use crate::model::users::User;
use session::{Authenticated, CookiePolicy};

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::AlreadyExists | Error::Conflict => StatusCode::CONFLICT,
            Error::InvalidCredentials | Error::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = if self.is_internal() {
            error!(err = %self, "Request failed");
            "Internal server error".to_owned()
        } else {
            self.to_string()
        };

        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

/// Login and registration payload
#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

/// Session data returned to the client
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IssuedSession {
    token: SessionToken,
    expires_at: DateTime<Utc>,
}

/// Response for registration and login
#[derive(Debug, Serialize)]
struct SignedInResp {
    user: User,
    session: IssuedSession,
}

/// Builds the response for a freshly opened session, setting the session cookie
fn signed_in_response(
    status: StatusCode,
    cookies: &CookiePolicy,
    signed_in: SignedIn,
) -> HttpResponse {
    let SignedIn { user, session } = signed_in;
    let cookie = cookies.session_cookie(&session.token);

    HttpResponse::build(status).cookie(cookie).json(SignedInResp {
        user,
        session: IssuedSession {
            token: session.token,
            expires_at: session.expires_at,
        },
    })
}

/// Registers a new user, opening a session
#[post("/register")]
async fn register(
    model: Data<Model>,
    cookies: Data<CookiePolicy>,
    credentials: Json<Credentials>,
) -> Result<HttpResponse, Error> {
    let Credentials { email, password } = credentials.into_inner();
    let signed_in = model.auth().register(&email, &password).await?;
    Ok(signed_in_response(StatusCode::CREATED, &cookies, signed_in))
}

/// Opens a new session for existing user
#[post("/login")]
async fn login(
    model: Data<Model>,
    cookies: Data<CookiePolicy>,
    credentials: Json<Credentials>,
) -> Result<HttpResponse, Error> {
    let Credentials { email, password } = credentials.into_inner();
    let signed_in = model.auth().login(&email, &password).await?;
    Ok(signed_in_response(StatusCode::OK, &cookies, signed_in))
}

/// Returns the user owning current session
async fn current_session(auth: ReqData<Authenticated>) -> HttpResponse {
    let Authenticated { user, .. } = auth.into_inner();
    HttpResponse::Ok().json(json!({ "user": user }))
}

/// Closes current session
async fn logout(
    auth: ReqData<Authenticated>,
    model: Data<Model>,
    cookies: Data<CookiePolicy>,
) -> Result<HttpResponse, Error> {
    let Authenticated { token, .. } = auth.into_inner();
    model.auth().logout(token.as_str()).await?;

    Ok(HttpResponse::NoContent()
        .cookie(cookies.removal_cookie())
        .finish())
}

/// Returns configuration function for the ActixWeb services
pub fn configure(cookies: CookiePolicy, model: Model) -> impl Fn(&mut ServiceConfig) + Clone {
    move |cfg: &mut ServiceConfig| {
        let session_aware = web::scope("/session")
            .wrap(middleware::from_fn(session::middleware))
            .service(
                web::resource("")
                    .route(web::get().to(current_session))
                    .route(web::delete().to(logout)),
            );

        cfg.app_data(Data::new(model.clone()))
            .app_data(Data::new(cookies))
            .service(register)
            .service(login)
            .service(session_aware);
    }
}
