//! Error responses tests

use actix_web::ResponseError;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use assert_json_diff::assert_json_eq;
use serde_json::{Value, json};

use crate::model::error::Error;

/// Renders the error response, returning its status and raw body
async fn render(err: Error) -> (StatusCode, String) {
    let resp = err.error_response();
    let status = resp.status();
    let body = to_bytes(resp.into_body()).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[actix_web::test]
async fn internal_errors_are_masked() {
    let errors = [
        Error::Database(sqlx::Error::RowNotFound),
        Error::InvalidTimestamp(i64::MAX),
        Error::ExpiryOutOfRange,
    ];

    for err in errors {
        let detail = err.to_string();
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains(&detail), "{body}");

        let body: Value = serde_json::from_str(&body).unwrap();
        assert_json_eq!(body, json!({ "error": "Internal server error" }));
    }
}

#[actix_web::test]
async fn domain_errors_are_reported() {
    let cases = [
        (Error::Conflict, StatusCode::CONFLICT, "Unique constraint violated"),
        (Error::AlreadyExists, StatusCode::CONFLICT, "User already exists"),
        (Error::InvalidCredentials, StatusCode::UNAUTHORIZED, "Invalid credentials"),
        (Error::Unauthorized, StatusCode::UNAUTHORIZED, "Unauthorized"),
    ];

    for (err, expected_status, message) in cases {
        let (status, body) = render(err).await;
        assert_eq!(status, expected_status);

        let body: Value = serde_json::from_str(&body).unwrap();
        assert_json_eq!(body, json!({ "error": message }));
    }
}
