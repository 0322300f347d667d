use std::io::Cursor;

use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{
    http::{ContentType, Status},
    response::Responder,
    serde::json::{json, serde_json},
    Response,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    /// A 404 for the given resource description.
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::Status(Status::NotFound, format!("{} not found", what))
    }

    /// A 400 with the given reason.
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, reason.into())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    /// Report the failure as `{"detail": <reason>}` with the right status.
    /// Internal errors are logged but never leaked to the client.
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let (status, reason) = match self {
            Self::Db(err) => {
                error!("Database error: {err}");
                (Status::InternalServerError, "Internal server error".into())
            }
            Self::Jwt(err) => match err.into_kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    (Status::Unauthorized, "Authentication expired".into())
                }
                kind => {
                    error!("JWT error: {kind:?}");
                    (Status::BadRequest, "Invalid authentication token".into())
                }
            },
            Self::Json(err) => {
                error!("Serialisation error: {err}");
                (Status::InternalServerError, "Internal server error".into())
            }
            Self::Status(status, reason) => {
                warn!("{status}: {reason}");
                (status, reason)
            }
        };

        let body = json!({ "detail": reason }).to_string();
        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}
