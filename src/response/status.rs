//! Outcome categories carried in every response envelope.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

/// Category of an API outcome.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    /// Request executed as asked.
    Success,
    /// Generic failure while performing the action.
    Failure,
    /// Unexpected server-side fault.
    ServerError,
    /// Request parameters invalid or missing.
    BadRequest,
    /// Nothing matched the request criteria.
    RecordNotFound,
    /// Payload failed validation.
    ValidationError,
    /// Caller may not access the resource.
    Unauthorized,
}

impl ResponseStatus {
    /// Message used when the caller supplies none.
    pub fn default_message(self) -> &'static str {
        match self {
            Self::Success => "Your request is successfully executed",
            Self::Failure => "Some error occurred while performing action.",
            Self::ServerError => "Internal server error.",
            Self::BadRequest => "Request parameters are invalid or missing.",
            Self::RecordNotFound => "Record(s) not found with specified criteria.",
            Self::ValidationError => "Invalid Data, Validation Failed.",
            Self::Unauthorized => "You are not authorized to access the request",
        }
    }

    /// HTTP status line sent with this outcome.
    pub fn http_status(self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,
            Self::Failure | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RecordNotFound => StatusCode::NOT_FOUND,
            Self::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
