// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

// endregion: --- Imports

// region:    --- Market Error

/// Domain errors surfaced by listing commands and queries.
///
/// Validation errors are raised before any write is attempted, so a failed
/// command never leaves partial state behind.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("invalid listing parameters: {0}")]
    InvalidListingParameters(String),

    #[error("actor {actor} may not {action} listing {listing_id}")]
    Unauthorized {
        actor: String,
        action: &'static str,
        listing_id: i64,
    },

    #[error("listing {0} is already closed")]
    AlreadyTerminal(i64),

    #[error("listing {0} not found")]
    NotFound(i64),

    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("image host failure: {0}")]
    ImageHost(String),
}

impl MarketError {
    /// Stable machine-readable code included in every error response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidListingParameters(_) => "INVALID_PARAMETERS",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::AlreadyTerminal(_) => "ALREADY_CLOSED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Persistence(_) => "PERSISTENCE_FAILURE",
            Self::ImageHost(_) => "IMAGE_HOST_FAILURE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidListingParameters(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::FORBIDDEN,
            Self::AlreadyTerminal(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ImageHost(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        (self.status(), body).into_response()
    }
}

// endregion: --- Market Error

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            MarketError::InvalidListingParameters("x".into()).code(),
            "INVALID_PARAMETERS"
        );
        assert_eq!(MarketError::AlreadyTerminal(1).code(), "ALREADY_CLOSED");
        assert_eq!(MarketError::NotFound(1).code(), "NOT_FOUND");
    }

    #[test]
    fn unauthorized_message_names_actor_and_listing() {
        let err = MarketError::Unauthorized {
            actor: "user-1".into(),
            action: "relist",
            listing_id: 42,
        };
        assert_eq!(err.to_string(), "actor user-1 may not relist listing 42");
    }
}

// endregion: --- Tests
