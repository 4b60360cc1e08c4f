use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde_json::json;

use crate::services::accounts::AccountError;
use crate::services::playlists::PlaylistError;
use crate::services::sync::SyncError;

/// Error taxonomy of the HTTP surface. Failures are either a redirect
/// back through the authorization flow or a JSON payload with an `error`
/// field and a 4xx status. No automatic retries anywhere.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    AuthenticationRequired,
    /// Spotify token missing or rejected; the response restarts the
    /// authorization flow. Remote failures are collapsed into this
    /// rather than surfaced distinctly.
    #[error("Spotify authorization required")]
    SpotifyAuthRequired,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Internal(#[from] color_eyre::Report),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::AuthenticationRequired => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Authentication required" })),
            )
                .into_response(),
            ApiError::SpotifyAuthRequired => Redirect::to("/spotify_auth").into_response(),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("{what} not found") })),
            )
                .into_response(),
            ApiError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(report) => {
                tracing::error!("Request failed: {report:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Something went wrong" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::UsernameTaken => ApiError::Validation(err.to_string()),
            AccountError::InvalidCredentials | AccountError::SessionNotFound => {
                ApiError::AuthenticationRequired
            }
            AccountError::Db(err) => ApiError::Internal(err.into()),
        }
    }
}

impl From<PlaylistError> for ApiError {
    fn from(err: PlaylistError) -> Self {
        match err {
            PlaylistError::NotFound(what) => ApiError::NotFound(what),
            PlaylistError::UnknownSongs => ApiError::Validation(err.to_string()),
            PlaylistError::Db(err) => ApiError::Internal(err.into()),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            // Both expiry and transport failure restart the flow
            SyncError::AuthExpired | SyncError::External(_) => ApiError::SpotifyAuthRequired,
            SyncError::Db(err) => ApiError::Internal(err.into()),
        }
    }
}
