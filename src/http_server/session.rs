use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use crate::entities;
use crate::http_server::error::ApiError;
use crate::http_server::state::AppState;
use crate::services::accounts::AccountService;

pub const SESSION_COOKIE: &str = "jukebox_session";

/// The signed-in user, resolved from the session cookie (or a bearer
/// token). Rejects with AuthenticationRequired when the session is
/// missing or dead.
pub struct CurrentUser {
    pub session: entities::session::Model,
    pub user: entities::user::Model,
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .or_else(|| {
                parts
                    .headers
                    .get(AUTHORIZATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.strip_prefix("Bearer "))
                    .map(str::to_string)
            })
            .ok_or(ApiError::AuthenticationRequired)?;

        let (session, user) = AccountService::new(state.db.clone())
            .session_user(&token)
            .await?
            .ok_or(ApiError::AuthenticationRequired)?;

        Ok(CurrentUser { session, user })
    }
}
