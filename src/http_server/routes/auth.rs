use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use serde::Deserialize;
use serde_json::json;

use crate::http_server::error::ApiError;
use crate::http_server::session::SESSION_COOKIE;
use crate::http_server::state::AppState;
use crate::services::accounts::AccountService;

#[derive(Debug, Deserialize)]
pub struct CredentialsPayload {
    username: Option<String>,
    password: Option<String>,
}

impl CredentialsPayload {
    fn into_fields(self) -> Result<(String, String), ApiError> {
        match (self.username, self.password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok((username, password))
            }
            _ => Err(ApiError::Validation(
                "Missing username or password".to_string(),
            )),
        }
    }
}

pub async fn register_form() -> Json<serde_json::Value> {
    Json(json!({ "fields": ["username", "password"] }))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let (username, password) = payload.into_fields()?;

    let user = AccountService::new(state.db.clone())
        .register(&username, &password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": user.id, "username": user.username })),
    ))
}

pub async fn login_form() -> Json<serde_json::Value> {
    Json(json!({ "fields": ["username", "password"] }))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<CredentialsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let (username, password) = payload.into_fields()?;

    let session = AccountService::new(state.db.clone())
        .login(&username, &password)
        .await?;

    let cookie = Cookie::build((SESSION_COOKIE, session.token.clone()))
        .path("/")
        .http_only(true)
        .build();

    Ok((jar.add(cookie), Json(json!({ "token": session.token }))))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        AccountService::new(state.db.clone())
            .logout(cookie.value())
            .await?;
    }

    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    Ok((jar, Redirect::to("/login")))
}
