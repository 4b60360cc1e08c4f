use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Redirect;
use serde::Deserialize;

use crate::http_server::error::ApiError;
use crate::http_server::session::CurrentUser;
use crate::http_server::state::AppState;
use crate::services::accounts::AccountService;
use crate::services::sync::SyncEngine;
use crate::spotify::auth::{authorize_url, exchange_code_for_token, generate_state};
use crate::spotify::client::SpotifyWebClient;
use crate::spotify::types::PendingAuth;

/// Pending attempts the provider never redirected back for are dropped
/// after this long.
const PENDING_AUTH_TTL_SECS: i64 = 600;

/// Start the authorization flow: record a pending attempt under a fresh
/// state nonce and send the user to the consent page.
pub async fn spotify_auth(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Redirect, ApiError> {
    let nonce = generate_state();
    let now = chrono::Utc::now().timestamp();
    {
        let mut pending = state.pending_oauth.lock().await;
        pending.retain(|_, attempt| now - attempt.created_at < PENDING_AUTH_TTL_SECS);
        pending.insert(
            nonce.clone(),
            PendingAuth {
                session_token: user.session.token,
                created_at: now,
            },
        );
    }

    let url = authorize_url(
        &state.spotify.client_id,
        &state.spotify.redirect_uri,
        &nonce,
    );
    Ok(Redirect::to(&url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

/// Complete the flow: the nonce picks out exactly the attempt that
/// started it, the code is traded for a bearer token, and the token is
/// attached to that attempt's session.
pub async fn spotify_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, ApiError> {
    let code = query
        .code
        .ok_or_else(|| ApiError::Validation("Missing authorization code".to_string()))?;
    let nonce = query
        .state
        .ok_or_else(|| ApiError::Validation("Missing state".to_string()))?;

    let pending = state
        .pending_oauth
        .lock()
        .await
        .remove(&nonce)
        .ok_or(ApiError::AuthenticationRequired)?;

    let token = exchange_code_for_token(
        &state.spotify.client_id,
        &state.spotify.client_secret,
        &code,
        &state.spotify.redirect_uri,
    )
    .await
    .map_err(|err| {
        tracing::warn!("Token exchange failed: {err}");
        ApiError::SpotifyAuthRequired
    })?;

    AccountService::new(state.db.clone())
        .store_spotify_token(&pending.session_token, &token.access_token)
        .await?;

    Ok(Redirect::to("/jukebox"))
}

/// Trigger the sync engine for the signed-in user, then land on the
/// jukebox. An expired or missing token restarts the authorization flow.
pub async fn spotify_request(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Redirect, ApiError> {
    let access_token = user
        .session
        .spotify_access_token
        .ok_or(ApiError::SpotifyAuthRequired)?;

    let engine = SyncEngine::new(
        state.db.clone(),
        SpotifyWebClient::new(access_token),
        state.thumbnails.clone(),
    );
    engine.sync_user(user.user.id).await?;

    Ok(Redirect::to("/jukebox"))
}
