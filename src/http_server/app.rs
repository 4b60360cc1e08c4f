use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post},
};
use color_eyre::eyre::{Context, eyre};
use serde_json::json;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::SpotifyConfig;
use crate::database::Database;
use crate::http_server::{routes, state::AppState};
use crate::thumbnail::{CachedThumbnailResolver, PageThumbnailResolver};

pub struct HttpServerConfig {
    pub port: u16,
    pub database: Arc<Database>,
    pub spotify: SpotifyConfig,
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "service": "jukebox" }))
}

pub async fn start(config: HttpServerConfig) -> color_eyre::Result<()> {
    let app_state = Arc::new(AppState {
        db: config.database,
        spotify: config.spotify,
        pending_oauth: Mutex::new(HashMap::new()),
        thumbnails: Arc::new(CachedThumbnailResolver::new(PageThumbnailResolver::new())),
    });

    let app = Router::new()
        .route("/", get(root))
        .route(
            "/register",
            get(routes::auth::register_form).post(routes::auth::register),
        )
        .route(
            "/login",
            get(routes::auth::login_form).post(routes::auth::login),
        )
        .route("/logout", get(routes::auth::logout))
        .route("/spotify_auth", get(routes::spotify::spotify_auth))
        .route("/spotify_callback", get(routes::spotify::spotify_callback))
        .route("/spotify_request", get(routes::spotify::spotify_request))
        .route("/jukebox", get(routes::playlists::jukebox))
        .route("/song/{id}", get(routes::songs::song_detail))
        .route("/create_playlist", post(routes::playlists::create_playlist))
        .route(
            "/update_playlist/{id}",
            get(routes::playlists::update_playlist_form).post(routes::playlists::update_playlist),
        )
        .route(
            "/delete_playlist/{id}",
            post(routes::playlists::delete_playlist),
        )
        .route(
            "/delete_song_from_playlist/{playlist_id}/{song_id}",
            post(routes::playlists::delete_song_from_playlist),
        )
        .route(
            "/add_song_to_playlist/{id}",
            post(routes::playlists::add_song_to_playlist),
        )
        .route("/search_songs", post(routes::playlists::search_songs))
        .route("/genres", get(routes::genres::list_genres))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .wrap_err_with(|| eyre!("Failed to bind to port {}", config.port))?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .await
        .wrap_err("Failed to start HTTP server")?;

    Ok(())
}
