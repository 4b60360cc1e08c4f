use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::SpotifyConfig;
use crate::database::Database;
use crate::spotify::types::PendingAuth;
use crate::thumbnail::{CachedThumbnailResolver, PageThumbnailResolver};

pub struct AppState {
    pub db: Arc<Database>,
    pub spotify: SpotifyConfig,
    /// In-flight OAuth attempts keyed by their state nonce. Each attempt
    /// has its own entry, so concurrent authorizations by different users
    /// cannot clobber each other.
    pub pending_oauth: Mutex<HashMap<String, PendingAuth>>,
    /// Shared across sync passes so already-resolved thumbnails are not
    /// refetched.
    pub thumbnails: Arc<CachedThumbnailResolver<PageThumbnailResolver>>,
}
