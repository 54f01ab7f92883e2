//! Shared handles passed to the Discord event and interaction handlers.

use std::sync::Arc;

use songbird::Songbird;
use twilight_cache_inmemory::InMemoryCache;
use twilight_http::Client as HttpClient;
use twilight_model::id::Id;
use twilight_model::id::marker::{ApplicationMarker, UserMarker};

use crate::services::playback::PlaybackCoordinator;

pub struct BotContext {
    pub coordinator: Arc<PlaybackCoordinator>,
    pub http: Arc<HttpClient>,
    pub cache: Arc<InMemoryCache>,
    pub songbird: Arc<Songbird>,
    pub application_id: Id<ApplicationMarker>,
    pub bot_user_id: Id<UserMarker>,
}
