//! Discord gateway runtime: shard lifecycle plus event routing into the
//! playback services.

use std::sync::Arc;
use std::time::Duration;

use songbird::Songbird;
use songbird::shards::TwilightMap;
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};
use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{
    self as gateway, CloseFrame, Config, Event, EventTypeFlags, Intents, MessageSender, Shard,
    StreamExt,
};
use twilight_http::Client as HttpClient;
use twilight_http::client::ClientBuilder;
use twilight_model::gateway::payload::incoming::VoiceStateUpdate;
use twilight_model::id::Id;
use twilight_model::id::marker::{ApplicationMarker, UserMarker};

use crate::Error;
use crate::services::context::BotContext;
use crate::services::discord::slashcommands;

pub struct DiscordPlatform {
    token: String,
    shards: Vec<Shard>,
    shard_tasks: Vec<JoinHandle<()>>,
    shard_senders: Vec<MessageSender>,
    pub http: Option<Arc<HttpClient>>,
    pub cache: Option<Arc<InMemoryCache>>,
    pub songbird: Option<Arc<Songbird>>,
    pub application_id: Option<Id<ApplicationMarker>>,
    pub bot_user_id: Option<Id<UserMarker>>,
}

impl DiscordPlatform {
    pub fn new(token: String) -> Self {
        Self {
            token,
            shards: Vec::new(),
            shard_tasks: Vec::new(),
            shard_senders: Vec::new(),
            http: None,
            cache: None,
            songbird: None,
            application_id: None,
            bot_user_id: None,
        }
    }

    /// Builds the HTTP client, cache, shards and the songbird instance.
    /// Event processing does not begin until [`Self::start`].
    pub async fn connect(&mut self) -> Result<(), Error> {
        let http = Arc::new(
            ClientBuilder::new()
                .token(self.token.clone())
                .timeout(Duration::from_secs(30))
                .build(),
        );

        let application_id = http
            .current_user_application()
            .await
            .map_err(|e| Error::Platform(format!("fetching application failed: {e}")))?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("parsing application failed: {e}")))?
            .id;
        let bot_user_id = http
            .current_user()
            .await
            .map_err(|e| Error::Platform(format!("fetching current user failed: {e}")))?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("parsing current user failed: {e}")))?
            .id;

        let cache = Arc::new(
            InMemoryCache::builder()
                .resource_types(
                    ResourceType::GUILD | ResourceType::CHANNEL | ResourceType::VOICE_STATE,
                )
                .build(),
        );

        let config = Config::new(
            self.token.clone(),
            Intents::GUILDS | Intents::GUILD_VOICE_STATES,
        );
        let shards: Vec<Shard> = gateway::create_recommended(&http, config, |_, b| b.build())
            .await
            .map_err(|e| Error::Platform(format!("create_recommended error: {e}")))?
            .collect();

        let senders = TwilightMap::new(shards.iter().map(|s| (s.id().number(), s.sender())).collect());
        let songbird = Arc::new(Songbird::twilight(Arc::new(senders), bot_user_id));

        self.shard_senders = shards.iter().map(|s| s.sender()).collect();
        self.shards = shards;
        self.http = Some(http);
        self.cache = Some(cache);
        self.songbird = Some(songbird);
        self.application_id = Some(application_id);
        self.bot_user_id = Some(bot_user_id);
        Ok(())
    }

    pub fn senders(&self) -> Vec<MessageSender> {
        self.shard_senders.clone()
    }

    /// Spawns one runner task per shard; events flow into the handlers
    /// from here on.
    pub fn start(&mut self, ctx: Arc<BotContext>) {
        for shard in self.shards.drain(..) {
            let ctx = ctx.clone();
            self.shard_tasks.push(tokio::spawn(shard_runner(shard, ctx)));
        }
    }

    /// Closes every shard and waits for the runners to wind down.
    pub async fn disconnect(&mut self) {
        for sender in &self.shard_senders {
            let _ = sender.close(CloseFrame::NORMAL);
        }
        for task in &mut self.shard_tasks {
            let _ = task.await;
        }
        self.shard_tasks.clear();
        self.shard_senders.clear();
    }
}

async fn shard_runner(mut shard: Shard, ctx: Arc<BotContext>) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
                continue;
            }
        };

        ctx.songbird.process(&event).await;
        ctx.cache.update(&event);

        match event {
            Event::Ready(ready) => {
                info!(
                    "Shard {shard_id} => READY as {} (ID={})",
                    ready.user.name, ready.user.id
                );
            }
            Event::InteractionCreate(interaction) => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    if let Err(e) =
                        slashcommands::handle_interaction_create(&ctx, &interaction).await
                    {
                        warn!("interaction handling failed: {e}");
                    }
                });
            }
            Event::VoiceStateUpdate(update) => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    handle_voice_state_update(&ctx, &update).await;
                });
            }
            other => {
                trace!("Shard {shard_id} => unhandled event: {other:?}");
            }
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

/// Cleans up a guild when the bot itself ends up outside any voice
/// channel, e.g. after an admin disconnect.
async fn handle_voice_state_update(ctx: &Arc<BotContext>, update: &VoiceStateUpdate) {
    let state = &update.0;
    if state.user_id != ctx.bot_user_id || state.channel_id.is_some() {
        return;
    }
    if let Some(guild_id) = state.guild_id {
        ctx.coordinator.handle_bot_voice_disconnect(guild_id).await;
    }
}
