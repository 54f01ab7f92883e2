//! Songbird-backed voice transport: one call and at most one decoded
//! stream session per guild.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use songbird::error::JoinError;
use songbird::input::HttpRequest;
use songbird::tracks::TrackHandle;
use songbird::{Event as SongbirdEvent, EventContext, EventHandler as SongbirdEventHandler};
use songbird::{Songbird, TrackEvent};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker};
use uuid::Uuid;

use volnabot_common::error::Error;
use volnabot_common::traits::voice_traits::{StreamEnded, VoiceTransport};

pub struct SongbirdVoice {
    songbird: Arc<Songbird>,
    stream_http: reqwest::Client,
    handles: DashMap<Id<GuildMarker>, TrackHandle>,
    ended_tx: UnboundedSender<StreamEnded>,
}

impl SongbirdVoice {
    pub fn new(songbird: Arc<Songbird>, ended_tx: UnboundedSender<StreamEnded>) -> Self {
        Self {
            songbird,
            stream_http: reqwest::Client::new(),
            handles: DashMap::new(),
            ended_tx,
        }
    }
}

/// Forwards a track end/error event into the coordinator's channel.
struct TrackEndNotifier {
    guild_id: Id<GuildMarker>,
    stream_id: Uuid,
    errored: bool,
    tx: UnboundedSender<StreamEnded>,
}

#[async_trait]
impl SongbirdEventHandler for TrackEndNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<SongbirdEvent> {
        let _ = self.tx.send(StreamEnded {
            guild_id: self.guild_id,
            stream_id: self.stream_id,
            errored: self.errored,
        });
        None
    }
}

#[async_trait]
impl VoiceTransport for SongbirdVoice {
    async fn connect(
        &self,
        guild_id: Id<GuildMarker>,
        channel_id: Id<ChannelMarker>,
    ) -> Result<(), Error> {
        self.songbird
            .join(guild_id, channel_id)
            .await
            .map(|_call| ())
            .map_err(|e| Error::Platform(format!("voice join failed: {e}")))
    }

    async fn disconnect(&self, guild_id: Id<GuildMarker>) -> Result<(), Error> {
        self.handles.remove(&guild_id);
        match self.songbird.remove(guild_id).await {
            Ok(()) | Err(JoinError::NoCall) => Ok(()),
            Err(e) => Err(Error::Platform(format!("voice leave failed: {e}"))),
        }
    }

    async fn start_stream(&self, guild_id: Id<GuildMarker>, url: &str) -> Result<Uuid, Error> {
        let call = self
            .songbird
            .get(guild_id)
            .ok_or_else(|| Error::Platform("no active voice session".to_string()))?;
        let mut handler = call.lock().await;
        handler.stop();

        let source = HttpRequest::new(self.stream_http.clone(), url.to_string());
        let handle = handler.play_input(source.into());
        let stream_id = handle.uuid();

        for (event, errored) in [(TrackEvent::End, false), (TrackEvent::Error, true)] {
            let notifier = TrackEndNotifier {
                guild_id,
                stream_id,
                errored,
                tx: self.ended_tx.clone(),
            };
            if let Err(e) = handle.add_event(SongbirdEvent::Track(event), notifier) {
                debug!("guild {guild_id}: failed to attach track event: {e}");
            }
        }

        self.handles.insert(guild_id, handle);
        Ok(stream_id)
    }

    async fn stop_stream(&self, guild_id: Id<GuildMarker>) -> Result<(), Error> {
        // The handle leaves the map before the track stops, so the end
        // event this fires is recognized as a deliberate stop.
        if let Some((_, handle)) = self.handles.remove(&guild_id) {
            let _ = handle.stop();
        }
        if let Some(call) = self.songbird.get(guild_id) {
            call.lock().await.stop();
        }
        Ok(())
    }

    async fn set_stream_paused(
        &self,
        guild_id: Id<GuildMarker>,
        paused: bool,
    ) -> Result<(), Error> {
        let handle = self.handles.get(&guild_id).ok_or(Error::NothingPlaying)?;
        let result = if paused { handle.pause() } else { handle.play() };
        result.map_err(|e| Error::Platform(format!("track control failed: {e}")))
    }

    fn current_stream(&self, guild_id: Id<GuildMarker>) -> Option<Uuid> {
        self.handles.get(&guild_id).map(|h| h.uuid())
    }
}
