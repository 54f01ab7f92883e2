//! Per-guild playback coordination.
//!
//! Every state-mutating operation for one guild runs under that guild's
//! mutex, acquired in arrival order (tokio mutexes hand out the lock
//! FIFO). The reconciler loops in [`crate::tasks`] deliberately do not
//! take this lock; they only touch `current_track`, `history` and the
//! control-message mirror fields, and a stale read during a concurrent
//! switch is corrected on their next pass.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker};

use volnabot_common::models::playback::GuildPlaybackState;
use volnabot_common::traits::surface_traits::ControlSurface;
use volnabot_common::traits::voice_traits::{StreamEnded, VoiceTransport};

use crate::Error;
use crate::catalog::StationCatalog;
use crate::icy::IcyTitleFetcher;
use crate::services::render;

const CONNECT_ATTEMPTS: u32 = 3;
const CONNECT_BACKOFF: Duration = Duration::from_millis(1500);

/// Direction of a station switch relative to the current index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchDirection {
    Next,
    Previous,
}

/// Owns all per-guild playback state and the handles to the voice
/// transport and UI surface. One instance per process.
pub struct PlaybackCoordinator {
    catalog: Arc<StationCatalog>,
    voice: Arc<dyn VoiceTransport>,
    surface: Arc<dyn ControlSurface>,
    icy: Arc<IcyTitleFetcher>,
    states: DashMap<Id<GuildMarker>, GuildPlaybackState>,
    // Guild locks are never pruned; they are tiny and the set of guilds a
    // process ever serves is bounded.
    locks: DashMap<Id<GuildMarker>, Arc<Mutex<()>>>,
}

impl PlaybackCoordinator {
    pub fn new(
        catalog: Arc<StationCatalog>,
        voice: Arc<dyn VoiceTransport>,
        surface: Arc<dyn ControlSurface>,
        icy: Arc<IcyTitleFetcher>,
    ) -> Self {
        Self {
            catalog,
            voice,
            surface,
            icy,
            states: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    pub fn catalog(&self) -> &StationCatalog {
        &self.catalog
    }

    fn guild_lock(&self, guild_id: Id<GuildMarker>) -> Arc<Mutex<()>> {
        self.locks
            .entry(guild_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn station_name(&self, index: usize) -> String {
        self.catalog
            .at(index)
            .map(|s| s.name.clone())
            .unwrap_or_default()
    }

    /// Clone of the guild's current playback state.
    pub fn snapshot(&self, guild_id: Id<GuildMarker>) -> Option<GuildPlaybackState> {
        self.states.get(&guild_id).map(|s| s.clone())
    }

    /// Guilds with live state, paired with their paused flag.
    pub fn active_guilds(&self) -> Vec<(Id<GuildMarker>, bool)> {
        self.states
            .iter()
            .map(|entry| (*entry.key(), entry.paused))
            .collect()
    }

    /// Guilds that currently own a control message.
    pub fn control_targets(&self) -> Vec<Id<GuildMarker>> {
        self.states
            .iter()
            .filter(|entry| entry.controls.is_some())
            .map(|entry| *entry.key())
            .collect()
    }

    /// True when `message_id` is the guild's current control message.
    pub fn is_current_control(
        &self,
        guild_id: Id<GuildMarker>,
        message_id: Id<MessageMarker>,
    ) -> bool {
        self.states
            .get(&guild_id)
            .and_then(|s| s.controls.as_ref().map(|c| c.message_id))
            == Some(message_id)
    }

    /// Starts playback of `station_index` in the requester's voice channel.
    ///
    /// The requester must currently be in a voice channel. Connection is
    /// retried before giving up; any previously playing stream for the
    /// guild is stopped first and its control message replaced.
    pub async fn start(
        &self,
        guild_id: Id<GuildMarker>,
        text_channel: Id<ChannelMarker>,
        voice_channel: Option<Id<ChannelMarker>>,
        station_index: usize,
    ) -> Result<(), Error> {
        let Some(voice_channel) = voice_channel else {
            return Err(Error::NoVoiceChannel);
        };
        let station = self
            .catalog
            .at(station_index)
            .ok_or_else(|| Error::Platform(format!("station index {station_index} out of range")))?
            .clone();

        let lock = self.guild_lock(guild_id);
        let _guard = lock.lock().await;

        self.connect_with_retry(guild_id, voice_channel).await?;

        // Stop-before-start: never two live streams for one guild.
        let _ = self.voice.stop_stream(guild_id).await;
        if let Err(e) = self.voice.start_stream(guild_id, &station.url).await {
            // Never leave a playing record without a live session behind
            // it; an earlier session's control message must not dangle
            // either.
            if let Some((_, old)) = self.states.remove(&guild_id) {
                if let Some(stale) = old.controls {
                    let _ = self.surface.delete_controls(&stale).await;
                }
            }
            return Err(Error::StreamStartFailed(e.to_string()));
        }

        let previous_controls = self
            .states
            .insert(guild_id, GuildPlaybackState::new(station_index))
            .and_then(|old| old.controls);
        if let Some(stale) = previous_controls {
            if let Err(e) = self.surface.delete_controls(&stale).await {
                debug!("guild {guild_id}: failed to delete old control message: {e}");
            }
        }

        let content = render::compose_control_content(&station.name, false, None);
        match self.surface.publish_controls(text_channel, &content).await {
            Ok(mut controls) => {
                controls.last_rendered = content;
                if let Some(mut state) = self.states.get_mut(&guild_id) {
                    state.controls = Some(controls);
                }
            }
            Err(e) => warn!("guild {guild_id}: failed to publish control message: {e}"),
        }

        self.refresh_presence(guild_id);
        info!("guild {guild_id}: started station `{}`", station.name);
        Ok(())
    }

    async fn connect_with_retry(
        &self,
        guild_id: Id<GuildMarker>,
        channel_id: Id<ChannelMarker>,
    ) -> Result<(), Error> {
        let mut last_err = None;
        for attempt in 1..=CONNECT_ATTEMPTS {
            match self.voice.connect(guild_id, channel_id).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    debug!("guild {guild_id}: voice connect attempt {attempt} failed: {e}");
                    last_err = Some(e);
                    if attempt < CONNECT_ATTEMPTS {
                        tokio::time::sleep(CONNECT_BACKOFF).await;
                    }
                }
            }
        }
        Err(Error::VoiceConnectFailed(
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        ))
    }

    /// Switches to the next or previous station in catalog order, wrapping
    /// around at both ends. Returns the new station name.
    pub async fn switch_station(
        &self,
        guild_id: Id<GuildMarker>,
        direction: SwitchDirection,
    ) -> Result<String, Error> {
        let lock = self.guild_lock(guild_id);
        let _guard = lock.lock().await;

        let current = self.snapshot(guild_id).ok_or(Error::NothingPlaying)?;
        let new_index = match direction {
            SwitchDirection::Next => self.catalog.next(current.station_index),
            SwitchDirection::Previous => self.catalog.previous(current.station_index),
        };
        let station = self
            .catalog
            .at(new_index)
            .ok_or_else(|| Error::Platform(format!("station index {new_index} out of range")))?
            .clone();

        let _ = self.voice.stop_stream(guild_id).await;
        if let Err(e) = self.voice.start_stream(guild_id, &station.url).await {
            // Tear the guild down to idle instead of leaving a playing
            // record with no live session behind it.
            self.cleanup_guild(guild_id).await;
            return Err(Error::StreamStartFailed(e.to_string()));
        }

        if let Some(mut state) = self.states.get_mut(&guild_id) {
            state.reset_for_station(new_index);
        }
        self.refresh_controls(guild_id).await;
        self.refresh_presence(guild_id);
        info!("guild {guild_id}: switched to station `{}`", station.name);
        Ok(station.name)
    }

    /// Pauses or resumes the active stream. A request that matches the
    /// current pause state is answered with `AlreadyPaused` /
    /// `AlreadyPlaying` and changes nothing.
    pub async fn set_paused(&self, guild_id: Id<GuildMarker>, pause: bool) -> Result<(), Error> {
        let lock = self.guild_lock(guild_id);
        let _guard = lock.lock().await;

        let state = self.snapshot(guild_id).ok_or(Error::NothingPlaying)?;
        if state.paused == pause {
            return Err(if pause {
                Error::AlreadyPaused
            } else {
                Error::AlreadyPlaying
            });
        }

        self.voice.set_stream_paused(guild_id, pause).await?;
        if let Some(mut state) = self.states.get_mut(&guild_id) {
            state.paused = pause;
        }
        self.refresh_controls(guild_id).await;
        self.refresh_presence(guild_id);
        Ok(())
    }

    /// Stops playback and leaves the voice channel. Idempotent; returns
    /// `false` when there was nothing to stop.
    pub async fn stop(&self, guild_id: Id<GuildMarker>) -> Result<bool, Error> {
        let lock = self.guild_lock(guild_id);
        let _guard = lock.lock().await;

        let existed = self.states.contains_key(&guild_id);
        self.cleanup_guild(guild_id).await;
        Ok(existed)
    }

    /// Invoked when the gateway reports the bot outside any voice channel,
    /// e.g. after an admin disconnect. A no-op when `stop` already ran.
    pub async fn handle_bot_voice_disconnect(&self, guild_id: Id<GuildMarker>) {
        let lock = self.guild_lock(guild_id);
        let _guard = lock.lock().await;

        if !self.states.contains_key(&guild_id) {
            return;
        }
        info!("guild {guild_id}: voice session ended externally, cleaning up");
        self.cleanup_guild(guild_id).await;
    }

    /// Consumes a stream-termination event from the voice transport.
    /// Events for streams that were already stopped or replaced are
    /// ignored; a termination of the live stream posts a notice to the
    /// control channel and tears the guild down to idle.
    pub async fn handle_stream_end(&self, ended: StreamEnded) {
        let lock = self.guild_lock(ended.guild_id);
        let _guard = lock.lock().await;

        if self.voice.current_stream(ended.guild_id) != Some(ended.stream_id) {
            return;
        }
        let Some(state) = self.snapshot(ended.guild_id) else {
            return;
        };
        warn!(
            "guild {}: stream ended unexpectedly (errored: {})",
            ended.guild_id, ended.errored
        );
        if let Some(controls) = &state.controls {
            let _ = self
                .surface
                .post_notice(
                    controls.channel_id,
                    "⚠️ Поток прерван. Воспроизведение остановлено.",
                )
                .await;
        }
        self.cleanup_guild(ended.guild_id).await;
    }

    /// Polls ICY metadata for the guild's current station and folds a new
    /// title into state and presence. Returns the title when it changed.
    pub async fn poll_track(&self, guild_id: Id<GuildMarker>) -> Option<String> {
        let (index, paused) = {
            let state = self.states.get(&guild_id)?;
            (state.station_index, state.paused)
        };
        if paused {
            return None;
        }
        let url = self.catalog.at(index)?.url.clone();
        let title = self.icy.fetch_title(&url).await?;

        let changed = {
            let mut state = self.states.get_mut(&guild_id)?;
            if state.current_track.as_deref() == Some(title.as_str()) {
                false
            } else {
                state.record_track(&title);
                true
            }
        };
        if changed {
            self.refresh_presence(guild_id);
            return Some(title);
        }
        None
    }

    /// Current cached title for the guild, fetching one eagerly when
    /// absent and playing. Returns the station name alongside.
    pub async fn current_or_fetch_track(
        &self,
        guild_id: Id<GuildMarker>,
    ) -> Result<(String, Option<String>), Error> {
        let state = self.snapshot(guild_id).ok_or(Error::NothingPlaying)?;
        let name = self.station_name(state.station_index);
        if let Some(track) = state.current_track {
            return Ok((name, Some(track)));
        }
        if state.paused {
            return Ok((name, None));
        }
        Ok((name, self.poll_track(guild_id).await))
    }

    /// Re-renders the guild's control message when its content drifted
    /// from the last render. An unreachable message gets deleted
    /// best-effort and its reference dropped, never left dangling.
    pub async fn refresh_controls(&self, guild_id: Id<GuildMarker>) {
        let Some(state) = self.snapshot(guild_id) else {
            return;
        };
        let Some(controls) = state.controls else {
            return;
        };
        let name = self.station_name(state.station_index);
        let content =
            render::compose_control_content(&name, state.paused, state.current_track.as_deref());
        if controls.last_rendered == content {
            return;
        }
        match self.surface.edit_controls(&controls, &content).await {
            Ok(()) => {
                if let Some(mut state) = self.states.get_mut(&guild_id) {
                    if let Some(controls) = state.controls.as_mut() {
                        controls.last_rendered = content;
                    }
                }
            }
            Err(e) => {
                debug!("guild {guild_id}: control message unreachable ({e}), dropping reference");
                let _ = self.surface.delete_controls(&controls).await;
                if let Some(mut state) = self.states.get_mut(&guild_id) {
                    state.controls = None;
                }
            }
        }
    }

    /// Stops playback in every guild. Used at shutdown and by tests.
    pub async fn clear_all(&self) {
        let guilds: Vec<_> = self.states.iter().map(|entry| *entry.key()).collect();
        for guild_id in guilds {
            let _ = self.stop(guild_id).await;
        }
    }

    /// Removes every per-guild trace: stream, voice session, state record,
    /// control message, presence. Tolerates partial prior cleanup.
    async fn cleanup_guild(&self, guild_id: Id<GuildMarker>) {
        let _ = self.voice.stop_stream(guild_id).await;
        let _ = self.voice.disconnect(guild_id).await;
        if let Some((_, state)) = self.states.remove(&guild_id) {
            if let Some(controls) = state.controls {
                if let Err(e) = self.surface.delete_controls(&controls).await {
                    debug!("guild {guild_id}: failed to delete control message: {e}");
                }
            }
        }
        if let Err(e) = self.surface.update_presence(None) {
            debug!("failed to clear presence: {e}");
        }
    }

    fn refresh_presence(&self, guild_id: Id<GuildMarker>) {
        let Some(state) = self.snapshot(guild_id) else {
            return;
        };
        let name = self.station_name(state.station_index);
        let text =
            render::compose_presence_text(&name, state.paused, state.current_track.as_deref());
        if let Err(e) = self.surface.update_presence(Some(&text)) {
            debug!("guild {guild_id}: presence update failed: {e}");
        }
    }
}
