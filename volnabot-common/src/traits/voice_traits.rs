use async_trait::async_trait;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker};
use uuid::Uuid;

use crate::error::Error;

/// Capability handle over the voice subsystem: connection lifecycle plus
/// the single decoded stream session per guild.
///
/// At most one stream session exists per guild; callers stop the previous
/// session before starting another.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Joins the given voice channel, or moves an existing session to it.
    async fn connect(
        &self,
        guild_id: Id<GuildMarker>,
        channel_id: Id<ChannelMarker>,
    ) -> Result<(), Error>;

    /// Leaves the guild's voice channel. Tolerates not being connected.
    async fn disconnect(&self, guild_id: Id<GuildMarker>) -> Result<(), Error>;

    /// Starts decoding the stream URL into the guild's voice session and
    /// returns the identifier of the new stream session.
    async fn start_stream(&self, guild_id: Id<GuildMarker>, url: &str) -> Result<Uuid, Error>;

    /// Stops the active stream session, if any.
    async fn stop_stream(&self, guild_id: Id<GuildMarker>) -> Result<(), Error>;

    /// Pauses or resumes the active stream session.
    async fn set_stream_paused(&self, guild_id: Id<GuildMarker>, paused: bool)
    -> Result<(), Error>;

    /// Identifier of the stream session currently installed for the guild.
    fn current_stream(&self, guild_id: Id<GuildMarker>) -> Option<Uuid>;
}

/// Emitted when a stream session terminates on its own (end of stream or
/// decoder error) rather than through [`VoiceTransport::stop_stream`].
#[derive(Debug, Clone)]
pub struct StreamEnded {
    pub guild_id: Id<GuildMarker>,
    pub stream_id: Uuid,
    pub errored: bool,
}
