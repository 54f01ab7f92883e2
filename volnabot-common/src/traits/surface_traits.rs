use async_trait::async_trait;
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;

use crate::error::Error;
use crate::models::playback::ControlMessageRef;

/// The guild-facing UI surface: the control message bearing the playback
/// buttons, plain text notices, and the bot presence line.
///
/// Delivery here is best-effort from the caller's point of view; a failed
/// edit or delete never rolls back a playback-state change.
#[async_trait]
pub trait ControlSurface: Send + Sync {
    /// Posts a fresh control message and returns its reference.
    async fn publish_controls(
        &self,
        channel_id: Id<ChannelMarker>,
        content: &str,
    ) -> Result<ControlMessageRef, Error>;

    /// Edits an existing control message in place.
    async fn edit_controls(&self, target: &ControlMessageRef, content: &str) -> Result<(), Error>;

    /// Deletes a control message.
    async fn delete_controls(&self, target: &ControlMessageRef) -> Result<(), Error>;

    /// Posts a plain text notice to a channel.
    async fn post_notice(&self, channel_id: Id<ChannelMarker>, text: &str) -> Result<(), Error>;

    /// Replaces the bot presence line; `None` clears it.
    fn update_presence(&self, text: Option<&str>) -> Result<(), Error>;
}
