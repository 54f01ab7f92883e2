//! Discord implementation of the guild-facing control surface.

use std::sync::Arc;

use async_trait::async_trait;
use twilight_gateway::MessageSender;
use twilight_http::Client as HttpClient;
use twilight_model::channel::message::component::{ActionRow, Button, ButtonStyle, Component};
use twilight_model::gateway::OpCode;
use twilight_model::gateway::payload::outgoing::update_presence::{
    UpdatePresence, UpdatePresencePayload,
};
use twilight_model::gateway::presence::{Activity, ActivityType, MinimalActivity, Status};
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;

use volnabot_common::error::Error;
use volnabot_common::models::playback::ControlMessageRef;
use volnabot_common::traits::surface_traits::ControlSurface;

use crate::services::discord::components::{
    NEXT_BUTTON, PAUSE_BUTTON, PREV_BUTTON, RESUME_BUTTON, STOP_BUTTON,
};

pub struct DiscordSurface {
    http: Arc<HttpClient>,
    shard_senders: Vec<MessageSender>,
}

impl DiscordSurface {
    pub fn new(http: Arc<HttpClient>, shard_senders: Vec<MessageSender>) -> Self {
        Self {
            http,
            shard_senders,
        }
    }
}

fn button(custom_id: &str, label: &str, style: ButtonStyle) -> Component {
    Component::Button(Button {
        custom_id: Some(custom_id.to_string()),
        disabled: false,
        emoji: None,
        label: Some(label.to_string()),
        style,
        url: None,
        sku_id: None,
    })
}

/// The persistent five-button playback row.
fn control_components() -> Vec<Component> {
    vec![Component::ActionRow(ActionRow {
        components: vec![
            button(PREV_BUTTON, "⏮️ Предыдущая", ButtonStyle::Primary),
            button(PAUSE_BUTTON, "⏸️ Пауза", ButtonStyle::Secondary),
            button(RESUME_BUTTON, "▶️ Продолжить", ButtonStyle::Secondary),
            button(STOP_BUTTON, "⏹️ Стоп", ButtonStyle::Danger),
            button(NEXT_BUTTON, "⏭️ Следующая", ButtonStyle::Primary),
        ],
    })]
}

#[async_trait]
impl ControlSurface for DiscordSurface {
    async fn publish_controls(
        &self,
        channel_id: Id<ChannelMarker>,
        content: &str,
    ) -> Result<ControlMessageRef, Error> {
        let components = control_components();
        let message = self
            .http
            .create_message(channel_id)
            .content(content)
            .components(&components)
            .await
            .map_err(|e| Error::NotificationDelivery(e.to_string()))?
            .model()
            .await
            .map_err(|e| Error::NotificationDelivery(e.to_string()))?;
        Ok(ControlMessageRef {
            channel_id: message.channel_id,
            message_id: message.id,
            last_rendered: String::new(),
        })
    }

    async fn edit_controls(&self, target: &ControlMessageRef, content: &str) -> Result<(), Error> {
        self.http
            .update_message(target.channel_id, target.message_id)
            .content(Some(content))
            .await
            .map(|_| ())
            .map_err(|e| Error::NotificationDelivery(e.to_string()))
    }

    async fn delete_controls(&self, target: &ControlMessageRef) -> Result<(), Error> {
        self.http
            .delete_message(target.channel_id, target.message_id)
            .await
            .map(|_| ())
            .map_err(|e| Error::NotificationDelivery(e.to_string()))
    }

    async fn post_notice(&self, channel_id: Id<ChannelMarker>, text: &str) -> Result<(), Error> {
        self.http
            .create_message(channel_id)
            .content(text)
            .await
            .map(|_| ())
            .map_err(|e| Error::NotificationDelivery(e.to_string()))
    }

    fn update_presence(&self, text: Option<&str>) -> Result<(), Error> {
        let activities = match text {
            Some(name) => vec![Activity::from(MinimalActivity {
                kind: ActivityType::Listening,
                name: name.to_string(),
                url: None,
            })],
            None => Vec::new(),
        };
        // Built directly so that an empty activity list (presence clear)
        // stays representable.
        let payload = UpdatePresence {
            d: UpdatePresencePayload {
                activities,
                afk: false,
                since: None,
                status: Status::Online,
            },
            op: OpCode::PresenceUpdate,
        };
        for sender in &self.shard_senders {
            sender
                .command(&payload)
                .map_err(|e| Error::NotificationDelivery(e.to_string()))?;
        }
        Ok(())
    }
}
