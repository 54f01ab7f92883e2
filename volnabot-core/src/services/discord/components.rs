// File: volnabot-core/src/services/discord/components.rs
//! Button-press dispatch for the playback control message.

use std::sync::Arc;

use tracing::debug;
use twilight_model::application::interaction::Interaction;
use twilight_model::application::interaction::message_component::MessageComponentInteractionData;
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseType};

use volnabot_common::error::Error;

use crate::services::context::BotContext;
use crate::services::discord::slashcommands;
use crate::services::playback::SwitchDirection;

pub const PREV_BUTTON: &str = "prev_station";
pub const PAUSE_BUTTON: &str = "pause_station";
pub const RESUME_BUTTON: &str = "resume_station";
pub const STOP_BUTTON: &str = "stop_station";
pub const NEXT_BUTTON: &str = "next_station";

/// Routes a control-message button press to the coordinator.
pub async fn handle_component(
    ctx: &Arc<BotContext>,
    interaction: &Interaction,
    data: &MessageComponentInteractionData,
) -> Result<(), Error> {
    let Some(guild_id) = interaction.guild_id else {
        return Ok(());
    };
    let Some(message) = interaction.message.as_ref() else {
        return Ok(());
    };

    // A press on anything but the current control message gets a stale
    // notice, and the orphaned message itself is removed.
    if !ctx.coordinator.is_current_control(guild_id, message.id) {
        let text = slashcommands::describe_error(ctx.coordinator.catalog(), &Error::StaleControl);
        let _ = slashcommands::reply(ctx, interaction, &text, true).await;
        if let Err(e) = ctx.http.delete_message(message.channel_id, message.id).await {
            debug!("failed to delete stale control message: {e}");
        }
        return Ok(());
    }

    // Ack first; the guild lock may hold the operation for a while.
    slashcommands::respond(
        ctx,
        interaction,
        &InteractionResponse {
            kind: InteractionResponseType::DeferredUpdateMessage,
            data: None,
        },
    )
    .await?;

    let outcome = match data.custom_id.as_str() {
        PREV_BUTTON => ctx
            .coordinator
            .switch_station(guild_id, SwitchDirection::Previous)
            .await
            .map(|_| None),
        NEXT_BUTTON => ctx
            .coordinator
            .switch_station(guild_id, SwitchDirection::Next)
            .await
            .map(|_| None),
        PAUSE_BUTTON => ctx.coordinator.set_paused(guild_id, true).await.map(|_| None),
        RESUME_BUTTON => ctx
            .coordinator
            .set_paused(guild_id, false)
            .await
            .map(|_| None),
        STOP_BUTTON => match ctx.coordinator.stop(guild_id).await {
            Ok(true) => Ok(Some(
                "⏹️ Воспроизведение остановлено, бот покинул канал.".to_string(),
            )),
            Ok(false) => Ok(Some("Сейчас ничего не играет.".to_string())),
            Err(e) => Err(e),
        },
        other => {
            debug!("unrecognized component: {other}");
            Ok(None)
        }
    };

    match outcome {
        Ok(Some(text)) => slashcommands::followup_ephemeral(ctx, interaction, &text).await,
        Ok(None) => Ok(()),
        Err(err) => {
            let text = slashcommands::describe_error(ctx.coordinator.catalog(), &err);
            slashcommands::followup_ephemeral(ctx, interaction, &text).await
        }
    }
}
