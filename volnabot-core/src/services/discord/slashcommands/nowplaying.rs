// File: volnabot-core/src/services/discord/slashcommands/nowplaying.rs

use std::sync::Arc;

use twilight_model::application::interaction::Interaction;

use volnabot_common::error::Error;

use crate::services::context::BotContext;

/// Handles `/nowplaying`: current station name plus the paused flag.
pub async fn handle_nowplaying(
    ctx: &Arc<BotContext>,
    interaction: &Interaction,
) -> Result<(), Error> {
    let Some(guild_id) = interaction.guild_id else {
        return super::reply(ctx, interaction, "Эта команда работает только на сервере.", true)
            .await;
    };

    match ctx.coordinator.snapshot(guild_id) {
        Some(state) => {
            let name = ctx
                .coordinator
                .catalog()
                .at(state.station_index)
                .map(|s| s.name.clone())
                .unwrap_or_default();
            let mut text = format!("🔊 Сейчас играет: **{name}**");
            if state.paused {
                text.push_str(" (на паузе)");
            }
            super::reply(ctx, interaction, &text, false).await
        }
        None => super::reply(ctx, interaction, "Сейчас ничего не играет.", true).await,
    }
}
