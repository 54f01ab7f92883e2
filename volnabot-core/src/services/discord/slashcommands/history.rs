// File: volnabot-core/src/services/discord/slashcommands/history.rs

use std::sync::Arc;

use twilight_model::application::interaction::Interaction;

use volnabot_common::error::Error;

use crate::services::context::BotContext;

const DISPLAY_LIMIT: usize = 10;

/// Handles `/history`: the last few titles observed for the guild.
pub async fn handle_history(ctx: &Arc<BotContext>, interaction: &Interaction) -> Result<(), Error> {
    let Some(guild_id) = interaction.guild_id else {
        return super::reply(ctx, interaction, "Эта команда работает только на сервере.", true)
            .await;
    };

    let Some(state) = ctx.coordinator.snapshot(guild_id) else {
        return super::reply(ctx, interaction, "Сейчас ничего не играет.", true).await;
    };

    let station = ctx
        .coordinator
        .catalog()
        .at(state.station_index)
        .map(|s| s.name.clone())
        .unwrap_or_default();

    if state.history.is_empty() {
        let text = format!("История пуста для станции `{station}`.");
        return super::reply(ctx, interaction, &text, true).await;
    }

    let tail = &state.history[state.history.len().saturating_sub(DISPLAY_LIMIT)..];
    let lines = tail
        .iter()
        .enumerate()
        .map(|(n, title)| format!("{}. {title}", n + 1))
        .collect::<Vec<_>>()
        .join("\n");
    let text = format!(
        "**История треков для `{station}` (последние {}):**\n{lines}",
        tail.len()
    );
    super::reply(ctx, interaction, &text, false).await
}
