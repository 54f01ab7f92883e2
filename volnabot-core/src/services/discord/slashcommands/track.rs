// File: volnabot-core/src/services/discord/slashcommands/track.rs

use std::sync::Arc;

use twilight_model::application::interaction::Interaction;

use volnabot_common::error::Error;

use crate::services::context::BotContext;

/// Handles `/track`: reports the cached title, fetching one lazily when
/// nothing is cached and the stream is not paused.
pub async fn handle_track(ctx: &Arc<BotContext>, interaction: &Interaction) -> Result<(), Error> {
    let Some(guild_id) = interaction.guild_id else {
        return super::reply(ctx, interaction, "Эта команда работает только на сервере.", true)
            .await;
    };

    // The lazy fetch goes out over the network; ack first.
    super::defer(ctx, interaction, false).await?;

    match ctx.coordinator.current_or_fetch_track(guild_id).await {
        Ok((station, Some(title))) => {
            let text = format!("🎧 Трек: **{title}** (станция: `{station}`)");
            super::edit_deferred(ctx, interaction, &text).await
        }
        Ok((station, None)) => {
            let text = format!("Текущий трек недоступен. Станция: `{station}`");
            super::edit_deferred(ctx, interaction, &text).await
        }
        Err(err) => {
            let text = super::describe_error(ctx.coordinator.catalog(), &err);
            super::edit_deferred(ctx, interaction, &text).await
        }
    }
}
