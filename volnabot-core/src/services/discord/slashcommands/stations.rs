// File: volnabot-core/src/services/discord/slashcommands/stations.rs

use std::sync::Arc;

use twilight_model::application::interaction::Interaction;

use volnabot_common::error::Error;

use crate::services::context::BotContext;

/// Handles `/stations`: lists every catalog name.
pub async fn handle_stations(ctx: &Arc<BotContext>, interaction: &Interaction) -> Result<(), Error> {
    let list = ctx
        .coordinator
        .catalog()
        .names()
        .map(|name| format!("- `{name}`"))
        .collect::<Vec<_>>()
        .join("\n");
    let text = format!("**Доступные станции:**\n{list}");
    super::reply(ctx, interaction, &text, true).await
}
