// File: volnabot-core/src/services/discord/slashcommands/play.rs

use std::sync::Arc;

use twilight_model::application::command::{CommandOptionChoice, CommandOptionChoiceValue};
use twilight_model::application::interaction::Interaction;
use twilight_model::application::interaction::application_command::{
    CommandData, CommandOptionValue,
};
use twilight_model::http::interaction::{
    InteractionResponse, InteractionResponseData, InteractionResponseType,
};

use volnabot_common::error::Error;

use crate::services::context::BotContext;

const DEFAULT_STATION: &str = "record";
const MAX_SUGGESTIONS: usize = 25;

fn station_argument(data: &CommandData) -> Option<String> {
    data.options.iter().find_map(|opt| {
        if opt.name == "station" {
            if let CommandOptionValue::String(value) = &opt.value {
                return Some(value.clone());
            }
        }
        None
    })
}

/// Handles `/play [station]`.
pub async fn handle_play(
    ctx: &Arc<BotContext>,
    interaction: &Interaction,
    data: &CommandData,
) -> Result<(), Error> {
    let requested = station_argument(data).unwrap_or_else(|| DEFAULT_STATION.to_string());

    // Voice connect can take a while; ack first, fill in afterwards.
    super::defer(ctx, interaction, true).await?;

    let catalog = ctx.coordinator.catalog();
    let Some(index) = catalog.resolve(&requested) else {
        let text = super::describe_error(catalog, &Error::UnknownStation(requested));
        return super::edit_deferred(ctx, interaction, &text).await;
    };
    let station_name = catalog
        .at(index)
        .map(|s| s.name.clone())
        .unwrap_or_default();

    let (Some(guild_id), Some(channel)) = (interaction.guild_id, interaction.channel.as_ref())
    else {
        return super::edit_deferred(ctx, interaction, "Эта команда работает только на сервере.")
            .await;
    };

    let voice_channel = interaction
        .author_id()
        .and_then(|user_id| ctx.cache.voice_state(user_id, guild_id))
        .map(|vs| vs.channel_id());

    match ctx
        .coordinator
        .start(guild_id, channel.id, voice_channel, index)
        .await
    {
        Ok(()) => {
            let text = format!("▶️ Включаю станцию **{station_name}**");
            super::edit_deferred(ctx, interaction, &text).await
        }
        Err(err) => {
            let text = super::describe_error(ctx.coordinator.catalog(), &err);
            super::edit_deferred(ctx, interaction, &text).await
        }
    }
}

/// Offers case-insensitive substring completions for the station option.
pub async fn handle_station_autocomplete(
    ctx: &Arc<BotContext>,
    interaction: &Interaction,
    data: &CommandData,
) -> Result<(), Error> {
    let current = data
        .options
        .iter()
        .find_map(|opt| match &opt.value {
            CommandOptionValue::Focused(value, _) => Some(value.to_lowercase()),
            _ => None,
        })
        .unwrap_or_default();

    let choices: Vec<CommandOptionChoice> = ctx
        .coordinator
        .catalog()
        .names()
        .filter(|name| name.to_lowercase().contains(&current))
        .take(MAX_SUGGESTIONS)
        .map(|name| CommandOptionChoice {
            name: name.to_string(),
            name_localizations: None,
            value: CommandOptionChoiceValue::String(name.to_string()),
        })
        .collect();

    super::respond(
        ctx,
        interaction,
        &InteractionResponse {
            kind: InteractionResponseType::ApplicationCommandAutocompleteResult,
            data: Some(InteractionResponseData {
                choices: Some(choices),
                ..Default::default()
            }),
        },
    )
    .await
}
