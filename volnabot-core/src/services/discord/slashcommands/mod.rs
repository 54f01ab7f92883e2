// File: volnabot-core/src/services/discord/slashcommands/mod.rs

pub mod history;
pub mod nowplaying;
pub mod play;
pub mod stations;
pub mod track;

use std::sync::Arc;

use tracing::debug;
use twilight_http::Client as HttpClient;
use twilight_model::{
    application::{
        command::CommandType,
        interaction::{Interaction, InteractionData, InteractionType},
    },
    channel::message::MessageFlags,
    gateway::payload::incoming::InteractionCreate,
    http::interaction::{InteractionResponse, InteractionResponseData, InteractionResponseType},
    id::Id,
    id::marker::ApplicationMarker,
};
use twilight_util::builder::command::{CommandBuilder, StringBuilder};

use volnabot_common::error::Error;

use crate::catalog::StationCatalog;
use crate::services::context::BotContext;
use crate::services::discord::components;

/// Registers the bot's global slash commands.
pub async fn register_global_slash_commands(
    http: &Arc<HttpClient>,
    application_id: Id<ApplicationMarker>,
) -> Result<(), Error> {
    let commands = &[
        CommandBuilder::new(
            "play",
            "Включить станцию Radio Record в голосовом канале",
            CommandType::ChatInput,
        )
        .dm_permission(false)
        .option(
            StringBuilder::new("station", "Название станции (например: record, russian_mix, ...)")
                .autocomplete(true),
        )
        .build(),
        CommandBuilder::new(
            "stations",
            "Показать все доступные станции Radio Record",
            CommandType::ChatInput,
        )
        .dm_permission(false)
        .build(),
        CommandBuilder::new(
            "nowplaying",
            "Показать, какая станция сейчас играет",
            CommandType::ChatInput,
        )
        .dm_permission(false)
        .build(),
        CommandBuilder::new("track", "Показать текущий трек станции", CommandType::ChatInput)
            .dm_permission(false)
            .build(),
        CommandBuilder::new(
            "history",
            "Показать историю треков текущей станции",
            CommandType::ChatInput,
        )
        .dm_permission(false)
        .build(),
    ];

    http.interaction(application_id)
        .set_global_commands(commands)
        .await
        .map_err(|e| Error::Platform(format!("Failed to register global slash commands: {e}")))?;

    Ok(())
}

/// Dispatch slash commands, autocompletes and button presses from an
/// `InteractionCreate`.
pub async fn handle_interaction_create(
    ctx: &Arc<BotContext>,
    event: &InteractionCreate,
) -> Result<(), Error> {
    let interaction = &event.0;

    match &interaction.data {
        Some(InteractionData::ApplicationCommand(data)) => {
            if interaction.kind == InteractionType::ApplicationCommandAutocomplete {
                return play::handle_station_autocomplete(ctx, interaction, data).await;
            }
            match data.name.as_str() {
                "play" => play::handle_play(ctx, interaction, data).await,
                "stations" => stations::handle_stations(ctx, interaction).await,
                "nowplaying" => nowplaying::handle_nowplaying(ctx, interaction).await,
                "track" => track::handle_track(ctx, interaction).await,
                "history" => history::handle_history(ctx, interaction).await,
                other => {
                    debug!("unrecognized command: {other}");
                    respond(
                        ctx,
                        interaction,
                        &InteractionResponse {
                            kind: InteractionResponseType::ChannelMessageWithSource,
                            data: Some(InteractionResponseData {
                                content: Some(format!("Unrecognized command: {other}")),
                                flags: Some(MessageFlags::EPHEMERAL),
                                ..Default::default()
                            }),
                        },
                    )
                    .await
                }
            }
        }
        Some(InteractionData::MessageComponent(data)) => {
            components::handle_component(ctx, interaction, data).await
        }
        _ => Ok(()),
    }
}

/// Sends an immediate interaction response.
pub(crate) async fn respond(
    ctx: &Arc<BotContext>,
    interaction: &Interaction,
    response: &InteractionResponse,
) -> Result<(), Error> {
    ctx.http
        .interaction(ctx.application_id)
        .create_response(interaction.id, &interaction.token, response)
        .await
        .map(|_| ())
        .map_err(|e| Error::NotificationDelivery(e.to_string()))
}

/// Sends a plain message response; `ephemeral` keeps it visible to the
/// requester only.
pub(crate) async fn reply(
    ctx: &Arc<BotContext>,
    interaction: &Interaction,
    text: &str,
    ephemeral: bool,
) -> Result<(), Error> {
    respond(
        ctx,
        interaction,
        &InteractionResponse {
            kind: InteractionResponseType::ChannelMessageWithSource,
            data: Some(InteractionResponseData {
                content: Some(text.to_string()),
                flags: ephemeral.then_some(MessageFlags::EPHEMERAL),
                ..Default::default()
            }),
        },
    )
    .await
}

/// Acknowledges the interaction so slower work can follow up later.
pub(crate) async fn defer(
    ctx: &Arc<BotContext>,
    interaction: &Interaction,
    ephemeral: bool,
) -> Result<(), Error> {
    respond(
        ctx,
        interaction,
        &InteractionResponse {
            kind: InteractionResponseType::DeferredChannelMessageWithSource,
            data: ephemeral.then(|| InteractionResponseData {
                flags: Some(MessageFlags::EPHEMERAL),
                ..Default::default()
            }),
        },
    )
    .await
}

/// Fills in the deferred response created by [`defer`].
pub(crate) async fn edit_deferred(
    ctx: &Arc<BotContext>,
    interaction: &Interaction,
    text: &str,
) -> Result<(), Error> {
    ctx.http
        .interaction(ctx.application_id)
        .update_response(&interaction.token)
        .content(Some(text))
        .await
        .map(|_| ())
        .map_err(|e| Error::NotificationDelivery(e.to_string()))
}

/// Sends an ephemeral followup to an already acknowledged interaction.
pub(crate) async fn followup_ephemeral(
    ctx: &Arc<BotContext>,
    interaction: &Interaction,
    text: &str,
) -> Result<(), Error> {
    ctx.http
        .interaction(ctx.application_id)
        .create_followup(&interaction.token)
        .content(text)
        .flags(MessageFlags::EPHEMERAL)
        .await
        .map(|_| ())
        .map_err(|e| Error::NotificationDelivery(e.to_string()))
}

/// Terse user-facing line for a playback error.
pub(crate) fn describe_error(catalog: &StationCatalog, err: &Error) -> String {
    match err {
        Error::NoVoiceChannel => "Сначала зайди в голосовой канал!".to_string(),
        Error::VoiceConnectFailed(e) => format!("Ошибка подключения: {e}"),
        Error::StreamStartFailed(e) => format!("Не удалось запустить поток: {e}"),
        Error::NothingPlaying => "Сейчас ничего не играет.".to_string(),
        Error::AlreadyPaused => "Поток уже на паузе.".to_string(),
        Error::AlreadyPlaying => "Поток уже играет.".to_string(),
        Error::UnknownStation(name) => {
            let available = catalog.names().collect::<Vec<_>>().join(", ");
            format!("❌ Неизвестная станция: {name}\nДоступные: {available}")
        }
        Error::StaleControl => {
            "Это устаревшее сообщение управления. Используйте последнее сообщение от бота."
                .to_string()
        }
        _ => "Что-то пошло не так.".to_string(),
    }
}
