// volnabot-common/src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("requester is not in a voice channel")]
    NoVoiceChannel,

    #[error("voice connect failed: {0}")]
    VoiceConnectFailed(String),

    #[error("stream start failed: {0}")]
    StreamStartFailed(String),

    #[error("nothing is playing in this guild")]
    NothingPlaying,

    #[error("stream is already paused")]
    AlreadyPaused,

    #[error("stream is already playing")]
    AlreadyPlaying,

    #[error("unknown station: {0}")]
    UnknownStation(String),

    #[error("control message is stale")]
    StaleControl,

    #[error("notification delivery failed: {0}")]
    NotificationDelivery(String),
}
