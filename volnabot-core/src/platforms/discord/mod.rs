pub mod runtime;
pub mod surface;
pub mod voice;

pub use runtime::DiscordPlatform;
pub use surface::DiscordSurface;
pub use voice::SongbirdVoice;
