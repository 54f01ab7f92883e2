pub mod playback;
pub mod station;
