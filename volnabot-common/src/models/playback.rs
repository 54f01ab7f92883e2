use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, MessageMarker};

/// Upper bound on the per-guild track history.
pub const MAX_HISTORY: usize = 20;

/// Reference to the single control message a guild currently owns.
#[derive(Debug, Clone)]
pub struct ControlMessageRef {
    pub channel_id: Id<ChannelMarker>,
    pub message_id: Id<MessageMarker>,
    /// Content of the last successful render, used to skip no-op edits.
    pub last_rendered: String,
}

/// The authoritative in-memory playback record for one guild.
#[derive(Debug, Clone)]
pub struct GuildPlaybackState {
    pub station_index: usize,
    pub paused: bool,
    pub current_track: Option<String>,
    pub history: Vec<String>,
    pub controls: Option<ControlMessageRef>,
}

impl GuildPlaybackState {
    pub fn new(station_index: usize) -> Self {
        Self {
            station_index,
            paused: false,
            current_track: None,
            history: Vec::new(),
            controls: None,
        }
    }

    /// Records a freshly observed track title. Consecutive duplicates are
    /// not appended to the history, which is capped at [`MAX_HISTORY`]
    /// entries, oldest first out.
    pub fn record_track(&mut self, title: &str) {
        self.current_track = Some(title.to_string());
        if self.history.last().map(String::as_str) == Some(title) {
            return;
        }
        self.history.push(title.to_string());
        if self.history.len() > MAX_HISTORY {
            let overflow = self.history.len() - MAX_HISTORY;
            self.history.drain(..overflow);
        }
    }

    /// Resets the per-station fields when playback moves to a new station.
    /// The control-message reference survives; the message is edited in
    /// place rather than replaced.
    pub fn reset_for_station(&mut self, station_index: usize) {
        self.station_index = station_index;
        self.paused = false;
        self.current_track = None;
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_track_skips_consecutive_duplicates() {
        let mut state = GuildPlaybackState::new(0);
        state.record_track("Artist - Song");
        state.record_track("Artist - Song");
        state.record_track("Other - Tune");
        state.record_track("Artist - Song");

        assert_eq!(
            state.history,
            vec!["Artist - Song", "Other - Tune", "Artist - Song"]
        );
        assert_eq!(state.current_track.as_deref(), Some("Artist - Song"));
    }

    #[test]
    fn history_is_capped_at_twenty_entries() {
        let mut state = GuildPlaybackState::new(0);
        for n in 0..25 {
            state.record_track(&format!("track {n}"));
        }

        assert_eq!(state.history.len(), MAX_HISTORY);
        assert_eq!(state.history.first().map(String::as_str), Some("track 5"));
        assert_eq!(state.history.last().map(String::as_str), Some("track 24"));
    }

    #[test]
    fn reset_clears_track_fields_but_keeps_controls() {
        let mut state = GuildPlaybackState::new(0);
        state.record_track("Artist - Song");
        state.paused = true;
        state.controls = Some(ControlMessageRef {
            channel_id: Id::new(10),
            message_id: Id::new(11),
            last_rendered: "old".to_string(),
        });

        state.reset_for_station(3);

        assert_eq!(state.station_index, 3);
        assert!(!state.paused);
        assert!(state.current_track.is_none());
        assert!(state.history.is_empty());
        assert!(state.controls.is_some());
    }
}
