//! Rendering of the control-message body and the presence line.

/// Discord truncates activity names around this many characters.
const PRESENCE_LIMIT: usize = 128;

pub fn compose_control_content(station: &str, paused: bool, track: Option<&str>) -> String {
    let header = if paused {
        format!("⏸️ Воспроизведение на паузе: **{station}**")
    } else {
        format!("▶️ Воспроизведение продолжено: **{station}**")
    };
    let track_line = match track {
        Some(title) => format!("🎧 Трек: **{title}**"),
        None => "🎧 Трек: —".to_string(),
    };
    format!("{header}\n{track_line}")
}

pub fn compose_presence_text(station: &str, paused: bool, track: Option<&str>) -> String {
    let base = match track {
        Some(title) => format!("{station}: {title}"),
        None => station.to_string(),
    };
    let text = if paused {
        format!("⏸️ {base}")
    } else {
        format!("🎶 {base}")
    };
    if text.chars().count() > PRESENCE_LIMIT {
        let mut clipped: String = text.chars().take(PRESENCE_LIMIT - 3).collect();
        clipped.push_str("...");
        clipped
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_content_reflects_pause_flag() {
        let paused = compose_control_content("record", true, Some("Artist - Song"));
        assert!(paused.starts_with("⏸️"));
        assert!(paused.contains("Artist - Song"));

        let playing = compose_control_content("record", false, None);
        assert!(playing.starts_with("▶️"));
        assert!(playing.contains("—"));
    }

    #[test]
    fn presence_text_is_truncated() {
        let long_title = "x".repeat(300);
        let text = compose_presence_text("record", false, Some(&long_title));
        assert_eq!(text.chars().count(), 128);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn presence_text_marks_paused_state() {
        let text = compose_presence_text("record", true, None);
        assert_eq!(text, "⏸️ record");
    }
}
