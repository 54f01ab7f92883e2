//! Background track-metadata polling.
//!
//! One pass per cycle over every active guild; a small inter-guild pause
//! throttles the fan-out. Per-guild failures are contained inside
//! `poll_track` and never stop a pass.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval, sleep};
use tracing::trace;

use crate::services::playback::PlaybackCoordinator;

const CYCLE: Duration = Duration::from_secs(1);
const PER_GUILD_PAUSE: Duration = Duration::from_millis(200);

pub async fn run_track_update_pass(coordinator: &PlaybackCoordinator) {
    for (guild_id, paused) in coordinator.active_guilds() {
        if paused {
            continue;
        }
        if let Some(title) = coordinator.poll_track(guild_id).await {
            trace!("guild {guild_id}: now playing `{title}`");
        }
        sleep(PER_GUILD_PAUSE).await;
    }
}

/// Spawns the track-update loop. Passes never overlap; a slow pass delays
/// the next tick instead.
pub fn spawn_track_updater(coordinator: Arc<PlaybackCoordinator>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(CYCLE);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_track_update_pass(&coordinator).await;
        }
    })
}
