//! Background control-message reconciliation.
//!
//! Re-renders every guild's control message on a slow cycle. Unchanged
//! content is skipped; unreachable messages get their reference dropped
//! inside `refresh_controls`. The loop itself never exits on error.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval, sleep};

use crate::services::playback::PlaybackCoordinator;

const CYCLE: Duration = Duration::from_secs(5);
const PER_GUILD_PAUSE: Duration = Duration::from_millis(200);

pub async fn run_control_refresh_pass(coordinator: &PlaybackCoordinator) {
    for guild_id in coordinator.control_targets() {
        coordinator.refresh_controls(guild_id).await;
        sleep(PER_GUILD_PAUSE).await;
    }
}

/// Spawns the control-refresh loop. Passes never overlap; a slow pass
/// delays the next tick instead.
pub fn spawn_control_refresh(coordinator: Arc<PlaybackCoordinator>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(CYCLE);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_control_refresh_pass(&coordinator).await;
        }
    })
}
