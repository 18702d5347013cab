//! Per-room task: countdown, fixed-rate ticks, post-game linger, destruction

use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info};

use crate::game::RoomPhase;
use crate::util::time::{tick_interval, TickClock};

use super::registry::{RoomHandle, RoomRegistry};
use super::results::MatchResult;

/// Start the scheduler for a room that just entered its countdown
pub fn spawn(registry: Arc<RoomRegistry>, code: String, live: RoomHandle) -> AbortHandle {
    tokio::spawn(run(registry, code, live)).abort_handle()
}

async fn run(registry: Arc<RoomRegistry>, code: String, live: RoomHandle) {
    let settings = registry.settings().clone();

    for seconds in (1..=settings.countdown_secs).rev() {
        let running = live.lock().room.countdown_tick(seconds);
        if !running {
            debug!(room = %code, "Countdown no longer running");
            return;
        }
        sleep(Duration::from_secs(1)).await;
    }
    let started = live.lock().room.start_match();
    if !started {
        return;
    }

    let mut ticker = interval(tick_interval(settings.tick_rate));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick completes immediately
    ticker.tick().await;
    let mut clock = TickClock::new();

    let summary = loop {
        ticker.tick().await;
        let dt = clock.delta();

        let finished = {
            let mut guard = live.lock();
            if guard.closed {
                return;
            }
            guard.room.tick(dt);
            (guard.room.phase() == RoomPhase::GameOver).then(|| guard.room.take_summary())
        };
        if let Some(summary) = finished {
            break summary;
        }
    };

    if let Some(summary) = summary {
        registry
            .publish_result(MatchResult::new(code.clone(), summary))
            .await;
    }

    info!(
        room = %code,
        linger_secs = settings.game_over_linger.as_secs(),
        "Room finished, scheduled for destruction"
    );
    sleep(settings.game_over_linger).await;
    registry.destroy_room(&code);
}
