//! Hand-off of finished match results to account progress

use tokio::sync::mpsc;
use tracing::info;

use crate::ws::protocol::{GameOverReason, MatchSummary, PlayerResult};

/// Outcome of one finished room, produced once at game over
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub code: String,
    pub reason: GameOverReason,
    pub wave: u32,
    pub score: u64,
    pub coins: u64,
    pub players: Vec<PlayerResult>,
}

impl MatchResult {
    pub fn new(code: String, summary: MatchSummary) -> Self {
        Self {
            code,
            reason: summary.reason,
            wave: summary.wave,
            score: summary.score,
            coins: summary.coins,
            players: summary.results,
        }
    }
}

/// Default consumer: records every result in the log.
///
/// Score and coin submission is owned by the account service; nothing is written here.
pub async fn log_results(mut rx: mpsc::Receiver<MatchResult>) {
    while let Some(result) = rx.recv().await {
        info!(
            room = %result.code,
            reason = ?result.reason,
            wave = result.wave,
            score = result.score,
            coins = result.coins,
            "Match result"
        );
        for player in &result.players {
            info!(
                room = %result.code,
                account_id = %player.account_id,
                name = %player.name,
                score = player.score,
                kills = player.kills,
                survived = player.survived,
                "Player result"
            );
        }
    }
}
