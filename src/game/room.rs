//! Room state and the authoritative per-tick update

use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::game::combat::{CombatSystem, KillResult};
use crate::game::entities::{Bullet, Enemy, EnemyStats, Player, PlayerIdentity, Powerup};
use crate::game::physics::{PhysicsSystem, ARENA_HEIGHT, ARENA_WIDTH, PLAYER};
use crate::game::snapshot::build_snapshot;
use crate::game::waves::{self, WaveEvent, WaveState, POWERUP_LIFETIME, POWERUP_RADIUS};
use crate::game::InputUpdate;
use crate::ws::protocol::{
    ConnectionId, EnemyKind, GameOverReason, MatchSummary, PlayerResult, PowerupKind, RosterEntry,
    ServerMsg,
};

/// Players per room
pub const MAX_PLAYERS: usize = 2;

/// Outbound message queue of one connection
pub type Outbox = mpsc::Sender<ServerMsg>;

/// Room phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Accepting joins
    Waiting,
    /// Both seats filled, counting down
    Countdown,
    /// Tick loop running
    Playing,
    /// Terminal; room is scheduled for destruction
    GameOver,
}

/// Lookup failures reported to the requesting connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("No room with that code")]
    NotFound,

    #[error("That game has already started")]
    AlreadyStarted,

    #[error("Room is full")]
    Full,
}

impl RoomError {
    /// Stable wire code
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::NotFound => "not_found",
            RoomError::AlreadyStarted => "already_started",
            RoomError::Full => "room_full",
        }
    }
}

/// One match: its occupants, entities and phase
pub struct Room {
    pub(super) code: String,
    pub(super) phase: RoomPhase,
    pub(super) players: HashMap<ConnectionId, Player>,
    pub(super) host: Option<ConnectionId>,
    pub(super) enemies: HashMap<u64, Enemy>,
    pub(super) bullets: HashMap<u64, Bullet>,
    pub(super) powerups: HashMap<u64, Powerup>,
    pub(super) waves: WaveState,
    pub(super) score: u64,
    pub(super) coins: u64,
    pub(super) tick: u64,
    outboxes: HashMap<ConnectionId, Outbox>,
    next_entity_id: u64,
    next_join_seq: u64,
    rng: ChaCha8Rng,
    summary: Option<MatchSummary>,
}

impl Room {
    pub fn new(code: String, seed: u64) -> Self {
        Self {
            code,
            phase: RoomPhase::Waiting,
            players: HashMap::new(),
            host: None,
            enemies: HashMap::new(),
            bullets: HashMap::new(),
            powerups: HashMap::new(),
            waves: WaveState::new(),
            score: 0,
            coins: 0,
            tick: 0,
            outboxes: HashMap::new(),
            next_entity_id: 0,
            next_join_seq: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            summary: None,
        }
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player_ids(&self) -> Vec<ConnectionId> {
        self.players.keys().copied().collect()
    }

    /// Players in join order
    fn ordered_players(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by_key(|p| p.join_seq);
        players
    }

    fn alloc_id(&mut self) -> u64 {
        self.next_entity_id += 1;
        self.next_entity_id
    }

    fn spawn_point(slot: usize) -> (f32, f32) {
        let fraction = if slot == 0 { 0.4 } else { 0.6 };
        (fraction * ARENA_WIDTH, ARENA_HEIGHT / 2.0)
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Seat a player. The first occupant becomes host.
    pub fn add_player(
        &mut self,
        id: ConnectionId,
        identity: PlayerIdentity,
        outbox: Outbox,
    ) -> Result<(), RoomError> {
        if matches!(self.phase, RoomPhase::Playing | RoomPhase::GameOver) {
            return Err(RoomError::AlreadyStarted);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(RoomError::Full);
        }
        if self.phase != RoomPhase::Waiting {
            return Err(RoomError::AlreadyStarted);
        }

        let (x, y) = Self::spawn_point(self.players.len());
        let seq = self.next_join_seq;
        self.next_join_seq += 1;

        info!(
            room = %self.code,
            conn = %id,
            name = %identity.display_name,
            player_count = self.players.len() + 1,
            "Player joined room"
        );

        self.players.insert(id, Player::new(id, identity, seq, x, y));
        self.outboxes.insert(id, outbox);
        if self.host.is_none() {
            self.host = Some(id);
        }
        Ok(())
    }

    /// Remove a player and apply the consequences for the phase the room is in.
    ///
    /// Leaving during the countdown drops the room back to `Waiting`; leaving mid-match ends it.
    pub fn remove_player(&mut self, id: &ConnectionId) -> Option<Player> {
        // Last occupant leaving mid-match still produces a result that includes them
        if self.phase == RoomPhase::Playing
            && self.players.len() == 1
            && self.players.contains_key(id)
        {
            self.end_match(GameOverReason::PartnerDisconnected);
        }
        let player = self.players.remove(id)?;
        self.outboxes.remove(id);

        info!(
            room = %self.code,
            conn = %id,
            phase = ?self.phase,
            remaining = self.players.len(),
            "Player left room"
        );

        if self.host == Some(*id) {
            self.host = self.ordered_players().first().map(|p| p.id);
        }

        if self.players.is_empty() {
            return Some(player);
        }

        self.broadcast(ServerMsg::PartnerLeft {
            player_id: player.id,
            name: player.name().to_string(),
        });

        match self.phase {
            RoomPhase::Countdown => {
                self.phase = RoomPhase::Waiting;
                info!(room = %self.code, "Countdown cancelled, back to waiting");
                self.broadcast_roster();
            }
            RoomPhase::Waiting => self.broadcast_roster(),
            RoomPhase::Playing => {
                self.end_match(GameOverReason::PartnerDisconnected);
            }
            RoomPhase::GameOver => {}
        }

        Some(player)
    }

    /// Merge sanitized input into the player's stored snapshot; read by the next tick
    pub fn apply_input(&mut self, id: &ConnectionId, update: &InputUpdate) {
        if let Some(player) = self.players.get_mut(id) {
            update.apply_to(&mut player.input);
        }
    }

    pub fn roster(&self) -> Vec<RosterEntry> {
        let mut players = self.ordered_players();
        // Host first, then join order
        players.sort_by_key(|p| Some(p.id) != self.host);
        players
            .into_iter()
            .map(|p| RosterEntry {
                id: p.id,
                name: p.identity.display_name.clone(),
                cosmetic: p.identity.cosmetic.clone(),
                is_host: Some(p.id) == self.host,
            })
            .collect()
    }

    pub fn broadcast_roster(&self) {
        self.broadcast(ServerMsg::RoomRoster {
            players: self.roster(),
        });
    }

    // ------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------

    /// Queue a message for one occupant. Never blocks; a full queue drops the message.
    pub fn send_to(&self, id: &ConnectionId, msg: ServerMsg) {
        let Some(outbox) = self.outboxes.get(id) else {
            return;
        };
        match outbox.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(room = %self.code, conn = %id, "Outbound queue full, dropping message");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(room = %self.code, conn = %id, "Outbound queue closed");
            }
        }
    }

    /// Queue a message for every occupant
    pub fn broadcast(&self, msg: ServerMsg) {
        for id in self.outboxes.keys() {
            self.send_to(id, msg.clone());
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// `Waiting` -> `Countdown`, only with a full room
    pub fn begin_countdown(&mut self) -> bool {
        if self.phase != RoomPhase::Waiting || self.players.len() < MAX_PLAYERS {
            return false;
        }
        self.phase = RoomPhase::Countdown;
        info!(room = %self.code, "Countdown started");
        true
    }

    /// Announce seconds remaining; false once the countdown is no longer running
    pub fn countdown_tick(&self, seconds: u32) -> bool {
        if self.phase != RoomPhase::Countdown {
            return false;
        }
        self.broadcast(ServerMsg::Countdown { seconds });
        true
    }

    /// `Countdown` -> `Playing`: reset the board and place players at their spawns
    pub fn start_match(&mut self) -> bool {
        if self.phase != RoomPhase::Countdown {
            return false;
        }

        let order: Vec<ConnectionId> = self.ordered_players().iter().map(|p| p.id).collect();
        for (slot, id) in order.iter().enumerate() {
            let (x, y) = Self::spawn_point(slot);
            if let Some(player) = self.players.get_mut(id) {
                player.reset_for_match(x, y);
            }
        }
        self.enemies.clear();
        self.bullets.clear();
        self.powerups.clear();
        self.waves = WaveState::new();
        self.score = 0;
        self.coins = 0;
        self.tick = 0;
        self.summary = None;
        self.phase = RoomPhase::Playing;

        info!(room = %self.code, "Match started");
        self.broadcast(ServerMsg::GameStarted {
            wave: self.waves.wave,
        });
        true
    }

    /// Enter `GameOver`. Returns false if the match had already ended.
    pub fn end_match(&mut self, reason: GameOverReason) -> bool {
        if self.phase == RoomPhase::GameOver {
            return false;
        }
        self.phase = RoomPhase::GameOver;

        let summary = self.build_summary(reason);
        info!(
            room = %self.code,
            reason = ?reason,
            wave = summary.wave,
            score = summary.score,
            coins = summary.coins,
            "Game over"
        );
        self.broadcast(ServerMsg::GameOver(summary.clone()));
        self.summary = Some(summary);
        true
    }

    /// Result of the finished match, handed out once
    pub fn take_summary(&mut self) -> Option<MatchSummary> {
        self.summary.take()
    }

    fn build_summary(&self, reason: GameOverReason) -> MatchSummary {
        let results = self
            .ordered_players()
            .into_iter()
            .map(|p| PlayerResult {
                player_id: p.id,
                account_id: p.identity.account_id,
                name: p.identity.display_name.clone(),
                score: p.score,
                kills: p.kills,
                survived: p.alive,
            })
            .collect();

        MatchSummary {
            reason,
            wave: self.waves.wave,
            score: self.score,
            coins: self.coins,
            results,
        }
    }

    // ------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------

    /// Run one simulation step of `dt` seconds and broadcast the resulting state
    pub fn tick(&mut self, dt: f32) {
        if self.phase != RoomPhase::Playing {
            return;
        }
        self.tick += 1;

        self.update_players(dt);
        self.update_bullets(dt);
        self.update_enemies(dt);
        self.resolve_collisions(dt);
        self.update_powerups(dt);
        self.update_waves(dt);

        self.broadcast(ServerMsg::State(Box::new(build_snapshot(self))));

        if !self.players.is_empty() && self.players.values().all(|p| !p.alive) {
            self.end_match(GameOverReason::AllDead);
        }
    }

    fn update_players(&mut self, dt: f32) {
        let mut revived = Vec::new();
        let mut fired = Vec::new();
        let next_id = &mut self.next_entity_id;
        let mut alloc = || {
            *next_id += 1;
            *next_id
        };

        for player in self.players.values_mut() {
            if !player.alive {
                player.input.dash = false;
                if CombatSystem::update_downed(player, dt) {
                    revived.push((player.id, player.name().to_string(), player.health));
                }
                continue;
            }

            waves::tick_buffs(player, dt);
            PhysicsSystem::update_player(player, dt);
            fired.extend(CombatSystem::try_fire(player, dt, &mut alloc));
        }

        for bullet in fired {
            self.bullets.insert(bullet.id, bullet);
        }
        for (player_id, name, health) in revived {
            debug!(room = %self.code, conn = %player_id, "Player revived");
            self.broadcast(ServerMsg::PlayerRevived {
                player_id,
                name,
                health,
            });
        }
    }

    fn update_bullets(&mut self, dt: f32) {
        self.bullets.retain(|_, bullet| bullet.update(dt));
    }

    fn update_enemies(&mut self, dt: f32) {
        // Enemies killed last tick leave the board now
        self.enemies.retain(|_, enemy| enemy.alive);

        let targets: Vec<(f32, f32)> = self
            .players
            .values()
            .filter(|p| p.alive)
            .map(|p| (p.x, p.y))
            .collect();

        for enemy in self.enemies.values_mut() {
            if let Some((tx, ty)) = PhysicsSystem::nearest(enemy.x, enemy.y, targets.iter().copied())
            {
                PhysicsSystem::steer_enemy(enemy, tx, ty, dt);
            }
        }
    }

    fn resolve_collisions(&mut self, dt: f32) {
        let kills = CombatSystem::resolve_bullet_hits(&mut self.bullets, &mut self.enemies);
        for kill in kills {
            self.credit_kill(&kill.killer, kill.kind);
            self.maybe_drop_powerup(&kill);
        }

        let downed = CombatSystem::resolve_contacts(self.players.values_mut(), &self.enemies, dt);
        for id in downed {
            let name = self
                .players
                .get(&id)
                .map(|p| p.name().to_string())
                .unwrap_or_default();
            debug!(room = %self.code, conn = %id, "Player downed");
            self.broadcast(ServerMsg::PlayerDied { player_id: id, name });
        }
    }

    /// Room totals, shooter credit (if still present) and wave kill count
    fn credit_kill(&mut self, killer: &ConnectionId, kind: EnemyKind) {
        let stats = EnemyStats::for_kind(kind);
        self.score += stats.score as u64;
        self.coins += stats.coins as u64;
        if let Some(player) = self.players.get_mut(killer) {
            player.score += stats.score as u64;
            player.kills += 1;
        }
        self.waves.credit_kills(1);
    }

    fn maybe_drop_powerup(&mut self, kill: &KillResult) {
        let wave = self.waves.wave;
        let Some(kind) = waves::roll_powerup(wave, self.players.values(), &mut self.rng) else {
            return;
        };
        let id = self.alloc_id();
        self.powerups.insert(
            id,
            Powerup {
                id,
                kind,
                x: kill.x,
                y: kill.y,
                lifetime: POWERUP_LIFETIME,
            },
        );
    }

    fn update_powerups(&mut self, dt: f32) {
        self.powerups.retain(|_, p| {
            p.lifetime -= dt;
            p.lifetime > 0.0
        });

        let mut ids: Vec<u64> = self.powerups.keys().copied().collect();
        ids.sort_unstable();
        let order: Vec<ConnectionId> = self.ordered_players().iter().map(|p| p.id).collect();

        for powerup_id in ids {
            let Some(powerup) = self.powerups.get(&powerup_id) else {
                continue;
            };
            let collector = order.iter().copied().find(|id| {
                self.players.get(id).is_some_and(|p| {
                    p.alive
                        && PhysicsSystem::circles_overlap(
                            p.x,
                            p.y,
                            PLAYER.radius,
                            powerup.x,
                            powerup.y,
                            POWERUP_RADIUS,
                        )
                })
            });
            let Some(collector) = collector else {
                continue;
            };
            let Some(powerup) = self.powerups.remove(&powerup_id) else {
                continue;
            };
            self.collect_powerup(collector, powerup);
        }
    }

    fn collect_powerup(&mut self, collector: ConnectionId, powerup: Powerup) {
        if powerup.kind == PowerupKind::Nuke {
            self.trigger_nuke(collector);
        } else if let Some(player) = self.players.get_mut(&collector) {
            waves::apply_powerup(player, powerup.kind);
        }

        self.broadcast(ServerMsg::PowerupCollected {
            player_id: collector,
            kind: powerup.kind,
            x: powerup.x,
            y: powerup.y,
        });
    }

    /// Kill every living enemy, all credited to `collector`
    fn trigger_nuke(&mut self, collector: ConnectionId) {
        let victims: Vec<_> = self
            .enemies
            .values()
            .filter(|e| e.alive)
            .map(|e| e.kind)
            .collect();
        for kind in &victims {
            self.credit_kill(&collector, *kind);
        }
        self.enemies.clear();

        info!(room = %self.code, conn = %collector, killed = victims.len(), "Nuke triggered");
        self.broadcast(ServerMsg::NukeTriggered {
            player_id: collector,
            killed: victims.len() as u32,
        });
    }

    fn update_waves(&mut self, dt: f32) {
        let live = self.enemies.values().filter(|e| e.alive).count();
        let events = self.waves.update(live, self.tick, dt, &mut self.rng);

        for event in events {
            match event {
                WaveEvent::Spawn { kind, x, y } => {
                    let id = self.alloc_id();
                    self.enemies
                        .insert(id, Enemy::new(id, kind, x, y, self.waves.wave));
                }
                WaveEvent::Cleared { wave, next_wave } => {
                    info!(room = %self.code, wave, "Wave cleared");
                    self.broadcast(ServerMsg::WaveCleared { wave, next_wave });
                }
                WaveEvent::Started { wave } => {
                    info!(room = %self.code, wave, "Wave started");
                    self.broadcast(ServerMsg::WaveStarted { wave });
                }
            }
        }
    }
}
