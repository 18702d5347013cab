//! Wave progression, enemy spawning and powerup drops

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::ws::protocol::{EnemyKind, PowerupKind};

use super::combat::max_health_for_level;
use super::entities::{EnemyStats, Player, MAX_LEVEL};
use super::physics::{ARENA_HEIGHT, ARENA_WIDTH};

/// Wave pacing constants
#[derive(Debug, Clone, Copy)]
pub struct WaveTuning {
    /// Live enemy hard cap
    pub max_enemies: usize,
    /// Spawn interval in wave 1 (seconds)
    pub base_spawn_interval: f32,
    /// Interval reduction per wave
    pub spawn_interval_step: f32,
    /// Interval floor
    pub min_spawn_interval: f32,
    /// Delay before the first spawn of a wave
    pub first_spawn_delay: f32,
    /// Kills needed to clear wave 1
    pub base_kill_target: u32,
    /// Extra kills needed per wave
    pub kill_target_step: u32,
    /// Ticks before a wave may be considered cleared
    pub min_ticks_before_clear: u64,
    /// A spawn this close blocks the clear check
    pub spawn_imminent: f32,
    /// Break between waves (seconds)
    pub break_secs: f32,
}

pub const WAVES: WaveTuning = WaveTuning {
    max_enemies: 24,
    base_spawn_interval: 1.6,
    spawn_interval_step: 0.12,
    min_spawn_interval: 0.35,
    first_spawn_delay: 1.0,
    base_kill_target: 6,
    kill_target_step: 4,
    min_ticks_before_clear: 120,
    spawn_imminent: 0.25,
    break_secs: 4.0,
};

/// Powerup constants
pub const POWERUP_DROP_CHANCE: f64 = 0.18;
pub const POWERUP_LIFETIME: f32 = 10.0;
pub const POWERUP_RADIUS: f32 = 14.0;
/// Duration of rapid fire, speed and shield buffs
pub const BUFF_SECS: f32 = 8.0;
const HEALTH_PICKUP: f32 = 35.0;
const MAX_HP_PICKUP_HEAL: f32 = 25.0;

pub fn spawn_interval(wave: u32) -> f32 {
    let reduced =
        WAVES.base_spawn_interval - WAVES.spawn_interval_step * wave.saturating_sub(1) as f32;
    reduced.max(WAVES.min_spawn_interval)
}

pub fn kill_target(wave: u32) -> u32 {
    WAVES.base_kill_target + WAVES.kill_target_step * wave.saturating_sub(1)
}

/// Wave-gated weighted pick of an enemy type
pub fn roll_enemy_kind<R: Rng>(wave: u32, rng: &mut R) -> EnemyKind {
    let roll: u32 = rng.gen_range(0..100);
    match roll {
        r if wave >= 3 && r < 4 => EnemyKind::Miniboss,
        r if wave >= 3 && r < 16 => EnemyKind::Shooter,
        r if wave >= 2 && r < 32 => EnemyKind::Tank,
        r if r < 55 => EnemyKind::Fast,
        _ => EnemyKind::Basic,
    }
}

/// Point on a uniformly chosen arena border, just outside the play area
pub fn spawn_position<R: Rng>(kind: EnemyKind, rng: &mut R) -> (f32, f32) {
    let r = EnemyStats::for_kind(kind).radius;
    match rng.gen_range(0..4) {
        0 => (rng.gen_range(0.0..ARENA_WIDTH), -r),
        1 => (ARENA_WIDTH + r, rng.gen_range(0.0..ARENA_HEIGHT)),
        2 => (rng.gen_range(0.0..ARENA_WIDTH), ARENA_HEIGHT + r),
        _ => (-r, rng.gen_range(0.0..ARENA_HEIGHT)),
    }
}

/// Roll the drop chance and, on success, pick a powerup type.
///
/// Permanent upgrades are only offered while some player can still use them; the nuke unlocks
/// at wave 3.
pub fn roll_powerup<'a, R: Rng>(
    wave: u32,
    players: impl Iterator<Item = &'a Player> + Clone,
    rng: &mut R,
) -> Option<PowerupKind> {
    if !rng.gen_bool(POWERUP_DROP_CHANCE) {
        return None;
    }

    let mut table: Vec<(PowerupKind, u32)> = vec![
        (PowerupKind::Health, 30),
        (PowerupKind::RapidFire, 18),
        (PowerupKind::Speed, 16),
        (PowerupKind::Shield, 14),
    ];
    if players.clone().any(|p| p.weapon_level < MAX_LEVEL) {
        table.push((PowerupKind::WeaponUp, 8));
    }
    if players.clone().any(|p| p.speed_level < MAX_LEVEL) {
        table.push((PowerupKind::SpeedUp, 8));
    }
    if players.clone().any(|p| p.hp_level < MAX_LEVEL) {
        table.push((PowerupKind::MaxHpUp, 8));
    }
    if wave >= 3 {
        table.push((PowerupKind::Nuke, 3));
    }

    let weights = WeightedIndex::new(table.iter().map(|(_, w)| *w)).ok()?;
    Some(table[weights.sample(rng)].0)
}

/// Apply a pickup's effect to the collector. The nuke is room-wide and handled by the room.
pub fn apply_powerup(player: &mut Player, kind: PowerupKind) {
    match kind {
        PowerupKind::Health => {
            player.health = (player.health + HEALTH_PICKUP).min(player.max_health);
        }
        PowerupKind::MaxHpUp => {
            if player.hp_level < MAX_LEVEL {
                player.hp_level += 1;
                player.max_health = max_health_for_level(player.hp_level);
            }
            player.health = (player.health + MAX_HP_PICKUP_HEAL).min(player.max_health);
        }
        PowerupKind::RapidFire => player.rapid_fire_timer = BUFF_SECS,
        PowerupKind::Speed => player.speed_boost_timer = BUFF_SECS,
        PowerupKind::Shield => player.shield_timer = BUFF_SECS,
        PowerupKind::WeaponUp => player.weapon_level = (player.weapon_level + 1).min(MAX_LEVEL),
        PowerupKind::SpeedUp => player.speed_level = (player.speed_level + 1).min(MAX_LEVEL),
        PowerupKind::Nuke => {}
    }
}

/// Decay timed buffs
pub fn tick_buffs(player: &mut Player, dt: f32) {
    player.rapid_fire_timer = (player.rapid_fire_timer - dt).max(0.0);
    player.speed_boost_timer = (player.speed_boost_timer - dt).max(0.0);
    player.shield_timer = (player.shield_timer - dt).max(0.0);
}

/// Outcome of one wave update
#[derive(Debug, Clone, PartialEq)]
pub enum WaveEvent {
    Spawn { kind: EnemyKind, x: f32, y: f32 },
    Cleared { wave: u32, next_wave: u32 },
    Started { wave: u32 },
}

/// Per-room wave bookkeeping
#[derive(Debug, Clone)]
pub struct WaveState {
    pub wave: u32,
    /// Kills credited since this wave started
    pub wave_kills: u32,
    /// Post-wave countdown; positive while between waves
    pub break_timer: f32,
    pub spawn_timer: f32,
}

impl WaveState {
    pub fn new() -> Self {
        Self {
            wave: 1,
            wave_kills: 0,
            break_timer: 0.0,
            spawn_timer: WAVES.first_spawn_delay,
        }
    }

    pub fn in_break(&self) -> bool {
        self.break_timer > 0.0
    }

    pub fn credit_kills(&mut self, kills: u32) {
        self.wave_kills += kills;
    }

    /// Advance the wave clock. `live_enemies` and `tick` reflect this tick's collision results.
    pub fn update<R: Rng>(
        &mut self,
        live_enemies: usize,
        tick: u64,
        dt: f32,
        rng: &mut R,
    ) -> Vec<WaveEvent> {
        let mut events = Vec::new();

        if self.in_break() {
            self.break_timer -= dt;
            if self.break_timer <= 0.0 {
                self.break_timer = 0.0;
                self.wave += 1;
                self.wave_kills = 0;
                self.spawn_timer = WAVES.first_spawn_delay;
                events.push(WaveEvent::Started { wave: self.wave });
            }
            return events;
        }

        let mut live = live_enemies;
        if live < WAVES.max_enemies {
            self.spawn_timer -= dt;
            if self.spawn_timer <= 0.0 {
                let kind = roll_enemy_kind(self.wave, rng);
                let (x, y) = spawn_position(kind, rng);
                events.push(WaveEvent::Spawn { kind, x, y });
                self.spawn_timer = spawn_interval(self.wave);
                live += 1;
            }
        }

        if live == 0
            && self.spawn_timer > WAVES.spawn_imminent
            && tick >= WAVES.min_ticks_before_clear
            && self.wave_kills >= kill_target(self.wave)
        {
            self.break_timer = WAVES.break_secs;
            events.push(WaveEvent::Cleared {
                wave: self.wave,
                next_wave: self.wave + 1,
            });
        }

        events
    }
}

impl Default for WaveState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::PlayerIdentity;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use uuid::Uuid;

    fn player() -> Player {
        Player::new(
            Uuid::new_v4(),
            PlayerIdentity {
                account_id: Uuid::new_v4(),
                display_name: "p".to_string(),
                cosmetic: "default".to_string(),
            },
            0,
            0.0,
            0.0,
        )
    }

    #[test]
    fn test_spawn_interval_shrinks_to_floor() {
        assert_eq!(spawn_interval(1), 1.6);
        assert!(spawn_interval(5) < spawn_interval(4));
        assert_eq!(spawn_interval(50), WAVES.min_spawn_interval);
    }

    #[test]
    fn test_enemy_kinds_are_wave_gated() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..2_000 {
            let kind = roll_enemy_kind(1, &mut rng);
            assert!(matches!(kind, EnemyKind::Basic | EnemyKind::Fast));
        }
        for _ in 0..2_000 {
            let kind = roll_enemy_kind(2, &mut rng);
            assert!(!matches!(kind, EnemyKind::Shooter | EnemyKind::Miniboss));
        }
        let seen_boss = (0..5_000).any(|_| roll_enemy_kind(3, &mut rng) == EnemyKind::Miniboss);
        assert!(seen_boss);
    }

    #[test]
    fn test_spawn_positions_on_a_border() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..500 {
            let (x, y) = spawn_position(EnemyKind::Basic, &mut rng);
            let on_edge = x <= 0.0 || y <= 0.0 || x >= ARENA_WIDTH || y >= ARENA_HEIGHT;
            assert!(on_edge, "({x}, {y}) not on a border");
        }
    }

    #[test]
    fn test_maxed_players_never_roll_upgrades() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut maxed = player();
        maxed.weapon_level = MAX_LEVEL;
        maxed.speed_level = MAX_LEVEL;
        maxed.hp_level = MAX_LEVEL;
        let players = [maxed];

        for _ in 0..5_000 {
            if let Some(kind) = roll_powerup(1, players.iter(), &mut rng) {
                assert!(matches!(
                    kind,
                    PowerupKind::Health
                        | PowerupKind::RapidFire
                        | PowerupKind::Speed
                        | PowerupKind::Shield
                ));
            }
        }
    }

    #[test]
    fn test_powerup_effects_cap_at_level_three() {
        let mut p = player();
        for _ in 0..5 {
            apply_powerup(&mut p, PowerupKind::WeaponUp);
            apply_powerup(&mut p, PowerupKind::MaxHpUp);
        }
        assert_eq!(p.weapon_level, MAX_LEVEL);
        assert_eq!(p.hp_level, MAX_LEVEL);
        assert_eq!(p.max_health, max_health_for_level(MAX_LEVEL));

        p.health = 10.0;
        apply_powerup(&mut p, PowerupKind::Health);
        assert_eq!(p.health, 45.0);
        p.health = p.max_health - 1.0;
        apply_powerup(&mut p, PowerupKind::Health);
        assert_eq!(p.health, p.max_health);
    }

    #[test]
    fn test_wave_waits_for_zero_live_enemies_and_kill_target() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut waves = WaveState::new();
        waves.spawn_timer = 10.0;
        let tick = WAVES.min_ticks_before_clear;

        waves.credit_kills(kill_target(1));
        assert!(waves.update(3, tick, 0.016, &mut rng).is_empty());

        let mut short = WaveState::new();
        short.spawn_timer = 10.0;
        short.credit_kills(kill_target(1) - 1);
        assert!(short.update(0, tick, 0.016, &mut rng).is_empty());

        let mut early = WaveState::new();
        early.spawn_timer = 10.0;
        early.credit_kills(kill_target(1));
        assert!(early.update(0, 10, 0.016, &mut rng).is_empty());

        let events = waves.update(0, tick, 0.016, &mut rng);
        assert_eq!(
            events,
            vec![WaveEvent::Cleared {
                wave: 1,
                next_wave: 2
            }]
        );
        assert!(waves.in_break());
    }

    #[test]
    fn test_break_then_next_wave_resets_kills() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut waves = WaveState::new();
        waves.credit_kills(20);
        waves.break_timer = 0.5;

        assert!(waves.update(0, 500, 0.3, &mut rng).is_empty());
        assert_eq!(waves.wave, 1);
        let events = waves.update(0, 501, 0.3, &mut rng);
        assert_eq!(events, vec![WaveEvent::Started { wave: 2 }]);
        assert_eq!(waves.wave, 2);
        assert_eq!(waves.wave_kills, 0);
    }

    #[test]
    fn test_spawns_respect_cap() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut waves = WaveState::new();
        waves.spawn_timer = 0.0;
        assert!(waves.update(WAVES.max_enemies, 0, 0.1, &mut rng).is_empty());
        let events = waves.update(WAVES.max_enemies - 1, 0, 0.1, &mut rng);
        assert!(matches!(events.as_slice(), [WaveEvent::Spawn { .. }]));
    }
}
