//! Entity records owned by a room: players, enemies, bullets, powerups

use uuid::Uuid;

use crate::ws::protocol::{ConnectionId, EnemyKind, PowerupKind};

use super::combat::max_health_for_level;
use super::InputState;

/// Highest level for weapon, speed and max-HP progression
pub const MAX_LEVEL: u8 = 3;

/// Verified account identity supplied at join time
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerIdentity {
    pub account_id: Uuid,
    pub display_name: String,
    pub cosmetic: String,
}

/// Player state in a room (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    pub id: ConnectionId,
    pub identity: PlayerIdentity,
    /// Join order within the room, used for roster ordering
    pub join_seq: u64,

    // Position and aim
    pub x: f32,
    pub y: f32,
    pub aim: f32,

    // Vitals
    pub health: f32,
    pub max_health: f32,
    pub alive: bool,
    pub revive_timer: f32,

    // Per-match progression
    pub weapon_level: u8,
    pub speed_level: u8,
    pub hp_level: u8,
    pub rapid_fire_timer: f32,
    pub speed_boost_timer: f32,
    pub shield_timer: f32,

    // Dash
    pub dash_cooldown: f32,
    pub dash_timer: f32,
    pub dash_dir: (f32, f32),

    pub shoot_cooldown: f32,

    // Stats
    pub score: u64,
    pub kills: u32,

    pub input: InputState,
}

impl Player {
    pub fn new(id: ConnectionId, identity: PlayerIdentity, join_seq: u64, x: f32, y: f32) -> Self {
        let max_health = max_health_for_level(1);
        Self {
            id,
            identity,
            join_seq,
            x,
            y,
            aim: 0.0,
            health: max_health,
            max_health,
            alive: true,
            revive_timer: 0.0,
            weapon_level: 1,
            speed_level: 1,
            hp_level: 1,
            rapid_fire_timer: 0.0,
            speed_boost_timer: 0.0,
            shield_timer: 0.0,
            dash_cooldown: 0.0,
            dash_timer: 0.0,
            dash_dir: (0.0, 0.0),
            shoot_cooldown: 0.0,
            score: 0,
            kills: 0,
            input: InputState {
                aim_x: x + 1.0,
                aim_y: y,
                ..Default::default()
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.identity.display_name
    }

    pub fn is_dashing(&self) -> bool {
        self.dash_timer > 0.0
    }

    pub fn is_shielded(&self) -> bool {
        self.shield_timer > 0.0
    }

    /// Put the player back into a fresh pre-match state, keeping identity and position
    pub fn reset_for_match(&mut self, x: f32, y: f32) {
        let fresh = Player::new(self.id, self.identity.clone(), self.join_seq, x, y);
        *self = fresh;
    }
}

/// Base stats per enemy archetype
#[derive(Debug, Clone, Copy)]
pub struct EnemyStats {
    pub health: f32,
    pub speed: f32,
    /// Contact damage rate (scaled per tick, see `CombatSystem::contact_damage`)
    pub damage: f32,
    pub score: u32,
    pub coins: u32,
    pub radius: f32,
    pub color: &'static str,
}

impl EnemyStats {
    pub fn for_kind(kind: EnemyKind) -> Self {
        match kind {
            EnemyKind::Basic => Self {
                health: 30.0,
                speed: 85.0,
                damage: 10.0,
                score: 10,
                coins: 1,
                radius: 16.0,
                color: "#e74c3c",
            },
            EnemyKind::Fast => Self {
                health: 18.0,
                speed: 150.0,
                damage: 7.0,
                score: 15,
                coins: 2,
                radius: 12.0,
                color: "#f1c40f",
            },
            EnemyKind::Tank => Self {
                health: 110.0,
                speed: 50.0,
                damage: 18.0,
                score: 35,
                coins: 5,
                radius: 26.0,
                color: "#8e44ad",
            },
            EnemyKind::Shooter => Self {
                health: 45.0,
                speed: 70.0,
                damage: 12.0,
                score: 25,
                coins: 3,
                radius: 18.0,
                color: "#1abc9c",
            },
            EnemyKind::Miniboss => Self {
                health: 420.0,
                speed: 45.0,
                damage: 30.0,
                score: 200,
                coins: 25,
                radius: 40.0,
                color: "#c0392b",
            },
        }
    }
}

/// Enemy HP gained per wave past the first
pub const ENEMY_HP_PER_WAVE: f32 = 6.0;

#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: u64,
    pub kind: EnemyKind,
    pub x: f32,
    pub y: f32,
    pub health: f32,
    pub max_health: f32,
    pub alive: bool,
}

impl Enemy {
    pub fn new(id: u64, kind: EnemyKind, x: f32, y: f32, wave: u32) -> Self {
        let stats = EnemyStats::for_kind(kind);
        let max_health = stats.health + ENEMY_HP_PER_WAVE * wave.saturating_sub(1) as f32;
        Self {
            id,
            kind,
            x,
            y,
            health: max_health,
            max_health,
            alive: true,
        }
    }

    pub fn stats(&self) -> EnemyStats {
        EnemyStats::for_kind(self.kind)
    }
}

/// Active bullet
#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: u64,
    pub owner: ConnectionId,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub lifetime: f32,
    /// Passes through enemies instead of being consumed on hit
    pub piercing: bool,
}

#[derive(Debug, Clone)]
pub struct Powerup {
    pub id: u64,
    pub kind: PowerupKind,
    pub x: f32,
    pub y: f32,
    pub lifetime: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> PlayerIdentity {
        PlayerIdentity {
            account_id: Uuid::new_v4(),
            display_name: "ace".to_string(),
            cosmetic: "default".to_string(),
        }
    }

    #[test]
    fn test_enemy_hp_scales_additively_with_wave() {
        let w1 = Enemy::new(1, EnemyKind::Basic, 0.0, 0.0, 1);
        let w4 = Enemy::new(2, EnemyKind::Basic, 0.0, 0.0, 4);
        assert_eq!(w1.max_health, 30.0);
        assert_eq!(w4.max_health, 30.0 + 3.0 * ENEMY_HP_PER_WAVE);
        assert_eq!(w4.health, w4.max_health);
    }

    #[test]
    fn test_reset_for_match_clears_progression() {
        let mut player = Player::new(Uuid::new_v4(), identity(), 0, 10.0, 10.0);
        player.weapon_level = 3;
        player.score = 500;
        player.alive = false;
        player.reset_for_match(40.0, 50.0);

        assert_eq!(player.weapon_level, 1);
        assert_eq!(player.score, 0);
        assert!(player.alive);
        assert_eq!((player.x, player.y), (40.0, 50.0));
        assert_eq!(player.name(), "ace");
    }
}
