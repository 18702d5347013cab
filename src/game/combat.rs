//! Combat system - weapons, damage, hit detection

use std::collections::HashMap;

use crate::util::time::nominal_tick_secs;
use crate::ws::protocol::{ConnectionId, EnemyKind};

use super::entities::{Bullet, Enemy, Player};
use super::physics::{PhysicsSystem, PLAYER};

/// Player weapon stats
#[derive(Debug, Clone, Copy)]
pub struct WeaponStats {
    /// Damage per hit
    pub damage: f32,
    /// Bullet speed
    pub bullet_speed: f32,
    /// Bullet lifetime (seconds)
    pub bullet_lifetime: f32,
    /// Bullet hitbox radius
    pub bullet_radius: f32,
    /// Cooldown between shots (seconds)
    pub cooldown: f32,
    /// Cooldown while rapid fire is active
    pub rapid_cooldown: f32,
    /// How far past the arena edge a bullet survives
    pub arena_margin: f32,
}

pub const WEAPON: WeaponStats = WeaponStats {
    damage: 20.0,
    bullet_speed: 620.0,
    bullet_lifetime: 1.4,
    bullet_radius: 5.0,
    cooldown: 0.25,
    rapid_cooldown: 0.10,
    arena_margin: 40.0,
};

/// Angular offsets (radians) of each bullet fired at a weapon level
pub fn spread_offsets(weapon_level: u8) -> &'static [f32] {
    match weapon_level {
        0 | 1 => &[0.0],
        2 => &[-0.06, 0.06],
        _ => &[-0.2, 0.0, 0.2],
    }
}

const BASE_MAX_HEALTH: f32 = 100.0;
const MAX_HEALTH_PER_LEVEL: f32 = 25.0;

/// Seconds a downed player waits before reviving
pub const REVIVE_SECS: f32 = 8.0;

/// Contact damage multiplier per nominal tick.
///
/// Balanced at the nominal tick rate; `contact_damage` rescales by measured dt, so damage per
/// second is the same at any configured rate.
pub const CONTACT_DAMAGE_PER_TICK: f32 = 0.05;
/// Contact damage multiplier while shielded
pub const SHIELD_DAMAGE_FACTOR: f32 = 0.3;

pub fn max_health_for_level(hp_level: u8) -> f32 {
    BASE_MAX_HEALTH + MAX_HEALTH_PER_LEVEL * hp_level.saturating_sub(1) as f32
}

impl Bullet {
    /// Integrate position, returns false once expired or out of the arena
    pub fn update(&mut self, dt: f32) -> bool {
        self.x += self.vel_x * dt;
        self.y += self.vel_y * dt;
        self.lifetime -= dt;
        self.lifetime > 0.0 && !PhysicsSystem::outside_arena(self.x, self.y, WEAPON.arena_margin)
    }

    /// Check collision with an enemy
    pub fn check_hit(&self, enemy: &Enemy) -> bool {
        PhysicsSystem::circles_overlap(
            self.x,
            self.y,
            WEAPON.bullet_radius,
            enemy.x,
            enemy.y,
            enemy.stats().radius,
        )
    }
}

/// Enemy kill produced by collision resolution
#[derive(Debug, Clone, PartialEq)]
pub struct KillResult {
    pub enemy_id: u64,
    pub kind: EnemyKind,
    pub killer: ConnectionId,
    pub x: f32,
    pub y: f32,
}

/// Combat system for managing weapons and damage
pub struct CombatSystem;

impl CombatSystem {
    /// Apply damage to health, returns (new_health, is_dead)
    pub fn apply_damage(current_health: f32, damage: f32) -> (f32, bool) {
        let new_health = (current_health - damage).max(0.0);
        (new_health, new_health <= 0.0)
    }

    /// Cooldown to set after firing
    pub fn fire_cooldown(player: &Player) -> f32 {
        if player.rapid_fire_timer > 0.0 {
            WEAPON.rapid_cooldown
        } else {
            WEAPON.cooldown
        }
    }

    /// Decay the shot cooldown and fire if the trigger is held.
    ///
    /// `next_id` hands out entity ids for new bullets.
    pub fn try_fire(player: &mut Player, dt: f32, mut next_id: impl FnMut() -> u64) -> Vec<Bullet> {
        player.shoot_cooldown = (player.shoot_cooldown - dt).max(0.0);
        if !player.input.shoot || player.shoot_cooldown > 0.0 {
            return Vec::new();
        }

        let muzzle = PLAYER.radius + WEAPON.bullet_radius;
        let bullets = spread_offsets(player.weapon_level)
            .iter()
            .map(|offset| {
                let angle = player.aim + offset;
                Bullet {
                    id: next_id(),
                    owner: player.id,
                    x: player.x + angle.cos() * muzzle,
                    y: player.y + angle.sin() * muzzle,
                    vel_x: angle.cos() * WEAPON.bullet_speed,
                    vel_y: angle.sin() * WEAPON.bullet_speed,
                    lifetime: WEAPON.bullet_lifetime,
                    piercing: false,
                }
            })
            .collect();

        player.shoot_cooldown = Self::fire_cooldown(player);
        bullets
    }

    /// Contact damage dealt over `dt` seconds by an enemy with damage rate `rate`
    pub fn contact_damage(rate: f32, dt: f32, shielded: bool) -> f32 {
        let damage = rate * CONTACT_DAMAGE_PER_TICK * (dt / nominal_tick_secs());
        if shielded {
            damage * SHIELD_DAMAGE_FACTOR
        } else {
            damage
        }
    }

    /// Down a player: zero health and start the revive countdown
    pub fn kill_player(player: &mut Player) {
        player.alive = false;
        player.health = 0.0;
        player.revive_timer = REVIVE_SECS;
        player.dash_timer = 0.0;
        player.input.shoot = false;
    }

    /// Tick a downed player's revive countdown, returns true on revive
    pub fn update_downed(player: &mut Player, dt: f32) -> bool {
        player.revive_timer = (player.revive_timer - dt).max(0.0);
        if player.revive_timer > 0.0 {
            return false;
        }
        player.alive = true;
        player.health = player.max_health / 2.0;
        true
    }

    /// Bullet-vs-enemy pass. Consumed bullets are removed; killed enemies are flagged dead
    /// but stay in the map until the next enemy update.
    pub fn resolve_bullet_hits(
        bullets: &mut HashMap<u64, Bullet>,
        enemies: &mut HashMap<u64, Enemy>,
    ) -> Vec<KillResult> {
        let mut kills = Vec::new();
        let mut consumed = Vec::new();

        // Stable order keeps hit resolution deterministic for a given seed
        let mut bullet_ids: Vec<u64> = bullets.keys().copied().collect();
        bullet_ids.sort_unstable();
        let mut enemy_ids: Vec<u64> = enemies.keys().copied().collect();
        enemy_ids.sort_unstable();

        for bullet_id in bullet_ids {
            let Some(bullet) = bullets.get(&bullet_id) else {
                continue;
            };
            for enemy_id in &enemy_ids {
                let Some(enemy) = enemies.get_mut(enemy_id) else {
                    continue;
                };
                if !enemy.alive || !bullet.check_hit(enemy) {
                    continue;
                }

                let (health, dead) = Self::apply_damage(enemy.health, WEAPON.damage);
                enemy.health = health;
                if dead {
                    enemy.alive = false;
                    kills.push(KillResult {
                        enemy_id: enemy.id,
                        kind: enemy.kind,
                        killer: bullet.owner,
                        x: enemy.x,
                        y: enemy.y,
                    });
                }
                if !bullet.piercing {
                    consumed.push(bullet_id);
                    break;
                }
            }
        }

        for id in consumed {
            bullets.remove(&id);
        }
        kills
    }

    /// Player-vs-enemy contact pass, returns players downed this tick
    pub fn resolve_contacts<'a>(
        players: impl Iterator<Item = &'a mut Player>,
        enemies: &HashMap<u64, Enemy>,
        dt: f32,
    ) -> Vec<ConnectionId> {
        let mut downed = Vec::new();
        for player in players {
            if !player.alive {
                continue;
            }
            let shielded = player.is_shielded();
            let damage: f32 = enemies
                .values()
                .filter(|e| e.alive)
                .filter(|e| {
                    PhysicsSystem::circles_overlap(
                        player.x,
                        player.y,
                        PLAYER.radius,
                        e.x,
                        e.y,
                        e.stats().radius,
                    )
                })
                .map(|e| Self::contact_damage(e.stats().damage, dt, shielded))
                .sum();
            if damage <= 0.0 {
                continue;
            }

            let (health, dead) = Self::apply_damage(player.health, damage);
            player.health = health;
            if dead {
                Self::kill_player(player);
                downed.push(player.id);
            }
        }
        downed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::PlayerIdentity;
    use uuid::Uuid;

    fn player() -> Player {
        Player::new(
            Uuid::new_v4(),
            PlayerIdentity {
                account_id: Uuid::new_v4(),
                display_name: "gunner".to_string(),
                cosmetic: "default".to_string(),
            },
            0,
            600.0,
            400.0,
        )
    }

    fn fire(player: &mut Player) -> Vec<Bullet> {
        let mut next = 0;
        CombatSystem::try_fire(player, 0.016, || {
            next += 1;
            next
        })
    }

    fn angles(bullets: &[Bullet]) -> Vec<f32> {
        let mut out: Vec<f32> = bullets.iter().map(|b| b.vel_y.atan2(b.vel_x)).collect();
        out.sort_by(|a, b| a.total_cmp(b));
        out
    }

    #[test]
    fn test_weapon_levels_bullet_counts_and_spread() {
        let mut p = player();
        p.input.shoot = true;

        let level1 = fire(&mut p);
        assert_eq!(level1.len(), 1);
        assert!(angles(&level1)[0].abs() < 1e-5);

        p.weapon_level = 2;
        p.shoot_cooldown = 0.0;
        let level2 = angles(&fire(&mut p));
        assert_eq!(level2.len(), 2);
        assert!((level2[0] + level2[1]).abs() < 1e-5);
        let small = level2[1];

        p.weapon_level = 3;
        p.shoot_cooldown = 0.0;
        let level3 = angles(&fire(&mut p));
        assert_eq!(level3.len(), 3);
        assert!(level3[1].abs() < 1e-5);
        assert!((level3[0] + level3[2]).abs() < 1e-5);
        assert!(level3[2] > small);
    }

    #[test]
    fn test_no_bullet_before_cooldown_elapses() {
        let mut p = player();
        p.input.shoot = true;
        assert_eq!(fire(&mut p).len(), 1);
        assert_eq!(fire(&mut p).len(), 0);

        p.shoot_cooldown = 0.0;
        p.input.shoot = false;
        assert!(fire(&mut p).is_empty());
    }

    #[test]
    fn test_rapid_fire_shortens_cooldown() {
        let mut p = player();
        p.input.shoot = true;
        p.rapid_fire_timer = 5.0;
        fire(&mut p);
        assert_eq!(p.shoot_cooldown, WEAPON.rapid_cooldown);
    }

    #[test]
    fn test_bullet_expires_outside_margin() {
        let mut bullet = Bullet {
            id: 1,
            owner: Uuid::new_v4(),
            x: 1190.0,
            y: 400.0,
            vel_x: 620.0,
            vel_y: 0.0,
            lifetime: 5.0,
            piercing: false,
        };
        assert!(bullet.update(0.05));
        assert!(!bullet.update(0.1));
    }

    #[test]
    fn test_lethal_hit_kills_and_consumes_bullet() {
        let owner = Uuid::new_v4();
        let mut enemy = Enemy::new(7, EnemyKind::Fast, 100.0, 100.0, 1);
        enemy.health = WEAPON.damage;
        let mut enemies = HashMap::from([(7, enemy)]);
        let mut bullets = HashMap::from([(
            1,
            Bullet {
                id: 1,
                owner,
                x: 100.0,
                y: 100.0,
                vel_x: 0.0,
                vel_y: 0.0,
                lifetime: 1.0,
                piercing: false,
            },
        )]);

        let kills = CombatSystem::resolve_bullet_hits(&mut bullets, &mut enemies);
        assert_eq!(kills.len(), 1);
        assert_eq!(kills[0].killer, owner);
        assert!(bullets.is_empty());
        assert!(!enemies[&7].alive);
        assert_eq!(enemies[&7].health, 0.0);
    }

    #[test]
    fn test_contact_damage_tracks_nominal_rate_and_shield() {
        let full = CombatSystem::contact_damage(10.0, nominal_tick_secs(), false);
        assert!((full - 0.5).abs() < 1e-5);
        let shielded = CombatSystem::contact_damage(10.0, nominal_tick_secs(), true);
        assert!((shielded - 0.5 * SHIELD_DAMAGE_FACTOR).abs() < 1e-5);
    }

    #[test]
    fn test_player_downed_then_revives_at_half_health() {
        let mut p = player();
        p.max_health = max_health_for_level(2);
        p.health = 0.1;
        let enemies = HashMap::from([(1, Enemy::new(1, EnemyKind::Miniboss, 600.0, 400.0, 1))]);

        let downed = CombatSystem::resolve_contacts(std::iter::once(&mut p), &enemies, 0.05);
        assert_eq!(downed, vec![p.id]);
        assert!(!p.alive);
        assert_eq!(p.health, 0.0);
        assert_eq!(p.revive_timer, REVIVE_SECS);

        assert!(!CombatSystem::update_downed(&mut p, REVIVE_SECS - 1.0));
        assert!(CombatSystem::update_downed(&mut p, 1.0));
        assert!(p.alive);
        assert_eq!(p.health, max_health_for_level(2) / 2.0);
    }
}
