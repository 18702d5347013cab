//! Snapshot building for network transmission

use crate::ws::protocol::{
    BulletSnapshot, EnemySnapshot, PlayerSnapshot, PowerupSnapshot, RoomSnapshot,
};

use super::entities::{Bullet, Enemy, Player, Powerup};
use super::room::Room;
use super::waves::kill_target;

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            name: p.identity.display_name.clone(),
            cosmetic: p.identity.cosmetic.clone(),
            x: p.x,
            y: p.y,
            aim: p.aim,
            health: p.health,
            max_health: p.max_health,
            alive: p.alive,
            revive_timer: p.revive_timer,
            score: p.score,
            kills: p.kills,
            weapon_level: p.weapon_level,
            speed_level: p.speed_level,
            hp_level: p.hp_level,
            rapid_fire: p.rapid_fire_timer,
            speed_boost: p.speed_boost_timer,
            shield: p.is_shielded(),
            shield_timer: p.shield_timer,
            dashing: p.is_dashing(),
            dash_cooldown: p.dash_cooldown,
        }
    }
}

impl From<&Enemy> for EnemySnapshot {
    fn from(e: &Enemy) -> Self {
        let stats = e.stats();
        Self {
            id: e.id,
            kind: e.kind,
            x: e.x,
            y: e.y,
            health: e.health,
            max_health: e.max_health,
            radius: stats.radius,
            color: stats.color.to_string(),
            score: stats.score,
        }
    }
}

impl From<&Bullet> for BulletSnapshot {
    fn from(b: &Bullet) -> Self {
        Self {
            id: b.id,
            x: b.x,
            y: b.y,
        }
    }
}

impl From<&Powerup> for PowerupSnapshot {
    fn from(p: &Powerup) -> Self {
        Self {
            id: p.id,
            kind: p.kind,
            x: p.x,
            y: p.y,
            ttl: p.lifetime,
        }
    }
}

/// Full visible state of a room. Dead enemies are left out; entity lists are id-ordered.
pub fn build_snapshot(room: &Room) -> RoomSnapshot {
    let mut players: Vec<&Player> = room.players.values().collect();
    players.sort_by_key(|p| p.join_seq);

    let mut enemies: Vec<EnemySnapshot> = room
        .enemies
        .values()
        .filter(|e| e.alive)
        .map(EnemySnapshot::from)
        .collect();
    enemies.sort_by_key(|e| e.id);

    let mut bullets: Vec<BulletSnapshot> = room.bullets.values().map(BulletSnapshot::from).collect();
    bullets.sort_by_key(|b| b.id);

    let mut powerups: Vec<PowerupSnapshot> =
        room.powerups.values().map(PowerupSnapshot::from).collect();
    powerups.sort_by_key(|p| p.id);

    RoomSnapshot {
        tick: room.tick,
        wave: room.waves.wave,
        score: room.score,
        coins: room.coins,
        wave_kills: room.waves.wave_kills,
        wave_kill_target: kill_target(room.waves.wave),
        wave_break: room.waves.break_timer.max(0.0),
        players: players.into_iter().map(PlayerSnapshot::from).collect(),
        enemies,
        bullets,
        powerups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::room::tests::identity;
    use crate::ws::protocol::{EnemyKind, PowerupKind};
    use tokio::sync::mpsc;
    use uuid::Uuid;

    #[test]
    fn test_snapshot_contents() {
        let mut room = Room::new("SNAPPY".to_string(), 3);
        let (tx, _rx) = mpsc::channel(8);
        let host = Uuid::new_v4();
        room.add_player(host, identity("host"), tx).unwrap();

        let mut dead = Enemy::new(2, EnemyKind::Fast, 5.0, 5.0, 1);
        dead.alive = false;
        room.enemies.insert(2, dead);
        room.enemies
            .insert(1, Enemy::new(1, EnemyKind::Tank, 10.0, 10.0, 2));
        room.powerups.insert(
            3,
            Powerup {
                id: 3,
                kind: PowerupKind::Shield,
                x: 1.0,
                y: 2.0,
                lifetime: 4.0,
            },
        );

        let snap = build_snapshot(&room);
        assert_eq!(snap.players.len(), 1);
        assert_eq!(snap.players[0].id, host);
        assert_eq!(snap.players[0].name, "host");
        assert_eq!(snap.enemies.len(), 1);
        assert_eq!(snap.enemies[0].kind, EnemyKind::Tank);
        assert_eq!(snap.enemies[0].color, "#8e44ad");
        assert_eq!(snap.powerups[0].ttl, 4.0);
        assert_eq!(snap.wave, 1);
        assert_eq!(snap.wave_kill_target, kill_target(1));
    }
}
