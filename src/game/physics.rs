//! Arena geometry, player movement and enemy steering

use super::entities::{Enemy, Player};

/// Arena width in world units
pub const ARENA_WIDTH: f32 = 1200.0;
/// Arena height in world units
pub const ARENA_HEIGHT: f32 = 800.0;

/// Movement constants for players
#[derive(Debug, Clone, Copy)]
pub struct MovementStats {
    /// Collision radius
    pub radius: f32,
    /// Speed at speed level 1 with no buffs (units per second)
    pub base_speed: f32,
    /// Extra speed fraction per speed level above 1
    pub speed_level_step: f32,
    /// Multiplier while the timed speed buff is active
    pub speed_boost: f32,
    /// Dash length in seconds
    pub dash_duration: f32,
    /// Time between dashes
    pub dash_cooldown: f32,
    /// Dash speed as a multiple of base speed
    pub dash_multiplier: f32,
}

pub const PLAYER: MovementStats = MovementStats {
    radius: 18.0,
    base_speed: 220.0,
    speed_level_step: 0.15,
    speed_boost: 1.35,
    dash_duration: 0.18,
    dash_cooldown: 1.2,
    dash_multiplier: 3.2,
};

/// Physics helpers for the room simulation
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Unit vector in the direction of (dx, dy), or zero
    pub fn normalize(dx: f32, dy: f32) -> (f32, f32) {
        let len = (dx * dx + dy * dy).sqrt();
        if len < 1e-6 {
            (0.0, 0.0)
        } else {
            (dx / len, dy / len)
        }
    }

    pub fn distance_sq(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
        let dx = x2 - x1;
        let dy = y2 - y1;
        dx * dx + dy * dy
    }

    /// Check whether two circles touch
    pub fn circles_overlap(x1: f32, y1: f32, r1: f32, x2: f32, y2: f32, r2: f32) -> bool {
        let combined = r1 + r2;
        Self::distance_sq(x1, y1, x2, y2) <= combined * combined
    }

    /// Keep a circle of `radius` fully inside the arena
    pub fn clamp_to_arena(x: f32, y: f32, radius: f32) -> (f32, f32) {
        (
            x.clamp(radius, ARENA_WIDTH - radius),
            y.clamp(radius, ARENA_HEIGHT - radius),
        )
    }

    /// True once a point has left the arena by more than `margin`
    pub fn outside_arena(x: f32, y: f32, margin: f32) -> bool {
        x < -margin || y < -margin || x > ARENA_WIDTH + margin || y > ARENA_HEIGHT + margin
    }

    /// Current movement speed from level and buffs
    pub fn player_speed(player: &Player) -> f32 {
        let level_bonus = 1.0 + PLAYER.speed_level_step * (player.speed_level.max(1) - 1) as f32;
        let boost = if player.speed_boost_timer > 0.0 {
            PLAYER.speed_boost
        } else {
            1.0
        };
        PLAYER.base_speed * level_bonus * boost
    }

    /// Direction from held movement keys, normalized
    pub fn input_direction(player: &Player) -> (f32, f32) {
        let input = &player.input;
        let mut dx = 0.0;
        let mut dy = 0.0;
        if input.left {
            dx -= 1.0;
        }
        if input.right {
            dx += 1.0;
        }
        if input.up {
            dy -= 1.0;
        }
        if input.down {
            dy += 1.0;
        }
        Self::normalize(dx, dy)
    }

    /// Dash cooldown, dash start, movement, clamping and aim for one living player.
    ///
    /// The dash flag is consumed whether or not a dash actually starts.
    pub fn update_player(player: &mut Player, dt: f32) {
        player.dash_cooldown = (player.dash_cooldown - dt).max(0.0);

        if std::mem::take(&mut player.input.dash)
            && player.dash_cooldown <= 0.0
            && !player.is_dashing()
        {
            let mut dir = Self::input_direction(player);
            if dir == (0.0, 0.0) {
                dir = Self::normalize(player.input.aim_x - player.x, player.input.aim_y - player.y);
            }
            if dir != (0.0, 0.0) {
                player.dash_dir = dir;
                player.dash_timer = PLAYER.dash_duration;
                player.dash_cooldown = PLAYER.dash_cooldown;
            }
        }

        let (vx, vy) = if player.is_dashing() {
            player.dash_timer = (player.dash_timer - dt).max(0.0);
            let speed = PLAYER.base_speed * PLAYER.dash_multiplier;
            (player.dash_dir.0 * speed, player.dash_dir.1 * speed)
        } else {
            let (dx, dy) = Self::input_direction(player);
            let speed = Self::player_speed(player);
            (dx * speed, dy * speed)
        };

        let (x, y) = Self::clamp_to_arena(player.x + vx * dt, player.y + vy * dt, PLAYER.radius);
        player.x = x;
        player.y = y;

        let (ax, ay) = (player.input.aim_x - player.x, player.input.aim_y - player.y);
        if ax != 0.0 || ay != 0.0 {
            player.aim = ay.atan2(ax);
        }
    }

    /// Move an enemy straight toward a target point
    pub fn steer_enemy(enemy: &mut Enemy, target_x: f32, target_y: f32, dt: f32) {
        let (dx, dy) = Self::normalize(target_x - enemy.x, target_y - enemy.y);
        let speed = enemy.stats().speed;
        enemy.x += dx * speed * dt;
        enemy.y += dy * speed * dt;
    }

    /// Position of the nearest candidate to (x, y)
    pub fn nearest<I>(x: f32, y: f32, candidates: I) -> Option<(f32, f32)>
    where
        I: IntoIterator<Item = (f32, f32)>,
    {
        candidates
            .into_iter()
            .map(|(cx, cy)| (Self::distance_sq(x, y, cx, cy), (cx, cy)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, pos)| pos)
    }
}
