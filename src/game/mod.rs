//! Room simulation modules

pub mod combat;
pub mod entities;
pub mod physics;
pub mod room;
pub mod snapshot;
pub mod waves;

pub use entities::{Bullet, Enemy, Player, PlayerIdentity, Powerup};
pub use room::{Room, RoomPhase};

/// Latest input snapshot for a player, overwritten by ingress and read by the tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub shoot: bool,
    /// One-shot; cleared by the next tick whether or not a dash started
    pub dash: bool,
    pub aim_x: f32,
    pub aim_y: f32,
}

/// Sanitized partial input; `None` leaves the stored field untouched
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputUpdate {
    pub up: Option<bool>,
    pub down: Option<bool>,
    pub left: Option<bool>,
    pub right: Option<bool>,
    pub shoot: Option<bool>,
    pub dash: Option<bool>,
    pub aim_x: Option<f32>,
    pub aim_y: Option<f32>,
}

impl InputUpdate {
    /// Overwrite the recognized fields of `state`
    pub fn apply_to(&self, state: &mut InputState) {
        if let Some(v) = self.up {
            state.up = v;
        }
        if let Some(v) = self.down {
            state.down = v;
        }
        if let Some(v) = self.left {
            state.left = v;
        }
        if let Some(v) = self.right {
            state.right = v;
        }
        if let Some(v) = self.shoot {
            state.shoot = v;
        }
        // Latched until the tick consumes it; a later `false` must not swallow a pending dash
        if self.dash == Some(true) {
            state.dash = true;
        }
        if let Some(v) = self.aim_x {
            state.aim_x = v;
        }
        if let Some(v) = self.aim_y {
            state.aim_y = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_only_touches_present_fields() {
        let mut state = InputState {
            up: true,
            aim_x: 50.0,
            aim_y: 60.0,
            ..Default::default()
        };
        InputUpdate {
            left: Some(true),
            aim_y: Some(10.0),
            ..Default::default()
        }
        .apply_to(&mut state);

        assert!(state.up);
        assert!(state.left);
        assert_eq!(state.aim_x, 50.0);
        assert_eq!(state.aim_y, 10.0);
    }

    #[test]
    fn test_dash_is_latched() {
        let mut state = InputState::default();
        InputUpdate {
            dash: Some(true),
            ..Default::default()
        }
        .apply_to(&mut state);
        InputUpdate {
            dash: Some(false),
            ..Default::default()
        }
        .apply_to(&mut state);
        assert!(state.dash);
    }
}
