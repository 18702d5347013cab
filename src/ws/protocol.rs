//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned to each WebSocket connection
pub type ConnectionId = Uuid;

/// Enemy archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    Basic,
    /// Quick, fragile
    Fast,
    /// Slow damage sponge
    Tank,
    Shooter,
    Miniboss,
}

/// Pickup types dropped by enemies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerupKind {
    Health,
    RapidFire,
    Speed,
    Shield,
    /// Permanent weapon level increase
    WeaponUp,
    /// Permanent movement speed level increase
    SpeedUp,
    /// Permanent max health level increase
    MaxHpUp,
    /// Kills every enemy in the room
    Nuke,
}

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    AllDead,
    PartnerDisconnected,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Open a new room and become its host
    CreateRoom,

    /// Join an existing room by code
    JoinRoom {
        /// Kept loose so a numeric or otherwise odd code still parses and gets sanitized
        #[serde(default)]
        code: Option<serde_json::Value>,
    },

    /// Latest input state; every field is optional and sanitized at the boundary
    Input(RawInput),

    /// Leave the current room
    LeaveRoom,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        #[serde(default)]
        t: u64,
    },
}

/// Unvalidated input fields as received on the wire
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawInput {
    #[serde(default)]
    pub up: Option<serde_json::Value>,
    #[serde(default)]
    pub down: Option<serde_json::Value>,
    #[serde(default)]
    pub left: Option<serde_json::Value>,
    #[serde(default)]
    pub right: Option<serde_json::Value>,
    #[serde(default)]
    pub shoot: Option<serde_json::Value>,
    #[serde(default)]
    pub dash: Option<serde_json::Value>,
    /// Pointer target in arena coordinates
    #[serde(default)]
    pub aim_x: Option<serde_json::Value>,
    #[serde(default)]
    pub aim_y: Option<serde_json::Value>,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        connection_id: ConnectionId,
        server_time: u64,
    },

    /// Room opened by this connection
    RoomCreated {
        code: String,
        host_name: String,
    },

    /// This connection joined a room
    RoomJoined {
        code: String,
        name: String,
    },

    /// Current occupants, host first
    RoomRoster {
        players: Vec<RosterEntry>,
    },

    /// Pre-match countdown
    Countdown {
        seconds: u32,
    },

    /// Simulation is running
    GameStarted {
        wave: u32,
    },

    /// Full room state, sent every tick
    State(Box<RoomSnapshot>),

    PlayerDied {
        player_id: ConnectionId,
        name: String,
    },

    PlayerRevived {
        player_id: ConnectionId,
        name: String,
        health: f32,
    },

    PowerupCollected {
        player_id: ConnectionId,
        kind: PowerupKind,
        x: f32,
        y: f32,
    },

    /// Area effect wiped the board
    NukeTriggered {
        player_id: ConnectionId,
        killed: u32,
    },

    WaveStarted {
        wave: u32,
    },

    WaveCleared {
        wave: u32,
        next_wave: u32,
    },

    GameOver(MatchSummary),

    /// The other player left the room
    PartnerLeft {
        player_id: ConnectionId,
        name: String,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Player info for the lobby roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: ConnectionId,
    pub name: String,
    pub cosmetic: String,
    pub is_host: bool,
}

/// Per-tick room snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub tick: u64,
    pub wave: u32,
    pub score: u64,
    pub coins: u64,
    pub wave_kills: u32,
    pub wave_kill_target: u32,
    /// Seconds left in the post-wave break (0 while a wave is running)
    pub wave_break: f32,
    pub players: Vec<PlayerSnapshot>,
    pub enemies: Vec<EnemySnapshot>,
    pub bullets: Vec<BulletSnapshot>,
    pub powerups: Vec<PowerupSnapshot>,
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: ConnectionId,
    pub name: String,
    pub cosmetic: String,
    pub x: f32,
    pub y: f32,
    /// Aim angle in radians
    pub aim: f32,
    pub health: f32,
    pub max_health: f32,
    pub alive: bool,
    /// Seconds until revive (0 while alive)
    pub revive_timer: f32,
    pub score: u64,
    pub kills: u32,
    pub weapon_level: u8,
    pub speed_level: u8,
    pub hp_level: u8,
    pub rapid_fire: f32,
    pub speed_boost: f32,
    pub shield: bool,
    pub shield_timer: f32,
    pub dashing: bool,
    pub dash_cooldown: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub id: u64,
    pub kind: EnemyKind,
    pub x: f32,
    pub y: f32,
    pub health: f32,
    pub max_health: f32,
    pub radius: f32,
    pub color: String,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletSnapshot {
    pub id: u64,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerupSnapshot {
    pub id: u64,
    pub kind: PowerupKind,
    pub x: f32,
    pub y: f32,
    /// Seconds before it despawns
    pub ttl: f32,
}

/// End-of-match payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub reason: GameOverReason,
    pub wave: u32,
    pub score: u64,
    pub coins: u64,
    pub results: Vec<PlayerResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerResult {
    pub player_id: ConnectionId,
    pub account_id: Uuid,
    pub name: String,
    pub score: u64,
    pub kills: u32,
    pub survived: bool,
}
