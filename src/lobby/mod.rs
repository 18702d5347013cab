//! Room registry, join codes and per-room scheduling

pub mod code;
pub mod registry;
pub mod results;
mod scheduler;

pub use registry::RoomRegistry;
pub use results::MatchResult;
