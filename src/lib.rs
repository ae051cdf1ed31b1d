// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod animation;
pub mod app_dirs;
pub mod assets;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod render;
pub mod reveal;
pub mod round;
pub mod runtime;
pub mod scores;
pub mod session;
pub mod timer;

/// Engine tick; the countdown loses one tenth of a second per tick
pub const TICK_RATE_MS: u64 = 100;
pub const TOTAL_ROUNDS: u32 = 10;
pub const ROUND_POOL_SIZE: u32 = 101;
pub const ROUND_SECS: f64 = 10.0;
pub const DEFAULT_CANVAS_SIZE: f64 = 512.0;

/// Identifier of a scan in the round pool
pub type RoundId = u32;
