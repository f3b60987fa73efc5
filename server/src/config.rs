//! Tunable durations and server limits.

use std::time::Duration;

/// Durations driving the round lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Time the defender has to deploy, counted from round start.
    pub setup: Duration,
    /// Time the attacker has, counted from deployment.
    pub attack: Duration,
    /// Pause between a round summary and the next round.
    pub round_display: Duration,
    /// Pause after the 7th strategy-4 reveal before it is scored.
    pub reveal_pause: Duration,
    /// Delay before a finished game resets the room on its own.
    pub game_over_reset: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            setup: Duration::from_secs(300),
            attack: Duration::from_secs(180),
            round_display: Duration::from_secs(4),
            reveal_pause: Duration::from_secs(3),
            game_over_reset: Duration::from_secs(180),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub max_sessions: usize,
    pub session_timeout: Duration,
    pub timings: Timings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5000".to_string(),
            max_sessions: 256,
            session_timeout: Duration::from_secs(60),
            timings: Timings::default(),
        }
    }
}
