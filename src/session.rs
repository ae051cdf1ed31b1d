use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::RoundId;

/// Fixed shape of a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub total_rounds: u32,
    /// Round ids are drawn from `0..pool_size`
    pub pool_size: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            total_rounds: crate::TOTAL_ROUNDS,
            pool_size: crate::ROUND_POOL_SIZE,
        }
    }
}

/// Result of one resolved round. Never mutated after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round_id: RoundId,
    /// Absent when the player ran out of time
    pub player_click: Option<Point>,
    pub player_correct: bool,
    pub ai_correct: bool,
}

impl RoundOutcome {
    pub fn timed_out(&self) -> bool {
        self.player_click.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SessionResult {
    #[strum(to_string = "player wins")]
    PlayerWins,
    #[strum(to_string = "AI wins")]
    AiWins,
    #[strum(to_string = "draw")]
    Draw,
}

impl SessionResult {
    /// Line shown on the end-of-session screen
    pub fn headline(&self) -> &'static str {
        match self {
            SessionResult::PlayerWins => "You won!",
            SessionResult::AiWins => "AI won!",
            SessionResult::Draw => "It was a draw!",
        }
    }
}

/// Scores and drawn rounds for one game session
#[derive(Debug, Clone)]
pub struct SessionState {
    pub config: SessionConfig,
    pub round_index: u32,
    pub player_score: u32,
    pub ai_score: u32,
    /// Rounds whose assets were requested, including ones not yet scored
    pub rounds_started: u32,
    pub seen_round_ids: HashSet<RoundId>,
    pub history: Vec<RoundOutcome>,
}

impl SessionState {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            round_index: 0,
            player_score: 0,
            ai_score: 0,
            rounds_started: 0,
            seen_round_ids: HashSet::new(),
            history: Vec::new(),
        }
    }

    /// Draw a round id not yet seen in this session and mark it seen.
    ///
    /// Re-samples until a fresh id comes up. Returns `None` once every id in
    /// the pool has been seen.
    pub fn draw_round_id<R: Rng>(&mut self, rng: &mut R) -> Option<RoundId> {
        if self.seen_round_ids.len() >= self.config.pool_size as usize {
            return None;
        }
        loop {
            let id = rng.gen_range(0..self.config.pool_size);
            if self.seen_round_ids.insert(id) {
                return Some(id);
            }
            log::debug!("round {id} already seen this session, drawing again");
        }
    }

    pub fn record_outcome(&mut self, outcome: RoundOutcome) {
        if outcome.player_correct {
            self.player_score += 1;
        }
        if outcome.ai_correct {
            self.ai_score += 1;
        }
        self.round_index += 1;
        self.history.push(outcome);
    }

    pub fn is_over(&self) -> bool {
        self.round_index >= self.config.total_rounds
    }

    /// Final comparison, available once every round has been scored
    pub fn session_result(&self) -> Option<SessionResult> {
        if !self.is_over() {
            return None;
        }
        Some(match self.player_score.cmp(&self.ai_score) {
            std::cmp::Ordering::Greater => SessionResult::PlayerWins,
            std::cmp::Ordering::Less => SessionResult::AiWins,
            std::cmp::Ordering::Equal => SessionResult::Draw,
        })
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
