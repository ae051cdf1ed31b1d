//! Staged disclosure of a resolved round and the deferred-callback queue
//! that plays it out.

use std::time::Duration;

use itertools::Itertools;

use crate::geometry::Point;
use crate::render::{DrawCommand, Layer, Stroke};
use crate::round::RoundData;
use crate::session::RoundOutcome;

pub const AI_MARK_DELAY: Duration = Duration::from_millis(1000);
pub const TRUTH_DELAY: Duration = Duration::from_millis(1500);
pub const PLAYER_VERDICT_DELAY: Duration = Duration::from_millis(2000);
pub const AI_VERDICT_DELAY: Duration = Duration::from_millis(2500);

/// Stroke width for boxes drawn on the scan
pub const BOX_STROKE_WIDTH: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStage {
    PlayerMark,
    AiMark,
    GroundTruth,
    PlayerVerdict,
    /// Last stage: results become visible and the round is scored
    AiVerdict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevealStep {
    pub delay: Duration,
    pub stage: RevealStage,
    pub commands: Vec<DrawCommand>,
}

impl RevealStep {
    pub fn completes_round(&self) -> bool {
        self.stage == RevealStage::AiVerdict
    }
}

fn verdict(correct: bool) -> Stroke {
    if correct {
        Stroke::Valid
    } else {
        Stroke::Invalid
    }
}

fn ai_box(data: &RoundData, stroke: Stroke) -> DrawCommand {
    DrawCommand::Rect {
        layer: Layer::Scene,
        bbox: data.predicted,
        stroke,
        width: BOX_STROKE_WIDTH,
    }
}

fn player_mark(at: Point, stroke: Stroke) -> DrawCommand {
    DrawCommand::Cross { at, stroke }
}

/// The reveal timeline for a resolved round.
///
/// The narrative is the same whether the player clicked or timed out; a
/// timed-out round simply has no player mark to show or recolour.
pub fn plan_reveal(data: &RoundData, outcome: &RoundOutcome) -> Vec<RevealStep> {
    let mut steps = Vec::with_capacity(5);

    if let Some(at) = outcome.player_click {
        steps.push(RevealStep {
            delay: Duration::ZERO,
            stage: RevealStage::PlayerMark,
            commands: vec![player_mark(at, Stroke::Pending)],
        });
    }

    steps.push(RevealStep {
        delay: AI_MARK_DELAY,
        stage: RevealStage::AiMark,
        commands: vec![ai_box(data, Stroke::Pending)],
    });

    steps.push(RevealStep {
        delay: TRUTH_DELAY,
        stage: RevealStage::GroundTruth,
        commands: vec![DrawCommand::Rect {
            layer: Layer::Scene,
            bbox: data.truth,
            stroke: Stroke::Truth,
            width: BOX_STROKE_WIDTH,
        }],
    });

    if let Some(at) = outcome.player_click {
        steps.push(RevealStep {
            delay: PLAYER_VERDICT_DELAY,
            stage: RevealStage::PlayerVerdict,
            commands: vec![player_mark(at, verdict(outcome.player_correct))],
        });
    }

    steps.push(RevealStep {
        delay: AI_VERDICT_DELAY,
        stage: RevealStage::AiVerdict,
        commands: vec![ai_box(data, verdict(outcome.ai_correct))],
    });

    steps
}

#[derive(Debug, Clone)]
struct Pending<A> {
    due: Duration,
    generation: u64,
    seq: u64,
    action: A,
}

/// Single-shot deferred actions on a logical clock.
///
/// Actions cannot be cancelled once scheduled; each carries the generation
/// of the round that scheduled it and is dropped at fire time if that round
/// is no longer current.
#[derive(Debug, Clone)]
pub struct Scheduler<A> {
    now: Duration,
    next_seq: u64,
    pending: Vec<Pending<A>>,
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            pending: Vec::new(),
        }
    }
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn schedule(&mut self, delay: Duration, generation: u64, action: A) {
        self.pending.push(Pending {
            due: self.now + delay,
            generation,
            seq: self.next_seq,
            action,
        });
        self.next_seq += 1;
    }

    pub fn advance(&mut self, elapsed: Duration) {
        self.now += elapsed;
    }

    /// Remove every action that is due, returning those that still belong
    /// to `current_generation` in firing order
    pub fn drain_due(&mut self, current_generation: u64) -> Vec<A> {
        let now = self.now;
        let (due, later): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|p| p.due <= now);
        self.pending = later;

        due.into_iter()
            .sorted_by_key(|p| (p.due, p.seq))
            .filter_map(|p| {
                if p.generation == current_generation {
                    Some(p.action)
                } else {
                    log::debug!(
                        "dropping stale callback from round generation {} (current {})",
                        p.generation,
                        current_generation
                    );
                    None
                }
            })
            .collect()
    }
}
