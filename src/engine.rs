//! The round engine: owns the round state machine, the session totals and
//! the reveal schedule, and drives them from a single logical clock.
//!
//! Everything that happens over time goes through [`RoundEngine::advance`],
//! which slices elapsed time into fixed ticks. Asset loads happen outside the
//! engine; the caller asks for a [`LoadRequest`] and hands the result back
//! through [`RoundEngine::on_assets_loaded`].

use std::time::Duration;

use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::animation::SearchAnimation;
use crate::assets::RoundAssets;
use crate::config::Config;
use crate::error::{AssetError, EngineError, EngineResult};
use crate::geometry::Point;
use crate::render::{DrawCommand, Layer, RenderSurface, Stroke};
use crate::reveal::{plan_reveal, RevealStep, Scheduler};
use crate::round::{CountdownBand, Round, RoundData, RoundPhase};
use crate::scores::{ScoreStore, ScoreSubmission};
use crate::session::{RoundOutcome, SessionResult, SessionState};
use crate::{RoundId, TICK_RATE_MS};

/// Engine clock resolution
pub const STEP: Duration = Duration::from_millis(TICK_RATE_MS);
/// Hint circle radius at the reference resolution
pub const HINT_RADIUS: f64 = 100.0;

/// A round id whose assets the caller should fetch, tagged with the
/// generation the result must carry back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRequest {
    pub generation: u64,
    pub id: RoundId,
}

pub struct RoundEngine<S: RenderSurface> {
    config: Config,
    surface: S,
    rng: StdRng,
    round: Round,
    session: SessionState,
    scheduler: Scheduler<RevealStep>,
    animation: SearchAnimation,
    generation: u64,
    carry: Duration,
}

impl<S: RenderSurface> RoundEngine<S> {
    pub fn new(config: Config, surface: S, seed: u64) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            round: Round::new(config.round_secs),
            session: SessionState::new(config.session()),
            config,
            surface,
            rng: StdRng::seed_from_u64(seed),
            scheduler: Scheduler::new(),
            animation: SearchAnimation::new(),
            generation: 0,
            carry: Duration::ZERO,
        })
    }

    fn draw(&mut self, cmd: DrawCommand) {
        self.surface.draw(cmd);
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Draw a fresh scan and enter `Loading`
    pub fn start_round(&mut self) -> EngineResult<LoadRequest> {
        if self.session.is_over() {
            return Err(EngineError::SessionOver);
        }
        if !self.round.phase().can_start() {
            return Err(EngineError::InvalidTransition {
                phase: self.round.phase(),
                action: "start a round",
            });
        }

        let id = self
            .session
            .draw_round_id(&mut self.rng)
            .ok_or(EngineError::PoolExhausted)?;

        if let Some(clear) = self.animation.cancel() {
            self.draw(clear);
        }
        self.draw(DrawCommand::Clear(Layer::Scene));

        let generation = self.next_generation();
        self.round.begin(id, generation)?;
        self.session.rounds_started += 1;

        log::info!(
            "round {}/{} started with scan #{id}",
            self.session.round_index + 1,
            self.session.config.total_rounds
        );
        Ok(LoadRequest { generation, id })
    }

    /// The load the engine is currently waiting on, if any
    pub fn pending_load(&self) -> Option<LoadRequest> {
        match (self.round.phase(), self.round.id()) {
            (RoundPhase::Loading, Some(id)) => Some(LoadRequest {
                generation: self.generation,
                id,
            }),
            _ => None,
        }
    }

    /// Accept the result of a load.
    ///
    /// Results for a superseded generation are ignored (`Ok(false)`). A
    /// failed load is returned as an error and leaves the round in `Loading`
    /// so the caller can offer [`retry_load`](Self::retry_load) or
    /// [`skip_round`](Self::skip_round).
    pub fn on_assets_loaded(
        &mut self,
        generation: u64,
        result: Result<RoundAssets, AssetError>,
    ) -> EngineResult<bool> {
        if generation != self.generation || self.round.phase() != RoundPhase::Loading {
            log::debug!(
                "discarding load for generation {generation} (current {}, {:?})",
                self.generation,
                self.round.phase()
            );
            return Ok(false);
        }

        let assets = match result {
            Ok(assets) => assets.scaled_to(self.config.canvas_size),
            Err(e) => {
                log::warn!("failed to load round: {e}");
                return Err(e.into());
            }
        };

        let id = self.round.id().ok_or(EngineError::InvalidTransition {
            phase: RoundPhase::Loading,
            action: "show a scan",
        })?;
        let data = RoundData {
            id,
            image: assets.image,
            truth: assets.truth,
            predicted: assets.predicted,
        };

        self.draw(DrawCommand::Clear(Layer::Scene));
        self.draw(DrawCommand::Clear(Layer::Animation));
        self.draw(DrawCommand::Image(data.image.clone()));
        self.round.image_ready(data)?;
        log::debug!("scan #{id} shown, countdown running");
        Ok(true)
    }

    /// Request the same scan again under a new generation
    pub fn retry_load(&mut self) -> EngineResult<LoadRequest> {
        let id = match (self.round.phase(), self.round.id()) {
            (RoundPhase::Loading, Some(id)) => id,
            (phase, _) => {
                return Err(EngineError::InvalidTransition {
                    phase,
                    action: "retry a load",
                })
            }
        };
        let generation = self.next_generation();
        self.round.retarget(id, generation)?;
        Ok(LoadRequest { generation, id })
    }

    /// Give up on the scan being loaded and draw another unseen one
    pub fn skip_round(&mut self) -> EngineResult<LoadRequest> {
        if self.round.phase() != RoundPhase::Loading {
            return Err(EngineError::InvalidTransition {
                phase: self.round.phase(),
                action: "skip a scan",
            });
        }
        let id = self
            .session
            .draw_round_id(&mut self.rng)
            .ok_or(EngineError::PoolExhausted)?;
        let generation = self.next_generation();
        self.round.retarget(id, generation)?;
        log::info!("skipped to scan #{id}");
        Ok(LoadRequest { generation, id })
    }

    /// Register a click in canvas coordinates. Returns whether it resolved
    /// the round; clicks outside the live phases are ignored.
    pub fn click(&mut self, at: Point) -> bool {
        if !self.round.click(at) {
            return false;
        }
        log::debug!("player clicked at ({:.1}, {:.1})", at.x, at.y);
        if let Err(e) = self.begin_reveal() {
            log::warn!("could not resolve round: {e}");
        }
        true
    }

    /// Run the logical clock forward, one tick per elapsed step
    pub fn advance(&mut self, elapsed: Duration) {
        self.carry += elapsed;
        while self.carry >= STEP {
            self.carry -= STEP;
            self.step();
        }
    }

    fn step(&mut self) {
        self.scheduler.advance(STEP);
        self.fire_due();

        for cmd in self.animation.update() {
            self.draw(cmd);
        }

        let Some(report) = self.round.tick(&mut self.rng) else {
            return;
        };
        if let Some(center) = report.hint {
            let radius = HINT_RADIUS * self.config.canvas_size / crate::assets::REFERENCE_RESOLUTION;
            self.draw(DrawCommand::Circle {
                center,
                radius,
                stroke: Stroke::Hint,
            });
            log::debug!("hint shown at {:.1}s", report.remaining);
        }
        if report.timed_out {
            log::debug!("time ran out");
            if let Err(e) = self.begin_reveal() {
                log::warn!("could not resolve round: {e}");
            }
        }
    }

    /// `Resolving -> Revealing`: compute the outcome and schedule its reveal
    fn begin_reveal(&mut self) -> EngineResult<()> {
        let outcome = self.round.resolve()?;
        let steps = match self.round.data() {
            Some(data) => plan_reveal(data, &outcome),
            None => Vec::new(),
        };
        for step in steps {
            self.scheduler.schedule(step.delay, self.generation, step);
        }
        self.animation.start(self.config.canvas_size);
        log::info!(
            "scan #{} resolved: player {}, AI {}",
            outcome.round_id,
            verdict(outcome.player_correct),
            verdict(outcome.ai_correct)
        );
        self.fire_due();
        Ok(())
    }

    fn fire_due(&mut self) {
        for step in self.scheduler.drain_due(self.generation) {
            let completes = step.completes_round();
            for cmd in step.commands {
                self.draw(cmd);
            }
            if completes {
                self.finish_round();
            }
        }
    }

    /// `Revealing -> RoundComplete`: the only place scores change
    fn finish_round(&mut self) {
        let outcome = match self.round.complete() {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("reveal finished out of order: {e}");
                return;
            }
        };
        self.session.record_outcome(outcome);
        log::info!(
            "round {} scored, player {} vs AI {}",
            self.session.round_index,
            self.session.player_score,
            self.session.ai_score
        );
        if let Some(result) = self.session.session_result() {
            log::info!("session over: {result}");
        }
    }

    /// Drop the session and anything in flight. Pending reveal stages of
    /// the abandoned round are dropped unfired, so it awards no points.
    pub fn restart_session(&mut self) {
        self.next_generation();
        self.round.abandon();
        self.session = SessionState::new(self.config.session());
        self.carry = Duration::ZERO;
        if let Some(clear) = self.animation.cancel() {
            self.draw(clear);
        }
        self.draw(DrawCommand::Clear(Layer::Scene));
        log::info!("session restarted");
    }

    /// Persist the player's final score. Failure never touches the
    /// in-memory totals.
    pub fn submit_score(
        &self,
        store: &dyn ScoreStore,
        player_id: &str,
        at: DateTime<Local>,
    ) -> EngineResult<()> {
        if !self.session.is_over() {
            return Err(EngineError::SessionInProgress);
        }
        let submission = ScoreSubmission {
            submitted_at: at,
            player_id: player_id.to_string(),
            score: self.session.player_score,
        };
        store.submit(&submission).map_err(|e| {
            log::warn!("score submission failed: {e}");
            EngineError::from(e)
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn phase(&self) -> RoundPhase {
        self.round.phase()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn remaining(&self) -> f64 {
        self.round.timer().remaining()
    }

    pub fn band(&self) -> CountdownBand {
        self.round.band()
    }

    /// Countdown progress in `[0, 1]`
    pub fn progress(&self) -> f64 {
        self.round.timer().fraction_left()
    }

    /// Outcome of the current round once the reveal has finished
    pub fn visible_outcome(&self) -> Option<RoundOutcome> {
        if self.round.results_visible() {
            self.round.outcome()
        } else {
            None
        }
    }

    pub fn session_result(&self) -> Option<SessionResult> {
        self.session.session_result()
    }

    pub fn can_start_round(&self) -> bool {
        !self.session.is_over() && self.round.phase().can_start()
    }

    pub fn animating(&self) -> bool {
        self.animation.is_active
    }
}

fn verdict(correct: bool) -> &'static str {
    if correct {
        "correct"
    } else {
        "wrong"
    }
}
