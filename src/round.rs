//! Per-round state machine.
//!
//! `Idle -> Loading -> Countdown -> (HintShown) -> Resolving -> Revealing -> RoundComplete`
//!
//! The machine only tracks state and computes correctness. Scheduling of
//! the staged reveal and folding scores into the session is done by the
//! engine that owns it.

use rand::Rng;

use crate::error::{EngineError, EngineResult};
use crate::geometry::{contains, overlap_ratio, BoundingBox, Point};
use crate::render::ScanImage;
use crate::session::RoundOutcome;
use crate::timer::Countdown;
use crate::RoundId;

/// AI is judged correct when its box overlaps the truth by more than this
pub const AI_IOU_THRESHOLD: f64 = 0.5;
/// Countdown at or below this reveals the hint and turns the clock orange
pub const WARNING_SECS: f64 = 5.0;
/// Countdown at or below this turns the clock red
pub const CRITICAL_SECS: f64 = 2.0;
/// Maximum hint offset from the lesion centre on each axis, in canvas px
pub const HINT_JITTER: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    Loading,
    Countdown,
    HintShown,
    Resolving,
    Revealing,
    RoundComplete,
}

impl RoundPhase {
    /// Phases in which the clock runs and clicks are accepted
    pub fn is_live(&self) -> bool {
        matches!(self, RoundPhase::Countdown | RoundPhase::HintShown)
    }

    /// Phases from which a new round may be started
    pub fn can_start(&self) -> bool {
        matches!(self, RoundPhase::Idle | RoundPhase::RoundComplete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownBand {
    Neutral,
    Warning,
    Critical,
}

impl CountdownBand {
    pub fn for_remaining(remaining: f64) -> Self {
        if remaining <= CRITICAL_SECS {
            CountdownBand::Critical
        } else if remaining <= WARNING_SECS {
            CountdownBand::Warning
        } else {
            CountdownBand::Neutral
        }
    }
}

/// Everything a round needs once loaded, already in canvas coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct RoundData {
    pub id: RoundId,
    pub image: ScanImage,
    pub truth: BoundingBox,
    pub predicted: BoundingBox,
}

impl RoundData {
    pub fn ai_correct(&self) -> bool {
        overlap_ratio(&self.truth, &self.predicted) > AI_IOU_THRESHOLD
    }

    pub fn player_correct(&self, click: Point) -> bool {
        contains(&self.truth, click.x, click.y)
    }
}

/// What happened on one clock tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub remaining: f64,
    pub band: CountdownBand,
    /// Set on the single tick that reveals the hint
    pub hint: Option<Point>,
    pub timed_out: bool,
}

#[derive(Debug, Clone)]
pub struct Round {
    phase: RoundPhase,
    generation: u64,
    id: Option<RoundId>,
    data: Option<RoundData>,
    timer: Countdown,
    band: CountdownBand,
    hinted: bool,
    clicked: bool,
    results_visible: bool,
    hint: Option<Point>,
    click: Option<Point>,
    outcome: Option<RoundOutcome>,
}

impl Round {
    pub fn new(round_secs: f64) -> Self {
        Self {
            phase: RoundPhase::Idle,
            generation: 0,
            id: None,
            data: None,
            timer: Countdown::new(round_secs),
            band: CountdownBand::Neutral,
            hinted: false,
            clicked: false,
            results_visible: false,
            hint: None,
            click: None,
            outcome: None,
        }
    }

    fn invalid(&self, action: &'static str) -> EngineError {
        EngineError::InvalidTransition {
            phase: self.phase,
            action,
        }
    }

    /// `Idle/RoundComplete -> Loading` for a freshly drawn round id
    pub fn begin(&mut self, id: RoundId, generation: u64) -> EngineResult<()> {
        if !self.phase.can_start() {
            return Err(self.invalid("start a round"));
        }
        self.timer.reset();
        self.phase = RoundPhase::Loading;
        self.generation = generation;
        self.id = Some(id);
        self.data = None;
        self.band = CountdownBand::Neutral;
        self.hinted = false;
        self.clicked = false;
        self.results_visible = false;
        self.hint = None;
        self.click = None;
        self.outcome = None;
        Ok(())
    }

    /// Point a still-loading round at a different id (used to skip a scan
    /// whose assets cannot be loaded)
    pub fn retarget(&mut self, id: RoundId, generation: u64) -> EngineResult<()> {
        if self.phase != RoundPhase::Loading {
            return Err(self.invalid("skip a scan"));
        }
        self.id = Some(id);
        self.generation = generation;
        Ok(())
    }

    /// `Loading -> Countdown`; the clock starts now
    pub fn image_ready(&mut self, data: RoundData) -> EngineResult<()> {
        if self.phase != RoundPhase::Loading {
            return Err(self.invalid("show a scan"));
        }
        self.data = Some(data);
        self.phase = RoundPhase::Countdown;
        self.timer.start();
        Ok(())
    }

    /// Advance the clock by one tick. Returns `None` when the clock is not
    /// running, so nothing can tick a resolved round.
    pub fn tick<R: Rng>(&mut self, rng: &mut R) -> Option<TickReport> {
        if !self.phase.is_live() || !self.timer.is_running() {
            return None;
        }

        let remaining = self.timer.tick();
        self.band = CountdownBand::for_remaining(remaining);

        if remaining <= 0.0 {
            self.timer.stop();
            self.phase = RoundPhase::Resolving;
            return Some(TickReport {
                remaining,
                band: self.band,
                hint: None,
                timed_out: true,
            });
        }

        let mut hint = None;
        if remaining <= WARNING_SECS && !self.hinted && !self.clicked {
            if let Some(data) = &self.data {
                let center = data.truth.center();
                let at = center.offset(
                    rng.gen_range(-HINT_JITTER..=HINT_JITTER),
                    rng.gen_range(-HINT_JITTER..=HINT_JITTER),
                );
                self.hinted = true;
                self.hint = Some(at);
                self.phase = RoundPhase::HintShown;
                hint = Some(at);
            }
        }

        Some(TickReport {
            remaining,
            band: self.band,
            hint,
            timed_out: false,
        })
    }

    /// First click while the clock runs resolves the round. Later clicks,
    /// and clicks outside the live phases, are ignored.
    pub fn click(&mut self, at: Point) -> bool {
        if !self.phase.is_live()
            || self.clicked
            || !self.timer.is_running()
            || self.timer.is_exhausted()
        {
            return false;
        }
        self.timer.stop();
        self.clicked = true;
        self.click = Some(at);
        self.phase = RoundPhase::Resolving;
        true
    }

    /// `Resolving -> Revealing`: correctness is computed exactly once
    pub fn resolve(&mut self) -> EngineResult<RoundOutcome> {
        if self.phase != RoundPhase::Resolving {
            return Err(self.invalid("resolve the round"));
        }
        let (Some(id), Some(data)) = (self.id, &self.data) else {
            return Err(self.invalid("resolve the round"));
        };

        let outcome = RoundOutcome {
            round_id: id,
            player_click: self.click,
            player_correct: self.click.map(|c| data.player_correct(c)).unwrap_or(false),
            ai_correct: data.ai_correct(),
        };
        self.outcome = Some(outcome);
        self.phase = RoundPhase::Revealing;
        Ok(outcome)
    }

    /// `Revealing -> RoundComplete`: results become visible
    pub fn complete(&mut self) -> EngineResult<RoundOutcome> {
        let outcome = match (self.phase, self.outcome) {
            (RoundPhase::Revealing, Some(outcome)) => outcome,
            _ => return Err(self.invalid("finish the reveal")),
        };
        self.results_visible = true;
        self.phase = RoundPhase::RoundComplete;
        Ok(outcome)
    }

    /// Drop whatever is in flight and return to `Idle`
    pub fn abandon(&mut self) {
        self.timer.reset();
        self.phase = RoundPhase::Idle;
        self.id = None;
        self.data = None;
        self.band = CountdownBand::Neutral;
        self.hinted = false;
        self.clicked = false;
        self.results_visible = false;
        self.hint = None;
        self.click = None;
        self.outcome = None;
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn id(&self) -> Option<RoundId> {
        self.id
    }

    pub fn data(&self) -> Option<&RoundData> {
        self.data.as_ref()
    }

    pub fn timer(&self) -> &Countdown {
        &self.timer
    }

    pub fn band(&self) -> CountdownBand {
        self.band
    }

    pub fn hinted(&self) -> bool {
        self.hinted
    }

    pub fn hint(&self) -> Option<Point> {
        self.hint
    }

    pub fn clicked(&self) -> bool {
        self.clicked
    }

    pub fn click_point(&self) -> Option<Point> {
        self.click
    }

    pub fn results_visible(&self) -> bool {
        self.results_visible
    }

    pub fn outcome(&self) -> Option<RoundOutcome> {
        self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn data() -> RoundData {
        RoundData {
            id: 3,
            image: ScanImage::Speckle(vec![]),
            truth: BoundingBox::new(100.0, 100.0, 200.0, 200.0),
            predicted: BoundingBox::new(110.0, 110.0, 210.0, 210.0),
        }
    }

    fn live_round() -> Round {
        let mut round = Round::new(10.0);
        round.begin(3, 1).unwrap();
        round.image_ready(data()).unwrap();
        round
    }

    fn tick_n(round: &mut Round, rng: &mut StdRng, n: usize) -> Vec<TickReport> {
        (0..n).filter_map(|_| round.tick(rng)).collect()
    }

    #[test]
    fn test_begin_from_idle() {
        let mut round = Round::new(10.0);
        assert_eq!(round.phase(), RoundPhase::Idle);
        round.begin(5, 1).unwrap();
        assert_eq!(round.phase(), RoundPhase::Loading);
        assert_eq!(round.id(), Some(5));
        assert_eq!(round.timer().remaining(), 10.0);
        assert!(!round.timer().is_running());
    }

    #[test]
    fn test_begin_rejected_mid_round() {
        let mut round = live_round();
        assert_matches!(
            round.begin(9, 2),
            Err(EngineError::InvalidTransition {
                phase: RoundPhase::Countdown,
                ..
            })
        );
    }

    #[test]
    fn test_image_ready_starts_clock() {
        let round = live_round();
        assert_eq!(round.phase(), RoundPhase::Countdown);
        assert!(round.timer().is_running());
    }

    #[test]
    fn test_bands_follow_remaining_time() {
        assert_eq!(CountdownBand::for_remaining(10.0), CountdownBand::Neutral);
        assert_eq!(CountdownBand::for_remaining(5.1), CountdownBand::Neutral);
        assert_eq!(CountdownBand::for_remaining(5.0), CountdownBand::Warning);
        assert_eq!(CountdownBand::for_remaining(2.1), CountdownBand::Warning);
        assert_eq!(CountdownBand::for_remaining(2.0), CountdownBand::Critical);
        assert_eq!(CountdownBand::for_remaining(0.0), CountdownBand::Critical);
    }

    #[test]
    fn test_hint_fires_once_at_five_seconds() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut round = live_round();

        let reports = tick_n(&mut round, &mut rng, 80);
        let hints: Vec<(usize, Point)> = reports
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.hint.map(|h| (i, h)))
            .collect();

        assert_eq!(hints.len(), 1);
        // 50th tick takes the clock from 5.1 to 5.0
        assert_eq!(hints[0].0, 49);
        assert_eq!(round.phase(), RoundPhase::HintShown);

        let center = data().truth.center();
        let hint = hints[0].1;
        assert!((hint.x - center.x).abs() <= HINT_JITTER);
        assert!((hint.y - center.y).abs() <= HINT_JITTER);
    }

    #[test]
    fn test_no_hint_after_click() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut round = live_round();
        tick_n(&mut round, &mut rng, 10);
        assert!(round.click(Point::new(150.0, 150.0)));

        let reports = tick_n(&mut round, &mut rng, 90);
        assert!(reports.is_empty());
        assert!(!round.hinted());
    }

    #[test]
    fn test_click_resolves_and_second_click_is_ignored() {
        let mut round = live_round();
        assert!(round.click(Point::new(150.0, 150.0)));
        assert_eq!(round.phase(), RoundPhase::Resolving);
        assert!(!round.timer().is_running());

        assert!(!round.click(Point::new(10.0, 10.0)));
        assert_eq!(round.click_point(), Some(Point::new(150.0, 150.0)));
    }

    #[test]
    fn test_click_ignored_when_not_live() {
        let mut round = Round::new(10.0);
        assert!(!round.click(Point::new(1.0, 1.0)));
        round.begin(1, 1).unwrap();
        assert!(!round.click(Point::new(1.0, 1.0)));
        assert_eq!(round.phase(), RoundPhase::Loading);
    }

    #[test]
    fn test_player_hit_on_edge_counts() {
        let mut round = live_round();
        round.click(Point::new(100.0, 200.0));
        let outcome = round.resolve().unwrap();
        assert!(outcome.player_correct);
        assert!(outcome.ai_correct);
    }

    #[test]
    fn test_player_miss() {
        let mut round = live_round();
        round.click(Point::new(20.0, 20.0));
        let outcome = round.resolve().unwrap();
        assert!(!outcome.player_correct);
        assert_eq!(round.phase(), RoundPhase::Revealing);
    }

    #[test]
    fn test_timeout_at_exactly_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut round = live_round();

        let reports = tick_n(&mut round, &mut rng, 100);
        let last = reports.last().unwrap();
        assert!(last.timed_out);
        assert_eq!(last.remaining, 0.0);
        assert_eq!(round.phase(), RoundPhase::Resolving);

        // clock is stopped: no more ticks, no late click
        assert!(round.tick(&mut rng).is_none());
        assert!(!round.click(Point::new(150.0, 150.0)));

        let outcome = round.resolve().unwrap();
        assert!(outcome.timed_out());
        assert!(!outcome.player_correct);
        assert!(outcome.ai_correct);
    }

    #[test]
    fn test_identical_prediction_is_correct() {
        let mut d = data();
        d.predicted = d.truth;
        assert!(d.ai_correct());
    }

    #[test]
    fn test_complete_marks_results_visible() {
        let mut round = live_round();
        round.click(Point::new(150.0, 150.0));
        round.resolve().unwrap();
        assert!(!round.results_visible());

        let outcome = round.complete().unwrap();
        assert!(outcome.player_correct);
        assert!(round.results_visible());
        assert!(round.phase().can_start());

        assert_matches!(round.complete(), Err(EngineError::InvalidTransition { .. }));
    }

    #[test]
    fn test_begin_clears_previous_round() {
        let mut round = live_round();
        round.click(Point::new(150.0, 150.0));
        round.resolve().unwrap();
        round.complete().unwrap();

        round.begin(8, 2).unwrap();
        assert!(!round.clicked());
        assert!(!round.hinted());
        assert!(!round.results_visible());
        assert_eq!(round.outcome(), None);
        assert_eq!(round.generation(), 2);
    }

    #[test]
    fn test_abandon_returns_to_idle() {
        let mut round = live_round();
        round.abandon();
        assert_eq!(round.phase(), RoundPhase::Idle);
        assert!(round.data().is_none());
    }
}
