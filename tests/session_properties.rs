use std::collections::HashSet;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use spotr::assets::{AssetProvider, SyntheticAssetProvider};
use spotr::config::Config;
use spotr::engine::RoundEngine;
use spotr::error::EngineError;
use spotr::geometry::{overlap_ratio, BoundingBox, Point};
use spotr::render::DisplayList;
use spotr::round::RoundPhase;
use spotr::session::SessionResult;

/// How the simulated player behaves in a round
#[derive(Debug, Clone, Copy)]
enum Play {
    Hit,
    Miss,
    Timeout,
}

fn play_session(seed: u64) -> RoundEngine<DisplayList> {
    let provider = SyntheticAssetProvider::new(seed, 101);
    let mut engine = RoundEngine::new(Config::default(), DisplayList::new(), seed).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);

    while engine.can_start_round() {
        let request = engine.start_round().unwrap();
        engine
            .on_assets_loaded(request.generation, provider.load_round(request.id))
            .unwrap();

        // think for a while before acting
        engine.advance(Duration::from_millis(rng.gen_range(0..90) * 100));

        let truth = engine.round().data().unwrap().truth;
        let play = match rng.gen_range(0..3) {
            0 => Play::Hit,
            1 => Play::Miss,
            _ => Play::Timeout,
        };
        match play {
            Play::Hit => assert!(engine.click(truth.center())),
            Play::Miss => {
                let away = Point::new(truth.x_max + 1.0, truth.y_max + 1.0);
                assert!(engine.click(away));
            }
            Play::Timeout => {}
        }

        engine.advance(Duration::from_secs(13));
        assert_eq!(engine.phase(), RoundPhase::RoundComplete, "{play:?}");
    }
    engine
}

#[test]
fn every_round_is_scored_exactly_once() {
    for seed in [1, 7, 42, 2024, 9999] {
        let engine = play_session(seed);
        let session = engine.session();

        assert_eq!(session.round_index, 10);
        assert_eq!(session.history.len(), 10);
        assert_eq!(session.rounds_started, 10);

        let player_misses = session.history.iter().filter(|o| !o.player_correct).count() as u32;
        let ai_misses = session.history.iter().filter(|o| !o.ai_correct).count() as u32;
        assert_eq!(session.player_score + player_misses, 10);
        assert_eq!(session.ai_score + ai_misses, 10);
    }
}

#[test]
fn rounds_never_repeat_within_a_session() {
    for seed in [3, 5, 11] {
        let engine = play_session(seed);
        let ids: HashSet<u32> = engine
            .session()
            .history
            .iter()
            .map(|o| o.round_id)
            .collect();
        assert_eq!(ids.len(), 10);
        assert!(ids.iter().all(|id| *id < 101));
    }
}

#[test]
fn timeouts_never_score_for_the_player() {
    for seed in [8, 13, 21] {
        let engine = play_session(seed);
        for outcome in &engine.session().history {
            if outcome.timed_out() {
                assert!(!outcome.player_correct);
            }
        }
    }
}

#[test]
fn ai_verdict_matches_overlap_threshold() {
    let provider = SyntheticAssetProvider::new(77, 101);
    let engine = play_session(77);
    for outcome in &engine.session().history {
        let assets = provider.load_round(outcome.round_id).unwrap();
        let expected = overlap_ratio(&assets.truth, &assets.predicted) > 0.5;
        assert_eq!(outcome.ai_correct, expected);
    }
}

#[test]
fn session_result_follows_totals() {
    for seed in [1, 2, 3, 4, 5, 6] {
        let engine = play_session(seed);
        let session = engine.session();
        let expected = match session.player_score.cmp(&session.ai_score) {
            std::cmp::Ordering::Greater => SessionResult::PlayerWins,
            std::cmp::Ordering::Less => SessionResult::AiWins,
            std::cmp::Ordering::Equal => SessionResult::Draw,
        };
        assert_eq!(engine.session_result(), Some(expected));
    }
}

#[test]
fn finished_session_refuses_more_rounds() {
    let mut engine = play_session(31);
    assert!(matches!(engine.start_round(), Err(EngineError::SessionOver)));

    engine.restart_session();
    assert_eq!(engine.session().round_index, 0);
    assert!(engine.session().seen_round_ids.is_empty());
    assert!(engine.start_round().is_ok());
}

#[test]
fn overlap_examples_hold() {
    let truth = BoundingBox::new(100.0, 100.0, 200.0, 200.0);
    let predicted = BoundingBox::new(110.0, 110.0, 210.0, 210.0);
    let ratio = overlap_ratio(&truth, &predicted);
    assert!((ratio - 0.68).abs() < 0.01);
    assert_eq!(overlap_ratio(&truth, &truth), 1.0);
}
