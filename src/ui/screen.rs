use ratatui::Frame;

use crate::{ui::leaderboard::render_leaderboard, App, AppState};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Play screen - scan, countdown and results panel via the App widget
pub struct PlayScreen;

impl Screen for PlayScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

pub struct LeaderboardScreen;

impl Screen for LeaderboardScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_leaderboard(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Playing => Box::new(PlayScreen),
        AppState::Leaderboard => Box::new(LeaderboardScreen),
    }
}
