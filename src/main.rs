pub mod ui;

use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyModifiers, MouseButton,
        MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Frame, Terminal,
};
use std::{
    error::Error,
    fs,
    io::{self, stdin},
    path::PathBuf,
    sync::{mpsc::Sender, Arc},
    time::{Duration, Instant},
};

use spotr::{
    app_dirs::AppDirs,
    assets::{AssetProvider, FsAssetProvider, RoundAssets, SyntheticAssetProvider},
    config::{Config, ConfigStore, FileConfigStore},
    engine::{LoadRequest, RoundEngine},
    error::{AssetError, EngineError},
    render::DisplayList,
    runtime::{spawn_load, CrosstermEventSource, FixedTicker, GameEvent, GameEventSource, Runner, Ticker},
    scores::{LeaderboardEntry, ScoreBucket, ScoreStore, SqliteScoreStore},
    TICK_RATE_MS,
};

/// Longest username accepted on the end-of-session screen
const MAX_NAME_LEN: usize = 24;
const LEADERBOARD_SIZE: usize = 20;

/// spot the lesion before the AI does
#[derive(Parser, Debug, Clone, Default)]
#[clap(
    version,
    about,
    long_about = "A timed duel in the terminal: find the lesion on each scan before the clock runs out, then see whether a precomputed AI prediction did better."
)]
pub struct Cli {
    /// number of rounds in a session
    #[clap(short = 'r', long)]
    rounds: Option<u32>,

    /// seconds on the clock each round
    #[clap(short = 's', long)]
    seconds: Option<f64>,

    /// directory holding annotation/ and images/ (synthetic scans when omitted)
    #[clap(short = 'c', long)]
    content: Option<PathBuf>,

    /// seed for scan selection, hints and synthetic scans
    #[clap(long)]
    seed: Option<u64>,

    /// username shown on the leaderboard
    #[clap(short = 'p', long)]
    player: Option<String>,

    /// logical size of the scan canvas in pixels
    #[clap(long)]
    canvas_size: Option<f64>,
}

impl Cli {
    /// Layer the command line over the stored configuration
    fn apply(&self, mut cfg: Config) -> Config {
        if let Some(rounds) = self.rounds {
            cfg.total_rounds = rounds;
        }
        if let Some(secs) = self.seconds {
            cfg.round_secs = secs;
        }
        if let Some(dir) = &self.content {
            cfg.content_dir = Some(dir.clone());
        }
        if let Some(seed) = self.seed {
            cfg.seed = Some(seed);
        }
        if let Some(player) = &self.player {
            cfg.player_name = Some(player.clone());
        }
        if let Some(size) = self.canvas_size {
            cfg.canvas_size = size;
        }
        cfg
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Playing,
    Leaderboard,
}

/// What the event loop must do after the app handled an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Nothing,
    Load(LoadRequest),
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardState {
    pub buckets: [ScoreBucket; 3],
    pub selected: usize,
    pub entries: Vec<LeaderboardEntry>,
    pub error: Option<String>,
}

impl Default for LeaderboardState {
    fn default() -> Self {
        Self {
            buckets: ScoreBucket::for_date(&Local::now()),
            selected: 0,
            entries: Vec::new(),
            error: None,
        }
    }
}

impl LeaderboardState {
    pub fn bucket(&self) -> ScoreBucket {
        self.buckets[self.selected % self.buckets.len()]
    }
}

pub struct App {
    pub engine: RoundEngine<DisplayList>,
    pub state: AppState,
    pub player_name: String,
    /// Non-blocking message, e.g. a failed score submission
    pub notice: Option<String>,
    pub load_error: Option<String>,
    /// Score saved, or submission skipped, for the finished session
    pub submitted: bool,
    pub leaderboard: LeaderboardState,
    store: Option<Box<dyn ScoreStore>>,
}

impl App {
    pub fn new(
        config: Config,
        seed: u64,
        store: Option<Box<dyn ScoreStore>>,
    ) -> Result<Self, EngineError> {
        let player_name = config.player_name.clone().unwrap_or_default();
        Ok(Self {
            engine: RoundEngine::new(config, DisplayList::new(), seed)?,
            state: AppState::Playing,
            player_name,
            notice: None,
            load_error: None,
            submitted: false,
            leaderboard: LeaderboardState::default(),
            store,
        })
    }

    fn load(&mut self, request: Result<LoadRequest, EngineError>) -> Effect {
        match request {
            Ok(req) => {
                self.load_error = None;
                Effect::Load(req)
            }
            Err(e) => {
                self.notice = Some(e.to_string());
                Effect::Nothing
            }
        }
    }

    pub fn new_session(&mut self) -> Effect {
        self.engine.restart_session();
        self.submitted = false;
        self.notice = None;
        self.load_error = None;
        let req = self.engine.start_round();
        self.load(req)
    }

    pub fn submit_score(&mut self) {
        let Some(store) = self.store.as_deref() else {
            self.notice = Some("Score store unavailable, score not saved".to_string());
            return;
        };
        match self
            .engine
            .submit_score(store, self.player_name.trim(), Local::now())
        {
            Ok(()) => {
                self.submitted = true;
                self.notice = Some(format!("Score saved for {}", self.player_name.trim()));
            }
            Err(e) => self.notice = Some(format!("Could not save score: {e}")),
        }
    }

    pub fn refresh_leaderboard(&mut self) {
        let bucket = self.leaderboard.bucket();
        match &self.store {
            Some(store) => match store.top_scores(bucket, LEADERBOARD_SIZE) {
                Ok(entries) => {
                    self.leaderboard.entries = entries;
                    self.leaderboard.error = None;
                }
                Err(e) => {
                    log::warn!("could not read leaderboard: {e}");
                    self.leaderboard.entries.clear();
                    self.leaderboard.error = Some(e.to_string());
                }
            },
            None => {
                self.leaderboard.entries.clear();
                self.leaderboard.error = Some("score store unavailable".to_string());
            }
        }
    }

    fn open_leaderboard(&mut self) {
        self.leaderboard = LeaderboardState::default();
        self.refresh_leaderboard();
        self.state = AppState::Leaderboard;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Effect {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Effect::Quit;
        }

        match self.state {
            AppState::Leaderboard => {
                match key.code {
                    KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('l') | KeyCode::Char('b') => {
                        self.state = AppState::Playing;
                    }
                    KeyCode::Tab | KeyCode::Right => {
                        self.leaderboard.selected = (self.leaderboard.selected + 1) % 3;
                        self.refresh_leaderboard();
                    }
                    KeyCode::BackTab | KeyCode::Left => {
                        self.leaderboard.selected = (self.leaderboard.selected + 2) % 3;
                        self.refresh_leaderboard();
                    }
                    _ => {}
                }
                Effect::Nothing
            }
            AppState::Playing if self.engine.session_result().is_some() => {
                self.handle_end_screen_key(key)
            }
            AppState::Playing => match key.code {
                KeyCode::Esc => Effect::Quit,
                KeyCode::Enter | KeyCode::Char(' ') if self.engine.can_start_round() => {
                    self.notice = None;
                    let req = self.engine.start_round();
                    self.load(req)
                }
                KeyCode::Char('r') if self.load_error.is_some() => {
                    let req = self.engine.retry_load();
                    self.load(req)
                }
                KeyCode::Char('s') if self.load_error.is_some() => {
                    let req = self.engine.skip_round();
                    self.load(req)
                }
                KeyCode::Char('l') if self.engine.can_start_round() => {
                    self.open_leaderboard();
                    Effect::Nothing
                }
                _ => Effect::Nothing,
            },
        }
    }

    fn handle_end_screen_key(&mut self, key: KeyEvent) -> Effect {
        if self.submitted {
            return match key.code {
                KeyCode::Esc => Effect::Quit,
                KeyCode::Enter | KeyCode::Char(' ') => self.new_session(),
                KeyCode::Char('l') => {
                    self.open_leaderboard();
                    Effect::Nothing
                }
                _ => Effect::Nothing,
            };
        }

        match key.code {
            KeyCode::Esc => return Effect::Quit,
            KeyCode::Enter => self.submit_score(),
            KeyCode::Tab => {
                self.submitted = true;
                self.notice = Some("Score not saved".to_string());
            }
            KeyCode::Backspace => {
                self.player_name.pop();
            }
            KeyCode::Char(c) if !c.is_control() && self.player_name.chars().count() < MAX_NAME_LEN => {
                self.player_name.push(c);
            }
            _ => {}
        }
        Effect::Nothing
    }

    /// Left clicks inside the scan become guesses
    pub fn handle_mouse(&mut self, mouse: MouseEvent, canvas: Rect) -> Effect {
        if self.state != AppState::Playing {
            return Effect::Nothing;
        }
        if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
            let size = self.engine.config().canvas_size;
            if let Some(at) = ui::canvas::project_click(canvas, mouse.column, mouse.row, size) {
                self.engine.click(at);
            }
        }
        Effect::Nothing
    }

    pub fn handle_loaded(&mut self, generation: u64, result: Result<RoundAssets, AssetError>) {
        match self.engine.on_assets_loaded(generation, result) {
            Ok(true) => self.load_error = None,
            Ok(false) => {}
            Err(e) => self.load_error = Some(e.to_string()),
        }
    }

    pub fn on_tick(&mut self, elapsed: Duration) {
        self.engine.advance(elapsed);
    }
}

fn init_logging() {
    // Only log when asked to, and never to the terminal we draw on
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    if let Ok(file) = fs::OpenOptions::new().create(true).append(true).open(&path) {
        env_logger::Builder::from_default_env()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let config_store = FileConfigStore::new();
    let config = cli.apply(config_store.load());
    if let Err(e) = config.validate() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::ValueValidation, e.to_string()).exit();
    }

    let seed = config.seed.unwrap_or_else(rand::random);
    let provider: Arc<dyn AssetProvider> = match &config.content_dir {
        Some(dir) => Arc::new(FsAssetProvider::new(dir)),
        None => Arc::new(SyntheticAssetProvider::new(seed, config.pool_size)),
    };
    let store: Option<Box<dyn ScoreStore>> = match SqliteScoreStore::new() {
        Ok(store) => Some(Box::new(store)),
        Err(e) => {
            log::warn!("scores will not be saved: {e}");
            None
        }
    };
    log::info!("starting with seed {seed}");

    let mut app = App::new(config, seed, store)?;

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = CrosstermEventSource::new();
    let tx = events.sender();
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));
    let result = start_tui(&mut terminal, &mut app, &runner, provider, tx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    let name = app.player_name.trim();
    if !name.is_empty() {
        let mut stored = config_store.load();
        stored.player_name = Some(name.to_string());
        if let Err(e) = config_store.save(&stored) {
            log::warn!("could not remember player name: {e}");
        }
    }

    result
}

fn start_tui<B: Backend, E: GameEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
    provider: Arc<dyn AssetProvider>,
    tx: Sender<GameEvent>,
) -> Result<(), Box<dyn Error>> {
    let mut last = Instant::now();
    terminal.draw(|f| ui(app, f))?;

    loop {
        let event = runner.step();

        // the engine clock follows wall time, whatever woke us up
        let now = Instant::now();
        app.on_tick(now - last);
        last = now;

        let effect = match event {
            GameEvent::Tick | GameEvent::Resize => Effect::Nothing,
            GameEvent::Key(key) => app.handle_key(key),
            GameEvent::Mouse(mouse) => {
                let size = terminal.size()?;
                let area = Rect::new(0, 0, size.width, size.height);
                app.handle_mouse(mouse, ui::canvas_inner(area))
            }
            GameEvent::Loaded { generation, result } => {
                app.handle_loaded(generation, result);
                Effect::Nothing
            }
        };

        match effect {
            Effect::Quit => break,
            Effect::Load(request) => {
                spawn_load(provider.clone(), request, tx.clone());
            }
            Effect::Nothing => {}
        }

        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    ui::screen::current_screen(&app.state).render(app, f);
}
