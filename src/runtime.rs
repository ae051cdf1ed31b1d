use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, MouseEvent};

use crate::assets::{AssetProvider, RoundAssets};
use crate::engine::LoadRequest;
use crate::error::AssetError;

/// Unified event type consumed by the app runner
#[derive(Debug)]
pub enum GameEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize,
    Tick,
    /// A background asset load finished
    Loaded {
        generation: u64,
        result: Result<RoundAssets, AssetError>,
    },
}

/// Source of terminal events (keyboard, mouse, resize, etc.)
pub trait GameEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<GameEvent>,
    rx: Receiver<GameEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let input_tx = tx.clone();

        std::thread::spawn(move || loop {
            let ev = match event::read() {
                Ok(CtEvent::Key(key)) => GameEvent::Key(key),
                Ok(CtEvent::Mouse(mouse)) => GameEvent::Mouse(mouse),
                Ok(CtEvent::Resize(_, _)) => GameEvent::Resize,
                Ok(_) => continue,
                Err(_) => break,
            };
            if input_tx.send(ev).is_err() {
                break;
            }
        });

        Self { tx, rx }
    }

    /// Handle for feeding background results into the same queue as input
    pub fn sender(&self) -> Sender<GameEvent> {
        self.tx.clone()
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// How long the loop waits for input before it advances the round clock
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// A constant wait, normally one countdown step
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Feeds scripted keys, clicks and load results from a channel, for headless runs
pub struct TestEventSource {
    rx: Receiver<GameEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }
}

impl GameEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Pulls one game event per call, synthesising a `Tick` when the source is quiet
pub struct Runner<E: GameEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: GameEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Wait at most one ticker interval. A closed source also reads as a
    /// tick so the countdown keeps moving.
    pub fn step(&self) -> GameEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => GameEvent::Tick,
        }
    }
}

/// Load a round's assets off the UI thread and post the result back
pub fn spawn_load(
    provider: Arc<dyn AssetProvider>,
    request: LoadRequest,
    tx: Sender<GameEvent>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        log::debug!(
            "loading scan #{} for generation {}",
            request.id,
            request.generation
        );
        let result = provider.load_round(request.id);
        // receiver gone means the app is shutting down
        let _ = tx.send(GameEvent::Loaded {
            generation: request.generation,
            result,
        });
    })
}
