//! Error types for asset loading, score submission and the round engine.

use std::fmt;
use std::io;

use crate::round::RoundPhase;
use crate::RoundId;

/// Failure to produce the assets for a round
#[derive(Debug)]
pub enum AssetError {
    /// No round data exists for this id.
    NotFound(RoundId),
    /// The data exists but could not be read.
    Io { id: RoundId, source: io::Error },
    /// The annotation was read but is not usable.
    Malformed { id: RoundId, reason: String },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::NotFound(id) => write!(f, "no round data for scan #{id}"),
            AssetError::Io { id, source } => write!(f, "failed to read scan #{id}: {source}"),
            AssetError::Malformed { id, reason } => {
                write!(f, "malformed annotation for scan #{id}: {reason}")
            }
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failure to persist or query final scores
#[derive(Debug)]
pub enum ScoreError {
    EmptyPlayerId,
    Storage(rusqlite::Error),
}

impl fmt::Display for ScoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreError::EmptyPlayerId => write!(f, "a username is required to submit a score"),
            ScoreError::Storage(e) => write!(f, "score store error: {e}"),
        }
    }
}

impl std::error::Error for ScoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScoreError::Storage(e) => Some(e),
            ScoreError::EmptyPlayerId => None,
        }
    }
}

impl From<rusqlite::Error> for ScoreError {
    fn from(e: rusqlite::Error) -> Self {
        ScoreError::Storage(e)
    }
}

/// Errors surfaced by the round engine's public operations
#[derive(Debug)]
pub enum EngineError {
    /// The requested action is not valid in the current round phase.
    InvalidTransition {
        phase: RoundPhase,
        action: &'static str,
    },
    /// All rounds of the session have been played.
    SessionOver,
    /// Every scan in the pool has already been drawn this session.
    PoolExhausted,
    /// The session has rounds left; final scores cannot be submitted yet.
    SessionInProgress,
    Asset(AssetError),
    Score(ScoreError),
    InvalidConfig(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidTransition { phase, action } => {
                write!(f, "cannot {action} while the round is {phase:?}")
            }
            EngineError::SessionOver => write!(f, "the session is over"),
            EngineError::PoolExhausted => write!(f, "no unseen scans left this session"),
            EngineError::SessionInProgress => write!(f, "the session is still in progress"),
            EngineError::Asset(e) => write!(f, "{e}"),
            EngineError::Score(e) => write!(f, "{e}"),
            EngineError::InvalidConfig(reason) => write!(f, "invalid configuration: {reason}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Asset(e) => Some(e),
            EngineError::Score(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AssetError> for EngineError {
    fn from(e: AssetError) -> Self {
        EngineError::Asset(e)
    }
}

impl From<ScoreError> for EngineError {
    fn from(e: ScoreError) -> Self {
        EngineError::Score(e)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            AssetError::NotFound(42).to_string(),
            "no round data for scan #42"
        );
        assert_eq!(
            EngineError::InvalidTransition {
                phase: RoundPhase::Countdown,
                action: "start a round"
            }
            .to_string(),
            "cannot start a round while the round is Countdown"
        );
        assert_eq!(
            ScoreError::EmptyPlayerId.to_string(),
            "a username is required to submit a score"
        );
    }

    #[test]
    fn test_asset_error_converts_into_engine_error() {
        let err: EngineError = AssetError::NotFound(7).into();
        assert!(matches!(err, EngineError::Asset(AssetError::NotFound(7))));
        assert!(std::error::Error::source(&err).is_some());
    }
}
