use chrono::{DateTime, Datelike, Local};
use rusqlite::{params, Connection};
use std::fmt;
use std::path::Path;

use crate::app_dirs::AppDirs;
use crate::error::ScoreError;

/// Leaderboard partition a score is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreBucket {
    /// Day of week, Sunday = 0
    Daily(u32),
    /// Month of year, January = 0
    Monthly(u32),
    AllTime(i32),
}

impl ScoreBucket {
    /// The three buckets a submission made at `at` lands in
    pub fn for_date(at: &DateTime<Local>) -> [ScoreBucket; 3] {
        [
            ScoreBucket::Daily(at.weekday().num_days_from_sunday()),
            ScoreBucket::Monthly(at.month0()),
            ScoreBucket::AllTime(at.year()),
        ]
    }

    fn kind(&self) -> &'static str {
        match self {
            ScoreBucket::Daily(_) => "daily",
            ScoreBucket::Monthly(_) => "monthly",
            ScoreBucket::AllTime(_) => "all_time",
        }
    }

    fn key(&self) -> i64 {
        match *self {
            ScoreBucket::Daily(d) => i64::from(d),
            ScoreBucket::Monthly(m) => i64::from(m),
            ScoreBucket::AllTime(y) => i64::from(y),
        }
    }
}

impl fmt::Display for ScoreBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const DAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
        const MONTHS: [&str; 12] = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        match *self {
            ScoreBucket::Daily(d) => write!(f, "{}", DAYS.get(d as usize).unwrap_or(&"?")),
            ScoreBucket::Monthly(m) => write!(f, "{}", MONTHS.get(m as usize).unwrap_or(&"?")),
            ScoreBucket::AllTime(y) => write!(f, "{y}"),
        }
    }
}

/// A finished session's score, ready to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSubmission {
    pub submitted_at: DateTime<Local>,
    pub player_id: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub player_id: String,
    pub score: u32,
    pub submitted_at: DateTime<Local>,
}

pub trait ScoreStore {
    fn submit(&self, submission: &ScoreSubmission) -> Result<(), ScoreError>;
    fn top_scores(
        &self,
        bucket: ScoreBucket,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, ScoreError>;
}

/// Score store backed by a local SQLite file
#[derive(Debug)]
pub struct SqliteScoreStore {
    conn: Connection,
}

impl SqliteScoreStore {
    /// Open the store at the default state location
    pub fn new() -> Result<Self, ScoreError> {
        let path = AppDirs::db_path().unwrap_or_else(|| "spotr_scores.db".into());
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ScoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, ScoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, ScoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS scores (
                bucket_kind TEXT NOT NULL,
                bucket_key INTEGER NOT NULL,
                player_id TEXT NOT NULL,
                score INTEGER NOT NULL,
                submitted_at TEXT NOT NULL,
                PRIMARY KEY (bucket_kind, bucket_key, player_id)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_scores_bucket ON scores(bucket_kind, bucket_key, score)",
            [],
        )?;

        Ok(Self { conn })
    }
}

impl ScoreStore for SqliteScoreStore {
    /// One row per bucket; a player's later submission replaces their
    /// earlier one in the same bucket
    fn submit(&self, submission: &ScoreSubmission) -> Result<(), ScoreError> {
        let player_id = submission.player_id.trim();
        if player_id.is_empty() {
            return Err(ScoreError::EmptyPlayerId);
        }

        let submitted_at = submission.submitted_at.to_rfc3339();
        for bucket in ScoreBucket::for_date(&submission.submitted_at) {
            self.conn.execute(
                r#"
                INSERT OR REPLACE INTO scores
                (bucket_kind, bucket_key, player_id, score, submitted_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    bucket.kind(),
                    bucket.key(),
                    player_id,
                    submission.score,
                    submitted_at,
                ],
            )?;
        }

        log::info!(
            "recorded score {} for {player_id} at {submitted_at}",
            submission.score
        );
        Ok(())
    }

    fn top_scores(
        &self,
        bucket: ScoreBucket,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, ScoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT player_id, score, submitted_at
            FROM scores
            WHERE bucket_kind = ?1 AND bucket_key = ?2
            ORDER BY score DESC, submitted_at ASC
            LIMIT ?3
            "#,
        )?;

        let rows = stmt.query_map(
            params![bucket.kind(), bucket.key(), limit as i64],
            |row| {
                let timestamp_str: String = row.get(2)?;
                let submitted_at = DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|_| {
                        rusqlite::Error::InvalidColumnType(
                            2,
                            "submitted_at".to_string(),
                            rusqlite::types::Type::Text,
                        )
                    })?
                    .with_timezone(&Local);

                Ok(LeaderboardEntry {
                    player_id: row.get(0)?,
                    score: row.get(1)?,
                    submitted_at,
                })
            },
        )?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }
}
