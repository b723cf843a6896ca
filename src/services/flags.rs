use crate::db::Db;
use crate::error::AppError;
use rusqlite::{params, OptionalExtension};
use serde::Deserialize;

const RANKING_FLAG_KEY: &str = "leaderboard";

const DEFAULT_TOP_N: i64 = 10;
const DEFAULT_VERSION: i64 = 1;
const DEFAULT_TTL_MS: i64 = 60_000;
const MIN_TTL_MS: i64 = 5_000;
const MAX_TTL_MS: i64 = 3_600_000;

/// Effective ranking configuration, resolved per request from the
/// `leaderboard` feature flag and clamped to sane bounds.
#[derive(Debug, Clone, Copy)]
pub struct RankingConfig {
    pub top_n: i64,
    pub version: i64,
    pub ttl_ms: i64,
    pub hide_guests: bool,
    pub weekly_enabled: bool,
}

impl Default for RankingConfig {
    fn default() -> Self {
        RankingConfig {
            top_n: DEFAULT_TOP_N,
            version: DEFAULT_VERSION,
            ttl_ms: DEFAULT_TTL_MS,
            hide_guests: false,
            weekly_enabled: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawRankingFlag {
    top_n: Option<i64>,
    version: Option<i64>,
    snapshot_ttl_ms: Option<i64>,
    snapshot_ttl_seconds: Option<i64>,
    hide_guests: Option<bool>,
    weekly_enabled: Option<bool>,
}

impl From<RawRankingFlag> for RankingConfig {
    fn from(raw: RawRankingFlag) -> Self {
        let ttl_ms = raw
            .snapshot_ttl_ms
            .or(raw.snapshot_ttl_seconds.map(|s| s.saturating_mul(1000)))
            .unwrap_or(DEFAULT_TTL_MS)
            .clamp(MIN_TTL_MS, MAX_TTL_MS);
        RankingConfig {
            top_n: raw.top_n.unwrap_or(DEFAULT_TOP_N).clamp(1, 100),
            version: raw.version.unwrap_or(DEFAULT_VERSION),
            ttl_ms,
            hide_guests: raw.hide_guests.unwrap_or(false),
            weekly_enabled: raw.weekly_enabled.unwrap_or(true),
        }
    }
}

/// Read the `leaderboard` flag. `None` means the flag row is absent or
/// disabled; an unparseable payload falls back to defaults rather than
/// taking the endpoint down.
pub fn ranking_config(db: &Db) -> Result<Option<RankingConfig>, AppError> {
    let row: Option<(i64, Option<String>)> = db.with_conn(|conn| {
        conn.query_row(
            "SELECT enabled, payload FROM feature_flags WHERE key = ?1",
            params![RANKING_FLAG_KEY],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
    })?;

    let Some((enabled, payload)) = row else {
        return Ok(None);
    };
    if enabled == 0 {
        return Ok(None);
    }

    let raw = match payload.as_deref() {
        Some(text) => serde_json::from_str::<RawRankingFlag>(text).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "unparseable leaderboard flag payload; using defaults");
            RawRankingFlag::default()
        }),
        None => RawRankingFlag::default(),
    };
    Ok(Some(raw.into()))
}

/// Variant of [`ranking_config`] for endpoints that hard-fail when the
/// surface is disabled.
pub fn require_ranking_config(db: &Db) -> Result<RankingConfig, AppError> {
    ranking_config(db)?.ok_or_else(|| AppError::Disabled("Leaderboard is disabled".into()))
}
