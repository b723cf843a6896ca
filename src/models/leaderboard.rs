use serde::{Deserialize, Serialize};

/// The three rankings this server materializes. Invalid flavor/scope combos
/// (coins has no weekly board) are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    CoinsAll,
    LevelAll,
    LevelWeek,
}

impl Ranking {
    /// Scope-qualified snapshot key, e.g. `coins:all`.
    pub fn kind(&self) -> &'static str {
        match self {
            Ranking::CoinsAll => "coins:all",
            Ranking::LevelAll => "level:all",
            Ranking::LevelWeek => "level:week",
        }
    }

    /// Pre-migration snapshot key without a scope suffix. Read as a fallback
    /// for all-time boards, never written.
    pub fn legacy_kind(&self) -> Option<&'static str> {
        match self {
            Ranking::CoinsAll => Some("coins"),
            Ranking::LevelAll => Some("level"),
            Ranking::LevelWeek => None,
        }
    }

    pub fn scope(&self) -> &'static str {
        match self {
            Ranking::CoinsAll | Ranking::LevelAll => "all",
            Ranking::LevelWeek => "week",
        }
    }

    pub fn is_weekly(&self) -> bool {
        matches!(self, Ranking::LevelWeek)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Medal {
    Gold,
    Silver,
    Bronze,
}

impl Medal {
    pub fn for_rank(rank: i64) -> Option<Medal> {
        match rank {
            1 => Some(Medal::Gold),
            2 => Some(Medal::Silver),
            3 => Some(Medal::Bronze),
            _ => None,
        }
    }
}

/// One ranked row. Metric fields are populated per ranking kind; `medal` is
/// derived at response-shaping time and never stored in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankEntry {
    pub rank: i64,
    pub user_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brain_level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brain_coins: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_xp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medal: Option<Medal>,
}

/// Slice of the ranking config embedded in every snapshot; a mismatch with
/// the live config marks the snapshot stale regardless of its age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotConfig {
    pub top_n: i64,
    pub version: i64,
}

/// The document stored in `ranking_snapshots.payload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    pub computed_at: i64,
    pub kind: String,
    pub scope: String,
    pub config: SnapshotConfig,
    pub entries: Vec<RankEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub kind: String,
    pub scope: String,
    pub computed_at: i64,
    pub config: SnapshotConfig,
    pub entries: Vec<RankEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyRankResponse {
    pub kind: String,
    pub scope: String,
    pub computed_at: i64,
    pub my_rank: Option<i64>,
    pub my_entry: Option<RankEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    pub scope: Option<String>,
}
