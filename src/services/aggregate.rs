use crate::db::{now_ms, Db};
use crate::error::AppError;
use crate::models::leaderboard::{RankEntry, Ranking, SnapshotConfig, SnapshotPayload};
use crate::services::flags::RankingConfig;
use crate::services::rank::current_week_bounds;
use crate::services::snapshot;
use rusqlite::{params, Connection};

#[derive(Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    /// Another caller holds the refresh lock; nothing was written.
    Busy,
}

/// Recompute the top-N snapshot for one ranking and persist it, with
/// at-most-one-writer semantics. Losing the lock race is not an error: the
/// contender skips the refresh and the caller serves whatever snapshot
/// already exists.
pub fn refresh_snapshot(
    db: &Db,
    ranking: Ranking,
    cfg: &RankingConfig,
) -> Result<RefreshOutcome, AppError> {
    let now = now_ms();
    let lock_name = format!("leaderboard:{}", ranking.kind());
    let outcome = db.with_conn(|conn| {
        if !snapshot::try_acquire_lock(conn, &lock_name, now)? {
            return Ok(RefreshOutcome::Busy);
        }
        let result = compute_and_store(conn, ranking, cfg, now);
        snapshot::release_lock(conn, &lock_name)?;
        result.map(|entries| {
            tracing::info!(kind = ranking.kind(), entries, "refreshed ranking snapshot");
            RefreshOutcome::Refreshed
        })
    })?;
    Ok(outcome)
}

fn compute_and_store(
    conn: &Connection,
    ranking: Ranking,
    cfg: &RankingConfig,
    now: i64,
) -> rusqlite::Result<usize> {
    let entries = match ranking {
        Ranking::CoinsAll => coins_all_entries(conn, cfg.top_n)?,
        Ranking::LevelAll => level_all_entries(conn, cfg.top_n)?,
        Ranking::LevelWeek => level_week_entries(conn, cfg.top_n)?,
    };
    let count = entries.len();
    let payload = SnapshotPayload {
        computed_at: now,
        kind: ranking.kind().to_string(),
        scope: ranking.scope().to_string(),
        config: SnapshotConfig {
            top_n: cfg.top_n,
            version: cfg.version,
        },
        entries,
    };
    snapshot::upsert(conn, ranking.kind(), now, &payload)?;
    Ok(count)
}

/// Positional rank: row index + 1. The ORDER BY repeats the rank-lookup tie
/// chain for the same kind, so positional ranks agree with live ordinal
/// ranks even on ties.
fn assign_ranks(mut entries: Vec<RankEntry>) -> Vec<RankEntry> {
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.rank = index as i64 + 1;
    }
    entries
}

/// Summed session scores per user. The LEFT JOIN keeps zero-session users on
/// the board with a total of 0.
fn coins_all_entries(conn: &Connection, top_n: i64) -> rusqlite::Result<Vec<RankEntry>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.display_name, u.avatar_url, COALESCE(SUM(g.score), 0) AS total,
                u.xp, u.brain_coins
         FROM users u
         LEFT JOIN game_sessions g ON g.user_id = u.id
         GROUP BY u.id
         ORDER BY total DESC, u.xp DESC, u.id DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![top_n], |row| {
        Ok(RankEntry {
            rank: 0,
            user_id: row.get(0)?,
            display_name: row.get(1)?,
            avatar_url: row.get(2)?,
            total_score: Some(row.get(3)?),
            brain_level: None,
            xp: Some(row.get(4)?),
            brain_coins: Some(row.get(5)?),
            weekly_xp: None,
            medal: None,
        })
    })?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(assign_ranks(entries))
}

fn level_all_entries(conn: &Connection, top_n: i64) -> rusqlite::Result<Vec<RankEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, display_name, avatar_url, brain_level, xp, brain_coins
         FROM users
         ORDER BY brain_level DESC, xp DESC, brain_coins DESC, id DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![top_n], |row| {
        Ok(RankEntry {
            rank: 0,
            user_id: row.get(0)?,
            display_name: row.get(1)?,
            avatar_url: row.get(2)?,
            total_score: None,
            brain_level: Some(row.get(3)?),
            xp: Some(row.get(4)?),
            brain_coins: Some(row.get(5)?),
            weekly_xp: None,
            medal: None,
        })
    })?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(assign_ranks(entries))
}

fn level_week_entries(conn: &Connection, top_n: i64) -> rusqlite::Result<Vec<RankEntry>> {
    let (week_start, week_end) = current_week_bounds();
    let mut stmt = conn.prepare(
        "SELECT u.id, u.display_name, u.avatar_url, SUM(d.xp_gained) AS weekly_xp,
                u.brain_level, u.xp
         FROM daily_activity d
         JOIN users u ON u.id = d.user_id
         WHERE d.day >= ?1 AND d.day < ?2
         GROUP BY u.id
         ORDER BY weekly_xp DESC, u.brain_level DESC, u.xp DESC, u.brain_coins DESC,
                  u.updated_at_ms DESC, u.id DESC
         LIMIT ?3",
    )?;
    let rows = stmt.query_map(params![week_start, week_end, top_n], |row| {
        Ok(RankEntry {
            rank: 0,
            user_id: row.get(0)?,
            display_name: row.get(1)?,
            avatar_url: row.get(2)?,
            total_score: None,
            brain_level: Some(row.get(4)?),
            xp: Some(row.get(5)?),
            brain_coins: None,
            weekly_xp: Some(row.get(3)?),
            medal: None,
        })
    })?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(assign_ranks(entries))
}
