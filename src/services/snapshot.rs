use crate::models::leaderboard::{Ranking, SnapshotPayload};
use crate::services::flags::RankingConfig;
use rusqlite::{params, Connection, OptionalExtension};

/// A lock row older than this is considered abandoned by a crashed holder
/// and may be reaped by the next contender.
const LOCK_LEASE_MS: i64 = 30_000;

#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    pub computed_at_ms: i64,
    pub payload: SnapshotPayload,
}

/// Read the snapshot row for one exact kind. A row whose payload no longer
/// parses is reported as absent so the caller recomputes it.
pub fn read(conn: &Connection, kind: &str) -> rusqlite::Result<Option<StoredSnapshot>> {
    let row: Option<(i64, String)> = conn
        .query_row(
            "SELECT computed_at_ms, payload FROM ranking_snapshots WHERE kind = ?1",
            params![kind],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(row.and_then(|(computed_at_ms, text)| {
        match serde_json::from_str::<SnapshotPayload>(&text) {
            Ok(payload) => Some(StoredSnapshot {
                computed_at_ms,
                payload,
            }),
            Err(err) => {
                tracing::warn!(kind, error = %err, "discarding unparseable snapshot payload");
                None
            }
        }
    }))
}

/// Lookup chain for a ranking: the scope-qualified kind first, then the
/// legacy unscoped kind left behind by pre-migration writers. The legacy row
/// is only ever read; refreshes always write the qualified kind.
pub fn read_with_fallback(
    conn: &Connection,
    ranking: Ranking,
) -> rusqlite::Result<Option<StoredSnapshot>> {
    if let Some(snap) = read(conn, ranking.kind())? {
        return Ok(Some(snap));
    }
    match ranking.legacy_kind() {
        Some(legacy) => read(conn, legacy),
        None => Ok(None),
    }
}

/// Single-row replace keyed by kind.
pub fn upsert(
    conn: &Connection,
    kind: &str,
    computed_at_ms: i64,
    payload: &SnapshotPayload,
) -> rusqlite::Result<()> {
    let text = serde_json::to_string(payload)
        .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
    conn.execute(
        "INSERT OR REPLACE INTO ranking_snapshots (kind, computed_at_ms, payload) VALUES (?1, ?2, ?3)",
        params![kind, computed_at_ms, text],
    )?;
    Ok(())
}

/// Fresh iff the snapshot is younger than the TTL and was computed under the
/// currently effective topN/version. Any mismatch forces recomputation.
pub fn is_fresh(snap: &StoredSnapshot, cfg: &RankingConfig, now_ms: i64) -> bool {
    now_ms - snap.computed_at_ms < cfg.ttl_ms
        && snap.payload.config.version == cfg.version
        && snap.payload.config.top_n == cfg.top_n
}

/// Non-blocking advisory lock acquisition. SQLite has no native advisory
/// locks, so a dedicated table stands in: stale leases are reaped, then an
/// `INSERT OR IGNORE` either claims the row or loses to the current holder.
/// Contenders that lose skip the refresh instead of waiting.
pub fn try_acquire_lock(conn: &Connection, name: &str, now_ms: i64) -> rusqlite::Result<bool> {
    conn.execute(
        "DELETE FROM ranking_locks WHERE name = ?1 AND acquired_at_ms <= ?2",
        params![name, now_ms - LOCK_LEASE_MS],
    )?;
    let claimed = conn.execute(
        "INSERT OR IGNORE INTO ranking_locks (name, acquired_at_ms) VALUES (?1, ?2)",
        params![name, now_ms],
    )?;
    Ok(claimed == 1)
}

pub fn release_lock(conn: &Connection, name: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM ranking_locks WHERE name = ?1", params![name])?;
    Ok(())
}
