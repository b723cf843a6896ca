use crate::db::{now_ms, Db};
use crate::error::AppError;
use crate::models::leaderboard::{
    LeaderboardResponse, Medal, MyRankResponse, Ranking,
};
use crate::services::aggregate::{self, RefreshOutcome};
use crate::services::flags::RankingConfig;
use crate::services::rank::{self, LiveRank};
use crate::services::snapshot::{self, StoredSnapshot};

/// Serve the public top-N board: fresh snapshot if we have one, otherwise
/// refresh and re-read, otherwise degrade to whatever snapshot exists. Only
/// when there has never been a snapshot and the refresh lost the lock race
/// does the caller see a busy failure.
pub fn top_board(
    db: &Db,
    ranking: Ranking,
    cfg: &RankingConfig,
) -> Result<LeaderboardResponse, AppError> {
    let now = now_ms();
    let existing = db.with_conn(|conn| snapshot::read_with_fallback(conn, ranking))?;

    let fresh = existing
        .as_ref()
        .is_some_and(|snap| snapshot::is_fresh(snap, cfg, now));
    let snap = if fresh {
        existing
    } else {
        match aggregate::refresh_snapshot(db, ranking, cfg) {
            Ok(RefreshOutcome::Refreshed) => db
                .with_conn(|conn| snapshot::read_with_fallback(conn, ranking))?
                .or(existing),
            Ok(RefreshOutcome::Busy) => existing,
            Err(err) => {
                // A failed refresh must not take the endpoint down while an
                // older snapshot can still be served.
                tracing::warn!(kind = ranking.kind(), error = %err, "snapshot refresh failed");
                existing
            }
        }
    };

    let snap = snap.ok_or_else(|| {
        AppError::Busy("Leaderboard is being computed, try again shortly".into())
    })?;
    Ok(shape_board(ranking, snap))
}

fn shape_board(ranking: Ranking, snap: StoredSnapshot) -> LeaderboardResponse {
    let mut entries = snap.payload.entries;
    for entry in &mut entries {
        entry.medal = Medal::for_rank(entry.rank);
    }
    LeaderboardResponse {
        kind: ranking.kind().to_string(),
        scope: ranking.scope().to_string(),
        computed_at: snap.payload.computed_at,
        config: snap.payload.config,
        entries,
    }
}

/// The "my rank" view. Always computed live; a stale public snapshot never
/// shows through here.
pub fn my_board(db: &Db, ranking: Ranking, user_id: &str) -> Result<MyRankResponse, AppError> {
    match rank::live_rank(db, ranking, user_id)? {
        LiveRank::Vanished => Err(AppError::NotFound("User no longer exists".into())),
        LiveRank::Ranked { rank, mut entry } => {
            entry.medal = Medal::for_rank(rank);
            Ok(MyRankResponse {
                kind: ranking.kind().to_string(),
                scope: ranking.scope().to_string(),
                computed_at: now_ms(),
                my_rank: Some(rank),
                my_entry: Some(entry),
            })
        }
        LiveRank::NoEntry => Ok(MyRankResponse {
            kind: ranking.kind().to_string(),
            scope: ranking.scope().to_string(),
            computed_at: now_ms(),
            my_rank: None,
            my_entry: None,
        }),
    }
}

/// Cache-control for the public board. Guest-hiding makes the response
/// viewer-dependent, which rules out shared caches entirely.
pub fn cache_control(cfg: &RankingConfig) -> String {
    if cfg.hide_guests {
        "private, no-store".to_string()
    } else {
        let ttl_secs = (cfg.ttl_ms / 1000).max(1);
        format!(
            "public, max-age={}, stale-while-revalidate={}",
            (ttl_secs / 2).max(1),
            ttl_secs
        )
    }
}
