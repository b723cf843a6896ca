use crate::db::Db;
use crate::error::AppError;
use crate::models::leaderboard::{RankEntry, Ranking};
use chrono::{Datelike, Days, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// Outcome of a live rank lookup for one subject.
#[derive(Debug)]
pub enum LiveRank {
    /// The user row disappeared between session verification and the lookup.
    Vanished,
    Ranked { rank: i64, entry: RankEntry },
    /// Weekly scope only: the subject has no activity inside the current week.
    NoEntry,
}

/// Current ISO week as `[monday, next_monday)` in `YYYY-MM-DD`, derived from
/// the UTC date so the window does not drift with server timezone.
pub fn current_week_bounds() -> (String, String) {
    let today = Utc::now().date_naive();
    let monday = today - Days::new(today.weekday().num_days_from_monday() as u64);
    let next_monday = monday + Days::new(7);
    (
        monday.format("%Y-%m-%d").to_string(),
        next_monday.format("%Y-%m-%d").to_string(),
    )
}

struct UserRow {
    id: String,
    display_name: String,
    avatar_url: Option<String>,
    brain_level: i64,
    xp: i64,
    brain_coins: i64,
}

fn load_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<UserRow>> {
    conn.query_row(
        "SELECT id, display_name, avatar_url, brain_level, xp, brain_coins
         FROM users WHERE id = ?1",
        params![user_id],
        |row| {
            Ok(UserRow {
                id: row.get(0)?,
                display_name: row.get(1)?,
                avatar_url: row.get(2)?,
                brain_level: row.get(3)?,
                xp: row.get(4)?,
                brain_coins: row.get(5)?,
            })
        },
    )
    .optional()
}

/// Compute the subject's standing against the full live population. Strictly
/// read-only; the snapshot cache is neither consulted nor touched, so a "my
/// rank" view stays real-time even when the public board is stale.
pub fn live_rank(db: &Db, ranking: Ranking, user_id: &str) -> Result<LiveRank, AppError> {
    Ok(db.with_conn(|conn| {
        let Some(user) = load_user(conn, user_id)? else {
            return Ok(LiveRank::Vanished);
        };
        match ranking {
            Ranking::CoinsAll => coins_all_rank(conn, &user),
            Ranking::LevelAll => level_all_rank(conn, &user),
            Ranking::LevelWeek => level_week_rank(conn, &user),
        }
    })?)
}

/// Strict ordinal rank over `(total_score, xp, user_id)`: one plus the count
/// of users whose tuple is chained-strictly greater. The id tiebreak makes
/// every rank unique.
fn coins_all_rank(conn: &Connection, user: &UserRow) -> rusqlite::Result<LiveRank> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(score), 0) FROM game_sessions WHERE user_id = ?1",
        params![user.id],
        |row| row.get(0),
    )?;
    let rank: i64 = conn.query_row(
        "SELECT 1 + COUNT(*) FROM (
             SELECT u.id AS id, COALESCE(SUM(g.score), 0) AS total, u.xp AS xp
             FROM users u
             LEFT JOIN game_sessions g ON g.user_id = u.id
             GROUP BY u.id
         ) t
         WHERE t.total > ?1
            OR (t.total = ?1 AND t.xp > ?2)
            OR (t.total = ?1 AND t.xp = ?2 AND t.id > ?3)",
        params![total, user.xp, user.id],
        |row| row.get(0),
    )?;
    Ok(LiveRank::Ranked {
        rank,
        entry: RankEntry {
            rank,
            user_id: user.id.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
            total_score: Some(total),
            brain_level: None,
            xp: Some(user.xp),
            brain_coins: Some(user.brain_coins),
            weekly_xp: None,
            medal: None,
        },
    })
}

/// Same shape as [`coins_all_rank`] over `(brain_level, xp, brain_coins, id)`.
fn level_all_rank(conn: &Connection, user: &UserRow) -> rusqlite::Result<LiveRank> {
    let rank: i64 = conn.query_row(
        "SELECT 1 + COUNT(*) FROM users t
         WHERE t.brain_level > ?1
            OR (t.brain_level = ?1 AND t.xp > ?2)
            OR (t.brain_level = ?1 AND t.xp = ?2 AND t.brain_coins > ?3)
            OR (t.brain_level = ?1 AND t.xp = ?2 AND t.brain_coins = ?3 AND t.id > ?4)",
        params![user.brain_level, user.xp, user.brain_coins, user.id],
        |row| row.get(0),
    )?;
    Ok(LiveRank::Ranked {
        rank,
        entry: RankEntry {
            rank,
            user_id: user.id.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
            total_score: None,
            brain_level: Some(user.brain_level),
            xp: Some(user.xp),
            brain_coins: Some(user.brain_coins),
            weekly_xp: None,
            medal: None,
        },
    })
}

/// Dense rank over this week's activity: equal tuples share a rank and the
/// next distinct tuple gets rank + 1. A subject with no activity row this
/// week has no rank at all.
fn level_week_rank(conn: &Connection, user: &UserRow) -> rusqlite::Result<LiveRank> {
    let (week_start, week_end) = current_week_bounds();
    let row: Option<(i64, i64)> = conn
        .query_row(
            "SELECT w.rnk, w.weekly_xp FROM (
                 SELECT d.user_id AS user_id,
                        SUM(d.xp_gained) AS weekly_xp,
                        DENSE_RANK() OVER (
                            ORDER BY SUM(d.xp_gained) DESC, u.brain_level DESC, u.xp DESC,
                                     u.brain_coins DESC, u.updated_at_ms DESC
                        ) AS rnk
                 FROM daily_activity d
                 JOIN users u ON u.id = d.user_id
                 WHERE d.day >= ?1 AND d.day < ?2
                 GROUP BY d.user_id
             ) w
             WHERE w.user_id = ?3",
            params![week_start, week_end, user.id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    Ok(match row {
        Some((rank, weekly_xp)) => LiveRank::Ranked {
            rank,
            entry: RankEntry {
                rank,
                user_id: user.id.clone(),
                display_name: user.display_name.clone(),
                avatar_url: user.avatar_url.clone(),
                total_score: None,
                brain_level: Some(user.brain_level),
                xp: Some(user.xp),
                brain_coins: None,
                weekly_xp: Some(weekly_xp),
                medal: None,
            },
        },
        None => LiveRank::NoEntry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_user(db: &Db, id: &str, level: i64, xp: i64, coins: i64, updated_at_ms: i64) {
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, display_name, brain_level, xp, brain_coins, updated_at_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, id, level, xp, coins, updated_at_ms],
            )
        })
        .unwrap();
    }

    fn seed_score(db: &Db, user_id: &str, score: i64) {
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO game_sessions (id, user_id, game_id, score) VALUES (?1, ?2, 'nback', ?3)",
                params![uuid::Uuid::new_v4().to_string(), user_id, score],
            )
        })
        .unwrap();
    }

    fn seed_activity(db: &Db, user_id: &str, day: &str, xp: i64) {
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO daily_activity (user_id, day, xp_gained) VALUES (?1, ?2, ?3)",
                params![user_id, day, xp],
            )
        })
        .unwrap();
    }

    fn rank_of(db: &Db, ranking: Ranking, user_id: &str) -> i64 {
        match live_rank(db, ranking, user_id).unwrap() {
            LiveRank::Ranked { rank, .. } => rank,
            other => panic!("expected a rank for {}, got {:?}", user_id, other),
        }
    }

    #[test]
    fn coins_ranks_are_unique_under_ties() {
        let db = Db::open_in_memory().unwrap();
        for id in ["user-a", "user-b", "user-c", "user-d"] {
            seed_user(&db, id, 1, 0, 0, 0);
        }
        seed_score(&db, "user-a", 100);
        seed_score(&db, "user-b", 100); // same total and xp as user-a
        seed_score(&db, "user-c", 50);
        // user-d has no sessions at all

        let ranks: Vec<i64> = ["user-a", "user-b", "user-c", "user-d"]
            .iter()
            .map(|id| rank_of(&db, Ranking::CoinsAll, id))
            .collect();
        // greater id wins the tie, so user-b outranks user-a
        assert_eq!(ranks, vec![2, 1, 3, 4]);
        let mut sorted = ranks.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 4, "no two users may share a rank");
    }

    #[test]
    fn level_tie_chain_runs_through_coins_then_id() {
        let db = Db::open_in_memory().unwrap();
        seed_user(&db, "user-a", 5, 300, 10, 0);
        seed_user(&db, "user-b", 5, 300, 20, 0); // more coins, same level/xp
        seed_user(&db, "user-c", 5, 300, 10, 0); // full tie with user-a, higher id

        assert_eq!(rank_of(&db, Ranking::LevelAll, "user-b"), 1);
        assert_eq!(rank_of(&db, Ranking::LevelAll, "user-c"), 2);
        assert_eq!(rank_of(&db, Ranking::LevelAll, "user-a"), 3);
    }

    #[test]
    fn weekly_ties_share_a_dense_rank() {
        let db = Db::open_in_memory().unwrap();
        seed_user(&db, "user-a", 2, 100, 5, 42);
        seed_user(&db, "user-b", 2, 100, 5, 42); // tuple-identical to user-a
        seed_user(&db, "user-c", 2, 100, 5, 42);
        let (monday, _) = current_week_bounds();
        seed_activity(&db, "user-a", &monday, 80);
        seed_activity(&db, "user-b", &monday, 80);
        seed_activity(&db, "user-c", &monday, 30);

        assert_eq!(rank_of(&db, Ranking::LevelWeek, "user-a"), 1);
        assert_eq!(rank_of(&db, Ranking::LevelWeek, "user-b"), 1);
        // dense: next distinct tuple is rank 2, not 3
        assert_eq!(rank_of(&db, Ranking::LevelWeek, "user-c"), 2);
    }

    #[test]
    fn weekly_without_activity_yields_no_entry() {
        let db = Db::open_in_memory().unwrap();
        seed_user(&db, "user-a", 2, 100, 5, 0);
        assert!(matches!(
            live_rank(&db, Ranking::LevelWeek, "user-a").unwrap(),
            LiveRank::NoEntry
        ));
    }

    #[test]
    fn activity_outside_the_week_window_does_not_count() {
        let db = Db::open_in_memory().unwrap();
        seed_user(&db, "user-a", 2, 100, 5, 0);
        seed_activity(&db, "user-a", "2000-01-03", 500);
        assert!(matches!(
            live_rank(&db, Ranking::LevelWeek, "user-a").unwrap(),
            LiveRank::NoEntry
        ));
    }

    #[test]
    fn vanished_user_is_reported() {
        let db = Db::open_in_memory().unwrap();
        assert!(matches!(
            live_rank(&db, Ranking::CoinsAll, "deleted-user").unwrap(),
            LiveRank::Vanished
        ));
    }
}
