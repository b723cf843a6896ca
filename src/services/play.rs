use crate::db::{now_ms, Db};
use crate::error::AppError;
use crate::models::auth::UserIdentity;
use crate::models::play::{SessionResult, SessionSubmission};
use crate::validation;
use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

/// Level curve: level 1 at 0 xp, +1 level per 100·n² xp. Monotone, so a
/// session can only ever level a user up.
pub fn level_for_xp(xp: i64) -> i64 {
    1 + ((xp.max(0) / 100) as f64).sqrt() as i64
}

/// Record a finished game session for the authenticated user: the session
/// row itself, the user's xp/coins/level, and the daily activity bucket the
/// weekly ranking aggregates over.
pub fn record_session(
    db: &Db,
    user: &UserIdentity,
    req: SessionSubmission,
) -> Result<SessionResult, AppError> {
    validation::validate_game_id(&req.game_id)?;
    validation::validate_score(req.score)?;
    validation::validate_rewards(req.xp_gained, req.coins_earned)?;

    let id = Uuid::new_v4().to_string();
    let day = Utc::now().format("%Y-%m-%d").to_string();
    let new_xp = user.xp + req.xp_gained;
    let new_coins = user.brain_coins + req.coins_earned;
    let new_level = level_for_xp(new_xp);

    Ok(db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO game_sessions (id, user_id, game_id, score, xp_gained, coins_earned)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, user.id, req.game_id, req.score, req.xp_gained, req.coins_earned],
        )?;
        conn.execute(
            "UPDATE users SET xp = ?2, brain_coins = ?3, brain_level = ?4, updated_at_ms = ?5
             WHERE id = ?1",
            params![user.id, new_xp, new_coins, new_level, now_ms()],
        )?;
        conn.execute(
            "INSERT INTO daily_activity (user_id, day, xp_gained) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, day) DO UPDATE SET xp_gained = xp_gained + excluded.xp_gained",
            params![user.id, day, req.xp_gained],
        )?;
        Ok(SessionResult {
            id,
            xp: new_xp,
            brain_coins: new_coins,
            brain_level: new_level,
            leveled_up: new_level > user.brain_level,
        })
    })?)
}
