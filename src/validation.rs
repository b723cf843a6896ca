use crate::error::AppError;
use crate::models::leaderboard::Ranking;

const VALID_GAME_IDS: &[&str] = &["nback", "memory_matrix", "speed_sort", "word_recall"];
const MAX_SCORE: i64 = 1_000_000;
const MAX_XP_GAIN: i64 = 10_000;
const MAX_COIN_GAIN: i64 = 10_000;

/// Resolve the coins board for a `scope` query parameter. Coins has no
/// weekly board, so anything but `all` is rejected.
pub fn parse_coins_scope(scope: Option<&str>) -> Result<Ranking, AppError> {
    match scope.unwrap_or("all") {
        "all" => Ok(Ranking::CoinsAll),
        other => Err(AppError::BadRequest(format!(
            "Unsupported scope for coins leaderboard: {}",
            other
        ))),
    }
}

pub fn parse_level_scope(scope: Option<&str>) -> Result<Ranking, AppError> {
    match scope.unwrap_or("all") {
        "all" => Ok(Ranking::LevelAll),
        "week" => Ok(Ranking::LevelWeek),
        other => Err(AppError::BadRequest(format!(
            "Unsupported scope for level leaderboard: {}",
            other
        ))),
    }
}

pub fn validate_game_id(game_id: &str) -> Result<(), AppError> {
    if VALID_GAME_IDS.contains(&game_id) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid game id: {}", game_id)))
    }
}

pub fn validate_score(score: i64) -> Result<(), AppError> {
    if score < 0 || score > MAX_SCORE {
        Err(AppError::BadRequest("Score out of range".into()))
    } else {
        Ok(())
    }
}

pub fn validate_rewards(xp_gained: i64, coins_earned: i64) -> Result<(), AppError> {
    if xp_gained < 0 || xp_gained > MAX_XP_GAIN {
        return Err(AppError::BadRequest("XP gain out of range".into()));
    }
    if coins_earned < 0 || coins_earned > MAX_COIN_GAIN {
        return Err(AppError::BadRequest("Coin gain out of range".into()));
    }
    Ok(())
}
