use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSubmission {
    pub game_id: String,
    pub score: i64,
    #[serde(default)]
    pub xp_gained: i64,
    #[serde(default)]
    pub coins_earned: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub id: String,
    pub xp: i64,
    pub brain_coins: i64,
    pub brain_level: i64,
    pub leveled_up: bool,
}
