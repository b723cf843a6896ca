pub mod leaderboard;
pub mod play;
