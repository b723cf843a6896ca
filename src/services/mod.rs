pub mod aggregate;
pub mod auth;
pub mod flags;
pub mod leaderboard;
pub mod play;
pub mod rank;
pub mod snapshot;
