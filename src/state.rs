use crate::db::Db;

/// Shared per-process state handed to every handler.
pub struct AppState {
    pub db: Db,
    /// Secret used to verify signed session cookies. `None` means sessions
    /// can never verify and every protected endpoint answers 401.
    pub session_secret: Option<String>,
}

impl AppState {
    pub fn new(db: Db, session_secret: Option<String>) -> Self {
        let session_secret = session_secret.filter(|s| !s.is_empty());
        AppState { db, session_secret }
    }
}
