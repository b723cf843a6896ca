/// Authenticated user as resolved from a verified session cookie joined to
/// its user row.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub brain_level: i64,
    pub xp: i64,
    pub brain_coins: i64,
}
