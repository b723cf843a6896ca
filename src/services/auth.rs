use crate::db::{now_ms, Db};
use crate::error::AppError;
use crate::models::auth::UserIdentity;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rusqlite::{params, OptionalExtension};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "brainwave_session";
pub const SECURE_SESSION_COOKIE: &str = "__Secure-brainwave_session";

/// base64 of a 32-byte HMAC-SHA256 digest, always padded with one `=`.
const SIGNATURE_LEN: usize = 44;

/// Verify the signed session cookie and resolve the authenticated user.
///
/// Every failure mode (unconfigured secret, missing cookie, malformed or
/// mismatched signature, expired or unknown session) collapses to 401; none
/// of them may surface as a 500.
pub fn verify_session(
    db: &Db,
    secret: Option<&str>,
    cookie_header: Option<&str>,
) -> Result<UserIdentity, AppError> {
    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Sessions are not configured".into()))?;
    let header = cookie_header.ok_or_else(unauthorized)?;
    let raw = find_cookie(header, &[SECURE_SESSION_COOKIE, SESSION_COOKIE]).ok_or_else(unauthorized)?;
    let token = verify_signature(secret, raw).ok_or_else(unauthorized)?;

    let identity = db.with_conn(|conn| {
        conn.query_row(
            "SELECT u.id, u.display_name, u.avatar_url, u.brain_level, u.xp, u.brain_coins
             FROM auth_sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token = ?1 AND s.expires_at_ms > ?2",
            params![token, now_ms()],
            |row| {
                Ok(UserIdentity {
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
    })?;

    identity.ok_or_else(unauthorized)
}

fn unauthorized() -> AppError {
    AppError::Unauthorized("Invalid session".into())
}

/// Pull a cookie value out of a `Cookie` header by name, first match wins.
fn find_cookie<'a>(header: &'a str, names: &[&str]) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(name, _)| names.iter().any(|wanted| name.eq_ignore_ascii_case(wanted)))
        .map(|(_, value)| value)
}

/// Check `<token>.<signature>` against HMAC-SHA256(secret, token) and return
/// the token on success. The split is at the *last* dot so tokens may
/// themselves contain dots.
fn verify_signature<'a>(secret: &str, cookie_value: &'a str) -> Option<&'a str> {
    let dot = cookie_value.rfind('.')?;
    if dot < 1 {
        return None;
    }
    let (token, signature) = (&cookie_value[..dot], &cookie_value[dot + 1..]);
    if signature.len() != SIGNATURE_LEN || !signature.ends_with('=') {
        return None;
    }
    let sig_bytes = STANDARD.decode(signature).ok()?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(token.as_bytes());
    mac.verify_slice(&sig_bytes).ok()?;
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn sign(secret: &str, token: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(token.as_bytes());
        let sig = STANDARD.encode(mac.finalize().into_bytes());
        format!("{}.{}", token, sig)
    }

    fn seed_session(db: &Db, token: &str, user_id: &str, expires_at_ms: i64) {
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, display_name, brain_level, xp, brain_coins) VALUES (?1, ?2, 3, 250, 40)",
                params![user_id, "Tester"],
            )?;
            conn.execute(
                "INSERT INTO auth_sessions (token, user_id, expires_at_ms) VALUES (?1, ?2, ?3)",
                params![token, user_id, expires_at_ms],
            )
        })
        .unwrap();
    }

    #[test]
    fn accepts_valid_cookie() {
        let db = Db::open_in_memory().unwrap();
        seed_session(&db, "tok-1", "user-1", now_ms() + 60_000);
        let header = format!("{}={}", SESSION_COOKIE, sign(SECRET, "tok-1"));
        let identity = verify_session(&db, Some(SECRET), Some(&header)).unwrap();
        assert_eq!(identity.id, "user-1");
        assert_eq!(identity.xp, 250);
    }

    #[test]
    fn accepts_secure_prefixed_cookie_name() {
        let db = Db::open_in_memory().unwrap();
        seed_session(&db, "tok-2", "user-2", now_ms() + 60_000);
        let header = format!(
            "other=1; {}={}",
            SECURE_SESSION_COOKIE,
            sign(SECRET, "tok-2")
        );
        assert!(verify_session(&db, Some(SECRET), Some(&header)).is_ok());
    }

    #[test]
    fn rejects_wrong_secret() {
        let db = Db::open_in_memory().unwrap();
        seed_session(&db, "tok-3", "user-3", now_ms() + 60_000);
        let header = format!("{}={}", SESSION_COOKIE, sign("other-secret", "tok-3"));
        assert!(matches!(
            verify_session(&db, Some(SECRET), Some(&header)),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn rejects_expired_session() {
        let db = Db::open_in_memory().unwrap();
        seed_session(&db, "tok-4", "user-4", now_ms() - 1);
        let header = format!("{}={}", SESSION_COOKIE, sign(SECRET, "tok-4"));
        assert!(verify_session(&db, Some(SECRET), Some(&header)).is_err());
    }

    #[test]
    fn rejects_malformed_cookie_values() {
        let db = Db::open_in_memory().unwrap();
        seed_session(&db, "tok-5", "user-5", now_ms() + 60_000);
        for bad in [
            "tok-5".to_string(),                        // no signature at all
            format!(".{}", "A".repeat(43) + "="),       // empty token before the dot
            format!("tok-5.{}", "A".repeat(10)),        // signature too short
            format!("tok-5.{}", "A".repeat(44)),        // missing padding char
            format!("tok-5.{}=", "!".repeat(43)),       // not base64
        ] {
            let header = format!("{}={}", SESSION_COOKIE, bad);
            assert!(
                verify_session(&db, Some(SECRET), Some(&header)).is_err(),
                "accepted malformed cookie {:?}",
                bad
            );
        }
    }

    #[test]
    fn rejects_when_secret_unconfigured() {
        let db = Db::open_in_memory().unwrap();
        seed_session(&db, "tok-6", "user-6", now_ms() + 60_000);
        let header = format!("{}={}", SESSION_COOKIE, sign(SECRET, "tok-6"));
        assert!(verify_session(&db, None, Some(&header)).is_err());
        assert!(verify_session(&db, Some(""), Some(&header)).is_err());
    }

    #[test]
    fn rejects_missing_cookie() {
        let db = Db::open_in_memory().unwrap();
        assert!(verify_session(&db, Some(SECRET), None).is_err());
        assert!(verify_session(&db, Some(SECRET), Some("other=1")).is_err());
    }

    #[test]
    fn token_may_contain_dots() {
        let db = Db::open_in_memory().unwrap();
        seed_session(&db, "a.b.c", "user-7", now_ms() + 60_000);
        let header = format!("{}={}", SESSION_COOKIE, sign(SECRET, "a.b.c"));
        let identity = verify_session(&db, Some(SECRET), Some(&header)).unwrap();
        assert_eq!(identity.id, "user-7");
    }
}
