use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use sha2::{Digest, Sha256};
use sqlx::Row;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::user::User;
use crate::infra::db::Db;

/// An authenticated viewer, resolved from the session cookie.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AuthService {
    db: Db,
    session_key: [u8; 32],
    session_ttl_days: u64,
}

impl AuthService {
    pub fn new(db: Db, session_key: [u8; 32], session_ttl_days: u64) -> Self {
        Self {
            db,
            session_key,
            session_ttl_days,
        }
    }

    pub async fn signup(
        &self,
        username: String,
        email: String,
        first_name: String,
        last_name: String,
        password: String,
    ) -> Result<User> {
        let password_hash = hash_password(&password)?;
        let row = sqlx::query(
            "INSERT INTO users (username, email, first_name, last_name, password_hash) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, username, email, first_name, last_name, joined_at",
        )
        .bind(username)
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(password_hash)
        .fetch_one(self.db.pool())
        .await?;

        Ok(User {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            joined_at: row.get("joined_at"),
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Option<SessionToken>> {
        let row = sqlx::query("SELECT id, password_hash FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let user_id: Uuid = row.get("id");
        let password_hash: String = row.get("password_hash");
        if !verify_password(password, &password_hash)? {
            return Ok(None);
        }

        let token = self.issue_session(user_id).await?;
        Ok(Some(token))
    }

    pub async fn issue_session(&self, user_id: Uuid) -> Result<SessionToken> {
        let session_id = Uuid::new_v4();
        let (claims, expires_at) = self.build_claims(user_id, session_id)?;
        let key = SymmetricKey::<V4>::from(&self.session_key)?;
        let token = local::encrypt(&key, &claims, None, None)?;

        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, expires_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(hash_token(&token))
        .bind(expires_at)
        .execute(self.db.pool())
        .await?;

        Ok(SessionToken { token, expires_at })
    }

    /// Resolves a session cookie to its user. Any token that fails to
    /// decrypt, has been revoked, or has expired resolves to None.
    pub async fn authenticate_session(&self, token: &str) -> Result<Option<AuthSession>> {
        let claims = match self.decrypt_claims(token)? {
            Some(claims) => claims,
            None => return Ok(None),
        };
        if !has_token_type(&claims, "session") {
            return Ok(None);
        }
        let user_id = claim_uuid(&claims, "sub")?;
        let session_id = claim_uuid(&claims, "jti")?;

        let row = sqlx::query(
            "SELECT u.username \
             FROM sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.id = $1 \
               AND s.user_id = $2 \
               AND s.token_hash = $3 \
               AND s.expires_at > now()",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(hash_token(token))
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| AuthSession {
            user_id,
            username: row.get("username"),
        }))
    }

    pub async fn logout(&self, token: &str) -> Result<bool> {
        let claims = match self.decrypt_claims(token)? {
            Some(claims) => claims,
            None => return Ok(false),
        };
        let session_id = match claim_uuid(&claims, "jti") {
            Ok(session_id) => session_id,
            Err(_) => return Ok(false),
        };

        let result = sqlx::query("DELETE FROM sessions WHERE id = $1 AND token_hash = $2")
            .bind(session_id)
            .bind(hash_token(token))
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    fn build_claims(&self, user_id: Uuid, session_id: Uuid) -> Result<(Claims, OffsetDateTime)> {
        let duration = std::time::Duration::from_secs(self.session_ttl_days * 24 * 60 * 60);
        let mut claims = Claims::new_expires_in(&duration)?;
        claims.issuer("lenta")?;
        claims.audience("lenta")?;
        claims.subject(&user_id.to_string())?;
        claims.token_identifier(&session_id.to_string())?;
        claims.add_additional("typ", "session")?;
        let expires_at = OffsetDateTime::now_utc() + Duration::days(self.session_ttl_days as i64);
        Ok((claims, expires_at))
    }

    fn decrypt_claims(&self, token: &str) -> Result<Option<Claims>> {
        let key = SymmetricKey::<V4>::from(&self.session_key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with("lenta");
        rules.validate_audience_with("lenta");

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        Ok(trusted.payload_claims().cloned())
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| anyhow!("failed to parse password hash: {}", err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn claim_uuid(claims: &Claims, name: &str) -> Result<Uuid> {
    let value = claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("missing {} claim", name))?;
    Ok(Uuid::parse_str(value)?)
}

fn has_token_type(claims: &Claims, expected: &str) -> bool {
    claims
        .get_claim("typ")
        .and_then(|value| value.as_str())
        .map(|value| value == expected)
        .unwrap_or(false)
}
