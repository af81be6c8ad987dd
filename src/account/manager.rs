/// Account manager implementation using runtime queries
///
/// Uses sqlx runtime query building instead of compile-time macros to avoid
/// needing DATABASE_URL during compilation.

use crate::{
    account::ValidatedSession,
    config::ServerConfig,
    db::account::{Account, Session},
    error::{AppError, AppResult},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Create a new account
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> AppResult<Account> {
        let email = email.trim().to_lowercase();

        if self.email_exists(&email).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(password)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO account (id, email, display_name, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&id)
        .bind(&email)
        .bind(display_name)
        .bind(&password_hash)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        Ok(Account {
            id,
            email,
            display_name: display_name.to_string(),
            password_hash,
            created_at: now,
        })
    }

    /// Authenticate account and create session
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(Account, Session)> {
        let account = match self.get_account_by_email(email).await {
            Ok(account) => account,
            // Indistinguishable from a wrong password to the caller
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Authentication("Invalid credentials".to_string()))
            }
            Err(e) => return Err(e),
        };

        if !verify_password(password, &account.password_hash)? {
            return Err(AppError::Authentication("Invalid credentials".to_string()));
        }

        let session = self.create_session(&account.id).await?;

        Ok((account, session))
    }

    /// Create a session for a user
    pub async fn create_session(&self, user_id: &str) -> AppResult<Session> {
        let session_id = Uuid::new_v4().to_string();

        // Generate JWT tokens
        let access_token = self.generate_access_token(user_id, &session_id)?;
        let refresh_token_str = self.generate_refresh_token(user_id, &session_id)?;

        let now = Utc::now();
        let expires_at = now + Duration::hours(1); // Access token expires in 1 hour

        sqlx::query(
            "INSERT INTO session (id, user_id, access_token, refresh_token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&session_id)
        .bind(user_id)
        .bind(&access_token)
        .bind(&refresh_token_str)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        // Store refresh token
        let refresh_token_id = Uuid::new_v4().to_string();
        let refresh_expires = now + Duration::days(180);

        sqlx::query(
            "INSERT INTO refresh_token (id, user_id, token, created_at, expires_at, used)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&refresh_token_id)
        .bind(user_id)
        .bind(&refresh_token_str)
        .bind(now)
        .bind(refresh_expires)
        .bind(false)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        Ok(Session {
            id: session_id,
            user_id: user_id.to_string(),
            access_token,
            refresh_token: refresh_token_str,
            created_at: now,
            expires_at,
        })
    }

    /// Validate access token and return session info
    pub async fn validate_access_token(&self, token: &str) -> AppResult<ValidatedSession> {
        let row = sqlx::query("SELECT id, user_id, expires_at FROM session WHERE access_token = ?1")
            .bind(token)
            .fetch_optional(&self.db)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::Authentication("Invalid or expired session".to_string()))?;

        let session_id: String = row.get("id");
        let user_id: String = row.get("user_id");
        let expires_at: DateTime<Utc> = row.get("expires_at");

        if Utc::now() > expires_at {
            return Err(AppError::Authentication("Session expired".to_string()));
        }

        Ok(ValidatedSession {
            user_id,
            session_id,
        })
    }

    /// Delete a session (sign-out)
    pub async fn delete_session(&self, session_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM session WHERE id = ?1")
            .bind(session_id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        Ok(())
    }

    /// Refresh session tokens
    pub async fn refresh_session(&self, refresh_token: &str) -> AppResult<Session> {
        let row = sqlx::query(
            "SELECT id, user_id, expires_at, used FROM refresh_token WHERE token = ?1",
        )
        .bind(refresh_token)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::Authentication("Invalid refresh token".to_string()))?;

        let token_id: String = row.get("id");
        let user_id: String = row.get("user_id");
        let expires_at: DateTime<Utc> = row.get("expires_at");
        let used: bool = row.get("used");

        if used {
            return Err(AppError::Authentication(
                "Refresh token already used".to_string(),
            ));
        }

        if Utc::now() > expires_at {
            return Err(AppError::Authentication("Refresh token expired".to_string()));
        }

        // Mark old refresh token as used
        sqlx::query("UPDATE refresh_token SET used = TRUE, used_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(&token_id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        self.create_session(&user_id).await
    }

    /// Get account by id
    pub async fn get_account(&self, user_id: &str) -> AppResult<Account> {
        sqlx::query_as::<_, Account>(
            "SELECT id, email, display_name, password_hash, created_at
             FROM account WHERE id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }

    /// Get account by email
    pub async fn get_account_by_email(&self, email: &str) -> AppResult<Account> {
        sqlx::query_as::<_, Account>(
            "SELECT id, email, display_name, password_hash, created_at
             FROM account WHERE email = ?1",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }

    /// Check if email exists
    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await
            .map_err(AppError::Database)?;

        Ok(count > 0)
    }

    /// Generate password reset token
    ///
    /// Creates a reset token that expires in 1 hour. Returns the token and the
    /// account it belongs to so the caller can email the reset link.
    pub async fn generate_password_reset_token(&self, email: &str) -> AppResult<(String, Account)> {
        let account = self.get_account_by_email(email).await?;

        let token = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now + Duration::hours(1);

        sqlx::query(
            "INSERT INTO email_token (token, user_id, purpose, created_at, expires_at, used)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&token)
        .bind(&account.id)
        .bind("reset_password")
        .bind(now)
        .bind(expires_at)
        .bind(false)
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        Ok((token, account))
    }

    /// Reset password using reset token
    ///
    /// Validates the token, updates the password, and invalidates all sessions.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<()> {
        let now = Utc::now();

        let row = sqlx::query(
            "SELECT token, user_id, expires_at, used
             FROM email_token
             WHERE token = ?1 AND purpose = 'reset_password'",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Invalid reset token".to_string()))?;

        let user_id: String = row.try_get("user_id")?;
        let expires_at: DateTime<Utc> = row.try_get("expires_at")?;
        let used: bool = row.try_get("used")?;

        if used {
            return Err(AppError::Validation(
                "Reset token has already been used".to_string(),
            ));
        }

        if now > expires_at {
            return Err(AppError::Validation("Reset token has expired".to_string()));
        }

        // Mark token as used
        sqlx::query("UPDATE email_token SET used = TRUE WHERE token = ?1")
            .bind(token)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        let password_hash = hash_password(new_password)?;

        sqlx::query("UPDATE account SET password_hash = ?1 WHERE id = ?2")
            .bind(&password_hash)
            .bind(&user_id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        // Invalidate every live session for the account
        sqlx::query("DELETE FROM session WHERE user_id = ?1")
            .bind(&user_id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        sqlx::query("DELETE FROM refresh_token WHERE user_id = ?1")
            .bind(&user_id)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        tracing::info!("Password reset for user: {}", user_id);

        Ok(())
    }

    /// Cleanup expired sessions and refresh tokens
    ///
    /// Called periodically by the job scheduler.
    /// Returns (sessions_deleted, refresh_tokens_deleted)
    pub async fn cleanup_expired_sessions(&self) -> AppResult<(u64, u64)> {
        let now = Utc::now();

        let sessions_result = sqlx::query("DELETE FROM session WHERE expires_at < ?1")
            .bind(now)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        let sessions_deleted = sessions_result.rows_affected();

        let refresh_result = sqlx::query("DELETE FROM refresh_token WHERE expires_at < ?1")
            .bind(now)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        let refresh_tokens_deleted = refresh_result.rows_affected();

        if sessions_deleted > 0 || refresh_tokens_deleted > 0 {
            tracing::info!(
                sessions_deleted,
                refresh_tokens_deleted,
                "Cleaned up expired tokens"
            );
        } else {
            tracing::debug!("Session cleanup: no expired tokens found");
        }

        Ok((sessions_deleted, refresh_tokens_deleted))
    }

    /// Generate access JWT token
    fn generate_access_token(&self, user_id: &str, session_id: &str) -> AppResult<String> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        use serde::{Deserialize, Serialize};

        #[derive(Debug, Serialize, Deserialize)]
        struct Claims {
            sub: String,
            sid: String,
            iat: i64,
            exp: i64,
        }

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            iat: now,
            exp: now + 3600, // 1 hour
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.auth.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Jwt(format!("Failed to generate token: {}", e)))?;

        Ok(token)
    }

    /// Generate refresh JWT token
    fn generate_refresh_token(&self, user_id: &str, session_id: &str) -> AppResult<String> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        use serde::{Deserialize, Serialize};

        #[derive(Debug, Serialize, Deserialize)]
        struct RefreshClaims {
            sub: String,
            sid: String,
            iat: i64,
            exp: i64,
        }

        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            iat: now,
            exp: now + (180 * 24 * 3600), // 180 days
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.auth.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Jwt(format!("Failed to generate refresh token: {}", e)))?;

        Ok(token)
    }
}

/// Hash a password with Argon2id
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored Argon2 hash
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Stored password hash invalid: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
    }
}
