/// Account manager implementation using runtime queries
use crate::{
    account::{RegisterRequest, ValidatedSession},
    config::AuthConfig,
    db::{
        self,
        models::{Session, User, UserRecord},
    },
    error::{HubError, HubResult},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use rand::RngCore;
use sqlx::{Row, SqlitePool};

const USER_COLUMNS: &str = "id, username, email, full_name, password_hash, created_at";

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: AuthConfig,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, config: AuthConfig) -> Self {
        Self { db, config }
    }

    /// Create a new account
    pub async fn create_account(&self, request: RegisterRequest) -> HubResult<User> {
        let username = request.username.trim().to_lowercase();
        let email = request.email.trim().to_lowercase();
        let full_name = request.full_name.trim().to_string();

        Self::validate_username(&username)?;
        Self::validate_email(&email)?;
        if full_name.is_empty() {
            return Err(HubError::Validation("Full name is required".to_string()));
        }
        if request.password.len() < 8 {
            return Err(HubError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        if self.find_by_identifier(&username).await?.is_some() {
            return Err(HubError::Conflict(format!("Username {} already taken", username)));
        }
        if self.find_by_identifier(&email).await?.is_some() {
            return Err(HubError::Conflict("Email already registered".to_string()));
        }

        let password_hash = Self::hash_password(&request.password)?;
        let record = UserRecord {
            id: db::new_id(),
            username,
            email,
            full_name,
            password_hash,
            created_at: Utc::now(),
        };

        let inserted = sqlx::query(
            "INSERT INTO users (id, username, email, full_name, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&record.id)
        .bind(&record.username)
        .bind(&record.email)
        .bind(&record.full_name)
        .bind(&record.password_hash)
        .bind(record.created_at)
        .execute(&self.db)
        .await;

        match inserted {
            Ok(_) => {}
            // Lost a registration race on username or email
            Err(e) if HubError::is_unique_violation(&e) => {
                return Err(HubError::Conflict("Username or email already registered".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %record.id, username = %record.username, "Account created");
        Ok(record.into())
    }

    /// Authenticate account and create session
    pub async fn login(&self, identifier: &str, password: &str) -> HubResult<(User, Session)> {
        let identifier = identifier.trim().to_lowercase();
        let record = self
            .find_by_identifier(&identifier)
            .await?
            .ok_or_else(|| HubError::Authentication("Invalid credentials".to_string()))?;

        if !Self::verify_password(password, &record.password_hash)? {
            return Err(HubError::Authentication("Invalid credentials".to_string()));
        }

        let session = self.create_session(&record.id).await?;
        Ok((record.into(), session))
    }

    /// Create a session for a user
    pub async fn create_session(&self, user_id: &str) -> HubResult<Session> {
        let now = Utc::now();
        let session = Session {
            id: db::new_id(),
            user_id: user_id.to_string(),
            access_token: Self::generate_token(),
            created_at: now,
            expires_at: now + Duration::seconds(self.config.session_ttl_secs),
        };

        sqlx::query(
            "INSERT INTO session (id, user_id, access_token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.access_token)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.db)
        .await?;

        tracing::debug!(user_id, session_id = %session.id, "Session created");
        Ok(session)
    }

    /// Validate access token and return session info
    pub async fn validate_access_token(&self, token: &str) -> HubResult<ValidatedSession> {
        let row = sqlx::query("SELECT id, user_id FROM session WHERE access_token = ?1 AND expires_at > ?2")
            .bind(token)
            .bind(Utc::now())
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| HubError::Authentication("Invalid or expired session".to_string()))?;

        Ok(ValidatedSession {
            session_id: row.get("id"),
            user_id: row.get("user_id"),
        })
    }

    /// Delete a session (logout)
    pub async fn logout(&self, session_id: &str) -> HubResult<()> {
        sqlx::query("DELETE FROM session WHERE id = ?1")
            .bind(session_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Get a user by id
    pub async fn get_user(&self, user_id: &str) -> HubResult<User> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| HubError::NotFound("User not found".to_string()))?;
        Ok(record.into())
    }

    /// Cleanup expired sessions
    ///
    /// Returns the number of sessions deleted
    pub async fn cleanup_expired_sessions(&self) -> HubResult<u64> {
        let result = sqlx::query("DELETE FROM session WHERE expires_at <= ?1")
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        let sessions_deleted = result.rows_affected();
        if sessions_deleted > 0 {
            tracing::info!(sessions_deleted, "Cleaned up expired sessions");
        } else {
            tracing::debug!("Session cleanup: no expired sessions found");
        }
        Ok(sessions_deleted)
    }

    async fn find_by_identifier(&self, identifier: &str) -> HubResult<Option<UserRecord>> {
        let sql = format!(
            "SELECT {} FROM users WHERE username = ?1 OR email = ?1",
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(identifier)
            .fetch_optional(&self.db)
            .await?;
        Ok(record)
    }

    fn hash_password(password: &str) -> HubResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HubError::Internal(format!("Password hashing failed: {}", e)))
    }

    fn verify_password(password: &str, stored: &str) -> HubResult<bool> {
        let parsed = PasswordHash::new(stored)
            .map_err(|e| HubError::Internal(format!("Stored password hash is invalid: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// 256 bits of randomness, URL-safe
    fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Validate username format
    fn validate_username(username: &str) -> HubResult<()> {
        if username.len() < 3 {
            return Err(HubError::Validation("Username must be at least 3 characters".to_string()));
        }
        if username.len() > 32 {
            return Err(HubError::Validation("Username too long".to_string()));
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(HubError::Validation("Username contains invalid characters".to_string()));
        }
        Ok(())
    }

    /// Validate email format
    fn validate_email(email: &str) -> HubResult<()> {
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(HubError::Validation("Invalid email format".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn manager(ttl: i64) -> AccountManager {
        let pool = db::create_memory_pool().await.unwrap();
        AccountManager::new(pool, AuthConfig { session_ttl_secs: ttl })
    }

    fn alice() -> RegisterRequest {
        RegisterRequest {
            username: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            full_name: "Alice A".to_string(),
            password: "correct horse".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_login_validate_logout() {
        let accounts = manager(3600).await;
        let user = accounts.create_account(alice()).await.unwrap();
        assert_eq!(user.username, "alice");

        let (logged_in, session) = accounts.login("ALICE", "correct horse").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        let validated = accounts.validate_access_token(&session.access_token).await.unwrap();
        assert_eq!(validated.user_id, user.id);

        accounts.logout(&validated.session_id).await.unwrap();
        assert!(matches!(
            accounts.validate_access_token(&session.access_token).await,
            Err(HubError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_login_by_email_and_wrong_password() {
        let accounts = manager(3600).await;
        accounts.create_account(alice()).await.unwrap();

        assert!(accounts.login("alice@example.com", "correct horse").await.is_ok());
        assert!(matches!(
            accounts.login("alice", "wrong password").await,
            Err(HubError::Authentication(_))
        ));
        assert!(matches!(
            accounts.login("nobody", "correct horse").await,
            Err(HubError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let accounts = manager(3600).await;
        accounts.create_account(alice()).await.unwrap();

        let mut again = alice();
        again.email = "other@example.com".to_string();
        assert!(matches!(
            accounts.create_account(again).await,
            Err(HubError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_registration() {
        let accounts = manager(3600).await;

        let mut bad = alice();
        bad.email = "not-an-email".to_string();
        assert!(matches!(accounts.create_account(bad).await, Err(HubError::Validation(_))));

        let mut bad = alice();
        bad.password = "short".to_string();
        assert!(matches!(accounts.create_account(bad).await, Err(HubError::Validation(_))));

        let mut bad = alice();
        bad.username = "a b".to_string();
        assert!(matches!(accounts.create_account(bad).await, Err(HubError::Validation(_))));
    }

    #[tokio::test]
    async fn test_expired_sessions_are_rejected_and_purged() {
        let accounts = manager(0).await;
        let user = accounts.create_account(alice()).await.unwrap();
        let session = accounts.create_session(&user.id).await.unwrap();

        assert!(accounts.validate_access_token(&session.access_token).await.is_err());
        assert_eq!(accounts.cleanup_expired_sessions().await.unwrap(), 1);
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(AccountManager::generate_token(), AccountManager::generate_token());
        assert_eq!(AccountManager::generate_token().len(), 43);
    }
}
