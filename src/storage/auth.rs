//! Credential service
//!
//! [`LocalAuth`] keeps accounts in `data/users.json` with Argon2id password
//! hashes. A successful login issues a random session token stored on the
//! account; logout revokes it.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::paths::SheetbookPaths;
use crate::error::{SheetbookError, SheetbookResult};
use crate::models::user::{validate_password, validate_username};
use crate::models::{User, UserSession};

use super::users::UserRepository;

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Create an account and log it in
    async fn register(&self, username: &str, password: &str) -> SheetbookResult<UserSession>;

    async fn login(&self, username: &str, password: &str) -> SheetbookResult<UserSession>;

    /// Revoke a session token; unknown tokens are ignored
    async fn logout(&self, token: &str) -> SheetbookResult<()>;

    /// The session behind `token`, if it is still valid
    async fn verify(&self, token: &str) -> SheetbookResult<Option<UserSession>>;
}

pub struct LocalAuth {
    users: UserRepository,
}

impl LocalAuth {
    pub fn open(paths: &SheetbookPaths) -> SheetbookResult<Self> {
        paths.ensure_directories()?;
        let users = UserRepository::new(paths.users_file());
        users.load()?;
        Ok(Self { users })
    }

    fn issue_session(&self, mut user: User) -> SheetbookResult<UserSession> {
        let token = Uuid::new_v4().simple().to_string();
        user.tokens.push(token.clone());
        let session = UserSession {
            user_id: user.id,
            username: user.username.clone(),
            token,
        };
        self.users.upsert(user)?;
        self.users.save()?;
        Ok(session)
    }
}

#[async_trait]
impl AuthBackend for LocalAuth {
    async fn register(&self, username: &str, password: &str) -> SheetbookResult<UserSession> {
        validate_username(username)?;
        validate_password(password)?;
        if self.users.get_by_username(username)?.is_some() {
            return Err(SheetbookError::Validation(format!(
                "Username '{}' is already taken",
                username.trim()
            )));
        }

        let user = User::new(username, hash_password(password)?);
        info!(user = %user.id, "Account registered");
        self.issue_session(user)
    }

    async fn login(&self, username: &str, password: &str) -> SheetbookResult<UserSession> {
        let rejected = || SheetbookError::Auth("Invalid username or password".into());

        let user = self.users.get_by_username(username)?.ok_or_else(rejected)?;
        if !verify_password(password, &user.password_hash) {
            warn!(user = %user.id, "Login rejected");
            return Err(rejected());
        }

        info!(user = %user.id, "Logged in");
        self.issue_session(user)
    }

    async fn logout(&self, token: &str) -> SheetbookResult<()> {
        let Some(mut user) = self.users.get_by_token(token)? else {
            return Ok(());
        };
        user.tokens.retain(|t| t != token);
        info!(user = %user.id, "Session revoked");
        self.users.upsert(user)?;
        self.users.save()
    }

    async fn verify(&self, token: &str) -> SheetbookResult<Option<UserSession>> {
        Ok(self.users.get_by_token(token)?.map(|user| UserSession {
            user_id: user.id,
            username: user.username,
            token: token.to_string(),
        }))
    }
}

fn hash_password(password: &str) -> SheetbookResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| SheetbookError::Auth(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is unreadable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn auth() -> (TempDir, SheetbookPaths, LocalAuth) {
        let temp_dir = TempDir::new().unwrap();
        let paths = SheetbookPaths::with_base_dir(temp_dir.path().to_path_buf());
        let auth = LocalAuth::open(&paths).unwrap();
        (temp_dir, paths, auth)
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (_dir, paths, auth) = auth();
        let registered = auth.register("Ada", "correct horse").await.unwrap();
        assert_eq!(registered.username, "ada");

        let reopened = LocalAuth::open(&paths).unwrap();
        let session = reopened.login("ada", "correct horse").await.unwrap();
        assert_eq!(session.user_id, registered.user_id);
        assert_ne!(session.token, registered.token);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let (_dir, _paths, auth) = auth();
        auth.register("ada", "correct horse").await.unwrap();

        let wrong = auth.login("ada", "battery staple").await.unwrap_err();
        let unknown = auth.login("bob", "correct horse").await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_duplicate_and_weak_registrations_rejected() {
        let (_dir, _paths, auth) = auth();
        auth.register("ada", "correct horse").await.unwrap();
        assert!(auth.register("ADA", "another pass").await.unwrap_err().is_validation());
        assert!(auth.register("bob", "short").await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_logout_revokes_only_that_token() {
        let (_dir, _paths, auth) = auth();
        let first = auth.register("ada", "correct horse").await.unwrap();
        let second = auth.login("ada", "correct horse").await.unwrap();

        auth.logout(&first.token).await.unwrap();
        auth.logout("unknown").await.unwrap();

        assert!(auth.verify(&first.token).await.unwrap().is_none());
        assert_eq!(
            auth.verify(&second.token).await.unwrap().map(|s| s.username),
            Some("ada".to_string())
        );
    }

    #[test]
    fn test_hash_is_not_the_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("correct horse", "garbage"));
    }
}
