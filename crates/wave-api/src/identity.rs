//! Identity boundary: account creation, sign-in, bearer token verification
//! and display-name sync live behind `IdentityProvider`. User profiles never
//! carry passwords.

use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use wave_db::models::NewAccount;
use wave_db::{Database, DbError};
use wave_types::api::Claims;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid or expired token")]
    InvalidToken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("email already exists")]
    EmailExists,

    #[error("identity account not found: {0}")]
    UserNotFound(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// An account and a token the client can use right away.
#[derive(Debug, Clone)]
pub struct IssuedAccount {
    pub uid: String,
    pub token: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<IssuedAccount, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<IssuedAccount, IdentityError>;

    async fn verify_token(&self, token: &str) -> Result<Claims, IdentityError>;

    async fn update_display_name(&self, uid: &str, display_name: &str) -> Result<(), IdentityError>;

    /// Remove an account whose local profile could not be created.
    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError>;
}

/// Built-in provider: HS256 tokens signed with a shared secret, accounts in
/// the `identity_accounts` table with Argon2id password hashes.
pub struct JwtIdentity {
    db: Arc<Database>,
    secret: String,
    token_ttl: chrono::Duration,
}

impl JwtIdentity {
    pub fn new(db: Arc<Database>, secret: impl Into<String>, token_ttl: chrono::Duration) -> Self {
        Self {
            db,
            secret: secret.into(),
            token_ttl,
        }
    }

    pub fn create_token(&self, uid: &str, email: &str, display_name: &str) -> Result<String, IdentityError> {
        let expires = chrono::Utc::now()
            .checked_add_signed(self.token_ttl)
            .ok_or_else(|| IdentityError::Unavailable("token lifetime out of range".into()))?;

        let claims = Claims {
            sub: uid.to_string(),
            user_id: uid.to_string(),
            name: Some(display_name.to_string()),
            email: Some(email.to_string()),
            exp: expires.timestamp().max(0) as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| IdentityError::Unavailable(format!("token signing failed: {}", e)))
    }

    /// Run a blocking account-store call off the async runtime.
    async fn with_store<F, T>(&self, f: F) -> Result<T, IdentityError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| IdentityError::Unavailable(format!("account store task failed: {}", e)))?
            .map_err(store_error)
    }
}

fn store_error(err: anyhow::Error) -> IdentityError {
    match err.downcast_ref::<DbError>() {
        Some(DbError::Conflict(_)) => IdentityError::EmailExists,
        _ => IdentityError::Unavailable(format!("account store: {:#}", err)),
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentity {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<IssuedAccount, IdentityError> {
        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| IdentityError::Unavailable(format!("password hashing failed: {}", e)))?
            .to_string();

        let account = NewAccount {
            uid: Uuid::new_v4().simple().to_string(),
            email: email.to_string(),
            password_hash,
            display_name: display_name.to_string(),
        };
        let account = self.with_store(move |db| db.create_account(&account)).await?;

        let token = self.create_token(&account.uid, &account.email, &account.display_name)?;
        info!("Identity account {} created", account.uid);
        Ok(IssuedAccount {
            uid: account.uid,
            token,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<IssuedAccount, IdentityError> {
        let lookup = email.to_string();
        let account = self
            .with_store(move |db| db.get_account_by_email(&lookup))
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        // Verify password
        let parsed_hash = PasswordHash::new(&account.password_hash)
            .map_err(|e| IdentityError::Unavailable(format!("stored hash unreadable: {}", e)))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| IdentityError::InvalidCredentials)?;

        let token = self.create_token(&account.uid, &account.email, &account.display_name)?;
        Ok(IssuedAccount {
            uid: account.uid,
            token,
        })
    }

    async fn verify_token(&self, token: &str) -> Result<Claims, IdentityError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| IdentityError::InvalidToken)?;

        Ok(token_data.claims)
    }

    async fn update_display_name(&self, uid: &str, display_name: &str) -> Result<(), IdentityError> {
        let (id, name) = (uid.to_string(), display_name.to_string());
        if self
            .with_store(move |db| db.set_account_display_name(&id, &name))
            .await?
        {
            Ok(())
        } else {
            Err(IdentityError::UserNotFound(uid.to_string()))
        }
    }

    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError> {
        let id = uid.to_string();
        if !self.with_store(move |db| db.delete_account(&id)).await? {
            warn!("Identity account {} was already gone", uid);
        }
        Ok(())
    }
}
