use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

use super::validation::{Email, FullName, Password, Username, ValidationError};
use crate::store::{NewUser, Store, StoreError, User};

/// Minimum HS256 secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Username or email already exists")]
    UserExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token secret must be at least 32 bytes")]
    WeakSecret,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn http_status(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 400,
            AuthError::InvalidCredentials | AuthError::InvalidToken => 401,
            AuthError::UserNotFound => 404,
            AuthError::UserExists => 409,
            AuthError::WeakSecret | AuthError::Store(_) | AuthError::Internal(_) => 500,
        }
    }
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (username)
    pub jti: String, // Token id
    pub iat: usize,  // Issued at
    pub exp: usize,  // Expiration time (as UTC timestamp)
}

/// User Registration Request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "Alice Smith")]
    pub full_name: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "secret123")]
    pub password: String,
}

/// User Login Request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "secret123")]
    pub password: String,
}

/// Public view of a user (no password hash)
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            password_changed_at: user.password_changed_at,
            created_at: user.created_at,
        }
    }
}

/// Login Response (JWT)
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

pub struct UserAuthService {
    store: Arc<dyn Store>,
    jwt_secret: String,
    token_duration: Duration,
}

impl UserAuthService {
    pub fn new(
        store: Arc<dyn Store>,
        jwt_secret: String,
        token_duration: std::time::Duration,
    ) -> Result<Self, AuthError> {
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::WeakSecret);
        }
        let token_duration =
            Duration::from_std(token_duration).map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(Self {
            store,
            jwt_secret,
            token_duration,
        })
    }

    /// Register a new user
    pub async fn register(&self, req: RegisterRequest) -> Result<User, AuthError> {
        // 1. Validate
        let username = Username::new(&req.username)?;
        let full_name = FullName::new(&req.full_name)?;
        let email = Email::new(&req.email)?;
        let password = Password::new(&req.password)?;

        // 2. Hash password
        let salt = SaltString::generate(&mut OsRng);
        let hashed_password = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Internal(format!("Hashing failed: {}", e)))?
            .to_string();

        // 3. Insert
        let user = self
            .store
            .create_user(NewUser {
                username: username.into_string(),
                hashed_password,
                full_name: full_name.into_string(),
                email: email.into_string(),
            })
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => AuthError::UserExists,
                other => AuthError::Store(other),
            })?;

        tracing::info!(username = %user.username, "User registered");
        Ok(user)
    }

    /// Login user and issue JWT
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AuthError> {
        // 1. Find user
        let user = self
            .store
            .get_user(&req.username)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        // 2. Verify password
        let parsed_hash = PasswordHash::new(&user.hashed_password)
            .map_err(|e| AuthError::Internal(format!("Invalid hash format: {}", e)))?;

        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        // 3. Generate JWT
        let (access_token, access_token_expires_at) = self.issue_token(&user.username)?;

        Ok(LoginResponse {
            access_token,
            access_token_expires_at,
            user: user.into(),
        })
    }

    /// Sign a token for `username`, returning it with its expiry
    pub fn issue_token(&self, username: &str) -> Result<(String, DateTime<Utc>), AuthError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.token_duration)
            .ok_or_else(|| AuthError::Internal("token expiry out of range".into()))?;

        let claims = Claims {
            sub: username.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("Failed to generate token: {}", e)))?;

        Ok((token, expires_at))
    }

    /// Verify JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        let token_data =
            decode::<Claims>(token, &decoding_key, &validation).map_err(|_| AuthError::InvalidToken)?;
        Ok(token_data.claims)
    }
}
