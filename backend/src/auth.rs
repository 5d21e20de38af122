use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::crypto::{generate_random_secret, hash_password, verify_password};
use crate::error::{ApiError, Result};
use crate::models::{required_field, validate_input_string, User, MAX_PASSWORD_LENGTH, MAX_USERNAME_LENGTH};
use crate::store::UserStore;

/// Identity carried by a verified bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthState {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub username: String,
}

/// Signs and checks HS256 access tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<AuthState> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|err| {
            log::debug!("Rejected token: {}", err);
            ApiError::Auth("Invalid or expired token".to_string())
        })?;

        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| ApiError::Auth("Invalid or expired token".to_string()))?;

        Ok(AuthState { user_id })
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: TokenKeys,
    bcrypt_cost: u32,
    // Verified against when the username is unknown, so both paths cost one bcrypt check
    dummy_hash: String,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenKeys, bcrypt_cost: u32) -> Result<Self> {
        let dummy_hash = bcrypt::hash(generate_random_secret(), bcrypt_cost)?;
        Ok(Self {
            users,
            tokens,
            bcrypt_cost,
            dummy_hash,
        })
    }

    pub async fn register(&self, username: Option<String>, password: Option<String>) -> Result<User> {
        let (username, password) = match (required_field(username), required_field(password)) {
            (Some(username), Some(password)) => (username, password),
            _ => return Err(ApiError::Validation("Username and password are required".to_string())),
        };

        validate_input_string(&username, Some(MAX_USERNAME_LENGTH))
            .map_err(|msg| ApiError::Validation(format!("Invalid username: {}", msg)))?;
        validate_input_string(&password, Some(MAX_PASSWORD_LENGTH))
            .map_err(|msg| ApiError::Validation(format!("Invalid password: {}", msg)))?;

        if self.users.find_user_by_username(&username).await?.is_some() {
            return Err(ApiError::Conflict("Username already exists".to_string()));
        }

        let password_hash = hash_password(&password, self.bcrypt_cost).await?;
        // The store enforces uniqueness again for concurrent registrations
        let user = self.users.insert_user(&username, &password_hash).await?;

        log::info!("Registered user {}", user.id);
        Ok(user)
    }

    pub async fn login(&self, username: Option<String>, password: Option<String>) -> Result<LoginResponse> {
        let (username, password) = match (required_field(username), required_field(password)) {
            (Some(username), Some(password)) => (username, password),
            _ => return Err(ApiError::Validation("Username and password are required".to_string())),
        };

        let user = self.users.find_user_by_username(&username).await?;
        let hash = user.as_ref().map_or(self.dummy_hash.as_str(), |user| user.password_hash.as_str());
        let password_valid = verify_password(&password, hash).await?;

        match user {
            Some(user) if password_valid => {
                let access_token = self.tokens.issue(user.id)?;
                log::info!("User {} logged in", user.id);
                Ok(LoginResponse {
                    access_token,
                    username: user.username,
                })
            }
            _ => {
                log::warn!("Failed login attempt");
                Err(ApiError::Auth("Invalid credentials".to_string()))
            }
        }
    }

    /// Resolves the bearer token in `headers` to an identity.
    pub fn verify_token(&self, headers: &HeaderMap) -> Result<AuthState> {
        let token = extract_bearer_token(headers)
            .ok_or_else(|| ApiError::Auth("Missing Authorization Header".to_string()))?;
        self.tokens.verify(token)
    }

    // Tokens are stateless: the token stays valid until it expires.
    pub async fn logout(&self, auth: AuthState) -> Result<()> {
        log::info!("User {} logged out", auth.user_id);
        Ok(())
    }

    pub async fn current_user(&self, auth: AuthState) -> Result<User> {
        self.users
            .find_user_by_id(auth.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }
}
