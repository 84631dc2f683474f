use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::models::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// Claims valid for `security.jwt_expiry_hours`
    pub fn new(user: &User) -> Result<Self, JwtError> {
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let hours = i64::try_from(expiry_hours).map_err(|_| JwtError::InvalidExpiry(expiry_hours.to_string()))?;
        Self::for_hours(user, hours)
    }

    pub fn for_hours(user: &User, hours: i64) -> Result<Self, JwtError> {
        let ttl = Duration::try_hours(hours).ok_or_else(|| JwtError::InvalidExpiry(format!("{} hours", hours)))?;
        Self::with_expiry(user, ttl)
    }

    /// Negative `ttl` yields an already-expired token
    pub fn with_expiry(user: &User, ttl: Duration) -> Result<Self, JwtError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| JwtError::InvalidExpiry(format!("{} seconds", ttl.num_seconds())))?;
        Ok(Self {
            user_id: user.id,
            email: user.email.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
    #[error("JWT secret not configured")]
    InvalidSecret,
    #[error("Token lifetime out of range: {0}")]
    InvalidExpiry(String),
}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    generate_jwt_with_secret(claims, &config::config().security.jwt_secret)
}

pub fn verify_jwt(token: &str) -> Result<Claims, JwtError> {
    verify_jwt_with_secret(token, &config::config().security.jwt_secret)
}

pub fn generate_jwt_with_secret(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn verify_jwt_with_secret(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}
