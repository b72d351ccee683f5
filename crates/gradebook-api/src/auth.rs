//! Bearer-token authentication and password hashing.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use gradebook_core::{Error, store::RosterStore};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Tokens ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
  /// Professor id.
  sub: Uuid,
  exp: usize,
}

/// Signs and verifies HS256 tokens that identify a professor.
pub struct TokenIssuer {
  encoding: EncodingKey,
  decoding: DecodingKey,
  ttl:      Duration,
}

impl TokenIssuer {
  pub fn new(secret: &str, ttl_hours: u64) -> Self {
    // Capped at ten years so the expiry stays representable.
    let hours = ttl_hours.min(24 * 365 * 10) as i64;
    Self {
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
      ttl:      Duration::hours(hours),
    }
  }

  /// Issue a token for `professor_id`, returning it with its expiry.
  pub fn issue(&self, professor_id: Uuid) -> Result<(String, DateTime<Utc>), ApiError> {
    let expires_at = Utc::now() + self.ttl;
    let claims = Claims { sub: professor_id, exp: expires_at.timestamp() as usize };
    let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))?;
    Ok((token, expires_at))
  }

  /// Check the signature and expiry of `token` and return the professor id.
  pub fn verify(&self, token: &str) -> Result<Uuid, ApiError> {
    let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
      .map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        ApiError::Unauthorized
      })?;
    Ok(data.claims.sub)
  }
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated professor; present in a handler means the request
/// carried a valid bearer token for a professor that still exists.
#[derive(Debug, Clone, Copy)]
pub struct AuthProfessor(pub Uuid);

fn bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .ok_or(ApiError::Unauthorized)
}

impl<S> FromRequestParts<AppState<S>> for AuthProfessor
where
  S: RosterStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer(&parts.headers)?;
    let id = state.tokens.verify(token)?;
    // Tokens outlive accounts; a removed professor's token is refused.
    match state.within(state.book().professor(id)).await {
      Ok(_) => Ok(AuthProfessor(id)),
      Err(ApiError::Core(Error::ProfessorNotFound(_))) => Err(ApiError::Unauthorized),
      Err(other) => Err(other),
    }
  }
}

// ─── Passwords ───────────────────────────────────────────────────────────────

// Hashing and verification run on tokio's blocking pool, off the async workers.

/// Hash `password` into an argon2 PHC string.
pub async fn hash_password(password: String) -> Result<String, ApiError> {
  tokio::task::spawn_blocking(move || hash_blocking(&password))
    .await
    .map_err(|e| ApiError::Internal(format!("password hashing task failed: {e}")))?
}

/// Check `password` against a stored PHC string. Unparseable hashes never
/// verify.
pub async fn verify_password(password: String, phc: String) -> Result<bool, ApiError> {
  tokio::task::spawn_blocking(move || verify_blocking(&password, &phc))
    .await
    .map_err(|e| ApiError::Internal(format!("password verification task failed: {e}")))
}

fn hash_blocking(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

fn verify_blocking(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else { return false };
  Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}
