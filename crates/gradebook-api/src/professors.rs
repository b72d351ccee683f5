//! Handlers for `/professors` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/professors` | Open; body: name, email, password, confirm_password |
//! | `POST`   | `/professors/login` | Open; returns a bearer token |
//! | `DELETE` | `/professors/{id}` | Only the professor themself |

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use gradebook_core::{
  Error,
  roster::{NewProfessor, Professor},
  store::RosterStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
  AppState,
  auth::{self, AuthProfessor},
  error::ApiError,
};

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterBody {
  #[validate(length(min = 1, max = 60))]
  pub name:             String,
  #[validate(email)]
  pub email:            String,
  #[validate(length(min = 8, max = 128), custom(function = "strong_password"))]
  pub password:         String,
  #[validate(must_match(other = "password", message = "passwords do not match"))]
  pub confirm_password: String,
}

/// Requires at least one lowercase letter, one uppercase letter, one digit
/// and one symbol.
fn strong_password(password: &str) -> Result<(), ValidationError> {
  let has = |pred: fn(char) -> bool| password.chars().any(pred);
  let symbol = |c: char| !c.is_alphanumeric() && !c.is_whitespace();

  if has(|c| c.is_lowercase()) && has(|c| c.is_uppercase()) && has(|c| c.is_ascii_digit()) && has(symbol)
  {
    return Ok(());
  }
  let mut err = ValidationError::new("weak_password");
  err.message = Some("password needs lower and upper case letters, a digit and a symbol".into());
  Err(err)
}

/// `POST /professors`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  payload: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RosterStore + 'static,
{
  let Json(body) = payload?;
  body.validate().map_err(Error::from)?;

  let password_hash = auth::hash_password(body.password).await?;
  let input = NewProfessor { name: body.name, email: body.email, password_hash };
  let professor = state.within(state.book().register_professor(input)).await?;
  Ok((StatusCode::CREATED, Json(professor)))
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
  pub token:      String,
  pub expires_at: DateTime<Utc>,
  pub professor:  Professor,
}

/// `POST /professors/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  payload: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError>
where
  S: RosterStore + 'static,
{
  let Json(body) = payload?;
  let professor = state.within(state.book().professor_by_email(&body.email)).await?;

  if !auth::verify_password(body.password, professor.password_hash.clone()).await? {
    tracing::info!(professor_id = %professor.professor_id, "failed login attempt");
    return Err(Error::InvalidCredentials.into());
  }

  let (token, expires_at) = state.tokens.issue(professor.professor_id)?;
  tracing::info!(professor_id = %professor.professor_id, "professor logged in");
  Ok(Json(LoginResponse { token, expires_at, professor }))
}

// ─── Remove ──────────────────────────────────────────────────────────────────

/// `DELETE /professors/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  AuthProfessor(me): AuthProfessor,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: RosterStore + 'static,
{
  if id != me {
    return Err(ApiError::Forbidden("professors may only remove their own account".into()));
  }
  state.within(state.book().remove_professor(id)).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn body(password: &str, confirm: &str) -> RegisterBody {
    RegisterBody {
      name:             "Prof".into(),
      email:            "prof@uni.br".into(),
      password:         password.into(),
      confirm_password: confirm.into(),
    }
  }

  #[test]
  fn password_strength_rules() {
    assert!(body("Str0ng!pass", "Str0ng!pass").validate().is_ok());
    for weak in ["Sh0rt!", "nouppercase1!", "NOLOWERCASE1!", "NoDigits!!", "NoSymbol123"] {
      assert!(body(weak, weak).validate().is_err(), "{weak} should be rejected");
    }
  }

  #[test]
  fn confirmation_must_match() {
    let errors = body("Str0ng!pass", "Str0ng!pas").validate().unwrap_err();
    assert!(errors.field_errors().contains_key("confirm_password"));
  }
}
