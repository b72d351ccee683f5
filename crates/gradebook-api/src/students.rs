//! Handlers for `/students` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/students` | Body: `{"name":"..","email":".."}` |
//! | `GET`    | `/students/{id}` | 404 if not found |
//! | `POST`   | `/students/{id}/activate` | 409 if already active |
//! | `POST`   | `/students/{id}/deactivate` | 409 if already inactive |
//! | `DELETE` | `/students/{id}` | Cascades to enrollments, attendance, grades, results |

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use gradebook_core::{
  roster::{NewStudent, Student},
  store::RosterStore,
};
use uuid::Uuid;

use crate::{AppState, auth::AuthProfessor, error::ApiError};

/// `POST /students`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  _: AuthProfessor,
  payload: Result<Json<NewStudent>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RosterStore + 'static,
{
  let Json(body) = payload?;
  let student = state.within(state.book().add_student(body)).await?;
  Ok((StatusCode::CREATED, Json(student)))
}

/// `GET /students/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _: AuthProfessor,
  Path(id): Path<Uuid>,
) -> Result<Json<Student>, ApiError>
where
  S: RosterStore + 'static,
{
  Ok(Json(state.within(state.book().student(id)).await?))
}

/// `POST /students/{id}/activate`
pub async fn activate<S>(
  State(state): State<AppState<S>>,
  _: AuthProfessor,
  Path(id): Path<Uuid>,
) -> Result<Json<Student>, ApiError>
where
  S: RosterStore + 'static,
{
  Ok(Json(state.within(state.book().set_student_active(id, true)).await?))
}

/// `POST /students/{id}/deactivate`
pub async fn deactivate<S>(
  State(state): State<AppState<S>>,
  _: AuthProfessor,
  Path(id): Path<Uuid>,
) -> Result<Json<Student>, ApiError>
where
  S: RosterStore + 'static,
{
  Ok(Json(state.within(state.book().set_student_active(id, false)).await?))
}

/// `DELETE /students/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  _: AuthProfessor,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: RosterStore + 'static,
{
  state.within(state.book().remove_student(id)).await?;
  Ok(StatusCode::NO_CONTENT)
}
