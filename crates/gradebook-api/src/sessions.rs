//! Handlers for class sessions and their attendance sheets.

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use gradebook_core::{
  Error,
  session::{NewSession, SessionDetail},
  store::RosterStore,
};
use uuid::Uuid;

use crate::{AppState, auth::AuthProfessor, courses::owned_course, error::ApiError};

/// `GET /courses/{id}/sessions`: ordered by session number.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  AuthProfessor(me): AuthProfessor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<SessionDetail>>, ApiError>
where
  S: RosterStore + 'static,
{
  owned_course(&state, me, id).await?;
  Ok(Json(state.within(state.book().sessions(id)).await?))
}

/// `POST /courses/{id}/sessions`: body: number, date, hours, content and the
/// ids of the students present.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  AuthProfessor(me): AuthProfessor,
  Path(id): Path<Uuid>,
  payload: Result<Json<NewSession>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RosterStore + 'static,
{
  let Json(body) = payload?;
  owned_course(&state, me, id).await?;
  let detail = state.within(state.book().create_session(id, body)).await?;
  Ok((StatusCode::CREATED, Json(detail)))
}

/// `GET /sessions/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  AuthProfessor(me): AuthProfessor,
  Path(id): Path<Uuid>,
) -> Result<Json<SessionDetail>, ApiError>
where
  S: RosterStore + 'static,
{
  let detail = state.within(state.book().session(id)).await?;
  match owned_course(&state, me, detail.session.course_id).await {
    Ok(_) => Ok(Json(detail)),
    Err(ApiError::Core(Error::CourseNotFound(_))) => Err(Error::SessionNotFound(id).into()),
    Err(other) => Err(other),
  }
}
