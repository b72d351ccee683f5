//! Handlers for evaluations and the grades recorded against them.

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use gradebook_core::{
  evaluation::{Evaluation, Grade, NewEvaluation, NewGrade},
  store::RosterStore,
};
use uuid::Uuid;

use crate::{AppState, auth::AuthProfessor, courses::owned_course, error::ApiError};

/// `GET /courses/{id}/evaluations`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  AuthProfessor(me): AuthProfessor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Evaluation>>, ApiError>
where
  S: RosterStore + 'static,
{
  owned_course(&state, me, id).await?;
  Ok(Json(state.within(state.book().evaluations(id)).await?))
}

/// `POST /courses/{id}/evaluations`: body: name, kind (`exam` |
/// `assignment`), date, weight.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  AuthProfessor(me): AuthProfessor,
  Path(id): Path<Uuid>,
  payload: Result<Json<NewEvaluation>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RosterStore + 'static,
{
  let Json(body) = payload?;
  owned_course(&state, me, id).await?;
  let evaluation = state.within(state.book().add_evaluation(id, body)).await?;
  Ok((StatusCode::CREATED, Json(evaluation)))
}

/// `GET /courses/{id}/evaluations/{evaluation_id}/grades`
pub async fn list_grades<S>(
  State(state): State<AppState<S>>,
  AuthProfessor(me): AuthProfessor,
  Path((id, evaluation_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<Grade>>, ApiError>
where
  S: RosterStore + 'static,
{
  owned_course(&state, me, id).await?;
  Ok(Json(state.within(state.book().grades(id, evaluation_id)).await?))
}

/// `POST /courses/{id}/evaluations/{evaluation_id}/grades`: body: an array
/// of `{"student_id":"..","score":7.5}`. Existing scores are replaced.
pub async fn record_grades<S>(
  State(state): State<AppState<S>>,
  AuthProfessor(me): AuthProfessor,
  Path((id, evaluation_id)): Path<(Uuid, Uuid)>,
  payload: Result<Json<Vec<NewGrade>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RosterStore + 'static,
{
  let Json(grades) = payload?;
  owned_course(&state, me, id).await?;
  let recorded = state.within(state.book().record_grades(id, evaluation_id, grades)).await?;
  Ok((StatusCode::CREATED, Json(recorded)))
}
