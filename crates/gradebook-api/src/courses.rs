//! Handlers for `/courses` endpoints, including enrollments and term closing.
//!
//! A course is visible only to the professor who owns it; any other
//! professor gets the same 404 as for a course that does not exist.

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use gradebook_core::{
  Error,
  closing::TermResult,
  roster::{Course, Enrollment, NewCourse},
  store::RosterStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::AuthProfessor, error::ApiError};

/// Fetch a course, hiding it from anyone but its owner.
pub(crate) async fn owned_course<S>(
  state: &AppState<S>,
  professor_id: Uuid,
  course_id: Uuid,
) -> Result<Course, ApiError>
where
  S: RosterStore + 'static,
{
  let course = state.within(state.book().course(course_id)).await?;
  if course.professor_id != professor_id {
    tracing::debug!(%course_id, %professor_id, "course hidden from non-owner");
    return Err(Error::CourseNotFound(course_id).into());
  }
  Ok(course)
}

// ─── Courses ─────────────────────────────────────────────────────────────────

/// `GET /courses`: the caller's own courses.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  AuthProfessor(me): AuthProfessor,
) -> Result<Json<Vec<Course>>, ApiError>
where
  S: RosterStore + 'static,
{
  Ok(Json(state.within(state.book().courses(me)).await?))
}

/// `POST /courses`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  AuthProfessor(me): AuthProfessor,
  payload: Result<Json<NewCourse>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RosterStore + 'static,
{
  let Json(body) = payload?;
  let course = state.within(state.book().add_course(me, body)).await?;
  Ok((StatusCode::CREATED, Json(course)))
}

/// `GET /courses/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  AuthProfessor(me): AuthProfessor,
  Path(id): Path<Uuid>,
) -> Result<Json<Course>, ApiError>
where
  S: RosterStore + 'static,
{
  Ok(Json(owned_course(&state, me, id).await?))
}

// ─── Enrollments ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EnrollBody {
  pub student_id: Uuid,
}

/// `GET /courses/{id}/enrollments`
pub async fn list_enrollments<S>(
  State(state): State<AppState<S>>,
  AuthProfessor(me): AuthProfessor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Enrollment>>, ApiError>
where
  S: RosterStore + 'static,
{
  owned_course(&state, me, id).await?;
  Ok(Json(state.within(state.book().enrollments(id)).await?))
}

/// `POST /courses/{id}/enrollments`: body: `{"student_id":".."}`
pub async fn enroll<S>(
  State(state): State<AppState<S>>,
  AuthProfessor(me): AuthProfessor,
  Path(id): Path<Uuid>,
  payload: Result<Json<EnrollBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RosterStore + 'static,
{
  let Json(body) = payload?;
  owned_course(&state, me, id).await?;
  let enrollment = state.within(state.book().enroll(id, body.student_id)).await?;
  Ok((StatusCode::CREATED, Json(enrollment)))
}

/// `DELETE /courses/{id}/enrollments/{student_id}`
pub async fn unenroll<S>(
  State(state): State<AppState<S>>,
  AuthProfessor(me): AuthProfessor,
  Path((id, student_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError>
where
  S: RosterStore + 'static,
{
  owned_course(&state, me, id).await?;
  state.within(state.book().unenroll(id, student_id)).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Term closing ────────────────────────────────────────────────────────────

/// `POST /courses/{id}/close`
pub async fn close<S>(
  State(state): State<AppState<S>>,
  AuthProfessor(me): AuthProfessor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<TermResult>>, ApiError>
where
  S: RosterStore + 'static,
{
  owned_course(&state, me, id).await?;
  Ok(Json(state.within(state.book().close_term(id)).await?))
}

/// `GET /courses/{id}/results`
pub async fn results<S>(
  State(state): State<AppState<S>>,
  AuthProfessor(me): AuthProfessor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<TermResult>>, ApiError>
where
  S: RosterStore + 'static,
{
  owned_course(&state, me, id).await?;
  Ok(Json(state.within(state.book().term_results(id)).await?))
}
