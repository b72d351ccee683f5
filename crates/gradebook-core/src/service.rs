//! The [`Gradebook`] service facade the HTTP layer talks to.
//!
//! Validates inputs, turns absent rows into typed not-found errors, and
//! delegates every mutation to one atomic [`RosterStore`] call.

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
  Error, Result,
  closing::TermResult,
  evaluation::{Evaluation, Grade, NewEvaluation, NewGrade},
  roster::{Course, Enrollment, NewCourse, NewProfessor, NewStudent, Professor, Student},
  session::{NewSession, SessionDetail},
  store::{Deadline, RosterStore},
};

/// Service facade over a [`RosterStore`].
///
/// Cloning is cheap; the store is reference-counted.
pub struct Gradebook<S> {
  store:    Arc<S>,
  /// Passed to every mutating store call.
  deadline: Deadline,
}

impl<S> Clone for Gradebook<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), deadline: self.deadline }
  }
}

/// Convert a backend result into a core result, logging the failure.
fn lift<T, E: Into<Error>>(result: std::result::Result<T, E>) -> Result<T> {
  result.map_err(|e| {
    let err: Error = e.into();
    if err.is_internal() {
      tracing::error!(error = %err, "store operation failed");
    } else {
      tracing::debug!(error = %err, "request rejected");
    }
    err
  })
}

impl<S: RosterStore> Gradebook<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store, deadline: Deadline::NONE } }

  /// A handle over the same store whose writes refuse to commit after
  /// `deadline`.
  pub fn with_deadline(&self, deadline: Deadline) -> Self {
    Self { store: Arc::clone(&self.store), deadline }
  }

  // ── Professors ────────────────────────────────────────────────────────────

  pub async fn register_professor(&self, input: NewProfessor) -> Result<Professor> {
    input.validate()?;
    let professor = lift(self.store.add_professor(input, self.deadline).await)?;
    tracing::info!(professor_id = %professor.professor_id, "professor registered");
    Ok(professor)
  }

  pub async fn professor(&self, id: Uuid) -> Result<Professor> {
    lift(self.store.get_professor(id).await)?.ok_or(Error::ProfessorNotFound(id))
  }

  pub async fn professor_by_email(&self, email: &str) -> Result<Professor> {
    lift(self.store.find_professor_by_email(email.to_owned()).await)?
      .ok_or_else(|| Error::ProfessorEmailNotFound(email.to_owned()))
  }

  pub async fn remove_professor(&self, id: Uuid) -> Result<()> {
    lift(self.store.remove_professor(id, self.deadline).await)?;
    tracing::info!(professor_id = %id, "professor removed");
    Ok(())
  }

  // ── Students ──────────────────────────────────────────────────────────────

  pub async fn add_student(&self, input: NewStudent) -> Result<Student> {
    input.validate()?;
    let student = lift(self.store.add_student(input, self.deadline).await)?;
    tracing::info!(student_id = %student.student_id, "student registered");
    Ok(student)
  }

  pub async fn student(&self, id: Uuid) -> Result<Student> {
    lift(self.store.get_student(id).await)?.ok_or(Error::StudentNotFound(id))
  }

  pub async fn set_student_active(&self, id: Uuid, active: bool) -> Result<Student> {
    let student = lift(self.store.set_student_active(id, active, self.deadline).await)?;
    tracing::info!(student_id = %id, active, "student status changed");
    Ok(student)
  }

  pub async fn remove_student(&self, id: Uuid) -> Result<()> {
    lift(self.store.remove_student(id, self.deadline).await)?;
    tracing::info!(student_id = %id, "student removed");
    Ok(())
  }

  // ── Courses ───────────────────────────────────────────────────────────────

  pub async fn add_course(&self, professor_id: Uuid, input: NewCourse) -> Result<Course> {
    input.validate()?;
    let course = lift(self.store.add_course(professor_id, input, self.deadline).await)?;
    tracing::info!(course_id = %course.course_id, %professor_id, "course created");
    Ok(course)
  }

  pub async fn course(&self, id: Uuid) -> Result<Course> {
    lift(self.store.get_course(id).await)?.ok_or(Error::CourseNotFound(id))
  }

  pub async fn courses(&self, professor_id: Uuid) -> Result<Vec<Course>> {
    lift(self.store.list_courses(professor_id).await)
  }

  // ── Enrollments ───────────────────────────────────────────────────────────

  pub async fn enroll(&self, course_id: Uuid, student_id: Uuid) -> Result<Enrollment> {
    let enrollment = lift(self.store.enroll(course_id, student_id, self.deadline).await)?;
    tracing::info!(%course_id, %student_id, "student enrolled");
    Ok(enrollment)
  }

  pub async fn unenroll(&self, course_id: Uuid, student_id: Uuid) -> Result<()> {
    lift(self.store.unenroll(course_id, student_id, self.deadline).await)?;
    tracing::info!(%course_id, %student_id, "student unenrolled");
    Ok(())
  }

  pub async fn enrollments(&self, course_id: Uuid) -> Result<Vec<Enrollment>> {
    lift(self.store.list_enrollments(course_id).await)
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  pub async fn create_session(&self, course_id: Uuid, input: NewSession) -> Result<SessionDetail> {
    input.validate()?;
    let detail = lift(self.store.create_session(course_id, input, self.deadline).await)?;
    tracing::info!(
      %course_id,
      session_id = %detail.session.session_id,
      hours = detail.session.hours,
      present = detail.present_count(),
      "class session registered"
    );
    Ok(detail)
  }

  pub async fn sessions(&self, course_id: Uuid) -> Result<Vec<SessionDetail>> {
    lift(self.store.list_sessions(course_id).await)
  }

  pub async fn session(&self, id: Uuid) -> Result<SessionDetail> {
    lift(self.store.get_session(id).await)?.ok_or(Error::SessionNotFound(id))
  }

  // ── Evaluations & grades ──────────────────────────────────────────────────

  pub async fn add_evaluation(&self, course_id: Uuid, input: NewEvaluation) -> Result<Evaluation> {
    input.validate()?;
    let evaluation = lift(self.store.add_evaluation(course_id, input, self.deadline).await)?;
    tracing::info!(%course_id, evaluation_id = %evaluation.evaluation_id, "evaluation added");
    Ok(evaluation)
  }

  pub async fn evaluations(&self, course_id: Uuid) -> Result<Vec<Evaluation>> {
    lift(self.store.list_evaluations(course_id).await)
  }

  pub async fn record_grades(
    &self,
    course_id: Uuid,
    evaluation_id: Uuid,
    grades: Vec<NewGrade>,
  ) -> Result<Vec<Grade>> {
    for grade in &grades {
      grade.validate()?;
    }
    let recorded =
      lift(self.store.record_grades(course_id, evaluation_id, grades, self.deadline).await)?;
    tracing::info!(%course_id, %evaluation_id, count = recorded.len(), "grades recorded");
    Ok(recorded)
  }

  pub async fn grades(&self, course_id: Uuid, evaluation_id: Uuid) -> Result<Vec<Grade>> {
    lift(self.store.list_grades(course_id, evaluation_id).await)
  }

  // ── Term closing ──────────────────────────────────────────────────────────

  pub async fn close_term(&self, course_id: Uuid) -> Result<Vec<TermResult>> {
    let results = lift(self.store.close_term(course_id, self.deadline).await)?;
    let passed = results.iter().filter(|r| r.passed).count();
    tracing::info!(%course_id, students = results.len(), passed, "term closed");
    Ok(results)
  }

  pub async fn term_results(&self, course_id: Uuid) -> Result<Vec<TermResult>> {
    lift(self.store.list_term_results(course_id).await)
  }
}
