//! The `RosterStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `gradebook-store-sqlite`). Higher layers depend on this abstraction, not on
//! any concrete backend.
//!
//! Every mutating method is one atomic unit: the row it writes and the course
//! counters that summarise those rows change together or not at all. Domain
//! rejections detected while the unit runs (duplicate session number, already
//! inactive, ...) surface as the corresponding [`crate::Error`] once the
//! backend error is converted.
//!
//! Mutating methods also take a [`Deadline`]. Backends check it immediately
//! before committing, so a caller that has given up on the call never leaves
//! a committed write behind.

use std::{
  future::Future,
  time::{Duration, Instant},
};

use uuid::Uuid;

use crate::{
  closing::TermResult,
  evaluation::{Evaluation, Grade, NewEvaluation, NewGrade},
  roster::{Course, Enrollment, NewCourse, NewProfessor, NewStudent, Professor, Student},
  session::{NewSession, SessionDetail},
};

// ─── Deadline ────────────────────────────────────────────────────────────────

/// The latest instant at which a store operation may still commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
  /// No deadline; the operation always commits.
  pub const NONE: Self = Self(None);

  pub fn at(instant: Instant) -> Self { Self(Some(instant)) }

  /// A deadline `timeout` from now. Unrepresentable instants mean no deadline.
  pub fn after(timeout: Duration) -> Self { Self(Instant::now().checked_add(timeout)) }

  pub fn is_expired(&self) -> bool { self.0.is_some_and(|at| Instant::now() >= at) }

  /// Fail with [`crate::Error::DeadlineExceeded`] once the deadline has
  /// passed.
  pub fn check(&self) -> crate::Result<()> {
    if self.is_expired() {
      return Err(crate::Error::DeadlineExceeded);
    }
    Ok(())
  }
}

// ─── Store trait ─────────────────────────────────────────────────────────────

/// Abstraction over a gradebook storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RosterStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  // ── Professors ────────────────────────────────────────────────────────────

  /// Persist a professor. Fails with `DuplicateEmail` if the email is taken.
  fn add_professor(
    &self,
    input: NewProfessor,
    deadline: Deadline,
  ) -> impl Future<Output = Result<Professor, Self::Error>> + Send + '_;

  fn get_professor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Professor>, Self::Error>> + Send + '_;

  fn find_professor_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<Professor>, Self::Error>> + Send + '_;

  /// Delete a professor together with their courses and every row that
  /// belongs to those courses.
  fn remove_professor(
    &self,
    id: Uuid,
    deadline: Deadline,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Students ──────────────────────────────────────────────────────────────

  /// Persist an active student. Fails with `DuplicateEmail` if the email is
  /// taken.
  fn add_student(
    &self,
    input: NewStudent,
    deadline: Deadline,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  fn get_student(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  /// Flip a student's active flag and move every enrolled course's
  /// `enrolled_count` by one in the same direction.
  ///
  /// Fails with `AlreadyActive` / `AlreadyInactive` without writing when the
  /// requested state equals the current one.
  fn set_student_active(
    &self,
    id: Uuid,
    active: bool,
    deadline: Deadline,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  /// Delete a student and their enrollments, attendance, grades and term
  /// results, decrementing the counters of courses that were counting them.
  fn remove_student(
    &self,
    id: Uuid,
    deadline: Deadline,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Courses ───────────────────────────────────────────────────────────────

  fn add_course(
    &self,
    professor_id: Uuid,
    input: NewCourse,
    deadline: Deadline,
  ) -> impl Future<Output = Result<Course, Self::Error>> + Send + '_;

  fn get_course(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  fn list_courses(
    &self,
    professor_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Course>, Self::Error>> + Send + '_;

  // ── Enrollments ───────────────────────────────────────────────────────────

  /// Register a student in a course and bump `enrolled_count` if the student
  /// is active. Fails with `AlreadyEnrolled` for a repeated pair.
  fn enroll(
    &self,
    course_id: Uuid,
    student_id: Uuid,
    deadline: Deadline,
  ) -> impl Future<Output = Result<Enrollment, Self::Error>> + Send + '_;

  /// Remove an enrollment with the student's attendance and grades in that
  /// course.
  fn unenroll(
    &self,
    course_id: Uuid,
    student_id: Uuid,
    deadline: Deadline,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Enrollments of a course in insertion order.
  fn list_enrollments(
    &self,
    course_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Enrollment>, Self::Error>> + Send + '_;

  // ── Sessions & attendance ─────────────────────────────────────────────────

  /// Insert a session, add its hours to `realized_hours`, and write one
  /// attendance row per enrolled student.
  fn create_session(
    &self,
    course_id: Uuid,
    input: NewSession,
    deadline: Deadline,
  ) -> impl Future<Output = Result<SessionDetail, Self::Error>> + Send + '_;

  /// Sessions of a course ordered by number, with attendance.
  fn list_sessions(
    &self,
    course_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SessionDetail>, Self::Error>> + Send + '_;

  fn get_session(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<SessionDetail>, Self::Error>> + Send + '_;

  // ── Evaluations & grades ──────────────────────────────────────────────────

  /// Insert an evaluation and bump the course's exam or assignment counter.
  fn add_evaluation(
    &self,
    course_id: Uuid,
    input: NewEvaluation,
    deadline: Deadline,
  ) -> impl Future<Output = Result<Evaluation, Self::Error>> + Send + '_;

  fn list_evaluations(
    &self,
    course_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Evaluation>, Self::Error>> + Send + '_;

  /// Insert grades for one evaluation, replacing the score of any student
  /// already graded. Every student must be enrolled in the course.
  fn record_grades(
    &self,
    course_id: Uuid,
    evaluation_id: Uuid,
    grades: Vec<NewGrade>,
    deadline: Deadline,
  ) -> impl Future<Output = Result<Vec<Grade>, Self::Error>> + Send + '_;

  fn list_grades(
    &self,
    course_id: Uuid,
    evaluation_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Grade>, Self::Error>> + Send + '_;

  // ── Term closing ──────────────────────────────────────────────────────────

  /// Snapshot the course, run [`crate::closing::compute_results`] and insert
  /// every result, all in one transaction, stamping the course's `closed_at`.
  /// Fails with `TermAlreadyClosed` if the course was closed before, even
  /// with an empty roster.
  fn close_term(
    &self,
    course_id: Uuid,
    deadline: Deadline,
  ) -> impl Future<Output = Result<Vec<TermResult>, Self::Error>> + Send + '_;

  fn list_term_results(
    &self,
    course_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TermResult>, Self::Error>> + Send + '_;
}
