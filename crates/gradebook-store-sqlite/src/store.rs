//! [`SqliteStore`], the SQLite implementation of [`RosterStore`].

use std::path::Path;

use gradebook_core::{
  closing::TermResult,
  evaluation::{Evaluation, Grade, NewEvaluation, NewGrade},
  roster::{Course, Enrollment, NewCourse, NewProfessor, NewStudent, Professor, Student},
  session::{NewSession, SessionDetail},
  store::{Deadline, RosterStore},
};
use uuid::Uuid;

use crate::{Error, Result, ops, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A gradebook store backed by a single SQLite file.
///
/// All statements run on the one background thread owned by the
/// [`tokio_rusqlite::Connection`], so operations are serialised and each one
/// sees the committed effects of every earlier one.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the database thread, keeping its typed error intact.
  async fn run<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

// ─── RosterStore impl ────────────────────────────────────────────────────────

impl RosterStore for SqliteStore {
  type Error = Error;

  // ── Professors ────────────────────────────────────────────────────────────

  async fn add_professor(&self, input: NewProfessor, deadline: Deadline) -> Result<Professor> {
    self.run(move |conn| ops::add_professor(conn, input, deadline)).await
  }

  async fn get_professor(&self, id: Uuid) -> Result<Option<Professor>> {
    self.run(move |conn| ops::get_professor(conn, id)).await
  }

  async fn find_professor_by_email(&self, email: String) -> Result<Option<Professor>> {
    self.run(move |conn| ops::find_professor_by_email(conn, &email)).await
  }

  async fn remove_professor(&self, id: Uuid, deadline: Deadline) -> Result<()> {
    self.run(move |conn| ops::remove_professor(conn, id, deadline)).await
  }

  // ── Students ──────────────────────────────────────────────────────────────

  async fn add_student(&self, input: NewStudent, deadline: Deadline) -> Result<Student> {
    self.run(move |conn| ops::add_student(conn, input, deadline)).await
  }

  async fn get_student(&self, id: Uuid) -> Result<Option<Student>> {
    self.run(move |conn| ops::get_student(conn, id)).await
  }

  async fn set_student_active(
    &self,
    id: Uuid,
    active: bool,
    deadline: Deadline,
  ) -> Result<Student> {
    self.run(move |conn| ops::set_student_active(conn, id, active, deadline)).await
  }

  async fn remove_student(&self, id: Uuid, deadline: Deadline) -> Result<()> {
    self.run(move |conn| ops::remove_student(conn, id, deadline)).await
  }

  // ── Courses ───────────────────────────────────────────────────────────────

  async fn add_course(
    &self,
    professor_id: Uuid,
    input: NewCourse,
    deadline: Deadline,
  ) -> Result<Course> {
    self.run(move |conn| ops::add_course(conn, professor_id, input, deadline)).await
  }

  async fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
    self.run(move |conn| ops::get_course(conn, id)).await
  }

  async fn list_courses(&self, professor_id: Uuid) -> Result<Vec<Course>> {
    self.run(move |conn| ops::list_courses(conn, professor_id)).await
  }

  // ── Enrollments ───────────────────────────────────────────────────────────

  async fn enroll(
    &self,
    course_id: Uuid,
    student_id: Uuid,
    deadline: Deadline,
  ) -> Result<Enrollment> {
    self.run(move |conn| ops::enroll(conn, course_id, student_id, deadline)).await
  }

  async fn unenroll(&self, course_id: Uuid, student_id: Uuid, deadline: Deadline) -> Result<()> {
    self.run(move |conn| ops::unenroll(conn, course_id, student_id, deadline)).await
  }

  async fn list_enrollments(&self, course_id: Uuid) -> Result<Vec<Enrollment>> {
    self.run(move |conn| ops::list_enrollments(conn, course_id)).await
  }

  // ── Sessions & attendance ─────────────────────────────────────────────────

  async fn create_session(
    &self,
    course_id: Uuid,
    input: NewSession,
    deadline: Deadline,
  ) -> Result<SessionDetail> {
    self.run(move |conn| ops::create_session(conn, course_id, input, deadline)).await
  }

  async fn list_sessions(&self, course_id: Uuid) -> Result<Vec<SessionDetail>> {
    self.run(move |conn| ops::list_sessions(conn, course_id)).await
  }

  async fn get_session(&self, id: Uuid) -> Result<Option<SessionDetail>> {
    self.run(move |conn| ops::get_session(conn, id)).await
  }

  // ── Evaluations & grades ──────────────────────────────────────────────────

  async fn add_evaluation(
    &self,
    course_id: Uuid,
    input: NewEvaluation,
    deadline: Deadline,
  ) -> Result<Evaluation> {
    self.run(move |conn| ops::add_evaluation(conn, course_id, input, deadline)).await
  }

  async fn list_evaluations(&self, course_id: Uuid) -> Result<Vec<Evaluation>> {
    self.run(move |conn| ops::list_evaluations(conn, course_id)).await
  }

  async fn record_grades(
    &self,
    course_id: Uuid,
    evaluation_id: Uuid,
    grades: Vec<NewGrade>,
    deadline: Deadline,
  ) -> Result<Vec<Grade>> {
    self
      .run(move |conn| ops::record_grades(conn, course_id, evaluation_id, grades, deadline))
      .await
  }

  async fn list_grades(&self, course_id: Uuid, evaluation_id: Uuid) -> Result<Vec<Grade>> {
    self.run(move |conn| ops::list_grades(conn, course_id, evaluation_id)).await
  }

  // ── Term closing ──────────────────────────────────────────────────────────

  async fn close_term(&self, course_id: Uuid, deadline: Deadline) -> Result<Vec<TermResult>> {
    self.run(move |conn| ops::close_term(conn, course_id, deadline)).await
  }

  async fn list_term_results(&self, course_id: Uuid) -> Result<Vec<TermResult>> {
    self.run(move |conn| ops::list_term_results(conn, course_id)).await
  }
}
