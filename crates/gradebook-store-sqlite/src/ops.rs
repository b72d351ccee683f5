//! Synchronous operations executed on the database thread.
//!
//! Each mutating function opens one transaction, performs every check and
//! write inside it, and commits only once nothing can fail any more and the
//! caller's [`Deadline`] has not passed. Dropping an uncommitted
//! [`rusqlite::Transaction`] rolls it back, so an early `?` leaves the
//! database untouched.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use gradebook_core::{
  Error as Rejection,
  closing::{self, TermResult, TermSnapshot},
  evaluation::{Evaluation, EvaluationKind, Grade, NewEvaluation, NewGrade},
  roster::{Course, Enrollment, NewCourse, NewProfessor, NewStudent, Professor, Student},
  session::{NewSession, SessionDetail},
  store::Deadline,
};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    RawAttendanceEntry, RawCourse, RawEnrollment, RawEvaluation, RawGrade, RawProfessor,
    RawSession, RawStudent, RawTermResult, decode_uuid, encode_date, encode_dt, encode_kind,
    encode_uuid,
  },
};

// ─── Lookups ─────────────────────────────────────────────────────────────────

fn fetch_professor(conn: &Connection, id: Uuid) -> Result<Option<Professor>> {
  conn
    .query_row(
      &format!("SELECT {} FROM professors WHERE professor_id = ?1", RawProfessor::COLUMNS),
      params![encode_uuid(id)],
      RawProfessor::from_row,
    )
    .optional()?
    .map(RawProfessor::into_professor)
    .transpose()
}

fn fetch_student(conn: &Connection, id: Uuid) -> Result<Option<Student>> {
  conn
    .query_row(
      &format!("SELECT {} FROM students WHERE student_id = ?1", RawStudent::COLUMNS),
      params![encode_uuid(id)],
      RawStudent::from_row,
    )
    .optional()?
    .map(RawStudent::into_student)
    .transpose()
}

fn fetch_course(conn: &Connection, id: Uuid) -> Result<Option<Course>> {
  conn
    .query_row(
      &format!("SELECT {} FROM courses WHERE course_id = ?1", RawCourse::COLUMNS),
      params![encode_uuid(id)],
      RawCourse::from_row,
    )
    .optional()?
    .map(RawCourse::into_course)
    .transpose()
}

fn fetch_evaluation(conn: &Connection, id: Uuid) -> Result<Option<Evaluation>> {
  conn
    .query_row(
      &format!("SELECT {} FROM evaluations WHERE evaluation_id = ?1", RawEvaluation::COLUMNS),
      params![encode_uuid(id)],
      RawEvaluation::from_row,
    )
    .optional()?
    .map(RawEvaluation::into_evaluation)
    .transpose()
}

fn require_student(conn: &Connection, id: Uuid) -> Result<Student> {
  fetch_student(conn, id)?.ok_or_else(|| Rejection::StudentNotFound(id).into())
}

fn require_course(conn: &Connection, id: Uuid) -> Result<Course> {
  fetch_course(conn, id)?.ok_or_else(|| Rejection::CourseNotFound(id).into())
}

fn email_taken(conn: &Connection, table: &str, email: &str) -> Result<bool> {
  let found = conn
    .query_row(
      &format!("SELECT 1 FROM {table} WHERE email = ?1"),
      params![email],
      |_| Ok(()),
    )
    .optional()?;
  Ok(found.is_some())
}

fn is_enrolled(conn: &Connection, course_id: Uuid, student_id: Uuid) -> Result<bool> {
  let found = conn
    .query_row(
      "SELECT 1 FROM enrollments WHERE course_id = ?1 AND student_id = ?2",
      params![encode_uuid(course_id), encode_uuid(student_id)],
      |_| Ok(()),
    )
    .optional()?;
  Ok(found.is_some())
}

/// Move `enrolled_count` by `delta` on every course the student is enrolled
/// in.
fn shift_enrolled_counts(conn: &Connection, student_id: Uuid, delta: i64) -> Result<()> {
  conn.execute(
    "UPDATE courses SET enrolled_count = enrolled_count + ?1
     WHERE course_id IN (SELECT course_id FROM enrollments WHERE student_id = ?2)",
    params![delta, encode_uuid(student_id)],
  )?;
  Ok(())
}

fn collect<R, T>(
  conn: &Connection,
  sql: &str,
  args: impl rusqlite::Params,
  read: fn(&rusqlite::Row<'_>) -> rusqlite::Result<R>,
  decode: fn(R) -> Result<T>,
) -> Result<Vec<T>> {
  let mut stmt = conn.prepare(sql)?;
  let raws = stmt.query_map(args, read)?.collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(decode).collect()
}

// ─── Professors ──────────────────────────────────────────────────────────────

pub fn add_professor(
  conn: &mut Connection,
  input: NewProfessor,
  deadline: Deadline,
) -> Result<Professor> {
  let tx = conn.transaction()?;
  if email_taken(&tx, "professors", &input.email)? {
    return Err(Rejection::DuplicateEmail(input.email).into());
  }

  let professor = Professor {
    professor_id:  Uuid::new_v4(),
    name:          input.name,
    email:         input.email,
    password_hash: input.password_hash,
    created_at:    Utc::now(),
  };
  tx.execute(
    "INSERT INTO professors (professor_id, name, email, password_hash, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(professor.professor_id),
      professor.name,
      professor.email,
      professor.password_hash,
      encode_dt(professor.created_at),
    ],
  )?;
  deadline.check()?;
  tx.commit()?;
  Ok(professor)
}

pub fn get_professor(conn: &mut Connection, id: Uuid) -> Result<Option<Professor>> {
  fetch_professor(conn, id)
}

pub fn find_professor_by_email(conn: &mut Connection, email: &str) -> Result<Option<Professor>> {
  conn
    .query_row(
      &format!("SELECT {} FROM professors WHERE email = ?1", RawProfessor::COLUMNS),
      params![email],
      RawProfessor::from_row,
    )
    .optional()?
    .map(RawProfessor::into_professor)
    .transpose()
}

pub fn remove_professor(conn: &mut Connection, id: Uuid, deadline: Deadline) -> Result<()> {
  let tx = conn.transaction()?;
  if fetch_professor(&tx, id)?.is_none() {
    return Err(Rejection::ProfessorNotFound(id).into());
  }

  let course_ids: Vec<String> = {
    let mut stmt = tx.prepare("SELECT course_id FROM courses WHERE professor_id = ?1")?;
    stmt
      .query_map(params![encode_uuid(id)], |r| r.get(0))?
      .collect::<rusqlite::Result<_>>()?
  };
  for course_id in &course_ids {
    delete_course_rows(&tx, course_id)?;
  }

  tx.execute("DELETE FROM professors WHERE professor_id = ?1", params![encode_uuid(id)])?;
  deadline.check()?;
  tx.commit()?;
  Ok(())
}

/// Delete a course and every row that hangs off it, children first.
fn delete_course_rows(conn: &Connection, course_id: &str) -> Result<()> {
  conn.execute(
    "DELETE FROM attendance
     WHERE session_id IN (SELECT session_id FROM class_sessions WHERE course_id = ?1)",
    params![course_id],
  )?;
  for table in ["grades", "term_results", "class_sessions", "evaluations", "enrollments", "courses"] {
    conn.execute(&format!("DELETE FROM {table} WHERE course_id = ?1"), params![course_id])?;
  }
  Ok(())
}

// ─── Students ────────────────────────────────────────────────────────────────

pub fn add_student(
  conn: &mut Connection,
  input: NewStudent,
  deadline: Deadline,
) -> Result<Student> {
  let tx = conn.transaction()?;
  if email_taken(&tx, "students", &input.email)? {
    return Err(Rejection::DuplicateEmail(input.email).into());
  }

  let student = Student {
    student_id: Uuid::new_v4(),
    name:       input.name,
    email:      input.email,
    active:     true,
    created_at: Utc::now(),
  };
  tx.execute(
    "INSERT INTO students (student_id, name, email, active, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(student.student_id),
      student.name,
      student.email,
      student.active,
      encode_dt(student.created_at),
    ],
  )?;
  deadline.check()?;
  tx.commit()?;
  Ok(student)
}

pub fn get_student(conn: &mut Connection, id: Uuid) -> Result<Option<Student>> {
  fetch_student(conn, id)
}

pub fn set_student_active(
  conn: &mut Connection,
  id: Uuid,
  active: bool,
  deadline: Deadline,
) -> Result<Student> {
  let tx = conn.transaction()?;
  let mut student = require_student(&tx, id)?;
  match (student.active, active) {
    (true, true) => return Err(Rejection::AlreadyActive(id).into()),
    (false, false) => return Err(Rejection::AlreadyInactive(id).into()),
    _ => {}
  }

  tx.execute(
    "UPDATE students SET active = ?1 WHERE student_id = ?2",
    params![active, encode_uuid(id)],
  )?;
  shift_enrolled_counts(&tx, id, if active { 1 } else { -1 })?;
  deadline.check()?;
  tx.commit()?;

  student.active = active;
  Ok(student)
}

pub fn remove_student(conn: &mut Connection, id: Uuid, deadline: Deadline) -> Result<()> {
  let tx = conn.transaction()?;
  let student = require_student(&tx, id)?;
  if student.active {
    shift_enrolled_counts(&tx, id, -1)?;
  }

  let id = encode_uuid(id);
  for table in ["attendance", "grades", "term_results", "enrollments", "students"] {
    tx.execute(&format!("DELETE FROM {table} WHERE student_id = ?1"), params![id])?;
  }
  deadline.check()?;
  tx.commit()?;
  Ok(())
}

// ─── Courses ─────────────────────────────────────────────────────────────────

pub fn add_course(
  conn: &mut Connection,
  professor_id: Uuid,
  input: NewCourse,
  deadline: Deadline,
) -> Result<Course> {
  let tx = conn.transaction()?;
  if fetch_professor(&tx, professor_id)?.is_none() {
    return Err(Rejection::ProfessorNotFound(professor_id).into());
  }

  let course = Course {
    course_id: Uuid::new_v4(),
    professor_id,
    name: input.name,
    term: input.term,
    planned_hours: input.planned_hours,
    realized_hours: 0,
    enrolled_count: 0,
    exam_count: 0,
    assignment_count: 0,
    min_grade: input.min_grade,
    min_attendance: input.min_attendance,
    created_at: Utc::now(),
    closed_at: None,
  };
  tx.execute(
    "INSERT INTO courses (course_id, professor_id, name, term, planned_hours,
                          min_grade, min_attendance, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      encode_uuid(course.course_id),
      encode_uuid(professor_id),
      course.name,
      course.term,
      course.planned_hours,
      course.min_grade,
      course.min_attendance,
      encode_dt(course.created_at),
    ],
  )?;
  deadline.check()?;
  tx.commit()?;
  Ok(course)
}

pub fn get_course(conn: &mut Connection, id: Uuid) -> Result<Option<Course>> {
  fetch_course(conn, id)
}

pub fn list_courses(conn: &mut Connection, professor_id: Uuid) -> Result<Vec<Course>> {
  collect(
    conn,
    &format!(
      "SELECT {} FROM courses WHERE professor_id = ?1 ORDER BY rowid",
      RawCourse::COLUMNS
    ),
    params![encode_uuid(professor_id)],
    RawCourse::from_row,
    RawCourse::into_course,
  )
}

// ─── Enrollments ─────────────────────────────────────────────────────────────

pub fn enroll(
  conn: &mut Connection,
  course_id: Uuid,
  student_id: Uuid,
  deadline: Deadline,
) -> Result<Enrollment> {
  let tx = conn.transaction()?;
  require_course(&tx, course_id)?;
  let student = require_student(&tx, student_id)?;
  if is_enrolled(&tx, course_id, student_id)? {
    return Err(Rejection::AlreadyEnrolled { student_id, course_id }.into());
  }

  let enrollment = Enrollment {
    enrollment_id: Uuid::new_v4(),
    student_id,
    course_id,
    created_at: Utc::now(),
  };
  tx.execute(
    "INSERT INTO enrollments (enrollment_id, student_id, course_id, created_at)
     VALUES (?1, ?2, ?3, ?4)",
    params![
      encode_uuid(enrollment.enrollment_id),
      encode_uuid(student_id),
      encode_uuid(course_id),
      encode_dt(enrollment.created_at),
    ],
  )?;
  if student.active {
    tx.execute(
      "UPDATE courses SET enrolled_count = enrolled_count + 1 WHERE course_id = ?1",
      params![encode_uuid(course_id)],
    )?;
  }
  deadline.check()?;
  tx.commit()?;
  Ok(enrollment)
}

pub fn unenroll(
  conn: &mut Connection,
  course_id: Uuid,
  student_id: Uuid,
  deadline: Deadline,
) -> Result<()> {
  let tx = conn.transaction()?;
  require_course(&tx, course_id)?;
  let student = require_student(&tx, student_id)?;
  if !is_enrolled(&tx, course_id, student_id)? {
    return Err(Rejection::NotEnrolled { student_id, course_id }.into());
  }

  let (course, student_key) = (encode_uuid(course_id), encode_uuid(student_id));
  tx.execute(
    "DELETE FROM attendance WHERE student_id = ?2
       AND session_id IN (SELECT session_id FROM class_sessions WHERE course_id = ?1)",
    params![course, student_key],
  )?;
  tx.execute(
    "DELETE FROM grades WHERE course_id = ?1 AND student_id = ?2",
    params![course, student_key],
  )?;
  tx.execute(
    "DELETE FROM enrollments WHERE course_id = ?1 AND student_id = ?2",
    params![course, student_key],
  )?;
  if student.active {
    tx.execute(
      "UPDATE courses SET enrolled_count = enrolled_count - 1 WHERE course_id = ?1",
      params![course],
    )?;
  }
  deadline.check()?;
  tx.commit()?;
  Ok(())
}

pub fn list_enrollments(conn: &mut Connection, course_id: Uuid) -> Result<Vec<Enrollment>> {
  require_course(conn, course_id)?;
  enrollments_of(conn, course_id)
}

fn enrollments_of(conn: &Connection, course_id: Uuid) -> Result<Vec<Enrollment>> {
  collect(
    conn,
    &format!(
      "SELECT {} FROM enrollments WHERE course_id = ?1 ORDER BY rowid",
      RawEnrollment::COLUMNS
    ),
    params![encode_uuid(course_id)],
    RawEnrollment::from_row,
    RawEnrollment::into_enrollment,
  )
}

// ─── Sessions & attendance ───────────────────────────────────────────────────

pub fn create_session(
  conn: &mut Connection,
  course_id: Uuid,
  input: NewSession,
  deadline: Deadline,
) -> Result<SessionDetail> {
  let tx = conn.transaction()?;
  let course = require_course(&tx, course_id)?;

  let number_taken = tx
    .query_row(
      "SELECT 1 FROM class_sessions WHERE course_id = ?1 AND number = ?2",
      params![encode_uuid(course_id), input.number],
      |_| Ok(()),
    )
    .optional()?
    .is_some();
  if number_taken {
    return Err(Rejection::DuplicateSessionNumber { course_id, number: input.number }.into());
  }

  let enrolled: Vec<Uuid> =
    enrollments_of(&tx, course_id)?.into_iter().map(|e| e.student_id).collect();
  if let Some(stranger) = input.present.iter().find(|id| !enrolled.contains(*id)) {
    return Err(Rejection::NotEnrolled { student_id: *stranger, course_id }.into());
  }
  let realized_hours = course
    .realized_hours
    .checked_add(input.hours)
    .ok_or(Rejection::RealizedHoursOverflow(course_id))?;

  let present: HashSet<Uuid> = input.present.into_iter().collect();
  let session_id = Uuid::new_v4();
  tx.execute(
    "INSERT INTO class_sessions (session_id, course_id, number, session_date, hours,
                                 content, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      encode_uuid(session_id),
      encode_uuid(course_id),
      input.number,
      encode_date(input.date),
      input.hours,
      input.content,
      encode_dt(Utc::now()),
    ],
  )?;
  tx.execute(
    "UPDATE courses SET realized_hours = ?1 WHERE course_id = ?2",
    params![realized_hours, encode_uuid(course_id)],
  )?;
  {
    let mut insert = tx.prepare(
      "INSERT INTO attendance (attendance_id, session_id, student_id, present)
       VALUES (?1, ?2, ?3, ?4)",
    )?;
    for student_id in &enrolled {
      insert.execute(params![
        encode_uuid(Uuid::new_v4()),
        encode_uuid(session_id),
        encode_uuid(*student_id),
        present.contains(student_id),
      ])?;
    }
  }

  let detail = load_session(&tx, session_id)?
    .ok_or_else(|| crate::Error::Decode("session vanished inside its own transaction".into()))?;
  deadline.check()?;
  tx.commit()?;
  Ok(detail)
}

pub fn list_sessions(conn: &mut Connection, course_id: Uuid) -> Result<Vec<SessionDetail>> {
  require_course(conn, course_id)?;
  let sessions = collect(
    conn,
    &format!(
      "SELECT {} FROM class_sessions WHERE course_id = ?1 ORDER BY number",
      RawSession::COLUMNS
    ),
    params![encode_uuid(course_id)],
    RawSession::from_row,
    RawSession::into_session,
  )?;

  sessions
    .into_iter()
    .map(|session| {
      let attendance = attendance_of(conn, session.session_id)?;
      Ok(SessionDetail { session, attendance })
    })
    .collect()
}

pub fn get_session(conn: &mut Connection, id: Uuid) -> Result<Option<SessionDetail>> {
  load_session(conn, id)
}

fn load_session(conn: &Connection, id: Uuid) -> Result<Option<SessionDetail>> {
  let session = conn
    .query_row(
      &format!("SELECT {} FROM class_sessions WHERE session_id = ?1", RawSession::COLUMNS),
      params![encode_uuid(id)],
      RawSession::from_row,
    )
    .optional()?
    .map(RawSession::into_session)
    .transpose()?;

  let Some(session) = session else { return Ok(None) };
  let attendance = attendance_of(conn, id)?;
  Ok(Some(SessionDetail { session, attendance }))
}

fn attendance_of(
  conn: &Connection,
  session_id: Uuid,
) -> Result<Vec<gradebook_core::session::AttendanceEntry>> {
  collect(
    conn,
    &format!(
      "SELECT {} FROM attendance a JOIN students s ON s.student_id = a.student_id
       WHERE a.session_id = ?1 ORDER BY a.rowid",
      RawAttendanceEntry::COLUMNS
    ),
    params![encode_uuid(session_id)],
    RawAttendanceEntry::from_row,
    RawAttendanceEntry::into_entry,
  )
}

// ─── Evaluations & grades ────────────────────────────────────────────────────

pub fn add_evaluation(
  conn: &mut Connection,
  course_id: Uuid,
  input: NewEvaluation,
  deadline: Deadline,
) -> Result<Evaluation> {
  let tx = conn.transaction()?;
  require_course(&tx, course_id)?;

  let evaluation = Evaluation {
    evaluation_id: Uuid::new_v4(),
    course_id,
    name: input.name,
    kind: input.kind,
    date: input.date,
    weight: input.weight,
    created_at: Utc::now(),
  };
  tx.execute(
    "INSERT INTO evaluations (evaluation_id, course_id, name, kind, eval_date, weight, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      encode_uuid(evaluation.evaluation_id),
      encode_uuid(course_id),
      evaluation.name,
      encode_kind(evaluation.kind),
      encode_date(evaluation.date),
      evaluation.weight,
      encode_dt(evaluation.created_at),
    ],
  )?;
  let counter = match evaluation.kind {
    EvaluationKind::Exam => "exam_count",
    EvaluationKind::Assignment => "assignment_count",
  };
  tx.execute(
    &format!("UPDATE courses SET {counter} = {counter} + 1 WHERE course_id = ?1"),
    params![encode_uuid(course_id)],
  )?;
  deadline.check()?;
  tx.commit()?;
  Ok(evaluation)
}

pub fn list_evaluations(conn: &mut Connection, course_id: Uuid) -> Result<Vec<Evaluation>> {
  require_course(conn, course_id)?;
  evaluations_of(conn, course_id)
}

fn evaluations_of(conn: &Connection, course_id: Uuid) -> Result<Vec<Evaluation>> {
  collect(
    conn,
    &format!(
      "SELECT {} FROM evaluations WHERE course_id = ?1 ORDER BY rowid",
      RawEvaluation::COLUMNS
    ),
    params![encode_uuid(course_id)],
    RawEvaluation::from_row,
    RawEvaluation::into_evaluation,
  )
}

pub fn record_grades(
  conn: &mut Connection,
  course_id: Uuid,
  evaluation_id: Uuid,
  grades: Vec<NewGrade>,
  deadline: Deadline,
) -> Result<Vec<Grade>> {
  let tx = conn.transaction()?;
  require_course(&tx, course_id)?;
  match fetch_evaluation(&tx, evaluation_id)? {
    Some(evaluation) if evaluation.course_id == course_id => {}
    _ => return Err(Rejection::EvaluationNotFound(evaluation_id).into()),
  }

  let mut recorded = Vec::with_capacity(grades.len());
  for grade in grades {
    if !is_enrolled(&tx, course_id, grade.student_id)? {
      return Err(Rejection::NotEnrolled { student_id: grade.student_id, course_id }.into());
    }
    tx.execute(
      "INSERT INTO grades (grade_id, student_id, evaluation_id, course_id, score, recorded_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
       ON CONFLICT (student_id, evaluation_id)
       DO UPDATE SET score = excluded.score, recorded_at = excluded.recorded_at",
      params![
        encode_uuid(Uuid::new_v4()),
        encode_uuid(grade.student_id),
        encode_uuid(evaluation_id),
        encode_uuid(course_id),
        grade.score,
        encode_dt(Utc::now()),
      ],
    )?;
    let stored = tx
      .query_row(
        &format!(
          "SELECT {} FROM grades WHERE student_id = ?1 AND evaluation_id = ?2",
          RawGrade::COLUMNS
        ),
        params![encode_uuid(grade.student_id), encode_uuid(evaluation_id)],
        RawGrade::from_row,
      )?
      .into_grade()?;
    recorded.push(stored);
  }

  deadline.check()?;
  tx.commit()?;
  Ok(recorded)
}

pub fn list_grades(conn: &mut Connection, course_id: Uuid, evaluation_id: Uuid) -> Result<Vec<Grade>> {
  require_course(conn, course_id)?;
  collect(
    conn,
    &format!(
      "SELECT {} FROM grades WHERE course_id = ?1 AND evaluation_id = ?2 ORDER BY rowid",
      RawGrade::COLUMNS
    ),
    params![encode_uuid(course_id), encode_uuid(evaluation_id)],
    RawGrade::from_row,
    RawGrade::into_grade,
  )
}

// ─── Term closing ────────────────────────────────────────────────────────────

/// Read everything the closing engine needs about one course.
fn load_snapshot(conn: &Connection, course: Course) -> Result<TermSnapshot> {
  let course_key = encode_uuid(course.course_id);
  let enrollments = enrollments_of(conn, course.course_id)?;
  let evaluations = evaluations_of(conn, course.course_id)?;

  let session_count: u32 = conn.query_row(
    "SELECT COUNT(*) FROM class_sessions WHERE course_id = ?1",
    params![course_key],
    |r| r.get(0),
  )?;

  let present_rows: Vec<(String, u32)> = {
    let mut stmt = conn.prepare(
      "SELECT a.student_id, COUNT(*) FROM attendance a
       JOIN class_sessions s ON s.session_id = a.session_id
       WHERE s.course_id = ?1 AND a.present = 1
       GROUP BY a.student_id",
    )?;
    stmt
      .query_map(params![course_key], |r| Ok((r.get(0)?, r.get(1)?)))?
      .collect::<rusqlite::Result<_>>()?
  };
  let mut present = HashMap::with_capacity(present_rows.len());
  for (student_id, count) in present_rows {
    present.insert(decode_uuid(&student_id)?, count);
  }

  let grade_rows: Vec<(String, String, f64)> = {
    let mut stmt =
      conn.prepare("SELECT student_id, evaluation_id, score FROM grades WHERE course_id = ?1")?;
    stmt
      .query_map(params![course_key], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
      .collect::<rusqlite::Result<_>>()?
  };
  let mut grades = HashMap::with_capacity(grade_rows.len());
  for (student_id, evaluation_id, score) in grade_rows {
    grades.insert((decode_uuid(&student_id)?, decode_uuid(&evaluation_id)?), score);
  }

  Ok(TermSnapshot {
    course,
    enrollments,
    session_count: session_count as usize,
    evaluations,
    present,
    grades,
  })
}

pub fn close_term(
  conn: &mut Connection,
  course_id: Uuid,
  deadline: Deadline,
) -> Result<Vec<TermResult>> {
  let tx = conn.transaction()?;
  let course = require_course(&tx, course_id)?;
  let already_closed = course.closed_at.is_some();
  let snapshot = load_snapshot(&tx, course)?;
  let computed = closing::compute_results(&snapshot)?;
  if already_closed {
    return Err(Rejection::TermAlreadyClosed(course_id).into());
  }

  let created_at = Utc::now();
  tx.execute(
    "UPDATE courses SET closed_at = ?1 WHERE course_id = ?2",
    params![encode_dt(created_at), encode_uuid(course_id)],
  )?;
  let mut results = Vec::with_capacity(computed.len());
  {
    let mut insert = tx.prepare(
      "INSERT INTO term_results (result_id, student_id, course_id, final_average,
                                 attendance_rate, passed, created_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for row in computed {
      let result = TermResult {
        result_id: Uuid::new_v4(),
        student_id: row.student_id,
        course_id: row.course_id,
        final_average: row.final_average,
        attendance_rate: row.attendance_rate,
        passed: row.passed,
        created_at,
      };
      insert.execute(params![
        encode_uuid(result.result_id),
        encode_uuid(result.student_id),
        encode_uuid(result.course_id),
        result.final_average,
        result.attendance_rate,
        result.passed,
        encode_dt(result.created_at),
      ])?;
      results.push(result);
    }
  }

  deadline.check()?;
  tx.commit()?;
  Ok(results)
}

pub fn list_term_results(conn: &mut Connection, course_id: Uuid) -> Result<Vec<TermResult>> {
  require_course(conn, course_id)?;
  collect(
    conn,
    &format!(
      "SELECT {} FROM term_results WHERE course_id = ?1 ORDER BY rowid",
      RawTermResult::COLUMNS
    ),
    params![encode_uuid(course_id)],
    RawTermResult::from_row,
    RawTermResult::into_result,
  )
}
