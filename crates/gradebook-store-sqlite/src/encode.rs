//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and calendar dates as
//! `YYYY-MM-DD`. UUIDs are stored as hyphenated lowercase strings. Integers,
//! reals and booleans use SQLite's native storage classes.

use chrono::{DateTime, NaiveDate, Utc};
use gradebook_core::{
  closing::TermResult,
  evaluation::{Evaluation, EvaluationKind, Grade},
  roster::{Course, Enrollment, Professor, Student},
  session::{AttendanceEntry, ClassSession},
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(date: NaiveDate) -> String { date.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── EvaluationKind ──────────────────────────────────────────────────────────

pub fn encode_kind(kind: EvaluationKind) -> &'static str {
  match kind {
    EvaluationKind::Exam => "exam",
    EvaluationKind::Assignment => "assignment",
  }
}

pub fn decode_kind(s: &str) -> Result<EvaluationKind> {
  match s {
    "exam" => Ok(EvaluationKind::Exam),
    "assignment" => Ok(EvaluationKind::Assignment),
    other => Err(Error::Decode(format!("unknown evaluation kind: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────
//
// Each `Raw*` struct is read inside a rusqlite row callback, which can only
// fail with `rusqlite::Error`; decoding into domain types happens afterwards.

pub struct RawProfessor {
  pub professor_id:  String,
  pub name:          String,
  pub email:         String,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawProfessor {
  pub const COLUMNS: &'static str = "professor_id, name, email, password_hash, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      professor_id:  row.get(0)?,
      name:          row.get(1)?,
      email:         row.get(2)?,
      password_hash: row.get(3)?,
      created_at:    row.get(4)?,
    })
  }

  pub fn into_professor(self) -> Result<Professor> {
    Ok(Professor {
      professor_id:  decode_uuid(&self.professor_id)?,
      name:          self.name,
      email:         self.email,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawStudent {
  pub student_id: String,
  pub name:       String,
  pub email:      String,
  pub active:     bool,
  pub created_at: String,
}

impl RawStudent {
  pub const COLUMNS: &'static str = "student_id, name, email, active, created_at";

  /// Read the five student columns starting at `offset`.
  pub fn from_row_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id: row.get(offset)?,
      name:       row.get(offset + 1)?,
      email:      row.get(offset + 2)?,
      active:     row.get(offset + 3)?,
      created_at: row.get(offset + 4)?,
    })
  }

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> { Self::from_row_at(row, 0) }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_id: decode_uuid(&self.student_id)?,
      name:       self.name,
      email:      self.email,
      active:     self.active,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawCourse {
  pub course_id:        String,
  pub professor_id:     String,
  pub name:             String,
  pub term:             String,
  pub planned_hours:    u32,
  pub realized_hours:   u32,
  pub enrolled_count:   u32,
  pub exam_count:       u32,
  pub assignment_count: u32,
  pub min_grade:        f64,
  pub min_attendance:   f64,
  pub created_at:       String,
  pub closed_at:        Option<String>,
}

impl RawCourse {
  pub const COLUMNS: &'static str = "course_id, professor_id, name, term, planned_hours, \
                                     realized_hours, enrolled_count, exam_count, \
                                     assignment_count, min_grade, min_attendance, created_at, \
                                     closed_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      course_id:        row.get(0)?,
      professor_id:     row.get(1)?,
      name:             row.get(2)?,
      term:             row.get(3)?,
      planned_hours:    row.get(4)?,
      realized_hours:   row.get(5)?,
      enrolled_count:   row.get(6)?,
      exam_count:       row.get(7)?,
      assignment_count: row.get(8)?,
      min_grade:        row.get(9)?,
      min_attendance:   row.get(10)?,
      created_at:       row.get(11)?,
      closed_at:        row.get(12)?,
    })
  }

  pub fn into_course(self) -> Result<Course> {
    Ok(Course {
      course_id:        decode_uuid(&self.course_id)?,
      professor_id:     decode_uuid(&self.professor_id)?,
      name:             self.name,
      term:             self.term,
      planned_hours:    self.planned_hours,
      realized_hours:   self.realized_hours,
      enrolled_count:   self.enrolled_count,
      exam_count:       self.exam_count,
      assignment_count: self.assignment_count,
      min_grade:        self.min_grade,
      min_attendance:   self.min_attendance,
      created_at:       decode_dt(&self.created_at)?,
      closed_at:        self.closed_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub struct RawEnrollment {
  pub enrollment_id: String,
  pub student_id:    String,
  pub course_id:     String,
  pub created_at:    String,
}

impl RawEnrollment {
  pub const COLUMNS: &'static str = "enrollment_id, student_id, course_id, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      enrollment_id: row.get(0)?,
      student_id:    row.get(1)?,
      course_id:     row.get(2)?,
      created_at:    row.get(3)?,
    })
  }

  pub fn into_enrollment(self) -> Result<Enrollment> {
    Ok(Enrollment {
      enrollment_id: decode_uuid(&self.enrollment_id)?,
      student_id:    decode_uuid(&self.student_id)?,
      course_id:     decode_uuid(&self.course_id)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawSession {
  pub session_id:   String,
  pub course_id:    String,
  pub number:       u32,
  pub session_date: String,
  pub hours:        u32,
  pub content:      String,
  pub created_at:   String,
}

impl RawSession {
  pub const COLUMNS: &'static str =
    "session_id, course_id, number, session_date, hours, content, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:   row.get(0)?,
      course_id:    row.get(1)?,
      number:       row.get(2)?,
      session_date: row.get(3)?,
      hours:        row.get(4)?,
      content:      row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_session(self) -> Result<ClassSession> {
    Ok(ClassSession {
      session_id: decode_uuid(&self.session_id)?,
      course_id:  decode_uuid(&self.course_id)?,
      number:     self.number,
      date:       decode_date(&self.session_date)?,
      hours:      self.hours,
      content:    self.content,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// An `attendance` row joined with its `students` row.
pub struct RawAttendanceEntry {
  pub attendance_id: String,
  pub present:       bool,
  pub student:       RawStudent,
}

impl RawAttendanceEntry {
  pub const COLUMNS: &'static str = "a.attendance_id, a.present, s.student_id, s.name, \
                                     s.email, s.active, s.created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      attendance_id: row.get(0)?,
      present:       row.get(1)?,
      student:       RawStudent::from_row_at(row, 2)?,
    })
  }

  pub fn into_entry(self) -> Result<AttendanceEntry> {
    Ok(AttendanceEntry {
      attendance_id: decode_uuid(&self.attendance_id)?,
      present:       self.present,
      student:       self.student.into_student()?,
    })
  }
}

pub struct RawEvaluation {
  pub evaluation_id: String,
  pub course_id:     String,
  pub name:          String,
  pub kind:          String,
  pub eval_date:     String,
  pub weight:        f64,
  pub created_at:    String,
}

impl RawEvaluation {
  pub const COLUMNS: &'static str =
    "evaluation_id, course_id, name, kind, eval_date, weight, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      evaluation_id: row.get(0)?,
      course_id:     row.get(1)?,
      name:          row.get(2)?,
      kind:          row.get(3)?,
      eval_date:     row.get(4)?,
      weight:        row.get(5)?,
      created_at:    row.get(6)?,
    })
  }

  pub fn into_evaluation(self) -> Result<Evaluation> {
    Ok(Evaluation {
      evaluation_id: decode_uuid(&self.evaluation_id)?,
      course_id:     decode_uuid(&self.course_id)?,
      name:          self.name,
      kind:          decode_kind(&self.kind)?,
      date:          decode_date(&self.eval_date)?,
      weight:        self.weight,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawGrade {
  pub grade_id:      String,
  pub student_id:    String,
  pub evaluation_id: String,
  pub course_id:     String,
  pub score:         f64,
  pub recorded_at:   String,
}

impl RawGrade {
  pub const COLUMNS: &'static str =
    "grade_id, student_id, evaluation_id, course_id, score, recorded_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      grade_id:      row.get(0)?,
      student_id:    row.get(1)?,
      evaluation_id: row.get(2)?,
      course_id:     row.get(3)?,
      score:         row.get(4)?,
      recorded_at:   row.get(5)?,
    })
  }

  pub fn into_grade(self) -> Result<Grade> {
    Ok(Grade {
      grade_id:      decode_uuid(&self.grade_id)?,
      student_id:    decode_uuid(&self.student_id)?,
      evaluation_id: decode_uuid(&self.evaluation_id)?,
      course_id:     decode_uuid(&self.course_id)?,
      score:         self.score,
      recorded_at:   decode_dt(&self.recorded_at)?,
    })
  }
}

pub struct RawTermResult {
  pub result_id:       String,
  pub student_id:      String,
  pub course_id:       String,
  pub final_average:   f64,
  pub attendance_rate: f64,
  pub passed:          bool,
  pub created_at:      String,
}

impl RawTermResult {
  pub const COLUMNS: &'static str = "result_id, student_id, course_id, final_average, \
                                     attendance_rate, passed, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      result_id:       row.get(0)?,
      student_id:      row.get(1)?,
      course_id:       row.get(2)?,
      final_average:   row.get(3)?,
      attendance_rate: row.get(4)?,
      passed:          row.get(5)?,
      created_at:      row.get(6)?,
    })
  }

  pub fn into_result(self) -> Result<TermResult> {
    Ok(TermResult {
      result_id:       decode_uuid(&self.result_id)?,
      student_id:      decode_uuid(&self.student_id)?,
      course_id:       decode_uuid(&self.course_id)?,
      final_average:   self.final_average,
      attendance_rate: self.attendance_rate,
      passed:          self.passed,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dates_use_iso_calendar_format() {
    let d = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
    assert_eq!(encode_date(d), "2024-03-07");
    assert_eq!(decode_date("2024-03-07").unwrap(), d);
    assert!(decode_date("07/03/2024").is_err());
  }

  #[test]
  fn unknown_kind_is_a_decode_error() {
    assert_eq!(decode_kind(encode_kind(EvaluationKind::Assignment)).unwrap(), EvaluationKind::Assignment);
    assert!(matches!(decode_kind("quiz"), Err(Error::Decode(_))));
  }
}
