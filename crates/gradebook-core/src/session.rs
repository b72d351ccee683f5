//! Class sessions and the attendance recorded for them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::roster::Student;

/// One scheduled meeting of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSession {
  pub session_id: Uuid,
  pub course_id:  Uuid,
  /// Sequence number, unique within the course.
  pub number:     u32,
  pub date:       NaiveDate,
  pub hours:      u32,
  pub content:    String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::RosterStore::create_session`].
///
/// `present` lists the students who attended; every other enrolled student
/// is recorded as absent.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewSession {
  #[validate(range(min = 1))]
  pub number:  u32,
  pub date:    NaiveDate,
  #[validate(range(min = 1, max = 24))]
  pub hours:   u32,
  #[validate(length(min = 1, max = 1000))]
  pub content: String,
  #[serde(default)]
  pub present: Vec<Uuid>,
}

/// An attendance row joined with its student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEntry {
  pub attendance_id: Uuid,
  pub present:       bool,
  pub student:       Student,
}

/// A session together with its attendance sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
  #[serde(flatten)]
  pub session:    ClassSession,
  pub attendance: Vec<AttendanceEntry>,
}

impl SessionDetail {
  pub fn present_count(&self) -> usize {
    self.attendance.iter().filter(|a| a.present).count()
  }
}
