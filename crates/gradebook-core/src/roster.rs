//! Roster entities: professors, students, courses and the enrollments that
//! link students to courses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

// ─── Professor ───────────────────────────────────────────────────────────────

/// A professor account. Owns courses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Professor {
  pub professor_id:  Uuid,
  pub name:          String,
  pub email:         String,
  /// PHC string produced by the credential hasher; never sent to clients.
  #[serde(skip_serializing, default)]
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::RosterStore::add_professor`]. The password has
/// already been hashed by the caller.
#[derive(Debug, Clone, Validate)]
pub struct NewProfessor {
  #[validate(length(min = 1, max = 60))]
  pub name:          String,
  #[validate(email)]
  pub email:         String,
  pub password_hash: String,
}

// ─── Student ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
  pub student_id: Uuid,
  pub name:       String,
  pub email:      String,
  /// Inactive students stay enrolled but are not counted in
  /// [`Course::enrolled_count`].
  pub active:     bool,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::RosterStore::add_student`]. New students are
/// always active.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewStudent {
  #[validate(length(min = 1, max = 60))]
  pub name:  String,
  #[validate(email)]
  pub email: String,
}

// ─── Course ──────────────────────────────────────────────────────────────────

/// A course offering for one term, owned by one professor.
///
/// `realized_hours`, `enrolled_count`, `exam_count` and `assignment_count`
/// are maintained by the store alongside the rows they summarise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
  pub course_id:        Uuid,
  pub professor_id:     Uuid,
  pub name:             String,
  /// `YYYY-01` or `YYYY-02`.
  pub term:             String,
  pub planned_hours:    u32,
  pub realized_hours:   u32,
  pub enrolled_count:   u32,
  pub exam_count:       u32,
  pub assignment_count: u32,
  pub min_grade:        f64,
  /// Minimum attendance, as a percentage.
  pub min_attendance:   f64,
  pub created_at:       DateTime<Utc>,
  /// Set once the term is closed; a course closes at most once.
  pub closed_at:        Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCourse {
  #[validate(length(min = 1, max = 60))]
  pub name:           String,
  #[validate(custom(function = "validate_term_code"))]
  pub term:           String,
  #[validate(range(min = 60, max = 120))]
  pub planned_hours:  u32,
  #[validate(range(min = 5.0, max = 10.0))]
  pub min_grade:      f64,
  #[validate(range(min = 70.0, max = 100.0))]
  pub min_attendance: f64,
}

/// Accepts `YYYY-01` or `YYYY-02` for years from 2021 on.
fn validate_term_code(code: &str) -> Result<(), ValidationError> {
  let invalid = || {
    let mut err = ValidationError::new("term_code");
    err.message = Some("term must be formatted as YYYY-01 or YYYY-02".into());
    err
  };

  let (year, half) = code.split_once('-').ok_or_else(invalid)?;
  if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
    return Err(invalid());
  }
  if half != "01" && half != "02" {
    return Err(invalid());
  }
  match year.parse::<u32>() {
    Ok(y) if y >= 2021 => Ok(()),
    _ => Err(invalid()),
  }
}

// ─── Enrollment ──────────────────────────────────────────────────────────────

/// A student's registration in a course. At most one per (student, course).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
  pub enrollment_id: Uuid,
  pub student_id:    Uuid,
  pub course_id:     Uuid,
  pub created_at:    DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn course(term: &str) -> NewCourse {
    NewCourse {
      name:           "Compilers".into(),
      term:           term.into(),
      planned_hours:  60,
      min_grade:      6.0,
      min_attendance: 75.0,
    }
  }

  #[test]
  fn term_code_accepts_both_halves() {
    assert!(course("2024-01").validate().is_ok());
    assert!(course("2031-02").validate().is_ok());
  }

  #[test]
  fn term_code_rejects_malformed_or_early_years() {
    for bad in ["2024-03", "2020-01", "24-01", "2024/01", "2024-1", "abcd-01"] {
      assert!(course(bad).validate().is_err(), "{bad} should be rejected");
    }
  }

  #[test]
  fn course_thresholds_are_bounded() {
    let mut c = course("2024-01");
    c.min_grade = 4.9;
    assert!(c.validate().is_err());

    let mut c = course("2024-01");
    c.min_attendance = 69.0;
    assert!(c.validate().is_err());

    let mut c = course("2024-01");
    c.planned_hours = 121;
    assert!(c.validate().is_err());
  }

  #[test]
  fn student_requires_email_and_name() {
    let ok = NewStudent { name: "Ana".into(), email: "ana@uni.br".into() };
    assert!(ok.validate().is_ok());

    let bad = NewStudent { name: String::new(), email: "not-an-email".into() };
    let errors = bad.validate().unwrap_err();
    let fields = errors.field_errors();
    assert!(fields.contains_key("name"));
    assert!(fields.contains_key("email"));
  }

  #[test]
  fn professor_hash_is_not_serialised() {
    let p = Professor {
      professor_id:  Uuid::new_v4(),
      name:          "Prof".into(),
      email:         "prof@uni.br".into(),
      password_hash: "$argon2id$secret".into(),
      created_at:    Utc::now(),
    };
    let json = serde_json::to_string(&p).unwrap();
    assert!(!json.contains("argon2"));
  }
}
