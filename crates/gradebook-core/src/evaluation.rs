//! Evaluations (exams and assignments) and the grades students receive.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationKind {
  Exam,
  Assignment,
}

/// A graded item within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
  pub evaluation_id: Uuid,
  pub course_id:     Uuid,
  pub name:          String,
  pub kind:          EvaluationKind,
  pub date:          NaiveDate,
  /// Relative weight in `[0, 1]`.
  pub weight:        f64,
  pub created_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewEvaluation {
  #[validate(length(min = 1, max = 60))]
  pub name:   String,
  pub kind:   EvaluationKind,
  pub date:   NaiveDate,
  #[validate(range(min = 0.0, max = 1.0))]
  pub weight: f64,
}

/// A student's score on one evaluation. At most one per (student, evaluation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
  pub grade_id:      Uuid,
  pub student_id:    Uuid,
  pub evaluation_id: Uuid,
  pub course_id:     Uuid,
  pub score:         f64,
  pub recorded_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewGrade {
  pub student_id: Uuid,
  #[validate(range(min = 0.0, max = 10.0))]
  pub score:      f64,
}
