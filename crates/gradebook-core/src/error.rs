//! Error types for `gradebook-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  // ── Absent entities ───────────────────────────────────────────────────────
  #[error("professor not found: {0}")]
  ProfessorNotFound(Uuid),

  #[error("professor not found for email {0:?}")]
  ProfessorEmailNotFound(String),

  #[error("student not found: {0}")]
  StudentNotFound(Uuid),

  #[error("course not found: {0}")]
  CourseNotFound(Uuid),

  #[error("class session not found: {0}")]
  SessionNotFound(Uuid),

  #[error("evaluation not found: {0}")]
  EvaluationNotFound(Uuid),

  #[error("student {student_id} is not enrolled in course {course_id}")]
  NotEnrolled { student_id: Uuid, course_id: Uuid },

  // ── Conflicts ─────────────────────────────────────────────────────────────
  #[error("email already registered: {0}")]
  DuplicateEmail(String),

  #[error("student {student_id} is already enrolled in course {course_id}")]
  AlreadyEnrolled { student_id: Uuid, course_id: Uuid },

  #[error("course {course_id} already has a class session numbered {number}")]
  DuplicateSessionNumber { course_id: Uuid, number: u32 },

  #[error("student {0} is already active")]
  AlreadyActive(Uuid),

  #[error("student {0} is already inactive")]
  AlreadyInactive(Uuid),

  #[error("course {0} has zero total evaluation weight")]
  ZeroEvaluationWeight(Uuid),

  #[error("term for course {0} is already closed")]
  TermAlreadyClosed(Uuid),

  #[error("course {0} cannot record any more class hours")]
  RealizedHoursOverflow(Uuid),

  // ── Term-closing preconditions ────────────────────────────────────────────
  #[error("insufficient realized hours: {realized} of {planned} planned")]
  InsufficientHours { realized: u32, planned: u32 },

  #[error("course {0} has no class sessions registered")]
  NoSessions(Uuid),

  #[error("course {0} has no evaluations registered")]
  NoEvaluations(Uuid),

  // ── Request-level ─────────────────────────────────────────────────────────
  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("validation failed: {0}")]
  Validation(#[from] validator::ValidationErrors),

  #[error("deadline exceeded")]
  DeadlineExceeded,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of an [`Error`], independent of any transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  Conflict,
  PreconditionFailed,
  Unauthorized,
  Invalid,
  Timeout,
  Internal,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::ProfessorNotFound(_)
      | Self::ProfessorEmailNotFound(_)
      | Self::StudentNotFound(_)
      | Self::CourseNotFound(_)
      | Self::SessionNotFound(_)
      | Self::EvaluationNotFound(_)
      | Self::NotEnrolled { .. } => ErrorKind::NotFound,

      Self::DuplicateEmail(_)
      | Self::AlreadyEnrolled { .. }
      | Self::DuplicateSessionNumber { .. }
      | Self::AlreadyActive(_)
      | Self::AlreadyInactive(_)
      | Self::ZeroEvaluationWeight(_)
      | Self::TermAlreadyClosed(_)
      | Self::RealizedHoursOverflow(_) => ErrorKind::Conflict,

      Self::InsufficientHours { .. }
      | Self::NoSessions(_)
      | Self::NoEvaluations(_) => ErrorKind::PreconditionFailed,

      Self::InvalidCredentials => ErrorKind::Unauthorized,
      Self::Validation(_) => ErrorKind::Invalid,
      Self::DeadlineExceeded => ErrorKind::Timeout,
      Self::Store(_) => ErrorKind::Internal,
    }
  }

  /// HTTP-style status code for this error.
  pub fn status_code(&self) -> u16 {
    match self.kind() {
      ErrorKind::NotFound => 404,
      ErrorKind::Conflict => 409,
      ErrorKind::PreconditionFailed => 412,
      ErrorKind::Unauthorized => 401,
      ErrorKind::Invalid => 400,
      ErrorKind::Timeout => 503,
      ErrorKind::Internal => 500,
    }
  }

  /// Whether the message may be shown to the caller verbatim.
  pub fn is_internal(&self) -> bool {
    matches!(self.kind(), ErrorKind::Internal | ErrorKind::Timeout)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn taxonomy_maps_to_status_codes() {
    let id = Uuid::new_v4();
    assert_eq!(Error::CourseNotFound(id).status_code(), 404);
    assert_eq!(Error::AlreadyInactive(id).status_code(), 409);
    assert_eq!(Error::ZeroEvaluationWeight(id).status_code(), 409);
    assert_eq!(Error::NoSessions(id).status_code(), 412);
    assert_eq!(
      Error::InsufficientHours { realized: 10, planned: 60 }.status_code(),
      412
    );
    assert_eq!(Error::InvalidCredentials.status_code(), 401);
    assert_eq!(Error::DeadlineExceeded.status_code(), 503);
  }

  #[test]
  fn store_errors_keep_their_source() {
    let io = std::io::Error::other("disk on fire");
    let err = Error::Store(Box::new(io));
    assert!(err.is_internal());
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(source.to_string(), "disk on fire");
  }
}
