//! Term closing: the aggregation that turns a course's roster, attendance
//! sheets and grades into one pass/fail verdict per enrolled student.
//!
//! The computation is pure: a store gathers a [`TermSnapshot`] inside a
//! transaction, hands it to [`compute_results`], and persists the returned
//! rows in the same transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  evaluation::Evaluation,
  roster::{Course, Enrollment},
};

// ─── Results ─────────────────────────────────────────────────────────────────

/// A student's final standing in a course. Append-only; never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermResult {
  pub result_id:       Uuid,
  pub student_id:      Uuid,
  pub course_id:       Uuid,
  pub final_average:   f64,
  /// Percentage of the course's sessions the student attended.
  pub attendance_rate: f64,
  pub passed:          bool,
  pub created_at:      DateTime<Utc>,
}

/// A computed result that has not been persisted yet; the store assigns the
/// id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTermResult {
  pub student_id:      Uuid,
  pub course_id:       Uuid,
  pub final_average:   f64,
  pub attendance_rate: f64,
  pub passed:          bool,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Everything term closing reads about one course, captured at one instant.
#[derive(Debug, Clone)]
pub struct TermSnapshot {
  pub course:        Course,
  /// In insertion order; results are emitted in the same order.
  pub enrollments:   Vec<Enrollment>,
  pub session_count: usize,
  pub evaluations:   Vec<Evaluation>,
  /// Number of `present = true` attendance rows per student, counting only
  /// this course's sessions.
  pub present:       HashMap<Uuid, u32>,
  /// Recorded scores keyed by `(student_id, evaluation_id)`.
  pub grades:        HashMap<(Uuid, Uuid), f64>,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Check the closing preconditions in order, then compute one result per
/// enrollment.
///
/// Fails with [`Error::InsufficientHours`], [`Error::NoSessions`],
/// [`Error::NoEvaluations`] or [`Error::ZeroEvaluationWeight`]; any failure
/// aborts the whole course.
pub fn compute_results(snapshot: &TermSnapshot) -> Result<Vec<NewTermResult>> {
  let course = &snapshot.course;

  if course.realized_hours < course.planned_hours {
    return Err(Error::InsufficientHours {
      realized: course.realized_hours,
      planned:  course.planned_hours,
    });
  }
  if snapshot.session_count == 0 {
    return Err(Error::NoSessions(course.course_id));
  }
  if snapshot.evaluations.is_empty() {
    return Err(Error::NoEvaluations(course.course_id));
  }

  let total_weight: f64 = snapshot.evaluations.iter().map(|e| e.weight).sum();
  if total_weight == 0.0 {
    return Err(Error::ZeroEvaluationWeight(course.course_id));
  }

  let results = snapshot
    .enrollments
    .iter()
    .map(|enrollment| {
      let student_id = enrollment.student_id;
      let present = snapshot.present.get(&student_id).copied().unwrap_or(0);
      let attendance_rate = attendance_rate(present, snapshot.session_count);
      let final_average = weighted_average(&snapshot.evaluations, total_weight, |eval_id| {
        snapshot.grades.get(&(student_id, eval_id)).copied()
      });

      NewTermResult {
        student_id,
        course_id: course.course_id,
        final_average,
        attendance_rate,
        passed: passes(course, final_average, attendance_rate),
      }
    })
    .collect();

  Ok(results)
}

/// Decimal places kept in stored averages and attendance rates.
pub const PRECISION: i32 = 2;

/// Round to [`PRECISION`] decimal places, so that a value meant to sit on a
/// threshold compares as equal to it.
pub fn round_to_precision(value: f64) -> f64 {
  let scale = 10f64.powi(PRECISION);
  (value * scale).round() / scale
}

/// `present × 100 / sessions`, rounded. Callers guarantee `sessions > 0`.
pub fn attendance_rate(present: u32, sessions: usize) -> f64 {
  round_to_precision(f64::from(present) * 100.0 / sessions as f64)
}

/// Weighted mean over every evaluation, rounded; a missing score counts as
/// zero and its weight stays in the denominator.
pub fn weighted_average<F>(evaluations: &[Evaluation], total_weight: f64, score_of: F) -> f64
where
  F: Fn(Uuid) -> Option<f64>,
{
  let weighted: f64 = evaluations
    .iter()
    .map(|e| score_of(e.evaluation_id).unwrap_or(0.0) * e.weight)
    .sum();
  round_to_precision(weighted / total_weight)
}

/// Both thresholds are inclusive. Expects rounded inputs.
pub fn passes(course: &Course, final_average: f64, attendance_rate: f64) -> bool {
  final_average >= course.min_grade && attendance_rate >= course.min_attendance
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::evaluation::EvaluationKind;

  fn course() -> Course {
    Course {
      course_id:        Uuid::new_v4(),
      professor_id:     Uuid::new_v4(),
      name:             "Databases".into(),
      term:             "2024-01".into(),
      planned_hours:    60,
      realized_hours:   60,
      enrolled_count:   0,
      exam_count:       0,
      assignment_count: 0,
      min_grade:        6.0,
      min_attendance:   70.0,
      created_at:       Utc::now(),
      closed_at:        None,
    }
  }

  fn evaluation(course_id: Uuid, weight: f64) -> Evaluation {
    Evaluation {
      evaluation_id: Uuid::new_v4(),
      course_id,
      name: "P1".into(),
      kind: EvaluationKind::Exam,
      date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
      weight,
      created_at: Utc::now(),
    }
  }

  fn enrollment(course_id: Uuid) -> Enrollment {
    Enrollment {
      enrollment_id: Uuid::new_v4(),
      student_id: Uuid::new_v4(),
      course_id,
      created_at: Utc::now(),
    }
  }

  fn snapshot(course: Course) -> TermSnapshot {
    TermSnapshot {
      course,
      enrollments: Vec::new(),
      session_count: 4,
      evaluations: Vec::new(),
      present: HashMap::new(),
      grades: HashMap::new(),
    }
  }

  fn approx(a: f64, b: f64) -> bool { (a - b).abs() < 1e-9 }

  #[test]
  fn worked_example_passes_with_six_point_eight() {
    let c = course();
    let cid = c.course_id;
    let mut snap = snapshot(c);
    let p1 = evaluation(cid, 0.4);
    let p2 = evaluation(cid, 0.6);
    let e = enrollment(cid);
    snap.grades.insert((e.student_id, p1.evaluation_id), 8.0);
    snap.grades.insert((e.student_id, p2.evaluation_id), 6.0);
    snap.present.insert(e.student_id, 3);
    snap.evaluations = vec![p1, p2];
    snap.enrollments = vec![e.clone()];

    let results = compute_results(&snap).unwrap();
    assert_eq!(results.len(), 1);
    let r = &results[0];
    assert_eq!(r.student_id, e.student_id);
    assert!(approx(r.final_average, 6.8), "average = {}", r.final_average);
    assert!(approx(r.attendance_rate, 75.0));
    assert!(r.passed);
  }

  #[test]
  fn missing_grade_counts_as_zero_in_denominator() {
    let c = course();
    let cid = c.course_id;
    let mut snap = snapshot(c);
    let p1 = evaluation(cid, 0.5);
    let p2 = evaluation(cid, 0.5);
    let e = enrollment(cid);
    snap.grades.insert((e.student_id, p1.evaluation_id), 10.0);
    snap.present.insert(e.student_id, 4);
    snap.evaluations = vec![p1, p2];
    snap.enrollments = vec![e];

    let r = &compute_results(&snap).unwrap()[0];
    assert!(approx(r.final_average, 5.0));
    assert!(!r.passed);
  }

  #[test]
  fn thresholds_are_inclusive() {
    let c = course();
    assert!(passes(&c, 6.0, 70.0));
    assert!(!passes(&c, 5.999, 100.0));
    assert!(!passes(&c, 10.0, 69.99));
  }

  #[test]
  fn minimum_scores_pass_with_inexact_weights() {
    for weights in [vec![0.3, 0.7], vec![0.1, 0.2], vec![0.1, 0.1, 0.1]] {
      let c = course();
      let cid = c.course_id;
      let mut snap = snapshot(c);
      snap.session_count = 10;
      let e = enrollment(cid);
      snap.evaluations = weights.iter().map(|w| evaluation(cid, *w)).collect();
      for eval in &snap.evaluations {
        snap.grades.insert((e.student_id, eval.evaluation_id), 6.0);
      }
      snap.present.insert(e.student_id, 7);
      snap.enrollments = vec![e];

      let r = &compute_results(&snap).unwrap()[0];
      assert_eq!(r.final_average, 6.0, "weights {weights:?}");
      assert_eq!(r.attendance_rate, 70.0);
      assert!(r.passed, "weights {weights:?}");
    }
  }

  #[test]
  fn rates_are_rounded_to_two_places() {
    assert_eq!(attendance_rate(1, 3), 33.33);
    assert_eq!(attendance_rate(2, 3), 66.67);
    assert_eq!(round_to_precision(5.999999999999999), 6.0);
    assert_eq!(round_to_precision(6.804), 6.8);
  }

  #[test]
  fn no_attendance_rows_yields_zero_rate() {
    let c = course();
    let cid = c.course_id;
    let mut snap = snapshot(c);
    let p1 = evaluation(cid, 1.0);
    let e = enrollment(cid);
    snap.grades.insert((e.student_id, p1.evaluation_id), 9.0);
    snap.evaluations = vec![p1];
    snap.enrollments = vec![e];

    let r = &compute_results(&snap).unwrap()[0];
    assert_eq!(r.attendance_rate, 0.0);
    assert!(!r.passed);
  }

  #[test]
  fn results_follow_enrollment_order() {
    let c = course();
    let cid = c.course_id;
    let mut snap = snapshot(c);
    snap.evaluations = vec![evaluation(cid, 1.0)];
    snap.enrollments = (0..5).map(|_| enrollment(cid)).collect();

    let results = compute_results(&snap).unwrap();
    let got: Vec<_> = results.iter().map(|r| r.student_id).collect();
    let want: Vec<_> = snap.enrollments.iter().map(|e| e.student_id).collect();
    assert_eq!(got, want);
  }

  #[test]
  fn preconditions_are_checked_in_order() {
    // Everything wrong at once: hours win.
    let mut c = course();
    c.realized_hours = 59;
    let mut snap = snapshot(c);
    snap.session_count = 0;
    assert!(matches!(
      compute_results(&snap),
      Err(Error::InsufficientHours { realized: 59, planned: 60 })
    ));

    // Hours fixed: sessions next.
    snap.course.realized_hours = 64;
    assert!(matches!(compute_results(&snap), Err(Error::NoSessions(_))));

    // Sessions fixed: evaluations next.
    snap.session_count = 2;
    assert!(matches!(compute_results(&snap), Err(Error::NoEvaluations(_))));
  }

  #[test]
  fn zero_total_weight_aborts_the_course() {
    let c = course();
    let cid = c.course_id;
    let mut snap = snapshot(c);
    snap.evaluations = vec![evaluation(cid, 0.0), evaluation(cid, 0.0)];
    snap.enrollments = vec![enrollment(cid)];
    assert!(matches!(
      compute_results(&snap),
      Err(Error::ZeroEvaluationWeight(id)) if id == cid
    ));
  }

  #[test]
  fn empty_roster_closes_with_no_results() {
    let c = course();
    let cid = c.course_id;
    let mut snap = snapshot(c);
    snap.evaluations = vec![evaluation(cid, 1.0)];
    assert!(compute_results(&snap).unwrap().is_empty());
  }
}
