//! SQL schema for the gradebook SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision; future migrations will be gated on that number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS professors (
    professor_id  TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,   -- argon2 PHC string
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS students (
    student_id TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    email      TEXT NOT NULL UNIQUE,
    active     INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

-- realized_hours, enrolled_count, exam_count and assignment_count summarise
-- child rows and are only ever changed in the transaction that changes them.
CREATE TABLE IF NOT EXISTS courses (
    course_id        TEXT PRIMARY KEY,
    professor_id     TEXT NOT NULL REFERENCES professors(professor_id),
    name             TEXT NOT NULL,
    term             TEXT NOT NULL,   -- 'YYYY-01' | 'YYYY-02'
    planned_hours    INTEGER NOT NULL,
    realized_hours   INTEGER NOT NULL DEFAULT 0,
    enrolled_count   INTEGER NOT NULL DEFAULT 0,
    exam_count       INTEGER NOT NULL DEFAULT 0,
    assignment_count INTEGER NOT NULL DEFAULT 0,
    min_grade        REAL NOT NULL,
    min_attendance   REAL NOT NULL,
    created_at       TEXT NOT NULL,
    closed_at        TEXT,
    CHECK (min_grade BETWEEN 5 AND 10),
    CHECK (min_attendance BETWEEN 70 AND 100),
    CHECK (enrolled_count >= 0)
);

CREATE TABLE IF NOT EXISTS enrollments (
    enrollment_id TEXT PRIMARY KEY,
    student_id    TEXT NOT NULL REFERENCES students(student_id),
    course_id     TEXT NOT NULL REFERENCES courses(course_id),
    created_at    TEXT NOT NULL,
    UNIQUE (student_id, course_id)
);

CREATE TABLE IF NOT EXISTS class_sessions (
    session_id   TEXT PRIMARY KEY,
    course_id    TEXT NOT NULL REFERENCES courses(course_id),
    number       INTEGER NOT NULL,
    session_date TEXT NOT NULL,   -- YYYY-MM-DD
    hours        INTEGER NOT NULL,
    content      TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    UNIQUE (course_id, number)
);

CREATE TABLE IF NOT EXISTS attendance (
    attendance_id TEXT PRIMARY KEY,
    session_id    TEXT NOT NULL REFERENCES class_sessions(session_id),
    student_id    TEXT NOT NULL REFERENCES students(student_id),
    present       INTEGER NOT NULL,
    UNIQUE (session_id, student_id)
);

CREATE TABLE IF NOT EXISTS evaluations (
    evaluation_id TEXT PRIMARY KEY,
    course_id     TEXT NOT NULL REFERENCES courses(course_id),
    name          TEXT NOT NULL,
    kind          TEXT NOT NULL,   -- 'exam' | 'assignment'
    eval_date     TEXT NOT NULL,   -- YYYY-MM-DD
    weight        REAL NOT NULL,
    created_at    TEXT NOT NULL,
    CHECK (kind IN ('exam', 'assignment')),
    CHECK (weight BETWEEN 0 AND 1)
);

CREATE TABLE IF NOT EXISTS grades (
    grade_id      TEXT PRIMARY KEY,
    student_id    TEXT NOT NULL REFERENCES students(student_id),
    evaluation_id TEXT NOT NULL REFERENCES evaluations(evaluation_id),
    course_id     TEXT NOT NULL REFERENCES courses(course_id),
    score         REAL NOT NULL,
    recorded_at   TEXT NOT NULL,
    UNIQUE (student_id, evaluation_id),
    CHECK (score BETWEEN 0 AND 10)
);

-- Term results are append-only. One row per (student, course) ever.
CREATE TABLE IF NOT EXISTS term_results (
    result_id       TEXT PRIMARY KEY,
    student_id      TEXT NOT NULL REFERENCES students(student_id),
    course_id       TEXT NOT NULL REFERENCES courses(course_id),
    final_average   REAL NOT NULL,
    attendance_rate REAL NOT NULL,
    passed          INTEGER NOT NULL,
    created_at      TEXT NOT NULL,
    UNIQUE (student_id, course_id)
);

CREATE INDEX IF NOT EXISTS courses_professor_idx   ON courses(professor_id);
CREATE INDEX IF NOT EXISTS enrollments_course_idx  ON enrollments(course_id);
CREATE INDEX IF NOT EXISTS sessions_course_idx     ON class_sessions(course_id);
CREATE INDEX IF NOT EXISTS attendance_student_idx  ON attendance(student_id);
CREATE INDEX IF NOT EXISTS evaluations_course_idx  ON evaluations(course_id);
CREATE INDEX IF NOT EXISTS grades_course_idx       ON grades(course_id);
CREATE INDEX IF NOT EXISTS term_results_course_idx ON term_results(course_id);

PRAGMA user_version = 1;
";
