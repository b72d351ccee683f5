//! JSON REST API for the gradebook.
//!
//! Exposes an axum [`Router`] backed by any
//! [`gradebook_core::store::RosterStore`]. Every route except professor
//! registration and login requires a bearer token issued by
//! `POST /professors/login`.

pub mod auth;
pub mod courses;
pub mod error;
pub mod evaluations;
pub mod professors;
pub mod sessions;
pub mod students;

use std::{any::Any, future::Future, path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  response::{IntoResponse, Response},
  routing::{get, post},
};
use gradebook_core::{
  Gradebook,
  store::{Deadline, RosterStore},
};
use serde::Deserialize;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

pub use auth::{AuthProfessor, TokenIssuer};
pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  /// HMAC secret for signing bearer tokens.
  pub jwt_secret:           String,
  #[serde(default = "default_token_ttl_hours")]
  pub token_ttl_hours:      u64,
  /// Deadline applied to each service call.
  #[serde(default = "default_request_timeout_secs")]
  pub request_timeout_secs: u64,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 3333 }
fn default_store_path() -> PathBuf { PathBuf::from("gradebook.sqlite3") }
fn default_token_ttl_hours() -> u64 { 24 }
fn default_request_timeout_secs() -> u64 { 10 }

// ─── Application state ───────────────────────────────────────────────────────

/// Extra time a call may run past its store deadline, so that a write which
/// committed just before the deadline still reports its result.
const COMMIT_GRACE: Duration = Duration::from_millis(250);

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  gradebook:  Gradebook<S>,
  pub tokens: Arc<TokenIssuer>,
  pub config: Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      gradebook: self.gradebook.clone(),
      tokens:    Arc::clone(&self.tokens),
      config:    Arc::clone(&self.config),
    }
  }
}

impl<S: RosterStore> AppState<S> {
  pub fn new(store: Arc<S>, config: ServerConfig) -> Self {
    let tokens = TokenIssuer::new(&config.jwt_secret, config.token_ttl_hours);
    Self {
      gradebook: Gradebook::new(store),
      tokens:    Arc::new(tokens),
      config:    Arc::new(config),
    }
  }

  fn request_timeout(&self) -> Duration { Duration::from_secs(self.config.request_timeout_secs) }

  /// The gradebook for one request. Its writes roll back instead of
  /// committing once the request timeout has elapsed.
  pub fn book(&self) -> Gradebook<S> {
    self.gradebook.with_deadline(Deadline::after(self.request_timeout()))
  }

  /// Await a service call, failing with `DeadlineExceeded` once the request
  /// timeout (plus a short commit grace) elapses.
  ///
  /// Pair it with [`AppState::book`] so the store sees the same deadline:
  /// the call is abandoned here only after the store has stopped committing.
  pub async fn within<T, F>(&self, call: F) -> Result<T, ApiError>
  where
    F: Future<Output = gradebook_core::Result<T>>,
  {
    let limit = self.request_timeout() + COMMIT_GRACE;
    match tokio::time::timeout(limit, call).await {
      Ok(result) => Ok(result?),
      Err(_) => {
        tracing::warn!(timeout_ms = limit.as_millis() as u64, "request deadline exceeded");
        Err(gradebook_core::Error::DeadlineExceeded.into())
      }
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: RosterStore + 'static,
{
  Router::new()
    // Professors
    .route("/professors", post(professors::register::<S>))
    .route("/professors/login", post(professors::login::<S>))
    .route("/professors/{id}", axum::routing::delete(professors::remove::<S>))
    // Students
    .route("/students", post(students::create::<S>))
    .route("/students/{id}", get(students::get_one::<S>).delete(students::remove::<S>))
    .route("/students/{id}/activate", post(students::activate::<S>))
    .route("/students/{id}/deactivate", post(students::deactivate::<S>))
    // Courses & enrollments
    .route("/courses", get(courses::list::<S>).post(courses::create::<S>))
    .route("/courses/{id}", get(courses::get_one::<S>))
    .route(
      "/courses/{id}/enrollments",
      get(courses::list_enrollments::<S>).post(courses::enroll::<S>),
    )
    .route(
      "/courses/{id}/enrollments/{student_id}",
      axum::routing::delete(courses::unenroll::<S>),
    )
    .route("/courses/{id}/close", post(courses::close::<S>))
    .route("/courses/{id}/results", get(courses::results::<S>))
    // Sessions
    .route(
      "/courses/{id}/sessions",
      get(sessions::list::<S>).post(sessions::create::<S>),
    )
    .route("/sessions/{id}", get(sessions::get_one::<S>))
    // Evaluations & grades
    .route(
      "/courses/{id}/evaluations",
      get(evaluations::list::<S>).post(evaluations::create::<S>),
    )
    .route(
      "/courses/{id}/evaluations/{evaluation_id}/grades",
      get(evaluations::list_grades::<S>).post(evaluations::record_grades::<S>),
    )
    .layer(TraceLayer::new_for_http())
    .layer(CatchPanicLayer::custom(panic_response))
    .with_state(state)
}

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
  tracing::error!("request handler panicked");
  ApiError::Internal("handler panicked".into()).into_response()
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
  };
  use gradebook_core::roster::NewStudent;
  use gradebook_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  async fn app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    router(AppState::new(Arc::new(store), test_config()))
  }

  fn test_config() -> ServerConfig {
    ServerConfig {
      host:                 default_host(),
      port:                 default_port(),
      store_path:           PathBuf::from(":memory:"),
      jwt_secret:           "test-secret".into(),
      token_ttl_hours:      1,
      request_timeout_secs: 5,
    }
  }

  async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
      Some(body) => req
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
  }

  /// Register a professor and return a bearer token for them.
  async fn login(app: &Router, email: &str) -> (String, String) {
    let (status, _) = call(
      app,
      Method::POST,
      "/professors",
      None,
      Some(json!({
        "name": "Prof. Lima",
        "email": email,
        "password": "Str0ng!pass",
        "confirm_password": "Str0ng!pass",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
      app,
      Method::POST,
      "/professors/login",
      None,
      Some(json!({ "email": email, "password": "Str0ng!pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_owned();
    let id = body["professor"]["professor_id"].as_str().unwrap().to_owned();
    (token, id)
  }

  fn course_body() -> Value {
    json!({
      "name": "Databases",
      "term": "2024-01",
      "planned_hours": 60,
      "min_grade": 6.0,
      "min_attendance": 70.0,
    })
  }

  #[tokio::test]
  async fn protected_routes_require_a_token() {
    let app = app().await;
    let (status, body) = call(&app, Method::GET, "/courses", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = call(&app, Method::GET, "/courses", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn login_flow_and_course_ownership() {
    let app = app().await;
    let (lima, _) = login(&app, "lima@uni.br").await;
    let (reis, _) = login(&app, "reis@uni.br").await;

    let (status, course) = call(&app, Method::POST, "/courses", Some(lima.as_str()), Some(course_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/courses/{}", course["course_id"].as_str().unwrap());

    let (status, _) = call(&app, Method::GET, &uri, Some(lima.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, Method::GET, &uri, Some(reis.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = call(&app, Method::GET, "/courses", Some(reis.as_str()), None).await;
    assert_eq!(listed, json!([]));
  }

  #[tokio::test]
  async fn wrong_password_is_unauthorized_and_unknown_email_not_found() {
    let app = app().await;
    login(&app, "lima@uni.br").await;

    let (status, _) = call(
      &app,
      Method::POST,
      "/professors/login",
      None,
      Some(json!({ "email": "lima@uni.br", "password": "Wr0ng!pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
      &app,
      Method::POST,
      "/professors/login",
      None,
      Some(json!({ "email": "ghost@uni.br", "password": "Str0ng!pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn weak_or_mismatched_passwords_are_rejected() {
    let app = app().await;
    for (password, confirm) in [("short1!", "short1!"), ("alllowercase1!", "alllowercase1!"), ("Str0ng!pass", "Str0ng!pasS")] {
      let (status, body) = call(
        &app,
        Method::POST,
        "/professors",
        None,
        Some(json!({
          "name": "Prof",
          "email": "p@uni.br",
          "password": password,
          "confirm_password": confirm,
        })),
      )
      .await;
      assert_eq!(status, StatusCode::BAD_REQUEST, "{password}/{confirm}");
      assert!(body["error"].is_string());
    }
  }

  #[tokio::test]
  async fn malformed_json_is_a_bad_request() {
    let app = app().await;
    let (token, _) = login(&app, "lima@uni.br").await;
    let (status, body) =
      call(&app, Method::POST, "/students", Some(token.as_str()), Some(json!({ "name": 3 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn closing_an_unfinished_course_is_precondition_failed() {
    let app = app().await;
    let (token, _) = login(&app, "lima@uni.br").await;
    let (_, course) = call(&app, Method::POST, "/courses", Some(token.as_str()), Some(course_body())).await;
    let id = course["course_id"].as_str().unwrap();

    let (status, body) =
      call(&app, Method::POST, &format!("/courses/{id}/close"), Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert!(body["error"].as_str().unwrap().contains("hours"));
  }

  #[tokio::test]
  async fn enrollment_and_status_conflicts_map_to_409() {
    let app = app().await;
    let (token, _) = login(&app, "lima@uni.br").await;
    let (_, course) = call(&app, Method::POST, "/courses", Some(token.as_str()), Some(course_body())).await;
    let course_id = course["course_id"].as_str().unwrap();
    let (status, student) = call(
      &app,
      Method::POST,
      "/students",
      Some(token.as_str()),
      Some(json!({ "name": "Ana", "email": "ana@uni.br" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let student_id = student["student_id"].as_str().unwrap();

    let enroll_uri = format!("/courses/{course_id}/enrollments");
    let body = json!({ "student_id": student_id });
    let (status, _) = call(&app, Method::POST, &enroll_uri, Some(token.as_str()), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = call(&app, Method::POST, &enroll_uri, Some(token.as_str()), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) =
      call(&app, Method::POST, &format!("/students/{student_id}/activate"), Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, course) =
      call(&app, Method::GET, &format!("/courses/{course_id}"), Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(course["enrolled_count"], 1);
  }

  #[tokio::test]
  async fn professors_may_only_remove_themselves() {
    let app = app().await;
    let (lima, lima_id) = login(&app, "lima@uni.br").await;
    let (reis, _) = login(&app, "reis@uni.br").await;

    let uri = format!("/professors/{lima_id}");
    let (status, _) = call(&app, Method::DELETE, &uri, Some(reis.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::DELETE, &uri, Some(lima.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The token is still well-formed but its account is gone.
    let (status, _) = call(&app, Method::GET, "/courses", Some(lima.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn slow_calls_hit_the_deadline() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let state = AppState::new(Arc::new(store), ServerConfig { request_timeout_secs: 0, ..test_config() });

    let err = state
      .within(async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
      })
      .await
      .unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
  }

  #[tokio::test]
  async fn writes_past_the_deadline_are_not_persisted() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let hurried =
      AppState::new(Arc::clone(&store), ServerConfig { request_timeout_secs: 0, ..test_config() });
    let patient = AppState::new(store, test_config());

    let input = NewStudent { name: "Ana".into(), email: "ana@uni.br".into() };
    let err = hurried.within(hurried.book().add_student(input.clone())).await.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

    // Nothing was committed, so the email is still free.
    patient.within(patient.book().add_student(input)).await.unwrap();
  }
}
