//! Core types and trait definitions for the gradebook backend.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod closing;
pub mod error;
pub mod evaluation;
pub mod roster;
pub mod service;
pub mod session;
pub mod store;

pub use error::{Error, ErrorKind, Result};
pub use service::Gradebook;
