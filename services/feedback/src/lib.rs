//! Feedback service
//!
//! Account registration, session login/logout and per-user feedback records
//! with ownership-based authorization, served over axum.

pub mod authz;
pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod password;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod state;
pub mod validation;

pub use state::AppState;
