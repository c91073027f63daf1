//! # WebShield Server
//!
//! JSON HTTP surface over [`webshield_core::scan::JobController`]: start a
//! scan, poll its output, stop it and download a report.

pub mod errors;
pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
