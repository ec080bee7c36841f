//! Library crate for party-trivia-back, exposing modules for binaries and integration tests.

mod config;
mod dto;
mod error;
/// HTTP routes.
pub mod routes;
/// Application services.
pub mod services;
/// Session state and game rules.
pub mod state;
