// ABOUTME: Library root for layerboot - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod journal;
pub mod layers;
pub mod lock;
pub mod output;
pub mod preflight;
pub mod profile;
pub mod secrets;
pub mod tools;
pub mod types;
pub mod validation;
