//! Shared configuration types for questbot.
//!
//! Everything here is plain data with serde support so the CLI can persist it
//! with `confy` and the engine can consume it without pulling in I/O.

pub mod config;
pub mod formatting;

pub use config::{EngineConfig, ScoringConfig};
