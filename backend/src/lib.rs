//! GenAI Studio Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod provider;
/// Application state management
///
/// Handles configuration, open conversations, and session blobs.
pub mod state;
