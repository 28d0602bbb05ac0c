// State management module
// Handles application state and the session blob store

pub mod app_state;
pub mod blobs;

pub use app_state::{AppState, SharedState};
pub use blobs::BlobStore;
