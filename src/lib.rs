//! # Courier
//!
//! A terminal HTTP request composer.
//!
//! ## Features
//! - HTTP methods: GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS
//! - JSON, form-data, url-encoded and raw bodies
//! - `{{variable}}` substitution from a persisted environment
//! - Collections of saved requests with export/import
//! - Request history of the last 50 sends
//! - Content-type aware response display
//!
//! ## Architecture
//! Actor-based with channels:
//! - UI Layer (Ratatui) - synchronous
//! - App Layer (state machine over a [`session::Session`])
//! - Network Layer (Tokio runtime, reqwest)

pub mod app;
pub mod builder;
pub mod classify;
pub mod config;
pub mod constants;
pub mod history;
pub mod messages;
pub mod models;
pub mod network;
pub mod session;
pub mod storage;
pub mod template;
pub mod ui;

// Re-export commonly used types
pub use app::{AppActor, AppState};
pub use builder::{build, BuildError};
pub use classify::classify;
pub use config::Config;
pub use messages::{NetworkCommand, NetworkResponse, RenderState, UiEvent};
pub use models::{
    BodyEncoding, Collection, DecodedBody, Environment, ExecutionResult, HttpMethod,
    RequestDescriptor, RequestDraft,
};
pub use network::{NetworkActor, Transport};
pub use session::Session;
pub use storage::{FileStore, Store, StoreError};
pub use template::resolve;
