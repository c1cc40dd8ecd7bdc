//! App layer - central state management and command processing
//!
//! The App actor receives UI events and network responses, updates state
//! through the session, and emits network commands and render state.

pub mod actor;
pub mod commands;
pub mod debounce;
pub mod state;

pub use actor::AppActor;
pub use debounce::Debouncer;
pub use state::AppState;
