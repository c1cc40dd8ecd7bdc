//! Network layer - HTTP request execution
//!
//! The Network actor receives execution commands and sends back results.

pub mod actor;
pub mod client;

pub use actor::NetworkActor;
pub use client::Transport;
