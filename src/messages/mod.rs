//! Messages between the UI thread, the app actor and the network actor.

pub mod network;
pub mod render;
pub mod ui_events;

pub use network::{NetworkCommand, NetworkResponse};
pub use render::{Notice, RenderState};
pub use ui_events::UiEvent;
