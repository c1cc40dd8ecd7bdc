//! Render state - data structure sent from App layer to UI for rendering

use crate::messages::ui_events::{InputMode, KeyContext, Panel};
use crate::models::{BodyEncoding, ExecutionResult, HttpMethod};

/// Which part of the response is shown
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseView {
    #[default]
    Body,
    Headers,
}

/// One row of the collections tree
#[derive(Clone, Debug, PartialEq)]
pub enum TreeRow {
    Collection {
        id: String,
        name: String,
        expanded: bool,
        request_count: usize,
    },
    Request {
        collection_id: String,
        id: String,
        name: String,
        method: HttpMethod,
    },
}

/// One row of the history list
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryRow {
    pub timestamp: String,
    pub method: HttpMethod,
    pub url: String,
    pub status: Option<u16>,
    pub success: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Status-line message shown in place of alerts
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Notice { level: NoticeLevel::Info, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notice { level: NoticeLevel::Error, text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PromptView {
    pub title: String,
    pub input: String,
}

/// Complete state needed by the UI to render
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    // Request editor
    pub method: HttpMethod,
    pub url: String,
    pub headers_text: String,
    pub body_encoding: BodyEncoding,
    pub body_text: String,

    // UI state
    pub active_panel: Panel,
    pub input_mode: InputMode,
    pub cursor_position: usize,

    // Response
    pub response: Option<ExecutionResult>,
    pub response_view: ResponseView,
    pub response_scroll: u16,
    pub is_loading: bool,

    // Sidebar
    pub tree: Vec<TreeRow>,
    pub selected_tree: usize,
    pub history: Vec<HistoryRow>,
    pub selected_history: usize,
    pub environment_text: String,
    pub environment_len: usize,

    // Popups
    pub prompt: Option<PromptView>,
    pub notice: Option<Notice>,
    pub show_help: bool,
}

impl RenderState {
    pub fn key_context(&self) -> KeyContext {
        KeyContext {
            active_panel: self.active_panel,
            input_mode: self.input_mode,
            prompt_open: self.prompt.is_some(),
            show_help: self.show_help,
        }
    }
}
