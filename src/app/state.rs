//! App state - editor buffers, selection and popups. Persistence goes through the session.

use indexmap::IndexMap;
use serde_json::Value;

use crate::messages::render::{HistoryRow, Notice, PromptView, ResponseView, TreeRow};
use crate::messages::ui_events::{DeleteTarget, InputMode, Panel, PromptKind};
use crate::messages::RenderState;
use crate::models::{
    BodyEncoding, Environment, ExecutionResult, Headers, HttpMethod, RawBody, RequestBody,
    RequestDraft,
};
use crate::session::Session;

/// Popup prompt with its typed input
#[derive(Clone, Debug, PartialEq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

impl Prompt {
    pub fn new(kind: PromptKind, input: impl Into<String>) -> Self {
        Prompt { kind, input: input.into() }
    }

    pub fn title(&self) -> String {
        match &self.kind {
            PromptKind::NewCollection => String::from(" New collection name "),
            PromptKind::SaveRequest { .. } => String::from(" Save request as "),
            PromptKind::ExportPath { collection_id: Some(_) } => String::from(" Export collection to "),
            PromptKind::ExportPath { collection_id: None } => String::from(" Export all collections to "),
            PromptKind::ImportPath => String::from(" Import collection from "),
            PromptKind::ConfirmDelete(DeleteTarget::Collection(_)) => {
                String::from(" Delete this collection? (y/N) ")
            }
            PromptKind::ConfirmDelete(DeleteTarget::Request { .. }) => {
                String::from(" Delete this request? (y/N) ")
            }
        }
    }
}

/// Environment changes the app actor still has to act on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvChange {
    /// Edited in memory; a debounced save is due
    Edited,
    /// Written to disk; any pending debounced save is obsolete
    Saved,
}

/// Main application state
pub struct AppState {
    // Request editor
    pub method: HttpMethod,
    pub url: String,
    pub headers_text: String,
    pub body_encoding: BodyEncoding,
    pub body_text: String,
    pub cursor_position: usize,

    // UI state
    pub active_panel: Panel,
    pub input_mode: InputMode,

    // Response
    pub response: Option<ExecutionResult>,
    pub response_view: ResponseView,
    pub response_scroll: u16,
    pub is_loading: bool,
    pub next_request_id: u64,
    pub pending_request_id: Option<u64>,

    // Sidebar
    pub selected_tree: usize,
    pub selected_history: usize,
    pub environment_text: String,

    // Popups
    pub prompt: Option<Prompt>,
    pub notice: Option<Notice>,
    pub show_help: bool,

    pub session: Session,
    pub(crate) env_change: Option<EnvChange>,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        let environment_text = format_environment(session.environment());
        AppState {
            method: HttpMethod::GET,
            url: String::new(),
            headers_text: String::new(),
            body_encoding: BodyEncoding::Json,
            body_text: String::new(),
            cursor_position: 0,
            active_panel: Panel::Url,
            input_mode: InputMode::Normal,
            response: None,
            response_view: ResponseView::Body,
            response_scroll: 0,
            is_loading: false,
            next_request_id: 1,
            pending_request_id: None,
            selected_tree: 0,
            selected_history: 0,
            environment_text,
            prompt: None,
            notice: None,
            show_help: false,
            session,
            env_change: None,
        }
    }

    /// Generate a unique request ID
    pub fn next_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    pub fn take_env_change(&mut self) -> Option<EnvChange> {
        self.env_change.take()
    }

    /// Get the current input field content
    pub fn current_input(&self) -> &str {
        match self.active_panel {
            Panel::Headers => &self.headers_text,
            Panel::Body => &self.body_text,
            Panel::Environment => &self.environment_text,
            _ => &self.url,
        }
    }

    /// Get mutable reference to current input field
    pub fn current_input_mut(&mut self) -> &mut String {
        match self.active_panel {
            Panel::Headers => &mut self.headers_text,
            Panel::Body => &mut self.body_text,
            Panel::Environment => &mut self.environment_text,
            _ => &mut self.url,
        }
    }

    /// The editor contents as an unresolved request
    pub fn draft(&self) -> RequestDraft {
        let body = match self.body_encoding {
            BodyEncoding::None => None,
            BodyEncoding::Json | BodyEncoding::Raw => Some(RawBody::Text(self.body_text.clone())),
            BodyEncoding::FormData | BodyEncoding::UrlEncoded => {
                Some(RawBody::Fields(parse_pairs(&self.body_text, '=')))
            }
        };
        RequestDraft {
            method: self.method,
            url: self.url.clone(),
            headers: parse_pairs(&self.headers_text, ':'),
            body_encoding: self.body_encoding,
            body,
        }
    }

    /// Replace the editor contents
    pub fn load_draft(&mut self, draft: &RequestDraft) {
        self.method = draft.method;
        self.url = draft.url.clone();
        self.headers_text = headers_text(&draft.headers);
        self.body_encoding = draft.body_encoding;
        self.body_text = match &draft.body {
            None => String::new(),
            Some(RawBody::Text(text)) => text.clone(),
            Some(RawBody::Fields(fields)) => format_pairs(fields, "="),
            Some(RawBody::Json(value)) => pretty_json(value),
        };
        self.input_mode = InputMode::Normal;
        self.cursor_position = self.url.len();
    }

    /// Flattened collections tree; requests only appear under expanded collections
    pub fn tree_rows(&self) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        for collection in self.session.collections().values() {
            rows.push(TreeRow::Collection {
                id: collection.id.clone(),
                name: collection.name.clone(),
                expanded: collection.expanded,
                request_count: collection.requests.len(),
            });
            if collection.expanded {
                rows.extend(collection.requests.iter().map(|request| TreeRow::Request {
                    collection_id: collection.id.clone(),
                    id: request.id.clone(),
                    name: request.name.clone(),
                    method: request.method,
                }));
            }
        }
        rows
    }

    /// Collection owning the selected tree row
    pub fn selected_collection_id(&self) -> Option<String> {
        match self.tree_rows().into_iter().nth(self.selected_tree)? {
            TreeRow::Collection { id, .. } => Some(id),
            TreeRow::Request { collection_id, .. } => Some(collection_id),
        }
    }

    fn history_rows(&self) -> Vec<HistoryRow> {
        self.session
            .history()
            .iter()
            .map(|entry| HistoryRow {
                timestamp: entry.timestamp.clone(),
                method: entry.request.method,
                url: entry.request.url.clone(),
                status: entry.response.status(),
                success: entry.response.is_success(),
            })
            .collect()
    }

    /// Convert state to RenderState for UI
    pub fn to_render_state(&self) -> RenderState {
        RenderState {
            method: self.method,
            url: self.url.clone(),
            headers_text: self.headers_text.clone(),
            body_encoding: self.body_encoding,
            body_text: self.body_text.clone(),
            active_panel: self.active_panel,
            input_mode: self.input_mode,
            cursor_position: self.cursor_position,
            response: self.response.clone(),
            response_view: self.response_view,
            response_scroll: self.response_scroll,
            is_loading: self.is_loading,
            tree: self.tree_rows(),
            selected_tree: self.selected_tree,
            history: self.history_rows(),
            selected_history: self.selected_history,
            environment_text: self.environment_text.clone(),
            environment_len: self.session.environment().len(),
            prompt: self.prompt.as_ref().map(|p| PromptView {
                title: p.title(),
                input: p.input.clone(),
            }),
            notice: self.notice.clone(),
            show_help: self.show_help,
        }
    }
}

/// Parse `key<sep>value` lines. Keys and values are trimmed; lines without a key are skipped.
pub fn parse_pairs(text: &str, separator: char) -> IndexMap<String, String> {
    text.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(separator)?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}

pub fn format_pairs(pairs: &IndexMap<String, String>, separator: &str) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}{separator}{v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn parse_environment(text: &str) -> Environment {
    parse_pairs(text, '=').into_iter().collect()
}

pub fn format_environment(env: &Environment) -> String {
    env.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Editor text for a resolved body
pub fn body_text(body: &RequestBody) -> String {
    match body {
        RequestBody::Empty => String::new(),
        RequestBody::Json(value) => pretty_json(value),
        RequestBody::Fields(fields) => format_pairs(fields, "="),
        RequestBody::Raw(text) => text.clone(),
    }
}

pub(crate) fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// `Name: value` lines for the headers editor
pub fn headers_text(headers: &Headers) -> String {
    format_pairs(headers, ": ")
}
