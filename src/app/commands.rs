//! Command handlers - business logic for processing UI events

use std::path::PathBuf;

use crate::app::state::{body_text, format_environment, headers_text, parse_environment, EnvChange, Prompt};
use crate::app::AppState;
use crate::messages::render::{Notice, ResponseView, TreeRow};
use crate::messages::ui_events::{DeleteTarget, InputMode, Panel, PromptKind};
use crate::messages::{NetworkCommand, NetworkResponse};
use crate::session::{suggest_request_name, ExportTarget, ImportSummary, SessionError};
use crate::storage::ExportOutcome;
use crate::template::referenced_keys;

impl AppState {
    // ========================
    // Navigation
    // ========================

    pub fn next_panel(&mut self) {
        self.active_panel = self.active_panel.next();
    }

    pub fn prev_panel(&mut self) {
        self.active_panel = self.active_panel.prev();
    }

    pub fn focus_panel(&mut self, panel: Panel) {
        self.active_panel = panel;
    }

    pub fn select_up(&mut self) {
        match self.active_panel {
            Panel::Collections => self.selected_tree = self.selected_tree.saturating_sub(1),
            Panel::History => self.selected_history = self.selected_history.saturating_sub(1),
            _ => self.response_scroll = self.response_scroll.saturating_sub(1),
        }
    }

    pub fn select_down(&mut self) {
        match self.active_panel {
            Panel::Collections => {
                let rows = self.tree_rows().len();
                if self.selected_tree + 1 < rows {
                    self.selected_tree += 1;
                }
            }
            Panel::History => {
                if self.selected_history + 1 < self.session.history().len() {
                    self.selected_history += 1;
                }
            }
            _ => self.response_scroll = self.response_scroll.saturating_add(1),
        }
    }

    // ========================
    // Input editing
    // ========================

    pub fn start_editing(&mut self) {
        if self.active_panel.is_editable() {
            self.input_mode = InputMode::Editing;
            self.cursor_position = self.current_input().len();
        }
    }

    pub fn stop_editing(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn move_cursor_left(&mut self) {
        let input = self.current_input();
        if self.cursor_position > 0 {
            let new_pos = input[..self.cursor_position]
                .char_indices()
                .last()
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.cursor_position = new_pos;
        }
    }

    pub fn move_cursor_right(&mut self) {
        let input = self.current_input();
        if self.cursor_position < input.len() {
            let new_pos = input[self.cursor_position..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| self.cursor_position + i)
                .unwrap_or(input.len());
            self.cursor_position = new_pos;
        }
    }

    pub fn enter_char(&mut self, c: char) {
        let cursor_pos = self.cursor_position;
        let input = self.current_input_mut();
        if cursor_pos <= input.len() {
            input.insert(cursor_pos, c);
            self.cursor_position = cursor_pos + c.len_utf8();
        }
        self.after_edit();
    }

    pub fn delete_char(&mut self) {
        if self.cursor_position > 0 {
            let cursor_pos = self.cursor_position;
            let input = self.current_input_mut();
            let prev_pos = input[..cursor_pos]
                .char_indices()
                .last()
                .map(|(i, _)| i)
                .unwrap_or(0);
            input.remove(prev_pos);
            self.cursor_position = prev_pos;
        }
        self.after_edit();
    }

    fn after_edit(&mut self) {
        if self.active_panel == Panel::Environment {
            self.apply_environment_text();
        }
    }

    // ========================
    // Request editor
    // ========================

    pub fn cycle_method(&mut self) {
        self.method = self.method.next();
    }

    pub fn cycle_body_encoding(&mut self) {
        self.body_encoding = self.body_encoding.next();
    }

    pub fn toggle_response_view(&mut self) {
        self.response_view = match self.response_view {
            ResponseView::Body => ResponseView::Headers,
            ResponseView::Headers => ResponseView::Body,
        };
        self.response_scroll = 0;
    }

    // ========================
    // Sending
    // ========================

    /// Build the editor request and hand it to the network layer.
    /// A send that is still in flight is superseded and cancelled.
    pub fn prepare_request(&mut self) -> Vec<NetworkCommand> {
        let draft = self.draft();
        let descriptor = match self.session.prepare(&draft) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                self.notice = Some(Notice::error(e.to_string()));
                return Vec::new();
            }
        };

        let mut commands = Vec::new();
        if let Some(previous) = self.pending_request_id.take() {
            commands.push(NetworkCommand::Cancel(previous));
        }

        let id = self.next_id();
        self.pending_request_id = Some(id);
        self.is_loading = true;
        self.response_scroll = 0;
        self.notice = self.unresolved_notice();

        commands.push(NetworkCommand::Execute { id, descriptor });
        commands
    }

    pub fn cancel_request(&mut self) -> Option<NetworkCommand> {
        self.pending_request_id.map(NetworkCommand::Cancel)
    }

    /// Variables referenced by the editor that the environment does not define
    fn unresolved_notice(&self) -> Option<Notice> {
        let env = self.session.environment();
        let mut missing: Vec<String> = Vec::new();
        let sources = [&self.url, &self.headers_text, &self.body_text];
        for key in sources.iter().flat_map(|text| referenced_keys(text)) {
            if env.get(&key).is_none() && !missing.contains(&key) {
                missing.push(key);
            }
        }
        (!missing.is_empty()).then(|| Notice::info(format!("Unresolved variables: {}", missing.join(", "))))
    }

    pub fn handle_response(&mut self, response: NetworkResponse) {
        let response_id = response.id();
        if self.pending_request_id != Some(response_id) {
            tracing::debug!(id = response_id, "Dropping stale response");
            return;
        }

        match response {
            NetworkResponse::Completed { descriptor, result, .. } => {
                self.response = Some(result.clone());
                self.session.record(descriptor, result);
                self.selected_history = 0;
                self.finalize_request();
            }
            NetworkResponse::Cancelled { .. } => {
                self.notice = Some(Notice::info("Request cancelled"));
                self.finalize_request();
            }
        }
    }

    fn finalize_request(&mut self) {
        self.is_loading = false;
        self.pending_request_id = None;
        self.response_scroll = 0;
    }

    // ========================
    // Collections
    // ========================

    pub fn new_collection(&mut self) {
        self.input_mode = InputMode::Normal;
        self.prompt = Some(Prompt::new(PromptKind::NewCollection, ""));
    }

    pub fn save_request(&mut self) {
        self.input_mode = InputMode::Normal;
        let collection_id = self
            .selected_collection_id()
            .or_else(|| self.session.collections().keys().next().cloned());
        match collection_id {
            Some(collection_id) => {
                let name = suggest_request_name(self.method, &self.url);
                self.prompt = Some(Prompt::new(PromptKind::SaveRequest { collection_id }, name));
            }
            None => self.notice = Some(Notice::error(SessionError::NoCollections.to_string())),
        }
    }

    /// Enter on the collections tree or the history list
    pub fn activate(&mut self) {
        match self.active_panel {
            Panel::Collections => self.activate_tree_row(),
            Panel::History => self.load_history_entry(self.selected_history),
            _ => {}
        }
    }

    fn activate_tree_row(&mut self) {
        let Some(row) = self.tree_rows().into_iter().nth(self.selected_tree) else {
            return;
        };
        match row {
            TreeRow::Collection { id, .. } => {
                if let Err(e) = self.session.toggle_collection(&id) {
                    self.notice = Some(Notice::error(e.to_string()));
                }
                self.clamp_tree_selection();
            }
            TreeRow::Request { collection_id, id, name, .. } => {
                if let Some(request) = self.session.find_request(&collection_id, &id) {
                    let draft = request.draft();
                    self.load_draft(&draft);
                    self.active_panel = Panel::Url;
                    self.notice = Some(Notice::info(format!("Loaded '{name}'")));
                }
            }
        }
    }

    pub fn load_history_entry(&mut self, index: usize) {
        let Some(entry) = self.session.history().get(index).cloned() else {
            return;
        };
        let request = entry.request;
        self.method = request.method;
        self.url = request.url;
        self.headers_text = headers_text(&request.headers);
        self.body_encoding = request.body_encoding;
        self.body_text = body_text(&request.body);
        self.cursor_position = self.url.len();
        self.response = Some(entry.response);
        self.response_scroll = 0;
        self.active_panel = Panel::Url;
    }

    pub fn delete_selected(&mut self) {
        let Some(row) = self.tree_rows().into_iter().nth(self.selected_tree) else {
            return;
        };
        let target = match row {
            TreeRow::Collection { id, .. } => DeleteTarget::Collection(id),
            TreeRow::Request { collection_id, id, .. } => DeleteTarget::Request {
                collection_id,
                request_id: id,
            },
        };
        self.prompt = Some(Prompt::new(PromptKind::ConfirmDelete(target), ""));
    }

    pub fn export_selected(&mut self) {
        let Some(collection_id) = self.selected_collection_id() else {
            self.notice = Some(Notice::error("Select a collection to export"));
            return;
        };
        let file_name = self
            .session
            .export_payload(&ExportTarget::Collection(collection_id.clone()))
            .map(|payload| payload.default_file_name())
            .unwrap_or_default();
        self.prompt = Some(Prompt::new(
            PromptKind::ExportPath { collection_id: Some(collection_id) },
            file_name,
        ));
    }

    pub fn export_all(&mut self) {
        let file_name = self
            .session
            .export_payload(&ExportTarget::All)
            .map(|payload| payload.default_file_name())
            .unwrap_or_default();
        self.prompt = Some(Prompt::new(PromptKind::ExportPath { collection_id: None }, file_name));
    }

    pub fn import(&mut self) {
        self.prompt = Some(Prompt::new(PromptKind::ImportPath, ""));
    }

    fn clamp_tree_selection(&mut self) {
        let rows = self.tree_rows().len();
        self.selected_tree = self.selected_tree.min(rows.saturating_sub(1));
    }

    // ========================
    // Environment
    // ========================

    /// Re-read the environment editor; removed keys are written at once, other edits are debounced
    pub fn apply_environment_text(&mut self) {
        let parsed = parse_environment(&self.environment_text);
        let removed = self
            .session
            .environment()
            .iter()
            .any(|(key, _)| parsed.get(key).is_none());
        self.session.replace_environment(parsed);
        if removed {
            self.save_environment();
        } else {
            self.env_change = Some(EnvChange::Edited);
        }
    }

    pub fn save_environment(&mut self) {
        match self.session.save_environment() {
            Ok(()) => self.env_change = Some(EnvChange::Saved),
            Err(e) => self.notice = Some(Notice::error(e.to_string())),
        }
    }

    /// Debounce deadline reached
    pub fn flush_environment(&mut self) {
        if let Err(e) = self.session.save_environment() {
            self.notice = Some(Notice::error(e.to_string()));
        }
    }

    // ========================
    // Prompt popup
    // ========================

    pub fn prompt_char(&mut self, c: char) {
        if let Some(prompt) = self.prompt.as_mut() {
            prompt.input.push(c);
        }
    }

    pub fn prompt_backspace(&mut self) {
        if let Some(prompt) = self.prompt.as_mut() {
            prompt.input.pop();
        }
    }

    pub fn prompt_cancel(&mut self) {
        self.prompt = None;
    }

    pub fn prompt_submit(&mut self) {
        let Some(Prompt { kind, input }) = self.prompt.take() else {
            return;
        };

        let result = match kind {
            PromptKind::NewCollection => self.session.create_collection(&input).map(|_| {
                self.clamp_tree_selection();
                format!("Created collection '{}'", input.trim())
            }),
            PromptKind::SaveRequest { collection_id } => {
                let draft = self.draft();
                self.session
                    .save_request(&collection_id, &input, &draft)
                    .map(|_| format!("Saved request '{}'", input.trim()))
            }
            PromptKind::ExportPath { collection_id } => {
                let target = match collection_id {
                    Some(id) => ExportTarget::Collection(id),
                    None => ExportTarget::All,
                };
                let dest = optional_path(&input);
                self.session
                    .export(&target, dest.as_deref())
                    .map(|outcome| match outcome {
                        ExportOutcome::Exported(path) => format!("Exported to {}", path.display()),
                        ExportOutcome::Cancelled => String::from("Export cancelled"),
                    })
            }
            PromptKind::ImportPath => {
                let source = optional_path(&input);
                self.session.import(source.as_deref()).map(|summary| {
                    self.environment_text = format_environment(self.session.environment());
                    match summary {
                        ImportSummary::Collection { name, .. } => format!("Imported collection '{name}'"),
                        ImportSummary::Bundle { collections, variables } => {
                            format!("Imported {collections} collections and {variables} variables")
                        }
                        ImportSummary::Cancelled => String::from("Import cancelled"),
                    }
                })
            }
            PromptKind::ConfirmDelete(target) => {
                if !input.trim().to_lowercase().starts_with('y') {
                    return;
                }
                let result = match target {
                    DeleteTarget::Collection(id) => self.session.delete_collection(&id),
                    DeleteTarget::Request { collection_id, request_id } => {
                        self.session.delete_request(&collection_id, &request_id)
                    }
                };
                self.clamp_tree_selection();
                result.map(|()| String::from("Deleted"))
            }
        };

        self.notice = Some(match result {
            Ok(message) => Notice::info(message),
            Err(e) => Notice::error(e.to_string()),
        });
    }

    // ========================
    // Help popup
    // ========================

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn close_help(&mut self) {
        self.show_help = false;
    }
}

/// Blank input dismisses the file prompt
fn optional_path(input: &str) -> Option<PathBuf> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::render::NoticeLevel;
    use crate::models::{
        BodyEncoding, DecodedBody, ExecutionResult, Headers, HttpMethod, ResponseData,
    };
    use crate::session::Session;
    use crate::storage::FileStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn state() -> (TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(Box::new(FileStore::new(dir.path())), 50);
        (dir, AppState::new(session))
    }

    fn ok_result(status: u16) -> ExecutionResult {
        ExecutionResult::Success(ResponseData {
            status,
            status_text: "OK".into(),
            headers: Headers::new(),
            body: DecodedBody::Structured(json!({"ok": true})),
            response_time_ms: 12,
            content_type: "application/json".into(),
            size_bytes: 11,
        })
    }

    fn execute_of(commands: &[NetworkCommand]) -> (u64, crate::models::RequestDescriptor) {
        match commands.last() {
            Some(NetworkCommand::Execute { id, descriptor }) => (*id, descriptor.clone()),
            other => panic!("expected execute, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_url_never_reaches_network() {
        let (_dir, mut state) = state();
        assert!(state.prepare_request().is_empty());
        assert_eq!(state.notice.as_ref().unwrap().text, "Please enter a URL");
        assert!(!state.is_loading);
    }

    #[test]
    fn test_invalid_json_body_is_reported() {
        let (_dir, mut state) = state();
        state.method = HttpMethod::POST;
        state.url = "http://h".into();
        state.body_text = "{oops".into();
        assert!(state.prepare_request().is_empty());
        assert_eq!(state.notice.as_ref().unwrap().level, NoticeLevel::Error);
    }

    #[test]
    fn test_superseded_send_is_cancelled_and_ignored() {
        let (_dir, mut state) = state();
        state.url = "http://h/one".into();
        let first = state.prepare_request();
        let (first_id, first_descriptor) = execute_of(&first);

        state.url = "http://h/two".into();
        let second = state.prepare_request();
        assert_eq!(second[0], NetworkCommand::Cancel(first_id));
        let (second_id, second_descriptor) = execute_of(&second);

        state.handle_response(NetworkResponse::Completed {
            id: first_id,
            descriptor: first_descriptor,
            result: ok_result(500),
        });
        assert!(state.is_loading);
        assert!(state.session.history().is_empty());

        state.handle_response(NetworkResponse::Completed {
            id: second_id,
            descriptor: second_descriptor,
            result: ok_result(200),
        });
        assert!(!state.is_loading);
        assert_eq!(state.response.as_ref().and_then(|r| r.status()), Some(200));
        assert_eq!(state.session.history().len(), 1);
        assert_eq!(state.session.history().get(0).unwrap().request.url, "http://h/two");
    }

    #[test]
    fn test_cancel_clears_loading() {
        let (_dir, mut state) = state();
        state.url = "http://h".into();
        let (id, _) = execute_of(&state.prepare_request());
        assert_eq!(state.cancel_request(), Some(NetworkCommand::Cancel(id)));
        state.handle_response(NetworkResponse::Cancelled { id });
        assert!(!state.is_loading);
        assert!(state.session.history().is_empty());
    }

    #[test]
    fn test_unresolved_variables_are_flagged() {
        let (_dir, mut state) = state();
        state.url = "{{host}}/x".into();
        let commands = state.prepare_request();
        assert_eq!(commands.len(), 1);
        assert_eq!(state.notice.as_ref().unwrap().text, "Unresolved variables: host");
    }

    #[test]
    fn test_history_entry_restores_request_and_response() {
        let (_dir, mut state) = state();
        state.method = HttpMethod::POST;
        state.url = "http://h/users".into();
        state.body_text = "{\"a\":1}".into();
        let (id, descriptor) = execute_of(&state.prepare_request());
        state.handle_response(NetworkResponse::Completed { id, descriptor, result: ok_result(201) });

        state.method = HttpMethod::GET;
        state.url.clear();
        state.body_text.clear();
        state.response = None;

        state.active_panel = Panel::History;
        state.activate();
        assert_eq!(state.method, HttpMethod::POST);
        assert_eq!(state.url, "http://h/users");
        assert_eq!(state.body_text, "{\n  \"a\": 1\n}");
        assert_eq!(state.headers_text, "Content-Type: application/json");
        assert_eq!(state.response.as_ref().and_then(|r| r.status()), Some(201));
    }

    #[test]
    fn test_save_request_flow() {
        let (_dir, mut state) = state();
        state.save_request();
        assert_eq!(
            state.notice.as_ref().unwrap().text,
            "Please create a collection first"
        );

        state.new_collection();
        "Users".chars().for_each(|c| state.prompt_char(c));
        state.prompt_submit();
        assert_eq!(state.session.collections().len(), 1);

        state.method = HttpMethod::DELETE;
        state.url = "{{base_url}}/users/7?force=1".into();
        state.body_encoding = BodyEncoding::None;
        state.save_request();
        assert_eq!(state.prompt.as_ref().unwrap().input, "DELETE 7");
        state.prompt_submit();

        let collection = state.session.collections().values().next().unwrap();
        assert_eq!(collection.requests[0].name, "DELETE 7");
        assert_eq!(collection.requests[0].url, "{{base_url}}/users/7?force=1");
    }

    #[test]
    fn test_tree_activation_toggles_and_loads() {
        let (_dir, mut state) = state();
        state.session.seed_samples_if_empty().unwrap();
        state.active_panel = Panel::Collections;

        state.selected_tree = 2;
        state.activate();
        assert_eq!(state.url, "{{base_url}}/posts/1");
        assert_eq!(state.active_panel, Panel::Url);

        state.active_panel = Panel::Collections;
        state.selected_tree = 0;
        state.activate();
        assert_eq!(state.tree_rows().len(), 1);
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let (_dir, mut state) = state();
        state.session.create_collection("Keep").unwrap();
        state.active_panel = Panel::Collections;

        state.delete_selected();
        state.prompt_submit();
        assert_eq!(state.session.collections().len(), 1);

        state.delete_selected();
        state.prompt_char('y');
        state.prompt_submit();
        assert!(state.session.collections().is_empty());
    }

    #[test]
    fn test_environment_edits_schedule_or_save() {
        let (_dir, mut state) = state();
        state.active_panel = Panel::Environment;
        state.start_editing();
        "k=v".chars().for_each(|c| state.enter_char(c));
        assert_eq!(state.take_env_change(), Some(EnvChange::Edited));
        assert_eq!(state.session.environment().get("k").unwrap(), "v");

        state.delete_char();
        assert_eq!(state.session.environment().get("k").unwrap(), "");
        state.delete_char();
        assert!(state.session.environment().is_empty());
        assert_eq!(state.take_env_change(), Some(EnvChange::Saved));
    }

    #[test]
    fn test_export_prompt_defaults_to_collection_name() {
        let (dir, mut state) = state();
        state.session.create_collection("Users").unwrap();
        state.active_panel = Panel::Collections;
        state.export_selected();
        assert_eq!(state.prompt.as_ref().unwrap().input, "Users.json");

        let dest = dir.path().join("out.json");
        state.prompt.as_mut().unwrap().input = dest.display().to_string();
        state.prompt_submit();
        assert!(dest.exists());
        assert_eq!(state.notice.as_ref().unwrap().level, NoticeLevel::Info);

        state.export_all();
        state.prompt.as_mut().unwrap().input.clear();
        state.prompt_submit();
        assert_eq!(state.notice.as_ref().unwrap().text, "Export cancelled");
    }
}
