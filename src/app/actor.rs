//! App actor - message loop processing UI events, network responses and the env-save timer

use std::time::Duration;
use tokio::sync::mpsc;

use crate::app::debounce::Debouncer;
use crate::app::state::{AppState, EnvChange};
use crate::messages::ui_events::InputMode;
use crate::messages::{NetworkCommand, NetworkResponse, RenderState, UiEvent};
use crate::session::Session;

/// App actor that processes UI events and network responses
pub struct AppActor {
    state: AppState,
    network_tx: mpsc::UnboundedSender<NetworkCommand>,
    render_tx: mpsc::UnboundedSender<RenderState>,
    env_save: Debouncer,
}

impl AppActor {
    pub fn new(
        session: Session,
        debounce: Duration,
        network_tx: mpsc::UnboundedSender<NetworkCommand>,
        render_tx: mpsc::UnboundedSender<RenderState>,
    ) -> Self {
        AppActor {
            state: AppState::new(session),
            network_tx,
            render_tx,
            env_save: Debouncer::new(debounce),
        }
    }

    /// Show a message on the status line of the first frame
    pub fn with_notice(mut self, notice: crate::messages::Notice) -> Self {
        self.state.notice = Some(notice);
        self
    }

    /// Run the actor message loop
    pub async fn run(
        mut self,
        mut ui_rx: mpsc::UnboundedReceiver<UiEvent>,
        mut net_rx: mpsc::UnboundedReceiver<NetworkResponse>,
    ) {
        let _ = self.render_tx.send(self.state.to_render_state());

        loop {
            tokio::select! {
                event = ui_rx.recv() => {
                    let quit = match event {
                        Some(event) => self.handle_ui_event(event),
                        None => true,
                    };
                    if quit {
                        if self.env_save.is_pending() {
                            self.state.flush_environment();
                        }
                        let _ = self.network_tx.send(NetworkCommand::Shutdown);
                        break;
                    }
                }
                Some(response) = net_rx.recv() => {
                    self.state.handle_response(response);
                }
                _ = self.env_save.fired() => {
                    tracing::debug!("Saving environment after edit");
                    self.state.flush_environment();
                }
            }

            match self.state.take_env_change() {
                Some(EnvChange::Edited) => self.env_save.schedule(),
                Some(EnvChange::Saved) => self.env_save.cancel(),
                None => {}
            }
            let _ = self.render_tx.send(self.state.to_render_state());
        }
    }

    /// Handle a UI event, returns true if quit was requested
    fn handle_ui_event(&mut self, event: UiEvent) -> bool {
        match event {
            // Panel navigation
            UiEvent::NextPanel => self.state.next_panel(),
            UiEvent::PrevPanel => self.state.prev_panel(),
            UiEvent::FocusPanel(panel) => self.state.focus_panel(panel),
            UiEvent::SelectUp => self.state.select_up(),
            UiEvent::SelectDown => self.state.select_down(),

            // Input editing
            UiEvent::StartEditing => self.state.start_editing(),
            UiEvent::StopEditing => self.state.stop_editing(),
            UiEvent::CharInput(c) => self.state.enter_char(c),
            UiEvent::Newline => self.state.enter_char('\n'),
            UiEvent::Backspace => self.state.delete_char(),
            UiEvent::CursorLeft => self.state.move_cursor_left(),
            UiEvent::CursorRight => self.state.move_cursor_right(),

            // Request actions
            UiEvent::CycleMethod => self.state.cycle_method(),
            UiEvent::CycleBodyEncoding => self.state.cycle_body_encoding(),
            UiEvent::ToggleResponseView => self.state.toggle_response_view(),
            UiEvent::SendRequest => {
                if self.state.input_mode == InputMode::Editing {
                    self.state.stop_editing();
                }
                for cmd in self.state.prepare_request() {
                    let _ = self.network_tx.send(cmd);
                }
            }
            UiEvent::CancelRequest => {
                if let Some(cmd) = self.state.cancel_request() {
                    let _ = self.network_tx.send(cmd);
                }
            }

            // Collections and history
            UiEvent::Activate => self.state.activate(),
            UiEvent::DeleteSelected => self.state.delete_selected(),
            UiEvent::SaveRequest => self.state.save_request(),
            UiEvent::NewCollection => self.state.new_collection(),
            UiEvent::ExportSelected => self.state.export_selected(),
            UiEvent::ExportAll => self.state.export_all(),
            UiEvent::Import => self.state.import(),

            // Environment
            UiEvent::SaveEnvironment => self.state.save_environment(),

            // Prompt
            UiEvent::PromptChar(c) => self.state.prompt_char(c),
            UiEvent::PromptBackspace => self.state.prompt_backspace(),
            UiEvent::PromptSubmit => self.state.prompt_submit(),
            UiEvent::PromptCancel => self.state.prompt_cancel(),

            // Popups
            UiEvent::ToggleHelp => self.state.toggle_help(),
            UiEvent::CloseHelp => self.state.close_help(),

            // System
            UiEvent::Quit => return true,
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ui_events::Panel;
    use crate::storage::{FileStore, Store};

    #[tokio::test(start_paused = true)]
    async fn test_environment_edit_is_saved_after_debounce() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(Box::new(FileStore::new(dir.path())), 50);
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();
        let (net_tx, mut net_rx_cmd) = mpsc::unbounded_channel();
        let (_net_resp_tx, net_resp_rx) = mpsc::unbounded_channel();
        let (render_tx, mut render_rx) = mpsc::unbounded_channel();

        let actor = AppActor::new(session, Duration::from_millis(1000), net_tx, render_tx);
        let task = tokio::spawn(actor.run(ui_rx, net_resp_rx));

        ui_tx.send(UiEvent::FocusPanel(Panel::Environment)).unwrap();
        ui_tx.send(UiEvent::StartEditing).unwrap();
        for c in "a=1".chars() {
            ui_tx.send(UiEvent::CharInput(c)).unwrap();
        }

        let store = FileStore::new(dir.path());
        // initial frame plus one per event
        for _ in 0..6 {
            render_rx.recv().await.unwrap();
        }
        assert!(store.load_environment().unwrap().is_empty());

        // debounce expiry produces another frame
        let state = render_rx.recv().await.unwrap();
        assert_eq!(state.environment_len, 1);
        assert_eq!(store.load_environment().unwrap().get("a").unwrap(), "1");

        ui_tx.send(UiEvent::Quit).unwrap();
        task.await.unwrap();
        assert!(matches!(net_rx_cmd.recv().await, Some(NetworkCommand::Shutdown)));
    }
}
