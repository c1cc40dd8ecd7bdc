//! UI events - messages from UI layer to App layer

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Events generated from user input in the UI layer
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    // Panel navigation
    NextPanel,
    PrevPanel,
    FocusPanel(Panel),
    SelectUp,
    SelectDown,

    // Input editing
    StartEditing,
    StopEditing,
    CharInput(char),
    Newline,
    Backspace,
    CursorLeft,
    CursorRight,

    // Request actions
    SendRequest,
    CancelRequest,
    CycleMethod,
    CycleBodyEncoding,
    ToggleResponseView,

    // Collections and history
    Activate,
    DeleteSelected,
    SaveRequest,
    NewCollection,
    ExportSelected,
    ExportAll,
    Import,

    // Environment
    SaveEnvironment,

    // Prompt popup
    PromptChar(char),
    PromptBackspace,
    PromptSubmit,
    PromptCancel,

    // Popups
    ToggleHelp,
    CloseHelp,

    // System
    Quit,
}

/// Focusable panels, in Tab order
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Panel {
    #[default]
    Url,
    Headers,
    Body,
    Response,
    Collections,
    History,
    Environment,
}

impl Panel {
    pub fn next(&self) -> Panel {
        match self {
            Panel::Url => Panel::Headers,
            Panel::Headers => Panel::Body,
            Panel::Body => Panel::Response,
            Panel::Response => Panel::Collections,
            Panel::Collections => Panel::History,
            Panel::History => Panel::Environment,
            Panel::Environment => Panel::Url,
        }
    }

    pub fn prev(&self) -> Panel {
        match self {
            Panel::Url => Panel::Environment,
            Panel::Headers => Panel::Url,
            Panel::Body => Panel::Headers,
            Panel::Response => Panel::Body,
            Panel::Collections => Panel::Response,
            Panel::History => Panel::Collections,
            Panel::Environment => Panel::History,
        }
    }

    /// Panels backed by a text buffer
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            Panel::Url | Panel::Headers | Panel::Body | Panel::Environment
        )
    }

    pub fn is_multiline(&self) -> bool {
        matches!(self, Panel::Headers | Panel::Body | Panel::Environment)
    }
}

/// Input mode
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Editing,
}

/// What the popup prompt is asking for
#[derive(Clone, Debug, PartialEq)]
pub enum PromptKind {
    NewCollection,
    SaveRequest { collection_id: String },
    ExportPath { collection_id: Option<String> },
    ImportPath,
    ConfirmDelete(DeleteTarget),
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeleteTarget {
    Collection(String),
    Request { collection_id: String, request_id: String },
}

/// UI context needed to interpret a key press
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyContext {
    pub active_panel: Panel,
    pub input_mode: InputMode,
    pub prompt_open: bool,
    pub show_help: bool,
}

/// Convert a key event to a UiEvent based on current UI context
pub fn key_to_ui_event(key: KeyEvent, ctx: KeyContext) -> Option<UiEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    // Global Ctrl shortcuts
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => return Some(UiEvent::Quit),
            KeyCode::Char('x') => return Some(UiEvent::CancelRequest),
            KeyCode::Enter | KeyCode::Char('r') if !ctx.prompt_open => {
                return Some(UiEvent::SendRequest)
            }
            KeyCode::Char('s') if !ctx.prompt_open => return Some(UiEvent::SaveRequest),
            KeyCode::Char('n') if !ctx.prompt_open => return Some(UiEvent::NewCollection),
            _ => {}
        }
    }

    if ctx.show_help {
        return Some(UiEvent::CloseHelp);
    }

    if ctx.prompt_open {
        return match key.code {
            KeyCode::Esc => Some(UiEvent::PromptCancel),
            KeyCode::Enter => Some(UiEvent::PromptSubmit),
            KeyCode::Backspace => Some(UiEvent::PromptBackspace),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(UiEvent::PromptChar(c))
            }
            _ => None,
        };
    }

    match ctx.input_mode {
        InputMode::Normal => normal_mode_keys(key, ctx.active_panel),
        InputMode::Editing => editing_mode_keys(key, ctx.active_panel),
    }
}

fn normal_mode_keys(key: KeyEvent, panel: Panel) -> Option<UiEvent> {
    match key.code {
        KeyCode::Char('q') => Some(UiEvent::Quit),
        KeyCode::Char('?') => Some(UiEvent::ToggleHelp),
        KeyCode::Tab => Some(UiEvent::NextPanel),
        KeyCode::BackTab => Some(UiEvent::PrevPanel),
        KeyCode::Char('s') => Some(UiEvent::SendRequest),
        KeyCode::Char('m') => Some(UiEvent::CycleMethod),
        KeyCode::Char('b') => Some(UiEvent::CycleBodyEncoding),
        KeyCode::Char('n') => Some(UiEvent::NewCollection),
        KeyCode::Char('c') => Some(UiEvent::FocusPanel(Panel::Collections)),
        KeyCode::Char('h') => Some(UiEvent::FocusPanel(Panel::History)),
        KeyCode::Char('v') => Some(UiEvent::FocusPanel(Panel::Environment)),
        KeyCode::Char('i') => Some(UiEvent::Import),
        KeyCode::Char('X') => Some(UiEvent::ExportAll),
        KeyCode::Char('x') if panel == Panel::Collections => Some(UiEvent::ExportSelected),
        KeyCode::Char('d') if panel == Panel::Collections => Some(UiEvent::DeleteSelected),
        KeyCode::Char('w') if panel == Panel::Environment => Some(UiEvent::SaveEnvironment),
        KeyCode::Char('t') if panel == Panel::Response => Some(UiEvent::ToggleResponseView),
        KeyCode::Char('e') if panel.is_editable() => Some(UiEvent::StartEditing),
        KeyCode::Enter => match panel {
            Panel::Collections | Panel::History => Some(UiEvent::Activate),
            Panel::Response => Some(UiEvent::ToggleResponseView),
            _ => Some(UiEvent::StartEditing),
        },
        KeyCode::Up => Some(UiEvent::SelectUp),
        KeyCode::Down => Some(UiEvent::SelectDown),
        _ => None,
    }
}

fn editing_mode_keys(key: KeyEvent, panel: Panel) -> Option<UiEvent> {
    match key.code {
        KeyCode::Esc => Some(UiEvent::StopEditing),
        KeyCode::Left => Some(UiEvent::CursorLeft),
        KeyCode::Right => Some(UiEvent::CursorRight),
        KeyCode::Backspace => Some(UiEvent::Backspace),
        KeyCode::Char(c) => Some(UiEvent::CharInput(c)),
        KeyCode::Enter if panel.is_multiline() => Some(UiEvent::Newline),
        KeyCode::Enter => Some(UiEvent::SendRequest),
        KeyCode::Tab => Some(UiEvent::StopEditing),
        _ => None,
    }
}
