//! Courier - terminal HTTP request composer
//!
//! Architecture:
//! - UI Layer (Ratatui) - synchronous terminal rendering
//! - App Layer - central state machine processing events
//! - Network Layer (Tokio) - async HTTP execution

use anyhow::Context;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::*, widgets::*};
use std::fs;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use courier::constants::{APP_NAME, APP_VERSION, LOG_FILE};
use courier::messages::render::{NoticeLevel, ResponseView, TreeRow};
use courier::messages::ui_events::{key_to_ui_event, InputMode, Panel};
use courier::messages::{NetworkCommand, NetworkResponse, Notice, RenderState, UiEvent};
use courier::models::{BodyEncoding, DecodedBody, ExecutionResult};
use courier::ui::{self, highlight_json, method_color, response_summary, response_text, status_color};
use courier::{AppActor, Config, FileStore, NetworkActor, Session, Transport};

/// Terminal cleanup guard
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    let data_dir = config.data_dir();
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    // Log to a file; the terminal belongs to the TUI
    let file_appender = tracing_appender::rolling::never(&data_dir, LOG_FILE);
    let (non_blocking, _log_guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    tracing::info!(version = APP_VERSION, data_dir = %data_dir.display(), "Starting");

    let mut session = Session::new(Box::new(FileStore::new(&data_dir)), config.history_limit);
    let startup_notice = match session.load() {
        Err(e) => Some(Notice::error(e.to_string())),
        Ok(()) => match session.seed_samples_if_empty() {
            Ok(true) => Some(Notice::info("Loaded sample environment and collection")),
            Ok(false) => None,
            Err(e) => Some(Notice::error(e.to_string())),
        },
    };

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let _guard = TerminalGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create channels
    let (ui_tx, ui_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (net_cmd_tx, net_cmd_rx) = mpsc::unbounded_channel::<NetworkCommand>();
    let (net_resp_tx, net_resp_rx) = mpsc::unbounded_channel::<NetworkResponse>();
    let (render_tx, mut render_rx) = mpsc::unbounded_channel::<RenderState>();

    // Spawn network actor
    let network_actor = NetworkActor::new(Transport::new(&config), net_resp_tx);
    tokio::spawn(network_actor.run(net_cmd_rx));

    // Spawn app actor
    let mut app_actor = AppActor::new(session, config.debounce(), net_cmd_tx, render_tx);
    if let Some(notice) = startup_notice {
        app_actor = app_actor.with_notice(notice);
    }
    let app_task = tokio::spawn(app_actor.run(ui_rx, net_resp_rx));

    run_ui_loop(&mut terminal, ui_tx, &mut render_rx).await?;

    // Let the app actor flush any pending environment save
    let _ = app_task.await;
    tracing::info!("Shutting down");

    Ok(())
}

/// Run the synchronous UI rendering loop
async fn run_ui_loop(
    terminal: &mut Terminal<impl Backend>,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
    render_rx: &mut mpsc::UnboundedReceiver<RenderState>,
) -> anyhow::Result<()> {
    let mut current_state = RenderState::default();

    loop {
        terminal.draw(|f| draw_ui(f, &current_state))?;

        // Poll for events with timeout
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if let Some(event) = key_to_ui_event(key, current_state.key_context()) {
                    let quit = matches!(event, UiEvent::Quit);
                    let _ = ui_tx.send(event);
                    if quit {
                        break;
                    }
                }
            }
        }

        // Check for state updates (non-blocking)
        while let Ok(state) = render_rx.try_recv() {
            current_state = state;
        }
    }

    Ok(())
}

// ============================================================================
// UI Drawing Functions
// ============================================================================

fn draw_ui(f: &mut Frame, state: &RenderState) {
    let area = f.area();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Notice
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[0]);

    draw_sidebar(f, state, columns[0]);
    draw_workspace(f, state, columns[1]);
    draw_notice(f, state, rows[1]);
    draw_status_bar(f, state, rows[2]);

    if let Some(prompt) = &state.prompt {
        draw_prompt_popup(f, &prompt.title, &prompt.input, area);
    }

    if state.show_help {
        draw_help_popup(f, area);
    }
}

fn border_style(state: &RenderState, panel: Panel) -> Style {
    let focused = state.active_panel == panel;
    if focused && state.input_mode == InputMode::Editing {
        Style::default().fg(Color::Yellow)
    } else if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

/// Place the terminal cursor at a byte offset of a (possibly multi-line) buffer
fn set_text_cursor(f: &mut Frame, state: &RenderState, panel: Panel, text: &str, area: Rect) {
    if state.active_panel != panel || state.input_mode != InputMode::Editing {
        return;
    }
    let before = &text[..state.cursor_position.min(text.len())];
    let row = before.matches('\n').count() as u16;
    let col = before.rsplit('\n').next().map(|l| l.chars().count()).unwrap_or(0) as u16;
    let max_x = area.x + area.width.saturating_sub(2);
    let max_y = area.y + area.height.saturating_sub(2);
    f.set_cursor_position(Position::new(
        (area.x + 1 + col).min(max_x),
        (area.y + 1 + row).min(max_y),
    ));
}

// ----------------------------------------------------------------------------
// Sidebar
// ----------------------------------------------------------------------------

fn draw_sidebar(f: &mut Frame, state: &RenderState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Percentage(30),
            Constraint::Percentage(25),
        ])
        .split(area);

    draw_collections(f, state, chunks[0]);
    draw_history(f, state, chunks[1]);
    draw_environment(f, state, chunks[2]);
}

fn draw_collections(f: &mut Frame, state: &RenderState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(state, Panel::Collections))
        .title(" Collections ");

    if state.tree.is_empty() {
        let empty = Paragraph::new("No collections yet.\n\nPress 'n' to create one\nor 'i' to import.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = state
        .tree
        .iter()
        .map(|row| match row {
            TreeRow::Collection { name, expanded, request_count, .. } => {
                let marker = if *expanded { "▾" } else { "▸" };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{marker} {name}"), Style::default().bold()),
                    Span::styled(format!(" ({request_count})"), Style::default().fg(Color::DarkGray)),
                ]))
            }
            TreeRow::Request { name, method, .. } => ListItem::new(Line::from(vec![
                Span::raw("   "),
                Span::styled(
                    format!("{:7}", method.as_str()),
                    Style::default().fg(method_color(*method)).bold(),
                ),
                Span::raw(name.clone()),
            ])),
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(if state.active_panel == Panel::Collections {
            Style::default().fg(Color::Yellow).bold()
        } else {
            Style::default()
        });

    let mut list_state = ListState::default();
    list_state.select(Some(state.selected_tree));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_history(f: &mut Frame, state: &RenderState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(state, Panel::History))
        .title(format!(" History ({}) ", state.history.len()));

    let items: Vec<ListItem> = state
        .history
        .iter()
        .map(|row| {
            let status = match row.status {
                Some(code) => Span::styled(format!("{code} "), Style::default().fg(status_color(code))),
                None => Span::styled("ERR ", Style::default().fg(Color::Red)),
            };
            ListItem::new(Line::from(vec![
                status,
                Span::styled(
                    format!("{:7}", row.method.as_str()),
                    Style::default().fg(method_color(row.method)),
                ),
                Span::raw(row.url.clone()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(if state.active_panel == Panel::History {
            Style::default().fg(Color::Yellow).bold()
        } else {
            Style::default()
        });

    let mut list_state = ListState::default();
    if !state.history.is_empty() {
        list_state.select(Some(state.selected_history));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_environment(f: &mut Frame, state: &RenderState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(state, Panel::Environment))
        .title(format!(" Environment ({}) ", state.environment_len));

    let content = if state.environment_text.is_empty() && state.input_mode == InputMode::Normal {
        Text::styled("key=value per line", Style::default().fg(Color::DarkGray))
    } else {
        Text::raw(state.environment_text.as_str())
    };
    f.render_widget(Paragraph::new(content).block(block), area);
    set_text_cursor(f, state, Panel::Environment, &state.environment_text, area);
}

// ----------------------------------------------------------------------------
// Request / response workspace
// ----------------------------------------------------------------------------

fn draw_workspace(f: &mut Frame, state: &RenderState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Method + URL
            Constraint::Length(10), // Headers | Body
            Constraint::Min(5),     // Response
        ])
        .split(area);

    draw_url_bar(f, state, chunks[0]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);
    draw_headers_panel(f, state, middle[0]);
    draw_body_panel(f, state, middle[1]);

    draw_response(f, state, chunks[2]);
}

fn draw_url_bar(f: &mut Frame, state: &RenderState, area: Rect) {
    let loading = if state.is_loading { " [...]" } else { "" };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(state, Panel::Url))
        .title(format!(" {}{} ", state.method.as_str(), loading))
        .title_style(Style::default().fg(method_color(state.method)).bold());

    let content = if state.url.is_empty() && state.input_mode == InputMode::Normal {
        Text::styled("Enter a URL, e.g. {{base_url}}/posts", Style::default().fg(Color::DarkGray))
    } else {
        Text::raw(state.url.as_str())
    };
    f.render_widget(Paragraph::new(content).block(block), area);
    set_text_cursor(f, state, Panel::Url, &state.url, area);
}

fn draw_headers_panel(f: &mut Frame, state: &RenderState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(state, Panel::Headers))
        .title(" Headers (Name: value) ");

    let headers = Paragraph::new(state.headers_text.as_str()).block(block);
    f.render_widget(headers, area);
    set_text_cursor(f, state, Panel::Headers, &state.headers_text, area);
}

fn draw_body_panel(f: &mut Frame, state: &RenderState, area: Rect) {
    let accepts_body = state.method.accepts_body();
    let hint = match state.body_encoding {
        BodyEncoding::FormData | BodyEncoding::UrlEncoded => " key=value per line",
        _ => "",
    };
    let title = if accepts_body {
        format!(" Body: {} (b:cycle){} ", state.body_encoding.as_str(), hint)
    } else {
        format!(" Body (not sent with {}) ", state.method.as_str())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(state, Panel::Body))
        .title(title);

    let style = if accepts_body && state.body_encoding != BodyEncoding::None {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let body = Paragraph::new(state.body_text.as_str()).style(style).block(block);
    f.render_widget(body, area);
    set_text_cursor(f, state, Panel::Body, &state.body_text, area);
}

fn draw_response(f: &mut Frame, state: &RenderState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let selected = match state.response_view {
        ResponseView::Body => 0,
        ResponseView::Headers => 1,
    };
    f.render_widget(ui::render_tabs(&["Body", "Headers"], selected), chunks[0]);

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(state, Panel::Response));

    let show_headers = state.response_view == ResponseView::Headers;
    let lines: Vec<Line> = match &state.response {
        _ if state.is_loading => vec![Line::from("Sending request...")],
        None => vec![Line::styled(
            "Press 's' to send the request",
            Style::default().fg(Color::DarkGray),
        )],
        Some(result) => {
            let (label, color, meta) = response_summary(result);
            block = block
                .title(Span::styled(format!(" {label} "), Style::default().fg(color).bold()))
                .title_bottom(Line::from(format!(" {meta} ")).right_aligned());

            let text = response_text(result, show_headers);
            let structured = matches!(
                result,
                ExecutionResult::Success(data) if matches!(data.body, DecodedBody::Structured(_))
            );
            if structured && !show_headers {
                highlight_json(&text)
            } else {
                text.lines().map(|l| Line::from(l.to_string())).collect()
            }
        }
    };

    let response = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((state.response_scroll, 0));
    f.render_widget(response, chunks[1]);
}

// ----------------------------------------------------------------------------
// Status line and popups
// ----------------------------------------------------------------------------

fn draw_notice(f: &mut Frame, state: &RenderState, area: Rect) {
    let Some(notice) = &state.notice else {
        return;
    };
    let color = match notice.level {
        NoticeLevel::Info => Color::Green,
        NoticeLevel::Error => Color::Red,
    };
    let line = Paragraph::new(format!(" {}", notice.text)).style(Style::default().fg(color));
    f.render_widget(line, area);
}

fn draw_status_bar(f: &mut Frame, state: &RenderState, area: Rect) {
    let status = if state.prompt.is_some() {
        " Enter:confirm | Esc:cancel "
    } else if state.is_loading {
        " Sending... | Ctrl+X:cancel "
    } else if state.input_mode == InputMode::Editing {
        " Esc:stop editing | arrows:move | Ctrl+Enter:send "
    } else {
        match state.active_panel {
            Panel::Collections => " Enter:open/toggle | d:delete | x:export | X:export all | i:import | n:new ",
            Panel::History => " Enter:load | ↑/↓:select ",
            Panel::Environment => " e:edit | w:save now ",
            Panel::Response => " t:body/headers | ↑/↓:scroll ",
            _ => " Tab:panel | e:edit | m:method | b:body type | s:send | Ctrl+S:save | ?:help | q:quit ",
        }
    };

    let bar = Paragraph::new(Line::from(vec![
        Span::styled(format!(" {APP_NAME} "), Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::styled(status, Style::default().fg(Color::DarkGray)),
    ]));
    f.render_widget(bar, area);
}

fn draw_prompt_popup(f: &mut Frame, title: &str, input: &str, area: Rect) {
    let popup_area = centered_rect(60, 20, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .title_bottom(Line::from(" Enter to confirm, Esc to cancel ").right_aligned())
        .style(Style::default().bg(Color::Black));

    let input_widget = Paragraph::new(input.to_string())
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(input_widget, popup_area);

    let cursor_x = (popup_area.x + 1 + input.chars().count() as u16)
        .min(popup_area.x + popup_area.width.saturating_sub(2));
    f.set_cursor_position(Position::new(cursor_x, popup_area.y + 1));
}

fn draw_help_popup(f: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 80, area);

    let help_text = r#"
 COURIER - Keyboard Shortcuts

 NAVIGATION
   Tab / Shift+Tab    Switch panels
   c / h / v          Jump to collections / history / environment
   ↑ / ↓              Select item / scroll response

 REQUEST
   e / Enter          Edit focused field
   m                  Cycle HTTP method
   b                  Cycle body type
   s / Ctrl+Enter     Send request
   Ctrl+X             Cancel request in flight
   Ctrl+S             Save request to a collection

 COLLECTIONS
   n / Ctrl+N         New collection
   Enter              Open request / expand or collapse
   d                  Delete selected
   x / X              Export selected / export all
   i                  Import from file

 ENVIRONMENT
   key=value lines, saved shortly after editing
   w                  Save now

 GENERAL
   ?                  Toggle this help
   q / Ctrl+C         Quit

 Press any key to close...
"#;

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .style(Style::default().bg(Color::Black));

    let help = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
