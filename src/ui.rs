//! Presentation helpers shared by the drawing code

use ratatui::{prelude::*, widgets::*};

use crate::models::{DecodedBody, ExecutionResult, Headers, HttpMethod};

/// Renders tabs
pub fn render_tabs<'a>(titles: &[&'a str], selected: usize) -> Tabs<'a> {
    let titles: Vec<Line> = titles.iter().map(|t| Line::from(*t)).collect();

    Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(Style::default().fg(Color::Yellow).bold())
        .divider("|")
}

/// Simple JSON syntax highlighting
pub fn highlight_json(text: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for line in text.lines() {
        let mut spans = Vec::new();
        let mut current = String::new();
        let mut in_string = false;
        let mut is_key = false;
        let mut escaped = false;

        for (idx, c) in line.char_indices() {
            if in_string {
                current.push(c);
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    let color = if is_key { Color::Cyan } else { Color::Green };
                    spans.push(Span::styled(std::mem::take(&mut current), Style::default().fg(color)));
                    in_string = false;
                }
                continue;
            }

            match c {
                '"' => {
                    flush_plain(&mut spans, &mut current);
                    in_string = true;
                    is_key = line[idx..].contains("\":");
                    current.push(c);
                }
                ':' | ',' => {
                    flush_plain(&mut spans, &mut current);
                    spans.push(Span::styled(c.to_string(), Style::default().fg(Color::White)));
                }
                '{' | '}' | '[' | ']' => {
                    flush_plain(&mut spans, &mut current);
                    spans.push(Span::styled(c.to_string(), Style::default().fg(Color::Yellow)));
                }
                _ => current.push(c),
            }
        }
        flush_plain(&mut spans, &mut current);

        lines.push(Line::from(spans));
    }

    lines
}

/// Emit pending unquoted text, colouring literals and numbers
fn flush_plain(spans: &mut Vec<Span<'static>>, current: &mut String) {
    if current.is_empty() {
        return;
    }
    let text = std::mem::take(current);
    let token = text.trim();
    let style = if matches!(token, "true" | "false" | "null") {
        Style::default().fg(Color::Magenta)
    } else if !token.is_empty() && token.parse::<f64>().is_ok() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    spans.push(Span::styled(text, style));
}

/// Status class colour: 2xx success, 3xx warning, everything from 400 up is an error
pub fn status_color(code: u16) -> Color {
    match code {
        200..=299 => Color::Green,
        300..=399 => Color::Yellow,
        400..=u16::MAX => Color::Red,
        _ => Color::Gray,
    }
}

/// Method color
pub fn method_color(method: HttpMethod) -> Color {
    match method {
        HttpMethod::GET => Color::Green,
        HttpMethod::POST => Color::Yellow,
        HttpMethod::PUT => Color::Blue,
        HttpMethod::PATCH => Color::Cyan,
        HttpMethod::DELETE => Color::Red,
        HttpMethod::HEAD | HttpMethod::OPTIONS => Color::Magenta,
    }
}

/// Human-readable size with at most two decimals: `0 B`, `1.5 KB`, `2 MB`
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return String::from("0 B");
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// One `key: value` line per header
pub fn format_headers(headers: &Headers) -> String {
    headers
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Displayable text for a decoded body. Images cannot be drawn in a terminal.
pub fn body_text(body: &DecodedBody) -> String {
    match body {
        DecodedBody::Structured(value) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        DecodedBody::Text(text) | DecodedBody::Binary(text) => text.clone(),
        DecodedBody::ImageDataUri(uri) => {
            let mime = uri
                .strip_prefix("data:")
                .and_then(|rest| rest.split(';').next())
                .unwrap_or("image");
            format!("[{mime} image, {} characters of base64 data]", uri.len())
        }
    }
}

/// Title line pieces for the response panel: status label, its colour, and timing/size
pub fn response_summary(result: &ExecutionResult) -> (String, Color, String) {
    match result {
        ExecutionResult::Success(data) => (
            format!("{} {}", data.status, data.status_text),
            status_color(data.status),
            format!("{} ms | {}", data.response_time_ms, format_bytes(data.size_bytes)),
        ),
        ExecutionResult::Failure(data) => {
            let label = match (data.status, &data.code) {
                (Some(status), _) => format!("{status} {}", data.status_text.as_deref().unwrap_or("")),
                (None, Some(code)) => format!("Error ({code})"),
                (None, None) => String::from("Error"),
            };
            (label.trim_end().to_string(), Color::Red, format!("{} ms", data.response_time_ms))
        }
    }
}

/// Response panel text for either the body or the headers view
pub fn response_text(result: &ExecutionResult, show_headers: bool) -> String {
    match (result, show_headers) {
        (ExecutionResult::Success(data), false) => body_text(&data.body),
        (ExecutionResult::Success(data), true) => format_headers(&data.headers),
        (ExecutionResult::Failure(data), false) => match &data.raw_body_text {
            Some(raw) if !raw.is_empty() => format!("{}\n\n{}", data.message, raw),
            _ => data.message.clone(),
        },
        (ExecutionResult::Failure(data), true) => {
            data.headers.as_ref().map(format_headers).unwrap_or_default()
        }
    }
}
