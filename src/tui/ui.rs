//! UI layout and rendering logic for the TUI.

use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use super::app::{App, Focus, PopupState};

const COMPLETION_MARKER: &str = "[Program completed]";

/// Render the main UI
pub fn render_ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Editor and output
            Constraint::Length(3), // Stdin
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(main_layout[0]);

    render_editor(frame, app, panes[0]);
    render_output(frame, app, panes[1]);
    render_stdin(frame, app, main_layout[1]);
    render_status_bar(frame, app, main_layout[2]);

    if app.show_help {
        render_help_overlay(frame);
    }

    match &app.popup_state {
        PopupState::Warning(message) => render_message_popup(frame, "Warning", message, Color::Red),
        PopupState::Shared { url } => render_message_popup(frame, "Shared", url, Color::Green),
        PopupState::None => {}
    }
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Block::default().borders(Borders::ALL).title(title).border_style(style)
}

/// Column or row inside the border of `start`, saturating at the screen edge.
fn inner_offset(start: u16, cells: usize) -> u16 {
    start
        .saturating_add(1)
        .saturating_add(u16::try_from(cells).unwrap_or(u16::MAX))
}

/// First line index to show so that `cursor_line` stays inside `height` rows.
fn scroll_for(cursor_line: usize, height: usize) -> usize {
    if height == 0 {
        return 0;
    }
    cursor_line.saturating_sub(height - 1)
}

fn render_editor(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Editor && !app.is_popup_shown() && !app.show_help;
    let title = format!("Source [{}]", app.profile.display_mode);
    let height = area.height.saturating_sub(2) as usize;
    let (row, _) = app.editor.cursor();
    let top = scroll_for(row, height);

    let lines: Vec<Line> = app
        .editor
        .lines()
        .iter()
        .map(|l| Line::from(l.as_str()))
        .collect();
    let paragraph = Paragraph::new(Text::from(lines))
        .block(pane_block(title, focused))
        .scroll((top as u16, 0));
    frame.render_widget(paragraph, area);

    if focused {
        let x = inner_offset(area.x, app.editor.before_cursor().width());
        let y = inner_offset(area.y, row - top);
        if x < area.right().saturating_sub(1) && y < area.bottom().saturating_sub(1) {
            frame.set_cursor_position(Position::new(x, y));
        }
    }
}

fn render_output(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = app
        .transcript
        .text
        .lines()
        .map(|l| Line::from(l.to_string()))
        .collect();
    for notice in &app.transcript.notices {
        lines.push(Line::from(Span::styled(notice.clone(), Style::default().fg(Color::Yellow))));
    }
    if app.transcript.completed {
        lines.push(Line::from(Span::styled(
            COMPLETION_MARKER,
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )));
    }

    let title = if app.session.is_running() {
        "Output (running)".to_string()
    } else {
        "Output".to_string()
    };

    let available_height = area.height.saturating_sub(2) as usize;
    let total_lines = lines.len();
    let mut paragraph = Paragraph::new(Text::from(lines))
        .block(pane_block(title, false))
        .wrap(Wrap { trim: false });

    if total_lines > available_height {
        let max_scroll = total_lines - available_height;
        let offset = app.output_scroll_offset.min(max_scroll);
        paragraph = paragraph.scroll(((max_scroll - offset) as u16, 0));
    }

    frame.render_widget(paragraph, area);
}

fn render_stdin(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Stdin && !app.is_popup_shown() && !app.show_help;
    let line = app.session.input().current_line();
    let title = if app.session.is_running() {
        "Stdin (Enter sends the line)"
    } else {
        "Stdin (available while a program runs)"
    };
    let style = if app.session.is_running() {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let paragraph = Paragraph::new(line.to_string())
        .style(style)
        .block(pane_block(title.to_string(), focused));
    frame.render_widget(paragraph, area);

    if focused {
        let x = inner_offset(area.x, line.width());
        if x < area.right().saturating_sub(1) {
            frame.set_cursor_position(Position::new(x, area.y + 1));
        }
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status_text = match &app.snapshot {
        Some(id) => format!("{} | snapshot {}", app.status_message, id),
        None => app.status_message.clone(),
    };
    let status_paragraph =
        Paragraph::new(status_text).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(status_paragraph, area);
}

fn render_help_overlay(frame: &mut Frame) {
    let popup_area = centered_rect(70, 70, frame.area());
    frame.render_widget(Clear, popup_area);

    let help_lines = vec![
        Line::from("Editor Help"),
        Line::from(""),
        Line::from("Programs:"),
        Line::from("  Ctrl+R / F5  - Run the source"),
        Line::from("  Ctrl+S       - Share as a snapshot"),
        Line::from("  F2 / F3      - Next / previous language"),
        Line::from(""),
        Line::from("While running:"),
        Line::from("  Tab          - Switch between source and stdin"),
        Line::from("  Enter        - Send the typed line to the program"),
        Line::from(""),
        Line::from("Output:"),
        Line::from("  PgUp / PgDn  - Scroll"),
        Line::from(""),
        Line::from("  F1           - Toggle this help"),
        Line::from("  Ctrl+C / Ctrl+Q - Quit"),
    ];

    let help_paragraph = Paragraph::new(Text::from(help_lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help")
                .title_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(help_paragraph, popup_area);
}

fn render_message_popup(frame: &mut Frame, title: &str, message: &str, color: Color) {
    let popup_area = centered_rect(60, 30, frame.area());
    frame.render_widget(Clear, popup_area);

    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(2)])
        .split(popup_area);

    let body = Paragraph::new(message.to_string())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string())
                .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(body, popup_layout[0]);

    let instructions = Paragraph::new("Press any key to close")
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(instructions, popup_layout[1]);
}

/// Helper function to create a centered rectangle
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
