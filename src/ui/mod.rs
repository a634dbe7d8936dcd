pub mod board_view;
pub mod card_detail;
pub mod help;
pub mod input_modal;
pub mod status_bar;
pub mod theme;

use chrono::{DateTime, Utc};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::{App, Mode, Screen};
use theme::Theme;

/// Create a centered rect within `area` using percentage-based sizing with minimums.
pub fn centered_rect(area: Rect, w_pct: u16, h_pct: u16, min_w: u16, min_h: u16) -> Rect {
    let width = (area.width * w_pct / 100).max(min_w).min(area.width);
    let height = (area.height * h_pct / 100).max(min_h).min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}

/// Area for the card detail overlay.
pub fn overlay_rect(area: Rect) -> Rect {
    centered_rect(area, 80, 90, 50, 12)
}

pub fn render(f: &mut Frame, app: &mut App, now: DateTime<Utc>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    status_bar::render_header(f, chunks[0], app);

    match &mut app.screen {
        Screen::Loading { message } => render_message(f, chunks[1], "Loading", message, false),
        Screen::Error { message } => render_message(f, chunks[1], "Error", message, true),
        Screen::OwnerSelect(picker) => input_modal::render_picker(f, chunks[1], picker),
        Screen::ProjectSelect(picker) => input_modal::render_picker(f, chunks[1], picker),
        Screen::FieldSelect { picker, .. } => input_modal::render_picker(f, chunks[1], picker),
        Screen::Board => {}
        Screen::Detail(_) => {}
    }

    if matches!(app.screen, Screen::Board | Screen::Detail(_)) {
        board_view::render_board(f, chunks[1], app, now);
    }

    // Overlays
    match app.mode() {
        Mode::MoveTo => input_modal::render_move_popup(f, chunks[1], &app.columns()),
        Mode::Help => help::render_help(f, f.area()),
        _ => {}
    }
    if let Screen::Detail(detail) = &mut app.screen {
        if let Ok(card) = app.store.card(&detail.item_id) {
            card_detail::render_card_detail(f, chunks[1], &card, detail, now);
        }
    }

    status_bar::render_status_bar(f, chunks[2], app);
}

fn render_message(f: &mut Frame, area: Rect, title: &str, message: &str, is_error: bool) {
    let panel = centered_rect(area, 60, 30, 40, 7);
    let color = if is_error { Theme::STATUS_ERROR } else { Theme::FG };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    let mut lines = vec![Line::from(""), Line::from(format!(" {message}"))];
    if is_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(" Press any key to exit", Theme::dim_style())));
    }
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        panel,
    );
}
