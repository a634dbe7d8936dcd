use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use super::theme::Theme;
use crate::app::{App, Mode, NotificationLevel, Screen};
use crate::input::keymap::mode_bindings;

/// Top line: project, grouping field, load progress.
pub fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        " ghboard ",
        Style::default()
            .fg(Theme::FG)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED),
    )];
    if let Some(owner) = app.owner() {
        spans.push(Span::styled(format!(" {}", owner.login), Theme::dim_style()));
    }
    if let Some(project) = app.store.project() {
        spans.push(Span::styled(
            format!(" / #{} {}", project.number, project.title),
            Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD),
        ));
    }
    if let Some(field) = app.store.group_field() {
        spans.push(Span::styled(format!("  by {}", field.name), Theme::dim_style()));
    }
    spans.push(Span::styled(
        format!("  {} cards", app.store.card_count()),
        Theme::dim_style(),
    ));
    if let Some(label) = load_label(app) {
        spans.push(Span::styled(format!("  {label}"), Style::default().fg(Theme::LOADING)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Progress text for the header, if anything is loading or left to load.
pub(crate) fn load_label(app: &App) -> Option<&'static str> {
    if app.paginator.is_reloading() {
        Some("reloading...")
    } else if app.paginator.is_loading() {
        Some("loading...")
    } else if app.store.pagination().1 {
        Some("more available (L)")
    } else {
        None
    }
}

pub fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    // Filter input takes over the entire bar
    if let Some(buf) = &app.view.filter_input {
        let line = Line::from(vec![
            Span::styled(
                " / ",
                Style::default()
                    .fg(Theme::FG)
                    .add_modifier(Modifier::BOLD | Modifier::REVERSED),
            ),
            Span::raw(format!(" {}", buf.input)),
            Span::raw("_"),
        ]);
        f.render_widget(Paragraph::new(line).style(Theme::status_style()), area);
        return;
    }

    // Three-zone layout
    let left = build_left_zone(app);
    let right = build_right_zone(app);

    let left_width: usize = left.iter().map(|s| s.content.width()).sum();
    let right_width: usize = right.iter().map(|s| s.content.width()).sum();
    let total_width = area.width as usize;

    // Center zone: notification, else key hints
    let center_avail = total_width.saturating_sub(left_width + right_width);
    let center = build_center_zone(app, center_avail);

    let mut spans = left;
    spans.extend(center);
    spans.extend(right);

    f.render_widget(
        Paragraph::new(Line::from(spans)).style(Theme::status_style()),
        area,
    );
}

pub(crate) fn mode_label(mode: Mode) -> &'static str {
    match mode {
        Mode::Loading => "LOADING",
        Mode::Error => "ERROR",
        Mode::Picker => "SELECT",
        Mode::Board => "BOARD",
        Mode::MoveTo => "MOVE",
        Mode::Filter => "FILTER",
        Mode::Help => "HELP",
        Mode::Detail => "DETAIL",
        Mode::Compose | Mode::ConfirmDiscard => "COMMENT",
    }
}

/// Mode badge plus active filters.
fn build_left_zone(app: &App) -> Vec<Span<'_>> {
    let mut spans = vec![
        Span::styled(
            format!(" {} ", mode_label(app.mode())),
            Style::default()
                .fg(Theme::FG)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        ),
        Span::raw(" "),
    ];
    if !app.view.filter.is_empty() {
        spans.push(Span::styled(format!("/{} ", app.view.filter), Style::default().fg(Theme::FG)));
    }
    if app.view.mine_only {
        let login = app.store.viewer_login().unwrap_or("me");
        spans.push(Span::styled(format!("@{login} "), Style::default().fg(Theme::ASSIGNEE)));
    }
    spans
}

/// Focused column and position within it.
fn build_right_zone(app: &App) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    if matches!(app.screen, Screen::Board) {
        let columns = app.columns();
        if let Some(col) = columns.get(app.view.focused_column) {
            let count = col.card_ids.len();
            let pos = if count > 0 {
                format!(" {}/{}", app.view.selected_in(&col.key) + 1, count)
            } else {
                " 0".to_string()
            };
            spans.push(Span::styled(col.name.clone(), Style::default().fg(Theme::DIM)));
            spans.push(Span::styled(pos, Style::default().fg(Theme::FG)));
        }
    }
    spans.push(Span::raw(" "));
    spans
}

fn build_center_zone(app: &App, avail_width: usize) -> Vec<Span<'_>> {
    if let Some(notif) = app.notification() {
        let color = match notif.level {
            NotificationLevel::Info => Theme::FG,
            NotificationLevel::Error => Theme::STATUS_ERROR,
        };
        let notif_width = notif.message.width();
        if notif_width >= avail_width {
            let truncated = super::board_view::truncate_to_width(&notif.message, avail_width);
            return vec![Span::styled(truncated, Style::default().fg(color))];
        }

        // Center the notification in the available space
        let pad_total = avail_width - notif_width;
        let pad_left = pad_total / 2;
        let pad_right = pad_total - pad_left;
        return vec![
            Span::raw(" ".repeat(pad_left)),
            Span::styled(notif.message.as_str(), Style::default().fg(color)),
            Span::raw(" ".repeat(pad_right)),
        ];
    }

    let hints = hint_text(app.mode());
    let hints = super::board_view::truncate_to_width(&hints, avail_width);
    let pad = avail_width.saturating_sub(hints.width());
    vec![
        Span::styled(hints, Theme::dim_style()),
        Span::raw(" ".repeat(pad)),
    ]
}

/// `key description` pairs flagged as hints for the mode.
pub(crate) fn hint_text(mode: Mode) -> String {
    mode_bindings(mode)
        .iter()
        .filter(|b| b.hint)
        .map(|b| format!("{} {}", b.key, b.description.to_lowercase()))
        .collect::<Vec<_>>()
        .join("  ")
}
