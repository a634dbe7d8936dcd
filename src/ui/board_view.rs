use chrono::{DateTime, Utc};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Padding, Paragraph, Scrollbar, ScrollbarOrientation,
    ScrollbarState,
};
use ratatui::Frame;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use super::theme::Theme;
use crate::app::{App, ColumnView};
use crate::board::age::format_age_opt;
use crate::board::Card;

/// Truncate `text` to `max_width` display columns, ending in `…` when cut.
///
/// Works on grapheme clusters so wide and combined characters stay intact.
pub(crate) fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let avail = max_width - 1;
    let truncated: String = text
        .graphemes(true)
        .scan(0, |w, g| {
            let gw = g.width();
            (*w + gw <= avail).then(|| {
                *w += gw;
                g
            })
        })
        .collect();
    format!("{truncated}…")
}

/// Border color for a card.
///
/// A card whose move is still in flight is always highlighted. Otherwise
/// only cards in unfocused columns are dimmed; selection is expressed via
/// `BorderType::Thick + Modifier::BOLD`, not via color.
pub(crate) fn card_border_color(pending: bool, is_col_focused: bool) -> Color {
    if pending {
        Theme::CARD_PENDING
    } else if is_col_focused {
        Theme::CARD_BORDER
    } else {
        Theme::DIM
    }
}

/// Header count: `shown/total` while filters hide cards, else the total.
pub(crate) fn count_label(shown: usize, total: usize) -> String {
    if shown == total {
        total.to_string()
    } else {
        format!("{shown}/{total}")
    }
}

/// First row to draw so `selected` stays inside a window of `max_visible`.
pub(crate) fn scroll_offset(selected: usize, len: usize, max_visible: usize) -> usize {
    if len > max_visible && selected >= max_visible {
        selected - max_visible + 1
    } else {
        0
    }
}

pub fn render_board(f: &mut Frame, area: Rect, app: &App, now: DateTime<Utc>) {
    let columns = app.columns();
    if columns.is_empty() {
        f.render_widget(Paragraph::new("No grouping field selected."), area);
        return;
    }

    // Split area evenly among columns
    let constraints: Vec<Constraint> = columns
        .iter()
        .map(|_| Constraint::Ratio(1, columns.len() as u32))
        .collect();
    let col_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    let pending = app.moves.pending().map(|p| p.item_id.as_str());
    for (idx, col) in columns.iter().enumerate() {
        render_column(f, col_areas[idx], app, col, idx, pending, now);
    }
}

fn render_column(
    f: &mut Frame,
    area: Rect,
    app: &App,
    col: &ColumnView,
    idx: usize,
    pending: Option<&str>,
    now: DateTime<Utc>,
) {
    let is_focused = app.view.focused_column == idx;
    let focused_mod = if is_focused { Modifier::BOLD } else { Modifier::empty() };

    let mut header = Vec::new();
    if app.view.move_mode && idx < 9 {
        header.push(Span::styled(
            format!(" {}", idx + 1),
            Style::default()
                .fg(Theme::MOVE_TARGET)
                .add_modifier(Modifier::BOLD),
        ));
    }
    if !col.color.is_empty() {
        header.push(Span::styled(
            " ●",
            Style::default().fg(Theme::option_color(&col.color)),
        ));
    }
    header.push(Span::styled(
        format!(" {} ", col.name),
        Style::default()
            .fg(Theme::COLUMN_HEADER)
            .add_modifier(Modifier::BOLD),
    ));
    header.push(Span::styled(
        format!("({})", count_label(col.card_ids.len(), col.total)),
        Theme::dim_style(),
    ));

    let border_color = if is_focused {
        Theme::COLUMN_FOCUSED_BORDER
    } else {
        Theme::COLUMN_BORDER
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color).add_modifier(focused_mod))
        .border_type(BorderType::Rounded)
        .title(Line::from(header))
        .padding(Padding::new(1, 1, 0, 0));

    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let card_height: u16 = 5; // 3 inner lines + 2 border lines
    let max_visible = (inner.height / card_height).max(1) as usize;
    let selected = app.view.selected_in(&col.key);
    let offset = if is_focused {
        scroll_offset(selected, col.card_ids.len(), max_visible)
    } else {
        0
    };

    for (row, id) in col.card_ids.iter().enumerate().skip(offset).take(max_visible) {
        let Ok(card) = app.store.card(id) else {
            continue;
        };
        let y = inner.y + ((row - offset) as u16 * card_height);
        let height = card_height.min(inner.y + inner.height - y);
        let card_area = Rect::new(inner.x, y, inner.width, height);
        let is_selected = is_focused && row == selected;
        let is_pending = pending == Some(card.item_id.as_str());
        render_card(f, card_area, &card, is_selected, is_focused, is_pending, now);
    }

    if col.card_ids.len() > max_visible {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
        let mut scrollbar_state = ScrollbarState::new(col.card_ids.len()).position(offset);
        f.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
    }
}

fn render_card(
    f: &mut Frame,
    area: Rect,
    card: &Card,
    is_selected: bool,
    is_col_focused: bool,
    is_pending: bool,
    now: DateTime<Utc>,
) {
    if area.width < 4 || area.height < 3 {
        return;
    }

    let selected_mod = if is_selected { Modifier::BOLD } else { Modifier::empty() };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(
            Style::default()
                .fg(card_border_color(is_pending, is_col_focused))
                .add_modifier(selected_mod),
        )
        .border_type(if is_selected { BorderType::Thick } else { BorderType::Rounded });

    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.height == 0 || inner.width < 2 {
        return;
    }
    let width = inner.width as usize;

    // Line 1: marker, kind/number, age
    let marker = if is_selected { "> " } else { "  " };
    let suffix = card.suffix().unwrap_or_default();
    let age = format_age_opt(card.created_at, now);
    let mut line1 = vec![
        Span::styled(marker, Style::default().fg(Theme::FG).add_modifier(selected_mod)),
        Span::styled(suffix, Style::default().fg(Theme::DIM).add_modifier(selected_mod)),
        Span::raw(" "),
        Span::styled(age, Style::default().fg(Theme::DIM)),
    ];
    if !card.state.is_empty() {
        line1.push(Span::raw(" "));
        line1.push(Span::styled(
            card.state.to_lowercase(),
            Style::default().fg(Theme::state_color(&card.state)),
        ));
    }

    // Line 2: title
    let title = format!("  {}", truncate_to_width(&card.title, width.saturating_sub(2)));
    let title_line = Line::from(Span::styled(
        title,
        Style::default().fg(Theme::CARD_TITLE).add_modifier(selected_mod),
    ));

    f.render_widget(
        Paragraph::new(Line::from(line1)),
        Rect::new(inner.x, inner.y, inner.width, 1),
    );
    if inner.height >= 2 {
        f.render_widget(
            Paragraph::new(title_line),
            Rect::new(inner.x, inner.y + 1, inner.width, 1),
        );
    }

    // Line 3: assignees + labels
    let has_metadata = !card.assignees.is_empty() || !card.labels.is_empty();
    if inner.height >= 3 && has_metadata {
        let mut spans = vec![Span::raw("  ")];
        let mut need_sep = false;
        for assignee in &card.assignees {
            if need_sep {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::styled(
                format!("@{assignee}"),
                Style::default().fg(Theme::ASSIGNEE).add_modifier(selected_mod),
            ));
            need_sep = true;
        }
        for label in &card.labels {
            if need_sep {
                spans.push(Span::styled(" · ", Theme::dim_style()));
            }
            spans.push(Span::styled(
                label.as_str(),
                Style::default().fg(Theme::label_color(label)),
            ));
            need_sep = true;
        }
        f.render_widget(
            Paragraph::new(Line::from(spans)),
            Rect::new(inner.x, inner.y + 2, inner.width, 1),
        );
    }
}
