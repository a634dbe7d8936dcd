use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use super::theme::Theme;
use crate::app::{ColumnView, Picker, PickerItem};

/// Render a full-screen picker: title, query line, then the matching items.
pub fn render_picker<T: PickerItem + Clone>(f: &mut Frame, area: Rect, picker: &Picker<T>) {
    let visible = picker.visible();
    let labels: Vec<String> = visible.iter().map(|item| item.label()).collect();

    let max_label_len = labels.iter().map(|l| l.width()).max().unwrap_or(0);
    let popup_width = ((max_label_len + 6) as u16)
        .max(40)
        .max(picker.title.width() as u16 + 4)
        .min(area.width.saturating_sub(4));
    let popup_height = (labels.len() as u16 + 4).max(5).min(area.height.saturating_sub(2));
    let popup_area = super::centered_rect(area, 0, 0, popup_width, popup_height);

    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(ratatui::widgets::BorderType::Rounded)
        .border_style(Style::default().fg(Theme::FG))
        .title(Span::styled(
            format!(" {} ", picker.title),
            Style::default()
                .fg(Theme::FG)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    if inner.height == 0 {
        return;
    }

    // Query line
    let query = Line::from(vec![
        Span::styled(" / ", Style::default().fg(Theme::DIM)),
        Span::raw(picker.query.input.as_str()),
        Span::raw("_"),
    ]);
    f.render_widget(Paragraph::new(query), Rect::new(inner.x, inner.y, inner.width, 1));

    let list_height = inner.height.saturating_sub(2) as usize;
    if list_height == 0 {
        return;
    }
    if labels.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled("  no matches", Theme::dim_style())),
            Rect::new(inner.x, inner.y + 2, inner.width, 1),
        );
        return;
    }

    let offset = picker.selected.saturating_sub(list_height - 1);
    let query_lower = picker.query.input.to_lowercase();
    for (row, (i, label)) in labels.iter().enumerate().skip(offset).take(list_height).enumerate() {
        let is_selected = i == picker.selected;
        let mut spans = vec![Span::raw(if is_selected { "> " } else { "  " })];
        spans.extend(highlight_match(label, &query_lower, is_selected));
        f.render_widget(
            Paragraph::new(Line::from(spans)),
            Rect::new(inner.x, inner.y + 2 + row as u16, inner.width, 1),
        );
    }
}

/// Highlight a contiguous substring match of `query_lower` in `text`.
/// Fuzzy matches without a contiguous run are shown unhighlighted.
pub(crate) fn highlight_match(text: &str, query_lower: &str, is_selected: bool) -> Vec<Span<'static>> {
    let base_mod = if is_selected {
        Modifier::BOLD | Modifier::REVERSED
    } else {
        Modifier::empty()
    };
    let plain = |s: &str| Span::styled(s.to_string(), Style::default().fg(Theme::FG).add_modifier(base_mod));

    let text_lower = text.to_lowercase();
    // Lowercasing can change byte lengths; only highlight when offsets line up
    let found = (!query_lower.is_empty() && text_lower.len() == text.len())
        .then(|| text_lower.find(query_lower))
        .flatten()
        .filter(|&start| text.is_char_boundary(start) && text.is_char_boundary(start + query_lower.len()));

    match found {
        Some(start) => {
            let end = start + query_lower.len();
            let mut spans = Vec::new();
            if start > 0 {
                spans.push(plain(&text[..start]));
            }
            spans.push(Span::styled(
                text[start..end].to_string(),
                Style::default()
                    .fg(Theme::HINT_KEY)
                    .add_modifier(Modifier::UNDERLINED | base_mod),
            ));
            if end < text.len() {
                spans.push(plain(&text[end..]));
            }
            spans
        }
        None => vec![plain(text)],
    }
}

/// Popup listing move targets by number while in move mode.
pub fn render_move_popup(f: &mut Frame, area: Rect, columns: &[ColumnView]) {
    let targets: Vec<(String, &str)> = columns
        .iter()
        .take(9)
        .enumerate()
        .map(|(i, c)| ((i + 1).to_string(), c.name.as_str()))
        .collect();
    if targets.is_empty() {
        return;
    }

    let max_name_len = targets.iter().map(|(_, n)| n.width()).max().unwrap_or(0);
    let popup_width = ((max_name_len + 8) as u16).max(16).min(area.width);
    let popup_height = (targets.len() as u16 + 2).min(area.height);
    let x = area.x + area.width.saturating_sub(popup_width);
    let y = area.y + area.height.saturating_sub(popup_height);
    let popup_area = Rect::new(x, y, popup_width, popup_height);

    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(ratatui::widgets::BorderType::Rounded)
        .border_style(Style::default().fg(Theme::FG))
        .title(Span::styled(
            " move to ",
            Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    for (i, (key, name)) in targets.iter().enumerate() {
        if i >= inner.height as usize {
            break;
        }
        let line = Line::from(vec![
            Span::raw(" "),
            Span::styled(
                key.clone(),
                Style::default()
                    .fg(Theme::MOVE_TARGET)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(*name, Style::default().fg(Theme::HINT_DESC)),
        ]);
        f.render_widget(
            Paragraph::new(line),
            Rect::new(inner.x, inner.y + i as u16, inner.width, 1),
        );
    }
}
