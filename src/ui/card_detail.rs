use chrono::{DateTime, Utc};
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Clear, Padding, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
    Wrap,
};
use ratatui::Frame;

use super::theme::Theme;
use crate::app::{CommentsState, DetailState};
use crate::board::age::format_age_opt;
use crate::board::{Card, Comment};

/// Lines of the metadata block, body and comment thread.
pub(crate) fn detail_lines<'a>(
    card: &'a Card,
    comments: &'a CommentsState,
    width: u16,
    now: DateTime<Utc>,
) -> Vec<Line<'a>> {
    let mut lines = Vec::new();

    lines.push(Line::from(Span::styled(
        card.title.as_str(),
        Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));

    let mut kind = vec![
        Span::styled("Type:     ", Theme::dim_style()),
        Span::raw(card.content.as_str()),
    ];
    if !card.state.is_empty() {
        kind.push(Span::raw(" · "));
        kind.push(Span::styled(
            card.state.to_lowercase(),
            Style::default().fg(Theme::state_color(&card.state)),
        ));
    }
    lines.push(Line::from(kind));

    if !card.repo.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Repo:     ", Theme::dim_style()),
            Span::raw(format!("{}#{}", card.repo, card.number)),
        ]));
    }
    if !card.author.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Author:   ", Theme::dim_style()),
            Span::raw(card.author.as_str()),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled("Age:      ", Theme::dim_style()),
        Span::raw(format_age_opt(card.created_at, now)),
    ]));

    if !card.assignees.is_empty() {
        let mut spans = vec![Span::styled("Assigned: ", Theme::dim_style())];
        for (i, assignee) in card.assignees.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(", "));
            }
            spans.push(Span::styled(
                assignee.as_str(),
                Style::default().fg(Theme::ASSIGNEE),
            ));
        }
        lines.push(Line::from(spans));
    }

    if !card.labels.is_empty() {
        let mut spans = vec![Span::styled("Labels:   ", Theme::dim_style())];
        for (i, label) in card.labels.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" · "));
            }
            spans.push(Span::styled(
                label.as_str(),
                Style::default().fg(Theme::label_color(label)),
            ));
        }
        lines.push(Line::from(spans));
    }

    if !card.url.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("URL:      ", Theme::dim_style()),
            Span::styled(card.url.as_str(), Theme::dim_style()),
        ]));
    }

    let rule = || Line::from(Span::styled("─".repeat(width as usize), Theme::dim_style()));

    if !card.body.is_empty() {
        lines.push(Line::from(""));
        lines.push(rule());
        lines.push(Line::from(""));
        lines.extend(card.body.lines().map(Line::from));
    }

    match comments {
        CommentsState::Unavailable => {}
        CommentsState::Loading => {
            lines.push(Line::from(""));
            lines.push(rule());
            lines.push(Line::from(Span::styled("Loading comments...", Theme::dim_style())));
        }
        CommentsState::Failed(reason) => {
            lines.push(Line::from(""));
            lines.push(rule());
            lines.push(Line::from(Span::styled(
                format!("Could not load comments: {reason}"),
                Style::default().fg(Theme::STATUS_ERROR),
            )));
        }
        CommentsState::Loaded(comments) => {
            lines.push(Line::from(""));
            lines.push(rule());
            lines.push(Line::from(Span::styled(
                format!("Comments ({})", comments.len()),
                Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD),
            )));
            for comment in comments {
                lines.push(Line::from(""));
                lines.push(comment_header(comment, now));
                lines.extend(comment.body.lines().map(|l| Line::from(format!("  {l}"))));
            }
        }
    }

    lines
}

fn comment_header(comment: &Comment, now: DateTime<Utc>) -> Line<'_> {
    let author = comment.author.as_deref().unwrap_or("ghost");
    let mut spans = vec![
        Span::styled(format!("@{author}"), Style::default().fg(Theme::ASSIGNEE)),
        Span::styled(format!(" {}", format_age_opt(comment.created_at, now)), Theme::dim_style()),
    ];
    if comment.updated_at.is_some() && comment.updated_at != comment.created_at {
        spans.push(Span::styled(" (edited)", Theme::dim_style()));
    }
    Line::from(spans)
}

pub fn render_card_detail(
    f: &mut Frame,
    area: Rect,
    card: &Card,
    detail: &mut DetailState,
    now: DateTime<Utc>,
) {
    let panel_area = super::overlay_rect(area);

    // Clear background
    f.render_widget(Clear, panel_area);

    let title = match card.suffix() {
        Some(suffix) => format!(" {suffix} "),
        None => " Card ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(ratatui::widgets::BorderType::Rounded)
        .border_style(Style::default().fg(Theme::FG))
        .title(Span::styled(
            title,
            Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD),
        ))
        .padding(Padding::new(2, 2, 1, 1));

    let inner = block.inner(panel_area);
    f.render_widget(block, panel_area);

    if inner.height == 0 {
        return;
    }

    // Compose box takes the lower part of the panel
    let (content_area, compose_area) = if detail.compose.is_some() && inner.height > 8 {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(7)])
            .split(inner);
        (chunks[0], Some(chunks[1]))
    } else {
        (inner, None)
    };

    let lines = detail_lines(card, &detail.comments, content_area.width, now);
    let line_count = lines.len();
    let max_scroll = (line_count as u16).saturating_sub(content_area.height);
    detail.scroll = detail.scroll.min(max_scroll);

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((detail.scroll, 0));
    f.render_widget(paragraph, content_area);

    if max_scroll > 0 {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .track_symbol(Some("│"))
            .thumb_symbol("▐")
            .begin_symbol(None)
            .end_symbol(None);
        let mut scrollbar_state =
            ScrollbarState::new(max_scroll as usize + 1).position(detail.scroll as usize);
        let scrollbar_area = panel_area.inner(Margin {
            vertical: 2,
            horizontal: 0,
        });
        f.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);
    }

    if let (Some(area), Some(buf)) = (compose_area, detail.compose.as_ref()) {
        let title = if detail.posting {
            " Posting... "
        } else if detail.confirm_discard {
            " Discard comment? (y)es / (n)o / (s)ave "
        } else {
            " New comment (C-s post, Esc stop) "
        };
        let border = if detail.confirm_discard {
            Theme::STATUS_ERROR
        } else {
            Theme::FG
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(ratatui::widgets::BorderType::Rounded)
            .border_style(Style::default().fg(border))
            .title(Span::styled(title, Style::default().add_modifier(Modifier::BOLD)));
        let text = format!("{}_", buf.input);
        // Keep the cursor end in view
        let box_height = area.height.saturating_sub(2);
        let text_lines = text.lines().count() as u16;
        let scroll = text_lines.saturating_sub(box_height);
        f.render_widget(
            Paragraph::new(text)
                .block(block)
                .wrap(Wrap { trim: false })
                .scroll((scroll, 0)),
            area,
        );
    }
}
