//! Drawing. Everything here reads `App` and never mutates it.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

use formchat_core::{
    display::{self, NOT_SET},
    models::{Form, FormStatus, Message, MessageKind},
    views::{
        ChatDetail, ChatList, FormHistory, HistoryState, NoticeKind, chat_detail::DELETE_PROMPT,
        history,
    },
};

use crate::markdown::render_markdown;
use crate::{App, AppMode, EditField, View, filter_label};

pub fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    match &app.view {
        View::ChatList(list) => draw_chat_list(f, list, chunks[0]),
        View::ChatDetail(detail) => draw_chat_detail(f, app, detail, chunks[0]),
        View::History(history) => draw_history(f, app, history, chunks[0]),
    }
    draw_status_bar(f, app, chunks[1]);

    match &app.mode {
        AppMode::Help { scroll } => draw_help_overlay(f, *scroll),
        AppMode::ConfirmDelete => draw_delete_overlay(f),
        AppMode::Notice => {
            if let View::ChatDetail(detail) = &app.view
                && let Some(notice) = detail.notice()
            {
                draw_notice_overlay(f, notice.kind, &notice.message);
            }
        }
        AppMode::Normal | AppMode::Input | AppMode::EditForm => {}
    }
}

// =============================================================================
// Chat List
// =============================================================================

fn draw_chat_list(f: &mut Frame, list: &ChatList, area: Rect) {
    let block = Block::default()
        .title(" Chats (n: new chat, Enter: open) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if list.chats().is_loading() {
        f.render_widget(Paragraph::new("Loading..."), inner);
        return;
    }
    if let Some(err) = list.chats().error() {
        f.render_widget(
            Paragraph::new(format!("Failed to load chats: {err}")).fg(Color::Red),
            inner,
        );
        return;
    }
    if list.is_empty() {
        f.render_widget(
            Paragraph::new("No chats yet. Press n to start one.").fg(Color::DarkGray),
            inner,
        );
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let header = Line::from(vec![
        Span::styled(format!("  {:<38}", "ID"), Style::default().bold()),
        Span::styled("Created", Style::default().bold()),
    ]);
    f.render_widget(Paragraph::new(header), rows[0]);

    let items: Vec<ListItem> = list
        .rows()
        .into_iter()
        .map(|row| ListItem::new(format!("{:<38}{}", row.id, row.created_at)))
        .collect();
    let widget = List::new(items)
        .highlight_symbol("> ")
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    let mut state = ListState::default().with_selected(Some(list.selected()));
    f.render_stateful_widget(widget, rows[1], &mut state);
}

// =============================================================================
// Chat Detail
// =============================================================================

fn draw_chat_detail(f: &mut Frame, app: &App, detail: &ChatDetail, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(columns[0]);

    draw_transcript(f, app, detail, left[0]);
    draw_input(f, app, detail, left[1]);
    if detail.editing().is_some() {
        draw_edit_form(f, app, detail, columns[1]);
    } else {
        draw_forms(f, app, detail, columns[1]);
    }
}

fn draw_transcript(f: &mut Frame, app: &App, detail: &ChatDetail, area: Rect) {
    let block = Block::default()
        .title(format!(" Chat Window: {} ", detail.chat_id()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    f.render_widget(block, area);

    // pre-wrapped so the row count used for bottom-anchoring is exact
    let lines = wrap_lines(
        build_message_lines(detail.transcript()),
        usize::from(inner.width),
    );
    let height = usize::from(inner.height);
    let bottom = lines.len().saturating_sub(height);
    let top = bottom.saturating_sub(app.transcript_scroll);

    let scroll = u16::try_from(top).unwrap_or(u16::MAX);
    let paragraph = Paragraph::new(lines).scroll((scroll, 0));
    f.render_widget(paragraph, inner);
}

/// Break lines wider than `width` columns into several rows, keeping span
/// styles and line alignment.
pub fn wrap_lines(lines: Vec<Line<'static>>, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut rows = Vec::with_capacity(lines.len());
    for line in lines {
        if line.width() <= width {
            rows.push(line);
            continue;
        }

        let finish = |spans: Vec<Span<'static>>| {
            let row = Line::from(spans).style(line.style);
            match line.alignment {
                Some(alignment) => row.alignment(alignment),
                None => row,
            }
        };
        let mut row: Vec<Span<'static>> = Vec::new();
        let mut row_width = 0;
        for span in &line.spans {
            let mut chunk = String::new();
            for c in span.content.chars() {
                let mut buf = [0u8; 4];
                let w = Span::raw(&*c.encode_utf8(&mut buf)).width();
                if row_width + w > width && row_width > 0 {
                    if !chunk.is_empty() {
                        row.push(Span::styled(std::mem::take(&mut chunk), span.style));
                    }
                    rows.push(finish(std::mem::take(&mut row)));
                    row_width = 0;
                }
                chunk.push(c);
                row_width += w;
            }
            if !chunk.is_empty() {
                row.push(Span::styled(chunk, span.style));
            }
        }
        if !row.is_empty() {
            rows.push(finish(row));
        }
    }
    rows
}

/// One block per displayable message. Roles outside user/assistant/tool are
/// skipped.
pub fn build_message_lines(messages: &[Message]) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    for msg in messages {
        match msg.kind() {
            MessageKind::User { content } => {
                lines.push(Line::from("[YOU]").fg(Color::Red).bold());
                lines.extend(content.lines().map(|l| Line::from(l.to_string())));
            }
            MessageKind::Assistant { content } => {
                lines.push(Line::from("[ASSISTANT]").fg(Color::Blue).bold().right_aligned());
                lines.extend(render_markdown(content));
            }
            MessageKind::AssistantWithTools { calls } => {
                for call in calls {
                    lines.push(
                        Line::from(vec![
                            Span::raw("Calling function "),
                            Span::styled(call.function.name.clone(), Style::default().bold()),
                        ])
                        .fg(Color::Magenta)
                        .right_aligned(),
                    );
                    lines.extend(
                        call.function
                            .arguments
                            .lines()
                            .map(|l| Line::from(l.to_string()).fg(Color::Gray)),
                    );
                }
            }
            MessageKind::Tool { content } => {
                lines.push(Line::from("[TOOL]").fg(Color::Yellow).bold().right_aligned());
                lines.extend(
                    content
                        .lines()
                        .map(|l| Line::from(l.to_string()).fg(Color::Gray)),
                );
            }
            MessageKind::Unknown { .. } => continue,
        }
        lines.push(Line::from(""));
    }
    lines
}

fn draw_input(f: &mut Frame, app: &App, detail: &ChatDetail, area: Rect) {
    let active = app.mode == AppMode::Input;
    let border = if active { Color::Blue } else { Color::DarkGray };
    let block = Block::default()
        .title(" Message (i to type, Enter to send) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    let line = if detail.input().is_empty() && !active {
        Line::from("Type a message...").fg(Color::DarkGray)
    } else if active {
        Line::from(vec![
            Span::raw(detail.input().to_string()),
            Span::styled(" ", Style::default().bg(Color::White)),
        ])
    } else {
        Line::from(detail.input().to_string())
    };
    f.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_forms(f: &mut Frame, app: &App, detail: &ChatDetail, area: Rect) {
    let block = Block::default()
        .title(format!(
            " Submitted Interest Forms [{}] ",
            filter_label(detail.status_filter())
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if detail.forms().is_empty() {
        f.render_widget(
            Paragraph::new("No forms for this chat.").fg(Color::DarkGray),
            inner,
        );
        return;
    }

    let items: Vec<ListItem> = detail.forms().iter().map(form_card).collect();
    let list = List::new(items)
        .highlight_symbol("> ")
        .highlight_style(Style::default().fg(Color::Yellow));
    let mut state = ListState::default().with_selected(Some(app.form_selection));
    f.render_stateful_widget(list, inner, &mut state);
}

fn form_card(form: &Form) -> ListItem<'static> {
    ListItem::new(form_card_lines(form))
}

fn form_card_lines(form: &Form) -> Vec<Line<'static>> {
    let field = |label: &str, value: Option<&str>| {
        Line::from(vec![
            Span::styled(format!("{label}: "), Style::default().bold()),
            Span::raw(value.unwrap_or_default().to_string()),
        ])
    };
    vec![
        field("Name", form.name.as_deref()),
        field("Email", form.email.as_deref()),
        field("Phone", form.phone_number.as_deref()),
        field("Status", Some(form.status_label())),
        Line::from(format!(
            "Submitted: {}",
            display::format_timestamp(form.created_at.as_deref())
        ))
        .fg(Color::DarkGray),
        Line::from(""),
    ]
}

fn draw_edit_form(f: &mut Frame, app: &App, detail: &ChatDetail, area: Rect) {
    let Some(editing) = detail.editing() else {
        return;
    };
    let block = Block::default()
        .title(" Edit Form (Tab: next field, Enter: save, Esc: cancel) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let status = editing
        .draft
        .status
        .and_then(|code| FormStatus::try_from(code).ok())
        .map_or(NOT_SET, FormStatus::label);

    let mut lines = Vec::new();
    for &field in EditField::all() {
        let focused = field == app.edit_field;
        let value = if field == EditField::Status {
            format!("< {status} >")
        } else {
            field.text(&editing.draft)
        };
        let label_style = if focused {
            Style::default().fg(Color::Yellow).bold()
        } else {
            Style::default().bold()
        };
        let mut spans = vec![
            Span::styled(if focused { "> " } else { "  " }, label_style),
            Span::styled(format!("{:<8}", field.label()), label_style),
            Span::raw(value),
        ];
        if focused && field != EditField::Status {
            spans.push(Span::styled(" ", Style::default().bg(Color::White)));
        }
        lines.push(Line::from(spans));
        lines.push(Line::from(""));
    }
    lines.push(
        Line::from("Status: Space/Left/Right cycles, 0-3 selects").fg(Color::DarkGray),
    );
    f.render_widget(Paragraph::new(lines), inner);
}

// =============================================================================
// Form History
// =============================================================================

fn draw_history(f: &mut Frame, app: &App, form_history: &FormHistory, area: Rect) {
    let block = Block::default()
        .title(format!(" Form History: {} ", form_history.form_id()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines: Vec<Line> = match form_history.state() {
        HistoryState::Loading => vec![Line::from(history::LOADING)],
        HistoryState::Failed => vec![Line::from(history::LOAD_FAILED).fg(Color::Red)],
        HistoryState::Empty => vec![Line::from(history::EMPTY_HISTORY).fg(Color::DarkGray)],
        HistoryState::Revisions(revisions) => {
            let mut lines = Vec::new();
            for revision in revisions {
                lines.push(Line::from(display::revision_heading(revision)).bold());
                lines.push(
                    Line::from(display::format_timestamp(revision.created_at.as_deref()))
                        .fg(Color::DarkGray),
                );
                if revision.changes.is_empty() {
                    lines.push(Line::from(format!("  {}", history::NO_FIELD_CHANGES)).italic());
                }
                for change in &revision.changes {
                    lines.push(Line::from(format!("  {}", display::format_change(change))));
                }
                lines.push(Line::from(""));
            }
            lines
        }
    };

    let scroll = u16::try_from(app.history_scroll.min(lines.len().saturating_sub(1)))
        .unwrap_or(u16::MAX);
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        inner,
    );
}

// =============================================================================
// Status Bar & Overlays
// =============================================================================

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let mode_style = Style::default().fg(Color::Black).bg(app.mode.color());
    let status = Line::from(vec![
        Span::styled(format!(" {} ", app.mode.name()), mode_style),
        Span::raw(" "),
        Span::raw(app.route.to_string()),
        Span::raw(" | "),
        Span::raw(app.status_message.as_str()),
        Span::styled("  (? for help)", Style::default().fg(Color::DarkGray)),
    ]);
    f.render_widget(Paragraph::new(status), area);
}

fn draw_help_overlay(f: &mut Frame, scroll: usize) {
    let area = centered_rect(70, 80, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" Help (q/Esc to close) ")
        .borders(Borders::ALL)
        .style(Style::default().bg(Color::Black));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let help_text = vec![
        Line::from("EVERYWHERE").bold(),
        Line::from(""),
        Line::from("  r             Refresh"),
        Line::from("  Esc / b       Back"),
        Line::from("  ?             Toggle help"),
        Line::from("  q / Ctrl-c    Quit"),
        Line::from(""),
        Line::from("CHATS").bold(),
        Line::from(""),
        Line::from("  j / k         Move selection"),
        Line::from("  Enter         Open chat"),
        Line::from("  n             New chat"),
        Line::from(""),
        Line::from("CHAT").bold(),
        Line::from(""),
        Line::from("  i / Enter     Type a message (Enter sends, Esc leaves)"),
        Line::from("  j / k         Select form"),
        Line::from("  e             Edit selected form"),
        Line::from("  d             Delete selected form"),
        Line::from("  h             History of selected form"),
        Line::from("  f             Cycle status filter"),
        Line::from("  PgUp / PgDn   Scroll transcript"),
        Line::from(""),
        Line::from("EDIT FORM").bold(),
        Line::from(""),
        Line::from("  Tab / Down    Next field"),
        Line::from("  S-Tab / Up    Previous field"),
        Line::from("  Space         Cycle status"),
        Line::from("  0-3           Set status"),
        Line::from("  Enter         Save"),
        Line::from("  Esc           Cancel"),
    ];

    let max_scroll = help_text.len().saturating_sub(inner.height as usize);
    let scroll = u16::try_from(scroll.min(max_scroll)).unwrap_or(u16::MAX);
    f.render_widget(Paragraph::new(help_text).scroll((scroll, 0)), inner);
}

fn draw_delete_overlay(f: &mut Frame) {
    let area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" Confirm Delete ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .style(Style::default().bg(Color::Black));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let text = vec![
        Line::from(""),
        Line::from(DELETE_PROMPT).bold(),
        Line::from(""),
        Line::from(vec![
            Span::styled(" y ", Style::default().fg(Color::Black).bg(Color::Red)),
            Span::raw(" Yes  "),
            Span::styled(" n ", Style::default().fg(Color::Black).bg(Color::Green)),
            Span::raw(" No"),
        ]),
    ];
    f.render_widget(Paragraph::new(text).alignment(Alignment::Center), inner);
}

fn draw_notice_overlay(f: &mut Frame, kind: NoticeKind, message: &str) {
    let area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, area);

    let (title, color) = match kind {
        NoticeKind::Success => (" Done ", Color::Green),
        NoticeKind::Error => (" Error ", Color::Red),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .style(Style::default().bg(Color::Black));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let text = vec![
        Line::from(""),
        Line::from(message.to_string()).bold(),
        Line::from(""),
        Line::from("Enter to continue").fg(Color::DarkGray),
    ];
    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        inner,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use formchat_core::ApiClient;
    use ratatui::{Terminal, backend::TestBackend};
    use serde_json::json;

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    fn messages(value: serde_json::Value) -> Vec<Message> {
        serde_json::from_value(value).expect("messages")
    }

    #[test]
    fn transcript_dispatches_on_role() {
        let transcript = messages(json!([
            { "role": "user", "content": "hello" },
            { "role": "assistant", "content": null, "tool_calls": [
                { "function": { "name": "create_form", "arguments": "{\"name\":\"Ada\"}" } },
                { "function": { "name": "notify", "arguments": "{}" } }
            ]},
            { "role": "tool", "content": "saved" },
            { "role": "system", "content": "hidden" },
            { "role": "assistant", "content": "Done." }
        ]));

        let text = plain(&build_message_lines(&transcript));
        assert_eq!(
            text,
            vec![
                "[YOU]",
                "hello",
                "",
                "Calling function create_form",
                "{\"name\":\"Ada\"}",
                "Calling function notify",
                "{}",
                "",
                "[TOOL]",
                "saved",
                "",
                "[ASSISTANT]",
                "Done.",
                "",
            ]
        );
    }

    #[test]
    fn form_card_shows_status_label() {
        let form = Form {
            id: "f1".to_string(),
            name: Some("Ada".to_string()),
            email: None,
            phone_number: None,
            status: Some(7),
            created_at: None,
        };
        let text = plain(&form_card_lines(&form));
        assert_eq!(
            text,
            vec![
                "Name: Ada",
                "Email: ",
                "Phone: ",
                "Status: Not set",
                "Submitted: Unknown",
                "",
            ]
        );
        assert_eq!(form_card(&form).height(), 6);
    }

    #[test]
    fn long_lines_wrap_into_rows() {
        let lines = vec![
            Line::from("[ASSISTANT]").right_aligned(),
            Line::from(vec![Span::raw("abcdef"), Span::raw("ghij").bold()]),
        ];
        let rows = wrap_lines(lines, 4);
        assert_eq!(plain(&rows), vec!["[ASS", "ISTA", "NT]", "abcd", "efgh", "ij"]);
        assert_eq!(rows[0].alignment, Some(Alignment::Right));
        assert_eq!(rows[4].spans[1].content, "gh");
        assert!(rows[4].spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn newest_wrapped_message_is_visible() {
        let api = ApiClient::new("http://127.0.0.1:9").expect("client");
        let app = App::new(api, None);
        let mut detail = ChatDetail::new("c1");
        let words = "word ".repeat(11);
        let transcript = (1..=3)
            .map(|i| Message::user(format!("{words}END{i}")))
            .collect();
        detail.apply_reply(Ok(transcript));

        let mut terminal = Terminal::new(TestBackend::new(40, 12)).expect("terminal");
        terminal
            .draw(|f| draw_transcript(f, &app, &detail, f.area()))
            .expect("draw");
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("END3"), "{screen}");
    }
}
