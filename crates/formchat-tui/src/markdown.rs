//! Markdown to styled ratatui lines, used for assistant replies.

use pulldown_cmark::{CodeBlockKind, Event as MdEvent, Options, Parser as MdParser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
};

pub fn render_markdown(content: &str) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current_spans: Vec<Span<'static>> = Vec::new();
    let mut style_stack: Vec<Style> = vec![Style::default()];

    let mut in_code_block = false;
    let mut code_block_lang: Option<String> = None;
    let mut code_block_lines: Vec<String> = Vec::new();
    let mut list_stack: Vec<Option<u64>> = Vec::new();
    let mut heading_level: Option<usize> = None;

    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    for event in MdParser::new_ext(content, options) {
        match event {
            MdEvent::Start(tag) => match tag {
                Tag::Heading { level, .. } => {
                    flush_line(&mut lines, &mut current_spans);
                    heading_level = Some(level as usize);
                    style_stack.push(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
                }
                Tag::CodeBlock(kind) => {
                    flush_line(&mut lines, &mut current_spans);
                    in_code_block = true;
                    code_block_lang = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                        _ => None,
                    };
                    code_block_lines.clear();
                }
                Tag::List(start) => list_stack.push(start),
                Tag::Item => {
                    flush_line(&mut lines, &mut current_spans);
                    let indent = "  ".repeat(list_stack.len().saturating_sub(1));
                    let marker = match list_stack.last_mut() {
                        Some(Some(n)) => {
                            let marker = format!("{indent}{n}. ");
                            *n += 1;
                            marker
                        }
                        _ => format!("{indent}* "),
                    };
                    current_spans.push(Span::styled(marker, Style::default().fg(Color::DarkGray)));
                }
                Tag::Emphasis => {
                    let style = current_style(&style_stack).add_modifier(Modifier::ITALIC);
                    style_stack.push(style);
                }
                Tag::Strong => {
                    let style = current_style(&style_stack).add_modifier(Modifier::BOLD);
                    style_stack.push(style);
                }
                Tag::Strikethrough => {
                    let style = current_style(&style_stack).add_modifier(Modifier::CROSSED_OUT);
                    style_stack.push(style);
                }
                Tag::Link { .. } => {
                    style_stack.push(
                        Style::default()
                            .fg(Color::Blue)
                            .add_modifier(Modifier::UNDERLINED),
                    );
                }
                Tag::BlockQuote(_) => {
                    flush_line(&mut lines, &mut current_spans);
                    style_stack.push(Style::default().fg(Color::DarkGray));
                    current_spans.push(Span::styled("> ", Style::default().fg(Color::DarkGray)));
                }
                Tag::HtmlBlock => flush_line(&mut lines, &mut current_spans),
                _ => {}
            },
            MdEvent::End(tag_end) => match tag_end {
                TagEnd::Heading(_) => {
                    style_stack.pop();
                    flush_line(&mut lines, &mut current_spans);
                    heading_level = None;
                }
                TagEnd::Paragraph => {
                    flush_line(&mut lines, &mut current_spans);
                    lines.push(Line::from(""));
                }
                TagEnd::CodeBlock => {
                    in_code_block = false;
                    let lang = code_block_lang.take().unwrap_or_default();
                    render_code_block(&mut lines, &lang, &code_block_lines);
                    code_block_lines.clear();
                }
                TagEnd::List(_) => {
                    list_stack.pop();
                    if list_stack.is_empty() {
                        lines.push(Line::from(""));
                    }
                }
                TagEnd::Item => flush_line(&mut lines, &mut current_spans),
                TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                    style_stack.pop();
                }
                TagEnd::BlockQuote(_) => {
                    style_stack.pop();
                    flush_line(&mut lines, &mut current_spans);
                }
                TagEnd::HtmlBlock => {
                    flush_line(&mut lines, &mut current_spans);
                    lines.push(Line::from(""));
                }
                _ => {}
            },
            MdEvent::Text(text) => {
                if in_code_block {
                    code_block_lines.extend(text.lines().map(str::to_string));
                } else {
                    if let Some(level) = heading_level
                        && current_spans.is_empty()
                    {
                        current_spans.push(Span::styled(
                            format!("{} ", "#".repeat(level)),
                            Style::default().fg(Color::DarkGray),
                        ));
                    }
                    current_spans.push(Span::styled(text.to_string(), current_style(&style_stack)));
                }
            }
            MdEvent::Code(code) => {
                current_spans.push(Span::styled(
                    format!("`{code}`"),
                    Style::default().fg(Color::Yellow),
                ));
            }
            // markup is shown as written
            MdEvent::InlineHtml(html) => {
                current_spans.push(Span::styled(html.to_string(), current_style(&style_stack)));
            }
            MdEvent::Html(html) => {
                for line in html.lines() {
                    current_spans.push(Span::raw(line.to_string()));
                    flush_line(&mut lines, &mut current_spans);
                }
            }
            MdEvent::SoftBreak if !in_code_block => current_spans.push(Span::raw(" ")),
            MdEvent::HardBreak => flush_line(&mut lines, &mut current_spans),
            MdEvent::Rule => {
                flush_line(&mut lines, &mut current_spans);
                lines.push(Line::from("---").fg(Color::DarkGray));
            }
            _ => {}
        }
    }

    flush_line(&mut lines, &mut current_spans);
    while lines.last().is_some_and(|l| l.spans.is_empty()) {
        lines.pop();
    }
    lines
}

fn current_style(stack: &[Style]) -> Style {
    stack.last().copied().unwrap_or_default()
}

fn flush_line(lines: &mut Vec<Line<'static>>, spans: &mut Vec<Span<'static>>) {
    if !spans.is_empty() {
        lines.push(Line::from(std::mem::take(spans)));
    }
}

fn render_code_block(lines: &mut Vec<Line<'static>>, lang: &str, code_lines: &[String]) {
    let display_lang = if lang.is_empty() { "code" } else { lang };
    lines.push(Line::from(format!("```{display_lang}")).fg(Color::DarkGray));
    for line in code_lines {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(line.clone(), Style::default().fg(Color::Gray)),
        ]));
    }
    lines.push(Line::from("```").fg(Color::DarkGray));
}
