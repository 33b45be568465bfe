//! Terminal output for the formchat CLI.

use console::{Style, style};
use formchat_core::{
    display,
    models::{Form, Message, MessageKind},
    views::{FormHistory, HistoryState, chat_list::ChatRow},
};

fn role_style(role: &str) -> Style {
    match role {
        "user" => Style::new().red().bold(),
        "assistant" => Style::new().blue().bold(),
        "function" => Style::new().magenta().bold(),
        "tool" => Style::new().yellow().bold(),
        _ => Style::new().dim(),
    }
}

pub fn print_chats(rows: &[ChatRow]) {
    if rows.is_empty() {
        println!("{}", style("No chats yet.").dim());
        return;
    }
    println!("{}", style(format!("{:<38} Created", "ID")).bold());
    for row in rows {
        println!("{:<38} {}", row.id, style(&row.created_at).dim());
    }
}

/// Header and body for each displayable message.
fn message_blocks(messages: &[Message]) -> Vec<(&'static str, String, String)> {
    let mut blocks = Vec::new();
    for msg in messages {
        match msg.kind() {
            MessageKind::User { content } => {
                blocks.push(("user", "You".to_string(), content.to_string()));
            }
            MessageKind::Assistant { content } => {
                blocks.push(("assistant", "Assistant".to_string(), content.to_string()));
            }
            MessageKind::AssistantWithTools { calls } => {
                blocks.extend(calls.iter().map(|call| {
                    (
                        "function",
                        format!("Calling function {}", call.function.name),
                        call.function.arguments.clone(),
                    )
                }));
            }
            MessageKind::Tool { content } => {
                blocks.push(("tool", "Tool".to_string(), content.to_string()));
            }
            MessageKind::Unknown { .. } => {}
        }
    }
    blocks
}

pub fn print_transcript(messages: &[Message]) {
    let blocks = message_blocks(messages);
    if blocks.is_empty() {
        println!("{}", style("No messages yet.").dim());
        return;
    }
    for (role, header, body) in blocks {
        println!("{}", role_style(role).apply_to(format!("--- {header} ---")));
        println!("{body}");
        println!();
    }
}

pub fn print_forms(forms: &[Form]) {
    if forms.is_empty() {
        println!("{}", style("No forms for this chat.").dim());
        return;
    }
    for form in forms {
        println!("{}", style(&form.id).cyan().bold());
        for (label, value) in form_fields(form) {
            println!("  {} {value}", style(format!("{label}:")).bold());
        }
        println!();
    }
}

fn form_fields(form: &Form) -> [(&'static str, String); 5] {
    [
        ("Name", form.name.clone().unwrap_or_default()),
        ("Email", form.email.clone().unwrap_or_default()),
        ("Phone", form.phone_number.clone().unwrap_or_default()),
        ("Status", form.status_label().to_string()),
        (
            "Submitted",
            display::format_timestamp(form.created_at.as_deref()),
        ),
    ]
}

pub fn print_history(history: &FormHistory) {
    match history.state() {
        HistoryState::Revisions(_) => {
            for line in history.lines() {
                if line.starts_with("Event: ") {
                    println!("{}", style(line).bold());
                } else if line.starts_with("  ") {
                    println!("{line}");
                } else {
                    println!("{}", style(line).dim());
                }
            }
        }
        _ => {
            for line in history.lines() {
                println!("{}", style(line).dim());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blocks_follow_roles() {
        let messages: Vec<Message> = serde_json::from_value(json!([
            { "role": "user", "content": "hi" },
            { "role": "assistant", "tool_calls": [
                { "function": { "name": "create_form", "arguments": "{}" } }
            ]},
            { "role": "tool", "content": "ok" },
            { "role": "system", "content": "hidden" },
            { "role": "assistant", "content": "Done" }
        ]))
        .expect("messages");

        let headers: Vec<String> = message_blocks(&messages)
            .into_iter()
            .map(|(_, header, _)| header)
            .collect();
        assert_eq!(
            headers,
            vec!["You", "Calling function create_form", "Tool", "Assistant"]
        );
    }

    #[test]
    fn form_fields_use_labels() {
        let form = Form {
            id: "f1".to_string(),
            name: Some("Ada".to_string()),
            email: None,
            phone_number: None,
            status: Some(1),
            created_at: None,
        };
        let fields = form_fields(&form);
        assert_eq!(fields[0], ("Name", "Ada".to_string()));
        assert_eq!(fields[3], ("Status", "TO DO".to_string()));
        assert_eq!(fields[4], ("Submitted", "Unknown".to_string()));
    }
}
