//! Domain models for chats, interest forms and their audit history.
//!
//! Records are validated into typed values at the API boundary. Keys the
//! client does not interpret are kept in `extra` maps so the transcript can
//! be sent back to the server unchanged.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// A chat session with its full transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Request and response body of the message exchange endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessageList {
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Message roles. Unknown roles are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    Tool,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Other(role) => role,
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "tool" => Role::Tool,
            _ => Role::Other(s),
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Role::from(s.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(role) => role,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single transcript entry.
///
/// `content` and `tool_calls` distinguish a missing key (`None`) from an
/// explicit `null` (`Some(None)`) so both shapes are echoed back as received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_calls: Option<Option<Vec<ToolCall>>>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Render-oriented view of a message, dispatched on role.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MessageKind<'a> {
    User { content: &'a str },
    Assistant { content: &'a str },
    AssistantWithTools { calls: &'a [ToolCall] },
    Tool { content: &'a str },
    /// Roles outside user/assistant/tool are not displayed.
    Unknown { role: &'a str },
}

impl Message {
    /// A new outgoing user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(Some(content.into())),
            tool_calls: None,
            extra: JsonMap::new(),
        }
    }

    pub fn text(&self) -> &str {
        self.content.as_ref().and_then(Option::as_deref).unwrap_or_default()
    }

    pub fn tool_calls(&self) -> Option<&[ToolCall]> {
        self.tool_calls.as_ref().and_then(Option::as_deref)
    }

    pub fn kind(&self) -> MessageKind<'_> {
        match &self.role {
            Role::User => MessageKind::User {
                content: self.text(),
            },
            Role::Assistant => match self.tool_calls() {
                Some(calls) => MessageKind::AssistantWithTools { calls },
                None => MessageKind::Assistant {
                    content: self.text(),
                },
            },
            Role::Tool => MessageKind::Tool {
                content: self.text(),
            },
            Role::Other(role) => MessageKind::Unknown { role },
        }
    }
}

/// A key that is present deserializes to `Some`, even when its value is null.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// An assistant-issued function invocation, shown for display only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub function: FunctionCall,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    /// Serialized arguments, displayed verbatim.
    #[serde(default)]
    pub arguments: String,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// An interest form submission linked to a chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Form {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Form {
    pub fn status_label(&self) -> &'static str {
        crate::display::status_label(self.status)
    }

    /// Draft buffer seeded from the editable fields.
    pub fn draft(&self) -> FormUpdate {
        FormUpdate {
            name: self.name.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            status: self.status,
        }
    }
}

/// Full-object body of a form update. Null fields are sent as null.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub status: Option<i64>,
}

/// A single-field change to a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftField {
    Name(String),
    Email(String),
    PhoneNumber(String),
    Status(Option<FormStatus>),
}

impl FormUpdate {
    pub fn apply(&mut self, field: DraftField) {
        match field {
            DraftField::Name(v) => self.name = Some(v),
            DraftField::Email(v) => self.email = Some(v),
            DraftField::PhoneNumber(v) => self.phone_number = Some(v),
            DraftField::Status(v) => self.status = v.map(FormStatus::code),
        }
    }
}

/// Closed set of form statuses understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum FormStatus {
    Todo,
    InProgress,
    Completed,
}

impl FormStatus {
    pub fn code(self) -> i64 {
        match self {
            FormStatus::Todo => 1,
            FormStatus::InProgress => 2,
            FormStatus::Completed => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FormStatus::Todo => "TO DO",
            FormStatus::InProgress => "IN PROGRESS",
            FormStatus::Completed => "COMPLETED",
        }
    }

    /// Cycle order used by selectors: unset → 1 → 2 → 3 → unset.
    pub fn cycle(current: Option<FormStatus>) -> Option<FormStatus> {
        match current {
            None => Some(FormStatus::Todo),
            Some(FormStatus::Todo) => Some(FormStatus::InProgress),
            Some(FormStatus::InProgress) => Some(FormStatus::Completed),
            Some(FormStatus::Completed) => None,
        }
    }
}

impl TryFrom<i64> for FormStatus {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(FormStatus::Todo),
            2 => Ok(FormStatus::InProgress),
            3 => Ok(FormStatus::Completed),
            other => Err(Error::InvalidStatus(other)),
        }
    }
}

impl From<FormStatus> for i64 {
    fn from(status: FormStatus) -> Self {
        status.code()
    }
}

impl std::fmt::Display for FormStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One audit event affecting a form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryRevision {
    pub id: String,
    pub event_type: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub changes: Vec<FieldChange>,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub actor_type: Option<String>,
    #[serde(default)]
    pub actor_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// A field-level before/after pair. Missing values read as null.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    pub id: String,
    pub field: String,
    #[serde(default)]
    pub old_value: serde_json::Value,
    #[serde(default)]
    pub new_value: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Greeting returned by the backend root endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Greeting {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
