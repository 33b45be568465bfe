//! In-memory [`Api`] used by the view tests. Records every call.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::client::Api;
use crate::error::{Error, Result};
use crate::models::{Chat, Form, FormStatus, FormUpdate, HistoryRevision, Message};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    ListChats,
    CreateChat,
    GetChat(String),
    SendMessages(String, Vec<Message>),
    ListForms(String, Option<FormStatus>),
    UpdateForm(String, FormUpdate),
    DeleteForm(String),
    FormHistory(String),
}

#[derive(Debug, Default)]
pub(crate) struct FakeApi {
    calls: Mutex<Vec<Call>>,
    chats: Vec<Chat>,
    created_chat: Option<String>,
    transcript: Vec<Message>,
    reply: Vec<Message>,
    forms: Vec<Form>,
    history: Vec<HistoryRevision>,
    failures: HashMap<&'static str, (u16, serde_json::Value)>,
}

impl FakeApi {
    pub(crate) fn with_chats(mut self, chats: Vec<Chat>) -> Self {
        self.chats = chats;
        self
    }

    pub(crate) fn with_created_chat(mut self, id: &str) -> Self {
        self.created_chat = Some(id.to_string());
        self
    }

    pub(crate) fn with_transcript(mut self, messages: Vec<Message>) -> Self {
        self.transcript = messages;
        self
    }

    pub(crate) fn with_reply(mut self, messages: Vec<Message>) -> Self {
        self.reply = messages;
        self
    }

    pub(crate) fn with_forms(mut self, forms: Vec<Form>) -> Self {
        self.forms = forms;
        self
    }

    pub(crate) fn with_history(mut self, history: Vec<HistoryRevision>) -> Self {
        self.history = history;
        self
    }

    /// Make one endpoint answer with an error status and body.
    pub(crate) fn failing(
        mut self,
        endpoint: &'static str,
        status: u16,
        info: serde_json::Value,
    ) -> Self {
        self.failures.insert(endpoint, (status, info));
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().expect("calls lock").clear();
    }

    fn record(&self, endpoint: &'static str, call: Call) -> Result<()> {
        self.calls.lock().expect("calls lock").push(call);
        match self.failures.get(endpoint) {
            Some((status, info)) => Err(Error::Request {
                status: *status,
                info: info.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl Api for FakeApi {
    async fn list_chats(&self) -> Result<Vec<Chat>> {
        self.record("list_chats", Call::ListChats)?;
        Ok(self.chats.clone())
    }

    async fn create_chat(&self) -> Result<Chat> {
        self.record("create_chat", Call::CreateChat)?;
        Ok(Chat {
            id: self.created_chat.clone().unwrap_or_else(|| "new".to_string()),
            created_at: None,
            user_id: None,
            resource_id: None,
            messages: Vec::new(),
        })
    }

    async fn get_chat(&self, chat_id: &str) -> Result<Vec<Message>> {
        self.record("get_chat", Call::GetChat(chat_id.to_string()))?;
        Ok(self.transcript.clone())
    }

    async fn send_messages(&self, chat_id: &str, messages: &[Message]) -> Result<Vec<Message>> {
        self.record(
            "send_messages",
            Call::SendMessages(chat_id.to_string(), messages.to_vec()),
        )?;
        Ok(self.reply.clone())
    }

    async fn list_forms(&self, chat_id: &str, status: Option<FormStatus>) -> Result<Vec<Form>> {
        self.record("list_forms", Call::ListForms(chat_id.to_string(), status))?;
        Ok(self
            .forms
            .iter()
            .filter(|form| status.is_none_or(|s| form.status == Some(s.code())))
            .cloned()
            .collect())
    }

    async fn update_form(&self, form_id: &str, update: &FormUpdate) -> Result<()> {
        self.record(
            "update_form",
            Call::UpdateForm(form_id.to_string(), update.clone()),
        )
    }

    async fn delete_form(&self, form_id: &str) -> Result<()> {
        self.record("delete_form", Call::DeleteForm(form_id.to_string()))
    }

    async fn form_history(&self, form_id: &str) -> Result<Vec<HistoryRevision>> {
        self.record("form_history", Call::FormHistory(form_id.to_string()))?;
        Ok(self.history.clone())
    }
}
