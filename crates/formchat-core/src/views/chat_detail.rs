//! Chat detail: transcript, message sending, and the forms linked to the
//! chat with their edit/delete flow.

use tracing::{debug, warn};

use crate::client::Api;
use crate::error::{Error, Result};
use crate::models::{DraftField, Form, FormStatus, FormUpdate, Message};

use super::{Notice, RefetchSignal};

pub const UPDATE_SUCCEEDED: &str = "Form updated successfully!";
pub const UPDATE_FAILED: &str = "Failed to update form";
pub const DELETE_SUCCEEDED: &str = "Form deleted successfully!";
pub const DELETE_FAILED: &str = "Failed to delete form";
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this form?";
pub const HISTORY_NOT_LOADED: &str = "Chat history is not loaded; refusing to send";

/// The form currently being edited and its draft buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editing {
    pub form_id: String,
    pub draft: FormUpdate,
}

#[derive(Debug)]
pub enum SendOutcome {
    /// The input buffer was empty; nothing happened.
    Skipped,
    Sent,
    /// The optimistic message stays in the transcript.
    Failed(Error),
}

#[derive(Debug)]
pub struct ChatDetail {
    chat_id: String,
    transcript: Vec<Message>,
    conversation_loaded: bool,
    input: String,
    forms: Vec<Form>,
    status_filter: Option<FormStatus>,
    editing: Option<Editing>,
    pending_delete: Option<String>,
    notice: Option<Notice>,
    forms_refresh: RefetchSignal,
    status: Option<String>,
}

impl ChatDetail {
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            transcript: Vec::new(),
            conversation_loaded: false,
            input: String::new(),
            forms: Vec::new(),
            status_filter: None,
            editing: None,
            pending_delete: None,
            notice: None,
            forms_refresh: RefetchSignal::default(),
            status: None,
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn forms(&self) -> &[Form] {
        &self.forms
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Latest non-blocking status message.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Load both the conversation and its forms.
    pub async fn load<A: Api>(&mut self, api: &A) {
        self.load_conversation(api).await;
        self.load_forms(api).await;
    }

    /// Replace the transcript with the server's full message list. On
    /// failure the current transcript is kept.
    pub async fn load_conversation<A: Api>(&mut self, api: &A) {
        match api.get_chat(&self.chat_id).await {
            Ok(messages) => {
                self.transcript = messages;
                self.conversation_loaded = true;
            }
            Err(err) => {
                warn!(chat_id = %self.chat_id, error = %err, "failed to load chat");
                self.status = Some(format!("Failed to load chat: {err}"));
            }
        }
    }

    /// Whether the server's transcript has been loaded at least once. The
    /// exchange endpoint replaces the stored history with the body it is
    /// sent, so sending is refused until then.
    pub fn conversation_loaded(&self) -> bool {
        self.conversation_loaded
    }

    /// Replace the forms list. On failure the current list is kept.
    pub async fn load_forms<A: Api>(&mut self, api: &A) {
        match api.list_forms(&self.chat_id, self.status_filter).await {
            Ok(forms) => {
                debug!(chat_id = %self.chat_id, count = forms.len(), "forms loaded");
                self.forms = forms;
            }
            Err(err) => {
                warn!(chat_id = %self.chat_id, error = %err, "failed to load forms");
                self.status = Some(format!("Failed to load forms: {err}"));
            }
        }
    }

    /// Whether a mutation asked for the forms list to be reloaded.
    pub fn forms_refresh_pending(&self) -> bool {
        self.forms_refresh.is_raised()
    }

    /// Reload the forms list if a mutation raised the refetch signal.
    pub async fn revalidate<A: Api>(&mut self, api: &A) -> bool {
        if !self.forms_refresh.take() {
            return false;
        }
        self.load_forms(api).await;
        true
    }

    pub fn status_filter(&self) -> Option<FormStatus> {
        self.status_filter
    }

    /// Restrict the forms list to one status. Takes effect on the next
    /// revalidation.
    pub fn set_status_filter(&mut self, filter: Option<FormStatus>) {
        self.status_filter = filter;
        self.forms_refresh.raise();
    }

    /// Append the input buffer to the transcript as a user message and clear
    /// the input. Returns the full list to send, or `None` when the input is
    /// empty.
    ///
    /// The optimistic message is visible to callers as soon as this returns;
    /// the request itself is made by whoever holds the returned list.
    pub fn stage_message(&mut self) -> Result<Option<Vec<Message>>> {
        if self.input.is_empty() {
            return Ok(None);
        }
        if !self.conversation_loaded {
            return Err(Error::Other(HISTORY_NOT_LOADED.to_string()));
        }

        let text = std::mem::take(&mut self.input);
        self.transcript.push(Message::user(text));
        Ok(Some(self.transcript.clone()))
    }

    /// Apply the outcome of a staged send. On success the transcript is
    /// replaced by the server's list and the forms refetch signal is raised,
    /// since the assistant may have created or changed forms. On failure the
    /// optimistic message stays.
    pub fn apply_reply(&mut self, reply: Result<Vec<Message>>) -> SendOutcome {
        match reply {
            Ok(messages) => {
                self.transcript = messages;
                self.conversation_loaded = true;
                self.forms_refresh.raise();
                self.status = None;
                SendOutcome::Sent
            }
            Err(err) => {
                warn!(chat_id = %self.chat_id, error = %err, "failed to send message");
                self.status = Some(format!("Message not delivered: {err}"));
                SendOutcome::Failed(err)
            }
        }
    }

    /// Stage the input buffer, send it and apply the reply.
    pub async fn send_message<A: Api>(&mut self, api: &A) -> SendOutcome {
        let messages = match self.stage_message() {
            Ok(Some(messages)) => messages,
            Ok(None) => return SendOutcome::Skipped,
            Err(err) => {
                self.status = Some(err.to_string());
                return SendOutcome::Failed(err);
            }
        };
        let reply = api.send_messages(&self.chat_id, &messages).await;
        self.apply_reply(reply)
    }

    pub fn editing(&self) -> Option<&Editing> {
        self.editing.as_ref()
    }

    /// Enter edit mode for a form, seeding the draft from its current
    /// fields. Any previous draft is discarded.
    pub fn begin_edit(&mut self, form_id: &str) -> bool {
        let Some(form) = self.forms.iter().find(|form| form.id == form_id) else {
            return false;
        };
        self.editing = Some(Editing {
            form_id: form.id.clone(),
            draft: form.draft(),
        });
        true
    }

    /// Merge one field into the draft.
    pub fn update_draft(&mut self, field: DraftField) {
        if let Some(editing) = self.editing.as_mut() {
            editing.draft.apply(field);
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// PUT the draft. Edit mode is left only on success.
    pub async fn save_edit<A: Api>(&mut self, api: &A) -> bool {
        let Some(Editing { form_id, draft }) = self.editing.clone() else {
            return false;
        };

        match api.update_form(&form_id, &draft).await {
            Ok(()) => {
                self.notice = Some(Notice::success(UPDATE_SUCCEEDED));
                self.editing = None;
                self.forms_refresh.raise();
                true
            }
            Err(err) => {
                warn!(%form_id, error = %err, "failed to update form");
                self.notice = Some(Notice::error(failure_message(&err, UPDATE_FAILED)));
                false
            }
        }
    }

    /// Ask for confirmation before deleting a form.
    pub fn request_delete(&mut self, form_id: &str) {
        self.pending_delete = Some(form_id.to_string());
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    pub fn decline_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Delete the form awaiting confirmation. Returns false when nothing was
    /// pending or the request failed.
    pub async fn confirm_delete<A: Api>(&mut self, api: &A) -> bool {
        let Some(form_id) = self.pending_delete.take() else {
            return false;
        };

        match api.delete_form(&form_id).await {
            Ok(()) => {
                self.notice = Some(Notice::success(DELETE_SUCCEEDED));
                self.forms_refresh.raise();
                true
            }
            Err(err) => {
                warn!(%form_id, error = %err, "failed to delete form");
                self.notice = Some(Notice::error(failure_message(&err, DELETE_FAILED)));
                false
            }
        }
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }
}

/// Error answers read "Error: <detail>"; transport failures only carry the
/// fallback text.
pub fn failure_message(err: &Error, fallback: &str) -> String {
    match err {
        Error::Request { .. } => format!("Error: {}", err.detail_or(fallback)),
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
#[path = "chat_detail_tests.rs"]
mod tests;
