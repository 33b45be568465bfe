//! Audit history of a single form.

use crate::client::Api;
use crate::display::{format_change, format_timestamp, revision_heading};
use crate::models::HistoryRevision;

use super::Resource;

pub const EMPTY_HISTORY: &str = "No history found yet.";
pub const NO_FIELD_CHANGES: &str = "No field-level changes recorded.";
pub const LOAD_FAILED: &str = "Failed to load history";
pub const LOADING: &str = "Loading...";

/// What the history view should show.
#[derive(Debug, Clone, Copy)]
pub enum HistoryState<'a> {
    Loading,
    Failed,
    Empty,
    Revisions(&'a [HistoryRevision]),
}

#[derive(Debug)]
pub struct FormHistory {
    form_id: String,
    revisions: Resource<Vec<HistoryRevision>>,
}

impl FormHistory {
    pub fn new(form_id: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            revisions: Resource::Loading,
        }
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    pub async fn load<A: Api>(&mut self, api: &A) {
        let result = api.form_history(&self.form_id).await;
        if let Err(err) = &result {
            tracing::warn!(form_id = %self.form_id, error = %err, "failed to load history");
        }
        self.revisions = Resource::from_result(result);
    }

    pub fn state(&self) -> HistoryState<'_> {
        match &self.revisions {
            Resource::Loading => HistoryState::Loading,
            Resource::Failed(_) => HistoryState::Failed,
            Resource::Ready(revisions) if revisions.is_empty() => HistoryState::Empty,
            Resource::Ready(revisions) => HistoryState::Revisions(revisions),
        }
    }

    /// Plain-text rendering, newest revision first as delivered.
    pub fn lines(&self) -> Vec<String> {
        match self.state() {
            HistoryState::Loading => vec![LOADING.to_string()],
            HistoryState::Failed => vec![LOAD_FAILED.to_string()],
            HistoryState::Empty => vec![EMPTY_HISTORY.to_string()],
            HistoryState::Revisions(revisions) => {
                let mut lines = Vec::new();
                for (i, revision) in revisions.iter().enumerate() {
                    if i > 0 {
                        lines.push(String::new());
                    }
                    lines.extend(revision_lines(revision));
                }
                lines
            }
        }
    }
}

/// Heading, timestamp, and one line per field change.
pub fn revision_lines(revision: &HistoryRevision) -> Vec<String> {
    let mut lines = vec![
        revision_heading(revision),
        format_timestamp(revision.created_at.as_deref()),
    ];
    if revision.changes.is_empty() {
        lines.push(format!("  {NO_FIELD_CHANGES}"));
    } else {
        lines.extend(
            revision
                .changes
                .iter()
                .map(|change| format!("  {}", format_change(change))),
        );
    }
    lines
}
