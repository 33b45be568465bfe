//! View state machines.
//!
//! Each view owns its state, fetches through an [`Api`](crate::Api) when
//! entered, and re-fetches after its own mutations. Rendering is left to the
//! front ends.

pub mod chat_detail;
pub mod chat_list;
pub mod history;

#[cfg(test)]
pub(crate) mod fake;

pub use chat_detail::{ChatDetail, Editing, SendOutcome};
pub use chat_list::ChatList;
pub use history::{FormHistory, HistoryState};

use crate::error::Error;

/// Remote data as seen by a view.
#[derive(Debug, Default)]
pub enum Resource<T> {
    #[default]
    Loading,
    Failed(Error),
    Ready(T),
}

impl<T> Resource<T> {
    pub fn from_result(result: crate::Result<T>) -> Self {
        match result {
            Ok(value) => Resource::Ready(value),
            Err(err) => Resource::Failed(err),
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Resource::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Resource::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Resource::Loading)
    }
}

/// Raised by mutations that may have changed a remote collection and
/// consumed by the logic that reloads it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefetchSignal {
    pending: bool,
}

impl RefetchSignal {
    pub fn raise(&mut self) {
        self.pending = true;
    }

    /// Consume the signal. Returns whether a refetch was requested.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    pub fn is_raised(&self) -> bool {
        self.pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A blocking message the user must acknowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}
