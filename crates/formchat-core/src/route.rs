//! Routing surface shared by the terminal UI and the CLI.
//!
//! `/` is the chat list, `/{chatId}` a chat, and `/forms/{formId}/history`
//! the audit history of one form.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    ChatList,
    Chat(String),
    FormHistory(String),
}

impl Route {
    pub fn chat(id: impl Into<String>) -> Self {
        Route::Chat(id.into())
    }

    pub fn form_history(id: impl Into<String>) -> Self {
        Route::FormHistory(id.into())
    }
}

impl FromStr for Route {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let segments: Vec<&str> = s
            .trim()
            .trim_matches('/')
            .split('/')
            .filter(|seg| !seg.is_empty())
            .collect();

        match segments.as_slice() {
            [] => Ok(Route::ChatList),
            [chat_id] => Ok(Route::Chat((*chat_id).to_string())),
            ["forms", form_id, "history"] => Ok(Route::FormHistory((*form_id).to_string())),
            _ => Err(Error::InvalidRoute(s.to_string())),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::ChatList => write!(f, "/"),
            Route::Chat(id) => write!(f, "/{id}"),
            Route::FormHistory(id) => write!(f, "/forms/{id}/history"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_route() {
        assert_eq!("/".parse::<Route>().ok(), Some(Route::ChatList));
        assert_eq!("".parse::<Route>().ok(), Some(Route::ChatList));
        assert_eq!("/abc123".parse::<Route>().ok(), Some(Route::chat("abc123")));
        assert_eq!(
            "/forms/f1/history".parse::<Route>().ok(),
            Some(Route::form_history("f1"))
        );
    }

    #[test]
    fn tolerates_missing_or_trailing_slashes() {
        assert_eq!("abc123/".parse::<Route>().ok(), Some(Route::chat("abc123")));
        assert_eq!(
            "forms/f1/history/".parse::<Route>().ok(),
            Some(Route::form_history("f1"))
        );
    }

    #[test]
    fn rejects_unknown_paths() {
        assert!("/forms/f1".parse::<Route>().is_err());
        assert!("/a/b/c/d".parse::<Route>().is_err());
    }

    #[test]
    fn displays_as_path() {
        assert_eq!(Route::ChatList.to_string(), "/");
        assert_eq!(Route::chat("abc123").to_string(), "/abc123");
        assert_eq!(Route::form_history("f1").to_string(), "/forms/f1/history");
    }
}
