//! Chat list: every chat session, plus creating a new one.

use tracing::warn;

use crate::client::Api;
use crate::display::format_timestamp;
use crate::models::Chat;
use crate::route::Route;

use super::Resource;

/// One row of the chat table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRow {
    pub id: String,
    pub created_at: String,
}

#[derive(Debug, Default)]
pub struct ChatList {
    chats: Resource<Vec<Chat>>,
    selected: usize,
    status: Option<String>,
}

impl ChatList {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load<A: Api>(&mut self, api: &A) {
        self.chats = Resource::from_result(api.list_chats().await);
        let len = self.len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    pub fn chats(&self) -> &Resource<Vec<Chat>> {
        &self.chats
    }

    pub fn rows(&self) -> Vec<ChatRow> {
        self.chats
            .ready()
            .map(|chats| {
                chats
                    .iter()
                    .map(|chat| ChatRow {
                        id: chat.id.clone(),
                        created_at: format_timestamp(chat.created_at.as_deref()),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.chats.ready().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a chat. On success returns the route of the new chat; on
    /// failure nothing navigates and a status line message is recorded.
    pub async fn create_chat<A: Api>(&mut self, api: &A) -> Option<Route> {
        match api.create_chat().await {
            Ok(chat) => {
                self.status = None;
                Some(Route::Chat(chat.id))
            }
            Err(err) => {
                warn!(error = %err, "failed to create chat");
                self.status = Some(format!("Could not create chat: {err}"));
                None
            }
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_route(&self) -> Option<Route> {
        self.chats
            .ready()
            .and_then(|chats| chats.get(self.selected))
            .map(|chat| Route::Chat(chat.id.clone()))
    }

    /// Latest non-blocking status message.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::fake::{Call, FakeApi};

    fn chat(id: &str) -> Chat {
        Chat {
            id: id.to_string(),
            created_at: Some("2024-05-01T10:00:00".to_string()),
            user_id: None,
            resource_id: None,
            messages: Vec::new(),
        }
    }

    #[tokio::test]
    async fn load_fills_rows() {
        let api = FakeApi::default().with_chats(vec![chat("a"), chat("b")]);
        let mut list = ChatList::new();
        assert!(list.chats().is_loading());

        list.load(&api).await;
        let rows = list.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "a");
        assert_eq!(
            rows[0].created_at,
            format_timestamp(Some("2024-05-01T10:00:00Z"))
        );
    }

    #[tokio::test]
    async fn create_navigates_to_new_chat() {
        let api = FakeApi::default().with_created_chat("abc123");
        let mut list = ChatList::new();

        let route = list.create_chat(&api).await.expect("route");
        assert_eq!(route, Route::chat("abc123"));
        assert_eq!(route.to_string(), "/abc123");
        assert_eq!(api.calls(), vec![Call::CreateChat]);
    }

    #[tokio::test]
    async fn failed_create_does_not_navigate() {
        let api = FakeApi::default().failing("create_chat", 500, serde_json::json!({}));
        let mut list = ChatList::new();

        assert!(list.create_chat(&api).await.is_none());
        assert!(list.status().is_some());
    }

    #[tokio::test]
    async fn selection_is_clamped() {
        let api = FakeApi::default().with_chats(vec![chat("a"), chat("b")]);
        let mut list = ChatList::new();
        list.load(&api).await;

        list.select_next();
        list.select_next();
        assert_eq!(list.selected(), 1);
        assert_eq!(list.selected_route(), Some(Route::chat("b")));

        list.select_previous();
        list.select_previous();
        assert_eq!(list.selected(), 0);
    }

    #[tokio::test]
    async fn failed_load_has_no_rows() {
        let api = FakeApi::default().failing("list_chats", 500, serde_json::json!({}));
        let mut list = ChatList::new();
        list.load(&api).await;

        assert!(list.chats().error().is_some());
        assert!(list.rows().is_empty());
        assert!(list.selected_route().is_none());
    }
}
