//! HTTP client for the formchat backend.
//!
//! Every call is a single request/response round trip. Non-2xx answers are
//! turned into [`Error::Request`] carrying the status and the parsed error
//! body; nothing is retried or cached.

use std::future::Future;

use reqwest::{Method, RequestBuilder, Response, Url, header};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{
    Chat, Form, FormStatus, FormUpdate, Greeting, HistoryRevision, Message, MessageList,
};

/// Operations offered by the backend.
///
/// The view state machines are generic over this trait so they can be driven
/// by [`ApiClient`] or by an in-memory implementation.
pub trait Api {
    fn list_chats(&self) -> impl Future<Output = Result<Vec<Chat>>> + Send;

    fn create_chat(&self) -> impl Future<Output = Result<Chat>> + Send;

    fn get_chat(&self, chat_id: &str) -> impl Future<Output = Result<Vec<Message>>> + Send;

    /// Send the full history; returns the server's authoritative list.
    fn send_messages(
        &self,
        chat_id: &str,
        messages: &[Message],
    ) -> impl Future<Output = Result<Vec<Message>>> + Send;

    fn list_forms(
        &self,
        chat_id: &str,
        status: Option<FormStatus>,
    ) -> impl Future<Output = Result<Vec<Form>>> + Send;

    fn update_form(
        &self,
        form_id: &str,
        update: &FormUpdate,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_form(&self, form_id: &str) -> impl Future<Output = Result<()>> + Send;

    fn form_history(
        &self,
        form_id: &str,
    ) -> impl Future<Output = Result<Vec<HistoryRevision>>> + Send;
}

/// reqwest-backed client bound to one API origin.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// Create a client for the given origin without a request timeout.
    pub fn new(api_url: &str) -> Result<Self> {
        Self::build(api_url, None)
    }

    /// Create a client from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::build(&config.api_url, config.request_timeout())
    }

    fn build(api_url: &str, timeout: Option<std::time::Duration>) -> Result<Self> {
        let base = Url::parse(api_url.trim())
            .map_err(|e| Error::Config(format!("Invalid api_url '{api_url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Invalid api_url '{api_url}': not a base URL"
            )));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Build an endpoint URL from path segments, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config(format!("Invalid api_url '{}'", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a relative path and parse the JSON body.
    pub async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let segments: Vec<&str> = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let url = self.endpoint(&segments)?;
        self.execute(self.request(Method::GET, url)).await
    }

    /// Check that the backend answers.
    pub async fn ping(&self) -> Result<Greeting> {
        self.fetch_json("").await
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "api request");
        self.http
            .request(method, url)
            .header(header::ACCEPT, "application/json")
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = check_status(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    /// Send a request whose success body is irrelevant.
    async fn execute_discard(&self, request: RequestBuilder) -> Result<()> {
        check_status(request.send().await?).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let info = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
    debug!(status = status.as_u16(), %info, "api request failed");
    Err(Error::Request {
        status: status.as_u16(),
        info,
    })
}

impl Api for ApiClient {
    async fn list_chats(&self) -> Result<Vec<Chat>> {
        let url = self.endpoint(&["chat"])?;
        self.execute(self.request(Method::GET, url)).await
    }

    async fn create_chat(&self) -> Result<Chat> {
        let url = self.endpoint(&["chat"])?;
        let body = serde_json::json!({});
        self.execute(self.request(Method::POST, url).json(&body)).await
    }

    async fn get_chat(&self, chat_id: &str) -> Result<Vec<Message>> {
        let url = self.endpoint(&["chat", chat_id])?;
        let list: MessageList = self.execute(self.request(Method::GET, url)).await?;
        Ok(list.messages)
    }

    async fn send_messages(&self, chat_id: &str, messages: &[Message]) -> Result<Vec<Message>> {
        let url = self.endpoint(&["chat", chat_id])?;
        let body = MessageList {
            messages: messages.to_vec(),
        };
        let list: MessageList = self
            .execute(self.request(Method::PUT, url).json(&body))
            .await?;
        Ok(list.messages)
    }

    async fn list_forms(&self, chat_id: &str, status: Option<FormStatus>) -> Result<Vec<Form>> {
        let url = self.endpoint(&["chat", chat_id, "forms"])?;
        let mut request = self.request(Method::GET, url);
        if let Some(status) = status {
            request = request.query(&[("status", status.code())]);
        }
        self.execute(request).await
    }

    async fn update_form(&self, form_id: &str, update: &FormUpdate) -> Result<()> {
        let url = self.endpoint(&["forms", form_id])?;
        self.execute_discard(self.request(Method::PUT, url).json(update))
            .await
    }

    async fn delete_form(&self, form_id: &str) -> Result<()> {
        let url = self.endpoint(&["forms", form_id])?;
        self.execute_discard(self.request(Method::DELETE, url)).await
    }

    async fn form_history(&self, form_id: &str) -> Result<Vec<HistoryRevision>> {
        let url = self.endpoint(&["forms", form_id, "history"])?;
        self.execute(self.request(Method::GET, url)).await
    }
}
