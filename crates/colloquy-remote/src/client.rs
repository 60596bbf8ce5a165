use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use colloquy_chat::{ChatError, ConversationService};
use colloquy_core::config::RemoteConfig;
use colloquy_core::{Chat, ChatId, ChatTranscript, Message};

use crate::error::RemoteError;

#[derive(Serialize)]
struct CreateChatBody<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct SubmitMessageBody<'a> {
    content: &'a str,
}

/// [`ConversationService`] backed by the REST API.
///
/// No timeout is applied unless `remote.timeout_secs` is configured.
pub struct HttpConversationService {
    http: Client,
    base_url: Url,
}

impl HttpConversationService {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| RemoteError::InvalidBaseUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::InvalidBaseUrl(config.base_url.clone()));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<(), RemoteError> {
        let req = self.http.get(self.url(&["health"])?);
        execute(req).await.map(|_| ())
    }

    /// Append path segments to the base url. Segments are percent-encoded,
    /// so opaque ids with reserved characters survive the trip.
    fn url(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn chat_url(&self, chat_id: &ChatId, rest: &[&str]) -> Result<Url, RemoteError> {
        let mut segments = vec!["chats", chat_id.as_str()];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }
}

/// Send a request and return the body of a successful response.
async fn execute(req: RequestBuilder) -> Result<String, RemoteError> {
    let response = req.send().await?;
    let status = response.status();
    let body = response.text().await?;
    debug!(status = status.as_u16(), bytes = body.len(), "Response received");
    if status.is_success() {
        Ok(body)
    } else {
        Err(RemoteError::from_status(status.as_u16(), &body))
    }
}

async fn execute_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, RemoteError> {
    let body = execute(req).await?;
    serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
}

#[async_trait]
impl ConversationService for HttpConversationService {
    async fn list_chats(&self) -> Result<Vec<Chat>, ChatError> {
        let req = self.http.get(self.url(&["chats"])?);
        Ok(execute_json(req).await?)
    }

    async fn get_chat(&self, chat_id: &ChatId) -> Result<ChatTranscript, ChatError> {
        let req = self.http.get(self.chat_url(chat_id, &[])?);
        execute_json(req)
            .await
            .map_err(|e| e.into_chat_error(Some(chat_id)))
    }

    async fn create_chat(&self, name: &str) -> Result<Chat, ChatError> {
        let req = self
            .http
            .post(self.url(&["chats"])?)
            .json(&CreateChatBody { name });
        execute_json(req).await.map_err(|e| e.into_chat_error(None))
    }

    async fn delete_chat(&self, chat_id: &ChatId) -> Result<(), ChatError> {
        let req = self.http.delete(self.chat_url(chat_id, &[])?);
        execute(req)
            .await
            .map(|_| ())
            .map_err(|e| e.into_chat_error(Some(chat_id)))
    }

    async fn submit_message(&self, chat_id: &ChatId, content: &str) -> Result<Message, ChatError> {
        let req = self
            .http
            .post(self.chat_url(chat_id, &["messages"])?)
            .json(&SubmitMessageBody { content });
        execute_json(req)
            .await
            .map_err(|e| e.into_chat_error(Some(chat_id)))
    }

    async fn list_messages(&self, chat_id: &ChatId) -> Result<Vec<Message>, ChatError> {
        let req = self.http.get(self.chat_url(chat_id, &["messages"])?);
        execute_json(req)
            .await
            .map_err(|e| e.into_chat_error(Some(chat_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base_url: &str) -> Result<HttpConversationService, RemoteError> {
        HttpConversationService::new(&RemoteConfig {
            base_url: base_url.to_string(),
            timeout_secs: None,
        })
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            service("not a url"),
            Err(RemoteError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            service("mailto:someone@example.com"),
            Err(RemoteError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_url_joins_segments() {
        let svc = service("http://127.0.0.1:3040").unwrap();
        assert_eq!(
            svc.url(&["chats"]).unwrap().as_str(),
            "http://127.0.0.1:3040/chats"
        );
    }

    #[test]
    fn test_url_keeps_base_path() {
        let svc = service("http://example.com/api/").unwrap();
        assert_eq!(
            svc.chat_url(&ChatId::new("c1"), &["messages"]).unwrap().as_str(),
            "http://example.com/api/chats/c1/messages"
        );
    }

    #[test]
    fn test_url_encodes_ids() {
        let svc = service("http://example.com").unwrap();
        assert_eq!(
            svc.chat_url(&ChatId::new("a/b c"), &[]).unwrap().as_str(),
            "http://example.com/chats/a%2Fb%20c"
        );
    }
}
