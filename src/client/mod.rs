//! HTTP client for the relay, plus the console front end built on it.

pub mod colors;
pub mod console;

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use tokio::sync::{mpsc, watch};

use crate::common::{ChatMessage, DisplayColor};
use crate::server::handlers::Deleted;
use crate::storage::ChatStats;

/// Pause before re-polling after a transport error.
const RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid server url `{0}`")]
    InvalidUrl(String),
    #[error("a name is required")]
    NameRequired,
    #[error("name or color already taken")]
    NameTaken,
    #[error("another session with the same name took over listening")]
    Replaced,
    #[error("server answered {status}: {body}")]
    Status { status: StatusCode, body: String },
}

async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}

/// Speaks the relay's HTTP API on behalf of one alias.
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: Url,
    alias: String,
    color: DisplayColor,
}

impl ChatClient {
    pub fn new(
        alias: impl Into<String>,
        color: DisplayColor,
        server_url: &str,
    ) -> Result<Self, ClientError> {
        let base_url = Url::parse(server_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidUrl(server_url.to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            alias: alias.into(),
            color,
        })
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn color(&self) -> DisplayColor {
        self.color
    }

    /// Append percent-encoded path segments to the server url.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn message(&self, content: impl Into<String>) -> ChatMessage {
        ChatMessage::new(self.alias.clone(), content, self.color)
    }

    /// Claim the alias and color on the server.
    pub async fn sign_in(&self) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url(&["users"]))
            .json(&self.message(""))
            .send()
            .await?;
        match response.status() {
            StatusCode::BAD_REQUEST => Err(ClientError::NameRequired),
            StatusCode::CONFLICT => Err(ClientError::NameTaken),
            _ => expect_success(response).await.map(drop),
        }
    }

    pub async fn send(&self, content: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url(&["messages"]))
            .json(&self.message(content))
            .send()
            .await?;
        expect_success(response).await.map(drop)
    }

    /// Block until the server hands out the next message.
    ///
    /// `None` means the server's long-poll window closed without a message;
    /// just ask again.
    pub async fn next_message(&self) -> Result<Option<ChatMessage>, ClientError> {
        let response = self
            .http
            .get(self.url(&["messages"]))
            .query(&[("id", self.alias.as_str())])
            .send()
            .await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::CONFLICT => Err(ClientError::Replaced),
            _ => Ok(Some(expect_success(response).await?.json().await?)),
        }
    }

    /// Long-poll in a loop, forwarding every message to `events`, until
    /// `shutdown` flips to true or the receiver goes away.
    pub async fn listen(
        &self,
        events: mpsc::Sender<ChatMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = shutdown.changed() => break,
                received = self.next_message() => match received {
                    Ok(Some(message)) => {
                        if events.send(message).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(ClientError::Replaced) => {
                        log::warn!("Listening for '{}' taken over by another session", self.alias);
                        break;
                    }
                    Err(err) => {
                        log::warn!("Long-poll failed: {err}; retrying");
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                },
            }
        }
        log::debug!("Listener for '{}' stopped", self.alias);
    }

    /// Post a farewell and release the alias.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        self.send("I left the chat!").await?;
        let response = self
            .http
            .delete(self.url(&["users", &self.alias]))
            .send()
            .await?;
        expect_success(response).await.map(drop)
    }

    pub async fn history(
        &self,
        sender: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<ChatMessage>, ClientError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(sender) = sender {
            params.push(("sender", sender.to_string()));
        }
        if let Some(from) = from {
            params.push(("from", from.to_rfc3339()));
        }
        if let Some(to) = to {
            params.push(("to", to.to_rfc3339()));
        }

        let response = self
            .http
            .get(self.url(&["history"]))
            .query(&params)
            .send()
            .await?;
        Ok(expect_success(response).await?.json().await?)
    }

    /// Delete this alias's stored messages; returns how many went.
    pub async fn forget_history(&self) -> Result<usize, ClientError> {
        let response = self
            .http
            .delete(self.url(&["history", &self.alias]))
            .send()
            .await?;
        let deleted: Deleted = expect_success(response).await?.json().await?;
        Ok(deleted.deleted)
    }

    pub async fn stats(&self) -> Result<ChatStats, ClientError> {
        let response = self.http.get(self.url(&["stats"])).send().await?;
        Ok(expect_success(response).await?.json().await?)
    }
}
