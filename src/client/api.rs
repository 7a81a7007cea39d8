//! HTTP client for the CreditChat API

use super::state::{ClientSyncState, Submission, PROMPT_SAVED_NOTICE};
use crate::error::{CreditChatError, Result};
use crate::pipeline::GenerationResult;
use crate::protocol::{
    ChatData, ChatIdRequest, ChatList, Envelope, Failure, Gallery, Notice, SubmitRequest, UserData,
};
use crate::providers::GenerationMode;
use crate::storage::{Chat, ChatSummary, User};

use anyhow::Context;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Authenticated API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// Create a client for `base_url` using a bearer `token`
    ///
    /// `timeout` should exceed the server's generation timeout so that the
    /// server, not the client, reports slow providers.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("creditchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CreditChatError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and split the envelope into payload or failure
    async fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<std::result::Result<T, Failure>> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to reach CreditChat server")?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .with_context(|| format!("Server returned a non-JSON response ({})", status))?;

        if body.get("success").and_then(|v| v.as_bool()) == Some(true) {
            let envelope: Envelope<T> =
                serde_json::from_value(body).map_err(CreditChatError::Serialization)?;
            Ok(Ok(envelope.body))
        } else {
            let failure: Failure = serde_json::from_value(body).unwrap_or_else(|_| {
                Failure::new("unknown", format!("Request failed with status {}", status))
            });
            tracing::debug!(%status, kind = %failure.error_kind, "Server reported failure");
            Ok(Err(failure))
        }
    }

    /// Like [`call`](Self::call) but treating a failure envelope as an error
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        match self.call(request).await? {
            Ok(body) => Ok(body),
            Err(failure) if failure.error_kind == "unauthenticated" => {
                Err(CreditChatError::Authentication(failure.message).into())
            }
            Err(failure) => Err(CreditChatError::InvalidOperation(failure.message).into()),
        }
    }

    /// Current user and balance
    pub async fn user(&self) -> Result<User> {
        let data: UserData = self.fetch(self.client.get(self.url("/api/user/data"))).await?;
        Ok(data.user)
    }

    /// The caller's chats, most recently updated first
    pub async fn list_chats(&self) -> Result<Vec<ChatSummary>> {
        let list: ChatList = self.fetch(self.client.get(self.url("/api/chat/get"))).await?;
        Ok(list.data)
    }

    /// Create an empty chat
    pub async fn create_chat(&self) -> Result<Chat> {
        let chat: ChatData = self
            .fetch(self.client.post(self.url("/api/chat/create")))
            .await?;
        Ok(chat.data)
    }

    /// Load a chat with its messages
    pub async fn open_chat(&self, chat_id: &str) -> Result<Chat> {
        let chat: ChatData = self
            .fetch(
                self.client
                    .get(self.url("/api/chat/open"))
                    .query(&[("chatId", chat_id)]),
            )
            .await?;
        Ok(chat.data)
    }

    /// Delete a chat
    pub async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        let _: Notice = self
            .fetch(
                self.client
                    .post(self.url("/api/chat/delete"))
                    .json(&ChatIdRequest {
                        chat_id: chat_id.to_string(),
                    }),
            )
            .await?;
        Ok(())
    }

    /// Published gallery images
    pub async fn published_images(&self) -> Result<Gallery> {
        self.fetch(self.client.get(self.url("/api/message/published")))
            .await
    }

    /// Send one submission
    ///
    /// The outer error is a transport problem; the inner one is the server's
    /// failure envelope.
    pub async fn submit(
        &self,
        submission: &Submission,
    ) -> Result<std::result::Result<GenerationResult, Failure>> {
        let path = match submission.mode {
            GenerationMode::Text => "/api/message/text",
            GenerationMode::Image => "/api/message/image",
        };
        let body = SubmitRequest {
            chat_id: submission.chat_id.clone(),
            prompt: submission.prompt.clone(),
            is_published: submission.publish,
        };
        self.call(self.client.post(self.url(path)).json(&body)).await
    }

    /// Build a client state ready for chatting
    ///
    /// Loads the user and their chats, creating a first chat when there is
    /// none, then opens `preferred` if it still exists or else the most
    /// recently updated chat.
    pub async fn bootstrap(&self, preferred: Option<&str>) -> Result<ClientSyncState> {
        let user = self.user().await?;
        let mut chats = self.list_chats().await?;
        if chats.is_empty() {
            tracing::info!("No chats yet, creating one");
            chats.push(self.create_chat().await?.summary());
        }

        let selected = preferred
            .filter(|id| chats.iter().any(|c| c.id == *id))
            .map(str::to_string)
            .unwrap_or_else(|| chats[0].id.clone());
        let chat = self.open_chat(&selected).await?;

        let mut state = ClientSyncState::new(user.credits);
        state.set_chats(chats);
        state.open_chat(chat.id, chat.messages);
        Ok(state)
    }

    /// Send a submission and every queued one it releases
    ///
    /// Returns the failure messages encountered, in order. A failure whose
    /// prompt the server kept carries [`PROMPT_SAVED_NOTICE`].
    pub async fn drive(&self, state: &mut ClientSyncState, first: Submission) -> Vec<String> {
        let mut failures = Vec::new();
        let mut next = Some(first);

        while let Some(submission) = next {
            next = match self.submit(&submission).await {
                Ok(Ok(result)) => state.on_success(result.user_message, result.reply, result.new_balance),
                Ok(Err(failure)) => {
                    let message = if failure.prompt_recorded {
                        format!("{} {}", failure.message, PROMPT_SAVED_NOTICE)
                    } else {
                        failure.message
                    };
                    failures.push(message.clone());
                    state.on_failure(message, failure.prompt_recorded)
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    failures.push(message.clone());
                    state.on_failure(message, false)
                }
            };
        }

        failures
    }
}
