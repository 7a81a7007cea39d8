//! Credit-metered generation pipeline
//!
//! One call to [`GenerationPipeline::submit`] is one turn:
//!
//! 1. validate the request
//! 2. resolve the user
//! 3. locate the chat (owner-scoped)
//! 4. check the balance covers the mode's cost
//! 5. record the user's prompt
//! 6. call the provider under a timeout
//! 7. record the reply
//! 8. debit the ledger (best effort)
//!
//! Steps 1-4 have no side effects when they fail. From step 5 on, a failure
//! can leave the prompt in the chat without a reply; the returned
//! [`SubmitError`] says so through `prompt_recorded()`.
//!
//! The balance check and the debit are separate operations with no lock in
//! between, so two concurrent submits can both pass the check. The ledger
//! floors the balance at zero, which bounds the overspend to the cost of the
//! in-flight requests.

use crate::error::{ProviderError, SubmitError};
use crate::providers::{GenerationMode, Providers};
use crate::storage::{ChatStore, Ledger, Message, UserDirectory};
use crate::telemetry;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a successful turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// The stored prompt message
    pub user_message: Message,
    /// The stored assistant message
    pub reply: Message,
    /// Balance after the debit
    pub new_balance: u32,
}

/// Orchestrates ledger, chat store and providers for one turn
#[derive(Clone)]
pub struct GenerationPipeline {
    users: Arc<dyn UserDirectory>,
    chats: Arc<dyn ChatStore>,
    ledger: Arc<dyn Ledger>,
    providers: Providers,
    timeout: Duration,
}

impl GenerationPipeline {
    /// Create a new pipeline
    ///
    /// # Arguments
    ///
    /// * `users` - Resolves user ids to accounts
    /// * `chats` - Chat persistence
    /// * `ledger` - Credit check and debit
    /// * `providers` - Text and image backends
    /// * `timeout` - Upper bound for a single provider call
    pub fn new(
        users: Arc<dyn UserDirectory>,
        chats: Arc<dyn ChatStore>,
        ledger: Arc<dyn Ledger>,
        providers: Providers,
        timeout: Duration,
    ) -> Self {
        Self {
            users,
            chats,
            ledger,
            providers,
            timeout,
        }
    }

    /// Run one generation turn
    ///
    /// `publish` only has an effect for image mode.
    ///
    /// # Errors
    ///
    /// Returns a [`SubmitError`] describing the first step that failed.
    /// A failed debit is not an error; it is logged and counted.
    pub async fn submit(
        &self,
        user_id: &str,
        chat_id: &str,
        prompt: &str,
        mode: GenerationMode,
        publish: bool,
    ) -> std::result::Result<GenerationResult, SubmitError> {
        let outcome = self.run(user_id, chat_id, prompt, mode, publish).await;

        let label = match &outcome {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        telemetry::record_submission(mode, label);

        match &outcome {
            Ok(result) => tracing::info!(
                user_id,
                chat_id,
                mode = %mode,
                new_balance = result.new_balance,
                "Generation turn completed"
            ),
            Err(e) => tracing::warn!(
                user_id,
                chat_id,
                mode = %mode,
                kind = e.kind(),
                prompt_recorded = e.prompt_recorded(),
                "Generation turn failed: {}",
                e
            ),
        }

        outcome
    }

    async fn run(
        &self,
        user_id: &str,
        chat_id: &str,
        prompt: &str,
        mode: GenerationMode,
        publish: bool,
    ) -> std::result::Result<GenerationResult, SubmitError> {
        if prompt.trim().is_empty() {
            return Err(SubmitError::InvalidRequest("Prompt cannot be empty".to_string()));
        }
        if chat_id.trim().is_empty() {
            return Err(SubmitError::InvalidRequest("Chat id is required".to_string()));
        }

        let user = self
            .users
            .find_user(user_id)
            .map_err(|e| persistence(e, false))?
            .ok_or(SubmitError::Unauthenticated)?;

        self.chats
            .get(chat_id, &user.id)
            .map_err(|e| persistence(e, false))?
            .ok_or(SubmitError::ChatNotFound)?;

        let cost = mode.cost();
        let reservation = self
            .ledger
            .reserve(&user.id, cost)
            .map_err(|e| persistence(e, false))?;
        if !reservation.is_allowed() {
            return Err(SubmitError::InsufficientCredits {
                required: cost,
                available: reservation.balance(),
            });
        }
        tracing::debug!(user_id = %user.id, chat_id, cost, "Quota check passed");

        let user_message = self
            .chats
            .append_message(chat_id, &user.id, Message::user(prompt))
            .map_err(|e| persistence(e, false))?
            .ok_or(SubmitError::ChatNotFound)?;
        tracing::debug!(user_id = %user.id, chat_id, "User turn recorded");

        let content = self.generate(prompt, mode).await?;

        let reply = if mode.is_image() {
            Message::assistant_image(content, publish)
        } else {
            Message::assistant(content)
        };
        let reply = self
            .chats
            .append_message(chat_id, &user.id, reply)
            .map_err(|e| persistence(e, true))?
            .ok_or_else(|| SubmitError::Persistence {
                message: "chat was deleted before the reply could be stored".to_string(),
                prompt_recorded: true,
            })?;
        tracing::debug!(user_id = %user.id, chat_id, "Reply recorded");

        let new_balance = match self.ledger.debit(&user.id, cost) {
            Ok(balance) => balance,
            Err(e) => {
                tracing::error!(
                    user_id = %user.id,
                    chat_id,
                    cost,
                    "Failed to debit credits after a completed turn: {:#}",
                    e
                );
                telemetry::record_debit_failure(mode);
                reservation.balance().saturating_sub(cost)
            }
        };

        Ok(GenerationResult {
            user_message,
            reply,
            new_balance,
        })
    }

    /// Call the mode's provider under the timeout and normalize the reply
    async fn generate(
        &self,
        prompt: &str,
        mode: GenerationMode,
    ) -> std::result::Result<String, SubmitError> {
        let provider = self.providers.for_mode(mode);

        let outcome = match tokio::time::timeout(self.timeout, provider.generate(prompt)).await {
            Err(_) | Ok(Err(ProviderError::Timeout(_))) => Err(SubmitError::ProviderTimeout {
                seconds: self.timeout.as_secs(),
            }),
            Ok(Err(cause)) => Err(SubmitError::GenerationFailed { cause }),
            Ok(Ok(reply)) => {
                let content = reply.content.trim();
                if content.is_empty() {
                    Err(SubmitError::GenerationFailed {
                        cause: ProviderError::InvalidResponse(format!(
                            "{} returned an empty reply",
                            provider.name()
                        )),
                    })
                } else {
                    Ok(content.to_string())
                }
            }
        };

        if let Err(e) = &outcome {
            telemetry::record_provider_error(provider.name(), e.kind());
        }
        outcome
    }
}

impl std::fmt::Debug for GenerationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationPipeline")
            .field("providers", &self.providers)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn persistence(err: anyhow::Error, prompt_recorded: bool) -> SubmitError {
    SubmitError::Persistence {
        message: format!("{:#}", err),
        prompt_recorded,
    }
}
