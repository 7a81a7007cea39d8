//! Client-side mirror of the active chat
//!
//! [`ClientSyncState`] applies a submit optimistically and reconciles it
//! with the server's answer:
//!
//! ```text
//!            submit                 success
//!   Idle ───────────► Pending ───────────────► Committed
//!     ▲                  │  failure
//!     │                  └──────────► RolledBack
//!     └──── (next submit starts from any settled phase)
//! ```
//!
//! Only one submit is in flight at a time. Submits made while one is pending
//! wait in a FIFO queue and are released one by one as earlier ones succeed.
//! A failure stops the queue: its prompt goes back into the input and the
//! prompts still waiting are held for the user to resend. Switching chats
//! replaces the local messages and drops the queue; a late answer for the
//! previous chat only clears the pending flag.

use crate::providers::GenerationMode;
use crate::storage::{ChatSummary, Message};
use std::collections::VecDeque;

/// Where the most recent submit stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing submitted yet in this chat
    Idle,
    /// A submit is in flight
    Pending,
    /// The last submit succeeded
    Committed,
    /// The last submit failed and was undone locally
    ///
    /// `prompt_recorded` is set when the server had already stored the
    /// prompt before failing, so resending it adds a second copy.
    RolledBack {
        /// Whether the server kept the prompt without a reply
        prompt_recorded: bool,
    },
}

/// Appended to the failure message when the server kept the prompt
pub const PROMPT_SAVED_NOTICE: &str = "Your prompt was saved to the chat without a reply.";

/// A request the driver must send to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Target chat
    pub chat_id: String,
    /// Prompt text
    pub prompt: String,
    /// Text or image
    pub mode: GenerationMode,
    /// Publish flag for images
    pub publish: bool,
}

#[derive(Debug, Clone)]
struct InFlight {
    submission: Submission,
    optimistic_index: usize,
}

#[derive(Debug, Clone)]
struct Queued {
    prompt: String,
    mode: GenerationMode,
    publish: bool,
}

/// Optimistic chat state for one client
#[derive(Debug, Clone)]
pub struct ClientSyncState {
    chats: Vec<ChatSummary>,
    active_chat: Option<String>,
    messages: Vec<Message>,
    input: String,
    balance: u32,
    phase: Phase,
    in_flight: Option<InFlight>,
    queue: VecDeque<Queued>,
    held: Vec<String>,
    last_error: Option<String>,
}

impl ClientSyncState {
    /// Create an empty state with a known balance
    pub fn new(balance: u32) -> Self {
        Self {
            chats: Vec::new(),
            active_chat: None,
            messages: Vec::new(),
            input: String::new(),
            balance,
            phase: Phase::Idle,
            in_flight: None,
            queue: VecDeque::new(),
            held: Vec::new(),
            last_error: None,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether a submit is in flight
    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Messages of the active chat, optimistic ones included
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Active chat id
    pub fn active_chat(&self) -> Option<&str> {
        self.active_chat.as_deref()
    }

    /// Known chats, most recently updated first
    pub fn chats(&self) -> &[ChatSummary] {
        &self.chats
    }

    /// Current input line
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replace the input line
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Cached credit balance
    pub fn balance(&self) -> u32 {
        self.balance
    }

    /// Overwrite the cached balance (e.g. after a refresh)
    pub fn set_balance(&mut self, balance: u32) {
        self.balance = balance;
    }

    /// Message of the last failed submit
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Number of submits waiting behind the in-flight one
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Prompts that were queued behind a failed submit and never sent
    pub fn held_prompts(&self) -> &[String] {
        &self.held
    }

    /// Hand the held prompts to the caller, oldest first
    pub fn take_held_prompts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.held)
    }

    /// Whether the last failure left the prompt stored on the server
    pub fn prompt_recorded(&self) -> bool {
        matches!(
            self.phase,
            Phase::RolledBack {
                prompt_recorded: true
            }
        )
    }

    /// Replace the chat listing
    pub fn set_chats(&mut self, chats: Vec<ChatSummary>) {
        self.chats = chats;
    }

    /// Make `chat_id` the active chat with the given server-side messages
    ///
    /// Queued and held submits are dropped. An in-flight submit keeps the pending flag
    /// until it settles, but its answer will not touch the new chat.
    pub fn open_chat(&mut self, chat_id: impl Into<String>, messages: Vec<Message>) {
        self.active_chat = Some(chat_id.into());
        self.messages = messages;
        self.queue.clear();
        self.held.clear();
        self.last_error = None;
        self.phase = if self.in_flight.is_some() {
            Phase::Pending
        } else {
            Phase::Idle
        };
    }

    /// Forget a deleted chat and pick the next one to open
    ///
    /// Returns the id of the chat that should become active, which is the
    /// first remaining chat when the deleted chat was active, or `None`
    /// when nothing changes or no chat is left.
    pub fn remove_chat(&mut self, chat_id: &str) -> Option<String> {
        self.chats.retain(|c| c.id != chat_id);
        if self.active_chat.as_deref() != Some(chat_id) {
            return None;
        }

        self.active_chat = None;
        self.messages.clear();
        self.queue.clear();
        self.chats.first().map(|c| c.id.clone())
    }

    /// Submit the prompt
    ///
    /// Returns the request to send now, or `None` when the prompt is blank,
    /// no chat is open, or another submit is in flight (the prompt is then
    /// queued).
    pub fn submit(
        &mut self,
        prompt: impl Into<String>,
        mode: GenerationMode,
        publish: bool,
    ) -> Option<Submission> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() || self.active_chat.is_none() {
            return None;
        }

        self.input.clear();
        if self.in_flight.is_some() {
            self.queue.push_back(Queued {
                prompt,
                mode,
                publish,
            });
            return None;
        }

        self.begin(prompt, mode, publish)
    }

    /// Settle the in-flight submit with the server's success answer
    ///
    /// Returns the next queued submission to send, if any.
    pub fn on_success(
        &mut self,
        user_message: Message,
        reply: Message,
        new_balance: u32,
    ) -> Option<Submission> {
        let in_flight = self.in_flight.take()?;

        if self.is_current(&in_flight) {
            if let Some(slot) = self.messages.get_mut(in_flight.optimistic_index) {
                *slot = user_message;
            }
            self.messages.push(reply);
            self.balance = new_balance;
            self.last_error = None;
            self.phase = Phase::Committed;
        } else {
            tracing::debug!(chat_id = %in_flight.submission.chat_id, "Ignoring late reply");
            self.phase = Phase::Idle;
        }

        self.release_next()
    }

    /// Settle the in-flight submit with a failure
    ///
    /// Removes the optimistic message and puts the prompt back into the
    /// input. Queued submits are not sent; their prompts move to
    /// [`held_prompts`](Self::held_prompts). `prompt_recorded` reports
    /// whether the server stored the prompt before failing.
    ///
    /// Returns the next submission to send, which is only ever a queued
    /// submit for a different chat than the one that failed.
    pub fn on_failure(
        &mut self,
        message: impl Into<String>,
        prompt_recorded: bool,
    ) -> Option<Submission> {
        let in_flight = self.in_flight.take()?;

        if !self.is_current(&in_flight) {
            tracing::debug!(chat_id = %in_flight.submission.chat_id, "Ignoring late failure");
            self.phase = Phase::Idle;
            return self.release_next();
        }

        if in_flight.optimistic_index < self.messages.len() {
            self.messages.remove(in_flight.optimistic_index);
        }
        self.input = in_flight.submission.prompt;
        self.held.extend(self.queue.drain(..).map(|q| q.prompt));
        self.last_error = Some(message.into());
        self.phase = Phase::RolledBack { prompt_recorded };
        None
    }

    fn is_current(&self, in_flight: &InFlight) -> bool {
        self.active_chat.as_deref() == Some(in_flight.submission.chat_id.as_str())
    }

    fn begin(&mut self, prompt: String, mode: GenerationMode, publish: bool) -> Option<Submission> {
        let chat_id = self.active_chat.clone()?;
        let submission = Submission {
            chat_id,
            prompt: prompt.clone(),
            mode,
            publish,
        };

        self.messages.push(Message::user(prompt));
        self.in_flight = Some(InFlight {
            submission: submission.clone(),
            optimistic_index: self.messages.len() - 1,
        });
        self.phase = Phase::Pending;
        Some(submission)
    }

    fn release_next(&mut self) -> Option<Submission> {
        let next = self.queue.pop_front()?;
        self.begin(next.prompt, next.mode, next.publish)
    }
}
