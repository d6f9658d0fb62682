use chrono::{DateTime, Local};

/// A single turn in the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: Option<DateTime<Local>>,
}

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, at: DateTime<Local>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp: Some(at),
        }
    }

    pub fn assistant(content: impl Into<String>, at: DateTime<Local>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: Some(at),
        }
    }
}

/// Identifier handed to each outgoing analysis request
pub type RequestId = u64;

/// Append-only list of turns, held in memory for the life of the chat
#[derive(Debug, Default)]
pub struct ConversationState {
    messages: Vec<ChatMessage>,
    is_submitting: bool,
    in_flight: Option<RequestId>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a turn at the tail. Turns are never edited or removed afterwards.
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn all(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn set_submitting(&mut self, submitting: bool) {
        self.is_submitting = submitting;
        if !submitting {
            self.in_flight = None;
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    pub(crate) fn begin_request(&mut self, id: RequestId) {
        self.is_submitting = true;
        self.in_flight = Some(id);
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }
}
