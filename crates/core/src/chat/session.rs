use crate::domain::chat::{ChatMessage, MessageClock, MessageId, Role};
use crate::llm::prompt::GREETING;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnMode {
    Streaming,
    /// Batch deep analysis with the extended thinking budget.
    Thinking,
}

impl TurnMode {
    pub fn from_thinking(thinking: bool) -> Self {
        if thinking {
            TurnMode::Thinking
        } else {
            TurnMode::Streaming
        }
    }
}

/// An accepted submission whose collaborator call has not completed.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub user_id: MessageId,
    pub reply_id: MessageId,
    /// Transcript as it stood before this turn's user message.
    pub history: Vec<ChatMessage>,
    pub text: String,
    pub mode: TurnMode,
}

/// Transcript plus turn bookkeeping. At most one turn is in flight.
#[derive(Debug, Clone)]
pub struct ChatSession {
    transcript: Vec<ChatMessage>,
    clock: MessageClock,
    in_flight: Option<MessageId>,
    thinking_mode: bool,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        let mut clock = MessageClock::default();
        let greeting = ChatMessage::model(clock.tick(), GREETING);
        Self {
            transcript: vec![greeting],
            clock,
            in_flight: None,
            thinking_mode: false,
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn thinking_mode(&self) -> bool {
        self.thinking_mode
    }

    pub fn set_thinking_mode(&mut self, enabled: bool) {
        self.thinking_mode = enabled;
    }

    pub fn toggle_thinking_mode(&mut self) -> bool {
        self.thinking_mode = !self.thinking_mode;
        self.thinking_mode
    }

    /// Appends the user message and an empty model placeholder. Blank input and
    /// submissions during an in-flight turn are ignored and leave the session
    /// untouched. `mode` overrides the thinking flag, and is only stored once
    /// the turn is accepted; `None` uses the current flag.
    pub fn begin_turn(&mut self, input: &str, mode: Option<TurnMode>) -> Option<PendingTurn> {
        if input.trim().is_empty() || self.in_flight.is_some() {
            return None;
        }

        if let Some(mode) = mode {
            self.thinking_mode = mode == TurnMode::Thinking;
        }
        let mode = TurnMode::from_thinking(self.thinking_mode);
        let history = self.transcript.clone();

        let user_id = self.clock.tick();
        self.transcript.push(ChatMessage::user(user_id, input));
        let reply_id = self.clock.tick();
        self.transcript.push(ChatMessage::model(reply_id, ""));
        self.in_flight = Some(reply_id);

        Some(PendingTurn {
            user_id,
            reply_id,
            history,
            text: input.to_string(),
            mode,
        })
    }

    pub fn append_chunk(&mut self, reply_id: MessageId, chunk: &str) -> bool {
        match self.reply_mut(reply_id) {
            Some(message) => {
                message.text.push_str(chunk);
                true
            }
            None => false,
        }
    }

    pub fn replace_text(&mut self, reply_id: MessageId, text: impl Into<String>) -> bool {
        match self.reply_mut(reply_id) {
            Some(message) => {
                message.text = text.into();
                true
            }
            None => false,
        }
    }

    pub fn finish_turn(&mut self, reply_id: MessageId) {
        if self.in_flight == Some(reply_id) {
            self.in_flight = None;
        }
    }

    fn reply_mut(&mut self, reply_id: MessageId) -> Option<&mut ChatMessage> {
        self.transcript
            .iter_mut()
            .rev()
            .find(|m| m.id == reply_id && m.role == Role::Model)
    }
}
