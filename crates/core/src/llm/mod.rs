use crate::domain::chat::ChatMessage;
use futures::stream::BoxStream;

pub mod error;
pub mod gemini;
pub mod prompt;

/// Lazy, finite, non-restartable sequence of text fragments.
pub type TextStream = BoxStream<'static, anyhow::Result<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
        }
    }
}

/// The external text-generation service behind the chat panel.
#[async_trait::async_trait]
pub trait ChatCollaborator: Send + Sync {
    fn provider(&self) -> Provider;

    /// Opens a token stream seeded with the prior transcript and the new user text.
    async fn stream_reply(&self, history: &[ChatMessage], text: &str)
        -> anyhow::Result<TextStream>;

    /// One complete response with the extended thinking budget.
    async fn deep_analysis(&self, prompt: &str) -> anyhow::Result<String>;
}
