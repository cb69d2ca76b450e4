use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

const BODY_EXCERPT_CHARS: usize = 200;

/// Where a collaborator call broke down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Non-2xx status from the service.
    Http(u16),
    /// A 2xx reply with no text parts.
    EmptyResponse,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Http(_) => "http",
            FailureStage::EmptyResponse => "empty_response",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Http(status) => write!(f, "http {status}"),
            FailureStage::EmptyResponse => f.write_str("empty response"),
        }
    }
}

/// A failed collaborator call, carrying the body the service sent back.
#[derive(Debug, Clone)]
pub struct CollaboratorError {
    pub provider: Provider,
    pub stage: FailureStage,
    pub body: String,
}

impl CollaboratorError {
    pub fn http(provider: Provider, status: u16, body: String) -> Self {
        Self {
            provider,
            stage: FailureStage::Http(status),
            body,
        }
    }

    pub fn empty_response(provider: Provider, body: String) -> Self {
        Self {
            provider,
            stage: FailureStage::EmptyResponse,
            body,
        }
    }

    /// `error.message` from a JSON error body.
    pub fn service_message(&self) -> Option<String> {
        let json: Value = serde_json::from_str(&self.body).ok()?;
        json.pointer("/error/message")?
            .as_str()
            .map(str::to_string)
    }

    fn body_excerpt(&self) -> String {
        let trimmed = self.body.trim();
        let mut out: String = trimmed.chars().take(BODY_EXCERPT_CHARS).collect();
        if trimmed.chars().count() > BODY_EXCERPT_CHARS {
            out.push_str("...");
        }
        out
    }
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = self
            .service_message()
            .unwrap_or_else(|| self.body_excerpt());
        write!(
            f,
            "{} call failed ({}): {reason}",
            self.provider.as_str(),
            self.stage
        )
    }
}

impl std::error::Error for CollaboratorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefers_the_service_message() {
        let err = CollaboratorError::http(
            Provider::Gemini,
            429,
            r#"{"error": {"code": 429, "message": "quota exhausted"}}"#.to_string(),
        );
        assert_eq!(err.service_message().as_deref(), Some("quota exhausted"));
        assert_eq!(err.to_string(), "gemini call failed (http 429): quota exhausted");
    }

    #[test]
    fn display_falls_back_to_a_body_excerpt() {
        let err = CollaboratorError::http(Provider::Gemini, 502, "x".repeat(500));
        assert_eq!(err.service_message(), None);
        let shown = err.to_string();
        assert!(shown.starts_with("gemini call failed (http 502): xxx"));
        assert!(shown.ends_with("..."));
        assert!(shown.len() < 300);

        let empty = CollaboratorError::empty_response(Provider::Gemini, "{}".to_string());
        assert_eq!(empty.stage.as_str(), "empty_response");
        assert_eq!(empty.to_string(), "gemini call failed (empty response): {}");
    }
}
