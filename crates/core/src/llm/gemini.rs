use crate::config::Settings;
use crate::domain::chat::{ChatMessage, Role};
use crate::llm::error::CollaboratorError;
use crate::llm::prompt::SYSTEM_INSTRUCTION;
use crate::llm::{ChatCollaborator, Provider, TextStream};
use anyhow::Context;
use eventsource_stream::Eventsource;
use futures::future;
use futures::stream::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_ANALYSIS_MODEL: &str = "gemini-2.5-pro";
const DEFAULT_THINKING_BUDGET: u32 = 32768;
const DEFAULT_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub analysis_model: String,
    pub thinking_budget: u32,
    /// Applies to batch calls only; streams run until the server closes them.
    pub timeout_secs: u64,
    pub system_instruction: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            thinking_budget: DEFAULT_THINKING_BUDGET,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let mut config = GeminiConfig::new(settings.require_gemini_api_key()?);

        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = std::env::var("GEMINI_CHAT_MODEL") {
            config.chat_model = model;
        }
        if let Ok(model) = std::env::var("GEMINI_ANALYSIS_MODEL") {
            config.analysis_model = model;
        }
        config.thinking_budget = std::env::var("GEMINI_THINKING_BUDGET")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_THINKING_BUDGET);
        config.timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(config)
    }

    pub fn new(config: GeminiConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(!config.api_key.trim().is_empty(), "Gemini API key is empty");

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self { http, config })
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:{method}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn headers(&self) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", HeaderValue::from_str(&self.config.api_key)?);
        Ok(headers)
    }

    async fn ensure_success(res: reqwest::Response) -> anyhow::Result<reqwest::Response> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let text = res
            .text()
            .await
            .context("failed to read Gemini error body")?;
        Err(CollaboratorError::http(Provider::Gemini, status.as_u16(), text).into())
    }

    fn system_instruction(&self) -> Option<SystemInstruction> {
        let text = self.config.system_instruction.trim();
        if text.is_empty() {
            return None;
        }
        Some(SystemInstruction {
            parts: vec![RequestPart {
                text: text.to_string(),
            }],
        })
    }
}

#[async_trait::async_trait]
impl ChatCollaborator for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn stream_reply(
        &self,
        history: &[ChatMessage],
        text: &str,
    ) -> anyhow::Result<TextStream> {
        let req = GenerateContentRequest {
            system_instruction: self.system_instruction(),
            contents: history_contents(history, text),
            generation_config: None,
        };

        let res = self
            .http
            .post(self.url(&self.config.chat_model, "streamGenerateContent"))
            .query(&[("alt", "sse")])
            .headers(self.headers()?)
            .json(&req)
            .send()
            .await
            .context("Gemini stream request failed")?;
        let res = Self::ensure_success(res).await?;

        tracing::debug!(
            model = %self.config.chat_model,
            history_len = history.len(),
            "Gemini stream opened"
        );

        Ok(decode_sse_stream(res.bytes_stream()))
    }

    async fn deep_analysis(&self, prompt: &str) -> anyhow::Result<String> {
        let req = GenerateContentRequest {
            system_instruction: None,
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                thinking_config: ThinkingConfig {
                    thinking_budget: self.config.thinking_budget,
                },
            }),
        };

        let res = self
            .http
            .post(self.url(&self.config.analysis_model, "generateContent"))
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .headers(self.headers()?)
            .json(&req)
            .send()
            .await
            .context("Gemini request failed")?;
        let res = Self::ensure_success(res).await?;

        let text = res
            .text()
            .await
            .context("failed to read Gemini response body")?;
        let parsed = serde_json::from_str::<GenerateContentResponse>(&text)
            .with_context(|| format!("failed to decode Gemini response: {text}"))?;

        match parsed.text()? {
            Some(out) => Ok(out),
            None => Err(CollaboratorError::empty_response(Provider::Gemini, text).into()),
        }
    }
}

/// Replays the transcript as Gemini `contents`. Leading model turns (the greeting)
/// and empty messages are dropped; the conversation must open with a user turn.
fn history_contents(history: &[ChatMessage], text: &str) -> Vec<RequestContent> {
    let mut out: Vec<RequestContent> = history
        .iter()
        .skip_while(|m| m.role == Role::Model)
        .filter(|m| !m.text.trim().is_empty())
        .map(|m| RequestContent {
            role: match m.role {
                Role::User => "user",
                Role::Model => "model",
            },
            parts: vec![RequestPart {
                text: m.text.clone(),
            }],
        })
        .collect();

    out.push(RequestContent {
        role: "user",
        parts: vec![RequestPart {
            text: text.to_string(),
        }],
    });
    out
}

/// Maps a `text/event-stream` body to reply chunks. The first error ends the stream.
fn decode_sse_stream<S, B, E>(body: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    body.eventsource()
        .filter_map(|event| async move {
            match event {
                Ok(event) if event.data.trim().is_empty() => None,
                Ok(event) => parse_stream_event(&event.data).transpose(),
                Err(err) => Some(Err(anyhow::anyhow!("Gemini stream read failed: {err}"))),
            }
        })
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        })
        .boxed()
}

fn parse_stream_event(payload: &str) -> anyhow::Result<Option<String>> {
    let parsed = serde_json::from_str::<GenerateContentResponse>(payload)
        .with_context(|| format!("invalid Gemini stream event: {payload}"))?;
    parsed.text()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    contents: Vec<RequestContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize)]
struct SystemInstruction {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Clone, Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Clone, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiError>,
}

impl GenerateContentResponse {
    /// Text parts of the first candidate, thought summaries excluded.
    fn text(&self) -> anyhow::Result<Option<String>> {
        if let Some(err) = &self.error {
            anyhow::bail!("Gemini returned an error: {}", err.message);
        }

        let Some(content) = self.candidates.first().and_then(|c| c.content.as_ref()) else {
            return Ok(None);
        };

        let mut out = String::new();
        for part in &content.parts {
            if part.thought {
                continue;
            }
            if let Some(text) = &part.text {
                out.push_str(text);
            }
        }
        Ok(Some(out).filter(|s| !s.is_empty()))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Clone, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}
