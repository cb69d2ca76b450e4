use crate::chat::session::{ChatSession, PendingTurn, TurnMode};
use crate::domain::chat::{ChatMessage, MessageId};
use crate::llm::error::CollaboratorError;
use crate::llm::prompt::{deep_analysis_prompt, FALLBACK_ERROR};
use crate::llm::ChatCollaborator;
use futures::StreamExt;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

const EVENT_CAPACITY: usize = 256;

/// Shared flag tied to a panel's lifetime. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    TurnStarted { user_id: MessageId, reply_id: MessageId },
    Chunk { reply_id: MessageId, text: String },
    Replaced { reply_id: MessageId },
    Failed { reply_id: MessageId },
    Finished { reply_id: MessageId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed,
    /// The panel was disposed while the call was pending; nothing was written.
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub transcript: Vec<ChatMessage>,
    pub in_flight: bool,
    pub thinking_mode: bool,
}

/// One open chat panel: a session, the collaborator it talks to, and its lifetime.
#[derive(Clone)]
pub struct ChatPanel {
    session: Arc<Mutex<ChatSession>>,
    collaborator: Arc<dyn ChatCollaborator>,
    lifetime: CancelToken,
    events: broadcast::Sender<TranscriptEvent>,
}

impl ChatPanel {
    pub fn open(collaborator: Arc<dyn ChatCollaborator>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            session: Arc::new(Mutex::new(ChatSession::new())),
            collaborator,
            lifetime: CancelToken::default(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.lock().await;
        SessionSnapshot {
            transcript: session.transcript().to_vec(),
            in_flight: session.is_in_flight(),
            thinking_mode: session.thinking_mode(),
        }
    }

    pub async fn set_thinking_mode(&self, enabled: bool) {
        self.session.lock().await.set_thinking_mode(enabled);
    }

    pub async fn toggle_thinking_mode(&self) -> bool {
        self.session.lock().await.toggle_thinking_mode()
    }

    /// Synchronous half of a submission: the user message and placeholder exist
    /// once this returns. `None` when the input is blank, a turn is already in
    /// flight, or the panel is disposed.
    pub async fn begin(&self, input: &str) -> Option<PendingTurn> {
        self.begin_with_mode(input, None).await
    }

    /// `begin` with a mode for this turn. A rejected submission leaves the
    /// session's thinking flag as it was.
    pub async fn begin_with_mode(&self, input: &str, mode: Option<TurnMode>) -> Option<PendingTurn> {
        if self.lifetime.is_cancelled() {
            return None;
        }
        let turn = self.session.lock().await.begin_turn(input, mode)?;
        let _ = self.events.send(TranscriptEvent::TurnStarted {
            user_id: turn.user_id,
            reply_id: turn.reply_id,
        });
        Some(turn)
    }

    /// Runs the collaborator call for an accepted turn and writes its result.
    pub async fn drive(&self, turn: PendingTurn) -> TurnOutcome {
        let reply_id = turn.reply_id;
        let result = match turn.mode {
            TurnMode::Streaming => self.drive_stream(&turn).await,
            TurnMode::Thinking => self.drive_batch(&turn).await,
        };

        let outcome = match result {
            Ok(()) if self.lifetime.is_cancelled() => TurnOutcome::Cancelled,
            Ok(()) => TurnOutcome::Completed,
            Err(err) => {
                let detail = format!("{err:#}");
                let stage = err
                    .downcast_ref::<CollaboratorError>()
                    .map_or("transport", |e| e.stage.as_str());
                tracing::error!(
                    %reply_id,
                    provider = self.collaborator.provider().as_str(),
                    mode = ?turn.mode,
                    stage,
                    error = %detail,
                    "chat turn failed"
                );
                if self.write(|s| s.replace_text(reply_id, FALLBACK_ERROR)).await {
                    let _ = self.events.send(TranscriptEvent::Failed { reply_id });
                    TurnOutcome::Failed
                } else {
                    TurnOutcome::Cancelled
                }
            }
        };

        self.session.lock().await.finish_turn(reply_id);
        if outcome == TurnOutcome::Completed {
            let _ = self.events.send(TranscriptEvent::Finished { reply_id });
        }
        tracing::debug!(%reply_id, ?outcome, "chat turn ended");
        outcome
    }

    /// `begin` followed by `drive`.
    pub async fn submit(&self, input: &str) -> Option<TurnOutcome> {
        let turn = self.begin(input).await?;
        Some(self.drive(turn).await)
    }

    /// Closes the panel. Pending calls stop writing to the transcript.
    pub fn dispose(&self) {
        self.lifetime.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    async fn drive_stream(&self, turn: &PendingTurn) -> anyhow::Result<()> {
        let mut stream = self
            .collaborator
            .stream_reply(&turn.history, &turn.text)
            .await?;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            if !self.write(|s| s.append_chunk(turn.reply_id, &chunk)).await {
                return Ok(());
            }
            let _ = self.events.send(TranscriptEvent::Chunk {
                reply_id: turn.reply_id,
                text: chunk,
            });
        }
        Ok(())
    }

    async fn drive_batch(&self, turn: &PendingTurn) -> anyhow::Result<()> {
        let prompt = deep_analysis_prompt(&turn.text);
        let text = self.collaborator.deep_analysis(&prompt).await?;
        if self.write(|s| s.replace_text(turn.reply_id, text)).await {
            let _ = self.events.send(TranscriptEvent::Replaced {
                reply_id: turn.reply_id,
            });
        }
        Ok(())
    }

    /// Applies a transcript mutation unless the panel has been disposed.
    async fn write(&self, f: impl FnOnce(&mut ChatSession) -> bool) -> bool {
        let mut session = self.session.lock().await;
        if self.lifetime.is_cancelled() {
            return false;
        }
        f(&mut *session)
    }
}
