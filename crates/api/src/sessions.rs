use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use scout_core::chat::ChatPanel;
use scout_core::config::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Sessions untouched for this long are closed.
    pub idle_ttl: Duration,
    /// Opening a session beyond this closes the least recently used one.
    pub max_sessions: usize,
}

impl SessionLimits {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            idle_ttl: Duration::from_secs(settings.chat_session_ttl_secs),
            max_sessions: settings.chat_max_sessions,
        }
    }
}

struct Entry {
    panel: ChatPanel,
    last_seen: Instant,
}

/// Open chat panels keyed by session id. Every removal disposes the panel.
#[derive(Clone)]
pub struct SessionRegistry {
    limits: SessionLimits,
    entries: Arc<Mutex<HashMap<Uuid, Entry>>>,
}

impl SessionRegistry {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            limits: SessionLimits {
                max_sessions: limits.max_sessions.max(1),
                ..limits
            },
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn open(&self, panel: ChatPanel) -> Uuid {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        evict_idle(&mut entries, now, self.limits.idle_ttl);

        while entries.len() >= self.limits.max_sessions {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_seen)
                .map(|(id, _)| *id)
            else {
                break;
            };
            if let Some(entry) = entries.remove(&oldest) {
                entry.panel.dispose();
                tracing::info!(session_id = %oldest, "chat session evicted (capacity)");
            }
        }

        let id = Uuid::new_v4();
        entries.insert(
            id,
            Entry {
                panel,
                last_seen: now,
            },
        );
        id
    }

    /// Looks up a live panel and marks it as used.
    pub async fn get(&self, id: Uuid) -> Option<ChatPanel> {
        let mut entries = self.entries.lock().await;
        let entry = entries.get_mut(&id)?;
        if entry.panel.is_disposed() {
            entries.remove(&id);
            return None;
        }
        entry.last_seen = Instant::now();
        Some(entry.panel.clone())
    }

    pub async fn close(&self, id: Uuid) -> bool {
        match self.entries.lock().await.remove(&id) {
            Some(entry) => {
                entry.panel.dispose();
                true
            }
            None => false,
        }
    }

    /// Closes idle sessions. Returns how many were closed.
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.lock().await;
        evict_idle(&mut entries, Instant::now(), self.limits.idle_ttl)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            loop {
                tick.tick().await;
                let closed = registry.sweep().await;
                if closed > 0 {
                    tracing::info!(closed, "idle chat sessions closed");
                }
            }
        })
    }
}

fn evict_idle(entries: &mut HashMap<Uuid, Entry>, now: Instant, ttl: Duration) -> usize {
    let before = entries.len();
    entries.retain(|id, e| {
        let keep = now.duration_since(e.last_seen) < ttl && !e.panel.is_disposed();
        if !keep {
            e.panel.dispose();
            tracing::info!(session_id = %id, "chat session evicted (idle)");
        }
        keep
    });
    before - entries.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use scout_core::domain::chat::ChatMessage;
    use scout_core::llm::{ChatCollaborator, Provider, TextStream};

    struct Silent;

    #[async_trait::async_trait]
    impl ChatCollaborator for Silent {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        async fn stream_reply(
            &self,
            _history: &[ChatMessage],
            _text: &str,
        ) -> anyhow::Result<TextStream> {
            Ok(futures::stream::empty().boxed())
        }

        async fn deep_analysis(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(String::new())
        }
    }

    fn panel() -> ChatPanel {
        ChatPanel::open(Arc::new(Silent))
    }

    fn registry(idle_secs: u64, max_sessions: usize) -> SessionRegistry {
        SessionRegistry::new(SessionLimits {
            idle_ttl: Duration::from_secs(idle_secs),
            max_sessions,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_evicts_least_recently_used() {
        let sessions = registry(3600, 2);
        let a = panel();
        let a_id = sessions.open(a.clone()).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        let b_id = sessions.open(panel()).await;
        tokio::time::advance(Duration::from_secs(1)).await;

        // Touching `a` makes `b` the oldest.
        assert!(sessions.get(a_id).await.is_some());
        tokio::time::advance(Duration::from_secs(1)).await;
        let c_id = sessions.open(panel()).await;

        assert_eq!(sessions.len().await, 2);
        assert!(sessions.get(b_id).await.is_none());
        assert!(sessions.get(a_id).await.is_some());
        assert!(sessions.get(c_id).await.is_some());
        assert!(!a.is_disposed());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_swept_and_disposed() {
        let sessions = registry(60, 100);
        let kept = panel();
        let idle = panel();
        let kept_id = sessions.open(kept.clone()).await;
        let idle_id = sessions.open(idle.clone()).await;

        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(sessions.get(kept_id).await.is_some());
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(sessions.sweep().await, 1);
        assert!(idle.is_disposed());
        assert!(!kept.is_disposed());
        assert!(sessions.get(idle_id).await.is_none());
        assert!(sessions.get(kept_id).await.is_some());
    }

    #[tokio::test]
    async fn close_disposes_and_forgets() {
        let sessions = registry(60, 10);
        let p = panel();
        let id = sessions.open(p.clone()).await;
        assert!(sessions.close(id).await);
        assert!(p.is_disposed());
        assert!(!sessions.close(id).await);
        assert!(sessions.get(id).await.is_none());
    }
}
