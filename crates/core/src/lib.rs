pub mod chat;
pub mod detail;
pub mod domain;
pub mod llm;
pub mod store;
pub mod table;

pub mod config {
    use anyhow::Context;

    const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;
    const DEFAULT_MAX_SESSIONS: usize = 1000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub gemini_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub table_page_size: usize,
        pub chat_session_ttl_secs: u64,
        pub chat_max_sessions: usize,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let table_page_size = match std::env::var("TABLE_PAGE_SIZE") {
                Ok(s) => s
                    .trim()
                    .parse::<usize>()
                    .with_context(|| format!("TABLE_PAGE_SIZE must be a positive integer (got {s:?})"))?,
                Err(_) => crate::table::DEFAULT_PAGE_SIZE,
            };
            anyhow::ensure!(table_page_size >= 1, "TABLE_PAGE_SIZE must be >= 1");

            let chat_session_ttl_secs = parse_var("CHAT_SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;
            let chat_max_sessions = parse_var("CHAT_MAX_SESSIONS", DEFAULT_MAX_SESSIONS)?;
            anyhow::ensure!(chat_max_sessions >= 1, "CHAT_MAX_SESSIONS must be >= 1");

            Ok(Self {
                gemini_api_key: non_empty_var("GEMINI_API_KEY").or_else(|| non_empty_var("API_KEY")),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                table_page_size,
                chat_session_ttl_secs,
                chat_max_sessions,
            })
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY (or API_KEY) is required")
        }
    }

    fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match non_empty_var(name) {
            Some(s) => s
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{name} is invalid ({s:?}): {e}")),
            None => Ok(default),
        }
    }

    fn non_empty_var(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|s| !s.trim().is_empty())
    }
}
