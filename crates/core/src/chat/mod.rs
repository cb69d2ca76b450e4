mod panel;
mod session;

pub use panel::{CancelToken, ChatPanel, SessionSnapshot, TranscriptEvent, TurnOutcome};
pub use session::{ChatSession, PendingTurn, TurnMode};
