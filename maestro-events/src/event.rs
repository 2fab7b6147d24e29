//! Event payload (spec §4.10): the message format the Event Bus moves
//! between publishers and subscribers. Grounded on
//! `llmspell-events/src/universal_event.rs`'s `UniversalEvent` (monotonic
//! sequence counter, `EventMetadata`), narrowed to the event kinds spec
//! §4.10 enumerates and scoped to a single process rather than
//! cross-language.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

static SEQUENCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Event kinds emitted by the core (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StatusUpdate,
    LogsUpdate,
    NotesUpdate,
    PlanUpdate,
    DraftUpdate,
    GoalPadUpdate,
    ThoughtPadUpdate,
    ScratchpadUpdate,
    ContextUpdate,
    AgentStatus,
    StreamingChunk,
    DraftContentUpdate,
    ChatTitleUpdate,
    StatsUpdate,
    WebSearchComplete,
    WebSearchError,
    ArxivFetchStart,
    ArxivFetchComplete,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StatusUpdate => "status_update",
            Self::LogsUpdate => "logs_update",
            Self::NotesUpdate => "notes_update",
            Self::PlanUpdate => "plan_update",
            Self::DraftUpdate => "draft_update",
            Self::GoalPadUpdate => "goal_pad_update",
            Self::ThoughtPadUpdate => "thought_pad_update",
            Self::ScratchpadUpdate => "scratchpad_update",
            Self::ContextUpdate => "context_update",
            Self::AgentStatus => "agent_status",
            Self::StreamingChunk => "streaming_chunk",
            Self::DraftContentUpdate => "draft_content_update",
            Self::ChatTitleUpdate => "chat_title_update",
            Self::StatsUpdate => "stats_update",
            Self::WebSearchComplete => "web_search_complete",
            Self::WebSearchError => "web_search_error",
            Self::ArxivFetchStart => "arxiv_fetch_start",
            Self::ArxivFetchComplete => "arxiv_fetch_complete",
        }
    }
}

/// The scope a published event routes through: a mission-wide research
/// channel, a document-session channel, or a single user's channel
/// (spec §4.10's `send_to_mission`/`send_to_session`/`send_to_user`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope_kind")]
pub enum EventScope {
    Mission { mission_id: String },
    Session { session_id: String },
    User { user_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    pub correlation_id: Uuid,
    pub source: Option<String>,
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            source: None,
        }
    }
}

/// A single event moving through the bus. `type`/`mission_id? | session_id?`/
/// `timestamp` are the fields spec §4.10 requires every payload to carry;
/// everything domain-specific lives under `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaestroEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub scope: EventScope,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,
    pub metadata: EventMetadata,
}

impl MaestroEvent {
    pub fn new(kind: EventKind, scope: EventScope, data: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            scope,
            data,
            timestamp: Utc::now(),
            sequence: SEQUENCE_COUNTER.fetch_add(1, Ordering::SeqCst),
            metadata: EventMetadata::default(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.metadata.correlation_id = correlation_id;
        self
    }

    /// Recursive JSON converter that turns unsupported types into their
    /// string forms (spec §4.10). `serde_json::Value` already has no
    /// "unsupported" branch by construction, so this is the identity;
    /// the guarantee is structural rather than a runtime pass.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase_monotonically() {
        let a = MaestroEvent::new(EventKind::StatusUpdate, EventScope::Mission { mission_id: "m1".into() }, Value::Null);
        let b = MaestroEvent::new(EventKind::StatusUpdate, EventScope::Mission { mission_id: "m1".into() }, Value::Null);
        assert!(b.sequence > a.sequence);
    }

    #[test]
    fn event_kind_matches_documented_spelling() {
        assert_eq!(EventKind::WebSearchComplete.as_str(), "web_search_complete");
    }

    #[test]
    fn serializes_with_type_field() {
        let event = MaestroEvent::new(EventKind::AgentStatus, EventScope::User { user_id: "u1".into() }, Value::Null);
        let json = event.to_json().unwrap();
        assert!(json.contains("\"type\":\"agent_status\""));
    }
}
