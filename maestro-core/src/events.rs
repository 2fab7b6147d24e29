//! The narrow seam components upstream of the Event Bus (L5) emit progress
//! events through, without depending on `maestro-events` directly — spec
//! §4.10's event kinds (`web_search_complete`, `arxiv_fetch_start`, ...) are
//! produced by the retrieval tools and the research pipelines, but only the
//! Event Bus itself owns subscription/delivery state (Design Notes §9).

use serde_json::Value;

/// Implemented by `maestro-events::EventBus`. A no-op sink is useful in
/// tests and standalone tool invocations where nothing is subscribed.
pub trait EventSink: Send + Sync {
    fn emit(&self, event_type: &str, payload: Value);
}

pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event_type: &str, _payload: Value) {}
}
