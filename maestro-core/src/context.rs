//! Hierarchical execution context. A mission, a writing session, and a
//! single agent invocation within it each get a scope; values set at a
//! broader scope are visible to narrower ones according to the configured
//! inheritance policy.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{MaestroError, Result};
use crate::types::ComponentId;

/// How a child context's data relates to its parent's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InheritancePolicy {
    /// Child starts with a full copy of the parent's data.
    Inherit,
    /// Child starts empty; nothing crosses the boundary.
    Isolate,
    /// Child starts with only the parent's `conversation_context` key.
    Copy,
    /// Child and parent read/write the same shared-memory region.
    Share,
}

/// Where a piece of context-scoped data lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextScope {
    Global,
    Mission(String),
    WritingSession(String),
    Agent(ComponentId),
}

impl fmt::Display for ContextScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Mission(id) => write!(f, "mission:{id}"),
            Self::WritingSession(id) => write!(f, "session:{id}"),
            Self::Agent(id) => write!(f, "agent:{id}"),
        }
    }
}

/// Scope-keyed key/value storage shared by every context at a given scope.
/// Lock poisoning is recovered from rather than propagated, matching the
/// rest of this codebase's "a panicking reader must not wedge every other
/// reader" stance.
#[derive(Clone, Default)]
pub struct SharedMemory {
    regions: Arc<RwLock<HashMap<ContextScope, HashMap<String, Value>>>>,
}

impl SharedMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, scope: &ContextScope, key: &str) -> Option<Value> {
        let regions = self.regions.read();
        regions.get(scope).and_then(|m| m.get(key)).cloned()
    }

    pub fn set(&self, scope: ContextScope, key: impl Into<String>, value: Value) {
        let mut regions = self.regions.write();
        regions.entry(scope).or_default().insert(key.into(), value);
    }

    pub fn remove(&self, scope: &ContextScope, key: &str) -> Option<Value> {
        let mut regions = self.regions.write();
        regions.get_mut(scope).and_then(|m| m.remove(key))
    }

    pub fn clear_scope(&self, scope: &ContextScope) {
        self.regions.write().remove(scope);
    }

    pub fn keys(&self, scope: &ContextScope) -> Vec<String> {
        self.regions
            .read()
            .get(scope)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Per-invocation context threaded through `BaseAgent::execute`, the Model
/// Dispatcher, and the retrieval tools. Carries identity (mission/session),
/// freeform data local to this invocation, and a handle to scope-shared
/// memory for anything that needs to cross invocation boundaries (the
/// running thought pad, accumulated goals).
#[derive(Clone)]
pub struct ExecutionContext {
    pub id: String,
    pub parent_id: Option<String>,
    pub scope: ContextScope,
    pub inheritance: InheritancePolicy,
    pub mission_id: Option<String>,
    pub session_id: Option<String>,
    data: HashMap<String, Value>,
    shared_memory: SharedMemory,
    cancel: CancellationToken,
}

impl ExecutionContext {
    pub fn new(scope: ContextScope) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            parent_id: None,
            scope,
            inheritance: InheritancePolicy::Inherit,
            mission_id: None,
            session_id: None,
            data: HashMap::new(),
            shared_memory: SharedMemory::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn for_mission(mission_id: impl Into<String>) -> Self {
        let mission_id = mission_id.into();
        let mut ctx = Self::new(ContextScope::Mission(mission_id.clone()));
        ctx.mission_id = Some(mission_id);
        ctx
    }

    pub fn with_mission_id(mut self, mission_id: impl Into<String>) -> Self {
        self.mission_id = Some(mission_id.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Derive a child context for a nested invocation (e.g. a single
    /// per-section writing call inside a mission), applying this context's
    /// inheritance policy.
    pub fn create_child(&self, scope: ContextScope, inheritance: InheritancePolicy) -> Self {
        let data = match inheritance {
            InheritancePolicy::Inherit => self.data.clone(),
            InheritancePolicy::Copy => self
                .data
                .get("conversation_context")
                .map(|v| {
                    let mut m = HashMap::new();
                    m.insert("conversation_context".to_string(), v.clone());
                    m
                })
                .unwrap_or_default(),
            InheritancePolicy::Isolate | InheritancePolicy::Share => HashMap::new(),
        };

        tracing::debug!(parent = %self.id, child_scope = %scope, ?inheritance, "creating child execution context");

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            parent_id: Some(self.id.clone()),
            scope,
            inheritance,
            mission_id: self.mission_id.clone(),
            session_id: self.session_id.clone(),
            data,
            shared_memory: self.shared_memory.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// A clone of the mission/session-wide cancellation signal. Every
    /// context created by `create_child` from a common ancestor shares the
    /// same underlying token, so cancelling any one of them is visible to
    /// all in-flight work under that mission (spec §4.11's "L6 tracks
    /// in-flight work so pause/stop is immediate").
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Check the cancellation signal at a suspension point, per spec
    /// §4.4's "any suspension point checks the mission/session's cancel
    /// signal and returns partial results."
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(MaestroError::Cancelled);
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    pub fn get_shared(&self, key: &str) -> Option<Value> {
        self.shared_memory.get(&self.scope, key)
    }

    pub fn set_shared(&self, key: impl Into<String>, value: Value) {
        self.shared_memory.set(self.scope.clone(), key, value);
    }

    pub fn shared_memory(&self) -> &SharedMemory {
        &self.shared_memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inherit_copies_all_data() {
        let ctx = ExecutionContext::for_mission("m1").with_data("goal", Value::String("x".into()));
        let child = ctx.create_child(ContextScope::Agent(ComponentId::new()), InheritancePolicy::Inherit);
        assert_eq!(child.get("goal"), Some(&Value::String("x".into())));
    }

    #[test]
    fn isolate_starts_empty() {
        let ctx = ExecutionContext::for_mission("m1").with_data("goal", Value::String("x".into()));
        let child = ctx.create_child(ContextScope::Agent(ComponentId::new()), InheritancePolicy::Isolate);
        assert!(child.get("goal").is_none());
    }

    #[test]
    fn copy_keeps_only_conversation_context() {
        let ctx = ExecutionContext::for_mission("m1")
            .with_data("goal", Value::String("x".into()))
            .with_data("conversation_context", Value::String("hist".into()));
        let child = ctx.create_child(ContextScope::Agent(ComponentId::new()), InheritancePolicy::Copy);
        assert!(child.get("goal").is_none());
        assert_eq!(
            child.get("conversation_context"),
            Some(&Value::String("hist".into()))
        );
    }

    #[test]
    fn shared_memory_is_scope_keyed() {
        let mem = SharedMemory::new();
        let scope = ContextScope::Mission("m1".into());
        mem.set(scope.clone(), "k", Value::Bool(true));
        assert_eq!(mem.get(&scope, "k"), Some(Value::Bool(true)));
        assert_eq!(mem.get(&ContextScope::Mission("m2".into()), "k"), None);
    }

    #[test]
    fn cancelling_parent_is_visible_to_children() {
        let ctx = ExecutionContext::for_mission("m1");
        let child = ctx.create_child(ContextScope::Agent(ComponentId::new()), InheritancePolicy::Inherit);
        assert!(!child.is_cancelled());
        ctx.cancel();
        assert!(child.is_cancelled());
        assert!(child.check_cancelled().is_err());
    }

    #[test]
    fn shared_memory_survives_child_context_share() {
        let ctx = ExecutionContext::for_mission("m1");
        ctx.set_shared("goal_pad", Value::String("first".into()));
        let child = ctx.create_child(ctx.scope.clone(), InheritancePolicy::Share);
        assert_eq!(child.get_shared("goal_pad"), Some(Value::String("first".into())));
    }
}
