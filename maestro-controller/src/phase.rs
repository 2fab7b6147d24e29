//! Mission phase state machine (spec §4.9). Grounded on
//! `llmspell-agents/src/lifecycle/state_machine.rs`'s shape — an enum with
//! `can_*` const-fn predicates, a recorded `StateTransition` history — but
//! without that file's hook-point/circuit-breaker machinery, which has no
//! counterpart anywhere in the spec.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use maestro_core::error::{MaestroError, Result};

/// A mission's position in the pipeline spec §4.9 draws:
/// `pending -> planning -> initial_exploration -> structured_research ->
/// [replan] -> note_assignment -> writing -> finalization -> completed`,
/// with `failed` reachable from every phase and `paused`/`stopped` reachable
/// at every suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionPhase {
    Pending,
    Planning,
    InitialExploration,
    StructuredResearch,
    Replanning,
    NoteAssignment,
    Writing,
    Finalization,
    Completed,
    Failed,
    Paused,
    Stopped,
}

impl MissionPhase {
    /// Whether the controller may still make forward progress from this
    /// phase (not a terminal outcome).
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    /// Whether this phase is one of the three terminal outcomes.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    /// Whether `target` is a valid next phase from `self`, per spec §4.9's
    /// graph. `failed` is reachable from any non-terminal phase; `paused`
    /// is reachable from any active phase and resumes back to the same
    /// phase it paused from (modeled here as the caller re-entering the
    /// phase it was in, not as a fixed edge).
    pub const fn can_transition_to(&self, target: MissionPhase) -> bool {
        use MissionPhase::{
            Completed, Failed, Finalization, InitialExploration, NoteAssignment, Paused, Pending,
            Planning, Replanning, Stopped, StructuredResearch, Writing,
        };
        if matches!(target, Failed | Stopped) {
            return self.is_active();
        }
        if matches!(target, Paused) {
            return self.is_active();
        }
        match (self, target) {
            (Pending, Planning) => true,
            (Planning, InitialExploration) => true,
            (InitialExploration, StructuredResearch) => true,
            (StructuredResearch, Replanning) => true,
            (StructuredResearch, NoteAssignment) => true,
            (Replanning, NoteAssignment) => true,
            (NoteAssignment, Writing) => true,
            (Writing, Finalization) => true,
            (Finalization, Completed) => true,
            // Resuming from pause returns to the phase that was
            // interrupted; every phase may transition back into itself
            // to model this without needing to track "paused-from".
            (Paused, _) => true,
            (current, next) if *current == next => true,
            _ => false,
        }
    }
}

/// A recorded phase transition (grounded on the teacher's `StateTransition`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: MissionPhase,
    pub to: MissionPhase,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Per-mission phase machine. `maestro-controller::controller` drives one
/// instance of this per mission; `maestro-events` is notified of every
/// transition by the caller (this type has no Event Bus dependency itself,
/// keeping it testable in isolation).
pub struct MissionPhaseMachine {
    mission_id: String,
    current: Arc<RwLock<MissionPhase>>,
    history: Arc<RwLock<Vec<PhaseTransition>>>,
}

impl MissionPhaseMachine {
    pub fn new(mission_id: impl Into<String>) -> Self {
        Self {
            mission_id: mission_id.into(),
            current: Arc::new(RwLock::new(MissionPhase::Pending)),
            history: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn current(&self) -> MissionPhase {
        *self.current.read().await
    }

    pub async fn history(&self) -> Vec<PhaseTransition> {
        self.history.read().await.clone()
    }

    /// Attempt a transition, recording it on success. Rejects a transition
    /// spec §4.9's graph doesn't allow.
    pub async fn transition_to(&self, target: MissionPhase, reason: Option<String>) -> Result<()> {
        let mut current = self.current.write().await;
        if *current == target {
            return Ok(());
        }
        if !current.can_transition_to(target) {
            return Err(MaestroError::internal(format!(
                "mission {} cannot transition from {current:?} to {target:?}",
                self.mission_id
            )));
        }
        let transition = PhaseTransition {
            from: *current,
            to: target,
            timestamp: Utc::now(),
            reason,
        };
        tracing::info!(mission_id = %self.mission_id, from = ?transition.from, to = ?transition.to, "mission phase transition");
        *current = target;
        drop(current);
        self.history.write().await.push(transition);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn happy_path_follows_the_documented_graph() {
        let machine = MissionPhaseMachine::new("m1");
        for phase in [
            MissionPhase::Planning,
            MissionPhase::InitialExploration,
            MissionPhase::StructuredResearch,
            MissionPhase::NoteAssignment,
            MissionPhase::Writing,
            MissionPhase::Finalization,
            MissionPhase::Completed,
        ] {
            machine.transition_to(phase, None).await.unwrap();
        }
        assert_eq!(machine.current().await, MissionPhase::Completed);
        assert_eq!(machine.history().await.len(), 7);
    }

    #[tokio::test]
    async fn optional_replan_is_reachable_from_structured_research() {
        let machine = MissionPhaseMachine::new("m1");
        machine.transition_to(MissionPhase::Planning, None).await.unwrap();
        machine.transition_to(MissionPhase::InitialExploration, None).await.unwrap();
        machine.transition_to(MissionPhase::StructuredResearch, None).await.unwrap();
        machine.transition_to(MissionPhase::Replanning, None).await.unwrap();
        machine.transition_to(MissionPhase::NoteAssignment, None).await.unwrap();
        assert_eq!(machine.current().await, MissionPhase::NoteAssignment);
    }

    #[tokio::test]
    async fn failed_is_reachable_from_any_active_phase() {
        let machine = MissionPhaseMachine::new("m1");
        machine.transition_to(MissionPhase::Planning, Some("boom".into())).await.unwrap();
        machine.transition_to(MissionPhase::Failed, Some("boom".into())).await.unwrap();
        assert!(machine.current().await.is_terminal());
    }

    #[tokio::test]
    async fn skipping_phases_is_rejected() {
        let machine = MissionPhaseMachine::new("m1");
        let err = machine.transition_to(MissionPhase::Writing, None).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn paused_resumes_back_into_any_phase() {
        let machine = MissionPhaseMachine::new("m1");
        machine.transition_to(MissionPhase::Planning, None).await.unwrap();
        machine.transition_to(MissionPhase::Paused, None).await.unwrap();
        machine.transition_to(MissionPhase::Planning, None).await.unwrap();
        assert_eq!(machine.current().await, MissionPhase::Planning);
    }
}
