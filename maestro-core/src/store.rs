//! Mission Context Store (L7): the authoritative, persistable state for a
//! mission. Plan replacement is atomic — readers see either the previous
//! outline or the new one, never a partial merge (§5 "Plan replacement is
//! atomic").

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{MaestroError, Result};
use crate::model::{LogEntry, Mission, Note, Plan};

/// Narrow persistence seam. Missions, chats, writing sessions and settings
/// all ultimately persist somewhere (§6); this implementation ships an
/// in-process default and leaves room for a Postgres-backed one behind the
/// same trait, matching the spec's "the target implementation chooses
/// storage."
#[async_trait]
pub trait MissionStore: Send + Sync {
    async fn put(&self, mission: Mission) -> Result<()>;
    async fn get(&self, mission_id: &str) -> Result<Mission>;
    async fn list(&self) -> Result<Vec<Mission>>;
    async fn delete(&self, mission_id: &str) -> Result<()>;

    /// Replace the mission's plan as a single atomic write.
    async fn replace_plan(&self, mission_id: &str, plan: Plan) -> Result<()>;

    async fn append_note(&self, mission_id: &str, note: Note) -> Result<()>;
    async fn append_log(&self, mission_id: &str, entry: LogEntry) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct InMemoryMissionStore {
    missions: Arc<RwLock<HashMap<String, Mission>>>,
}

impl InMemoryMissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MissionStore for InMemoryMissionStore {
    async fn put(&self, mission: Mission) -> Result<()> {
        self.missions.write().insert(mission.id.clone(), mission);
        Ok(())
    }

    async fn get(&self, mission_id: &str) -> Result<Mission> {
        self.missions
            .read()
            .get(mission_id)
            .cloned()
            .ok_or_else(|| MaestroError::internal(format!("unknown mission: {mission_id}")))
    }

    async fn list(&self) -> Result<Vec<Mission>> {
        Ok(self.missions.read().values().cloned().collect())
    }

    async fn delete(&self, mission_id: &str) -> Result<()> {
        self.missions.write().remove(mission_id);
        Ok(())
    }

    async fn replace_plan(&self, mission_id: &str, plan: Plan) -> Result<()> {
        let mut missions = self.missions.write();
        let mission = missions
            .get_mut(mission_id)
            .ok_or_else(|| MaestroError::internal(format!("unknown mission: {mission_id}")))?;
        // Single write under one lock acquisition: no reader can observe a
        // mission with only half of the new plan applied.
        mission.plan = Some(plan);
        Ok(())
    }

    async fn append_note(&self, mission_id: &str, note: Note) -> Result<()> {
        let mut missions = self.missions.write();
        let mission = missions
            .get_mut(mission_id)
            .ok_or_else(|| MaestroError::internal(format!("unknown mission: {mission_id}")))?;
        mission.notes.push(note);
        Ok(())
    }

    async fn append_log(&self, mission_id: &str, entry: LogEntry) -> Result<()> {
        let mut missions = self.missions.write();
        let mission = missions
            .get_mut(mission_id)
            .ok_or_else(|| MaestroError::internal(format!("unknown mission: {mission_id}")))?;
        mission.execution_log.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Plan, ReportSection};

    #[tokio::test]
    async fn plan_replacement_is_visible_whole_or_not_at_all() {
        let store = InMemoryMissionStore::new();
        store.put(Mission::new("m1", "research x")).await.unwrap();

        let plan = Plan {
            mission_goal: "goal".into(),
            report_outline: vec![ReportSection::new("s1", "Intro")],
        };
        store.replace_plan("m1", plan).await.unwrap();

        let mission = store.get("m1").await.unwrap();
        assert_eq!(mission.plan.unwrap().report_outline.len(), 1);
    }

    #[tokio::test]
    async fn get_unknown_mission_errors() {
        let store = InMemoryMissionStore::new();
        assert!(store.get("missing").await.is_err());
    }
}
