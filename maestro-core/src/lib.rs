//! Shared vocabulary for the Maestro orchestration engine: component
//! identifiers, the error enum every kind in the error-handling design maps
//! to, the hierarchical execution context agents run under, the `BaseAgent`
//! seam the Model Dispatcher calls through, and the mission data model.

pub mod context;
pub mod error;
pub mod events;
pub mod model;
pub mod store;
pub mod traits;
pub mod types;

pub use context::{ContextScope, ExecutionContext, InheritancePolicy};
pub use error::{MaestroError, Result};
pub use events::{EventSink, NoopEventSink};
pub use model::*;
pub use store::{InMemoryMissionStore, MissionStore};
pub use traits::{AgentInput, AgentOutput, BaseAgent};
pub use types::{ComponentId, ComponentMetadata, Version};
