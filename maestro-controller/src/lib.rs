//! Mission Controller (H2), Task Manager (L6): the orchestration layer that
//! drives a mission through its phase graph, invoking `maestro-research`'s
//! and `maestro-report`'s collaborators along the way, and tracking
//! cancellable background work. See spec §4.9 and §4.11.

pub mod controller;
pub mod phase;
pub mod tasks;

pub use controller::{ControlSignal, MissionController, MissionRun};
pub use phase::{MissionPhase, MissionPhaseMachine, PhaseTransition};
pub use tasks::{gather_cancellable, mission_scope, TaskManager};
