//! Event Bus (L5, spec §4.10) and its WebSocket transport
//! (SPEC_FULL §[EXPANSION 4.10a]).

pub mod bus;
pub mod event;
pub mod transport;

pub use bus::{BusError, ConnectionScope, EventBus, OutgoingMessage};
pub use event::{EventKind, EventMetadata, EventScope, MaestroEvent};
pub use transport::{spawn_heartbeat, AllowAllAuthenticator, TokenAuthenticator};
