//! Process bootstrap: shared state, shutdown, events and server wiring.

mod events;
mod server;
mod shutdown;
mod state;

pub use events::{Event, EventBus};
pub use server::Server;
pub use shutdown::{Shutdown, ShutdownState};
pub use state::{EngineState, SharedEngineState};
