//! Admin HTTP API: health, stats and the campaign control surface.

mod handlers;
mod server;

pub use handlers::{ActionResponse, ErrorResponse, HealthResponse, StatsResponse};
pub use server::{AdminServer, AdminState};
