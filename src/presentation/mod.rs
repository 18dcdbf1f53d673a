pub mod config;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use config::{CliOverrides, Environment, Settings};
pub use router::{TRANSCRIPTION_ROUTE, create_router};
pub use state::AppState;
