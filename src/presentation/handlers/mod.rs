pub mod api_types;
mod health;
mod root;
mod transcription;

pub use health::health_handler;
pub use root::{SERVICE_NAME, root_handler};
pub use transcription::transcription_handler;
