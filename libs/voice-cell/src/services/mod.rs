pub mod control;
pub mod executor;
pub mod presentation;

pub use control::{ControlMessage, HumeControlClient, VoiceControl};
pub use executor::{ToolContext, ToolExecutor};
