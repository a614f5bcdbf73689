pub mod client;
pub mod interaction_log;
pub mod token_cache;

pub use client::{Clock, SchedulingApi, SchedulingClient};
pub use interaction_log::{InteractionEvent, InteractionLogger, LogContext};
pub use token_cache::TokenCache;
