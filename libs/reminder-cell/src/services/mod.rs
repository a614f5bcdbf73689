pub mod eligibility;
pub mod lifecycle;
pub mod reminder;
pub mod store;

pub use eligibility::*;
pub use lifecycle::*;
pub use reminder::ReminderCallService;
pub use store::{ReminderStore, SupabaseReminderStore};
