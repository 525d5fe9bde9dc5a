//! Activity logging and reporting for LLM operations.

pub mod events;
pub mod reporter;

pub use events::{EventLog, LlmEvent, Operation};
