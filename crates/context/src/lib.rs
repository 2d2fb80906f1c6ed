//! Axiotome Context
//!
//! The `ask_ai` pipeline: admission control, context retrieval from the
//! library, and answer synthesis against the configured model. Summaries
//! of books or supplied text share the same admission path.

pub mod gate;
pub mod service;

pub use gate::{AskGate, AskPermit};
pub use service::{AskService, SummaryTarget};
