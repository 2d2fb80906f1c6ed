//! Answering Core Components
//!
//! The answering layer turns ranked search results into model answers:
//! - Context assembly under a character budget
//! - Prompt construction and model calls with retry policy
//! - Summaries of book text
//! - Model client abstraction

mod assembler;
mod model;
mod synthesizer;

pub use assembler::{char_len, ContextAssembler, SNIPPET_SEPARATOR};
pub use model::{create_model, ModelClient, OfflineModel, OpenAiCompatibleModel};
pub use synthesizer::{build_prompt, build_summary_prompt, SynthesisOptions, Synthesizer};
