//! Retrieval-gated answering for Sojourn.
//!
//! Detects the query language, retrieves passages from a remote index,
//! gates and clamps them, attempts a strictly grounded completion, and
//! falls back to a general-knowledge answer when grounding is insufficient.

pub mod completion;
pub mod context;
pub mod engine;
pub mod error;
pub mod index;
pub mod lang;
pub mod mock;
pub mod prompts;
pub mod retriever;

pub use completion::{CompletionClient, HttpCompletionClient};
pub use engine::AnswerEngine;
pub use error::RagError;
pub use index::{LlamaCloudIndex, PassageIndex};
pub use lang::{Language, LanguageDetector};
pub use mock::{FailingIndex, ScriptedCompletion, StaticIndex};
pub use retriever::ContextRetriever;
