//! Services
//!
//! Business logic behind the HTTP handlers.

pub mod config;
pub mod control;
pub mod dispatcher;
pub mod geodata;
pub mod judge;
pub mod orchestrator;
pub mod store;
pub mod summarizer;
pub mod taxonomy;

pub use config::ConfigService;
pub use control::{AttemptOutcome, ControlLoop};
pub use dispatcher::Dispatcher;
pub use judge::LlmJudgment;
pub use orchestrator::{ChainOutcome, Orchestrator};
pub use store::{ResultStore, StoreEntry, StoreMeta};
pub use summarizer::Summarizer;
pub use taxonomy::{Taxonomy, TaxonomyHandle};
