//! docforge is an MCP-style tool server that turns short natural-language
//! requests into fully assembled technical documents.
//!
//! The orchestration core lives in the member crates; this crate re-exports
//! the public surface and hosts the CLI.

pub mod cli;

pub use docforge_assemble::{AssemblyInput, assemble};
pub use docforge_backend::{
    CachedGateway, HttpBackend, HttpTicketSource, KnowledgeBackend, TicketSource,
};
pub use docforge_classify::{DEFAULT_TABLE, classify, classify_default};
pub use docforge_config::{CacheTtls, Config};
pub use docforge_directory::SiteDirectory;
pub use docforge_guideline::{GuidelineMergeCache, fold_guidelines};
pub use docforge_server::{Dispatcher, ToolResponse, build_dispatcher, registry, serve};
pub use docforge_utils::error::DocForgeError;
pub use docforge_utils::types;
pub use docforge_utils::types::DocumentType;
pub use docforge_workflow::{SessionStore, WorkflowSession};
