//! The docforge tool server
//!
//! A line-oriented JSON-RPC (MCP-style) server over stdio. The dispatcher is
//! the single entry point for tool invocations: it validates the tool name
//! against a fixed registry, validates arguments, sequences the stores and
//! the assembler, and converts every internal error into a structured
//! failure response. Callers always receive a well-formed response object.

mod dispatch;
mod protocol;
mod rpc;
mod tools;

pub use dispatch::Dispatcher;
pub use protocol::{ContentBlock, RpcRequest, RpcResponse, ToolResponse};
pub use rpc::{handle_request, serve};
pub use tools::{CONTINUE_DOCUMENT, GENERATE_DOCUMENT, LIST_SITES, SEARCH_DOCUMENTS, registry};

use anyhow::Context;

use docforge_backend::{CachedGateway, HttpBackend, HttpTicketSource, TicketSource};
use docforge_config::Config;
use docforge_utils::cache::FingerprintCache;

/// Wire the HTTP collaborators and the fingerprint cache into a dispatcher.
///
/// # Errors
///
/// Returns an error when an HTTP client cannot be constructed from the
/// configuration.
pub fn build_dispatcher(config: Config) -> anyhow::Result<Dispatcher> {
    let backend = HttpBackend::new(config.backend_url.clone(), config.http_timeout)
        .context("backend client construction failed")?;

    let tracker: Option<Box<dyn TicketSource>> = match &config.tracker_url {
        Some(url) => Some(Box::new(
            HttpTicketSource::new(url.clone(), config.tracker_token.clone(), config.http_timeout)
                .context("issue-tracker client construction failed")?,
        )),
        None => None,
    };

    let cache = FingerprintCache::new(config.cache_root.clone());
    let gateway = CachedGateway::new(Box::new(backend), tracker, cache, config.cache_ttls);
    Ok(Dispatcher::new(config, gateway))
}
