//! Library-level error taxonomy with user-friendly reporting
//!
//! `DocForgeError` is the primary error type returned by docforge library
//! operations. Every error that reaches the tool dispatcher boundary is
//! converted into a well-formed response object; nothing here is ever allowed
//! to propagate as a transport-level fault.
//!
//! `Cache` is the one internal-only kind: storage failures are logged and
//! recovered locally as cache misses, so callers never observe them.

use thiserror::Error;

use crate::types::DocumentType;

/// Errors from the backend knowledge service or the issue tracker.
///
/// Both collaborators speak the same `{ success, message?, data? }` envelope,
/// and `success: false` is treated uniformly as an upstream failure
/// regardless of the specific endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("upstream rejected the call: {message}")]
    Rejected { message: String },

    #[error("upstream returned a malformed payload: {reason}")]
    Malformed { reason: String },
}

/// Configuration file or environment errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}

/// Primary docforge error type.
///
/// Library code returns `DocForgeError` and does NOT call
/// `std::process::exit()`; the binary maps fatal startup errors to exit
/// codes, and the dispatcher maps everything else to `isError` responses
/// via [`display_for_user()`](Self::display_for_user).
#[derive(Error, Debug)]
pub enum DocForgeError {
    /// No document-type pattern matched the request text
    #[error("could not determine a document type from the request")]
    ClassificationAmbiguous { request: String },

    /// No exact or fuzzy site match; carries ranked suggestions
    #[error("site '{requested}' not found")]
    SiteNotFound {
        requested: String,
        suggestions: Vec<String>,
    },

    /// Backend has no template for the resolved (document type, site) pair
    #[error("no {document_type} template registered for site '{site}'")]
    TemplateNotFound {
        document_type: DocumentType,
        site: String,
    },

    /// Backend or issue-tracker call failed or timed out
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Continuation referenced a missing or expired workflow session
    #[error("workflow session '{session_id}' is missing or expired")]
    WorkflowExpired { session_id: String, ttl_secs: u64 },

    /// Non-fatal storage failure; recovered internally as a cache miss
    #[error("cache error: {0}")]
    Cache(String),

    /// Startup configuration problem
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tool invocation carried missing or ill-typed arguments
    #[error("invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// Tool name not present in the registry
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
}

impl DocForgeError {
    /// Format this error for the end user: name the likely cause and give a
    /// concrete next step.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        match self {
            Self::ClassificationAmbiguous { request } => format!(
                "Could not determine which document to generate from \"{request}\".\n\
                 Name the document kind explicitly, e.g. \"impact analysis for the order module\" \
                 or \"테이블 명세서\" for a table specification."
            ),
            Self::SiteNotFound {
                requested,
                suggestions,
            } => {
                if suggestions.is_empty() {
                    format!(
                        "Site '{requested}' was not found and nothing similar is registered.\n\
                         Use the list_sites tool to see the available sites."
                    )
                } else {
                    format!(
                        "Site '{requested}' was not found. Closest matches: {}.\n\
                         Retry with one of those names, or use list_sites for the full list.",
                        suggestions.join(", ")
                    )
                }
            }
            Self::TemplateNotFound {
                document_type,
                site,
            } => format!(
                "The backend has no {} template for site '{site}'.\n\
                 Register one in the admin UI, or generate the document for a site that has it.",
                document_type.label()
            ),
            Self::Upstream(err) => format!(
                "An upstream service call failed: {err}.\n\
                 This is usually transient; retry the request. Failed calls are never cached."
            ),
            Self::WorkflowExpired {
                session_id,
                ttl_secs,
            } => format!(
                "Workflow session '{session_id}' is missing or expired (sessions live {ttl_secs}s \
                 and are single-use).\n\
                 Start over with generate_document to obtain a fresh session."
            ),
            Self::Cache(reason) => {
                // Recovered internally; shown only if something surfaces it anyway
                format!("Cache degraded to pass-through: {reason}")
            }
            Self::Config(err) => format!("Configuration problem: {err}"),
            Self::InvalidArguments { tool, reason } => format!(
                "Invalid arguments for tool '{tool}': {reason}.\n\
                 Check the tool's input schema from tools/list."
            ),
            Self::UnknownTool(name) => format!(
                "Unknown tool '{name}'. Use tools/list to see the registered tools."
            ),
        }
    }
}
