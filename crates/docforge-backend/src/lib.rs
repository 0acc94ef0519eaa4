//! External collaborators for docforge
//!
//! The backend knowledge service and the issue tracker are reachable only as
//! opaque HTTP services. Both sit behind async traits so the dispatcher can
//! be exercised without sockets, and all outbound traffic funnels through
//! [`CachedGateway`], which de-duplicates calls via the fingerprint cache.

mod envelope;
mod gateway;
mod http;

pub use envelope::ApiEnvelope;
pub use gateway::CachedGateway;
pub use http::{HttpBackend, HttpTicketSource};

use async_trait::async_trait;

use docforge_utils::error::UpstreamError;
use docforge_utils::types::{DocumentHit, DocumentType, Guideline, Site, Template, Ticket};

/// The backend knowledge/document service, specified only at its boundary.
///
/// Every endpoint returns `{ success, message?, data? }`; `success: false`
/// is an upstream failure regardless of the specific endpoint. An absent
/// `data` on a successful template fetch means the backend has no template
/// registered for the pair, which is not an upstream failure.
#[async_trait]
pub trait KnowledgeBackend: Send + Sync {
    /// `GET /sites`: the full site list
    async fn fetch_sites(&self) -> Result<Vec<Site>, UpstreamError>;

    /// `GET /templates/guide/{documentType}?site_id=`: the document template
    async fn fetch_template(
        &self,
        document_type: DocumentType,
        site_id: &str,
    ) -> Result<Option<Template>, UpstreamError>;

    /// `GET /analysis/guidelines/{documentType}?site_id=`: raw guidelines
    async fn fetch_guidelines(
        &self,
        document_type: DocumentType,
        site_id: &str,
    ) -> Result<Vec<Guideline>, UpstreamError>;

    /// `GET /documents/search?query=&site_id=`: existing-document search
    async fn search_documents(
        &self,
        query: &str,
        site_id: Option<&str>,
    ) -> Result<Vec<DocumentHit>, UpstreamError>;
}

/// Read-only issue-tracker client used to pull ticket text
#[async_trait]
pub trait TicketSource: Send + Sync {
    async fn fetch_ticket(&self, key: &str) -> Result<Ticket, UpstreamError>;
}
