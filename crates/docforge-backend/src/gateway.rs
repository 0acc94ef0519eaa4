//! Cached gateway in front of all outbound calls
//!
//! Every backend and tracker call goes through here. Each request is keyed
//! by its content fingerprint; a miss that resolves successfully is written
//! back, while failed upstream calls are never cached so transient errors
//! self-heal on retry. TTLs are per call bucket (backend, guideline, site).

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

use docforge_config::CacheTtls;
use docforge_utils::cache::{CacheStats, FingerprintCache};
use docforge_utils::error::UpstreamError;
use docforge_utils::fingerprint::fingerprint_of;
use docforge_utils::types::{DocumentHit, DocumentType, Guideline, Site, Template, Ticket};

use crate::{KnowledgeBackend, TicketSource};

/// Decorator owning the collaborators and the fingerprint cache.
///
/// Constructor-injected into the dispatcher; nothing in the system talks to
/// an upstream without passing through this type.
pub struct CachedGateway {
    backend: Box<dyn KnowledgeBackend>,
    tracker: Option<Box<dyn TicketSource>>,
    cache: FingerprintCache,
    ttls: CacheTtls,
}

impl CachedGateway {
    #[must_use]
    pub fn new(
        backend: Box<dyn KnowledgeBackend>,
        tracker: Option<Box<dyn TicketSource>>,
        cache: FingerprintCache,
        ttls: CacheTtls,
    ) -> Self {
        Self {
            backend,
            tracker,
            cache,
            ttls,
        }
    }

    /// Whether an issue tracker is configured
    #[must_use]
    pub const fn has_tracker(&self) -> bool {
        self.tracker.is_some()
    }

    /// Cache statistics passthrough
    #[must_use]
    pub const fn cache_stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    /// Hygiene sweep passthrough; returns the number of entries removed
    pub fn sweep_cache(&mut self, older_than: Duration) -> usize {
        self.cache.sweep(older_than)
    }

    pub fn log_cache_stats(&self) {
        self.cache.log_stats();
    }

    fn read_cached<T: DeserializeOwned>(&mut self, fingerprint: &str, ttl: Duration) -> Option<T> {
        let bytes = self.cache.get(fingerprint, ttl)?;
        // A payload that no longer decodes is as good as absent; the caller
        // re-fetches and overwrites it.
        serde_json::from_slice(&bytes).ok()
    }

    fn write_back<T: Serialize>(&mut self, fingerprint: &str, value: &T) {
        if let Ok(bytes) = serde_json::to_vec(value) {
            self.cache.put(fingerprint, &bytes);
        }
    }

    /// The full site list, served from cache within the site TTL
    pub async fn sites(&mut self) -> Result<Vec<Site>, UpstreamError> {
        let fp = fingerprint_of("GET", "/sites", &Value::Null, &Value::Null);
        if let Some(sites) = self.read_cached::<Vec<Site>>(&fp, self.ttls.site) {
            return Ok(sites);
        }
        let sites = self.backend.fetch_sites().await?;
        self.write_back(&fp, &sites);
        Ok(sites)
    }

    /// The full site list, bypassing the cache read so newly created sites
    /// are never masked. The fresh result still overwrites the cache entry.
    pub async fn sites_fresh(&mut self) -> Result<Vec<Site>, UpstreamError> {
        let sites = self.backend.fetch_sites().await?;
        let fp = fingerprint_of("GET", "/sites", &Value::Null, &Value::Null);
        self.write_back(&fp, &sites);
        Ok(sites)
    }

    /// Template for a (document type, site) pair; `None` when the backend
    /// has no template registered for it
    pub async fn template(
        &mut self,
        document_type: DocumentType,
        site_id: &str,
    ) -> Result<Option<Template>, UpstreamError> {
        let path = format!("/templates/guide/{document_type}");
        let params = json!({ "site_id": site_id });
        let fp = fingerprint_of("GET", &path, &params, &Value::Null);
        if let Some(template) = self.read_cached::<Option<Template>>(&fp, self.ttls.backend) {
            return Ok(template);
        }
        let template = self.backend.fetch_template(document_type, site_id).await?;
        self.write_back(&fp, &template);
        Ok(template)
    }

    /// Raw guidelines for a (document type, site) pair
    pub async fn guidelines(
        &mut self,
        document_type: DocumentType,
        site_id: &str,
    ) -> Result<Vec<Guideline>, UpstreamError> {
        let path = format!("/analysis/guidelines/{document_type}");
        let params = json!({ "site_id": site_id });
        let fp = fingerprint_of("GET", &path, &params, &Value::Null);
        if let Some(guidelines) = self.read_cached::<Vec<Guideline>>(&fp, self.ttls.guideline) {
            return Ok(guidelines);
        }
        let guidelines = self
            .backend
            .fetch_guidelines(document_type, site_id)
            .await?;
        self.write_back(&fp, &guidelines);
        Ok(guidelines)
    }

    /// Search existing documents
    pub async fn search(
        &mut self,
        query: &str,
        site_id: Option<&str>,
    ) -> Result<Vec<DocumentHit>, UpstreamError> {
        let params = json!({ "query": query, "site_id": site_id });
        let fp = fingerprint_of("GET", "/documents/search", &params, &Value::Null);
        if let Some(hits) = self.read_cached::<Vec<DocumentHit>>(&fp, self.ttls.backend) {
            return Ok(hits);
        }
        let hits = self.backend.search_documents(query, site_id).await?;
        self.write_back(&fp, &hits);
        Ok(hits)
    }

    /// Pull ticket text from the issue tracker
    pub async fn ticket(&mut self, key: &str) -> Result<Ticket, UpstreamError> {
        let path = format!("/tickets/{key}");
        let fp = fingerprint_of("GET", &path, &Value::Null, &Value::Null);
        if let Some(ticket) = self.read_cached::<Ticket>(&fp, self.ttls.backend) {
            return Ok(ticket);
        }
        let Some(tracker) = &self.tracker else {
            return Err(UpstreamError::Request {
                url: "(tracker)".to_string(),
                reason: "issue tracker is not configured".to_string(),
            });
        };
        let ticket = tracker.fetch_ticket(key).await?;
        self.write_back(&fp, &ticket);
        Ok(ticket)
    }
}
