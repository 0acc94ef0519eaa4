//! Site directory
//!
//! Resolves a caller-supplied site token to a canonical site record. The
//! in-memory snapshot is refreshed wholesale (never patched field-by-field)
//! to avoid stale-record drift. Resolution order: exact id match, then
//! case-insensitive name match, then one cache-bypassing refresh-and-retry,
//! then approximate suggestion for the error message.

use tracing::debug;

use docforge_backend::CachedGateway;
use docforge_utils::error::DocForgeError;
use docforge_utils::types::Site;

/// Similarity floor for suggestions
pub const SUGGESTION_THRESHOLD: f64 = 0.5;

/// Maximum number of suggestions carried by a `SiteNotFound` error
pub const MAX_SUGGESTIONS: usize = 3;

/// In-memory snapshot of the backend's site list
#[derive(Debug, Default)]
pub struct SiteDirectory {
    sites: Vec<Site>,
}

impl SiteDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> &[Site] {
        &self.sites
    }

    /// Populate the snapshot through the gateway (cached within the site TTL).
    ///
    /// # Errors
    ///
    /// Propagates the upstream failure; the previous snapshot is kept.
    pub async fn init(&mut self, gateway: &mut CachedGateway) -> Result<(), DocForgeError> {
        let sites = gateway.sites().await?;
        debug!("site directory loaded: {} sites", sites.len());
        self.sites = sites;
        Ok(())
    }

    /// Exact match: id first, then case-insensitive name
    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<&Site> {
        self.sites
            .iter()
            .find(|site| site.id == token)
            .or_else(|| {
                self.sites
                    .iter()
                    .find(|site| site.name.eq_ignore_ascii_case(token))
            })
    }

    /// Resolve a token to a site, refreshing once on a miss.
    ///
    /// An exact hit never triggers a refresh. On a miss the full site list
    /// is re-pulled bypassing the fingerprint cache, so a site created since
    /// the last pull is never masked, and the match is retried exactly once.
    ///
    /// # Errors
    ///
    /// `SiteNotFound` with up to three ranked suggestions when the token
    /// still has no exact match after the refresh; upstream errors from the
    /// refresh call itself.
    pub async fn resolve(
        &mut self,
        token: &str,
        gateway: &mut CachedGateway,
    ) -> Result<Site, DocForgeError> {
        if let Some(site) = self.lookup(token) {
            return Ok(site.clone());
        }

        debug!("site '{token}' not in snapshot, refreshing directory");
        self.sites = gateway.sites_fresh().await?;

        if let Some(site) = self.lookup(token) {
            return Ok(site.clone());
        }

        Err(DocForgeError::SiteNotFound {
            requested: token.to_string(),
            suggestions: self
                .suggest(token, SUGGESTION_THRESHOLD)
                .into_iter()
                .map(|site| site.name.clone())
                .collect(),
        })
    }

    /// Rank all known sites by normalized edit-distance similarity against
    /// the token and return up to [`MAX_SUGGESTIONS`] at or above `threshold`.
    #[must_use]
    pub fn suggest(&self, token: &str, threshold: f64) -> Vec<&Site> {
        let needle = token.to_lowercase();
        let mut scored: Vec<(f64, &Site)> = self
            .sites
            .iter()
            .map(|site| {
                (
                    strsim::normalized_levenshtein(&needle, &site.name.to_lowercase()),
                    site,
                )
            })
            .filter(|(score, _)| *score >= threshold)
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, site)| site)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use camino::Utf8PathBuf;
    use docforge_backend::KnowledgeBackend;
    use docforge_config::CacheTtls;
    use docforge_utils::cache::FingerprintCache;
    use docforge_utils::error::UpstreamError;
    use docforge_utils::types::{DocumentHit, DocumentType, Guideline, Template};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Clone)]
    struct SiteBackend {
        calls: Arc<AtomicUsize>,
    }

    fn site(id: &str, name: &str) -> Site {
        Site {
            id: id.to_string(),
            name: name.to_string(),
            company: "acme".to_string(),
            description: None,
        }
    }

    #[async_trait]
    impl KnowledgeBackend for SiteBackend {
        async fn fetch_sites(&self) -> Result<Vec<Site>, UpstreamError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let mut sites = vec![
                site("s1", "shopping-mall"),
                site("s2", "erp-core"),
                site("s3", "hr-portal"),
            ];
            // A site created after the first pull, visible only on refresh
            if call > 0 {
                sites.push(site("s4", "billing"));
            }
            Ok(sites)
        }

        async fn fetch_template(
            &self,
            _document_type: DocumentType,
            _site_id: &str,
        ) -> Result<Option<Template>, UpstreamError> {
            Ok(None)
        }

        async fn fetch_guidelines(
            &self,
            _document_type: DocumentType,
            _site_id: &str,
        ) -> Result<Vec<Guideline>, UpstreamError> {
            Ok(vec![])
        }

        async fn search_documents(
            &self,
            _query: &str,
            _site_id: Option<&str>,
        ) -> Result<Vec<DocumentHit>, UpstreamError> {
            Ok(vec![])
        }
    }

    fn harness(dir: &TempDir) -> (SiteDirectory, CachedGateway, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = SiteBackend {
            calls: Arc::clone(&calls),
        };
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let gateway = CachedGateway::new(
            Box::new(backend),
            None,
            FingerprintCache::new(root),
            CacheTtls {
                backend: Duration::from_secs(3600),
                guideline: Duration::from_secs(1800),
                site: Duration::from_secs(600),
            },
        );
        (SiteDirectory::new(), gateway, calls)
    }

    #[tokio::test]
    async fn exact_hit_makes_no_refresh_call() {
        let dir = TempDir::new().unwrap();
        let (mut directory, mut gateway, calls) = harness(&dir);
        directory.init(&mut gateway).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let by_id = directory.resolve("s2", &mut gateway).await.unwrap();
        assert_eq!(by_id.name, "erp-core");
        let by_name = directory.resolve("Shopping-Mall", &mut gateway).await.unwrap();
        assert_eq!(by_name.id, "s1");

        // No refresh happened for either hit
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn miss_triggers_exactly_one_refresh_before_suggesting() {
        let dir = TempDir::new().unwrap();
        let (mut directory, mut gateway, calls) = harness(&dir);
        directory.init(&mut gateway).await.unwrap();

        // "billing" only exists after a refresh; the wholesale re-pull finds it
        let found = directory.resolve("billing", &mut gateway).await.unwrap();
        assert_eq!(found.id, "s4");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // A hopeless token refreshes once more, then fails with suggestions
        let err = directory
            .resolve("shoping-mall", &mut gateway)
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            DocForgeError::SiteNotFound {
                requested,
                suggestions,
            } => {
                assert_eq!(requested, "shoping-mall");
                assert_eq!(suggestions.first().map(String::as_str), Some("shopping-mall"));
            }
            other => panic!("expected SiteNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn suggestions_are_empty_below_the_threshold() {
        let dir = TempDir::new().unwrap();
        let (mut directory, mut gateway, _calls) = harness(&dir);
        directory.init(&mut gateway).await.unwrap();

        assert!(directory.suggest("zzzzzzzz", SUGGESTION_THRESHOLD).is_empty());

        let err = directory.resolve("zzzzzzzz", &mut gateway).await.unwrap_err();
        match err {
            DocForgeError::SiteNotFound { suggestions, .. } => assert!(suggestions.is_empty()),
            other => panic!("expected SiteNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn suggestions_are_ranked_and_capped() {
        let mut directory = SiteDirectory::new();
        directory.sites = vec![
            site("a", "orders"),
            site("b", "order"),
            site("c", "orders-v2"),
            site("d", "ordering"),
        ];

        let ranked = directory.suggest("order", 0.5);
        assert!(ranked.len() <= MAX_SUGGESTIONS);
        assert_eq!(ranked[0].name, "order");
    }
}
