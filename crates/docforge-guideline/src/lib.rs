//! Guideline merging
//!
//! Raw guidelines for a (document type, site) pair are fetched through the
//! fingerprint cache and folded into a single [`CombinedInstruction`]. The
//! folded result is memoized in memory under its own TTL bucket, independent
//! of the fingerprint cache's TTL: guideline merges are cheap to recompute
//! but expensive to fetch.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use docforge_backend::CachedGateway;
use docforge_utils::error::UpstreamError;
use docforge_utils::types::{CombinedInstruction, DocumentType, Guideline};

/// Fold guidelines into one directive.
///
/// Sort is by priority descending, so `role`/`objective` concatenation
/// starts with the highest-priority guideline; ties keep their fetch order.
/// `count` and `total_priority` are order-independent by construction.
#[must_use]
pub fn fold_guidelines(guidelines: &[Guideline]) -> CombinedInstruction {
    let mut ordered: Vec<&Guideline> = guidelines.iter().collect();
    ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

    let role = ordered
        .iter()
        .map(|g| g.role.as_str())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let objective = ordered
        .iter()
        .map(|g| g.objective.as_str())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    CombinedInstruction {
        role,
        objective,
        count: guidelines.len(),
        total_priority: guidelines.iter().map(|g| g.priority).sum(),
    }
}

#[derive(Debug, Clone)]
struct MergedEntry {
    instruction: CombinedInstruction,
    cached_at: DateTime<Utc>,
}

impl MergedEntry {
    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age = now.signed_duration_since(self.cached_at);
        age >= chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::MAX)
    }
}

/// Shorter-TTL in-memory store of folded authoring directives
#[derive(Debug)]
pub struct GuidelineMergeCache {
    ttl: Duration,
    entries: HashMap<(DocumentType, String), MergedEntry>,
}

impl GuidelineMergeCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Look up a folded instruction; an expired entry is evicted and reported
    /// as a miss.
    pub fn lookup(
        &mut self,
        document_type: DocumentType,
        site_id: &str,
        now: DateTime<Utc>,
    ) -> Option<CombinedInstruction> {
        let key = (document_type, site_id.to_string());
        match self.entries.get(&key) {
            Some(entry) if entry.is_expired(now, self.ttl) => {
                self.entries.remove(&key);
                None
            }
            Some(entry) => Some(entry.instruction.clone()),
            None => None,
        }
    }

    /// Memoize a folded instruction
    pub fn store(
        &mut self,
        document_type: DocumentType,
        site_id: &str,
        instruction: CombinedInstruction,
        now: DateTime<Utc>,
    ) {
        self.entries.insert(
            (document_type, site_id.to_string()),
            MergedEntry {
                instruction,
                cached_at: now,
            },
        );
    }

    /// The merged instruction for a (document type, site) pair.
    ///
    /// On a memo miss the raw guidelines are fetched through the fingerprint
    /// cache, folded, and the folded result (not the raw list) is memoized.
    ///
    /// # Errors
    ///
    /// Propagates upstream failures from the raw guideline fetch.
    pub async fn get_merged(
        &mut self,
        document_type: DocumentType,
        site_id: &str,
        gateway: &mut CachedGateway,
    ) -> Result<CombinedInstruction, UpstreamError> {
        let now = Utc::now();
        if let Some(instruction) = self.lookup(document_type, site_id, now) {
            return Ok(instruction);
        }

        let raw = gateway.guidelines(document_type, site_id).await?;
        let instruction = fold_guidelines(&raw);
        debug!(
            "merged {} guidelines for {document_type}/{site_id} (total priority {})",
            instruction.count, instruction.total_priority
        );
        self.store(document_type, site_id, instruction.clone(), now);
        Ok(instruction)
    }
}
