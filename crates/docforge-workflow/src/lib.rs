//! Workflow session store
//!
//! A session is a short-lived record of an in-progress two-round document
//! generation: Phase 1 resolves the site, template, and guidelines, stores
//! the session, and asks the client to explore the codebase; Phase 2 returns
//! with findings, consumes the session, and assembles the document.
//!
//! Sessions are strictly single-use and mutated only by their own
//! continuation. Expiry is lazy: an entry past the TTL is treated as absent
//! on lookup and evicted at that point, so no background timer is needed and
//! expiry stays deterministic. Abandoning a session simply lets it expire;
//! there is no cancellation surface.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use docforge_utils::error::DocForgeError;
use docforge_utils::types::{CombinedInstruction, DocumentType, Site, Template};

/// An in-progress two-round document generation
#[derive(Debug, Clone)]
pub struct WorkflowSession {
    pub id: String,
    pub document_type: DocumentType,
    pub subject: String,
    pub site: Site,
    pub template: Template,
    pub instruction: CombinedInstruction,
    /// Ambient project context gathered in Phase 1 (ticket text, database
    /// hints); inserted into the final document alongside the findings
    pub project_info: String,
    pub created_at: DateTime<Utc>,
}

impl WorkflowSession {
    /// Whether this session has outlived `ttl` as of `now`
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age = now.signed_duration_since(self.created_at);
        age >= chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX)
    }
}

/// Arena of sessions keyed by id; the store exclusively owns all sessions
#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    sessions: HashMap<String, WorkflowSession>,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: HashMap::new(),
        }
    }

    /// Configured session TTL
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Create and store a session with a fresh id; returns the id.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        document_type: DocumentType,
        subject: impl Into<String>,
        site: Site,
        template: Template,
        instruction: CombinedInstruction,
        project_info: impl Into<String>,
        now: DateTime<Utc>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let session = WorkflowSession {
            id: id.clone(),
            document_type,
            subject: subject.into(),
            site,
            template,
            instruction,
            project_info: project_info.into(),
            created_at: now,
        };
        debug!("workflow session {id} created for {document_type}");
        self.sessions.insert(id.clone(), session);
        id
    }

    /// Remove and return the session for a continuation.
    ///
    /// This is the terminal transition: once taken, the id can never be
    /// referenced again. An entry past the TTL is evicted here and reported
    /// exactly like a missing one.
    ///
    /// # Errors
    ///
    /// `WorkflowExpired` when the id is unknown, already consumed, or past
    /// the TTL; the error carries the configured TTL so the caller can
    /// decide whether to restart Phase 1.
    pub fn take(
        &mut self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<WorkflowSession, DocForgeError> {
        let expired_error = |id: &str, ttl: Duration| DocForgeError::WorkflowExpired {
            session_id: id.to_string(),
            ttl_secs: ttl.as_secs(),
        };

        let Some(session) = self.sessions.remove(session_id) else {
            return Err(expired_error(session_id, self.ttl));
        };

        if session.is_expired(now, self.ttl) {
            debug!("workflow session {session_id} expired, evicting");
            return Err(expired_error(session_id, self.ttl));
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample_site() -> Site {
        Site {
            id: "s1".to_string(),
            name: "shopping-mall".to_string(),
            company: "acme".to_string(),
            description: None,
        }
    }

    fn sample_template() -> Template {
        Template {
            text: "# {{title}}".to_string(),
            variables: BTreeMap::new(),
        }
    }

    fn sample_instruction() -> CombinedInstruction {
        CombinedInstruction {
            role: String::new(),
            objective: String::new(),
            count: 0,
            total_priority: 0,
        }
    }

    fn store_with_session(ttl: Duration, created: DateTime<Utc>) -> (SessionStore, String) {
        let mut store = SessionStore::new(ttl);
        let id = store.create(
            DocumentType::ImpactAnalysis,
            "order module",
            sample_site(),
            sample_template(),
            sample_instruction(),
            "",
            created,
        );
        (store, id)
    }

    #[test]
    fn sessions_are_single_use() {
        let now = Utc::now();
        let (mut store, id) = store_with_session(Duration::from_secs(3600), now);

        let session = store.take(&id, now).unwrap();
        assert_eq!(session.subject, "order module");
        assert!(store.is_empty());

        // The second continuation referencing the same id must fail
        let err = store.take(&id, now).unwrap_err();
        assert!(matches!(err, DocForgeError::WorkflowExpired { .. }));
    }

    #[test]
    fn expired_session_is_reported_like_a_missing_one() {
        let created = Utc::now();
        let (mut store, id) = store_with_session(Duration::from_secs(3600), created);

        let later = created + chrono::Duration::seconds(3600);
        let err = store.take(&id, later).unwrap_err();
        match err {
            DocForgeError::WorkflowExpired {
                session_id,
                ttl_secs,
            } => {
                assert_eq!(session_id, id);
                assert_eq!(ttl_secs, 3600);
            }
            other => panic!("expected WorkflowExpired, got {other:?}"),
        }
        // Evicted on lookup, not merely skipped
        assert!(store.is_empty());
    }

    #[test]
    fn session_just_inside_the_ttl_survives() {
        let created = Utc::now();
        let (mut store, id) = store_with_session(Duration::from_secs(3600), created);

        let just_before = created + chrono::Duration::seconds(3599);
        assert!(store.take(&id, just_before).is_ok());
    }

    #[test]
    fn unknown_id_is_workflow_expired() {
        let mut store = SessionStore::new(Duration::from_secs(3600));
        let err = store.take("no-such-session", Utc::now()).unwrap_err();
        assert!(matches!(err, DocForgeError::WorkflowExpired { .. }));
    }

    #[test]
    fn ids_are_unique_across_sessions() {
        let now = Utc::now();
        let mut store = SessionStore::new(Duration::from_secs(3600));
        let a = store.create(
            DocumentType::ImpactAnalysis,
            "a",
            sample_site(),
            sample_template(),
            sample_instruction(),
            "",
            now,
        );
        let b = store.create(
            DocumentType::ProgramSpecification,
            "b",
            sample_site(),
            sample_template(),
            sample_instruction(),
            "",
            now,
        );
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }
}
