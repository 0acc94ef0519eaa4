//! End-to-end dispatcher scenarios over mock collaborators
//!
//! Covers the single-shot path (classification, default site, caching on
//! repeat), the two-phase workflow path (session round-trip, findings
//! section, single-use enforcement), and the dispatcher's error boundary.

use async_trait::async_trait;
use camino::Utf8PathBuf;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

use docforge::{CachedGateway, Config, Dispatcher, KnowledgeBackend, TicketSource};
use docforge_utils::cache::FingerprintCache;
use docforge_utils::error::UpstreamError;
use docforge_utils::types::{
    DocumentHit, DocumentType, Guideline, Site, Template, Ticket,
};

#[derive(Clone, Default)]
struct Calls {
    sites: Arc<AtomicUsize>,
    templates: Arc<AtomicUsize>,
    guidelines: Arc<AtomicUsize>,
    tickets: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct MockBackend {
    calls: Calls,
}

fn guideline(title: &str, priority: u32) -> Guideline {
    Guideline {
        title: title.to_string(),
        priority,
        scope: "site".to_string(),
        role: format!("role-{title}"),
        objective: format!("objective-{title}"),
        constraints: None,
        examples: None,
    }
}

#[async_trait]
impl KnowledgeBackend for MockBackend {
    async fn fetch_sites(&self) -> Result<Vec<Site>, UpstreamError> {
        self.calls.sites.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Site {
            id: "s1".to_string(),
            name: "shopping-mall".to_string(),
            company: "acme".to_string(),
            description: None,
        }])
    }

    async fn fetch_template(
        &self,
        document_type: DocumentType,
        site_id: &str,
    ) -> Result<Option<Template>, UpstreamError> {
        self.calls.templates.fetch_add(1, Ordering::SeqCst);
        assert_eq!(site_id, "s1");
        let template = match document_type {
            DocumentType::TableSpecification => Template {
                text: "# {{table_name}} 테이블 명세서\n\n컬럼:\n{{columns}}".to_string(),
                variables: BTreeMap::from([
                    ("table_name".to_string(), "대상 테이블 이름".to_string()),
                    ("columns".to_string(), "컬럼 목록".to_string()),
                ]),
            },
            DocumentType::ImpactAnalysis => Template {
                text: "# 영향도 분석: {{change_summary}}\n\n## 관련 함수\n{{related_functions}}"
                    .to_string(),
                variables: BTreeMap::from([
                    (
                        "change_summary".to_string(),
                        "변경 내용 요약".to_string(),
                    ),
                    (
                        "related_functions".to_string(),
                        "영향 받는 함수 목록".to_string(),
                    ),
                ]),
            },
            _ => return Ok(None),
        };
        Ok(Some(template))
    }

    async fn fetch_guidelines(
        &self,
        _document_type: DocumentType,
        _site_id: &str,
    ) -> Result<Vec<Guideline>, UpstreamError> {
        self.calls.guidelines.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            guideline("low", 20),
            guideline("high", 80),
            guideline("mid", 60),
        ])
    }

    async fn search_documents(
        &self,
        query: &str,
        _site_id: Option<&str>,
    ) -> Result<Vec<DocumentHit>, UpstreamError> {
        if query == "nothing" {
            return Ok(vec![]);
        }
        Ok(vec![DocumentHit {
            id: "d1".to_string(),
            title: "주문 테이블 명세서".to_string(),
            document_type: Some(DocumentType::TableSpecification),
            summary: Some("orders table".to_string()),
        }])
    }
}

#[derive(Clone)]
struct MockTracker {
    calls: Calls,
}

#[async_trait]
impl TicketSource for MockTracker {
    async fn fetch_ticket(&self, key: &str) -> Result<Ticket, UpstreamError> {
        self.calls.tickets.fetch_add(1, Ordering::SeqCst);
        Ok(Ticket {
            key: key.to_string(),
            summary: "주문 목록 조회 지연".to_string(),
            description: "orders list endpoint is slow".to_string(),
        })
    }
}

fn harness(dir: &TempDir, with_tracker: bool) -> (Dispatcher, Calls) {
    let calls = Calls::default();
    let backend = MockBackend {
        calls: calls.clone(),
    };
    let tracker: Option<Box<dyn TicketSource>> = with_tracker.then(|| {
        Box::new(MockTracker {
            calls: calls.clone(),
        }) as Box<dyn TicketSource>
    });

    let mut config = Config::default();
    config.default_site = Some("shopping-mall".to_string());
    config.cache_root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();

    let gateway = CachedGateway::new(
        Box::new(backend),
        tracker,
        FingerprintCache::new(config.cache_root.clone()),
        config.cache_ttls,
    );
    (Dispatcher::new(config, gateway), calls)
}

fn session_id_from(text: &str) -> String {
    let line = text
        .lines()
        .find(|line| line.starts_with("Session: "))
        .expect("phase 1 response names the session");
    line.trim_start_matches("Session: ")
        .split_whitespace()
        .next()
        .expect("session line carries an id")
        .to_string()
}

#[tokio::test]
async fn table_specification_is_single_shot_with_default_site() {
    let dir = TempDir::new().unwrap();
    let (mut dispatcher, calls) = harness(&dir, false);

    let response = dispatcher
        .handle(
            "generate_document",
            &json!({ "documentRequest": "사용자 관리 시스템의 테이블 명세서" }),
        )
        .await;

    assert!(!response.is_error, "got error: {}", response.flat_text());
    let text = response.flat_text();
    // Assembled immediately; no session, unfilled variables are stand-ins
    assert!(!text.contains("Session:"));
    assert!(text.contains("테이블 명세서"));
    assert!(text.contains("[missing: table_name (대상 테이블 이름)]"));
    // Guideline text is delimited and priority-ordered, highest first
    assert!(text.contains("## Authoring Instructions"));
    assert!(text.contains("role-high\nrole-mid\nrole-low"));
    assert!(text.contains("total priority 160"));
    // No workflow session materialized for a zero-findings document type
    assert_eq!(dispatcher.open_sessions(), 0);
    assert_eq!(calls.sites.load(Ordering::SeqCst), 1);
    assert_eq!(calls.templates.load(Ordering::SeqCst), 1);
    assert_eq!(calls.guidelines.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn repeat_request_is_served_from_the_caches() {
    let dir = TempDir::new().unwrap();
    let (mut dispatcher, calls) = harness(&dir, false);
    let args = json!({ "documentRequest": "사용자 관리 시스템의 테이블 명세서" });

    let first = dispatcher.handle("generate_document", &args).await;
    let second = dispatcher.handle("generate_document", &args).await;

    assert!(!first.is_error);
    assert!(!second.is_error);
    assert_eq!(first, second);
    // Template and guidelines were fetched once; the repeat hit the caches
    assert_eq!(calls.templates.load(Ordering::SeqCst), 1);
    assert_eq!(calls.guidelines.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn impact_analysis_runs_the_two_phase_workflow() {
    let dir = TempDir::new().unwrap();
    let (mut dispatcher, _calls) = harness(&dir, false);

    // Phase 1: a plan request with a session id, not a finished document
    let phase1 = dispatcher
        .handle(
            "generate_document",
            &json!({ "documentRequest": "주문 모듈 영향도 분석서" }),
        )
        .await;
    assert!(!phase1.is_error, "got error: {}", phase1.flat_text());
    let phase1_text = phase1.flat_text();
    assert!(phase1_text.contains("Session: "));
    assert!(phase1_text.contains("related_functions"));
    assert!(phase1_text.contains("continue_document"));
    assert_eq!(dispatcher.open_sessions(), 1);

    let session_id = session_id_from(&phase1_text);

    // Phase 2: findings land in the document, session is consumed
    let phase2 = dispatcher
        .handle(
            "continue_document",
            &json!({
                "sessionId": session_id,
                "searchPlan": "grep order handlers, trace call sites",
                "codebaseFindings": {
                    "change_summary": "order cancellation flow rework",
                    "related_functions": ["create_order", "cancel_order"]
                },
                "additionalAnalysis": "blast radius is contained to the order module"
            }),
        )
        .await;
    assert!(!phase2.is_error, "got error: {}", phase2.flat_text());
    let document = phase2.flat_text();
    assert!(document.contains("order cancellation flow rework"));
    assert!(document.contains("1. create_order\n2. cancel_order"));
    assert!(document.contains("## Codebase Analysis Findings"));
    assert!(document.contains("blast radius is contained"));
    assert_eq!(dispatcher.open_sessions(), 0);

    // The session id is single-use: a second continuation fails
    let replay = dispatcher
        .handle(
            "continue_document",
            &json!({
                "sessionId": session_id,
                "searchPlan": "again",
                "codebaseFindings": {}
            }),
        )
        .await;
    assert!(replay.is_error);
    assert!(replay.flat_text().contains("single-use"));
}

#[tokio::test]
async fn ambiguous_request_asks_for_clarification() {
    let dir = TempDir::new().unwrap();
    let (mut dispatcher, _calls) = harness(&dir, false);

    let response = dispatcher
        .handle(
            "generate_document",
            &json!({ "documentRequest": "도와줘" }),
        )
        .await;

    assert!(response.is_error);
    assert!(response.flat_text().contains("impact analysis"));
}

#[tokio::test]
async fn unknown_site_fails_with_suggestions() {
    let dir = TempDir::new().unwrap();
    let (mut dispatcher, calls) = harness(&dir, false);

    // Warm the directory first so the refresh below is observable on its own
    dispatcher.handle("list_sites", &json!({})).await;
    assert_eq!(calls.sites.load(Ordering::SeqCst), 1);

    let response = dispatcher
        .handle(
            "generate_document",
            &json!({
                "documentRequest": "주문 테이블 명세서",
                "siteName": "shoping-mall"
            }),
        )
        .await;

    assert!(response.is_error);
    assert!(response.flat_text().contains("shopping-mall"));
    // The miss triggered exactly one wholesale refresh
    assert_eq!(calls.sites.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn template_gap_is_reported_with_a_next_step() {
    let dir = TempDir::new().unwrap();
    let (mut dispatcher, _calls) = harness(&dir, false);

    // The mock backend has no development-guide template
    let response = dispatcher
        .handle(
            "generate_document",
            &json!({ "documentRequest": "개발 가이드 for onboarding" }),
        )
        .await;

    assert!(response.is_error);
    let text = response.flat_text();
    assert!(text.contains("development guide"));
    assert!(text.contains("shopping-mall"));
}

#[tokio::test]
async fn ticket_text_is_folded_into_the_project_context() {
    let dir = TempDir::new().unwrap();
    let (mut dispatcher, calls) = harness(&dir, true);

    let response = dispatcher
        .handle(
            "generate_document",
            &json!({
                "documentRequest": "주문 테이블 명세서",
                "ticketKey": "PROJ-7"
            }),
        )
        .await;

    assert!(!response.is_error, "got error: {}", response.flat_text());
    let text = response.flat_text();
    assert!(text.contains("## Project Context"));
    assert!(text.contains("Ticket PROJ-7"));
    assert!(text.contains("주문 목록 조회 지연"));
    assert_eq!(calls.tickets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ticket_key_without_tracker_is_an_argument_error() {
    let dir = TempDir::new().unwrap();
    let (mut dispatcher, _calls) = harness(&dir, false);

    let response = dispatcher
        .handle(
            "generate_document",
            &json!({
                "documentRequest": "주문 테이블 명세서",
                "ticketKey": "PROJ-7"
            }),
        )
        .await;

    assert!(response.is_error);
    assert!(response.flat_text().contains("issue tracker"));
}

#[tokio::test]
async fn search_documents_lists_hits() {
    let dir = TempDir::new().unwrap();
    let (mut dispatcher, _calls) = harness(&dir, false);

    let found = dispatcher
        .handle("search_documents", &json!({ "query": "orders" }))
        .await;
    assert!(!found.is_error);
    assert!(found.flat_text().contains("주문 테이블 명세서"));

    let empty = dispatcher
        .handle("search_documents", &json!({ "query": "nothing" }))
        .await;
    assert!(!empty.is_error);
    assert!(empty.flat_text().contains("narrower"));
}

#[tokio::test]
async fn list_sites_names_every_site() {
    let dir = TempDir::new().unwrap();
    let (mut dispatcher, _calls) = harness(&dir, false);

    let response = dispatcher.handle("list_sites", &json!({})).await;
    assert!(!response.is_error);
    let text = response.flat_text();
    assert!(text.contains("shopping-mall"));
    assert!(text.contains("acme"));
}

#[tokio::test]
async fn missing_required_argument_is_a_structured_failure() {
    let dir = TempDir::new().unwrap();
    let (mut dispatcher, _calls) = harness(&dir, false);

    let response = dispatcher.handle("generate_document", &json!({})).await;
    assert!(response.is_error);
    assert!(response.flat_text().contains("documentRequest"));
}

#[tokio::test]
async fn unknown_tool_is_a_structured_failure_not_a_fault() {
    let dir = TempDir::new().unwrap();
    let (mut dispatcher, _calls) = harness(&dir, false);

    let response = dispatcher.handle("no_such_tool", &json!({})).await;
    assert!(response.is_error);
    assert!(response.flat_text().contains("no_such_tool"));
}
