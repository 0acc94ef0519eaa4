//! The fixed tool registry
//!
//! Tool names and input schemas are static data; the dispatcher rejects
//! anything not listed here before touching any store.

use serde::Serialize;
use serde_json::{Value, json};

pub const GENERATE_DOCUMENT: &str = "generate_document";
pub const CONTINUE_DOCUMENT: &str = "continue_document";
pub const LIST_SITES: &str = "list_sites";
pub const SEARCH_DOCUMENTS: &str = "search_documents";

/// A tool definition as reported by `tools/list`
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The complete registry, in the order reported to clients
#[must_use]
pub fn registry() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: GENERATE_DOCUMENT,
            description: "Generate a technical document (impact analysis, table specification, \
                          interface specification, program specification, development guide) \
                          from a natural-language request. Document types that need codebase \
                          observations return a session id and an exploration-plan request \
                          instead of a finished document; follow up with continue_document.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "documentRequest": {
                        "type": "string",
                        "description": "Natural-language description of the document to generate, e.g. \"사용자 관리 시스템의 테이블 명세서\""
                    },
                    "siteName": {
                        "type": "string",
                        "description": "Site id or name; the configured default site is used when omitted"
                    },
                    "ticketKey": {
                        "type": "string",
                        "description": "Optional issue-tracker ticket whose text is folded into the project context"
                    }
                },
                "required": ["documentRequest"]
            }),
        },
        ToolDefinition {
            name: CONTINUE_DOCUMENT,
            description: "Phase-2 continuation of a generate_document workflow: supply the \
                          executed search plan and the codebase findings for the session. \
                          Sessions are single-use and expire.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sessionId": {
                        "type": "string",
                        "description": "Session id returned by generate_document"
                    },
                    "searchPlan": {
                        "type": "string",
                        "description": "The codebase exploration plan that was executed"
                    },
                    "codebaseFindings": {
                        "type": "object",
                        "description": "Findings keyed by template variable name; scalars, lists, and nested objects are all accepted"
                    },
                    "additionalAnalysis": {
                        "type": "string",
                        "description": "Optional free-form analysis appended to the findings section"
                    }
                },
                "required": ["sessionId", "searchPlan", "codebaseFindings"]
            }),
        },
        ToolDefinition {
            name: LIST_SITES,
            description: "List the sites registered in the backend.",
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolDefinition {
            name: SEARCH_DOCUMENTS,
            description: "Search existing documents in the backend.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "siteName": {
                        "type": "string",
                        "description": "Restrict the search to one site"
                    }
                },
                "required": ["query"]
            }),
        },
    ]
}
