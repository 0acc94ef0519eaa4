//! Core domain types shared across the docforge crates
//!
//! Everything the backend hands us, and everything that moves between the
//! dispatcher and the stores, is a typed artifact defined here. No untyped
//! payloads cross component boundaries; the only `serde_json::Value` in the
//! system is the caller-shaped findings object, which is rendered (not
//! interpreted) by the assembler.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Document types the classifier can resolve a request to.
///
/// The wire form is SCREAMING_SNAKE_CASE (`TABLE_SPECIFICATION`), matching
/// the backend's template registry keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    /// Change impact analysis; needs caller-supplied codebase findings
    ImpactAnalysis,
    /// Program/function specification; needs caller-supplied codebase findings
    ProgramSpecification,
    /// Database table specification
    TableSpecification,
    /// Inter-system interface specification
    InterfaceSpecification,
    /// Project development guide
    DevelopmentGuide,
}

impl DocumentType {
    /// Stable identifier used in backend paths and cache keys
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ImpactAnalysis => "IMPACT_ANALYSIS",
            Self::ProgramSpecification => "PROGRAM_SPECIFICATION",
            Self::TableSpecification => "TABLE_SPECIFICATION",
            Self::InterfaceSpecification => "INTERFACE_SPECIFICATION",
            Self::DevelopmentGuide => "DEVELOPMENT_GUIDE",
        }
    }

    /// Whether this document type needs a Phase-2 continuation with
    /// caller-supplied codebase findings before it can be assembled.
    #[must_use]
    pub const fn requires_findings(&self) -> bool {
        matches!(self, Self::ImpactAnalysis | Self::ProgramSpecification)
    }

    /// Human-readable label used in responses and error messages
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ImpactAnalysis => "impact analysis",
            Self::ProgramSpecification => "program specification",
            Self::TableSpecification => "table specification",
            Self::InterfaceSpecification => "interface specification",
            Self::DevelopmentGuide => "development guide",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A site (tenant) record, sourced entirely from the backend.
///
/// Immutable for the lifetime of a directory snapshot; the directory is
/// refreshed wholesale, never patched field-by-field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub name: String,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Ephemeral classification result; never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRequest {
    /// Original request text, untouched
    pub raw_text: String,
    /// Resolved document type, `None` when no pattern matched
    pub document_type: Option<DocumentType>,
    /// Residual subject after pattern and particle stripping
    pub subject: String,
}

/// A single authoring guideline as stored by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guideline {
    pub title: String,
    pub priority: u32,
    pub scope: String,
    pub role: String,
    pub objective: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<String>,
}

/// The priority-ordered merge of many guidelines into one directive.
///
/// `role`/`objective` concatenation follows priority order, highest first;
/// that ordering is an observable contract relied on by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedInstruction {
    pub role: String,
    pub objective: String,
    pub count: usize,
    pub total_priority: u32,
}

/// A document template fetched per (document type, site); read-only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Template body with `{{name}}` placeholders
    pub text: String,
    /// Placeholder name -> default value or authoring hint
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// One hit from the backend's document search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHit {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub document_type: Option<DocumentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// A ticket pulled read-only from the issue tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub key: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
}
