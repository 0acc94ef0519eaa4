//! Free-text request classification
//!
//! Maps a natural-language document request to a (document type, subject)
//! pair using an ordered table of surface patterns, including localized
//! synonyms and abbreviations. The table is data passed to a pure function:
//! new document types are additive and independently testable.
//!
//! Precedence is deterministic, not learned. The first document type whose
//! pattern list contains a case-insensitive substring match wins, so more
//! specific types (and more specific patterns within a type) must be listed
//! before more general ones.

use regex::Regex;

use docforge_utils::types::{DocumentRequest, DocumentType};

/// An ordered classification table: document type -> surface patterns
pub type PatternTable = [(DocumentType, &'static [&'static str])];

/// Default classification table.
///
/// Longer patterns precede their substrings so the chosen pattern's full
/// text is stripped from the subject.
pub static DEFAULT_TABLE: &PatternTable = &[
    (
        DocumentType::ImpactAnalysis,
        &[
            "영향도 분석서",
            "영향도분석서",
            "영향도 분석",
            "영향도분석",
            "영향 분석",
            "impact analysis",
            "impact assessment",
        ],
    ),
    (
        DocumentType::TableSpecification,
        &[
            "테이블 명세서",
            "테이블명세서",
            "테이블 정의서",
            "테이블 스펙",
            "table specification",
            "table spec",
        ],
    ),
    (
        DocumentType::InterfaceSpecification,
        &[
            "인터페이스 명세서",
            "인터페이스 정의서",
            "연동 명세서",
            "interface specification",
            "interface spec",
        ],
    ),
    (
        DocumentType::ProgramSpecification,
        &[
            "프로그램 명세서",
            "프로그램명세서",
            "함수 명세서",
            "program specification",
            "program spec",
        ],
    ),
    (
        DocumentType::DevelopmentGuide,
        &[
            "개발 가이드",
            "개발가이드",
            "development guide",
            "dev guide",
        ],
    ),
];

/// Phrases trimmed from the front of the residual subject
const LEADING_FILLER: &[&str] = &[
    "please create",
    "please make",
    "please write",
    "please generate",
    "please",
    "create",
    "generate",
    "write",
    "make",
    "draft",
    "for the",
    "for",
    "of the",
    "of",
    "about",
    "a",
    "an",
    "the",
];

/// Phrases trimmed from the end of the residual subject
const TRAILING_FILLER: &[&str] = &[
    "만들어주세요",
    "만들어 줘",
    "만들어줘",
    "작성해주세요",
    "작성해 줘",
    "작성해줘",
    "생성해주세요",
    "생성해줘",
    "부탁합니다",
    "부탁해",
    "작성",
    "생성",
    "please",
];

/// Korean particles stripped when attached to the subject's last word
const PARTICLE_SUFFIXES: &[&str] = &["에 대한", "에 관한", "의", "를", "을", "은", "는"];

/// Classify a raw request against an ordered pattern table.
///
/// Returns the winning document type (or `None` when nothing matched) plus
/// the residual subject. If the residual is shorter than two characters the
/// full raw text is used as the subject, so a bare "테이블 명세서" request
/// never yields an empty-subject document.
#[must_use]
pub fn classify(raw_text: &str, table: &PatternTable) -> DocumentRequest {
    let normalized = raw_text.to_lowercase();

    let mut matched: Option<(DocumentType, &str)> = None;
    'outer: for (document_type, patterns) in table {
        for pattern in *patterns {
            if normalized.contains(&pattern.to_lowercase()) {
                matched = Some((*document_type, pattern));
                break 'outer;
            }
        }
    }

    let Some((document_type, pattern)) = matched else {
        return DocumentRequest {
            raw_text: raw_text.to_string(),
            document_type: None,
            subject: raw_text.trim().to_string(),
        };
    };

    let subject = extract_subject(raw_text, pattern);
    DocumentRequest {
        raw_text: raw_text.to_string(),
        document_type: Some(document_type),
        subject,
    }
}

/// Classify against the built-in [`DEFAULT_TABLE`]
#[must_use]
pub fn classify_default(raw_text: &str) -> DocumentRequest {
    classify(raw_text, DEFAULT_TABLE)
}

/// Strip the matched pattern (regex-escaped literal, case-insensitive) from
/// the original text, then trim filler until the subject is stable.
fn extract_subject(raw_text: &str, pattern: &str) -> String {
    // The pattern is a literal from the table; escaping makes the regex
    // construction infallible.
    let stripped = match Regex::new(&format!("(?i){}", regex::escape(pattern))) {
        Ok(re) => re.replace_all(raw_text, " ").into_owned(),
        Err(_) => raw_text.to_string(),
    };

    let subject = trim_filler(&stripped);
    if subject.chars().count() < 2 {
        raw_text.trim().to_string()
    } else {
        subject
    }
}

fn trim_filler(text: &str) -> String {
    let mut subject = text.trim().to_string();

    loop {
        let before = subject.clone();
        subject = subject
            .trim_matches([' ', ',', '.', ':', ';', '-', '"', '\''])
            .to_string();

        for phrase in LEADING_FILLER {
            if let Some(rest) = strip_leading_phrase(&subject, phrase) {
                subject = rest;
            }
        }
        for phrase in TRAILING_FILLER {
            if let Some(rest) = strip_trailing_phrase(&subject, phrase) {
                subject = rest;
            }
        }
        for particle in PARTICLE_SUFFIXES {
            if let Some(rest) = subject.strip_suffix(particle) {
                subject = rest.trim_end().to_string();
            }
        }

        if subject == before {
            return subject;
        }
    }
}

/// Strip `phrase` from the front when it ends at a word boundary
fn strip_leading_phrase(subject: &str, phrase: &str) -> Option<String> {
    let lower = subject.to_lowercase();
    if !lower.starts_with(phrase) {
        return None;
    }
    let rest = subject.get(phrase.len()..)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start().to_string())
    } else {
        None
    }
}

/// Strip `phrase` from the end when it starts at a word boundary
fn strip_trailing_phrase(subject: &str, phrase: &str) -> Option<String> {
    let lower = subject.to_lowercase();
    if !lower.ends_with(phrase) {
        return None;
    }
    let cut = subject.len().checked_sub(phrase.len())?;
    let rest = subject.get(..cut)?;
    if rest.is_empty() || rest.ends_with(char::is_whitespace) {
        Some(rest.trim_end().to_string())
    } else {
        None
    }
}
