//! Document assembly
//!
//! Merges a backend-supplied template, a merged authoring directive, and
//! caller-supplied codebase findings into the final output text. Every
//! `{{name}}` placeholder is substituted from the findings: scalars verbatim,
//! lists as numbered lines, nested objects as an indented block. A
//! placeholder with no supplied value is left as an explanatory stand-in so
//! the caller can see what is missing.
//!
//! Guideline text is appended as a clearly delimited authoring-instructions
//! section, never interleaved into the template body, preserving the
//! author's ability to tell template from directive.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use docforge_utils::types::{CombinedInstruction, Template};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    // Template variables are identifier-like; anything else is left alone
    Regex::new(r"\{\{\s*([A-Za-z0-9_][A-Za-z0-9_.-]*)\s*\}\}")
        .expect("placeholder regex is valid")
});

/// Everything the assembler needs for one document
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInput<'a> {
    pub template: &'a Template,
    pub instruction: &'a CombinedInstruction,
    /// Caller-supplied findings keyed by template variable name
    pub findings: &'a Map<String, Value>,
    pub search_plan: Option<&'a str>,
    pub additional_analysis: Option<&'a str>,
    pub project_info: Option<&'a str>,
}

/// Assemble the final document text
#[must_use]
pub fn assemble(input: &AssemblyInput<'_>) -> String {
    let mut out = substitute(input.template, input.findings);

    if let Some(info) = input.project_info.filter(|text| !text.trim().is_empty()) {
        out.push_str("\n\n---\n\n## Project Context\n\n");
        out.push_str(info.trim_end());
    }

    let has_findings = !input.findings.is_empty()
        || input.search_plan.is_some()
        || input.additional_analysis.is_some();
    if has_findings {
        out.push_str("\n\n---\n\n## Codebase Analysis Findings\n");
        if let Some(plan) = input.search_plan.filter(|text| !text.trim().is_empty()) {
            out.push_str("\n### Search Plan\n\n");
            out.push_str(plan.trim_end());
            out.push('\n');
        }
        if !input.findings.is_empty() {
            out.push_str("\n### Findings\n\n");
            for (name, value) in input.findings {
                out.push_str(&format!("**{name}**\n{}\n", render_value(value, 0)));
            }
        }
        if let Some(extra) = input
            .additional_analysis
            .filter(|text| !text.trim().is_empty())
        {
            out.push_str("\n### Additional Analysis\n\n");
            out.push_str(extra.trim_end());
            out.push('\n');
        }
    }

    if input.instruction.count > 0 {
        out.push_str("\n\n---\n\n## Authoring Instructions\n\n");
        if !input.instruction.role.is_empty() {
            out.push_str("Role:\n");
            out.push_str(&input.instruction.role);
            out.push('\n');
        }
        if !input.instruction.objective.is_empty() {
            out.push_str("\nObjective:\n");
            out.push_str(&input.instruction.objective);
            out.push('\n');
        }
        out.push_str(&format!(
            "\n({} directives applied, total priority {})\n",
            input.instruction.count, input.instruction.total_priority
        ));
    }

    out
}

/// Substitute every `{{name}}` placeholder from the findings map
#[must_use]
pub fn substitute(template: &Template, findings: &Map<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(&template.text, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match findings.get(name) {
                Some(value) => render_value(value, 0),
                None => stand_in(template, name),
            }
        })
        .into_owned()
}

/// The explanatory stand-in for a placeholder with no supplied value
fn stand_in(template: &Template, name: &str) -> String {
    match template.variables.get(name).filter(|hint| !hint.is_empty()) {
        Some(hint) => format!("[missing: {name} ({hint})]"),
        None => format!("[missing: {name}]"),
    }
}

/// Render a findings value: scalars verbatim, lists as numbered lines,
/// nested objects as an indented block.
#[must_use]
pub fn render_value(value: &Value, depth: usize) -> String {
    let pad = "  ".repeat(depth);
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Array(_) | Value::Object(_) => {
                    format!("{pad}{}.\n{}", index + 1, render_value(item, depth + 1))
                }
                scalar => format!("{pad}{}. {}", index + 1, render_value(scalar, 0)),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => map
            .iter()
            .map(|(key, item)| match item {
                Value::Array(_) | Value::Object(_) => {
                    format!("{pad}{key}:\n{}", render_value(item, depth + 1))
                }
                scalar => format!("{pad}{key}: {}", render_value(scalar, 0)),
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
