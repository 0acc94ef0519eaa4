//! Tool dispatcher
//!
//! The single entry point for tool invocations. Sequencing per invocation is
//! strict: classify -> resolve site -> fetch template and guidelines through
//! the caches -> either assemble immediately or open a Phase-1 workflow
//! session. Every unhandled internal error is caught at this boundary and
//! converted into a structured failure response.

use chrono::Utc;
use serde_json::{Map, Value};
use std::fmt::Write as _;
use tracing::{debug, info, warn};

use docforge_assemble::{AssemblyInput, assemble};
use docforge_backend::CachedGateway;
use docforge_classify::classify_default;
use docforge_config::Config;
use docforge_directory::SiteDirectory;
use docforge_guideline::GuidelineMergeCache;
use docforge_utils::error::DocForgeError;
use docforge_utils::types::{DocumentType, Site, Template};
use docforge_workflow::SessionStore;

use crate::protocol::ToolResponse;
use crate::tools::{
    CONTINUE_DOCUMENT, GENERATE_DOCUMENT, LIST_SITES, SEARCH_DOCUMENTS, registry,
};

/// Owns the stores and sequences them per tool invocation.
///
/// All mutable shared state (fingerprint cache, session store, directory,
/// guideline memo) lives here, constructor-injected and passed by reference;
/// under the single-threaded runtime no further synchronization is needed.
pub struct Dispatcher {
    config: Config,
    gateway: CachedGateway,
    directory: SiteDirectory,
    guidelines: GuidelineMergeCache,
    sessions: SessionStore,
}

impl Dispatcher {
    #[must_use]
    pub fn new(config: Config, gateway: CachedGateway) -> Self {
        let guidelines = GuidelineMergeCache::new(config.merge_ttl);
        let sessions = SessionStore::new(config.session_ttl);
        Self {
            config,
            gateway,
            directory: SiteDirectory::new(),
            guidelines,
            sessions,
        }
    }

    /// Startup hygiene: sweep the disk cache and warm the site directory.
    ///
    /// Neither step is required for correctness (expiry is lazy, the
    /// directory refreshes on demand), so failures only log.
    pub async fn startup(&mut self) {
        let swept = self.gateway.sweep_cache(self.config.cache_ttls.backend);
        if swept > 0 {
            info!("startup sweep removed {swept} stale cache entries");
        }
        if let Err(err) = self.directory.init(&mut self.gateway).await {
            warn!("site directory warm-up failed, will retry on demand: {err}");
        }
    }

    /// Number of live workflow sessions (diagnostics)
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Cache sweep passthrough for the CLI `sweep` subcommand
    pub fn sweep_cache(&mut self) -> usize {
        self.gateway.sweep_cache(self.config.cache_ttls.backend)
    }

    /// Handle one tool invocation end-to-end.
    ///
    /// This is the error propagation boundary: every failure becomes a
    /// user-facing message naming the likely cause and a concrete next
    /// step, never a protocol-level fault.
    pub async fn handle(&mut self, name: &str, args: &Value) -> ToolResponse {
        debug!("tool invocation: {name}");
        match self.dispatch(name, args).await {
            Ok(text) => ToolResponse::text(text),
            Err(err) => {
                warn!("tool {name} failed: {err}");
                ToolResponse::error(err.display_for_user())
            }
        }
    }

    async fn dispatch(&mut self, name: &str, args: &Value) -> Result<String, DocForgeError> {
        match name {
            GENERATE_DOCUMENT => self.generate_document(args).await,
            CONTINUE_DOCUMENT => self.continue_document(args).await,
            LIST_SITES => self.list_sites().await,
            SEARCH_DOCUMENTS => self.search_documents(args).await,
            other => {
                debug_assert!(registry().iter().all(|tool| tool.name != other));
                Err(DocForgeError::UnknownTool(other.to_string()))
            }
        }
    }

    async fn generate_document(&mut self, args: &Value) -> Result<String, DocForgeError> {
        let raw_request = required_str(GENERATE_DOCUMENT, args, "documentRequest")?;
        let site_token = optional_str(GENERATE_DOCUMENT, args, "siteName")?;
        let ticket_key = optional_str(GENERATE_DOCUMENT, args, "ticketKey")?;

        let request = classify_default(raw_request);
        let Some(document_type) = request.document_type else {
            return Err(DocForgeError::ClassificationAmbiguous {
                request: raw_request.to_string(),
            });
        };
        debug!(
            "classified as {document_type}, subject \"{}\"",
            request.subject
        );

        let site = self.resolve_site(site_token).await?;
        let template = self.fetch_template(document_type, &site).await?;
        let instruction = self
            .guidelines
            .get_merged(document_type, &site.id, &mut self.gateway)
            .await?;
        let project_info = self
            .build_project_info(document_type, ticket_key, &site)
            .await?;

        if document_type.requires_findings() {
            let session_id = self.sessions.create(
                document_type,
                request.subject.clone(),
                site,
                template.clone(),
                instruction.clone(),
                project_info,
                Utc::now(),
            );
            info!("phase 1 opened session {session_id} for {document_type}");
            return Ok(plan_request_text(
                &session_id,
                document_type,
                &request.subject,
                &template,
                self.sessions.ttl().as_secs(),
            ));
        }

        // Single-shot path: a workflow that needs zero caller findings,
        // assembled immediately and never stored.
        let findings = Map::new();
        let document = assemble(&AssemblyInput {
            template: &template,
            instruction: &instruction,
            findings: &findings,
            search_plan: None,
            additional_analysis: None,
            project_info: Some(&project_info),
        });
        info!("assembled {document_type} for \"{}\"", request.subject);
        Ok(document)
    }

    async fn continue_document(&mut self, args: &Value) -> Result<String, DocForgeError> {
        let session_id = required_str(CONTINUE_DOCUMENT, args, "sessionId")?;
        let search_plan = required_str(CONTINUE_DOCUMENT, args, "searchPlan")?;
        let findings = required_object(CONTINUE_DOCUMENT, args, "codebaseFindings")?;
        let additional = optional_str(CONTINUE_DOCUMENT, args, "additionalAnalysis")?;

        // Terminal transition: the session is gone whether or not assembly
        // below produces anything useful.
        let session = self.sessions.take(session_id, Utc::now())?;

        let document = assemble(&AssemblyInput {
            template: &session.template,
            instruction: &session.instruction,
            findings,
            search_plan: Some(search_plan),
            additional_analysis: additional,
            project_info: Some(&session.project_info),
        });
        info!(
            "phase 2 completed session {session_id} ({})",
            session.document_type
        );
        Ok(document)
    }

    async fn list_sites(&mut self) -> Result<String, DocForgeError> {
        if self.directory.snapshot().is_empty() {
            self.directory.init(&mut self.gateway).await?;
        }

        let sites = self.directory.snapshot();
        if sites.is_empty() {
            return Ok("No sites are registered in the backend yet.".to_string());
        }

        let mut out = format!("{} registered sites:\n", sites.len());
        for site in sites {
            let _ = writeln!(out, "- {} ({}) [id: {}]", site.name, site.company, site.id);
        }
        Ok(out)
    }

    async fn search_documents(&mut self, args: &Value) -> Result<String, DocForgeError> {
        let query = required_str(SEARCH_DOCUMENTS, args, "query")?;
        let site_token = optional_str(SEARCH_DOCUMENTS, args, "siteName")?;

        let site_id = match site_token {
            Some(token) => Some(self.resolve_site(Some(token)).await?.id),
            None => None,
        };

        let hits = self.gateway.search(query, site_id.as_deref()).await?;
        if hits.is_empty() {
            return Ok(format!(
                "No documents matched \"{query}\". Try a narrower or differently-worded query."
            ));
        }

        let mut out = format!("{} documents matched \"{query}\":\n", hits.len());
        for hit in &hits {
            let kind = hit.document_type.map_or("document", |ty| ty.label());
            let _ = writeln!(out, "- [{}] {} ({kind})", hit.id, hit.title);
            if let Some(summary) = &hit.summary {
                let _ = writeln!(out, "  {summary}");
            }
        }
        Ok(out)
    }

    /// Site resolution: explicit token, else the configured default site.
    async fn resolve_site(&mut self, token: Option<&str>) -> Result<Site, DocForgeError> {
        let default_site = self.config.default_site.clone();
        let token = match token {
            Some(explicit) => explicit.to_string(),
            None => default_site.ok_or_else(|| DocForgeError::InvalidArguments {
                tool: GENERATE_DOCUMENT.to_string(),
                reason: "no siteName was given and no default site is configured".to_string(),
            })?,
        };
        self.directory.resolve(&token, &mut self.gateway).await
    }

    async fn fetch_template(
        &mut self,
        document_type: DocumentType,
        site: &Site,
    ) -> Result<Template, DocForgeError> {
        self.gateway
            .template(document_type, &site.id)
            .await?
            .ok_or_else(|| DocForgeError::TemplateNotFound {
                document_type,
                site: site.name.clone(),
            })
    }

    /// Ambient project context: ticket text when a key was supplied, plus
    /// the external database hint for table specifications.
    async fn build_project_info(
        &mut self,
        document_type: DocumentType,
        ticket_key: Option<&str>,
        site: &Site,
    ) -> Result<String, DocForgeError> {
        let mut info = format!("Site: {} ({})", site.name, site.company);

        if let Some(key) = ticket_key {
            if !self.gateway.has_tracker() {
                return Err(DocForgeError::InvalidArguments {
                    tool: GENERATE_DOCUMENT.to_string(),
                    reason: format!(
                        "ticketKey '{key}' was supplied but no issue tracker is configured"
                    ),
                });
            }
            let ticket = self.gateway.ticket(key).await?;
            let _ = write!(info, "\n\nTicket {}: {}", ticket.key, ticket.summary);
            if !ticket.description.is_empty() {
                let _ = write!(info, "\n{}", ticket.description);
            }
        }

        if document_type == DocumentType::TableSpecification {
            if let Some(url) = &self.config.external_db_url {
                let kind = self.config.external_db_type.as_deref().unwrap_or("unknown");
                let _ = write!(info, "\n\nExternal database ({kind}): {url}");
            }
        }

        Ok(info)
    }
}

/// Phase-1 response: the template, the variables to fill, and an explicit
/// request for an exploration plan and a continuation call.
fn plan_request_text(
    session_id: &str,
    document_type: DocumentType,
    subject: &str,
    template: &Template,
    ttl_secs: u64,
) -> String {
    let mut out = format!(
        "The {} for \"{subject}\" needs codebase observations this server cannot gather on \
         its own.\n\nSession: {session_id} (single use, expires after {ttl_secs}s)\n\n\
         Do the following:\n\
         1. Devise a codebase exploration plan that can fill the template variables below.\n\
         2. Execute the plan against the codebase.\n\
         3. Call {CONTINUE_DOCUMENT} with sessionId, the executed searchPlan, and \
         codebaseFindings keyed by variable name (additionalAnalysis is optional).\n",
        document_type.label()
    );

    if template.variables.is_empty() {
        out.push_str("\nTemplate variables: none declared; supply any findings you judge relevant.\n");
    } else {
        out.push_str("\nTemplate variables to fill:\n");
        for (name, hint) in &template.variables {
            if hint.is_empty() {
                let _ = writeln!(out, "- {name}");
            } else {
                let _ = writeln!(out, "- {name}: {hint}");
            }
        }
    }

    let _ = write!(out, "\nTemplate:\n{}", template.text);
    out
}

fn required_str<'a>(
    tool: &str,
    args: &'a Value,
    key: &str,
) -> Result<&'a str, DocForgeError> {
    match args.get(key) {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text),
        Some(Value::String(_)) => Err(DocForgeError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("'{key}' must not be empty"),
        }),
        Some(_) => Err(DocForgeError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("'{key}' must be a string"),
        }),
        None => Err(DocForgeError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("missing required argument '{key}'"),
        }),
    }
}

fn optional_str<'a>(
    tool: &str,
    args: &'a Value,
    key: &str,
) -> Result<Option<&'a str>, DocForgeError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(_) => Err(DocForgeError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("'{key}' must be a string when present"),
        }),
    }
}

fn required_object<'a>(
    tool: &str,
    args: &'a Value,
    key: &str,
) -> Result<&'a Map<String, Value>, DocForgeError> {
    match args.get(key) {
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(DocForgeError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("'{key}' must be an object"),
        }),
        None => Err(DocForgeError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("missing required argument '{key}'"),
        }),
    }
}
