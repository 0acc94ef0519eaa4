//! reqwest implementations of the upstream collaborator traits

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use docforge_utils::error::{ConfigError, UpstreamError};
use docforge_utils::types::{DocumentHit, DocumentType, Guideline, Site, Template, Ticket};

use crate::envelope::ApiEnvelope;
use crate::{KnowledgeBackend, TicketSource};

fn build_client(timeout: Duration) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| ConfigError::Invalid {
            reason: format!("failed to construct HTTP client: {err}"),
        })
}

fn map_send_error(err: &reqwest::Error, url: &str, timeout: Duration) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout {
            url: url.to_string(),
            timeout_secs: timeout.as_secs(),
        }
    } else {
        UpstreamError::Request {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

async fn get_envelope<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
    timeout: Duration,
) -> Result<ApiEnvelope<T>, UpstreamError> {
    debug!("GET {url}");
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|err| map_send_error(&err, url, timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Request {
            url: url.to_string(),
            reason: format!("HTTP status {status}"),
        });
    }

    response
        .json::<ApiEnvelope<T>>()
        .await
        .map_err(|err| UpstreamError::Malformed {
            reason: err.to_string(),
        })
}

/// HTTP client for the backend knowledge service
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpBackend {
    /// Construct a backend client with a bounded per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl KnowledgeBackend for HttpBackend {
    async fn fetch_sites(&self) -> Result<Vec<Site>, UpstreamError> {
        let url = self.url("/sites");
        get_envelope::<Vec<Site>>(&self.client, &url, &[], self.timeout)
            .await?
            .into_required_data()
    }

    async fn fetch_template(
        &self,
        document_type: DocumentType,
        site_id: &str,
    ) -> Result<Option<Template>, UpstreamError> {
        let url = self.url(&format!("/templates/guide/{document_type}"));
        get_envelope::<Template>(&self.client, &url, &[("site_id", site_id)], self.timeout)
            .await?
            .into_data()
    }

    async fn fetch_guidelines(
        &self,
        document_type: DocumentType,
        site_id: &str,
    ) -> Result<Vec<Guideline>, UpstreamError> {
        let url = self.url(&format!("/analysis/guidelines/{document_type}"));
        get_envelope::<Vec<Guideline>>(&self.client, &url, &[("site_id", site_id)], self.timeout)
            .await?
            .into_required_data()
    }

    async fn search_documents(
        &self,
        query: &str,
        site_id: Option<&str>,
    ) -> Result<Vec<DocumentHit>, UpstreamError> {
        let url = self.url("/documents/search");
        let mut params = vec![("query", query)];
        if let Some(site_id) = site_id {
            params.push(("site_id", site_id));
        }
        get_envelope::<Vec<DocumentHit>>(&self.client, &url, &params, self.timeout)
            .await?
            .into_required_data()
    }
}

/// HTTP client for the read-only issue tracker
#[derive(Debug, Clone)]
pub struct HttpTicketSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpTicketSource {
    /// Construct a tracker client; `token` is sent as a bearer credential
    /// when present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            timeout,
        })
    }
}

#[async_trait]
impl TicketSource for HttpTicketSource {
    async fn fetch_ticket(&self, key: &str) -> Result<Ticket, UpstreamError> {
        let url = format!("{}/tickets/{key}", self.base_url);
        debug!("GET {url}");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| map_send_error(&err, &url, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Request {
                url,
                reason: format!("HTTP status {status}"),
            });
        }

        response
            .json::<ApiEnvelope<Ticket>>()
            .await
            .map_err(|err| UpstreamError::Malformed {
                reason: err.to_string(),
            })?
            .into_required_data()
    }
}
