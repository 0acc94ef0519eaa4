//! The `{ success, message?, data? }` response envelope both upstreams speak

use serde::{Deserialize, Serialize};

use docforge_utils::error::UpstreamError;

/// Uniform upstream response wrapper.
///
/// `success: false` is an upstream failure no matter which endpoint produced
/// it; the optional `message` becomes the failure reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the envelope into its payload.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError::Rejected` when `success` is false.
    pub fn into_data(self) -> Result<Option<T>, UpstreamError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(UpstreamError::Rejected {
                message: self
                    .message
                    .unwrap_or_else(|| "no failure message supplied".to_string()),
            })
        }
    }

    /// Unwrap the envelope, treating absent data on success as a failure.
    ///
    /// For endpoints where a successful response always carries a payload
    /// (site lists, guideline lists, search results).
    ///
    /// # Errors
    ///
    /// `Rejected` when `success` is false, `Malformed` when `data` is absent.
    pub fn into_required_data(self) -> Result<T, UpstreamError> {
        self.into_data()?.ok_or_else(|| UpstreamError::Malformed {
            reason: "successful response carried no data".to_string(),
        })
    }
}
