use thiserror::Error;

/// Failures talking to AMap.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AmapError {
    /// Transport failure, including timeouts.
    #[error("AMap request failed: {0}")]
    Http(String),

    /// AMap answered with `status != "1"`.
    #[error("AMap business error: {info}")]
    Api {
        /// AMap's `info` field.
        info: String,
    },

    /// The body was not the JSON AMap documents.
    #[error("invalid AMap response: {0}")]
    InvalidResponse(String),

    /// No API key was configured.
    #[error("GAODE_API_KEY is not set")]
    MissingApiKey,
}

impl AmapError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Http("request timed out".to_owned())
        } else {
            Self::Http(err.to_string())
        }
    }
}
