#[cfg(feature = "server")]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors raised by the WHOIS collaborators (transport and text parser).
#[derive(Error, Debug)]
pub enum WhoisError {
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Unsupported TLD: {0}")]
    UnsupportedTld(String),

    #[error("Network timeout")]
    Timeout,

    #[error("IO error: {0}")]
    IoError(#[from] tokio::io::Error),

    #[error("Response too large")]
    ResponseTooLarge,

    #[error("domain is not found")]
    DomainNotFound,

    #[error("domain whois query is limited")]
    RateLimited,

    #[error("domain whois data is invalid: {0}")]
    InvalidData(String),
}

impl From<tokio::time::error::Elapsed> for WhoisError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        WhoisError::Timeout
    }
}

/// Failures of a domain age check.
///
/// Everything except [`CheckError::MissingParameter`] is reported in-band:
/// the request still answers 200 and the message lands in the `error` field.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Missing 'domain' parameter")]
    MissingParameter,

    #[error("Failed to fetch WHOIS: {0}")]
    WhoisFetch(#[source] WhoisError),

    #[error("Failed to parse WHOIS data: {0}")]
    WhoisParse(#[source] WhoisError),

    #[error("Creation date not found in WHOIS data")]
    MissingCreationDate,

    #[error("Failed to parse creation date: unsupported date format: {0}")]
    UnsupportedDateFormat(String),
}

impl CheckError {
    /// Stable label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckError::MissingParameter => "missing_parameter",
            CheckError::WhoisFetch(WhoisError::Timeout) => "whois_timeout",
            CheckError::WhoisFetch(_) => "whois_fetch",
            CheckError::WhoisParse(_) => "whois_parse",
            CheckError::MissingCreationDate => "missing_creation_date",
            CheckError::UnsupportedDateFormat(_) => "unsupported_date_format",
        }
    }
}

#[cfg(feature = "server")]
impl IntoResponse for CheckError {
    fn into_response(self) -> Response {
        match self {
            CheckError::MissingParameter => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            // In-band failures are rendered by the handler as JSON; reaching
            // this arm means a handler let one escape.
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response(),
        }
    }
}
