//! # Domain Age Service Library
//!
//! Flags recently registered domains from their WHOIS creation date.
//!
//! ## Features
//!
//! - Creation-date normalization across the common registry layouts
//! - Six-calendar-month age classification
//! - In-memory TTL cache with background expiry sweeps
//! - Global or per-domain serialization of upstream WHOIS lookups
//! - Pluggable WHOIS transport and parser behind traits
//! - Optional axum HTTP surface (`server` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_age_service::{Config, DomainAgeChecker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let checker = DomainAgeChecker::from_config(&config);
//!     let outcome = checker.check("example.com").await;
//!
//!     println!("Created: {}", outcome.result.created_date);
//!     println!("Recent: {}", outcome.result.is_recently_registered);
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod checker;
pub mod classifier;
pub mod config;
pub mod date;
pub mod errors;
pub mod lock;
pub mod parser;
pub mod tld_mappings;
pub mod whois;

#[cfg(feature = "server")]
pub mod metrics;
#[cfg(feature = "server")]
pub mod server;

// Re-export main types for easy access
pub use cache::CacheService;
pub use checker::{CheckOutcome, DomainAgeChecker};
pub use config::{Config, LockPolicy};
pub use errors::{CheckError, WhoisError};
pub use parser::{ParsedWhoisData, TextWhoisParser, WhoisParser};
pub use whois::{TcpWhoisClient, WhoisFetcher};

use serde::Serialize;

/// Outcome of a domain age check, as cached and as served over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainResult {
    pub domain: String,
    /// `YYYY-MM-DD`, empty when the date could not be resolved
    pub created_date: String,
    #[serde(rename = "is_less_than_6_months")]
    pub is_recently_registered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure label for metrics; never serialized
    #[serde(skip)]
    pub error_kind: Option<&'static str>,
}

impl DomainResult {
    pub fn resolved(domain: &str, created_date: String, is_recently_registered: bool) -> Self {
        Self {
            domain: domain.to_string(),
            created_date,
            is_recently_registered,
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(domain: &str, error: &CheckError) -> Self {
        Self {
            domain: domain.to_string(),
            created_date: String::new(),
            is_recently_registered: false,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
