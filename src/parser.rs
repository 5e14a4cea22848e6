use crate::errors::WhoisError;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Structured view of a WHOIS response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedWhoisData {
    pub domain_name: Option<String>,
    pub registrar: Option<String>,
    pub creation_date: Option<String>,
    pub expiration_date: Option<String>,
    pub updated_date: Option<String>,
    pub name_servers: Vec<String>,
    pub status: Vec<String>,
}

impl ParsedWhoisData {
    fn has_registration_fields(&self) -> bool {
        self.domain_name.is_some()
            || self.registrar.is_some()
            || self.creation_date.is_some()
            || self.expiration_date.is_some()
    }
}

/// Turns raw WHOIS text into a structured record.
pub trait WhoisParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<ParsedWhoisData, WhoisError>;
}

static NOT_FOUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^\s*(no match( for)?\b|not found\b|no data found|no entries found|no object found|domain not found|status:\s*(free|available)\s*$)",
    )
    .expect("not-found pattern is valid")
});

static RATE_LIMITED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(query rate limit exceeded|limit exceeded|too many requests|quota exceeded)")
        .expect("rate-limit pattern is valid")
});

/// Line-oriented `key: value` parser covering the common registry layouts.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextWhoisParser;

impl TextWhoisParser {
    pub fn new() -> Self {
        Self
    }
}

impl WhoisParser for TextWhoisParser {
    fn parse(&self, raw: &str) -> Result<ParsedWhoisData, WhoisError> {
        if raw.trim().is_empty() {
            return Err(WhoisError::InvalidData("empty response".to_string()));
        }
        if NOT_FOUND.is_match(raw) {
            return Err(WhoisError::DomainNotFound);
        }
        if RATE_LIMITED.is_match(raw) {
            return Err(WhoisError::RateLimited);
        }

        let mut parsed = ParsedWhoisData::default();

        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('%') || line.starts_with('#') || line.starts_with(">>>") {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            // Order matters: "Registrar Registration Expiration Date" must land
            // on expiration before the creation or registrar arms see it.
            match key.as_str() {
                "domain name" | "domain" | "domain_name" => {
                    parsed.domain_name.get_or_insert_with(|| value.to_lowercase());
                }
                k if k.contains("expir") || k.contains("paid-till") => {
                    parsed.expiration_date.get_or_insert_with(|| value.to_string());
                }
                k if k.contains("creation")
                    || k.contains("created")
                    || k == "registered"
                    || k == "registered on"
                    || k == "registration time"
                    || k == "registration date" =>
                {
                    parsed.creation_date.get_or_insert_with(|| value.to_string());
                }
                k if k.contains("updated") || k.contains("modified") || k == "changed" => {
                    parsed.updated_date.get_or_insert_with(|| value.to_string());
                }
                k if k.contains("registrar")
                    && !k.contains("whois")
                    && !k.contains("url")
                    && !k.contains("abuse")
                    && !k.contains("iana") =>
                {
                    parsed.registrar.get_or_insert_with(|| value.to_string());
                }
                k if k.contains("name server") || k == "nserver" || k == "ns" => {
                    let server = value.split_whitespace().next().unwrap_or(value).to_lowercase();
                    if !parsed.name_servers.contains(&server) {
                        parsed.name_servers.push(server);
                    }
                }
                k if k.contains("status") => {
                    if !parsed.status.iter().any(|s| s == value) {
                        parsed.status.push(value.to_string());
                    }
                }
                _ => {}
            }
        }

        if !parsed.has_registration_fields() {
            return Err(WhoisError::InvalidData("no registration fields found".to_string()));
        }

        debug!(
            "Parsed whois data for {:?}: creation date {:?}",
            parsed.domain_name, parsed.creation_date
        );
        Ok(parsed)
    }
}
