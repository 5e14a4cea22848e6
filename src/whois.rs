use crate::{config::Config, errors::WhoisError, tld_mappings::KNOWN_TLD_SERVERS};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use publicsuffix::{List, Psl};
use std::{collections::HashMap, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::RwLock,
    time::timeout,
};
use tracing::{debug, info, warn};

// Global PSL instance - shared across all client instances
static PSL: Lazy<List> = Lazy::new(|| List::new());

const WHOIS_PORT: u16 = 43;
const IANA_WHOIS_SERVER: &str = "whois.iana.org";
const READ_BUFFER_SIZE: usize = 8192;

/// Public suffix of the domain, falling back to its last label.
pub fn extract_tld(domain: &str) -> Result<String, WhoisError> {
    if let Some(parsed) = PSL.domain(domain.as_bytes()) {
        if let Ok(suffix) = std::str::from_utf8(parsed.suffix().as_bytes()) {
            return Ok(suffix.to_string());
        }
    }

    warn!("Public suffix parsing failed for {}, using fallback", domain);
    domain
        .rsplit('.')
        .next()
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .ok_or_else(|| WhoisError::InvalidDomain(format!("No TLD found in domain: {}", domain)))
}

/// Fetches raw WHOIS text for a domain.
#[async_trait]
pub trait WhoisFetcher: Send + Sync {
    async fn fetch(&self, domain: &str) -> Result<String, WhoisError>;
}

/// Port-43 WHOIS client with IANA discovery and registrar referral following.
pub struct TcpWhoisClient {
    timeout: Duration,
    max_response_size: usize,
    max_referrals: usize,
    discovered_servers: RwLock<HashMap<String, String>>,
}

impl TcpWhoisClient {
    pub fn new(config: &Config) -> Self {
        info!(
            "Whois client initialized (timeout {}s, max {} referrals)",
            config.whois_timeout_seconds, config.max_referrals
        );

        Self {
            timeout: Duration::from_secs(config.whois_timeout_seconds),
            max_response_size: config.max_response_size,
            max_referrals: config.max_referrals,
            discovered_servers: RwLock::new(HashMap::new()),
        }
    }

    async fn find_whois_server(&self, tld: &str) -> Result<String, WhoisError> {
        if let Some(server) = Self::known_server(tld) {
            return Ok(server.to_string());
        }

        {
            let servers = self.discovered_servers.read().await;
            if let Some(server) = servers.get(tld) {
                return Ok(server.clone());
            }
        }

        match self.query_iana(tld).await {
            Some(server) => {
                info!("Discovered whois server via IANA for {}: {}", tld, server);
                self.discovered_servers
                    .write()
                    .await
                    .insert(tld.to_string(), server.clone());
                Ok(server)
            }
            None => Err(WhoisError::UnsupportedTld(tld.to_string())),
        }
    }

    fn known_server(tld: &str) -> Option<&'static str> {
        KNOWN_TLD_SERVERS.get(tld).copied().or_else(|| {
            // Multi-label suffixes ("com.au") fall back to their last label.
            tld.rsplit('.').next().and_then(|last| KNOWN_TLD_SERVERS.get(last).copied())
        })
    }

    async fn query_iana(&self, tld: &str) -> Option<String> {
        let query = tld.rsplit('.').next().unwrap_or(tld);

        match self.execute_whois_query(IANA_WHOIS_SERVER, query).await {
            Ok(response) => response.lines().find_map(|line| {
                let (key, value) = line.trim().split_once(':')?;
                let key = key.trim().to_lowercase();
                let value = value.trim();
                ((key == "whois" || key == "refer") && !value.is_empty()).then(|| value.to_string())
            }),
            Err(e) => {
                warn!("Failed to query {} for TLD {}: {}", IANA_WHOIS_SERVER, tld, e);
                None
            }
        }
    }

    async fn execute_whois_query(&self, server: &str, query: &str) -> Result<String, WhoisError> {
        let mut stream = timeout(self.timeout, TcpStream::connect((server, WHOIS_PORT))).await??;

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {}", e);
        }

        stream.write_all(format!("{}\r\n", query).as_bytes()).await?;

        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        let mut response = Vec::new();

        loop {
            match timeout(self.timeout, stream.read(&mut buffer)).await? {
                Ok(0) => break, // EOF
                Ok(n) => {
                    response.extend_from_slice(&buffer[..n]);
                    if response.len() > self.max_response_size {
                        return Err(WhoisError::ResponseTooLarge);
                    }
                }
                Err(e) => return Err(WhoisError::IoError(e)),
            }
        }

        debug!("Received {} bytes from {}", response.len(), server);
        // Registries still answer in Latin-1 now and then.
        Ok(String::from_utf8_lossy(&response).into_owned())
    }

    async fn follow_referrals(&self, initial_server: String, initial_data: String, domain: &str) -> (String, String) {
        let mut current_server = initial_server;
        let mut current_data = initial_data;

        for _ in 0..self.max_referrals {
            let Some(referral_server) = extract_referral(&current_data) else {
                break;
            };
            if referral_server.eq_ignore_ascii_case(&current_server) {
                break;
            }

            debug!("Following referral from {} to {}", current_server, referral_server);
            match self.execute_whois_query(&referral_server, domain).await {
                Ok(data) if !data.trim().is_empty() => {
                    current_server = referral_server;
                    current_data = data;
                }
                Ok(_) => break,
                Err(e) => {
                    // The registry answer is still usable.
                    warn!("Failed to query referral server {}: {}", referral_server, e);
                    break;
                }
            }
        }

        (current_server, current_data)
    }
}

#[async_trait]
impl WhoisFetcher for TcpWhoisClient {
    async fn fetch(&self, domain: &str) -> Result<String, WhoisError> {
        let domain = domain.trim().trim_end_matches('.').to_lowercase();

        if domain.is_empty() || !domain.contains('.') || domain.contains("..") || domain.len() > 253 {
            return Err(WhoisError::InvalidDomain(domain));
        }

        let tld = extract_tld(&domain)?;
        let server = self.find_whois_server(&tld).await?;
        let raw_data = self.execute_whois_query(&server, &domain).await?;
        let (final_server, final_data) = self.follow_referrals(server, raw_data, &domain).await;

        debug!("Whois data for {} served by {}", domain, final_server);
        Ok(final_data)
    }
}

/// Registrar whois server advertised in a registry response, if any.
fn extract_referral(data: &str) -> Option<String> {
    data.lines().find_map(|line| {
        let (key, value) = line.trim().split_once(':')?;
        let key = key.trim().to_lowercase();
        if !((key.contains("whois") && key.contains("server")) || key == "refer") {
            return None;
        }

        let value = value.trim();
        let host = value
            .strip_prefix("https://")
            .or_else(|| value.strip_prefix("http://"))
            .unwrap_or(value)
            .trim_end_matches('/');
        (!host.is_empty() && !host.contains(char::is_whitespace)).then(|| host.to_string())
    })
}
