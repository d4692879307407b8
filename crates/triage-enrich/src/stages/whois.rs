use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::warn;

use crate::context::EnrichmentContext;
use crate::error::EnrichError;
use crate::pipeline::Stage;

const WHOIS_TIMEOUT: Duration = Duration::from_secs(2);

/// Domain registry lookup capability. Pluggable so a deployment can swap in
/// a commercial WHOIS API without touching the pipeline, the same way the
/// original worker's `whois.whois(domain)` call sat behind one function.
#[async_trait]
pub trait WhoisClient: Send + Sync {
    async fn lookup(&self, domain: &str) -> crate::error::Result<Value>;
}

/// Raw WHOIS protocol (RFC 3912) client against `whois.iana.org`. Good
/// enough for the gTLD/ccTLD registries this product targets; a referral
/// chase to the registry-specific server is left unimplemented, matching
/// `original_source/`'s own use of a single best-effort library call.
pub struct TcpWhoisClient {
    server: String,
}

impl TcpWhoisClient {
    pub fn new() -> Self {
        Self {
            server: "whois.iana.org:43".to_string(),
        }
    }
}

#[async_trait]
impl WhoisClient for TcpWhoisClient {
    async fn lookup(&self, domain: &str) -> crate::error::Result<Value> {
        let mut stream = TcpStream::connect(&self.server)
            .await
            .map_err(|e| EnrichError::DependencyUnavailable {
                message: format!("whois connect: {e}"),
            })?;
        stream
            .write_all(format!("{domain}\r\n").as_bytes())
            .await
            .map_err(|e| EnrichError::DependencyUnavailable {
                message: format!("whois write: {e}"),
            })?;

        let mut raw = String::new();
        stream
            .read_to_string(&mut raw)
            .await
            .map_err(|e| EnrichError::DependencyUnavailable {
                message: format!("whois read: {e}"),
            })?;

        Ok(parse_whois_response(&raw))
    }
}

fn field(raw: &str, label: &str) -> Option<String> {
    raw.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case(label) {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    })
}

fn parse_whois_response(raw: &str) -> Value {
    json!({
        "creation_date": field(raw, "creation date").or_else(|| field(raw, "created")),
        "expiration_date": field(raw, "registry expiry date").or_else(|| field(raw, "expiration date")),
        "registrar": field(raw, "registrar"),
        "country": field(raw, "country"),
        "org": field(raw, "org").or_else(|| field(raw, "organisation")),
    })
}

/// Step 6: WHOIS lookup for `creation_date`/`expiration_date`/`registrar`/
/// `country`/`org`. Bounded to a strict 2s timeout (`SPEC_FULL.md` §9 item
/// 5) rather than deferred to a side-channel, so step ordering stays
/// observable within one pass over the document. Failures — including a
/// timeout — are tolerated and yield an empty object, per `spec.md` §4.4
/// step 6.
pub struct WhoisStage {
    client: std::sync::Arc<dyn WhoisClient>,
}

impl WhoisStage {
    pub fn new(client: std::sync::Arc<dyn WhoisClient>) -> Self {
        Self { client }
    }

    pub fn with_tcp_client() -> Self {
        Self::new(std::sync::Arc::new(TcpWhoisClient::new()))
    }
}

#[async_trait]
impl Stage for WhoisStage {
    fn id(&self) -> &str {
        "whois"
    }

    async fn run(&self, ctx: &mut EnrichmentContext) -> Result<(), EnrichError> {
        let domain = ctx.domain.clone();
        match tokio::time::timeout(WHOIS_TIMEOUT, self.client.lookup(&domain)).await {
            Ok(Ok(value)) => ctx.whois_data = value,
            Ok(Err(err)) => {
                warn!(domain, error = %err, "whois lookup failed, continuing with empty map");
                ctx.whois_data = json!({});
            }
            Err(_) => {
                warn!(domain, "whois lookup timed out after 2s, continuing with empty map");
                ctx.whois_data = json!({});
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_fields_case_insensitively() {
        let raw = "Domain Name: EXAMPLE.COM\nCreation Date: 2020-01-01T00:00:00Z\nRegistrar: Example Registrar\n";
        let parsed = parse_whois_response(raw);
        assert_eq!(parsed["creation_date"], "2020-01-01T00:00:00Z");
        assert_eq!(parsed["registrar"], "Example Registrar");
    }

    #[test]
    fn missing_fields_are_null_not_absent() {
        let parsed = parse_whois_response("");
        assert!(parsed["creation_date"].is_null());
    }
}
