//! Forward and reverse resolution of the scan target.
//!
//! DNS is best-effort and single-shot: every lookup is bounded by a timeout and
//! never retried. Only a missing forward address is fatal; a missing PTR record
//! just leaves the host without a reverse name.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bucketscout_common::config::DEFAULT_DNS_TIMEOUT;
use bucketscout_common::error::ResolutionError;
use bucketscout_common::events::{EventSink, ScanEvent};
use bucketscout_common::model::host::ResolvedHost;
use bucketscout_common::model::target::Target;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use tokio::time::timeout;
use tracing::debug;

/// The DNS capability the resolver needs.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn lookup_ip(&self, host: &str) -> anyhow::Result<Vec<IpAddr>>;
    async fn reverse_lookup(&self, ip: IpAddr) -> anyhow::Result<Vec<String>>;
}

/// [`DnsLookup`] backed by the system's configured name servers.
pub struct SystemDns {
    resolver: TokioAsyncResolver,
}

impl SystemDns {
    pub fn new(lookup_timeout: Duration) -> Self {
        let (config, mut opts) = match hickory_resolver::system_conf::read_system_conf() {
            Ok(system) => system,
            Err(e) => {
                debug!("Falling back to default resolver config: {e}");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        opts.timeout = lookup_timeout;
        opts.attempts = 1;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

#[async_trait]
impl DnsLookup for SystemDns {
    async fn lookup_ip(&self, host: &str) -> anyhow::Result<Vec<IpAddr>> {
        let lookup = self
            .resolver
            .lookup_ip(host)
            .await
            .with_context(|| format!("looking up {host}"))?;
        Ok(lookup.iter().collect())
    }

    async fn reverse_lookup(&self, ip: IpAddr) -> anyhow::Result<Vec<String>> {
        let lookup = self
            .resolver
            .reverse_lookup(ip)
            .await
            .with_context(|| format!("reverse lookup of {ip}"))?;
        Ok(lookup.iter().map(|name| name.to_string()).collect())
    }
}

pub struct HostResolver {
    dns: Arc<dyn DnsLookup>,
    events: Arc<dyn EventSink>,
    lookup_timeout: Duration,
}

impl HostResolver {
    pub fn new(dns: Arc<dyn DnsLookup>, events: Arc<dyn EventSink>) -> Self {
        Self {
            dns,
            events,
            lookup_timeout: DEFAULT_DNS_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    pub async fn resolve(&self, target: &Target) -> Result<ResolvedHost, ResolutionError> {
        let ip_address = match target.ip_literal() {
            Some(ip) => ip,
            None => self.forward(target.host()).await?,
        };
        self.events.emit(ScanEvent::AddressResolved {
            host: target.host().to_string(),
            ip: ip_address,
        });

        let reverse_name = self.reverse(ip_address).await;
        Ok(ResolvedHost::new(ip_address, reverse_name))
    }

    async fn forward(&self, host: &str) -> Result<IpAddr, ResolutionError> {
        let no_such_host = |reason: String| ResolutionError::NoSuchHost {
            host: host.to_string(),
            reason,
        };

        let ips = match timeout(self.lookup_timeout, self.dns.lookup_ip(host)).await {
            Ok(Ok(ips)) => ips,
            Ok(Err(e)) => return Err(no_such_host(format!("{e:#}"))),
            Err(_elapsed) => return Err(no_such_host("timeout".to_string())),
        };

        preferred_address(&ips).ok_or_else(|| no_such_host("no addresses returned".to_string()))
    }

    async fn reverse(&self, ip: IpAddr) -> Option<String> {
        let outcome = match timeout(self.lookup_timeout, self.dns.reverse_lookup(ip)).await {
            Ok(Ok(names)) => names
                .iter()
                .map(|name| normalize_name(name))
                .find(|name| !name.is_empty())
                .ok_or_else(|| "no PTR record".to_string()),
            Ok(Err(e)) => Err(format!("{e:#}")),
            Err(_elapsed) => Err("timeout".to_string()),
        };

        match outcome {
            Ok(name) => {
                self.events.emit(ScanEvent::ReverseNameResolved {
                    ip,
                    name: name.clone(),
                });
                Some(name)
            }
            Err(reason) => {
                self.events.emit(ScanEvent::ReverseNameMissing { ip, reason });
                None
            }
        }
    }
}

/// IPv4 first; the provider's PTR records are published for v4 addresses.
fn preferred_address(ips: &[IpAddr]) -> Option<IpAddr> {
    ips.iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| ips.first())
        .copied()
}

/// Lowercases and drops the root dot of a fully qualified name.
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
