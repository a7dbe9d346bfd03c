//! # Scan Target Model
//!
//! Parses the raw string supplied by the user into the hostname that is resolved
//! and probed. Accepted inputs:
//! * A bare hostname (`assets.example.com`).
//! * A URL (`https://assets.example.com:8443/index.html?x=1`).
//! * An IP literal, with or without brackets (`52.1.2.3`, `[2600::1]:443`).
//!
//! Scheme, userinfo, port, path, query and fragment are discarded. The scheme in
//! particular carries no classification weight.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::TargetError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    raw: String,
    host: String,
}

impl Target {
    /// The string exactly as the user supplied it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The normalized hostname. Doubles as the bucket name for the probes.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the address if the target is already an IP literal.
    pub fn ip_literal(&self) -> Option<IpAddr> {
        self.host.parse::<IpAddr>().ok()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)
    }
}

impl FromStr for Target {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(TargetError::Empty);
        }

        let host = extract_host(raw).to_ascii_lowercase();
        let host = host.trim_end_matches('.');

        if host.is_empty() {
            return Err(TargetError::MissingHost(raw.to_string()));
        }

        if host.parse::<IpAddr>().is_err() && !is_valid_hostname(host) {
            return Err(TargetError::InvalidHost(host.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            host: host.to_string(),
        })
    }
}

/// Strips everything around the authority's host part.
fn extract_host(raw: &str) -> &str {
    let without_scheme = match raw.split_once("://") {
        Some((_scheme, rest)) => rest,
        None => raw,
    };

    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();

    let host_port = match authority.rsplit_once('@') {
        Some((_userinfo, rest)) => rest,
        None => authority,
    };

    strip_port(host_port)
}

fn strip_port(host_port: &str) -> &str {
    if let Some(rest) = host_port.strip_prefix('[') {
        return rest.split(']').next().unwrap_or_default();
    }

    // More than one colon means a bare IPv6 literal, which has no port.
    if host_port.matches(':').count() == 1 {
        if let Some((host, port)) = host_port.split_once(':') {
            if port.chars().all(|c| c.is_ascii_digit()) {
                return host;
            }
        }
    }

    host_port
}

fn is_valid_hostname(host: &str) -> bool {
    host.len() <= 253
        && host.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
