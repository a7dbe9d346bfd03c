use std::net::IpAddr;

/// The outcome of forward and reverse resolution of a [`super::target::Target`].
///
/// The forward address is always present; a host without one never makes it
/// past the resolver. The reverse name is the classification signal and may be
/// missing when the address has no PTR record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHost {
    pub ip_address: IpAddr,
    pub reverse_name: Option<String>,
}

impl ResolvedHost {
    pub fn new(ip_address: IpAddr, reverse_name: Option<String>) -> Self {
        Self {
            ip_address,
            reverse_name,
        }
    }

    pub fn forward_only(ip_address: IpAddr) -> Self {
        Self::new(ip_address, None)
    }
}
