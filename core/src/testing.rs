//! In-memory stand-ins for the DNS and storage collaborators.
//!
//! Compiled for unit tests and, through the `testing` feature, for the
//! integration test crate.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use bucketscout_common::error::StorageError;
use bucketscout_common::model::probe::{Listing, ObjectDescriptor};

use crate::resolver::DnsLookup;
use crate::storage::ObjectStore;

#[derive(Debug, Default)]
pub struct FakeDns {
    forward: HashMap<String, Vec<IpAddr>>,
    reverse: HashMap<IpAddr, Vec<String>>,
    delay: Option<Duration>,
}

impl FakeDns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: &str, ips: &[IpAddr]) -> Self {
        self.forward.insert(host.to_string(), ips.to_vec());
        self
    }

    pub fn with_ptr(mut self, ip: IpAddr, name: &str) -> Self {
        self.reverse.entry(ip).or_default().push(name.to_string());
        self
    }

    /// Every lookup sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl DnsLookup for FakeDns {
    async fn lookup_ip(&self, host: &str) -> anyhow::Result<Vec<IpAddr>> {
        self.pause().await;
        self.forward
            .get(host)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("NXDOMAIN"))
    }

    async fn reverse_lookup(&self, ip: IpAddr) -> anyhow::Result<Vec<String>> {
        self.pause().await;
        self.reverse
            .get(&ip)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no PTR record for {ip}"))
    }
}

#[derive(Debug, Default)]
enum ListingMode {
    #[default]
    Allow,
    Deny,
    Fail(String),
}

/// A bucket held in memory. Objects are listed in insertion order.
#[derive(Debug, Default)]
pub struct FakeStore {
    objects: Mutex<Vec<(String, Vec<u8>)>>,
    listing: ListingMode,
    truncated: bool,
    deny_reads: bool,
    deny_writes: bool,
    get_failures: HashMap<String, String>,
    get_delay: Option<Duration>,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, key: &str, body: &[u8]) -> Self {
        self.insert(key, body.to_vec());
        self
    }

    pub fn deny_listing(mut self) -> Self {
        self.listing = ListingMode::Deny;
        self
    }

    pub fn fail_listing(mut self, reason: &str) -> Self {
        self.listing = ListingMode::Fail(reason.to_string());
        self
    }

    pub fn truncated(mut self) -> Self {
        self.truncated = true;
        self
    }

    pub fn deny_reads(mut self) -> Self {
        self.deny_reads = true;
        self
    }

    pub fn deny_writes(mut self) -> Self {
        self.deny_writes = true;
        self
    }

    /// Fetching `key` delivers half of its body, then fails with a transport error.
    pub fn fail_get(mut self, key: &str, reason: &str) -> Self {
        self.get_failures.insert(key.to_string(), reason.to_string());
        self
    }

    pub fn with_get_delay(mut self, delay: Duration) -> Self {
        self.get_delay = Some(delay);
        self
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().ok().and_then(|objects| {
            objects
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, body)| body.clone())
        })
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_gets(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn insert(&self, key: &str, body: Vec<u8>) {
        if let Ok(mut objects) = self.objects.lock() {
            match objects.iter_mut().find(|(k, _)| k == key) {
                Some(existing) => existing.1 = body,
                None => objects.push((key.to_string(), body)),
            }
        }
    }

    async fn fetch(
        &self,
        key: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, StorageError> {
        if let Some(delay) = self.get_delay {
            tokio::time::sleep(delay).await;
        }
        if self.deny_reads {
            return Err(StorageError::Denied {
                status: 403,
                code: Some("AccessDenied".to_string()),
            });
        }
        let body = self.object(key).ok_or(StorageError::NotFound {
            code: Some("NoSuchKey".to_string()),
        })?;

        let cut = match self.get_failures.get(key) {
            Some(_) => body.len() / 2,
            None => body.len(),
        };
        sink.write_all(&body[..cut])
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        match self.get_failures.get(key) {
            Some(reason) => Err(StorageError::Transport(reason.clone())),
            None => Ok(cut as u64),
        }
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn list_objects(&self, _bucket: &str, _region: &str) -> Result<Listing, StorageError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        match &self.listing {
            ListingMode::Deny => Err(StorageError::Denied {
                status: 403,
                code: Some("AccessDenied".to_string()),
            }),
            ListingMode::Fail(reason) => Err(StorageError::Transport(reason.clone())),
            ListingMode::Allow => {
                let objects = self
                    .objects
                    .lock()
                    .map(|objects| {
                        objects
                            .iter()
                            .map(|(key, body)| ObjectDescriptor {
                                key: key.clone(),
                                size: body.len() as u64,
                                last_modified: None,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(Listing {
                    objects,
                    truncated: self.truncated,
                })
            }
        }
    }

    async fn get_object(
        &self,
        _bucket: &str,
        _region: &str,
        key: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, StorageError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = self.fetch(key, sink).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn put_object(
        &self,
        _bucket: &str,
        _region: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), StorageError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.deny_writes {
            return Err(StorageError::Denied {
                status: 403,
                code: Some("AccessDenied".to_string()),
            });
        }
        self.insert(key, body);
        Ok(())
    }
}
