//! The object-store protocol collaborator.
//!
//! [`ObjectStore`] is the only capability the probes need: list the first page
//! of a bucket, stream one object out, write one object. [`AnonymousS3Client`]
//! implements it with plain unsigned HTTPS requests against the provider's
//! path-style REST endpoint (`https://s3.<region>.amazonaws.com/<bucket>`).

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use bucketscout_common::error::StorageError;
use bucketscout_common::model::probe::{Listing, ObjectDescriptor};
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::{Client, StatusCode, Url};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

const USER_AGENT: &str = concat!("bucketscout/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// First page of the bucket index, in the provider's order.
    async fn list_objects(&self, bucket: &str, region: &str) -> Result<Listing, StorageError>;

    /// Streams the object body into `sink` and returns the number of bytes
    /// written. Bodies are never held in memory whole.
    async fn get_object(
        &self,
        bucket: &str,
        region: &str,
        key: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, StorageError>;

    async fn put_object(
        &self,
        bucket: &str,
        region: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), StorageError>;
}

pub struct AnonymousS3Client {
    http: Client,
    /// Fixed endpoint for S3-compatible services; the regional endpoint otherwise.
    endpoint: Option<Url>,
}

impl AnonymousS3Client {
    pub fn new(request_timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: None,
        })
    }

    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    fn bucket_url(&self, bucket: &str, region: &str) -> Result<Url, StorageError> {
        let mut url = match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => Url::parse(&format!("https://s3.{region}.amazonaws.com/"))
                .map_err(|e| StorageError::Protocol(format!("bad endpoint for {region}: {e}")))?,
        };
        url.path_segments_mut()
            .map_err(|_| StorageError::Protocol("endpoint cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(bucket);
        Ok(url)
    }

    fn object_url(&self, bucket: &str, region: &str, key: &str) -> Result<Url, StorageError> {
        let mut url = self.bucket_url(bucket, region)?;
        url.path_segments_mut()
            .map_err(|_| StorageError::Protocol("endpoint cannot carry a path".to_string()))?
            .extend(key.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for AnonymousS3Client {
    async fn list_objects(&self, bucket: &str, region: &str) -> Result<Listing, StorageError> {
        let mut url = self.bucket_url(bucket, region)?;
        url.query_pairs_mut().append_pair("list-type", "2");
        debug!("GET {url}");

        let response = self.http.get(url).send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        parse_listing(&body)
    }

    async fn get_object(
        &self,
        bucket: &str,
        region: &str,
        key: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, StorageError> {
        let url = self.object_url(bucket, region, key)?;
        debug!("GET {url}");

        let mut response = self.http.get(url).send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
            sink.write_all(&chunk)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
            written += chunk.len() as u64;
        }
        Ok(written)
    }

    async fn put_object(
        &self,
        bucket: &str,
        region: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), StorageError> {
        let url = self.object_url(bucket, region, key)?;
        debug!("PUT {url}");

        let response = self
            .http
            .put(url)
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }
        Ok(())
    }
}

fn transport_error(err: reqwest::Error) -> StorageError {
    if err.is_timeout() {
        StorageError::Timeout
    } else {
        StorageError::Transport(err.to_string())
    }
}

/// Maps a non-success response onto a storage error, keeping the provider's
/// `<Code>` when the body has one.
pub fn status_error(status: StatusCode, body: &str) -> StorageError {
    let code = tag_text(body, &ERROR_CODE);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StorageError::Denied {
            status: status.as_u16(),
            code,
        },
        StatusCode::NOT_FOUND => StorageError::NotFound { code },
        _ => {
            let code = code.map(|c| format!(" {c}")).unwrap_or_default();
            StorageError::Protocol(format!("unexpected HTTP {}{code}", status.as_u16()))
        }
    }
}

static CONTENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<Contents>(.*?)</Contents>").expect("valid"));
static KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<Key>(.*?)</Key>").expect("valid"));
static SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Size>\s*(\d+)\s*</Size>").expect("valid"));
static LAST_MODIFIED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<LastModified>(.*?)</LastModified>").expect("valid"));
static IS_TRUNCATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<IsTruncated>\s*true\s*</IsTruncated>").expect("valid"));
static ERROR_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Code>(.*?)</Code>").expect("valid"));
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(lt|gt|quot|apos|amp|#x[0-9a-fA-F]+|#[0-9]+);").expect("valid")
});

/// Extracts the object rows of a ListObjects(V2) response body.
pub fn parse_listing(body: &str) -> Result<Listing, StorageError> {
    if !body.contains("<ListBucketResult") {
        return Err(StorageError::Protocol(
            "response is not a bucket listing".to_string(),
        ));
    }

    let objects = CONTENTS
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .filter_map(|entry| parse_descriptor(entry.as_str()))
        .collect();

    Ok(Listing {
        objects,
        truncated: IS_TRUNCATED.is_match(body),
    })
}

fn parse_descriptor(entry: &str) -> Option<ObjectDescriptor> {
    let key = tag_text(entry, &KEY).map(|key| unescape_xml(&key))?;
    let size = tag_text(entry, &SIZE)
        .and_then(|size| size.parse::<u64>().ok())
        .unwrap_or(0);
    let last_modified = tag_text(entry, &LAST_MODIFIED)
        .and_then(|ts| DateTime::parse_from_rfc3339(ts.trim()).ok())
        .map(|ts| ts.with_timezone(&Utc));

    Some(ObjectDescriptor {
        key,
        size,
        last_modified,
    })
}

fn tag_text(body: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Decodes the predefined entities and numeric character references in one
/// pass, so `&amp;#13;` stays the literal text `&#13;`.
fn unescape_xml(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => entity
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .unwrap_or_else(|| entity[1..].parse::<u32>())
                    .ok()
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use bucketscout_common::config::DEFAULT_REQUEST_TIMEOUT;

    const LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>assets.example.com</Name>
  <KeyCount>3</KeyCount>
  <MaxKeys>1000</MaxKeys>
  <IsTruncated>true</IsTruncated>
  <Contents>
    <Key>index.html</Key>
    <LastModified>2023-05-14T09:21:33.000Z</LastModified>
    <Size>1024</Size>
  </Contents>
  <Contents><Key>css/site.css</Key><LastModified>2023-05-14T09:21:34.000Z</LastModified><Size>77</Size></Contents>
  <Contents>
    <Key>docs/Q&amp;A.txt</Key>
    <Size>5</Size>
  </Contents>
</ListBucketResult>"#;

    #[test]
    fn parses_listing_in_provider_order() {
        let listing = parse_listing(LISTING).unwrap();
        let keys: Vec<&str> = listing.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["index.html", "css/site.css", "docs/Q&A.txt"]);
        assert!(listing.truncated);

        let first = &listing.objects[0];
        assert_eq!(first.size, 1024);
        assert_eq!(
            first.last_modified,
            Some(Utc.with_ymd_and_hms(2023, 5, 14, 9, 21, 33).unwrap())
        );
        assert_eq!(listing.objects[2].last_modified, None);
    }

    #[test]
    fn empty_bucket_listing() {
        let body = r#"<ListBucketResult><Name>b</Name><IsTruncated>false</IsTruncated></ListBucketResult>"#;
        let listing = parse_listing(body).unwrap();
        assert!(listing.objects.is_empty());
        assert!(!listing.truncated);
    }

    #[test]
    fn rejects_non_listing_bodies() {
        let err = parse_listing("<html>hello</html>").unwrap_err();
        assert!(matches!(err, StorageError::Protocol(_)));
    }

    #[test]
    fn maps_status_codes() {
        let denied = status_error(
            StatusCode::FORBIDDEN,
            "<Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>",
        );
        assert_eq!(
            denied,
            StorageError::Denied {
                status: 403,
                code: Some("AccessDenied".into())
            }
        );

        let missing = status_error(
            StatusCode::NOT_FOUND,
            "<Error><Code>NoSuchBucket</Code></Error>",
        );
        assert_eq!(
            missing,
            StorageError::NotFound {
                code: Some("NoSuchBucket".into())
            }
        );

        let redirect = status_error(StatusCode::MOVED_PERMANENTLY, "");
        assert_eq!(
            redirect,
            StorageError::Protocol("unexpected HTTP 301".into())
        );
    }

    #[test]
    fn keys_decode_numeric_character_references() {
        assert_eq!(unescape_xml("line&#13;break&#x0A;"), "line\rbreak\n");
        assert_eq!(unescape_xml("Q&amp;A &lt;v2&gt;"), "Q&A <v2>");
        assert_eq!(unescape_xml("&amp;#13;"), "&#13;");
        assert_eq!(unescape_xml("&#xD800; &bogus;"), "&#xD800; &bogus;");

        let body = "<ListBucketResult><Contents><Key>logs/a&#13;b.txt</Key><Size>1</Size></Contents></ListBucketResult>";
        let listing = parse_listing(body).unwrap();
        assert_eq!(listing.objects[0].key, "logs/a\rb.txt");
    }

    #[test]
    fn builds_path_style_urls() {
        let client = AnonymousS3Client::new(DEFAULT_REQUEST_TIMEOUT).unwrap();
        let url = client.bucket_url("assets.example.com", "us-west-2").unwrap();
        assert_eq!(
            url.as_str(),
            "https://s3.us-west-2.amazonaws.com/assets.example.com"
        );

        let object = client
            .object_url("assets.example.com", "us-west-2", "docs/my file#1.txt")
            .unwrap();
        assert_eq!(
            object.as_str(),
            "https://s3.us-west-2.amazonaws.com/assets.example.com/docs/my%20file%231.txt"
        );
    }

    #[test]
    fn custom_endpoint_keeps_its_host() {
        let endpoint = Url::parse("http://127.0.0.1:9000").unwrap();
        let client = AnonymousS3Client::new(DEFAULT_REQUEST_TIMEOUT)
            .unwrap()
            .with_endpoint(endpoint);
        let url = client.object_url("bucket", "us-east-1", "a/b.txt").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/bucket/a/b.txt");
    }

    #[tokio::test]
    #[ignore]
    async fn anonymous_listing_against_public_bucket() {
        let client = AnonymousS3Client::new(DEFAULT_REQUEST_TIMEOUT).unwrap();
        let result = client.list_objects("commoncrawl", "us-east-1").await;
        assert!(result.is_ok() || matches!(result, Err(StorageError::Denied { .. })));
    }
}
