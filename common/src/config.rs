use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_OUTPUT_DIR: &str = "enum_aws_output";
/// Downloads land in this directory beneath the output directory.
pub const DOWNLOAD_SUBDIR: &str = "s3_download";
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 4;
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PROVIDER_SUFFIX: &str = "amazonaws.com";

/// Which anonymous probes to run and where their side effects go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub attempt_listing: bool,
    /// Downloading needs the listing, so this implies `attempt_listing`.
    pub attempt_download: bool,
    /// Local file to write to the bucket under its own file name.
    pub attempt_upload: Option<PathBuf>,
    pub download_destination_dir: PathBuf,
    pub max_concurrent_downloads: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            attempt_listing: false,
            attempt_download: false,
            attempt_upload: None,
            download_destination_dir: Path::new(DEFAULT_OUTPUT_DIR).join(DOWNLOAD_SUBDIR),
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
        }
    }
}

impl ProbeConfig {
    /// Listing and download, plus upload when a file is given.
    pub fn all(upload: Option<PathBuf>) -> Self {
        Self {
            attempt_listing: true,
            attempt_download: true,
            attempt_upload: upload,
            ..Self::default()
        }
    }

    pub fn wants_listing(&self) -> bool {
        self.attempt_listing || self.attempt_download
    }

    pub fn wants_any(&self) -> bool {
        self.wants_listing() || self.attempt_upload.is_some()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_downloads == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        if let Some(path) = &self.attempt_upload {
            let file = File::open(path).map_err(|source| ConfigError::UploadUnreadable {
                path: path.clone(),
                source,
            })?;
            let metadata = file
                .metadata()
                .map_err(|source| ConfigError::UploadUnreadable {
                    path: path.clone(),
                    source,
                })?;
            if !metadata.is_file() {
                return Err(ConfigError::UploadNotAFile(path.clone()));
            }
        }

        Ok(())
    }
}

/// Everything needed to assemble the default scanner: the probe selection plus
/// the knobs of the DNS and storage collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub probe: ProbeConfig,
    pub dns_timeout: Duration,
    pub request_timeout: Duration,
    /// Domain the provider's reverse DNS names end in.
    pub provider_suffix: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            probe: ProbeConfig::default(),
            dns_timeout: DEFAULT_DNS_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            provider_suffix: DEFAULT_PROVIDER_SUFFIX.to_string(),
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dns_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("dns"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("request"));
        }
        validate_suffix(&self.provider_suffix)?;
        self.probe.validate()
    }
}

pub fn validate_suffix(suffix: &str) -> Result<(), ConfigError> {
    let valid = !suffix.is_empty()
        && suffix.split('.').all(|label| {
            !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });

    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidProviderSuffix(suffix.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = ScanConfig::default();
        assert_eq!(cfg.dns_timeout, Duration::from_secs(5));
        assert_eq!(cfg.provider_suffix, "amazonaws.com");
        assert_eq!(
            cfg.probe.download_destination_dir,
            PathBuf::from("enum_aws_output/s3_download")
        );
        assert!(!cfg.probe.wants_any());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_download_implies_listing() {
        let cfg = ProbeConfig {
            attempt_download: true,
            ..ProbeConfig::default()
        };
        assert!(cfg.wants_listing());
        assert!(cfg.wants_any());
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let cfg = ProbeConfig {
            max_concurrent_downloads: 0,
            ..ProbeConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroConcurrency)));
    }

    #[test]
    fn test_upload_file_must_be_readable_file() {
        let missing = ProbeConfig::all(Some(PathBuf::from("/definitely/not/here.txt")));
        assert!(matches!(
            missing.validate(),
            Err(ConfigError::UploadUnreadable { .. })
        ));

        let dir = tempfile::tempdir().unwrap();
        let directory = ProbeConfig::all(Some(dir.path().to_path_buf()));
        assert!(matches!(
            directory.validate(),
            Err(ConfigError::UploadNotAFile(_))
        ));

        let path = dir.path().join("notes.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "probe").unwrap();
        let ok = ProbeConfig::all(Some(path));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_suffix_validation() {
        assert!(validate_suffix("amazonaws.com").is_ok());
        assert!(validate_suffix("example-provider.com").is_ok());
        assert!(validate_suffix("").is_err());
        assert!(validate_suffix("bad..com").is_err());
        assert!(validate_suffix("a*b.com").is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let cfg = ScanConfig {
            dns_timeout: Duration::ZERO,
            ..ScanConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroTimeout("dns"))));
    }
}
