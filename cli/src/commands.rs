use std::path::PathBuf;
use std::time::Duration;

use bucketscout_common::config::{
    DEFAULT_MAX_CONCURRENT_DOWNLOADS, DEFAULT_OUTPUT_DIR, DEFAULT_PROVIDER_SUFFIX,
    DOWNLOAD_SUBDIR, ProbeConfig, ScanConfig,
};
use bucketscout_common::model::target::Target;
use clap::{ArgAction, Parser};

pub const LOG_FILE_NAME: &str = "bucketscout.log";

#[derive(Parser, Debug)]
#[command(name = "bucketscout")]
#[command(version, about = "Checks what an anonymous client may do with a storage bucket.")]
pub struct CommandLine {
    /// Domain or URL served by the bucket
    #[arg(short, long, value_name = "TARGET")]
    pub domain: Target,

    /// Try to list the bucket contents
    #[arg(short, long)]
    pub list: bool,

    /// Try to download every listed object
    #[arg(long)]
    pub download: bool,

    /// Try to upload this file to the bucket
    #[arg(short, long, value_name = "FILE")]
    pub upload: Option<PathBuf>,

    /// List and download; also upload when --upload is given
    #[arg(short, long)]
    pub all: bool,

    /// Directory for downloads and the log file
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Maximum number of concurrent downloads
    #[arg(short, long, value_name = "N", default_value_t = DEFAULT_MAX_CONCURRENT_DOWNLOADS)]
    pub jobs: usize,

    /// Timeout for each DNS lookup, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 5)]
    pub dns_timeout: u64,

    /// Timeout for each storage request, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Domain suffix of the storage provider's reverse DNS names
    #[arg(long, value_name = "SUFFIX", default_value = DEFAULT_PROVIDER_SUFFIX)]
    pub provider_suffix: String,

    /// Less output (-q hides headers, -qq hides the object table)
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Do not write a log file into the output directory
    #[arg(long)]
    pub no_log_file: bool,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn to_scan_config(&self) -> ScanConfig {
        ScanConfig {
            probe: ProbeConfig {
                attempt_listing: self.list || self.all,
                attempt_download: self.download || self.all,
                attempt_upload: self.upload.clone(),
                download_destination_dir: self.output_dir.join(DOWNLOAD_SUBDIR),
                max_concurrent_downloads: self.jobs,
            },
            dns_timeout: Duration::from_secs(self.dns_timeout),
            request_timeout: Duration::from_secs(self.timeout),
            provider_suffix: self.provider_suffix.clone(),
        }
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        (!self.no_log_file).then(|| self.output_dir.join(LOG_FILE_NAME))
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
