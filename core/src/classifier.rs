//! Maps a reverse DNS name onto the provider's instance types.
//!
//! The provider publishes PTR records that follow fixed naming conventions, e.g.
//!
//! | reverse name                                     | instance             |
//! |--------------------------------------------------|----------------------|
//! | `s3-website-us-west-2.amazonaws.com`             | website bucket       |
//! | `s3-website.eu-west-1.amazonaws.com`             | website bucket       |
//! | `s3-us-west-2-w.amazonaws.com`                   | bucket               |
//! | `s3.eu-central-1.amazonaws.com`                  | bucket               |
//! | `ec2-54-1-2-3.us-west-2.compute.amazonaws.com`   | compute instance     |
//!
//! Rules are tried in order, most specific first, and the first match wins.
//! Classification looks at nothing but the name: no I/O, no scheme hints.

use std::sync::LazyLock;

use bucketscout_common::config::{DEFAULT_PROVIDER_SUFFIX, validate_suffix};
use bucketscout_common::error::ConfigError;
use bucketscout_common::model::host::ResolvedHost;
use bucketscout_common::model::instance::{ClassifiedInstance, InstanceType};
use regex::Regex;

use crate::resolver::normalize_name;

/// Two hyphen-joined words and a digit (`us-west-2`), delimited by label or
/// token boundaries.
static REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[.-])([a-z]+-[a-z]+-\d)(?:$|[.-])").expect("region pattern is valid")
});

struct Rule {
    instance_type: InstanceType,
    pattern: Regex,
}

pub struct InstanceClassifier {
    rules: Vec<Rule>,
}

impl InstanceClassifier {
    /// Builds the rule table for names ending in `suffix`.
    pub fn for_suffix(suffix: &str) -> Result<Self, ConfigError> {
        validate_suffix(suffix)?;
        let suffix = regex::escape(&suffix.to_ascii_lowercase());

        let table = [
            (
                InstanceType::ObjectStoreWebsite,
                format!(r"^(?:[a-z0-9-]+\.)*s3-website[.-][a-z0-9.-]*\.{suffix}$"),
            ),
            (
                InstanceType::ObjectStore,
                format!(r"^(?:[a-z0-9-]+\.)*s3(?:[.-][a-z0-9-]+)*\.{suffix}$"),
            ),
            (
                InstanceType::Compute,
                format!(
                    r"^ec2-\d{{1,3}}(?:-\d{{1,3}}){{3}}\.(?:[a-z0-9-]+\.)?compute(?:-\d+)?\.{suffix}$"
                ),
            ),
        ];

        let rules = table
            .into_iter()
            .map(|(instance_type, pattern)| {
                Regex::new(&pattern)
                    .map(|pattern| Rule {
                        instance_type,
                        pattern,
                    })
                    .map_err(|e| ConfigError::InvalidProviderSuffix(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    pub fn classify(&self, resolved: &ResolvedHost) -> ClassifiedInstance {
        match resolved.reverse_name.as_deref() {
            Some(name) => self.classify_name(name),
            None => ClassifiedInstance::unknown(),
        }
    }

    pub fn classify_name(&self, name: &str) -> ClassifiedInstance {
        let name = normalize_name(name);
        let instance_type = self
            .rules
            .iter()
            .find(|rule| rule.pattern.is_match(&name))
            .map(|rule| rule.instance_type)
            .unwrap_or(InstanceType::Unknown);

        match instance_type {
            InstanceType::Unknown => ClassifiedInstance::unknown(),
            _ => ClassifiedInstance::new(instance_type, extract_region(&name)),
        }
    }
}

impl Default for InstanceClassifier {
    fn default() -> Self {
        Self::for_suffix(DEFAULT_PROVIDER_SUFFIX).expect("default provider suffix is valid")
    }
}

pub fn extract_region(name: &str) -> Option<String> {
    REGION
        .captures(&name.to_ascii_lowercase())
        .and_then(|caps| caps.get(1))
        .map(|region| region.as_str().to_string())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
