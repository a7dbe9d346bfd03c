use std::fmt;

/// The kind of cloud instance a reverse DNS name points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceType {
    Unknown,
    ObjectStore,
    ObjectStoreWebsite,
    Compute,
}

impl InstanceType {
    /// Object-store flavours are the only ones the permission probes understand.
    pub fn is_storage(self) -> bool {
        matches!(self, Self::ObjectStore | Self::ObjectStoreWebsite)
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::ObjectStore => "s3 bucket",
            Self::ObjectStoreWebsite => "s3 website bucket",
            Self::Compute => "ec2 instance",
        };
        f.write_str(name)
    }
}

/// A classified instance. Construct it with [`ClassifiedInstance::new`] so the
/// region can never be attached to an `Unknown` instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedInstance {
    instance_type: InstanceType,
    region: Option<String>,
}

impl ClassifiedInstance {
    pub fn new(instance_type: InstanceType, region: Option<String>) -> Self {
        let region = match instance_type {
            InstanceType::Unknown => None,
            _ => region,
        };
        Self {
            instance_type,
            region,
        }
    }

    pub fn unknown() -> Self {
        Self::new(InstanceType::Unknown, None)
    }

    pub fn instance_type(&self) -> InstanceType {
        self.instance_type
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn is_known(&self) -> bool {
        self.instance_type != InstanceType::Unknown
    }

    /// Storage type and a region: everything the anonymous client needs.
    pub fn is_probeable(&self) -> bool {
        self.instance_type.is_storage() && self.region.is_some()
    }

    /// The region to probe with, if this instance is probeable at all.
    pub fn probe_region(&self) -> Option<&str> {
        if self.instance_type.is_storage() {
            self.region()
        } else {
            None
        }
    }
}

impl Default for ClassifiedInstance {
    fn default() -> Self {
        Self::unknown()
    }
}
