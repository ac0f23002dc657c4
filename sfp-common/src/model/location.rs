// sfp-common/src/model/location.rs
use serde::{Deserialize, Serialize};

use super::target::TargetIdentity;

/// Where a resolved binary lives, plus the target it was resolved for.
///
/// `location` is either absolute or relative to the directory holding the
/// record file. Records written for a target whose names are not plain
/// alphanumerics carry no platform/architecture and never match a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub location: String,
    pub platform: Option<String>,
    pub architecture: Option<String>,
}

impl LocationRecord {
    pub fn for_target(location: impl Into<String>, target: &TargetIdentity) -> Self {
        Self {
            location: location.into(),
            platform: Some(target.platform.to_string()),
            architecture: Some(target.architecture.to_string()),
        }
    }

    pub fn matches_target(&self, target: &TargetIdentity) -> bool {
        self.platform.as_deref() == Some(target.platform.as_str())
            && self.architecture.as_deref() == Some(target.architecture.as_str())
    }
}
