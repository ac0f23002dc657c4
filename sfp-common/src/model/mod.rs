// sfp-common/src/model/mod.rs
pub mod location;
pub mod manifest;
pub mod target;

// Re-export
pub use location::LocationRecord;
pub use manifest::{BuildEntry, BuildSpec, VersionManifest};
pub use target::{Arch, BuildTarget, Platform, TargetIdentity};
