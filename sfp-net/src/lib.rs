// sfp-net/src/lib.rs
pub mod http;
pub mod manifest;
pub mod validation;

pub use http::{build_http_client, download_artifact, mask_proxy_url};
pub use manifest::ManifestFetcher;
pub use sfp_common::{
    error::{Result, SfpError},
    Config,
};
pub use validation::{checksum_matches, sha256_file, validate_url, verify_checksum};
