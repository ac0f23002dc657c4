// sfp-core/src/lib.rs
pub mod install;
pub mod location_store;
pub mod locator;
pub mod resolver;
pub mod search_path;

pub use locator::{check_version, find_valid_binary, installed_binary};
pub use resolver::{InstallResolver, Resolution};
pub use sfp_common::error::{Result, SfpError};
pub use sfp_common::Config;
