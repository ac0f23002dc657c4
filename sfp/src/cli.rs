// sfp/src/cli.rs
//! Defines the command-line argument structure using clap.
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use sfp_common::model::TargetIdentity;
use sfp_common::Config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "sfp", bin_name = "sfp")]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Package root to install into (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub package_dir: Option<PathBuf>,

    /// Target platform, node naming (linux, darwin, win32)
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<String>,

    /// Target architecture, node naming (x64, ia32, arm64)
    #[arg(long, value_name = "ARCH")]
    pub arch: Option<String>,

    /// Disable the download progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Print the recorded sfdx path of an installed package and exit
    #[arg(long)]
    pub print_path: bool,
}

impl CliArgs {
    /// Layers the flags over an environment-derived configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.package_dir {
            config.package_dir = dir.clone();
        }
        if self.platform.is_some() || self.arch.is_some() {
            let platform = self
                .platform
                .clone()
                .unwrap_or_else(|| config.target.platform.to_string());
            let arch = self
                .arch
                .clone()
                .unwrap_or_else(|| config.target.architecture.to_string());
            config.target = TargetIdentity::from_overrides(Some(&platform), Some(&arch));
        }
        if self.no_progress {
            config.show_progress = false;
        }
    }
}
