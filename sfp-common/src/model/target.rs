// sfp-common/src/model/target.rs
//! Platform and architecture naming.
//!
//! Names follow the node conventions (`linux`, `darwin`, `win32`; `x64`,
//! `ia32`, `arm64`) because that is what npm exposes to install scripts and
//! what location records written by earlier installers contain.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Linux,
    Darwin,
    Win32,
    Other(String),
}

impl Platform {
    pub fn from_name(name: &str) -> Self {
        match name {
            "linux" => Platform::Linux,
            "darwin" => Platform::Darwin,
            "win32" => Platform::Win32,
            other => Platform::Other(other.to_string()),
        }
    }

    /// The platform this binary was compiled for, in node naming.
    pub fn host() -> Self {
        match std::env::consts::OS {
            "macos" => Platform::Darwin,
            "windows" => Platform::Win32,
            other => Platform::from_name(other),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
            Platform::Win32 => "win32",
            Platform::Other(name) => name,
        }
    }
}

impl From<String> for Platform {
    fn from(value: String) -> Self {
        Platform::from_name(&value)
    }
}

impl From<Platform> for String {
    fn from(value: Platform) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Arch {
    X64,
    Ia32,
    Arm64,
    Other(String),
}

impl Arch {
    pub fn from_name(name: &str) -> Self {
        match name {
            "x64" => Arch::X64,
            "ia32" => Arch::Ia32,
            "arm64" => Arch::Arm64,
            other => Arch::Other(other.to_string()),
        }
    }

    pub fn host() -> Self {
        match std::env::consts::ARCH {
            "x86_64" => Arch::X64,
            "x86" => Arch::Ia32,
            "aarch64" => Arch::Arm64,
            other => Arch::from_name(other),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Arch::X64 => "x64",
            Arch::Ia32 => "ia32",
            Arch::Arm64 => "arm64",
            Arch::Other(name) => name,
        }
    }
}

impl From<String> for Arch {
    fn from(value: String) -> Self {
        Arch::from_name(&value)
    }
}

impl From<Arch> for String {
    fn from(value: Arch) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The platform/architecture pair a run installs for. Computed once per run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetIdentity {
    pub platform: Platform,
    pub architecture: Arch,
}

impl TargetIdentity {
    pub fn new(platform: Platform, architecture: Arch) -> Self {
        Self {
            platform,
            architecture,
        }
    }

    pub fn host() -> Self {
        Self::new(Platform::host(), Arch::host())
    }

    /// Applies the optional overrides on top of the host identity. Empty
    /// strings count as unset.
    pub fn from_overrides(platform: Option<&str>, arch: Option<&str>) -> Self {
        let platform = platform
            .filter(|s| !s.is_empty())
            .map(Platform::from_name)
            .unwrap_or_else(Platform::host);
        let architecture = arch
            .filter(|s| !s.is_empty())
            .map(Arch::from_name)
            .unwrap_or_else(Arch::host);
        Self::new(platform, architecture)
    }

    /// True when installing for the machine we are running on. Cross-target
    /// installs must not trust binaries found on the local PATH.
    pub fn is_host(&self) -> bool {
        *self == Self::host()
    }

    /// Targets that ship a post-install shell script.
    pub fn is_posix(&self) -> bool {
        matches!(self.platform, Platform::Linux | Platform::Darwin)
    }

    pub fn is_windows(&self) -> bool {
        self.platform == Platform::Win32
    }

    pub fn build_target(&self) -> Option<BuildTarget> {
        match (&self.platform, &self.architecture) {
            (Platform::Linux, Arch::X64) => Some(BuildTarget::LinuxAmd64),
            (Platform::Linux, Arch::Ia32) => Some(BuildTarget::Linux386),
            (Platform::Darwin, _) => Some(BuildTarget::DarwinAmd64),
            (Platform::Win32, Arch::X64) => Some(BuildTarget::WindowsAmd64),
            (Platform::Win32, Arch::Ia32) => Some(BuildTarget::Windows386),
            _ => None,
        }
    }
}

impl fmt::Display for TargetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.platform, self.architecture)
    }
}

/// Build names used as keys in the version manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildTarget {
    LinuxAmd64,
    Linux386,
    DarwinAmd64,
    WindowsAmd64,
    Windows386,
}

impl BuildTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildTarget::LinuxAmd64 => "linux-amd64",
            BuildTarget::Linux386 => "linux-386",
            BuildTarget::DarwinAmd64 => "darwin-amd64",
            BuildTarget::WindowsAmd64 => "windows-amd64",
            BuildTarget::Windows386 => "windows-386",
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
