//! Host platform detection and constraint matching.
//!
//! The running machine's OS and CPU architecture are normalized into a small
//! closed vocabulary; values outside it degrade to the `Unknown` sentinel
//! rather than failing. All functions here are pure reads of process state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Operating system vocabulary for platform constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Macos,
    Windows,
    Freebsd,
    Unknown,
}

impl Os {
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Macos => "macos",
            Os::Windows => "windows",
            Os::Freebsd => "freebsd",
            Os::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture vocabulary for platform constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    #[serde(rename = "x86_64")]
    X86_64,
    Arm64,
    Arm,
    Unknown,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Arm64 => "arm64",
            Arch::Arm => "arm",
            Arch::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn classify_os(raw: &str) -> Os {
    match raw {
        "linux" => Os::Linux,
        "macos" => Os::Macos,
        "windows" => Os::Windows,
        "freebsd" => Os::Freebsd,
        _ => Os::Unknown,
    }
}

/// Classify a raw architecture string by substring, case-insensitively.
fn classify_arch(raw: &str) -> Arch {
    let raw = raw.to_lowercase();
    if raw.contains("x86_64") || raw.contains("amd64") {
        Arch::X86_64
    } else if raw.contains("aarch64") || raw.contains("arm64") {
        Arch::Arm64
    } else if raw.contains("arm") {
        Arch::Arm
    } else {
        Arch::Unknown
    }
}

/// The operating system this process is running on.
pub fn current_os() -> Os {
    classify_os(std::env::consts::OS)
}

/// The CPU architecture this process is running on.
pub fn current_arch() -> Arch {
    classify_arch(std::env::consts::ARCH)
}

/// Evaluate constraint membership for the current platform.
///
/// An absent constraint leaves that axis unconstrained; present constraints
/// on both axes must each be satisfied (AND, never OR).
pub fn matches(os: Option<&[Os]>, arch: Option<&[Arch]>) -> bool {
    let os_ok = os.is_none_or(|set| set.contains(&current_os()));
    let arch_ok = arch.is_none_or(|set| set.contains(&current_arch()));
    os_ok && arch_ok
}

/// Render the current platform as `<os>/<arch>`.
pub fn describe() -> String {
    format!("{}/{}", current_os(), current_arch())
}

/// Render a constraint pair, each axis `any` when absent.
pub fn describe_constraints(os: Option<&[Os]>, arch: Option<&[Arch]>) -> String {
    fn axis<T: fmt::Display>(set: Option<&[T]>) -> String {
        match set {
            None => "any".to_string(),
            Some(values) => values
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    format!("{}/{}", axis(os), axis(arch))
}
