//! Build descriptors and their mergeable option layers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::platform::{Arch, Os};

/// Builder-specific options.
///
/// Typed with named fields rather than a free-form key/value bag so that a
/// misspelled option fails loudly instead of being silently dropped. The
/// orchestrator never interprets these; each builder validates the fields it
/// understands and rejects the ones it does not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuilderOptions {
    /// Cargo: override the directory the toolchain writes artifacts into.
    pub target_dir: Option<PathBuf>,

    /// Cargo: target triple for cross-compilation.
    pub target_triple: Option<String>,

    /// CMake: override the build directory.
    pub build_dir: Option<PathBuf>,

    /// CMake: build target; defaults to the first binary name.
    pub cmake_target: Option<String>,

    /// CMake: extra arguments appended to the configure step.
    pub cmake_args: Vec<String>,

    /// Extra arguments passed verbatim to the native test runner.
    pub test_args: Vec<String>,
}

impl BuilderOptions {
    /// Layer `other` on top of `self`, field by field. List fields are
    /// replaced wholesale when the later layer sets them; an empty list
    /// means unset.
    pub fn merge(self, other: BuilderOptions) -> BuilderOptions {
        fn pick(earlier: Vec<String>, later: Vec<String>) -> Vec<String> {
            if later.is_empty() {
                earlier
            } else {
                later
            }
        }

        BuilderOptions {
            target_dir: other.target_dir.or(self.target_dir),
            target_triple: other.target_triple.or(self.target_triple),
            build_dir: other.build_dir.or(self.build_dir),
            cmake_target: other.cmake_target.or(self.cmake_target),
            cmake_args: pick(self.cmake_args, other.cmake_args),
            test_args: pick(self.test_args, other.test_args),
        }
    }
}

/// A fully resolved build unit.
///
/// Produced by [`crate::config::Resolver`] and then treated as frozen: the
/// pipeline returns a new value with the derived fields
/// (`platform_supported`, `resources`) filled in, it never mutates a shared
/// instance.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildDescriptor {
    /// Owning application identifier.
    pub app: String,

    /// Builder selector tag (`cargo`, `cmake`, or a registered custom tag).
    pub builder: String,

    /// Directory holding the native project.
    pub source_path: PathBuf,

    /// Well-known location the built binaries are copied into.
    pub install_dir: PathBuf,

    /// Binary names the build is expected to produce. Non-empty.
    pub binaries: Vec<String>,

    /// Build profile; `release` maps to the toolchains' release modes,
    /// anything else builds in debug mode.
    pub profile: String,

    /// Environment variable overrides for toolchain invocations.
    pub env: Vec<(String, String)>,

    /// Builder-specific options, opaque to the orchestrator.
    pub options: BuilderOptions,

    /// Allowed operating systems; `None` means any.
    pub os_constraint: Option<Vec<Os>>,

    /// Allowed architectures; `None` means any.
    pub arch_constraint: Option<Vec<Arch>>,

    /// Skip the build step and only copy whatever artifacts already exist.
    pub skip_compilation: bool,

    /// Derived: computed once during orchestration, never recomputed.
    pub platform_supported: bool,

    /// Derived: files whose modification should trigger a rebuild.
    pub resources: Vec<PathBuf>,
}

impl BuildDescriptor {
    pub fn release(&self) -> bool {
        self.profile == "release"
    }
}

/// One layer of descriptor options.
///
/// Every field is optional so layers can be merged field-by-field, later
/// layers winning. Two layers feed a resolution: environment-level defaults,
/// then the explicit per-declaration options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DescriptorOptions {
    pub app: Option<String>,
    pub builder: Option<String>,
    pub source_path: Option<PathBuf>,
    pub install_dir: Option<PathBuf>,
    pub binaries: Option<Vec<String>>,
    pub profile: Option<String>,
    pub env: Option<Vec<(String, String)>>,
    pub options: Option<BuilderOptions>,
    pub os: Option<Vec<Os>>,
    pub arch: Option<Vec<Arch>>,
    pub skip_compilation: Option<bool>,
}

impl DescriptorOptions {
    /// Layer `other` on top of `self`; fields set in `other` win.
    ///
    /// The `options` bag merges field by field so an explicit layer that sets
    /// one builder option keeps the rest of the defaults. `env` pairs
    /// concatenate in layer order; later pairs override earlier ones when the
    /// variables are applied to a child process.
    pub fn merge(self, other: DescriptorOptions) -> DescriptorOptions {
        DescriptorOptions {
            app: other.app.or(self.app),
            builder: other.builder.or(self.builder),
            source_path: other.source_path.or(self.source_path),
            install_dir: other.install_dir.or(self.install_dir),
            binaries: other.binaries.or(self.binaries),
            profile: other.profile.or(self.profile),
            env: match (self.env, other.env) {
                (Some(mut earlier), Some(later)) => {
                    earlier.extend(later);
                    Some(earlier)
                }
                (earlier, later) => later.or(earlier),
            },
            options: match (self.options, other.options) {
                (Some(earlier), Some(later)) => Some(earlier.merge(later)),
                (earlier, later) => later.or(earlier),
            },
            os: other.os.or(self.os),
            arch: other.arch.or(self.arch),
            skip_compilation: other.skip_compilation.or(self.skip_compilation),
        }
    }

    /// Parse a declarative option layer from TOML text.
    ///
    /// Unknown keys are rejected so configuration typos surface immediately.
    pub fn from_toml_str(text: &str) -> Result<DescriptorOptions> {
        toml::from_str(text).context("failed to parse descriptor options")
    }
}
