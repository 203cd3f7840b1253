//! Pluggable build backends.
//!
//! A [`Builder`] wraps one external toolchain behind a uniform contract:
//! where its sources conventionally live, how to validate its options, how
//! to run a build, where the produced binaries land, and which files should
//! trigger a rebuild when modified. Backends with a native test runner also
//! implement the paired test capability.

pub mod cargo;
pub mod cmake;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

pub use cargo::CargoBuilder;
pub use cmake::CMakeBuilder;

use crate::descriptor::{BuildDescriptor, BuilderOptions};
use crate::util::diagnostic::{UnknownBuilderError, ValidationError};
use crate::util::process::CommandOutput;

/// Status of one native test-runner invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Ok,
    Error,
}

/// The uniform record a builder's test capability returns.
///
/// A failing test run is data, not an error: the caller aggregates these and
/// decides severity.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub status: TestStatus,
    pub exit_code: Option<i32>,
    /// Combined stdout/stderr capture of the stage that produced the result.
    pub output: String,
}

impl TestResult {
    /// Classify a finished invocation: exit code zero is `Ok`, anything
    /// else is `Error`.
    pub fn from_output(out: CommandOutput) -> TestResult {
        TestResult {
            status: if out.success() {
                TestStatus::Ok
            } else {
                TestStatus::Error
            },
            exit_code: out.code(),
            output: out.output,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == TestStatus::Ok
    }
}

/// Interface every build backend implements.
pub trait Builder: Send + Sync {
    /// Conventional source directory, relative to the owning application root.
    fn default_source_path(&self) -> PathBuf;

    /// Reject malformed builder-specific options before anything is spawned.
    /// No I/O beyond simple checks.
    fn validate_options(&self, opts: &BuilderOptions) -> Result<(), ValidationError>;

    /// Invoke the external toolchain; blocks until it exits. A non-zero exit
    /// surfaces as a [`crate::util::diagnostic::BuildError`].
    fn build(&self, desc: &BuildDescriptor) -> Result<()>;

    /// Where each expected binary should land for this profile and option
    /// set, whether or not it has been built yet.
    fn binary_paths(&self, desc: &BuildDescriptor) -> BTreeMap<String, PathBuf>;

    /// Enumerate files whose modification should trigger a rebuild.
    fn discover_resources(&self, desc: &BuildDescriptor) -> Result<Vec<PathBuf>>;

    /// Whether the paired [`Builder::test`] operation is meaningful here.
    fn supports_test(&self) -> bool {
        false
    }

    /// Run the backend's native test runner. Must not assume a prior
    /// successful `build` for the main binaries.
    fn test(&self, desc: &BuildDescriptor) -> Result<TestResult> {
        anyhow::bail!(
            "the `{}` builder does not support running tests",
            desc.builder
        )
    }
}

impl std::fmt::Debug for dyn Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<dyn Builder>")
    }
}

/// Resolves builder selector tags to implementations.
///
/// `cargo` and `cmake` are built in. Any other tag must be registered as a
/// custom builder; nothing validates custom tags up front, an unregistered
/// tag only fails when a pipeline actually resolves it.
pub struct BuilderRegistry {
    builders: HashMap<String, Arc<dyn Builder>>,
}

impl BuilderRegistry {
    /// Create a registry with the built-in backends. No I/O or toolchain
    /// detection happens here.
    pub fn new() -> Self {
        let mut registry = BuilderRegistry {
            builders: HashMap::new(),
        };
        registry.register("cargo", Arc::new(CargoBuilder::new()));
        registry.register("cmake", Arc::new(CMakeBuilder::new()));
        registry
    }

    /// Register a builder under a selector tag, replacing any previous one.
    pub fn register(&mut self, tag: impl Into<String>, builder: Arc<dyn Builder>) {
        self.builders.insert(tag.into(), builder);
    }

    /// Resolve a selector tag.
    pub fn resolve(&self, selector: &str) -> Result<Arc<dyn Builder>, UnknownBuilderError> {
        self.builders
            .get(selector)
            .cloned()
            .ok_or_else(|| UnknownBuilderError {
                selector: selector.to_string(),
            })
    }

    pub fn contains(&self, selector: &str) -> bool {
        self.builders.contains_key(selector)
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
