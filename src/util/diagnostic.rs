//! Structured error types.
//!
//! Configuration, validation, and build failures abort an orchestration run
//! and are surfaced as these types. Skips (unsupported platform, missing
//! source) and test failures are data, not errors; only the accessor layer
//! turns an unsupported platform into a caller-visible failure.

use miette::Diagnostic;
use thiserror::Error;

use crate::platform::{self, Arch, Os};

/// A required descriptor field was never set.
///
/// Reported for the first missing field in validation order:
/// `app`, then `builder`, then `binaries`.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("missing required build setting `{field}`")]
#[diagnostic(
    code(slipway::config::missing_field),
    help("set it in the declaration options or the environment-level defaults")
)]
pub struct ConfigError {
    pub field: &'static str,
}

/// Builder-specific options failed validation, before any process was spawned.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("invalid options for the `{builder}` builder: {reason}")]
#[diagnostic(code(slipway::config::invalid_options))]
pub struct ValidationError {
    pub builder: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(builder: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError {
            builder: builder.into(),
            reason: reason.into(),
        }
    }
}

/// No builder is registered under the requested selector tag.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("unknown builder `{selector}`")]
#[diagnostic(
    code(slipway::backend::unknown),
    help("built-in builders are `cargo` and `cmake`; anything else must be registered as a custom builder first")
)]
pub struct UnknownBuilderError {
    pub selector: String,
}

/// An external toolchain invocation exited non-zero during the build stage.
#[derive(Debug, Error, Diagnostic)]
#[error("`{command}` failed with exit code {code:?}\n{output}")]
#[diagnostic(code(slipway::backend::build_failed))]
pub struct BuildError {
    /// The command line that was run.
    pub command: String,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Combined stdout and stderr capture.
    pub output: String,
}

/// A binary path accessor was invoked on a platform the descriptor excludes.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("binary `{binary}` is unavailable on {current} (requires {required})")]
#[diagnostic(code(slipway::accessor::unsupported_platform))]
pub struct UnsupportedPlatformError {
    /// The binary name exactly as requested.
    pub binary: String,
    /// Rendered description of the running platform.
    pub current: String,
    /// Rendered description of the required platform constraints.
    pub required: String,
    pub required_os: Option<Vec<Os>>,
    pub required_arch: Option<Vec<Arch>>,
}

impl UnsupportedPlatformError {
    pub fn new(
        binary: impl Into<String>,
        required_os: Option<Vec<Os>>,
        required_arch: Option<Vec<Arch>>,
    ) -> Self {
        UnsupportedPlatformError {
            binary: binary.into(),
            current: platform::describe(),
            required: platform::describe_constraints(
                required_os.as_deref(),
                required_arch.as_deref(),
            ),
            required_os,
            required_arch,
        }
    }
}
