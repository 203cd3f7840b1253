//! Slipway - build orchestration for embedded native executables
//!
//! Slipway resolves a declarative build descriptor, drives an external
//! toolchain (Cargo or CMake, or a registered custom builder) to produce
//! standalone executables, copies them into the owning application's install
//! directory, and reports the source files whose modification should trigger
//! a rebuild.

pub mod accessor;
pub mod backend;
pub mod config;
pub mod descriptor;
pub mod pipeline;
pub mod platform;
pub mod runner;
pub mod util;

pub use accessor::{AccessorRegistry, ArtifactAccessor};
pub use backend::{Builder, BuilderRegistry, CMakeBuilder, CargoBuilder, TestResult, TestStatus};
pub use config::{ResolveContext, Resolver};
pub use descriptor::{BuildDescriptor, BuilderOptions, DescriptorOptions};
pub use pipeline::{Orchestration, Orchestrator, Outcome};
pub use runner::{RunOutcome, TestRunner, TestSummary};
