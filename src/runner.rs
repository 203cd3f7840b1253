//! Test-runner collaborator.
//!
//! Drives the optional test capability of each descriptor's builder and
//! aggregates the results. A failing native test run is counted, never
//! propagated as an error; deciding overall severity is the caller's job.

use anyhow::Result;

use crate::backend::{BuilderRegistry, TestResult};
use crate::descriptor::BuildDescriptor;

/// What happened for one descriptor.
#[derive(Debug)]
pub enum RunOutcome {
    Passed(TestResult),
    Failed(TestResult),
    /// The builder has no test capability.
    Skipped,
}

/// Aggregated counts across a set of descriptors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl TestSummary {
    pub fn record(&mut self, outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Passed(_) => self.passed += 1,
            RunOutcome::Failed(_) => self.failed += 1,
            RunOutcome::Skipped => self.skipped += 1,
        }
    }

    /// The run as a whole succeeded; skips are not failures.
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Runs native test suites for resolved descriptors.
pub struct TestRunner<'r> {
    registry: &'r BuilderRegistry,
}

impl<'r> TestRunner<'r> {
    pub fn new(registry: &'r BuilderRegistry) -> Self {
        TestRunner { registry }
    }

    /// Run one descriptor's native tests, if its builder has the capability.
    pub fn run(&self, desc: &BuildDescriptor) -> Result<RunOutcome> {
        let builder = self.registry.resolve(&desc.builder)?;

        if !builder.supports_test() {
            tracing::info!(
                "skipping `{}`: the `{}` builder has no test runner",
                desc.app,
                desc.builder,
            );
            return Ok(RunOutcome::Skipped);
        }

        let result = builder.test(desc)?;
        if result.passed() {
            Ok(RunOutcome::Passed(result))
        } else {
            tracing::warn!(
                "native tests for `{}` failed with exit code {:?}",
                desc.app,
                result.exit_code,
            );
            Ok(RunOutcome::Failed(result))
        }
    }

    /// Run every descriptor and aggregate pass/fail/skip counts.
    pub fn run_all(&self, descriptors: &[BuildDescriptor]) -> Result<TestSummary> {
        let mut summary = TestSummary::default();
        for desc in descriptors {
            summary.record(&self.run(desc)?);
        }
        Ok(summary)
    }
}
