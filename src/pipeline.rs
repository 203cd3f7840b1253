//! The build orchestration pipeline.
//!
//! One strictly sequential pass per descriptor: resolve, gate on platform,
//! validate builder options, locate sources, build, copy artifacts, discover
//! resources. Configuration, validation, and build failures abort the run;
//! an unsupported platform or a missing source directory is a graceful skip
//! recorded in the outcome, never an error.

use anyhow::Result;

use crate::backend::BuilderRegistry;
use crate::config::{ResolveContext, Resolver};
use crate::descriptor::{BuildDescriptor, DescriptorOptions};
use crate::platform;
use crate::util::fs::install_binary;

/// Terminal state of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Built (or copy-only), copied, and resources discovered.
    Completed,
    /// Current platform fails the descriptor's constraints; nothing ran.
    SkippedUnsupportedPlatform,
    /// The source directory does not exist; nothing was built.
    SkippedMissingSource,
}

/// A finalized pipeline run: the frozen descriptor with its derived fields
/// set, plus the terminal outcome.
#[derive(Debug, Clone)]
pub struct Orchestration {
    pub descriptor: BuildDescriptor,
    pub outcome: Outcome,
}

impl Orchestration {
    pub fn completed(&self) -> bool {
        self.outcome == Outcome::Completed
    }
}

/// Sequences the pipeline stages over one descriptor at a time.
pub struct Orchestrator<'r> {
    registry: &'r BuilderRegistry,
}

impl<'r> Orchestrator<'r> {
    pub fn new(registry: &'r BuilderRegistry) -> Self {
        Orchestrator { registry }
    }

    /// Resolve the option layers for `app` and run the pipeline.
    pub fn run(
        &self,
        app: &str,
        ctx: ResolveContext,
        defaults: &DescriptorOptions,
        explicit: &DescriptorOptions,
    ) -> Result<Orchestration> {
        let resolver = Resolver::new(self.registry, ctx);
        let descriptor = resolver.resolve(app, defaults, explicit)?;
        self.run_resolved(descriptor)
    }

    /// Run the pipeline stages after configuration resolution.
    pub fn run_resolved(&self, mut desc: BuildDescriptor) -> Result<Orchestration> {
        // Computed exactly once, here; the descriptor is frozen afterwards.
        desc.platform_supported = platform::matches(
            desc.os_constraint.as_deref(),
            desc.arch_constraint.as_deref(),
        );
        if !desc.platform_supported {
            tracing::info!(
                "skipping `{}`: current platform {} does not satisfy {}",
                desc.app,
                platform::describe(),
                platform::describe_constraints(
                    desc.os_constraint.as_deref(),
                    desc.arch_constraint.as_deref(),
                ),
            );
            desc.resources = Vec::new();
            return Ok(Orchestration {
                descriptor: desc,
                outcome: Outcome::SkippedUnsupportedPlatform,
            });
        }

        let builder = self.registry.resolve(&desc.builder)?;
        builder.validate_options(&desc.options)?;

        if !desc.source_path.is_dir() {
            tracing::info!(
                "skipping `{}`: source directory {} does not exist",
                desc.app,
                desc.source_path.display(),
            );
            desc.resources = Vec::new();
            return Ok(Orchestration {
                descriptor: desc,
                outcome: Outcome::SkippedMissingSource,
            });
        }

        if desc.skip_compilation {
            tracing::info!("compilation disabled for `{}`; copying existing artifacts", desc.app);
        } else {
            builder.build(&desc)?;
        }

        for (name, built) in builder.binary_paths(&desc) {
            let file_name = built
                .file_name()
                .map(|f| f.to_os_string())
                .unwrap_or_else(|| name.clone().into());
            let dest = desc.install_dir.join(file_name);
            if install_binary(&built, &dest)? {
                tracing::info!("installed `{}` -> {}", name, dest.display());
            }
        }

        desc.resources = builder.discover_resources(&desc)?;

        Ok(Orchestration {
            descriptor: desc,
            outcome: Outcome::Completed,
        })
    }
}
