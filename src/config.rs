//! Staged resolution of build descriptors.
//!
//! Two option layers feed a resolution: ambient environment-level defaults,
//! then the explicit per-declaration options, which always win on conflict.
//! The merged layer is validated, builder defaults are filled in, and the
//! result is a frozen [`BuildDescriptor`] ready for platform gating.

use std::env;
use std::path::PathBuf;

use anyhow::Result;

use crate::backend::BuilderRegistry;
use crate::descriptor::{BuildDescriptor, DescriptorOptions};
use crate::util::diagnostic::ConfigError;

/// Ambient context a resolution runs in.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// Root directory of the owning application. Builder-default source
    /// paths and the install dir default are resolved against it.
    pub app_root: PathBuf,

    /// Whether the ambient build environment signals a production build,
    /// which flips the default profile to `release`.
    pub production: bool,
}

impl ResolveContext {
    /// Build a context, reading the production signal from `SLIPWAY_ENV`.
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        ResolveContext {
            app_root: app_root.into(),
            production: production_from_env(),
        }
    }

    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }
}

fn production_from_env() -> bool {
    matches!(
        env::var("SLIPWAY_ENV").as_deref(),
        Ok("prod") | Ok("production")
    )
}

/// Produces one valid, fully-defaulted descriptor from the option layers.
pub struct Resolver<'r> {
    registry: &'r BuilderRegistry,
    ctx: ResolveContext,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r BuilderRegistry, ctx: ResolveContext) -> Self {
        Resolver { registry, ctx }
    }

    /// Merge, validate, and default-fill.
    ///
    /// The declared `app` identifier always overrides whatever the option
    /// layers carry. Validation reports the first missing field in the
    /// order `app`, `builder`, `binaries`.
    pub fn resolve(
        &self,
        app: &str,
        defaults: &DescriptorOptions,
        explicit: &DescriptorOptions,
    ) -> Result<BuildDescriptor> {
        let mut merged = defaults.clone().merge(explicit.clone());
        if !app.is_empty() {
            merged.app = Some(app.to_string());
        }

        let app = merged
            .app
            .filter(|a| !a.is_empty())
            .ok_or(ConfigError { field: "app" })?;
        let builder_tag = merged
            .builder
            .filter(|b| !b.is_empty())
            .ok_or(ConfigError { field: "builder" })?;
        let binaries = merged.binaries.unwrap_or_default();
        if binaries.is_empty() {
            return Err(ConfigError { field: "binaries" }.into());
        }

        let builder = self.registry.resolve(&builder_tag)?;

        let source_path = merged
            .source_path
            .unwrap_or_else(|| self.ctx.app_root.join(builder.default_source_path()));
        let install_dir = merged
            .install_dir
            .unwrap_or_else(|| self.ctx.app_root.join("priv").join(&app));
        let profile = merged.profile.unwrap_or_else(|| {
            if self.ctx.production {
                "release".to_string()
            } else {
                "debug".to_string()
            }
        });

        Ok(BuildDescriptor {
            app,
            builder: builder_tag,
            source_path,
            install_dir,
            binaries,
            profile,
            env: merged.env.unwrap_or_default(),
            options: merged.options.unwrap_or_default(),
            os_constraint: merged.os,
            arch_constraint: merged.arch,
            skip_compilation: merged.skip_compilation.unwrap_or(false),
            // Both derived fields are filled in by the pipeline.
            platform_supported: false,
            resources: Vec::new(),
        })
    }
}
