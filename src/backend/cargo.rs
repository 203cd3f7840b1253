//! Cargo build backend for Rust native projects.

use std::collections::BTreeMap;
use std::env;
use std::env::consts::EXE_SUFFIX;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::backend::{Builder, TestResult};
use crate::descriptor::{BuildDescriptor, BuilderOptions};
use crate::util::diagnostic::{BuildError, ValidationError};
use crate::util::process::{find_cargo, ProcessBuilder};

/// Build backend driving `cargo` for Rust projects.
pub struct CargoBuilder;

impl CargoBuilder {
    pub fn new() -> Self {
        CargoBuilder
    }

    /// Directory exported to the child as CARGO_TARGET_DIR. The default is
    /// derived from the owning application so two applications never share
    /// build state.
    fn target_dir(&self, desc: &BuildDescriptor) -> PathBuf {
        desc.options
            .target_dir
            .clone()
            .unwrap_or_else(|| desc.source_path.join("target").join(&desc.app))
    }

    /// Where the built binaries land:
    /// `<target_dir>[/<triple>]/<release|debug>`.
    fn output_dir(&self, desc: &BuildDescriptor) -> PathBuf {
        let mut dir = self.target_dir(desc);
        if let Some(triple) = &desc.options.target_triple {
            dir.push(triple);
        }
        dir.push(if desc.release() { "release" } else { "debug" });
        dir
    }

    fn build_args(desc: &BuildDescriptor) -> Vec<String> {
        let mut args = vec!["build".to_string()];
        if desc.release() {
            args.push("--release".to_string());
        }
        if let Some(triple) = &desc.options.target_triple {
            args.push("--target".to_string());
            args.push(triple.clone());
        }
        args
    }

    fn test_args(desc: &BuildDescriptor) -> Vec<String> {
        let mut args = vec!["test".to_string()];
        if let Some(triple) = &desc.options.target_triple {
            args.push("--target".to_string());
            args.push(triple.clone());
        }
        args.extend(desc.options.test_args.iter().cloned());
        args
    }

    /// Absolute form of the target dir for export across the process
    /// boundary. The child runs with `source_path` as its cwd, so a relative
    /// target dir must be anchored to the parent's cwd first or cargo would
    /// resolve it under the source tree, away from where
    /// [`Builder::binary_paths`] looks.
    fn exported_target_dir(&self, desc: &BuildDescriptor) -> Result<PathBuf> {
        let dir = self.target_dir(desc);
        if dir.is_absolute() {
            return Ok(dir);
        }
        let cwd = env::current_dir().context("failed to read the current directory")?;
        Ok(cwd.join(dir))
    }

    fn command(&self, desc: &BuildDescriptor, args: Vec<String>) -> Result<ProcessBuilder> {
        let cargo = find_cargo().context("cargo not found in PATH")?;
        let target_dir = self.exported_target_dir(desc)?;

        Ok(ProcessBuilder::new(cargo)
            .args(args)
            .cwd(&desc.source_path)
            .env("CARGO_TARGET_DIR", target_dir.to_string_lossy())
            .envs(&desc.env))
    }
}

impl Default for CargoBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder for CargoBuilder {
    fn default_source_path(&self) -> PathBuf {
        PathBuf::from("native")
    }

    fn validate_options(&self, opts: &BuilderOptions) -> Result<(), ValidationError> {
        if opts.build_dir.is_some() || opts.cmake_target.is_some() || !opts.cmake_args.is_empty() {
            return Err(ValidationError::new(
                "cargo",
                "cmake-only options (`build_dir`, `cmake_target`, `cmake_args`) are not accepted",
            ));
        }

        if matches!(&opts.target_triple, Some(t) if t.trim().is_empty()) {
            return Err(ValidationError::new("cargo", "`target_triple` is empty"));
        }

        Ok(())
    }

    fn build(&self, desc: &BuildDescriptor) -> Result<()> {
        let cmd = self.command(desc, Self::build_args(desc))?;
        tracing::info!("running `{}` in {}", cmd.display_command(), desc.source_path.display());

        let out = cmd.exec_combined()?;
        if !out.success() {
            return Err(BuildError {
                command: cmd.display_command(),
                code: out.code(),
                output: out.output,
            }
            .into());
        }

        tracing::debug!("{}", out.output);
        Ok(())
    }

    fn binary_paths(&self, desc: &BuildDescriptor) -> BTreeMap<String, PathBuf> {
        let out_dir = self.output_dir(desc);
        desc.binaries
            .iter()
            .map(|name| (name.clone(), out_dir.join(format!("{name}{EXE_SUFFIX}"))))
            .collect()
    }

    fn discover_resources(&self, desc: &BuildDescriptor) -> Result<Vec<PathBuf>> {
        let target_dir = self.target_dir(desc);
        let mut resources = Vec::new();

        let walk = WalkDir::new(&desc.source_path)
            .into_iter()
            .filter_entry(|e| !e.path().starts_with(&target_dir));
        for entry in walk {
            let entry = entry.with_context(|| {
                format!("failed to walk {}", desc.source_path.display())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let manifest = matches!(
                path.file_name().and_then(|n| n.to_str()),
                Some("Cargo.toml" | "Cargo.lock")
            );
            let rust_source = path.extension().is_some_and(|ext| ext == "rs");

            if manifest || rust_source {
                resources.push(path.to_path_buf());
            }
        }

        resources.sort();
        resources.dedup();
        Ok(resources)
    }

    fn supports_test(&self) -> bool {
        true
    }

    fn test(&self, desc: &BuildDescriptor) -> Result<TestResult> {
        let cmd = self.command(desc, Self::test_args(desc))?;
        tracing::info!("running `{}` in {}", cmd.display_command(), desc.source_path.display());

        let out = cmd.exec_combined()?;
        Ok(TestResult::from_output(out))
    }
}
