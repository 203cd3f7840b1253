//! CMake build backend for C/C++ native projects.

use std::collections::BTreeMap;
use std::env::consts::EXE_SUFFIX;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::backend::{Builder, TestResult};
use crate::descriptor::{BuildDescriptor, BuilderOptions};
use crate::util::diagnostic::{BuildError, ValidationError};
use crate::util::fs::ensure_dir;
use crate::util::process::{find_cmake, find_ctest, ProcessBuilder};

/// File extensions treated as C/C++ sources and headers during resource
/// discovery.
const SOURCE_EXTENSIONS: &[&str] = &["c", "h", "cc", "hh", "cpp", "hpp", "cxx", "hxx"];

/// Build backend driving `cmake` (and `ctest`) for C/C++ projects.
pub struct CMakeBuilder;

impl CMakeBuilder {
    pub fn new() -> Self {
        CMakeBuilder
    }

    /// Build directory for normal builds; the default is derived from the
    /// owning application.
    fn build_dir(&self, desc: &BuildDescriptor) -> PathBuf {
        desc.options
            .build_dir
            .clone()
            .unwrap_or_else(|| desc.source_path.join("build").join(&desc.app))
    }

    /// Separate directory for test builds, so BUILD_TESTING never leaks
    /// into the configure cache of the normal build.
    fn test_build_dir(&self, desc: &BuildDescriptor) -> PathBuf {
        let mut dir = self.build_dir(desc).into_os_string();
        dir.push("-test");
        PathBuf::from(dir)
    }

    fn build_type(desc: &BuildDescriptor) -> &'static str {
        if desc.release() {
            "Release"
        } else {
            "Debug"
        }
    }

    fn configure_args(desc: &BuildDescriptor, build_dir: &Path, testing: bool) -> Vec<String> {
        let mut args = vec![
            "-S".to_string(),
            desc.source_path.to_string_lossy().into_owned(),
            "-B".to_string(),
            build_dir.to_string_lossy().into_owned(),
            format!("-DCMAKE_BUILD_TYPE={}", Self::build_type(desc)),
        ];
        if testing {
            args.push("-DBUILD_TESTING=ON".to_string());
        }
        args.extend(desc.options.cmake_args.iter().cloned());
        args
    }

    fn compile_args(desc: &BuildDescriptor, build_dir: &Path, target: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "--build".to_string(),
            build_dir.to_string_lossy().into_owned(),
        ];
        if let Some(target) = target {
            args.push("--target".to_string());
            args.push(target.to_string());
        }
        if desc.release() {
            args.push("--config".to_string());
            args.push("Release".to_string());
        }
        args
    }

    /// Build target: the explicit option, else the first binary name.
    fn target(desc: &BuildDescriptor) -> Option<String> {
        desc.options
            .cmake_target
            .clone()
            .or_else(|| desc.binaries.first().cloned())
    }

    fn cmake_command(desc: &BuildDescriptor, args: Vec<String>) -> Result<ProcessBuilder> {
        let cmake = find_cmake().context("cmake not found in PATH")?;
        Ok(ProcessBuilder::new(cmake).args(args).envs(&desc.env))
    }

    fn run_stage(cmd: &ProcessBuilder) -> Result<()> {
        tracing::info!("running `{}`", cmd.display_command());
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
}

impl Default for CMakeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder for CMakeBuilder {
    fn default_source_path(&self) -> PathBuf {
        PathBuf::from("c_src")
    }

    fn validate_options(&self, opts: &BuilderOptions) -> Result<(), ValidationError> {
        if opts.target_dir.is_some() || opts.target_triple.is_some() {
            return Err(ValidationError::new(
                "cmake",
                "cargo-only options (`target_dir`, `target_triple`) are not accepted",
            ));
        }

        if matches!(&opts.cmake_target, Some(t) if t.trim().is_empty()) {
            return Err(ValidationError::new("cmake", "`cmake_target` is empty"));
        }

        Ok(())
    }

    fn build(&self, desc: &BuildDescriptor) -> Result<()> {
        let build_dir = self.build_dir(desc);
        ensure_dir(&build_dir)?;

        let configure = Self::cmake_command(desc, Self::configure_args(desc, &build_dir, false))?;
        Self::run_stage(&configure)?;

        let target = Self::target(desc);
        let compile =
            Self::cmake_command(desc, Self::compile_args(desc, &build_dir, target.as_deref()))?;
        Self::run_stage(&compile)?;

        Ok(())
    }

    /// Generator output layout varies, so each binary is searched for in the
    /// flat build directory and the `Release/`/`Debug/` subdirectories; the
    /// first existing match wins, falling back to the flat path when nothing
    /// has been generated yet.
    fn binary_paths(&self, desc: &BuildDescriptor) -> BTreeMap<String, PathBuf> {
        let build_dir = self.build_dir(desc);
        desc.binaries
            .iter()
            .map(|name| {
                let file = format!("{name}{EXE_SUFFIX}");
                let flat = build_dir.join(&file);
                let candidates = [
                    flat.clone(),
                    build_dir.join("Release").join(&file),
                    build_dir.join("Debug").join(&file),
                ];
                let path = candidates
                    .iter()
                    .find(|p| p.exists())
                    .cloned()
                    .unwrap_or(flat);
                (name.clone(), path)
            })
            .collect()
    }

    fn discover_resources(&self, desc: &BuildDescriptor) -> Result<Vec<PathBuf>> {
        let root = &desc.source_path;
        let mut resources = Vec::new();

        for name in ["CMakeLists.txt", "CMakePresets.json"] {
            let path = root.join(name);
            if path.exists() {
                resources.push(path);
            }
        }

        for dir in ["src", "test"] {
            let dir = root.join(dir);
            if !dir.is_dir() {
                continue;
            }
            for entry in WalkDir::new(&dir) {
                let entry =
                    entry.with_context(|| format!("failed to walk {}", dir.display()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let recognized = entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
                if recognized {
                    resources.push(entry.into_path());
                }
            }
        }

        resources.sort();
        resources.dedup();
        Ok(resources)
    }

    fn supports_test(&self) -> bool {
        true
    }

    /// Configure and build the dedicated test tree, then run CTest. A
    /// failing configure or build stage short-circuits with that stage's
    /// capture; the harness is never invoked after a failed stage.
    fn test(&self, desc: &BuildDescriptor) -> Result<TestResult> {
        let test_dir = self.test_build_dir(desc);
        ensure_dir(&test_dir)?;

        let configure = Self::cmake_command(desc, Self::configure_args(desc, &test_dir, true))?;
        tracing::info!("running `{}`", configure.display_command());
        let out = configure.exec_combined()?;
        if !out.success() {
            return Ok(TestResult::from_output(out));
        }

        let compile = Self::cmake_command(desc, Self::compile_args(desc, &test_dir, None))?;
        tracing::info!("running `{}`", compile.display_command());
        let out = compile.exec_combined()?;
        if !out.success() {
            return Ok(TestResult::from_output(out));
        }

        let ctest = find_ctest().context("ctest not found in PATH")?;
        let run_dir = if test_dir.join("test").is_dir() {
            test_dir.join("test")
        } else {
            test_dir
        };
        let harness = ProcessBuilder::new(ctest)
            .arg("--output-on-failure")
            .args(&desc.options.test_args)
            .cwd(&run_dir)
            .envs(&desc.env);
        tracing::info!("running `{}` in {}", harness.display_command(), run_dir.display());

        let out = harness.exec_combined()?;
        Ok(TestResult::from_output(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn descriptor(source: &Path) -> BuildDescriptor {
        BuildDescriptor {
            app: "demo".to_string(),
            builder: "cmake".to_string(),
            source_path: source.to_path_buf(),
            install_dir: source.join("priv"),
            binaries: vec!["hello".to_string()],
            profile: "debug".to_string(),
            env: Vec::new(),
            options: BuilderOptions::default(),
            os_constraint: None,
            arch_constraint: None,
            skip_compilation: false,
            platform_supported: true,
            resources: Vec::new(),
        }
    }

    #[test]
    fn test_configure_args() {
        let desc = descriptor(Path::new("/src"));
        let build_dir = PathBuf::from("/src/build/demo");
        let args = CMakeBuilder::configure_args(&desc, &build_dir, false);

        assert_eq!(
            args,
            vec![
                "-S",
                "/src",
                "-B",
                "/src/build/demo",
                "-DCMAKE_BUILD_TYPE=Debug"
            ]
        );
    }

    #[test]
    fn test_configure_args_testing_and_extra() {
        let mut desc = descriptor(Path::new("/src"));
        desc.profile = "release".to_string();
        desc.options.cmake_args = vec!["-DFOO=ON".to_string()];
        let build_dir = PathBuf::from("/b");
        let args = CMakeBuilder::configure_args(&desc, &build_dir, true);

        assert!(args.contains(&"-DCMAKE_BUILD_TYPE=Release".to_string()));
        assert!(args.contains(&"-DBUILD_TESTING=ON".to_string()));
        assert_eq!(args.last().unwrap(), "-DFOO=ON");
    }

    #[test]
    fn test_compile_args() {
        let mut desc = descriptor(Path::new("/src"));
        let build_dir = PathBuf::from("/b");

        assert_eq!(
            CMakeBuilder::compile_args(&desc, &build_dir, Some("hello")),
            vec!["--build", "/b", "--target", "hello"]
        );

        desc.profile = "release".to_string();
        assert_eq!(
            CMakeBuilder::compile_args(&desc, &build_dir, None),
            vec!["--build", "/b", "--config", "Release"]
        );
    }

    #[test]
    fn test_target_defaults_to_first_binary() {
        let mut desc = descriptor(Path::new("/src"));
        assert_eq!(CMakeBuilder::target(&desc).as_deref(), Some("hello"));

        desc.options.cmake_target = Some("other".to_string());
        assert_eq!(CMakeBuilder::target(&desc).as_deref(), Some("other"));
    }

    #[test]
    fn test_build_dirs_are_separate() {
        let builder = CMakeBuilder::new();
        let desc = descriptor(Path::new("/src"));

        assert_eq!(builder.build_dir(&desc), Path::new("/src/build/demo"));
        assert_eq!(
            builder.test_build_dir(&desc),
            Path::new("/src/build/demo-test")
        );
    }

    #[test]
    fn test_binary_paths_candidate_search() {
        let tmp = TempDir::new().unwrap();
        let builder = CMakeBuilder::new();
        let mut desc = descriptor(tmp.path());
        desc.options.build_dir = Some(tmp.path().join("build"));

        let file = format!("hello{EXE_SUFFIX}");

        // Nothing generated yet: fall back to the flat path.
        let paths = builder.binary_paths(&desc);
        assert_eq!(paths["hello"], tmp.path().join("build").join(&file));

        // A nested Release/ copy wins once it exists.
        fs::create_dir_all(tmp.path().join("build/Release")).unwrap();
        fs::write(tmp.path().join("build/Release").join(&file), b"bin").unwrap();
        let paths = builder.binary_paths(&desc);
        assert_eq!(
            paths["hello"],
            tmp.path().join("build/Release").join(&file)
        );

        // The flat path is the first candidate when present.
        fs::write(tmp.path().join("build").join(&file), b"bin").unwrap();
        let paths = builder.binary_paths(&desc);
        assert_eq!(paths["hello"], tmp.path().join("build").join(&file));
    }

    #[test]
    fn test_validate_options_rejects_cargo_fields() {
        let builder = CMakeBuilder::new();
        let opts = BuilderOptions {
            target_triple: Some("aarch64-unknown-linux-gnu".to_string()),
            ..Default::default()
        };
        let err = builder.validate_options(&opts).unwrap_err();
        assert!(err.to_string().contains("cmake"));
    }

    #[test]
    fn test_discover_resources() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("test")).unwrap();

        fs::write(root.join("CMakeLists.txt"), "project(demo)").unwrap();
        fs::write(root.join("src/main.c"), "int main(){}").unwrap();
        fs::write(root.join("src/util.hpp"), "").unwrap();
        fs::write(root.join("src/notes.txt"), "ignored").unwrap();
        fs::write(root.join("test/test_main.c"), "int main(){}").unwrap();

        let builder = CMakeBuilder::new();
        let resources = builder.discover_resources(&descriptor(root)).unwrap();

        assert!(resources.contains(&root.join("CMakeLists.txt")));
        assert!(resources.contains(&root.join("src/main.c")));
        assert!(resources.contains(&root.join("src/util.hpp")));
        assert!(resources.contains(&root.join("test/test_main.c")));
        assert!(!resources.iter().any(|p| p.ends_with("notes.txt")));
    }

    #[test]
    fn test_default_source_path() {
        let builder = CMakeBuilder::new();
        assert_eq!(builder.default_source_path(), PathBuf::from("c_src"));
    }
}
