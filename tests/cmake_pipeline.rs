//! End-to-end pipeline tests against a real CMake toolchain.
//!
//! Each test probes for the tools it needs (`cmake`, a C compiler, `ctest`)
//! and returns early when one is missing.

use std::env::consts::EXE_SUFFIX;
use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use slipway::backend::{CMakeBuilder, TestStatus};
use slipway::{
    Builder, BuilderRegistry, DescriptorOptions, Orchestrator, Outcome, ResolveContext, Resolver,
};

fn cmake_available() -> bool {
    which::which("cmake").is_ok() && which::which("cc").is_ok()
}

fn ctest_available() -> bool {
    which::which("ctest").is_ok()
}

/// A CMake project with one executable and an optional CTest suite.
fn write_cmake_fixture(dir: &Path, test_source: Option<&str>) {
    fs::create_dir_all(dir.join("src")).unwrap();

    let mut lists = String::from(
        "cmake_minimum_required(VERSION 3.10)\n\
         project(hello C)\n\
         add_executable(hello src/main.c)\n",
    );
    if test_source.is_some() {
        lists.push_str(
            "if(BUILD_TESTING)\n\
             \x20 enable_testing()\n\
             \x20 add_subdirectory(test)\n\
             endif()\n",
        );
    }
    fs::write(dir.join("CMakeLists.txt"), lists).unwrap();

    fs::write(
        dir.join("src/main.c"),
        "#include <stdio.h>\n\
         int main(void) {\n\
         \x20 printf(\"hello from c\\n\");\n\
         \x20 return 0;\n\
         }\n",
    )
    .unwrap();

    if let Some(source) = test_source {
        fs::create_dir_all(dir.join("test")).unwrap();
        fs::write(
            dir.join("test/CMakeLists.txt"),
            "add_executable(hello_test test_main.c)\n\
             add_test(NAME hello_test COMMAND hello_test)\n",
        )
        .unwrap();
        fs::write(dir.join("test/test_main.c"), source).unwrap();
    }
}

const PASSING_TEST: &str = "#include <string.h>\n\
    int main(void) {\n\
    \x20 return strcmp(\"hello\", \"hello\");\n\
    }\n";

const BROKEN_TEST: &str = "int main(void) {\n\
    \x20 return this_symbol_does_not_exist;\n\
    }\n";

fn hello_options(source: &Path) -> DescriptorOptions {
    DescriptorOptions {
        builder: Some("cmake".to_string()),
        binaries: Some(vec!["hello".to_string()]),
        source_path: Some(source.to_path_buf()),
        ..Default::default()
    }
}

#[test]
fn cmake_round_trip() {
    if !cmake_available() {
        eprintln!("cmake or cc not found in PATH; skipping");
        return;
    }

    let tmp = TempDir::new().unwrap();
    let app_root = tmp.path();
    let source = app_root.join("c_src");
    write_cmake_fixture(&source, None);

    let registry = BuilderRegistry::new();
    let run = Orchestrator::new(&registry)
        .run(
            "hello_app",
            ResolveContext::new(app_root).with_production(false),
            &DescriptorOptions::default(),
            &hello_options(&source),
        )
        .unwrap();

    assert_eq!(run.outcome, Outcome::Completed);

    let installed = app_root
        .join("priv/hello_app")
        .join(format!("hello{EXE_SUFFIX}"));
    assert!(installed.exists(), "binary was not copied to {installed:?}");

    let out = Command::new(&installed).output().unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("hello from c"));

    assert!(run
        .descriptor
        .resources
        .contains(&source.join("CMakeLists.txt")));
    assert!(run.descriptor.resources.contains(&source.join("src/main.c")));
}

#[test]
fn cmake_test_pipeline_passes() {
    if !cmake_available() || !ctest_available() {
        eprintln!("cmake, cc, or ctest not found in PATH; skipping");
        return;
    }

    let tmp = TempDir::new().unwrap();
    let app_root = tmp.path();
    let source = app_root.join("c_src");
    write_cmake_fixture(&source, Some(PASSING_TEST));

    let registry = BuilderRegistry::new();
    let resolver = Resolver::new(
        &registry,
        ResolveContext::new(app_root).with_production(false),
    );
    let desc = resolver
        .resolve(
            "hello_app",
            &DescriptorOptions::default(),
            &hello_options(&source),
        )
        .unwrap();

    let builder = CMakeBuilder::new();
    let result = builder.test(&desc).unwrap();

    assert_eq!(result.status, TestStatus::Ok, "output:\n{}", result.output);
    assert_eq!(result.exit_code, Some(0));
    assert!(result.output.contains("hello_test"));
}

#[test]
fn cmake_test_pipeline_short_circuits_on_build_failure() {
    if !cmake_available() {
        eprintln!("cmake or cc not found in PATH; skipping");
        return;
    }

    let tmp = TempDir::new().unwrap();
    let app_root = tmp.path();
    let source = app_root.join("c_src");
    // Configure succeeds; compiling the test executable cannot.
    write_cmake_fixture(&source, Some(BROKEN_TEST));

    let registry = BuilderRegistry::new();
    let resolver = Resolver::new(
        &registry,
        ResolveContext::new(app_root).with_production(false),
    );
    let desc = resolver
        .resolve(
            "hello_app",
            &DescriptorOptions::default(),
            &hello_options(&source),
        )
        .unwrap();

    let builder = CMakeBuilder::new();
    let result = builder.test(&desc).unwrap();

    assert_eq!(result.status, TestStatus::Error);
    assert!(matches!(result.exit_code, Some(code) if code != 0));
    // The capture is the failing build stage's, not the harness's.
    assert!(result.output.contains("this_symbol_does_not_exist"));
    assert!(!result.output.contains("% tests passed"));
}
