//! Static accessors for resolved native binaries.
//!
//! Instead of synthesizing per-binary lookup functions in the host module
//! system, a finalized descriptor is turned into an [`ArtifactAccessor`] and
//! registered in a table keyed by the owning application identifier. Host
//! startup code registers accessors once and resolves them by id afterwards.

use std::collections::HashMap;
use std::env::consts::EXE_SUFFIX;
use std::path::PathBuf;
use std::sync::{OnceLock, RwLock};

use anyhow::{bail, Result};

use crate::descriptor::BuildDescriptor;
use crate::platform::{Arch, Os};
use crate::util::diagnostic::UnsupportedPlatformError;

/// Path accessors for one application's installed binaries.
#[derive(Debug, Clone)]
pub struct ArtifactAccessor {
    app: String,
    install_dir: PathBuf,
    binaries: Vec<String>,
    platform_supported: bool,
    required_os: Option<Vec<Os>>,
    required_arch: Option<Vec<Arch>>,
}

impl ArtifactAccessor {
    /// Capture the accessor surface of a finalized descriptor.
    pub fn from_descriptor(desc: &BuildDescriptor) -> Self {
        ArtifactAccessor {
            app: desc.app.clone(),
            install_dir: desc.install_dir.clone(),
            binaries: desc.binaries.clone(),
            platform_supported: desc.platform_supported,
            required_os: desc.os_constraint.clone(),
            required_arch: desc.arch_constraint.clone(),
        }
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn platform_supported(&self) -> bool {
        self.platform_supported
    }

    pub fn required_os(&self) -> Option<&[Os]> {
        self.required_os.as_deref()
    }

    pub fn required_arch(&self) -> Option<&[Arch]> {
        self.required_arch.as_deref()
    }

    /// Install path of a binary. Accepts the literal name or its
    /// underscore-normalized form.
    ///
    /// On a platform the descriptor excludes this fails with
    /// [`UnsupportedPlatformError`] carrying the requested name and the
    /// required platform constraints.
    pub fn bin_path(&self, name: &str) -> Result<PathBuf> {
        let Some(binary) = self
            .binaries
            .iter()
            .find(|b| *b == name || normalize(b) == normalize(name))
        else {
            bail!("`{}` declares no binary named `{}`", self.app, name);
        };

        if !self.platform_supported {
            return Err(UnsupportedPlatformError::new(
                name,
                self.required_os.clone(),
                self.required_arch.clone(),
            )
            .into());
        }

        Ok(self.install_dir.join(format!("{binary}{EXE_SUFFIX}")))
    }

    /// Identifier of the generated per-binary accessor: `a-b` -> `a_b_path`.
    pub fn accessor_ident(name: &str) -> String {
        format!("{}_path", normalize(name))
    }
}

fn normalize(name: &str) -> String {
    name.replace('-', "_")
}

/// Accessor table keyed by owning application identifier.
#[derive(Debug, Default)]
pub struct AccessorRegistry {
    entries: HashMap<String, ArtifactAccessor>,
}

impl AccessorRegistry {
    pub fn new() -> Self {
        AccessorRegistry::default()
    }

    /// Insert, keyed by the accessor's application id. Re-registering an id
    /// replaces the previous entry.
    pub fn insert(&mut self, accessor: ArtifactAccessor) {
        self.entries.insert(accessor.app.clone(), accessor);
    }

    pub fn get(&self, app: &str) -> Option<&ArtifactAccessor> {
        self.entries.get(app)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn global() -> &'static RwLock<AccessorRegistry> {
    static TABLE: OnceLock<RwLock<AccessorRegistry>> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(AccessorRegistry::new()))
}

/// Register an accessor in the process-global table.
pub fn register(accessor: ArtifactAccessor) {
    global()
        .write()
        .expect("accessor table poisoned")
        .insert(accessor);
}

/// Look up an accessor by application id in the process-global table.
pub fn lookup(app: &str) -> Option<ArtifactAccessor> {
    global()
        .read()
        .expect("accessor table poisoned")
        .get(app)
        .cloned()
}
