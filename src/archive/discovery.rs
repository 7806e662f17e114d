//! Archive discovery
//!
//! Scans the deploy directory and classifies exploded archives into
//! plugin and module descriptors.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::archive::manifest::{ModuleManifest, PluginManifest};
use crate::traits::HostError;

/// Parsed manifest of a discovered archive
#[derive(Debug, Clone)]
pub enum ArchiveManifest {
    Plugin(PluginManifest),
    Module(ModuleManifest),
}

/// One discovered exploded archive
#[derive(Debug, Clone)]
pub struct DiscoveredArchive {
    /// Archive directory
    pub directory: PathBuf,
    /// Parsed, validated manifest
    pub manifest: ArchiveManifest,
}

impl DiscoveredArchive {
    pub fn name(&self) -> &str {
        match &self.manifest {
            ArchiveManifest::Plugin(m) => &m.name,
            ArchiveManifest::Module(m) => &m.name,
        }
    }
}

/// Deploy directory scanner
pub struct ArchiveDiscovery {
    deploy_dir: PathBuf,
}

impl ArchiveDiscovery {
    pub fn new<P: AsRef<Path>>(deploy_dir: P) -> Self {
        Self {
            deploy_dir: deploy_dir.as_ref().to_path_buf(),
        }
    }

    /// Discover all archives in the deploy directory.
    ///
    /// A subdirectory with a `plugin.toml` is a plugin archive, one with
    /// a `module.toml` is a module archive. Unparseable manifests are
    /// logged and skipped; they never abort the scan.
    pub fn discover(&self) -> Result<Vec<DiscoveredArchive>, HostError> {
        info!(dir = %self.deploy_dir.display(), "discovering archives");

        if !self.deploy_dir.exists() {
            debug!(
                dir = %self.deploy_dir.display(),
                "deploy directory does not exist, creating"
            );
            fs::create_dir_all(&self.deploy_dir)?;
            return Ok(Vec::new());
        }

        let mut archives = Vec::new();
        for entry in fs::read_dir(&self.deploy_dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }

            match self.classify(&path) {
                Ok(Some(archive)) => archives.push(archive),
                Ok(None) => {
                    debug!(dir = %path.display(), "no manifest found, skipping");
                }
                Err(e) => {
                    warn!(dir = %path.display(), error = %e, "skipping invalid archive");
                }
            }
        }

        // Deterministic pipeline input regardless of directory iteration
        // order.
        archives.sort_by(|a, b| a.directory.cmp(&b.directory));

        info!(count = archives.len(), "discovered archives");
        Ok(archives)
    }

    fn classify(&self, directory: &Path) -> Result<Option<DiscoveredArchive>, HostError> {
        let plugin_manifest = directory.join("plugin.toml");
        if plugin_manifest.exists() {
            let manifest = PluginManifest::from_file(&plugin_manifest)?;
            return Ok(Some(DiscoveredArchive {
                directory: directory.to_path_buf(),
                manifest: ArchiveManifest::Plugin(manifest),
            }));
        }

        let module_manifest = directory.join("module.toml");
        if module_manifest.exists() {
            let manifest = ModuleManifest::from_file(&module_manifest)?;
            return Ok(Some(DiscoveredArchive {
                directory: directory.to_path_buf(),
                manifest: ArchiveManifest::Module(manifest),
            }));
        }

        Ok(None)
    }
}
