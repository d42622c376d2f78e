//! Discovery of Discord installations on disk.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use vencord_installer_core::Branch;

use super::installation::FsInstallation;
use crate::install::{BoxFuture, InstallSource, Installation};

/// Configuration for [`FsSource`].
#[derive(Debug, Clone)]
pub struct FsSourceConfig {
    /// Directories whose children are checked for Discord installations.
    pub search_roots: Vec<PathBuf>,
    /// Directory holding downloaded build artifacts.
    pub dist_dir: PathBuf,
}

impl FsSourceConfig {
    /// Creates a config using the platform's default search roots.
    pub fn new(dist_dir: impl Into<PathBuf>) -> Self {
        Self {
            search_roots: default_search_roots(),
            dist_dir: dist_dir.into(),
        }
    }

    /// Builder: replace the search roots.
    pub fn with_search_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.search_roots = roots;
        self
    }

    /// Path of the patcher the loader shim requires.
    pub fn patcher_path(&self) -> PathBuf {
        self.dist_dir.join("patcher.js")
    }

    /// Path of the downloaded OpenAsar build.
    pub fn openasar_path(&self) -> PathBuf {
        self.dist_dir.join("openasar.asar")
    }
}

/// Returns the directories Discord is usually installed under.
pub fn default_search_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    if cfg!(target_os = "windows") {
        roots.extend(dirs::data_local_dir());
    } else if cfg!(target_os = "macos") {
        roots.push(PathBuf::from("/Applications"));
        roots.extend(dirs::home_dir().map(|home| home.join("Applications")));
    } else {
        roots.extend(
            ["/opt", "/usr/share", "/usr/lib", "/usr/lib64"]
                .into_iter()
                .map(PathBuf::from),
        );
        roots.extend(dirs::data_local_dir());
    }

    roots
}

/// Finds Discord installations by scanning the configured search roots.
///
/// Every call re-scans the disk.
#[derive(Debug, Clone)]
pub struct FsSource {
    config: FsSourceConfig,
}

impl FsSource {
    /// Creates a new source.
    pub fn new(config: FsSourceConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FsSourceConfig {
        &self.config
    }

    /// Scans synchronously. Unreadable roots are skipped.
    pub fn scan(&self) -> Vec<FsInstallation> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for root in &self.config.search_roots {
            let entries = match fs::read_dir(root) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(root = %root.display(), error = %e, "Skipping search root");
                    continue;
                }
            };

            let mut candidates: Vec<(Branch, PathBuf)> = entries
                .filter_map(Result::ok)
                .filter_map(|entry| {
                    let name = entry.file_name();
                    let branch = Branch::from_dir_name(&name.to_string_lossy())?;
                    let path = entry.path();
                    path.is_dir().then_some((branch, path))
                })
                .collect();
            candidates.sort_by(|a, b| a.1.cmp(&b.1));

            for (branch, dir) in candidates {
                let Some(resources) = find_resources(&dir) else {
                    debug!(path = %dir.display(), "No resources directory, skipping");
                    continue;
                };
                let install = FsInstallation::inspect(
                    &dir,
                    resources,
                    branch,
                    self.config.patcher_path(),
                    self.config.openasar_path(),
                );
                if seen.insert(install.path().to_string()) {
                    found.push(install);
                }
            }
        }

        debug!(count = found.len(), "Discovery finished");
        found
    }
}

impl InstallSource for FsSource {
    fn discover(&self) -> BoxFuture<'_, Vec<Box<dyn Installation>>> {
        let source = self.clone();
        Box::pin(async move {
            match tokio::task::spawn_blocking(move || source.scan()).await {
                Ok(found) => found
                    .into_iter()
                    .map(|install| Box::new(install) as Box<dyn Installation>)
                    .collect(),
                Err(e) => {
                    warn!(error = %e, "Discovery task failed");
                    Vec::new()
                }
            }
        })
    }
}

/// Locates the `resources` directory of an installation.
///
/// Checks, in order: `<dir>/resources` (Linux), `<dir>/Contents/Resources`
/// (macOS bundles) and the newest `<dir>/app-<version>/resources`
/// (Squirrel installs on Windows).
fn find_resources(dir: &Path) -> Option<PathBuf> {
    let direct = [dir.join("resources"), dir.join("Contents").join("Resources")];
    if let Some(found) = direct.into_iter().find(|r| has_asar(r)) {
        return Some(found);
    }

    let mut versions: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("app-"))
        .map(|entry| entry.path().join("resources"))
        .filter(|r| has_asar(r))
        .collect();
    versions.sort();
    versions.pop()
}

fn has_asar(resources: &Path) -> bool {
    resources.join("app.asar").exists() || resources.join("_app.asar").exists()
}
