//! A Discord installation on disk.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use vencord_installer_core::Branch;

use crate::error::{InstallError, InstallResult, IoContext};
use crate::install::{BoxFuture, Installation};

const APP_ASAR: &str = "app.asar";
const BACKUP_ASAR: &str = "_app.asar";
const OPENASAR: &str = "OpenAsar";

/// A Discord installation found by [`FsSource`](super::FsSource).
///
/// The `patched` and `openasar` flags are a snapshot taken at discovery.
/// Mutations re-inspect the disk before acting.
#[derive(Debug, Clone)]
pub struct FsInstallation {
    path: String,
    branch: Branch,
    resources: PathBuf,
    patcher: PathBuf,
    openasar_source: PathBuf,
    patched: bool,
    openasar: bool,
}

impl FsInstallation {
    /// Inspects an installation whose `resources` directory is known.
    pub fn inspect(
        root: &Path,
        resources: PathBuf,
        branch: Branch,
        patcher: PathBuf,
        openasar_source: PathBuf,
    ) -> Self {
        let mut install = Self {
            path: root.to_string_lossy().into_owned(),
            branch,
            resources,
            patcher,
            openasar_source,
            patched: false,
            openasar: false,
        };
        install.patched = install.is_patched_on_disk();
        install.openasar = original_backup(&install.original_asar()).exists();
        install
    }

    /// The `resources` directory holding the asar files.
    pub fn resources(&self) -> &Path {
        &self.resources
    }

    fn app_asar(&self) -> PathBuf {
        self.resources.join(APP_ASAR)
    }

    fn backup_asar(&self) -> PathBuf {
        self.resources.join(BACKUP_ASAR)
    }

    fn is_patched_on_disk(&self) -> bool {
        self.app_asar().is_dir() && self.backup_asar().exists()
    }

    /// The asar Discord itself boots from: `_app.asar` once patched.
    fn original_asar(&self) -> PathBuf {
        if self.is_patched_on_disk() {
            self.backup_asar()
        } else {
            self.app_asar()
        }
    }

    fn patch_blocking(&self) -> InstallResult<()> {
        if !self.patcher.is_file() {
            return Err(InstallError::PatcherMissing {
                path: self.patcher.clone(),
            });
        }

        let app = self.app_asar();
        let backup = self.backup_asar();

        if self.is_patched_on_disk() {
            debug!(path = %self.path, "Already patched, rewriting shim");
            let staged = self.stage_shim()?;
            return self.replace_shim(&staged, &app);
        }

        if app.is_dir() {
            return Err(InstallError::internal(format!(
                "{} is a directory but {} is missing; reinstall Discord",
                app.display(),
                backup.display()
            )));
        }
        if !app.exists() {
            return Err(InstallError::not_found("app.asar", &app));
        }

        let staged = self.stage_shim()?;
        if let Err(e) = self.swap_in_shim(&staged, &app, &backup) {
            discard_dir(&staged);
            return Err(e);
        }

        info!(path = %self.path, branch = %self.branch, "Patched");
        Ok(())
    }

    /// Moves the real asar (and its OpenAsar backup) aside and renames the
    /// staged shim into its place. Undoes completed steps on failure.
    fn swap_in_shim(&self, staged: &Path, app: &Path, backup: &Path) -> InstallResult<()> {
        fs::rename(app, backup).context("rename", app)?;

        if let Err(e) = move_if_exists(&original_backup(app), &original_backup(backup)) {
            self.restore(backup, app);
            return Err(e);
        }

        if let Err(e) = fs::rename(staged, app) {
            warn!(path = %self.path, error = %e, "Installing shim failed, rolling back");
            self.restore(&original_backup(backup), &original_backup(app));
            self.restore(backup, app);
            return Err(InstallError::io("rename", staged, e));
        }
        Ok(())
    }

    /// Swaps a freshly staged shim over an existing one.
    fn replace_shim(&self, staged: &Path, app: &Path) -> InstallResult<()> {
        let old = self.resources.join(".app.asar.old");
        discard_dir(&old);

        if let Err(e) = fs::rename(app, &old) {
            discard_dir(staged);
            return Err(InstallError::io("rename", app, e));
        }
        if let Err(e) = fs::rename(staged, app) {
            self.restore(&old, app);
            discard_dir(staged);
            return Err(InstallError::io("rename", staged, e));
        }
        discard_dir(&old);
        Ok(())
    }

    /// Writes a complete shim into a scratch directory next to `app.asar`.
    fn stage_shim(&self) -> InstallResult<PathBuf> {
        let dir = self.resources.join(".app.asar.new");
        discard_dir(&dir);
        if let Err(e) = self.write_shim(&dir) {
            discard_dir(&dir);
            return Err(e);
        }
        Ok(dir)
    }

    fn restore(&self, from: &Path, to: &Path) {
        if !from.exists() {
            return;
        }
        if let Err(e) = fs::rename(from, to) {
            warn!(path = %self.path, from = %from.display(), error = %e, "Rollback failed");
        }
    }

    fn write_shim(&self, dir: &Path) -> InstallResult<()> {
        fs::create_dir_all(dir).context("create", dir)?;

        let patcher = self.patcher.to_string_lossy();
        let patcher = serde_json::to_string(&*patcher)
            .map_err(|e| InstallError::internal(format!("failed to encode patcher path: {e}")))?;
        let index = dir.join("index.js");
        fs::write(&index, format!("require({patcher});\n")).context("write", &index)?;

        let package = dir.join("package.json");
        fs::write(&package, r#"{"name":"discord","main":"index.js"}"#)
            .context("write", &package)?;
        Ok(())
    }

    fn unpatch_blocking(&self) -> InstallResult<()> {
        if !self.is_patched_on_disk() {
            debug!(path = %self.path, "Not patched, nothing to undo");
            return Ok(());
        }

        let app = self.app_asar();
        let backup = self.backup_asar();
        fs::remove_dir_all(&app).context("remove", &app)?;
        fs::rename(&backup, &app).context("rename", &backup)?;
        move_if_exists(&original_backup(&backup), &original_backup(&app))?;

        info!(path = %self.path, branch = %self.branch, "Unpatched");
        Ok(())
    }

    fn install_openasar_blocking(&self) -> InstallResult<()> {
        let original = self.original_asar();
        let saved = original_backup(&original);

        if saved.exists() {
            return Err(InstallError::AlreadyInstalled(OPENASAR));
        }
        if !self.openasar_source.is_file() {
            return Err(InstallError::not_found(OPENASAR, &self.openasar_source));
        }
        if !original.is_file() {
            return Err(InstallError::not_found("app.asar", &original));
        }

        fs::rename(&original, &saved).context("rename", &original)?;
        if let Err(e) = fs::copy(&self.openasar_source, &original) {
            let _ = fs::remove_file(&original);
            if let Err(rollback) = fs::rename(&saved, &original) {
                warn!(path = %self.path, error = %rollback, "Rollback failed");
            }
            return Err(InstallError::io("copy", &self.openasar_source, e));
        }

        info!(path = %self.path, "Installed OpenAsar");
        Ok(())
    }

    fn uninstall_openasar_blocking(&self) -> InstallResult<()> {
        let original = self.original_asar();
        let saved = original_backup(&original);

        if !saved.exists() {
            return Err(InstallError::NotInstalled(OPENASAR));
        }
        if original.exists() {
            fs::remove_file(&original).context("remove", &original)?;
        }
        fs::rename(&saved, &original).context("rename", &saved)?;

        info!(path = %self.path, "Uninstalled OpenAsar");
        Ok(())
    }

    fn spawn<F>(&self, op: F) -> BoxFuture<'_, InstallResult<()>>
    where
        F: FnOnce(&FsInstallation) -> InstallResult<()> + Send + 'static,
    {
        let this = self.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || op(&this))
                .await
                .map_err(|e| InstallError::internal(format!("installer task failed: {e}")))?
        })
    }
}

impl Installation for FsInstallation {
    fn path(&self) -> &str {
        &self.path
    }

    fn branch(&self) -> Branch {
        self.branch
    }

    fn is_patched(&self) -> bool {
        self.patched
    }

    fn is_openasar(&self) -> bool {
        self.openasar
    }

    fn patch(&self) -> BoxFuture<'_, InstallResult<()>> {
        self.spawn(Self::patch_blocking)
    }

    fn unpatch(&self) -> BoxFuture<'_, InstallResult<()>> {
        self.spawn(Self::unpatch_blocking)
    }

    fn install_openasar(&self) -> BoxFuture<'_, InstallResult<()>> {
        self.spawn(Self::install_openasar_blocking)
    }

    fn uninstall_openasar(&self) -> BoxFuture<'_, InstallResult<()>> {
        self.spawn(Self::uninstall_openasar_blocking)
    }
}

/// `foo.asar` -> `foo.asar.original`
fn original_backup(asar: &Path) -> PathBuf {
    let mut name = OsString::from(asar.as_os_str());
    name.push(".original");
    PathBuf::from(name)
}

/// Best-effort removal of a scratch directory. Anything that is not a
/// directory is left alone.
fn discard_dir(dir: &Path) {
    if dir.is_dir() {
        if let Err(e) = fs::remove_dir_all(dir) {
            warn!(path = %dir.display(), error = %e, "Failed to remove scratch directory");
        }
    }
}

fn move_if_exists(from: &Path, to: &Path) -> InstallResult<()> {
    if from.exists() {
        fs::rename(from, to).context("rename", from)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        root: PathBuf,
        dist: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().join("Discord");
            let dist = dir.path().join("dist");
            fs::create_dir_all(root.join("resources")).unwrap();
            fs::create_dir_all(&dist).unwrap();
            fs::write(root.join("resources/app.asar"), b"discord").unwrap();
            fs::write(dist.join("patcher.js"), b"// patcher").unwrap();
            fs::write(dist.join("openasar.asar"), b"openasar").unwrap();
            Self {
                _dir: dir,
                root,
                dist,
            }
        }

        fn install(&self) -> FsInstallation {
            FsInstallation::inspect(
                &self.root,
                self.root.join("resources"),
                Branch::Stable,
                self.dist.join("patcher.js"),
                self.dist.join("openasar.asar"),
            )
        }

        fn read(&self, rel: &str) -> String {
            fs::read_to_string(self.root.join("resources").join(rel)).unwrap()
        }

        fn exists(&self, rel: &str) -> bool {
            self.root.join("resources").join(rel).exists()
        }
    }

    #[test]
    fn original_backup_appends_suffix() {
        assert_eq!(
            original_backup(Path::new("/r/_app.asar")),
            PathBuf::from("/r/_app.asar.original")
        );
    }

    #[tokio::test]
    async fn patch_writes_shim_and_keeps_original() {
        let fx = Fixture::new();
        let install = fx.install();
        assert!(!install.is_patched());

        install.patch().await.unwrap();

        assert!(fx.root.join("resources/app.asar").is_dir());
        assert_eq!(fx.read("_app.asar"), "discord");
        let index = fx.read("app.asar/index.js");
        assert!(index.starts_with("require(\""));
        assert!(index.contains("patcher.js"));
        assert_eq!(
            fx.read("app.asar/package.json"),
            r#"{"name":"discord","main":"index.js"}"#
        );
        assert!(fx.install().is_patched());
    }

    #[tokio::test]
    async fn patch_twice_is_idempotent() {
        let fx = Fixture::new();
        fx.install().patch().await.unwrap();
        fx.install().patch().await.unwrap();

        assert_eq!(fx.read("_app.asar"), "discord");
        assert!(fx.install().is_patched());
    }

    #[tokio::test]
    async fn patch_without_patcher_fails_untouched() {
        let fx = Fixture::new();
        fs::remove_file(fx.dist.join("patcher.js")).unwrap();

        let err = fx.install().patch().await.unwrap_err();
        assert!(matches!(err, InstallError::PatcherMissing { .. }));
        assert_eq!(fx.read("app.asar"), "discord");
        assert!(!fx.exists("_app.asar"));
    }

    #[tokio::test]
    async fn unpatch_restores_original() {
        let fx = Fixture::new();
        fx.install().patch().await.unwrap();

        fx.install().unpatch().await.unwrap();

        assert_eq!(fx.read("app.asar"), "discord");
        assert!(!fx.exists("_app.asar"));
        assert!(!fx.install().is_patched());
    }

    #[tokio::test]
    async fn unpatch_unpatched_is_noop() {
        let fx = Fixture::new();
        fx.install().unpatch().await.unwrap();
        assert_eq!(fx.read("app.asar"), "discord");
    }

    #[tokio::test]
    async fn openasar_install_and_uninstall() {
        let fx = Fixture::new();
        let install = fx.install();
        assert!(!install.is_openasar());

        install.install_openasar().await.unwrap();
        assert_eq!(fx.read("app.asar"), "openasar");
        assert_eq!(fx.read("app.asar.original"), "discord");
        assert!(fx.install().is_openasar());

        let err = fx.install().install_openasar().await.unwrap_err();
        assert_eq!(err.to_string(), "OpenAsar is already installed");

        fx.install().uninstall_openasar().await.unwrap();
        assert_eq!(fx.read("app.asar"), "discord");
        assert!(!fx.exists("app.asar.original"));

        let err = fx.install().uninstall_openasar().await.unwrap_err();
        assert_eq!(err.to_string(), "OpenAsar is not installed");
    }

    #[tokio::test]
    async fn openasar_follows_patch_state() {
        let fx = Fixture::new();
        fx.install().install_openasar().await.unwrap();
        fx.install().patch().await.unwrap();

        assert_eq!(fx.read("_app.asar"), "openasar");
        assert_eq!(fx.read("_app.asar.original"), "discord");
        let install = fx.install();
        assert!(install.is_patched());
        assert!(install.is_openasar());

        install.unpatch().await.unwrap();
        assert_eq!(fx.read("app.asar"), "openasar");
        assert_eq!(fx.read("app.asar.original"), "discord");
        assert!(fx.install().is_openasar());
    }

    #[tokio::test]
    async fn install_openasar_requires_source() {
        let fx = Fixture::new();
        fs::remove_file(fx.dist.join("openasar.asar")).unwrap();

        let err = fx.install().install_openasar().await.unwrap_err();
        assert!(matches!(err, InstallError::NotFound { what: "OpenAsar", .. }));
        assert_eq!(fx.read("app.asar"), "discord");
    }

    #[tokio::test]
    async fn failed_repatch_keeps_existing_shim() {
        let fx = Fixture::new();
        fx.install().patch().await.unwrap();
        let before = fx.read("app.asar/index.js");
        // A plain file where the scratch shim goes makes staging fail.
        fs::write(fx.root.join("resources/.app.asar.new"), b"blocker").unwrap();

        assert!(fx.install().patch().await.is_err());

        assert_eq!(fx.read("app.asar/index.js"), before);
        assert_eq!(fx.read("_app.asar"), "discord");
        assert!(fx.install().is_patched());
        assert!(!fx.exists(".app.asar.old"));
    }

    #[tokio::test]
    async fn failed_first_patch_leaves_install_untouched() {
        let fx = Fixture::new();
        fx.install().install_openasar().await.unwrap();
        fs::write(fx.root.join("resources/.app.asar.new"), b"blocker").unwrap();

        assert!(fx.install().patch().await.is_err());

        assert_eq!(fx.read("app.asar"), "openasar");
        assert_eq!(fx.read("app.asar.original"), "discord");
        assert!(!fx.exists("_app.asar"));
        assert!(!fx.exists("_app.asar.original"));
    }

    #[tokio::test]
    async fn repatch_leaves_no_scratch_dirs() {
        let fx = Fixture::new();
        fx.install().patch().await.unwrap();
        fx.install().patch().await.unwrap();

        assert!(!fx.exists(".app.asar.new"));
        assert!(!fx.exists(".app.asar.old"));
    }
}
