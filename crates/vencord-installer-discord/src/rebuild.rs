//! Downloading the latest build artifacts.
//!
//! A patched installation loads Vencord from the dist directory, so a
//! repair first refreshes those files. Every artifact is first staged as a
//! `.part` file next to its destination. Only when all of them have
//! downloaded are they renamed into place, so a failed rebuild leaves the
//! previous build untouched.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{InstallError, InstallResult};
use crate::install::{BoxFuture, Rebuilder};

const VENCORD_RELEASE: &str = "https://github.com/Vendicated/Vencord/releases/download/devbuild";
const OPENASAR_NIGHTLY: &str =
    "https://github.com/GooseMod/OpenAsar/releases/download/nightly/app.asar";

/// Default timeout for a single artifact download.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// One file to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Source URL.
    pub url: String,
    /// File name inside the dist directory.
    pub file_name: String,
}

impl Artifact {
    /// Creates an artifact.
    pub fn new(url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: file_name.into(),
        }
    }
}

/// The Vencord desktop build plus the OpenAsar nightly.
pub fn default_artifacts() -> Vec<Artifact> {
    let mut artifacts: Vec<Artifact> = ["patcher.js", "preload.js", "renderer.js", "renderer.css"]
        .into_iter()
        .map(|name| Artifact::new(format!("{VENCORD_RELEASE}/{name}"), name))
        .collect();
    artifacts.push(Artifact::new(OPENASAR_NIGHTLY, "openasar.asar"));
    artifacts
}

/// Downloads artifacts over HTTP(S) into a dist directory.
#[derive(Debug, Clone)]
pub struct HttpRebuilder {
    client: reqwest::Client,
    dist_dir: PathBuf,
    artifacts: Vec<Artifact>,
}

impl HttpRebuilder {
    /// Creates a rebuilder for the default artifacts.
    pub fn new(dist_dir: impl Into<PathBuf>) -> InstallResult<Self> {
        Self::with_artifacts(dist_dir, default_artifacts(), DEFAULT_TIMEOUT)
    }

    /// Creates a rebuilder for a custom artifact list.
    pub fn with_artifacts(
        dist_dir: impl Into<PathBuf>,
        artifacts: Vec<Artifact>,
        timeout: Duration,
    ) -> InstallResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vencord-installer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| InstallError::internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            dist_dir: dist_dir.into(),
            artifacts,
        })
    }

    /// Returns the dist directory.
    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    /// Returns the configured artifacts.
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Downloads one artifact into its staging file and returns that path.
    async fn stage(&self, artifact: &Artifact) -> InstallResult<PathBuf> {
        let response = self.client.get(&artifact.url).send().await.map_err(|e| {
            if e.is_timeout() {
                InstallError::download(&artifact.url, "request timeout")
            } else if e.is_connect() {
                InstallError::download(&artifact.url, format!("connection failed: {e}"))
            } else {
                InstallError::download(&artifact.url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::download(&artifact.url, format!("HTTP {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| InstallError::download(&artifact.url, format!("failed to read body: {e}")))?;

        let part = self.part_path(artifact);
        tokio::fs::write(&part, &body)
            .await
            .map_err(|e| InstallError::io("write", &part, e))?;

        debug!(url = %artifact.url, path = %part.display(), bytes = body.len(), "Staged artifact");
        Ok(part)
    }

    fn part_path(&self, artifact: &Artifact) -> PathBuf {
        self.dist_dir.join(format!(".{}.part", artifact.file_name))
    }

    async fn stage_all(&self) -> InstallResult<Vec<(PathBuf, PathBuf)>> {
        let mut staged = Vec::with_capacity(self.artifacts.len());
        for artifact in &self.artifacts {
            let part = self.stage(artifact).await?;
            staged.push((part, self.dist_dir.join(&artifact.file_name)));
        }
        Ok(staged)
    }

    fn discard_parts(&self) {
        for artifact in &self.artifacts {
            let part = self.part_path(artifact);
            match std::fs::remove_file(&part) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                    warn!(path = %part.display(), error = %e, "Failed to remove staged artifact");
                }
                _ => {}
            }
        }
    }
}

/// Renames every staged file over its destination.
///
/// Runs without yielding, so a caller that drops the rebuild future cannot
/// stop it halfway.
fn commit(staged: &[(PathBuf, PathBuf)]) -> InstallResult<()> {
    for (part, dest) in staged {
        std::fs::rename(part, dest).map_err(|e| InstallError::io("rename", part, e))?;
    }
    Ok(())
}

impl Rebuilder for HttpRebuilder {
    fn rebuild(&self) -> BoxFuture<'_, InstallResult<()>> {
        Box::pin(async move {
            tokio::fs::create_dir_all(&self.dist_dir)
                .await
                .map_err(|e| InstallError::io("create", &self.dist_dir, e))?;

            let result = match self.stage_all().await {
                Ok(staged) => commit(&staged),
                Err(e) => Err(e),
            };
            if result.is_err() {
                self.discard_parts();
            }
            result?;

            info!(
                dist = %self.dist_dir.display(),
                count = self.artifacts.len(),
                "Build artifacts updated"
            );
            Ok(())
        })
    }
}
