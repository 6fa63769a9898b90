use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::descriptor::RepositoryDescriptor;
use crate::errors::{SfileError, SfileResult};
use crate::scanner::{RepositoryScanner, repository_name};

/// Lists the repositories below a root directory, analyzing them on demand.
///
/// Analyses of the same repository are serialized, so concurrent callers share the
/// result of a single scan.
#[derive(Clone, Debug)]
pub struct RepositoryCatalog {
    root: PathBuf,
    scanner: RepositoryScanner,
    locks: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl RepositoryCatalog {
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P, scanner: RepositoryScanner) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            scanner,
            locks: Arc::default(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Describe every directory below the root, sorted by name.
    ///
    /// Only an unreadable root is an error. Repositories that cannot be analyzed are
    /// listed with a placeholder descriptor.
    pub async fn list(&self) -> SfileResult<Vec<RepositoryDescriptor>> {
        let io_err = |e| SfileError::IoError(e, self.root.clone());
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(io_err)?;
        let mut dirs = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            match entry.file_type().await {
                Ok(t) if t.is_dir() => dirs.push(entry.path()),
                Ok(_) => {}
                Err(e) => warn!("Skipping {}: {e}", entry.path().display()),
            }
        }
        dirs.sort();
        debug!("Found {} repositories in {}", dirs.len(), self.root.display());

        Ok(join_all(dirs.iter().map(|dir| self.describe(dir))).await)
    }

    /// Descriptor of one repository: the sidecar if there is a valid one, otherwise the
    /// result of a fresh analysis, otherwise a placeholder that is not persisted.
    pub async fn describe(&self, dir: &Path) -> RepositoryDescriptor {
        if let Some(descriptor) = read_sidecar_or_warn(dir).await {
            return descriptor;
        }

        let lock = self.lock(dir);
        let _guard = lock.lock().await;
        // another task may have finished the analysis while we waited
        if let Some(descriptor) = read_sidecar_or_warn(dir).await {
            return descriptor;
        }
        self.analyze_or_placeholder(dir).await
    }

    /// Discard the sidecar of a repository and analyze it again.
    pub async fn reanalyze(&self, dir: &Path) -> SfileResult<RepositoryDescriptor> {
        let lock = self.lock(dir);
        let _guard = lock.lock().await;
        RepositoryDescriptor::remove_sidecar(dir).await?;
        self.scanner.analyze(dir).await
    }

    async fn analyze_or_placeholder(&self, dir: &Path) -> RepositoryDescriptor {
        match self.scanner.analyze(dir).await {
            Ok(descriptor) => {
                info!(
                    "Analyzed repository {} centered at {},{}",
                    descriptor.name, descriptor.lng, descriptor.lat
                );
                descriptor
            }
            Err(e) => {
                warn!("Unable to analyze repository {}: {e}", dir.display());
                RepositoryDescriptor::placeholder(&repository_name(dir))
            }
        }
    }

    fn lock(&self, dir: &Path) -> Arc<Mutex<()>> {
        self.locks.entry(dir.to_path_buf()).or_default().clone()
    }
}

async fn read_sidecar_or_warn(dir: &Path) -> Option<RepositoryDescriptor> {
    match RepositoryDescriptor::read_sidecar(dir).await {
        Ok(v) => v,
        Err(e) => {
            warn!("{e}, rescanning");
            None
        }
    }
}
