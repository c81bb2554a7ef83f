use crate::error::{IngestError, Result};
use crate::models::{RepoDescriptor, StagingHandle};
use crate::services::source::CodeHost;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
pub enum StageOutcome {
    /// Freshly cloned; the caller must tear the handle down.
    Staged(StagingHandle),
    /// A root with this name was already on disk, nothing was cloned.
    AlreadyStaged(PathBuf),
}

/// Every non-directory entry under a staging root, plus read errors met on the way.
///
/// Symlinks are listed apart from regular files: their targets may lie outside
/// the root and are never read.
#[derive(Debug, Default)]
pub struct StagedTree {
    pub files: Vec<PathBuf>,
    pub links: Vec<PathBuf>,
    pub errors: Vec<IngestError>,
}

/// Owns the local working copy of one repository at a time.
pub struct StagingManager {
    staging_dir: PathBuf,
    host: Arc<dyn CodeHost>,
}

fn is_safe_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

impl StagingManager {
    pub fn new(staging_dir: impl Into<PathBuf>, host: Arc<dyn CodeHost>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            host,
        }
    }

    /// Staging roots are keyed by repository name so they never collide within a run.
    pub fn handle_for(&self, descriptor: &RepoDescriptor) -> Result<StagingHandle> {
        if !is_safe_name(&descriptor.name) {
            return Err(IngestError::CloneFailed {
                repository: descriptor.name.clone(),
                reason: "unsafe repository name".to_string(),
            });
        }

        Ok(StagingHandle {
            repo_name: descriptor.name.clone(),
            local_root: self.staging_dir.join(&descriptor.name),
        })
    }

    /// Clones the repository unless a root of the same name already exists.
    ///
    /// An existing root is never inspected: leftovers from a crashed run
    /// short-circuit staging just like a completed one.
    pub async fn stage(&self, descriptor: &RepoDescriptor) -> Result<StageOutcome> {
        let handle = self.handle_for(descriptor)?;

        if tokio::fs::symlink_metadata(handle.root()).await.is_ok() {
            tracing::info!(
                "Repository {} already staged at {}, skipping",
                descriptor.name,
                handle.root().display()
            );
            return Ok(StageOutcome::AlreadyStaged(handle.local_root));
        }

        tokio::fs::create_dir_all(&self.staging_dir)
            .await
            .map_err(|source| IngestError::StagingIo {
                path: self.staging_dir.clone(),
                source,
            })?;

        tracing::info!("📥 Cloning {} into {}", descriptor.clone_url, handle.root().display());
        self.host
            .clone_repo(&descriptor.clone_url, handle.root())
            .await
            .map_err(|e| IngestError::CloneFailed {
                repository: descriptor.name.clone(),
                reason: format!("{:#}", e),
            })?;

        Ok(StageOutcome::Staged(handle))
    }

    /// Lists every entry under the root once. Symlinks are not followed.
    pub async fn files(&self, handle: &StagingHandle) -> StagedTree {
        let mut tree = StagedTree::default();
        collect_files(handle.root(), &mut tree).await;
        tree
    }

    /// Recursively removes the staging root. A missing root is not an error.
    pub async fn teardown(&self, handle: &StagingHandle) -> Result<()> {
        let root = handle.root();
        let io_err = |source| IngestError::StagingIo {
            path: root.to_path_buf(),
            source,
        };

        let meta = match tokio::fs::symlink_metadata(root).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_err(e)),
        };

        let removed = if meta.is_dir() {
            tokio::fs::remove_dir_all(root).await
        } else {
            tokio::fs::remove_file(root).await
        };

        match removed {
            Ok(()) => {
                tracing::info!("🧹 Removed staging root {}", root.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(e)),
        }
    }
}

#[async_recursion::async_recursion]
async fn collect_files(dir: &Path, tree: &mut StagedTree) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(source) => {
            tree.errors.push(IngestError::StagingIo {
                path: dir.to_path_buf(),
                source,
            });
            return;
        }
    };

    let mut children = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => match entry.file_type().await {
                Ok(file_type) => children.push((entry.path(), file_type)),
                Err(source) => tree.errors.push(IngestError::StagingIo {
                    path: entry.path(),
                    source,
                }),
            },
            Ok(None) => break,
            Err(source) => {
                tree.errors.push(IngestError::StagingIo {
                    path: dir.to_path_buf(),
                    source,
                });
                break;
            }
        }
    }
    children.sort_by(|a, b| a.0.cmp(&b.0));

    for (path, file_type) in children {
        if file_type.is_symlink() {
            tree.links.push(path);
        } else if file_type.is_dir() {
            collect_files(&path, tree).await;
        } else {
            tree.files.push(path);
        }
    }
}
