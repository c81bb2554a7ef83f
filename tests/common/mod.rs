#![allow(dead_code)]

use async_trait::async_trait;
use repo_ingest::RepoDescriptor;
use repo_ingest::services::source::CodeHost;
use repo_ingest::services::storage::StorageService;
use repo_ingest::services::storage::MemoryStorageService;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

pub fn descriptor(name: &str) -> RepoDescriptor {
    RepoDescriptor::new(name, format!("https://github.com/example/{}.git", name))
}

/// Code host driven by a script: search results, per-URL trees, and
/// URLs whose clone fails after writing a partial directory.
#[derive(Default)]
pub struct FakeHost {
    pub results: Vec<RepoDescriptor>,
    pub search_error: Option<String>,
    trees: HashMap<String, Vec<(String, String)>>,
    links: HashMap<String, Vec<(String, PathBuf)>>,
    pub queries: Mutex<Vec<(String, usize)>>,
    pub cloned: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn new(results: Vec<RepoDescriptor>) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            search_error: Some(reason.to_string()),
            ..Default::default()
        }
    }

    pub fn with_tree(mut self, repo: &RepoDescriptor, files: &[(&str, &str)]) -> Self {
        self.trees.insert(
            repo.clone_url.clone(),
            files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
        );
        self
    }

    /// Adds a symlink at `rel` pointing to `target` in the repository's tree.
    pub fn with_link(mut self, repo: &RepoDescriptor, rel: &str, target: &Path) -> Self {
        self.links
            .entry(repo.clone_url.clone())
            .or_default()
            .push((rel.to_string(), target.to_path_buf()));
        self
    }

    pub fn clone_count(&self) -> usize {
        self.cloned.lock().unwrap().len()
    }
}

#[async_trait]
impl CodeHost for FakeHost {
    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<RepoDescriptor>> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), limit));
        match &self.search_error {
            Some(reason) => anyhow::bail!("{}", reason),
            None => Ok(self.results.clone()),
        }
    }

    async fn clone_repo(&self, clone_url: &str, dest: &Path) -> anyhow::Result<()> {
        self.cloned.lock().unwrap().push(clone_url.to_string());
        tokio::fs::create_dir_all(dest).await?;

        let Some(files) = self.trees.get(clone_url) else {
            tokio::fs::write(dest.join("partial.pack"), "half").await?;
            anyhow::bail!("repository not found: {}", clone_url);
        };

        for (rel, contents) in files {
            let path = dest.join(rel);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, contents).await?;
        }

        #[cfg(unix)]
        for (rel, target) in self.links.get(clone_url).into_iter().flatten() {
            tokio::fs::symlink(target, dest.join(rel)).await?;
        }
        Ok(())
    }
}

/// Storage that rejects keys in a given partition and keeps everything else.
#[derive(Default)]
pub struct FlakyStorage {
    pub reject_prefix: String,
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl FlakyStorage {
    pub fn rejecting(prefix: &str) -> Self {
        Self {
            reject_prefix: prefix.to_string(),
            ..Default::default()
        }
    }
}

impl FlakyStorage {
    pub fn get_file(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl StorageService for FlakyStorage {
    async fn upload_file(&self, key: &str, data: Vec<u8>) -> anyhow::Result<()> {
        if key.starts_with(&self.reject_prefix) {
            anyhow::bail!("503 Slow Down");
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }
}

/// Storage that deletes a local path on the first upload, so a later
/// local operation on that path fails.
pub struct DeletingStorage {
    pub inner: MemoryStorageService,
    victim: Mutex<Option<PathBuf>>,
}

impl DeletingStorage {
    pub fn removing(path: PathBuf) -> Self {
        Self {
            inner: MemoryStorageService::new(),
            victim: Mutex::new(Some(path)),
        }
    }
}

#[async_trait]
impl StorageService for DeletingStorage {
    async fn upload_file(&self, key: &str, data: Vec<u8>) -> anyhow::Result<()> {
        let victim = self.victim.lock().unwrap().take();
        if let Some(path) = victim {
            tokio::fs::remove_file(&path).await?;
        }
        self.inner.upload_file(key, data).await
    }
}
