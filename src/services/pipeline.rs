use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::models::{Classification, RepoDescriptor, RunOutcome, RunWarning, StagingHandle};
use crate::services::classifier::classify;
use crate::services::source::{CodeHost, build_discovery_query};
use crate::services::staging::{StageOutcome, StagingManager};
use crate::services::storage::{StorageGateway, StorageService};
use chrono::{NaiveDate, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;

/// Drives discovery, staging, routing and teardown for one run.
///
/// Repositories are processed strictly one after another, so at most one
/// staging tree exists on disk at any time.
pub struct IngestPipeline {
    host: Arc<dyn CodeHost>,
    gateway: StorageGateway,
}

impl IngestPipeline {
    pub fn new(host: Arc<dyn CodeHost>, storage: Arc<dyn StorageService>) -> Self {
        Self {
            host,
            gateway: StorageGateway::new(storage),
        }
    }

    pub async fn run_once(&self, config: &IngestConfig) -> RunOutcome {
        self.run_once_at(config, Utc::now().date_naive()).await
    }

    /// Runs with an explicit "today" for the discovery window.
    pub async fn run_once_at(&self, config: &IngestConfig, today: NaiveDate) -> RunOutcome {
        let mut outcome = RunOutcome::default();

        let query = build_discovery_query(&config.languages, config.lookback_days, today);
        tracing::info!("🔎 Searching repositories: {}", query);

        let repos = match self.host.search(&query, config.max_repositories).await {
            Ok(repos) => repos,
            Err(e) => {
                let err = IngestError::DiscoveryUnavailable(format!("{:#}", e));
                tracing::error!("❌ {}", err);
                outcome.errors.push(err.into_record(None));
                return outcome;
            }
        };

        if repos.is_empty() {
            tracing::warn!("⚠️  No repositories returned in search results");
            outcome.warning = Some(RunWarning::NoRepositoriesFound);
            return outcome;
        }

        let selected = repos.len().min(config.max_repositories);
        tracing::info!(
            "Discovery returned {} repositories, processing {}",
            repos.len(),
            selected
        );

        let staging = StagingManager::new(config.staging_dir.clone(), self.host.clone());
        for descriptor in repos.iter().take(config.max_repositories) {
            let span = tracing::info_span!("repository", name = %descriptor.name);
            self.process_repository(config, &staging, descriptor, &mut outcome)
                .instrument(span)
                .await;
        }

        tracing::info!(
            "✅ Run completed: attempted={}, skipped={}, uploaded={}, discarded={}, errors={}",
            outcome.repositories_attempted,
            outcome.repositories_skipped,
            outcome.files_uploaded,
            outcome.files_discarded,
            outcome.errors.len()
        );
        outcome
    }

    async fn process_repository(
        &self,
        config: &IngestConfig,
        staging: &StagingManager,
        descriptor: &RepoDescriptor,
        outcome: &mut RunOutcome,
    ) {
        let handle = match staging.stage(descriptor).await {
            Ok(StageOutcome::AlreadyStaged(_)) => {
                outcome.repositories_skipped += 1;
                return;
            }
            Ok(StageOutcome::Staged(handle)) => {
                outcome.repositories_attempted += 1;
                handle
            }
            Err(err) => {
                outcome.repositories_attempted += 1;
                tracing::warn!("{}", err);
                outcome.errors.push(err.into_record(Some(&descriptor.name)));
                // a failed clone may have left a partial tree behind
                if let Ok(handle) = staging.handle_for(descriptor) {
                    teardown(staging, &handle, outcome).await;
                }
                return;
            }
        };

        self.route_files(config, staging, &handle, outcome).await;
        teardown(staging, &handle, outcome).await;
    }

    async fn route_files(
        &self,
        config: &IngestConfig,
        staging: &StagingManager,
        handle: &StagingHandle,
        outcome: &mut RunOutcome,
    ) {
        let tree = staging.files(handle).await;
        for err in tree.errors {
            tracing::warn!("{}", err);
            outcome.errors.push(err.into_record(Some(&handle.repo_name)));
        }

        let (mut uploaded, mut discarded) = (0usize, 0usize);

        // links are discarded unread
        for link in &tree.links {
            match discard(link).await {
                Ok(()) => discarded += 1,
                Err(err) => {
                    tracing::warn!("{}", err);
                    outcome.errors.push(err.into_record(Some(&handle.repo_name)));
                }
            }
        }

        for path in &tree.files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default();

            let partition = match classify(&file_name) {
                Classification::Route(p) if config.routes_to(p) => Some(p),
                _ => None,
            };

            let result = match partition {
                Some(partition) => self.gateway.upload(path, partition).await.map(|_| {
                    uploaded += 1;
                }),
                None => discard(path).await.map(|_| {
                    discarded += 1;
                }),
            };

            if let Err(err) = result {
                tracing::warn!("{}", err);
                outcome.errors.push(err.into_record(Some(&handle.repo_name)));
            }
        }

        tracing::info!(
            "Processed {}: {} uploaded, {} discarded",
            handle.repo_name,
            uploaded,
            discarded
        );
        outcome.files_uploaded += uploaded;
        outcome.files_discarded += discarded;
    }
}

async fn teardown(staging: &StagingManager, handle: &StagingHandle, outcome: &mut RunOutcome) {
    if let Err(err) = staging.teardown(handle).await {
        tracing::warn!("{}", err);
        outcome.errors.push(err.into_record(Some(&handle.repo_name)));
    }
}

async fn discard(path: &Path) -> crate::error::Result<()> {
    tokio::fs::remove_file(path)
        .await
        .map_err(|source| IngestError::StagingIo {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!("Deleted unneeded file: {}", path.display());
    Ok(())
}
