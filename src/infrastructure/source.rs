use crate::config::IngestConfig;
use crate::services::source::{CodeHost, GitHubHost};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

pub fn setup_source(config: &IngestConfig) -> Result<Arc<dyn CodeHost>> {
    let host = GitHubHost::new(&config.github, config.clone_depth)?;

    info!(
        "🐙 GitHub source: {} ({})",
        config.github.api_url,
        if config.github.token.is_some() {
            "token"
        } else {
            "anonymous"
        }
    );

    Ok(Arc::new(host))
}
