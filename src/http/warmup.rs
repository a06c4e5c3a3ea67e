use async_trait::async_trait;
use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::feed::cache::{Fragment, FragmentCache, FragmentKey};
use crate::feed::serializer::check_fragment;

#[derive(Error, Debug)]
pub enum WarmUpError {
    #[error("Error reading fragments from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Warm-up '{name}' failed: {reason}")]
    Failed { name: String, reason: String },
}

/// Work that must finish before a feed request is served.
#[async_trait]
pub trait WarmUp: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self) -> Result<(), WarmUpError>;
}

/// Runs every warm-up concurrently and fails on the first error.
pub async fn run_all(warm_ups: &[Arc<dyn WarmUp>]) -> Result<(), WarmUpError> {
    try_join_all(warm_ups.iter().map(|warm_up| async move {
        debug!("running warm-up '{}'", warm_up.name());
        warm_up.run().await
    }))
    .await?;
    Ok(())
}

/// Loads pre-rendered `<slug>.xml` item fragments from a directory into the
/// fragment cache. Files that are not a single well-formed `<item>` are skipped.
pub struct FragmentPrimer {
    dir: PathBuf,
    namespace: String,
    cache: Arc<dyn FragmentCache>,
}

impl FragmentPrimer {
    pub fn new(dir: impl Into<PathBuf>, namespace: &str, cache: Arc<dyn FragmentCache>) -> Self {
        Self {
            dir: dir.into(),
            namespace: namespace.to_string(),
            cache,
        }
    }

    fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> WarmUpError + '_ {
        move |source| WarmUpError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait]
impl WarmUp for FragmentPrimer {
    fn name(&self) -> &str {
        "fragment-primer"
    }

    async fn run(&self) -> Result<(), WarmUpError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(Self::io_error(&self.dir))?;

        let mut primed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(Self::io_error(&self.dir))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("xml") {
                continue;
            }
            let Some(slug) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let fragment = tokio::fs::read_to_string(&path)
                .await
                .map_err(Self::io_error(&path))?;
            let fragment = fragment.trim();
            if let Err(e) = check_fragment(fragment) {
                warn!("skipping fragment {}: {}", path.display(), e);
                continue;
            }
            let key = FragmentKey::new(self.namespace.clone(), slug.to_string());
            self.cache.put(key, Fragment::from(fragment)).await;
            primed += 1;
        }

        info!("primed {} fragments from {}", primed, self.dir.display());
        Ok(())
    }
}
