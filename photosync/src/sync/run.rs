use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use super::observer::SyncObserver;
use super::pipeline::{Counters, DownloadPipeline, PipelineOptions, SyncError};
use super::removal::{LocalEntry, RemovalError, RemovalReconciler, RemovalReport};
use crate::remote::{RemoteError, RemoteLibrary};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to list remote library: {0}")]
    Listing(#[source] RemoteError),
    #[error(transparent)]
    Download(#[from] SyncError),
    #[error(transparent)]
    Removal(#[from] RemovalError),
}

impl RunError {
    /// True when the remote rejected the session, during listing or while
    /// opening an item.
    pub fn is_auth_expired(&self) -> bool {
        match self {
            RunError::Listing(err) => matches!(err, RemoteError::AuthExpired(_)),
            RunError::Download(err) => err.is_auth_expired(),
            RunError::Removal(_) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub destination: PathBuf,
    pub pipeline: PipelineOptions,
    /// Delete local files the remote no longer lists.
    pub remove: bool,
}

#[derive(Debug)]
pub struct RunReport {
    pub counters: Counters,
    pub removal: Option<RemovalReport>,
}

/// Lists the remote library, downloads into the destination and, when
/// enabled, offers to remove what the remote no longer has. Removal is only
/// reached after the download phase returned successfully.
pub async fn run<R, F>(
    remote: &R,
    options: &RunOptions,
    observer: &dyn SyncObserver,
    confirm: F,
) -> Result<RunReport, RunError>
where
    R: RemoteLibrary,
    F: FnOnce(&[LocalEntry]) -> bool,
{
    let listing = remote.list_items().await.map_err(RunError::Listing)?;
    info!(items = listing.len(), "remote listing received");

    let outcome = DownloadPipeline::new(remote, options.pipeline.clone())
        .with_observer(observer)
        .run(&listing, &options.destination)
        .await?;
    observer.download_finished(&outcome.counters);

    let removal = if options.remove {
        observer.removal_started();
        Some(RemovalReconciler::reconcile(&options.destination, &outcome.ownership, confirm).await?)
    } else {
        None
    };

    Ok(RunReport {
        counters: outcome.counters,
        removal,
    })
}
