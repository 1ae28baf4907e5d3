use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream;
use thiserror::Error;
use tracing::{debug, warn};

use super::classify::{Classification, ItemAction, classify};
use super::observer::{NoopObserver, SyncObserver};
use super::paths::PathError;
use super::transfer::{TransferError, copy_to_path};
use crate::remote::{RemoteError, RemoteItem, RemoteLibrary};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid target for '{name}': {source}")]
    Path {
        name: String,
        #[source]
        source: PathError,
    },
    #[error("failed to open '{name}': {source}")]
    Open {
        name: String,
        #[source]
        source: RemoteError,
    },
    #[error("failed to transfer '{name}': {source}")]
    Transfer {
        name: String,
        #[source]
        source: TransferError,
    },
}

impl SyncError {
    pub fn item_name(&self) -> &str {
        match self {
            SyncError::Path { name, .. }
            | SyncError::Open { name, .. }
            | SyncError::Transfer { name, .. } => name,
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            SyncError::Open {
                source: RemoteError::AuthExpired(_),
                ..
            }
        )
    }
}

/// Local paths the remote listing accounts for in this run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OwnershipSet {
    paths: HashSet<PathBuf>,
}

impl OwnershipSet {
    /// Returns false when the path was already claimed.
    pub(crate) fn claim(&mut self, path: PathBuf) -> bool {
        self.paths.insert(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for OwnershipSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub downloaded: u64,
    pub overwritten: u64,
    pub skipped: u64,
    pub total: u64,
}

impl Counters {
    fn record(&mut self, action: ItemAction) {
        match action {
            ItemAction::SkipExisting => self.skipped += 1,
            ItemAction::DownloadNew => self.downloaded += 1,
            ItemAction::OverwriteExisting => self.overwritten += 1,
        }
        self.total += 1;
    }
}

impl fmt::Display for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Downloaded: {} | Skipped: {} | Overwritten: {} | Total: {}",
            self.downloaded, self.skipped, self.overwritten, self.total
        )
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub overwrite: bool,
    /// Maximum number of transfers in flight.
    pub concurrency: usize,
    /// Limit for opening and copying a single item. `None` waits forever.
    pub item_timeout: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            concurrency: 1,
            item_timeout: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub ownership: OwnershipSet,
    pub counters: Counters,
}

struct Job<'l> {
    item: &'l RemoteItem,
    target: PathBuf,
    action: ItemAction,
}

pub struct DownloadPipeline<'a, R> {
    remote: &'a R,
    options: PipelineOptions,
    observer: &'a dyn SyncObserver,
}

impl<'a, R: RemoteLibrary> DownloadPipeline<'a, R> {
    pub fn new(remote: &'a R, options: PipelineOptions) -> Self {
        Self {
            remote,
            options,
            observer: &NoopObserver,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn SyncObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Brings `destination` in line with `listing`.
    ///
    /// Items are classified in listing order. The first failing transfer stops
    /// the run; transfers still in flight at that point are dropped.
    pub async fn run(
        &self,
        listing: &[RemoteItem],
        destination: &Path,
    ) -> Result<PipelineOutcome, SyncError> {
        let mut ownership = OwnershipSet::default();
        let mut counters = Counters::default();
        let mut jobs = Vec::new();

        self.observer.listing_received(listing.len());
        for item in listing {
            let Classification { target, mut action } =
                classify(destination, item, self.options.overwrite).map_err(|source| {
                    SyncError::Path {
                        name: item.name.clone(),
                        source,
                    }
                })?;

            if !ownership.claim(target.clone()) {
                warn!(
                    name = %item.name,
                    target = %target.display(),
                    "duplicate target in listing, keeping the first item"
                );
                action = ItemAction::SkipExisting;
            }

            if action == ItemAction::SkipExisting {
                debug!("Skipping existing '{}'", item.name);
                counters.record(action);
                self.observer.item_finished(&item.name, action);
                continue;
            }
            jobs.push(Job {
                item,
                target,
                action,
            });
        }

        let mut transfers = stream::iter(jobs)
            .map(|job| self.transfer(job))
            .buffer_unordered(self.options.concurrency.max(1));
        while let Some(result) = transfers.next().await {
            counters.record(result?);
        }

        debug!(owned = ownership.len(), "download pipeline finished");
        Ok(PipelineOutcome {
            ownership,
            counters,
        })
    }

    async fn transfer(&self, job: Job<'_>) -> Result<ItemAction, SyncError> {
        let Job {
            item,
            target,
            action,
        } = job;
        match action {
            ItemAction::OverwriteExisting => debug!("Overwriting existing '{}'", item.name),
            _ => debug!("Downloading '{}'", item.name),
        }
        self.observer.item_started(&item.name, item.size);

        let work = async {
            let source = self
                .remote
                .open_content(item)
                .await
                .map_err(|source| SyncError::Open {
                    name: item.name.clone(),
                    source,
                })?;
            copy_to_path(source, &target, item.size, |so_far, declared| {
                self.observer.bytes_transferred(&item.name, so_far, declared)
            })
            .await
            .map_err(|source| SyncError::Transfer {
                name: item.name.clone(),
                source,
            })
        };

        let result = match self.options.item_timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(result) => result,
                Err(_) => Err(SyncError::Transfer {
                    name: item.name.clone(),
                    source: TransferError::TimedOut(limit),
                }),
            },
            None => work.await,
        };
        let written = result?;

        debug!(name = %item.name, written, "transfer complete");
        self.observer.item_finished(&item.name, action);
        Ok(action)
    }
}
