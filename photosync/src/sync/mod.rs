pub mod classify;
pub mod observer;
pub mod paths;
pub mod pipeline;
pub mod removal;
mod run;
pub mod transfer;

pub use classify::{Classification, ItemAction, classify};
pub use observer::{NoopObserver, SyncObserver};
pub use pipeline::{
    Counters, DownloadPipeline, OwnershipSet, PipelineOptions, PipelineOutcome, SyncError,
};
pub use removal::{
    DeletionFailure, LocalEntry, RemovalError, RemovalOutcome, RemovalReconciler, RemovalReport,
};
pub use run::{RunError, RunOptions, RunReport, run};
pub use transfer::{TransferError, copy_to_path};
