use super::classify::ItemAction;
use super::pipeline::Counters;

/// Hooks the engine calls while it works. Every method has a no-op default so
/// renderers only implement what they show.
pub trait SyncObserver: Send + Sync {
    fn listing_received(&self, _items: usize) {}

    fn item_started(&self, _name: &str, _declared_size: u64) {}

    /// Called after every chunk written for `name`.
    fn bytes_transferred(&self, _name: &str, _so_far: u64, _declared_size: u64) {}

    fn item_finished(&self, _name: &str, _action: ItemAction) {}

    /// Called once the download phase completed successfully.
    fn download_finished(&self, _counters: &Counters) {}

    fn removal_started(&self) {}
}

pub struct NoopObserver;

impl SyncObserver for NoopObserver {}
