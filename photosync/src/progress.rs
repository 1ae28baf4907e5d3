//! Console rendering of a sync run with indicatif bars.

use std::collections::HashMap;
use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::sync::{Counters, ItemAction, SyncObserver};

const TOTAL_TEMPLATE: &str = "{msg:>8} [{bar:30.cyan/blue}] {pos}/{len}";
const ITEM_TEMPLATE: &str =
    "{msg:>24!} [{bar:30.green/dim}] {binary_bytes}/{binary_total_bytes} {binary_bytes_per_sec}";

pub struct ConsoleObserver {
    multi: MultiProgress,
    total: Mutex<Option<ProgressBar>>,
    items: Mutex<HashMap<String, ProgressBar>>,
}

impl ConsoleObserver {
    /// Bars are drawn only below info verbosity, where log lines would
    /// otherwise interleave with them.
    pub fn new(verbosity: u8) -> Self {
        let target = if verbosity < 2 {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        Self {
            multi: MultiProgress::with_draw_target(target),
            total: Mutex::new(None),
            items: Mutex::new(HashMap::new()),
        }
    }

    fn style(template: &str) -> ProgressStyle {
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }

    fn finish_total(&self) {
        if let Ok(mut total) = self.total.lock() {
            if let Some(bar) = total.take() {
                bar.finish_and_clear();
            }
        }
    }
}

impl SyncObserver for ConsoleObserver {
    fn listing_received(&self, items: usize) {
        let bar = self.multi.add(ProgressBar::new(items as u64));
        bar.set_style(Self::style(TOTAL_TEMPLATE));
        bar.set_message("Total");
        if let Ok(mut total) = self.total.lock() {
            *total = Some(bar);
        }
    }

    fn item_started(&self, name: &str, declared_size: u64) {
        if declared_size == 0 {
            return;
        }
        let bar = self.multi.add(ProgressBar::new(declared_size));
        bar.set_style(Self::style(ITEM_TEMPLATE));
        bar.set_message(name.to_string());
        if let Ok(mut items) = self.items.lock() {
            items.insert(name.to_string(), bar);
        }
    }

    fn bytes_transferred(&self, name: &str, so_far: u64, _declared_size: u64) {
        if let Ok(items) = self.items.lock() {
            if let Some(bar) = items.get(name) {
                bar.set_position(so_far);
            }
        }
    }

    fn item_finished(&self, name: &str, _action: ItemAction) {
        if let Ok(mut items) = self.items.lock() {
            if let Some(bar) = items.remove(name) {
                bar.finish_and_clear();
                self.multi.remove(&bar);
            }
        }
        if let Ok(total) = self.total.lock() {
            if let Some(bar) = total.as_ref() {
                bar.inc(1);
            }
        }
    }

    fn download_finished(&self, counters: &Counters) {
        self.finish_total();
        println!("{counters}");
    }

    fn removal_started(&self) {
        println!("Checking for missing photos…");
    }
}
