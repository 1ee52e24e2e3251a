//! Progress bar for the consumer side of a demo run.

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

pub type ProgressBar = Arc<Mutex<Bar>>;

/// Bar sized to the number of items expected on the output channel.
pub fn create_progress_bar(total: usize, desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = total,
        desc = desc,
        animation = Animation::Classic,
        unit = " items"
    )))
}

/// Advance by `n`. Uses try_lock so the consumer never waits on a contended bar.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.update(n);
    }
}

/// Final refresh so the bar shows the settled count before the summary prints.
pub fn finish_progress_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.lock() {
        let _ = bar.refresh();
        eprintln!();
    }
}
