//! Build progress reporting. Purely observational: nothing here affects what
//! gets built.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Receives progress notifications from [`crate::build::SiteBuilder`].
pub trait Progress: Send + Sync {
    /// Called once enumeration is done, with the number of source files.
    fn start(&self, total: usize);

    /// Called after each source file has been handled.
    fn advance(&self);

    /// Called before output files are written.
    fn writing(&self, count: usize);

    /// Called when the build has written every output.
    fn finish(&self, written: usize);
}

/// Reports progress through the `log` facade.
#[derive(Debug, Default)]
pub struct LogProgress {
    total: AtomicUsize,
    done: AtomicUsize,
}

impl LogProgress {
    pub fn new() -> LogProgress {
        LogProgress::default()
    }

    /// The number of source files handled so far.
    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}

impl Progress for LogProgress {
    fn start(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.done.store(0, Ordering::Relaxed);
        log::info!("Building {} source files", total);
    }

    fn advance(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!("[{}/{}]", done, self.total.load(Ordering::Relaxed));
    }

    fn writing(&self, count: usize) {
        log::info!("Writing {} files", count);
    }

    fn finish(&self, written: usize) {
        log::info!("Wrote {} files", written);
    }
}

/// Discards all notifications.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&self, _total: usize) {}
    fn advance(&self) {}
    fn writing(&self, _count: usize) {}
    fn finish(&self, _written: usize) {}
}
