//! In-place progress line shared by all workers. Thread-safe: state is a
//! pair of atomics and every redraw is a single write.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

pub struct Progress {
    total: u64,
    current: AtomicU64,
    stopped: AtomicBool,
    started: Instant,
}

impl Progress {
    pub fn new(total: u64) -> Progress {
        Progress {
            total,
            current: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            started: Instant::now(),
        }
    }

    /// Jump the counter forward, e.g. to pre-position at a start index.
    pub fn add(&self, n: u64) {
        self.current.fetch_add(n, Ordering::Relaxed);
        self.draw();
    }

    /// Called exactly once per fully processed candidate.
    pub fn increment(&self) {
        self.add(1);
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    /// Finish the line and reset terminal formatting. Idempotent; redraws
    /// after this are dropped.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            eprintln!("\x1b[0m");
            let _ = io::stderr().flush();
        }
    }

    fn draw(&self) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }

        let current = self.current();
        let percent = if self.total > 0 {
            current as f64 / self.total as f64 * 100.0
        } else {
            100.0
        };

        eprint!(
            "\rProgress {current}/{} ({percent:.1}%) | {}s elapsed",
            self.total,
            self.started.elapsed().as_secs()
        );
        let _ = io::stderr().flush();
    }
}
