// Single-writer double-buffer cell for publishing multi-field state across
// execution contexts as one atomic unit.
//
// Both sides run inside a critical section: the writer fills the spare
// buffer and flips the ready index, readers copy the ready buffer. On the
// single-core target each masked window is one struct copy; pending edge
// interrupts stay latched in the NVIC during it, so no edges are lost. In
// host builds the critical-section implementation serializes writer and
// readers the same way, so the guarantee holds under threads too.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Double-buffered cell carrying a `Copy` snapshot from exactly one writer
/// context to any number of reader contexts.
///
/// Contract: all `publish` calls come from a single context (or contexts
/// that cannot preempt each other); readers may run anywhere. Every access
/// happens inside a critical section, so a reader can never observe a
/// half-written tuple.
pub struct SnapshotCell<T> {
    buffers: [UnsafeCell<T>; 2],
    ready: AtomicUsize, // Index of the buffer holding the last published value
}

// Safety: every buffer access (writer fill, reader copy) happens inside
// `critical_section::with`, which guarantees mutual exclusion both on the
// interrupt-masked single-core target and through the std implementation's
// global lock in host builds.
unsafe impl<T: Copy + Send> Sync for SnapshotCell<T> {}

impl<T: Copy> SnapshotCell<T> {
    /// Creates a cell pre-published with `initial` (readers before the
    /// first `publish` see it).
    pub const fn new(initial: T) -> Self {
        Self {
            buffers: [UnsafeCell::new(initial), UnsafeCell::new(initial)],
            ready: AtomicUsize::new(0),
        }
    }

    /// Publishes a complete new value. The masked window is one struct
    /// copy; never blocks on the embedded target, safe in ISR context.
    pub fn publish(&self, value: T) {
        critical_section::with(|_| {
            let spare = 1 - self.ready.load(Ordering::Relaxed);
            // Sole writer: the spare buffer is not the one readers copy from.
            unsafe { *self.buffers[spare].get() = value };
            self.ready.store(spare, Ordering::Release);
        })
    }

    /// Copies out the last published value as one consistent unit.
    pub fn read(&self) -> T {
        critical_section::with(|_| {
            let idx = self.ready.load(Ordering::Acquire);
            unsafe { *self.buffers[idx].get() }
        })
    }
}
