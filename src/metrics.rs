//! Minimal in-process metrics scaffolding.
//!
//! No external exposition format is in scope; these counters exist so tests
//! and optional periodic debug logging can observe aggregate behavior
//! (dispatches, drops, stuck detections, repairs) without threading extra
//! state through the scheduler.
use std::sync::atomic::{AtomicU64, Ordering};

static DISPATCHES_TOTAL: AtomicU64 = AtomicU64::new(0);
static DISPATCHES_DROPPED: AtomicU64 = AtomicU64::new(0);
static QUEUE_OVERFLOW_DROPS: AtomicU64 = AtomicU64::new(0);
static STUCK_DETECTED: AtomicU64 = AtomicU64::new(0);
static REPAIRS_SUCCEEDED: AtomicU64 = AtomicU64::new(0);
static REPAIRS_FAILED: AtomicU64 = AtomicU64::new(0);
static ARRIVALS_TOTAL: AtomicU64 = AtomicU64::new(0);

pub fn inc_dispatches_total() {
    DISPATCHES_TOTAL.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_dispatches_dropped() {
    DISPATCHES_DROPPED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_queue_overflow_drops() {
    QUEUE_OVERFLOW_DROPS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_stuck_detected() {
    STUCK_DETECTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_repairs_succeeded() {
    REPAIRS_SUCCEEDED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_repairs_failed() {
    REPAIRS_FAILED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_arrivals_total() {
    ARRIVALS_TOTAL.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub dispatches_total: u64,
    pub dispatches_dropped: u64,
    pub queue_overflow_drops: u64,
    pub stuck_detected: u64,
    pub repairs_succeeded: u64,
    pub repairs_failed: u64,
    pub arrivals_total: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        dispatches_total: DISPATCHES_TOTAL.load(Ordering::Relaxed),
        dispatches_dropped: DISPATCHES_DROPPED.load(Ordering::Relaxed),
        queue_overflow_drops: QUEUE_OVERFLOW_DROPS.load(Ordering::Relaxed),
        stuck_detected: STUCK_DETECTED.load(Ordering::Relaxed),
        repairs_succeeded: REPAIRS_SUCCEEDED.load(Ordering::Relaxed),
        repairs_failed: REPAIRS_FAILED.load(Ordering::Relaxed),
        arrivals_total: ARRIVALS_TOTAL.load(Ordering::Relaxed),
    }
}
