//! Traffic detection for power save.
//!
//! The power save logic may only put the radio to sleep, if no frames are in flight for a VIF.
//! The counters here are incremented when a frame is admitted to a TXQ and decremented when the
//! frame reaches its final status. Both happen from different contexts, so the counters live in
//! a blocking mutex, which with the `critical_section` feature is safe to take from interrupts.
use alloc::vec::Vec;
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{self, raw::RawMutex};

use crate::{classify::AccessCategory, DefaultRawMutex, TxError, TxResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct TrafficEntry {
    total: usize,
    per_ac: [usize; AccessCategory::COUNT],
}

/// A consistent view of the counters of one VIF.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrafficSnapshot {
    /// Frames in flight over all access categories.
    pub total: usize,
    /// Frames in flight per access category, indexed by [AccessCategory::index].
    pub per_ac: [usize; AccessCategory::COUNT],
    /// Whether video or voice frames are in flight.
    pub vi_or_vo_active: bool,
}

/// In-flight frame counters for all VIFs.
pub struct TrafficDetector<M: RawMutex = DefaultRawMutex> {
    entries: blocking_mutex::Mutex<M, RefCell<Vec<TrafficEntry>>>,
}
impl<M: RawMutex> TrafficDetector<M> {
    pub fn new(vif_count: usize) -> Self {
        let mut entries = Vec::new();
        entries.resize(vif_count, TrafficEntry::default());
        Self {
            entries: blocking_mutex::Mutex::new(RefCell::new(entries)),
        }
    }
    fn with_entry<R>(&self, vif: u8, f: impl FnOnce(&mut TrafficEntry) -> R) -> TxResult<R> {
        self.entries.lock(|entries| {
            entries
                .borrow_mut()
                .get_mut(vif as usize)
                .map(f)
                .ok_or(TxError::InterfaceOutOfBounds)
        })
    }
    /// Count a frame as in flight.
    pub fn record(&self, vif: u8, ac: AccessCategory) -> TxResult<()> {
        self.with_entry(vif, |entry| {
            entry.total += 1;
            entry.per_ac[ac.index()] += 1;
        })
    }
    /// Count a frame as no longer in flight.
    ///
    /// # Panics
    /// If there is no frame in flight for this VIF and access category. That means a frame was
    /// released twice, which must never happen.
    pub fn release(&self, vif: u8, ac: AccessCategory) -> TxResult<()> {
        self.with_entry(vif, |entry| {
            let (Some(total), Some(per_ac)) = (
                entry.total.checked_sub(1),
                entry.per_ac[ac.index()].checked_sub(1),
            ) else {
                panic!(
                    "Traffic detector underflow on VIF {} AC {}: frame released twice.",
                    vif,
                    ac.index()
                );
            };
            entry.total = total;
            entry.per_ac[ac.index()] = per_ac;
        })
    }
    /// Read the counters of a VIF.
    pub fn snapshot(&self, vif: u8) -> TxResult<TrafficSnapshot> {
        self.with_entry(vif, |entry| TrafficSnapshot {
            total: entry.total,
            per_ac: entry.per_ac,
            vi_or_vo_active: entry.per_ac[AccessCategory::Video.index()] != 0
                || entry.per_ac[AccessCategory::Voice.index()] != 0,
        })
    }
    /// Check if the VIF has nothing in flight and may go to sleep.
    pub fn is_idle(&self, vif: u8) -> TxResult<bool> {
        self.with_entry(vif, |entry| entry.total == 0)
    }
}
