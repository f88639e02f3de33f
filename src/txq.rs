//! Software transmit queues.
//!
//! There is one [TxQueue] per destination and access category. The destination is either a
//! station, or for frames that aren't addressed to an associated station (group addressed
//! frames, management frames before association), the VIF itself.
//!
//! Each queue holds two lists: the retry list, which contains frames that the firmware asked us
//! to retransmit, and the pending list, which contains fresh frames in the order they were
//! enqueued. The retry list is always drained first, so a retransmission never gets overtaken
//! by newer traffic, while frames that were already pending stay in their original order.
use alloc::{collections::VecDeque, vec::Vec};

use macro_bits::{bit, check_bit, serializable_enum};

use crate::{classify::AccessCategory, frame::TxFrame, TxError, TxResult};

/// Modulus of 802.11 sequence numbers.
const SN_MODULUS: u16 = 1 << 12;

/// The destination of a TXQ.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxqTarget {
    Sta(u8),
    Vif(u8),
}

/// Identifies a TXQ.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxqId {
    pub target: TxqTarget,
    pub ac: AccessCategory,
}
impl TxqId {
    pub const fn sta(sta: u8, ac: AccessCategory) -> Self {
        Self {
            target: TxqTarget::Sta(sta),
            ac,
        }
    }
    pub const fn vif(vif: u8, ac: AccessCategory) -> Self {
        Self {
            target: TxqTarget::Vif(vif),
            ac,
        }
    }
}

serializable_enum! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    /// Why a TXQ is stopped.
    ///
    /// A queue can be stopped for multiple reasons at once, and only runs once all of them are
    /// cleared.
    pub enum StopReason: u8 {
        /// The queue ran out of credits.
        Full => 0,
        /// The hardware ring had no room for the last descriptor.
        RingFull => 1,
        /// The station is in power save.
        StaPowerSave => 2,
        /// The VIF is in power save.
        VifPowerSave => 3,
        /// A channel switch is in progress.
        ChannelSwitch => 4,
        /// The queue doesn't accept any new frames.
        Disabled => 5,
        /// The descriptor pool was exhausted.
        NoDescriptors => 6
    }
}
impl StopReason {
    const fn mask(self) -> u8 {
        bit!(self.into_bits())
    }
    /// Check if this reason also closes the queue for new frames.
    ///
    /// All other reasons just hold back frames, until the queue is started again.
    pub const fn blocks_admission(self) -> bool {
        matches!(self, Self::Disabled)
    }
}

/// A per destination and access category transmit queue.
#[derive(Debug)]
pub struct TxQueue {
    id: TxqId,
    generation: u32,
    pending: VecDeque<TxFrame>,
    retries: VecDeque<TxFrame>,
    credits: u16,
    max_credits: u16,
    stop_mask: u8,
    backlog_limit: usize,
    next_sn: [u16; 8],
}
impl TxQueue {
    /// Create a new queue with `credits` credits.
    ///
    /// The generation distinguishes this queue from earlier queues with the same ID.
    pub fn new(id: TxqId, generation: u32, credits: u8, backlog_limit: usize) -> Self {
        Self {
            id,
            generation,
            pending: VecDeque::new(),
            retries: VecDeque::new(),
            credits: credits as u16,
            max_credits: credits as u16,
            // A queue without credits is full from the start.
            stop_mask: if credits == 0 {
                StopReason::Full.mask()
            } else {
                0
            },
            backlog_limit,
            next_sn: [0; 8],
        }
    }
    pub const fn id(&self) -> TxqId {
        self.id
    }
    pub const fn generation(&self) -> u32 {
        self.generation
    }
    pub const fn credits(&self) -> u16 {
        self.credits
    }
    pub const fn max_credits(&self) -> u16 {
        self.max_credits
    }
    /// The number of frames held by this queue.
    pub fn len(&self) -> usize {
        self.pending.len() + self.retries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.retries.is_empty()
    }
    /// The number of frames waiting for retransmission.
    pub fn retry_len(&self) -> usize {
        self.retries.len()
    }
    pub const fn is_stopped(&self) -> bool {
        self.stop_mask != 0
    }
    pub const fn is_stopped_by(&self, reason: StopReason) -> bool {
        check_bit!(self.stop_mask, reason.mask())
    }
    /// Check if [TxQueue::try_submit] would yield a frame.
    pub fn is_runnable(&self) -> bool {
        !self.is_stopped() && self.credits > 0 && !self.is_empty()
    }

    /// Append a frame to the tail of the queue.
    ///
    /// If the queue is closed or the backlog is exceeded, the frame is handed back.
    pub fn enqueue(&mut self, frame: TxFrame) -> Result<(), (TxError, TxFrame)> {
        if self.is_stopped_by(StopReason::Disabled) {
            return Err((TxError::QueueStopped, frame));
        }
        if self.len() >= self.backlog_limit {
            debug!(
                "TXQ for AC {} is over its backlog of {} frames.",
                self.id.ac.index(),
                self.backlog_limit
            );
            return Err((TxError::QueueFull, frame));
        }
        self.pending.push_back(frame);
        Ok(())
    }
    /// Take the next frame for submission.
    ///
    /// No credit is consumed here, call [TxQueue::consume_credit] once the frame was handed to
    /// the hardware.
    pub fn try_submit(&mut self) -> Option<TxFrame> {
        if self.is_stopped() || self.credits == 0 {
            return None;
        }
        self.retries
            .pop_front()
            .or_else(|| self.pending.pop_front())
    }
    /// Account for a frame, that was handed to the hardware.
    pub fn consume_credit(&mut self) {
        self.credits = self.credits.saturating_sub(1);
        if self.credits == 0 {
            trace!("TXQ for AC {} is out of credits.", self.id.ac.index());
            self.stop_mask |= StopReason::Full.mask();
        }
    }
    /// Return `count` credits to the queue.
    ///
    /// The first value is `true`, if the queue had no credits before and has some now. Credits
    /// beyond the maximum of the queue are discarded and reported as [TxError::CreditOverflow]
    /// in the second value. The refill happens either way.
    pub fn return_credits(&mut self, count: u16) -> (bool, TxResult<()>) {
        let was_empty = self.credits == 0;
        let credits = self.credits.saturating_add(count);
        let report = if credits > self.max_credits {
            let excess = credits - self.max_credits;
            warn!(
                "{} credits too many returned to TXQ for AC {}.",
                excess,
                self.id.ac.index()
            );
            Err(TxError::CreditOverflow { excess })
        } else {
            Ok(())
        };
        self.credits = credits.min(self.max_credits);
        let refilled = was_empty && self.credits > 0;
        if refilled {
            self.stop_mask &= !StopReason::Full.mask();
        }
        (refilled, report)
    }
    /// Apply a credit update from the firmware.
    ///
    /// This moves both the maximum and the current credit count by `offset`, but never below
    /// zero. Returns `true`, if the queue had no credits before and has some now.
    pub fn update_credits(&mut self, offset: i8) -> bool {
        let was_empty = self.credits == 0;
        let apply = |value: u16| value.saturating_add_signed(offset as i16);
        self.max_credits = apply(self.max_credits);
        self.credits = apply(self.credits).min(self.max_credits);
        if self.credits == 0 {
            self.stop_mask |= StopReason::Full.mask();
            false
        } else {
            self.stop_mask &= !StopReason::Full.mask();
            was_empty
        }
    }
    pub fn stop(&mut self, reason: StopReason) {
        trace!(
            "Stopping TXQ for AC {}, reason: {}.",
            self.id.ac.index(),
            reason.into_bits()
        );
        self.stop_mask |= reason.mask();
    }
    /// Clear a stop reason.
    ///
    /// Returns `true`, if this was the last reason, that kept the queue stopped.
    pub fn start(&mut self, reason: StopReason) -> bool {
        let was_stopped = self.is_stopped();
        self.stop_mask &= !reason.mask();
        was_stopped && !self.is_stopped()
    }
    /// Reinsert a frame, that is to be retransmitted.
    ///
    /// It is placed behind any other retransmissions, but in front of all pending frames.
    pub fn requeue_head(&mut self, frame: TxFrame) {
        self.retries.push_back(frame);
    }
    /// Put back a frame, that was taken with [TxQueue::try_submit], but couldn't be handed to
    /// the hardware.
    pub fn return_head(&mut self, frame: TxFrame) {
        if frame.reuse_sn().is_some() {
            self.retries.push_front(frame);
        } else if self.retries.is_empty() {
            self.pending.push_front(frame);
        } else {
            // Can't happen, since retries are always taken first, but don't reorder if it does.
            self.retries.push_back(frame);
        }
    }
    /// Remove all frames from the queue.
    pub fn flush(&mut self) -> Vec<TxFrame> {
        self.retries.drain(..).chain(self.pending.drain(..)).collect()
    }
    /// Allocate the next sequence number for `tid`.
    pub fn next_sn(&mut self, tid: u8) -> u16 {
        let slot = &mut self.next_sn[tid as usize & 0b111];
        let sn = *slot;
        *slot = (sn + 1) % SN_MODULUS;
        sn
    }
}
