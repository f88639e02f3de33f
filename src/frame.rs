use alloc::{boxed::Box, sync::Arc, vec::Vec};
use core::fmt;

use embassy_time::Instant;

use crate::{classify::AccessCategory, sync::TxDoneSignal};

/// A 48-bit IEEE 802 MAC address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacAddress(pub [u8; 6]);
impl MacAddress {
    pub const BROADCAST: Self = Self([0xff; 6]);
    pub const ZERO: Self = Self([0x00; 6]);

    /// Check if this is a group address, i.e. multicast or broadcast.
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameKind {
    #[default]
    Data,
    Management,
}

/// Why a frame couldn't be delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxFailure {
    /// The TXQ didn't admit the frame.
    Rejected,
    /// No descriptor could be built for the frame.
    AllocationFailed,
    /// The hardware refused the descriptor.
    SubmissionFailed,
    /// The firmware gave up on the frame.
    NotAcknowledged,
    /// The software retry budget is exhausted.
    RetryLimitReached,
    /// The frame was still queued, when its TXQ was torn down.
    Flushed,
    /// The TXQ was torn down, while the frame was in flight.
    QueueRemoved,
}

/// The final status of a frame, which is passed to its completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxStatus {
    Acknowledged,
    Failed(TxFailure),
}
impl TxStatus {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Acknowledged)
    }
}

/// Something to notify, once the frame has reached its final status.
enum Completion {
    Callback(Box<dyn FnOnce(TxStatus) + Send>),
    Signal(Arc<TxDoneSignal>),
}

/// An outbound frame.
///
/// Frames are move-only and owned by exactly one stage of the pipeline at a time. The payload is
/// kept as a list of segments, which are handed to the hardware as a scatter-gather list.
/// Completing a frame consumes it, so the completion can't fire twice.
pub struct TxFrame {
    segments: Vec<Vec<u8>>,
    destination: MacAddress,
    source: MacAddress,
    ethertype: u16,
    vif: u8,
    sta: Option<u8>,
    kind: FrameKind,
    no_encrypt: bool,
    more_data: bool,

    // Set by the pipeline.
    pub(crate) ac: AccessCategory,
    pub(crate) tid: u8,
    pub(crate) sw_retries: u8,
    pub(crate) hw_retries: u8,
    pub(crate) reuse_sn: Option<u16>,
    pub(crate) enqueued_at: Option<Instant>,

    completion: Option<Completion>,
}
impl TxFrame {
    /// Create a new data frame for VIF zero, without a station.
    pub fn new(destination: MacAddress, ethertype: u16, segments: Vec<Vec<u8>>) -> Self {
        Self {
            segments,
            destination,
            source: MacAddress::ZERO,
            ethertype,
            vif: 0,
            sta: None,
            kind: FrameKind::Data,
            no_encrypt: false,
            more_data: false,
            ac: AccessCategory::BestEffort,
            tid: 0,
            sw_retries: 0,
            hw_retries: 0,
            reuse_sn: None,
            enqueued_at: None,
            completion: None,
        }
    }
    pub fn with_source(mut self, source: MacAddress) -> Self {
        self.source = source;
        self
    }
    /// Transmit the frame on the specified virtual interface.
    pub fn with_vif(mut self, vif: u8) -> Self {
        self.vif = vif;
        self
    }
    /// Transmit the frame to a station.
    ///
    /// Frames without a station end up on the TXQ of their VIF.
    pub fn with_sta(mut self, sta: u8) -> Self {
        self.sta = Some(sta);
        self
    }
    pub fn with_no_encrypt(mut self, no_encrypt: bool) -> Self {
        self.no_encrypt = no_encrypt;
        self
    }
    pub fn with_more_data(mut self, more_data: bool) -> Self {
        self.more_data = more_data;
        self
    }
    pub fn into_management(mut self) -> Self {
        self.kind = FrameKind::Management;
        self
    }
    /// Call `callback` once the frame reached its final status.
    pub fn with_callback(mut self, callback: impl FnOnce(TxStatus) + Send + 'static) -> Self {
        self.completion = Some(Completion::Callback(Box::new(callback)));
        self
    }
    /// Signal the final status through `signal`.
    pub fn with_signal(mut self, signal: Arc<TxDoneSignal>) -> Self {
        self.completion = Some(Completion::Signal(signal));
        self
    }

    pub fn segments(&self) -> &[Vec<u8>] {
        &self.segments
    }
    /// The first segment, or an empty slice, if there are no segments.
    pub fn head_segment(&self) -> &[u8] {
        self.segments.first().map(Vec::as_slice).unwrap_or_default()
    }
    /// The total length of all segments.
    pub fn len(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub const fn destination(&self) -> MacAddress {
        self.destination
    }
    pub const fn source(&self) -> MacAddress {
        self.source
    }
    pub const fn ethertype(&self) -> u16 {
        self.ethertype
    }
    pub const fn vif(&self) -> u8 {
        self.vif
    }
    pub const fn sta(&self) -> Option<u8> {
        self.sta
    }
    pub const fn kind(&self) -> FrameKind {
        self.kind
    }
    pub const fn no_encrypt(&self) -> bool {
        self.no_encrypt
    }
    pub const fn more_data(&self) -> bool {
        self.more_data
    }
    pub const fn ac(&self) -> AccessCategory {
        self.ac
    }
    pub const fn tid(&self) -> u8 {
        self.tid
    }
    /// The number of software retries, this frame went through.
    pub const fn sw_retries(&self) -> u8 {
        self.sw_retries
    }
    /// The number of times, the hardware asked for this frame to be resent.
    pub const fn hw_retries(&self) -> u8 {
        self.hw_retries
    }
    /// The sequence number to reuse, if the frame is a retransmission.
    pub const fn reuse_sn(&self) -> Option<u16> {
        self.reuse_sn
    }
    pub const fn enqueued_at(&self) -> Option<Instant> {
        self.enqueued_at
    }

    /// Mark the frame for retransmission with the sequence number `sn`.
    pub(crate) fn prepare_retry(&mut self, sn: u16) {
        self.reuse_sn = Some(sn);
        self.more_data = false;
    }

    /// Notify the completion and release the frame.
    pub(crate) fn complete(mut self, status: TxStatus) {
        match self.completion.take() {
            Some(Completion::Callback(callback)) => callback(status),
            Some(Completion::Signal(signal)) => signal.signal(status),
            None => {}
        }
    }
}
impl fmt::Debug for TxFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxFrame")
            .field("len", &self.len())
            .field("destination", &self.destination)
            .field("ethertype", &self.ethertype)
            .field("vif", &self.vif)
            .field("sta", &self.sta)
            .field("kind", &self.kind)
            .field("ac", &self.ac)
            .field("tid", &self.tid)
            .field("sw_retries", &self.sw_retries)
            .field("reuse_sn", &self.reuse_sn)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use portable_atomic::{AtomicUsize, Ordering};

    #[test]
    fn length_spans_segments() {
        let frame = TxFrame::new(
            MacAddress::BROADCAST,
            0x0800,
            vec![vec![0u8; 14], vec![1u8; 100], vec![]],
        );
        assert_eq!(frame.len(), 114);
        assert_eq!(frame.head_segment().len(), 14);
        assert!(TxFrame::new(MacAddress::ZERO, 0x0800, vec![]).is_empty());
    }

    #[test]
    fn completion_fires_once_with_status() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let frame = TxFrame::new(MacAddress::BROADCAST, 0x0800, vec![vec![0x45]]).with_callback(
            |status| {
                assert_eq!(status, TxStatus::Failed(TxFailure::Flushed));
                CALLS.fetch_add(1, Ordering::Relaxed);
            },
        );
        frame.complete(TxStatus::Failed(TxFailure::Flushed));
        assert_eq!(CALLS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn retry_clears_more_data() {
        let mut frame =
            TxFrame::new(MacAddress::BROADCAST, 0x0800, vec![vec![0x45]]).with_more_data(true);
        frame.prepare_retry(42);
        assert_eq!(frame.reuse_sn(), Some(42));
        assert!(!frame.more_data());
    }

    #[test]
    fn multicast_bit() {
        assert!(MacAddress::BROADCAST.is_multicast());
        assert!(!MacAddress([0x02, 0, 0, 0, 0, 1]).is_multicast());
    }
}
