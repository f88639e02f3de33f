//! Transmit descriptors.
//!
//! A [TxDescriptor] is what the firmware gets to see of a frame. It contains a scatter-gather
//! list pointing into the segments of the frame, the addressing information and a set of flags.
//! The descriptor owns the frame, so the segment addresses stay valid for as long as the
//! descriptor lives.
use alloc::vec::Vec;

use crate::{
    classify::AccessCategory,
    frame::{FrameKind, MacAddress, TxFrame},
};

/// Identifies a descriptor handed to the firmware, which echoes it back in the confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HostId(pub u32);

/// One entry of the scatter-gather list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Segment {
    /// Address of the first byte.
    pub addr: usize,
    pub len: u16,
}

/// Flags passed to the firmware along with the descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DescriptorFlags {
    pub management: bool,
    /// The frame was already transmitted at least once.
    pub retry: bool,
    /// The firmware must use [TxDescriptor::sn] instead of assigning a new sequence number.
    pub reuse_sn: bool,
    pub more_data: bool,
    pub no_encrypt: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AllocError {
    /// The frame has more segments, than the hardware supports.
    TooManySegments,
    /// A single segment is longer, than a descriptor can express.
    SegmentTooLong,
    /// There is nothing to transmit.
    EmptyFrame,
    /// The descriptor pool or the heap is exhausted.
    OutOfMemory,
}

/// The hand-off record for one frame.
#[derive(Debug)]
pub struct TxDescriptor {
    host_id: HostId,
    segments: Vec<Segment>,
    pub destination: MacAddress,
    pub source: MacAddress,
    pub ethertype: u16,
    pub vif: u8,
    pub sta: Option<u8>,
    pub tid: u8,
    pub ac: AccessCategory,
    /// The 802.11 sequence number.
    pub sn: u16,
    pub flags: DescriptorFlags,
    frame: TxFrame,
}
impl TxDescriptor {
    pub const fn host_id(&self) -> HostId {
        self.host_id
    }
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
    /// The total length of the frame.
    pub fn len(&self) -> usize {
        self.segments.iter().map(|segment| segment.len as usize).sum()
    }
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
    pub const fn frame(&self) -> &TxFrame {
        &self.frame
    }
}

/// Builds descriptors and keeps track of how many are outstanding.
///
/// The pool has a fixed size. A descriptor is returned to the pool, once it is released with
/// [DescriptorAllocator::release].
#[derive(Debug)]
pub struct DescriptorAllocator {
    max_segments: usize,
    capacity: usize,
    outstanding: usize,
}
impl DescriptorAllocator {
    pub const fn new(max_segments: usize, capacity: usize) -> Self {
        Self {
            max_segments,
            capacity,
            outstanding: 0,
        }
    }
    /// The number of descriptors currently handed out.
    pub const fn outstanding(&self) -> usize {
        self.outstanding
    }
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
    pub const fn max_segments(&self) -> usize {
        self.max_segments
    }
    /// Build a descriptor for `frame`.
    ///
    /// If the frame carries a sequence number to reuse, that one takes precedence over `sn`. On
    /// error, the frame is handed back, so the caller can release it.
    pub fn build(
        &mut self,
        frame: TxFrame,
        sn: u16,
        host_id: HostId,
    ) -> Result<TxDescriptor, (AllocError, TxFrame)> {
        let segment_count = frame.segments().iter().filter(|s| !s.is_empty()).count();
        if segment_count == 0 {
            return Err((AllocError::EmptyFrame, frame));
        }
        if segment_count > self.max_segments {
            error!(
                "Frame has {} segments, but only {} are supported.",
                segment_count,
                self.max_segments
            );
            return Err((AllocError::TooManySegments, frame));
        }
        if frame
            .segments()
            .iter()
            .any(|segment| segment.len() > u16::MAX as usize)
        {
            return Err((AllocError::SegmentTooLong, frame));
        }
        if self.outstanding >= self.capacity {
            debug!("Descriptor pool exhausted.");
            return Err((AllocError::OutOfMemory, frame));
        }
        let mut segments = Vec::new();
        if segments.try_reserve_exact(segment_count).is_err() {
            return Err((AllocError::OutOfMemory, frame));
        }
        segments.extend(
            frame
                .segments()
                .iter()
                .filter(|segment| !segment.is_empty())
                .map(|segment| Segment {
                    addr: segment.as_ptr() as usize,
                    len: segment.len() as u16,
                }),
        );
        self.outstanding += 1;

        let flags = DescriptorFlags {
            management: frame.kind() == FrameKind::Management,
            retry: frame.reuse_sn().is_some(),
            reuse_sn: frame.reuse_sn().is_some(),
            more_data: frame.more_data(),
            no_encrypt: frame.no_encrypt(),
        };
        Ok(TxDescriptor {
            host_id,
            segments,
            destination: frame.destination(),
            source: frame.source(),
            ethertype: frame.ethertype(),
            vif: frame.vif(),
            sta: frame.sta(),
            tid: frame.tid(),
            ac: frame.ac(),
            sn: frame.reuse_sn().unwrap_or(sn),
            flags,
            frame,
        })
    }
    /// Destroy the descriptor and return the frame it owned.
    pub fn release(&mut self, descriptor: TxDescriptor) -> TxFrame {
        self.outstanding = self.outstanding.saturating_sub(1);
        descriptor.frame
    }
}
