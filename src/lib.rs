//! # `wifi-txq`
//! This is the software transmit path of a Wi-Fi link-layer driver. It sits between the network
//! stack, which hands us frames, and the firmware, which owns the actual transmit ring.
//! ## Overview
//! This chapter will give a short overview of how a frame travels through the pipeline.
//!
//! ### Admission
//! Every frame is first classified into one of the four WMM access categories, based on the
//! priority bits of its IP header (or VLAN tag). Authentication and management frames always go
//! out as voice. If the AP demands admission control for that category, the frame is moved to
//! the next lower one. The frame is then appended to the software TX queue (TXQ) for its
//! destination and access category. There is one TXQ per station and access category, and one
//! per VIF and access category for frames, that aren't addressed to a station.
//!
//! ### Submission
//! Each TXQ has a number of credits, which correspond to the number of frames the firmware is
//! willing to accept for it. As long as credits are left, frames are taken from the TXQ,
//! wrapped into a [TxDescriptor] and pushed into the [TxRing]. A credit is only consumed, once
//! the ring took the descriptor. If the ring is full, the frame stays at the head of the TXQ
//! until [TxPipeline::ring_space_available] is called.
//!
//! ### Confirmation
//! For every descriptor, the firmware sends a confirmation, which is passed to
//! [TxPipeline::confirm] together with a [ConfirmationStatus]. This may happen from an
//! interrupt handler. The status word tells us how many credits to return and whether the
//! frame was acknowledged, has to be resent by the hardware (for example because a block-ack
//! bit was lost), may be retried by software, or failed. Retransmissions are put back in front
//! of all pending frames of their TXQ and reuse the sequence number from the status word.
//! Software retries are limited by [TxConfig::max_sw_retry], hardware retries aren't.
//!
//! ### Completion
//! Every frame passed to [TxPipeline::transmit] is completed exactly once, either with a
//! callback or through a [TxDoneSignal], that can be awaited. This also holds for frames that
//! were rejected, flushed because their station disassociated, or that were in flight while
//! their TXQ was torn down.
//!
//! ### Power save
//! The [TrafficDetector] counts the frames in flight per VIF and access category, so the power
//! save logic can find out, whether the VIF is idle.
//!
//! ## Locking
//! All state shared between the enqueue and the confirmation context is protected by a blocking
//! mutex from `embassy-sync`. By default, this is a [NoopRawMutex](embassy_sync::blocking_mutex::raw::NoopRawMutex),
//! which is fine if everything runs in the same context. With the `critical_section` feature
//! enabled, a [CriticalSectionRawMutex](embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex)
//! is used, which is safe to take from interrupts.

#![no_std]
pub(crate) mod fmt;

extern crate alloc;
#[cfg(test)]
extern crate std;

mod classify;
mod config;
mod confirm;
mod descriptor;
mod frame;
mod pipeline;
mod ring;
mod sync;
mod traffic;
mod txq;

pub use classify::*;
pub use config::TxConfig;
pub use confirm::{ConfirmationStatus, TxOutcome};
pub use descriptor::*;
pub use frame::*;
pub use pipeline::*;
pub use ring::*;
pub use sync::*;
pub use traffic::*;
pub use txq::*;

#[cfg(not(feature = "critical_section"))]
type DefaultRawMutex = embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(feature = "critical_section")]
type DefaultRawMutex = embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
