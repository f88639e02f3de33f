//! Decoding of transmit confirmations.
//!
//! For every descriptor handed to the firmware, exactly one confirmation comes back, which
//! carries the host ID of the descriptor and a status word. Apart from the outcome, the status
//! word also carries the credits to return to the TXQ and, for retries, the sequence number to
//! reuse.
use bitfield_struct::bitfield;

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct ConfirmationStatus {
    /// The firmware is done with the descriptor.
    pub done: bool,
    /// The frame was acknowledged by the receiver.
    pub acknowledged: bool,
    /// The hardware needs the frame to be resent, e.g. because a block-ack bit was lost.
    pub retry_required: bool,
    /// The frame was sent, but not acknowledged and may be retried by software.
    pub sw_retry_required: bool,
    /// Credits to return to the TXQ of the frame.
    #[bits(8)]
    pub credits: u8,
    /// The sequence number to reuse for a retransmission.
    #[bits(12)]
    pub sn: u16,
    #[bits(8)]
    pub __: u8,
}

/// What the confirmation means for the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxOutcome {
    /// The firmware hasn't processed the descriptor yet.
    NotDone,
    Acknowledged,
    RetryRequired { sn: u16 },
    SwRetryRequired { sn: u16 },
    Failed,
}
impl TxOutcome {
    /// Classify the status word.
    ///
    /// Acknowledgement takes precedence over the retry bits, and a hardware retry takes
    /// precedence over a software retry.
    pub fn classify(status: ConfirmationStatus) -> Self {
        if status.acknowledged() {
            Self::Acknowledged
        } else if status.retry_required() {
            Self::RetryRequired { sn: status.sn() }
        } else if status.sw_retry_required() {
            Self::SwRetryRequired { sn: status.sn() }
        } else if status.done() {
            Self::Failed
        } else {
            Self::NotDone
        }
    }
    /// Check if the frame goes back into its TXQ.
    pub const fn is_retry(&self) -> bool {
        matches!(
            self,
            Self::RetryRequired { .. } | Self::SwRetryRequired { .. }
        )
    }
}
