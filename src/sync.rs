use core::{
    future::{poll_fn, Future},
    task::Poll,
};

use portable_atomic::{AtomicU8, AtomicUsize, Ordering};

use atomic_waker::AtomicWaker;

use crate::frame::{TxFailure, TxStatus};

/// Allows awaiting the final status of a frame.
///
/// The signal is set from whichever context completes the frame, which may be the confirmation
/// path.
pub struct TxDoneSignal {
    state: AtomicU8,
    waker: AtomicWaker,
}
impl TxDoneSignal {
    const PENDING: u8 = 0;
    const ACKNOWLEDGED: u8 = 1;
    const FAILED_BASE: u8 = 0x10;

    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(Self::PENDING),
            waker: AtomicWaker::new(),
        }
    }
    const fn encode(status: TxStatus) -> u8 {
        match status {
            TxStatus::Acknowledged => Self::ACKNOWLEDGED,
            TxStatus::Failed(failure) => {
                Self::FAILED_BASE
                    + match failure {
                        TxFailure::Rejected => 0,
                        TxFailure::AllocationFailed => 1,
                        TxFailure::SubmissionFailed => 2,
                        TxFailure::NotAcknowledged => 3,
                        TxFailure::RetryLimitReached => 4,
                        TxFailure::Flushed => 5,
                        TxFailure::QueueRemoved => 6,
                    }
            }
        }
    }
    const fn decode(state: u8) -> TxStatus {
        TxStatus::Failed(match state {
            Self::ACKNOWLEDGED => return TxStatus::Acknowledged,
            0x10 => TxFailure::Rejected,
            0x11 => TxFailure::AllocationFailed,
            0x12 => TxFailure::SubmissionFailed,
            0x13 => TxFailure::NotAcknowledged,
            0x14 => TxFailure::RetryLimitReached,
            0x15 => TxFailure::Flushed,
            _ => TxFailure::QueueRemoved,
        })
    }
    pub fn reset(&self) {
        self.state.store(Self::PENDING, Ordering::Relaxed);
    }
    pub fn signal(&self, status: TxStatus) {
        self.state.store(Self::encode(status), Ordering::Release);
        self.waker.wake();
    }
    /// Returns the status, if the frame has already completed.
    pub fn try_take(&self) -> Option<TxStatus> {
        let state = self.state.swap(Self::PENDING, Ordering::Acquire);
        (state != Self::PENDING).then(|| Self::decode(state))
    }
    pub fn wait(&self) -> impl Future<Output = TxStatus> + use<'_> {
        poll_fn(|cx| {
            self.waker.register(cx.waker());
            match self.try_take() {
                Some(status) => Poll::Ready(status),
                None => Poll::Pending,
            }
        })
    }
}
impl Default for TxDoneSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts refill events, so a sender can back off until a TXQ has credits again.
///
/// Every [SignalQueue::put] lets exactly one call to [SignalQueue::next] complete, even if nobody
/// was waiting at the time.
pub struct SignalQueue {
    waker: AtomicWaker,
    pending: AtomicUsize,
}
impl SignalQueue {
    pub const fn new() -> Self {
        Self {
            waker: AtomicWaker::new(),
            pending: AtomicUsize::new(0),
        }
    }
    /// Record one refill and wake the waiter.
    pub fn put(&self) {
        self.pending.fetch_add(1, Ordering::Release);
        self.waker.wake();
    }
    /// Forget all refills, that weren't consumed yet.
    pub fn reset(&self) {
        self.pending.store(0, Ordering::Relaxed);
    }
    /// The number of refills, that weren't consumed yet.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }
    /// Wait for a refill and consume it.
    pub async fn next(&self) {
        poll_fn(|cx| {
            self.waker.register(cx.waker());
            match self
                .pending
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
                    pending.checked_sub(1)
                }) {
                Ok(_) => Poll::Ready(()),
                Err(_) => Poll::Pending,
            }
        })
        .await
    }
}
impl Default for SignalQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::{block_on, poll_once};

    #[test]
    fn done_signal_round_trips_every_status() {
        let signal = TxDoneSignal::new();
        assert_eq!(signal.try_take(), None);
        for status in [
            TxStatus::Acknowledged,
            TxStatus::Failed(TxFailure::Rejected),
            TxStatus::Failed(TxFailure::RetryLimitReached),
            TxStatus::Failed(TxFailure::QueueRemoved),
        ] {
            signal.signal(status);
            assert_eq!(block_on(signal.wait()), status);
            assert_eq!(signal.try_take(), None);
        }
    }

    #[test]
    fn signal_queue_counts() {
        let queue = SignalQueue::new();
        assert!(poll_once(queue.next()).is_pending());
        queue.put();
        queue.put();
        assert_eq!(queue.pending(), 2);
        block_on(queue.next());
        assert_eq!(queue.pending(), 1);
        queue.reset();
        assert!(poll_once(queue.next()).is_pending());
    }
}
