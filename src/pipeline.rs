use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{self, raw::RawMutex};
use embassy_time::Instant;

use crate::{
    classify::{classify, downgrade, user_priority, AccessCategory},
    confirm::{ConfirmationStatus, TxOutcome},
    descriptor::{AllocError, DescriptorAllocator, HostId, TxDescriptor},
    frame::{TxFailure, TxFrame, TxStatus},
    ring::{SubmitError, TxRing},
    sync::{SignalQueue, TxDoneSignal},
    traffic::{TrafficDetector, TrafficSnapshot},
    txq::{StopReason, TxQueue, TxqId, TxqTarget},
    DefaultRawMutex, TxConfig,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxError {
    /// The TXQ holds too many frames.
    QueueFull,
    /// The TXQ is closed for new frames.
    QueueStopped,
    Alloc(AllocError),
    Submit(SubmitError),
    /// No descriptor with this host ID is in flight.
    UnknownHostId,
    /// The confirmation doesn't carry a final status.
    NotDone,
    InterfaceOutOfBounds,
    StationOutOfBounds,
    /// There is no TXQ for this destination and access category.
    NoSuchQueue,
    /// More credits were returned, than the TXQ ever had.
    CreditOverflow { excess: u16 },
}
impl From<AllocError> for TxError {
    fn from(value: AllocError) -> Self {
        Self::Alloc(value)
    }
}
impl From<SubmitError> for TxError {
    fn from(value: SubmitError) -> Self {
        Self::Submit(value)
    }
}

pub type TxResult<T> = Result<T, TxError>;

/// A descriptor, that was handed to the hardware.
struct InFlight {
    descriptor: TxDescriptor,
    txq: TxqId,
    generation: u32,
}

/// Frames, which reached their final status while the state was locked.
///
/// They are completed once the lock is released, so completions may call back into the
/// pipeline.
type Completions = Vec<(TxFrame, TxStatus)>;

/// Everything, that is touched by both the enqueue and the confirmation context.
struct TxState<R> {
    ring: R,
    allocator: DescriptorAllocator,
    txqs: BTreeMap<TxqId, TxQueue>,
    in_flight: BTreeMap<HostId, InFlight>,
    /// The VIF each station belongs to.
    sta_vif: BTreeMap<u8, u8>,
    /// Stop reasons set on a VIF, which also apply to queues created later.
    vif_stops: BTreeMap<u8, Vec<StopReason>>,
    next_generation: u32,
    next_host_id: u32,
}
impl<R: TxRing> TxState<R> {
    fn new_txq(id: TxqId, generation: u32, stops: &[StopReason], config: &TxConfig) -> TxQueue {
        let mut txq = TxQueue::new(
            id,
            generation,
            config.nominal_credits,
            config.backlog_limit(),
        );
        for reason in stops {
            txq.stop(*reason);
        }
        txq
    }
    /// Get the TXQ for `id`, creating the queues for all access categories of the target if
    /// they don't exist yet.
    fn txq_or_insert(&mut self, id: TxqId, vif: u8, config: &TxConfig) -> &mut TxQueue {
        let generation = self.next_generation;
        let stops = self.vif_stops.get(&vif).cloned().unwrap_or_default();
        if !self.txqs.contains_key(&id) {
            if let TxqTarget::Sta(sta) = id.target {
                self.sta_vif.insert(sta, vif);
            }
            for ac in AccessCategory::ALL.into_iter().filter(|ac| *ac != id.ac) {
                let id = TxqId { ac, ..id };
                self.txqs
                    .insert(id, Self::new_txq(id, generation, &stops, config));
            }
            debug!("Created TXQs for VIF {}, generation {}.", vif, generation);
            self.next_generation = generation.wrapping_add(1);
        }
        self.txqs
            .entry(id)
            .or_insert_with(|| Self::new_txq(id, generation, &stops, config))
    }
    fn allocate_host_id(&mut self) -> HostId {
        loop {
            let host_id = HostId(self.next_host_id);
            self.next_host_id = self.next_host_id.wrapping_add(1);
            if !self.in_flight.contains_key(&host_id) {
                return host_id;
            }
        }
    }
    /// Check if the queue is still the one, the frame was taken from.
    fn live_txq(&mut self, id: TxqId, generation: u32) -> Option<&mut TxQueue> {
        self.txqs
            .get_mut(&id)
            .filter(|txq| txq.generation() == generation)
    }
    /// The IDs of all queues of the targets belonging to `vif`.
    fn vif_txq_ids(&self, vif: u8) -> Vec<TxqId> {
        self.txqs
            .keys()
            .filter(|id| match id.target {
                TxqTarget::Vif(target) => target == vif,
                TxqTarget::Sta(sta) => self.sta_vif.get(&sta) == Some(&vif),
            })
            .copied()
            .collect()
    }
    fn sta_txq_ids(&self, sta: u8) -> Vec<TxqId> {
        AccessCategory::ALL
            .into_iter()
            .map(|ac| TxqId::sta(sta, ac))
            .filter(|id| self.txqs.contains_key(id))
            .collect()
    }
}

/// The software transmit pipeline.
///
/// This is the context object, that owns all TXQs, the descriptors in flight and the traffic
/// counters. Frames enter through [TxPipeline::transmit] and leave through their completion,
/// which is invoked exactly once for every frame passed to the pipeline. The hardware reports
/// the outcome of every descriptor through [TxPipeline::confirm], which may be called from an
/// interrupt handler, if the raw mutex is interrupt safe.
pub struct TxPipeline<R: TxRing, M: RawMutex = DefaultRawMutex> {
    config: TxConfig,
    state: blocking_mutex::Mutex<M, RefCell<TxState<R>>>,
    traffic: TrafficDetector<M>,
    credit_signal: SignalQueue,
}
impl<R: TxRing, M: RawMutex> TxPipeline<R, M> {
    pub fn new(ring: R, config: TxConfig) -> Self {
        debug!(
            "Initializing TX pipeline with {} credits per TXQ and {} descriptors.",
            config.nominal_credits,
            config.descriptor_pool
        );
        Self {
            config,
            state: blocking_mutex::Mutex::new(RefCell::new(TxState {
                ring,
                allocator: DescriptorAllocator::new(config.max_segments, config.descriptor_pool),
                txqs: BTreeMap::new(),
                in_flight: BTreeMap::new(),
                sta_vif: BTreeMap::new(),
                vif_stops: BTreeMap::new(),
                next_generation: 0,
                next_host_id: 0,
            })),
            traffic: TrafficDetector::new(config.vif_count),
            credit_signal: SignalQueue::new(),
        }
    }
    pub const fn config(&self) -> &TxConfig {
        &self.config
    }
    /// Run `f` with exclusive access to the state.
    fn with_state<T>(&self, f: impl FnOnce(&mut TxState<R>, &mut Completions) -> T) -> T {
        let mut completions = Completions::new();
        let result = self
            .state
            .lock(|state| f(&mut state.borrow_mut(), &mut completions));
        for (frame, status) in completions {
            frame.complete(status);
        }
        result
    }
    /// Run `f` with the hardware ring.
    ///
    /// This is mostly useful for inspecting test doubles.
    pub fn with_ring<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        self.with_state(|state, _| f(&mut state.ring))
    }
    fn check_vif(&self, vif: u8) -> TxResult<()> {
        if (vif as usize) < self.config.vif_count {
            Ok(())
        } else {
            Err(TxError::InterfaceOutOfBounds)
        }
    }
    fn check_sta(&self, sta: u8) -> TxResult<()> {
        if (sta as usize) < self.config.sta_count {
            Ok(())
        } else {
            Err(TxError::StationOutOfBounds)
        }
    }
    /// Take the frame out of the traffic counters.
    fn release_traffic(&self, frame: &TxFrame) {
        let released = self.traffic.release(frame.vif(), frame.ac());
        debug_assert!(
            released.is_ok(),
            "Frame on VIF {} was admitted without traffic counters.",
            frame.vif()
        );
    }
    /// Release a frame, that was admitted, but won't be transmitted.
    fn drop_frame(&self, frame: TxFrame, failure: TxFailure, completions: &mut Completions) {
        self.release_traffic(&frame);
        completions.push((frame, TxStatus::Failed(failure)));
    }
    /// Put a frame back at the head of its TXQ and stop the queue, until `reason` is cleared.
    fn hold_back(
        &self,
        state: &mut TxState<R>,
        id: TxqId,
        frame: TxFrame,
        reason: StopReason,
        completions: &mut Completions,
    ) {
        match state.txqs.get_mut(&id) {
            Some(txq) => {
                txq.return_head(frame);
                txq.stop(reason);
            }
            None => self.drop_frame(frame, TxFailure::QueueRemoved, completions),
        }
    }
    /// Start all TXQs, that are stopped by `reason`, and submit their frames.
    fn restart_stopped(
        &self,
        state: &mut TxState<R>,
        reason: StopReason,
        completions: &mut Completions,
    ) {
        let ids = state
            .txqs
            .values()
            .filter(|txq| txq.is_stopped_by(reason))
            .map(TxQueue::id)
            .collect::<Vec<_>>();
        for id in ids {
            let Some(txq) = state.txqs.get_mut(&id) else {
                continue;
            };
            if txq.start(reason) {
                self.kick(state, id, completions);
            }
        }
    }

    /// Submit a frame for transmission.
    ///
    /// The frame is classified, admitted to its TXQ and handed to the hardware, if the TXQ has
    /// credits left. An error is returned, if the frame wasn't admitted. In any case, the final
    /// status is also reported through the completion of the frame.
    pub fn transmit(&self, mut frame: TxFrame) -> TxResult<()> {
        let admissible = self
            .check_vif(frame.vif())
            .and_then(|_| frame.sta().map_or(Ok(()), |sta| self.check_sta(sta)));
        if let Err(err) = admissible {
            frame.complete(TxStatus::Failed(TxFailure::Rejected));
            return Err(err);
        }

        let ac = classify(&frame);
        let downgraded = downgrade(ac, self.config.acm_bitmap);
        frame.ac = downgraded;
        frame.tid = if downgraded == ac {
            user_priority(&frame)
        } else {
            downgraded.default_tid()
        };
        frame.enqueued_at = Some(Instant::now());

        let (vif, id) = (
            frame.vif(),
            match frame.sta() {
                Some(sta) => TxqId::sta(sta, downgraded),
                None => TxqId::vif(frame.vif(), downgraded),
            },
        );
        self.with_state(|state, completions| {
            match state.txq_or_insert(id, vif, &self.config).enqueue(frame) {
                Ok(()) => {
                    let recorded = self.traffic.record(vif, downgraded);
                    debug_assert!(
                        recorded.is_ok(),
                        "VIF {} passed the bounds check, but has no traffic counters.",
                        vif
                    );
                }
                Err((err, frame)) => {
                    completions.push((frame, TxStatus::Failed(TxFailure::Rejected)));
                    return Err(err);
                }
            }
            self.kick(state, id, completions);
            Ok(())
        })
    }
    /// Submit a frame and wait for its final status.
    ///
    /// Any completion previously attached to the frame is replaced.
    pub async fn transmit_async(&self, frame: TxFrame) -> TxStatus {
        let signal = Arc::new(TxDoneSignal::new());
        // Errors are also reported through the signal.
        let _ = self.transmit(frame.with_signal(signal.clone()));
        signal.wait().await
    }

    /// Hand frames from the TXQ to the hardware, until it runs out of credits or frames.
    fn kick(&self, state: &mut TxState<R>, id: TxqId, completions: &mut Completions) {
        loop {
            let Some(txq) = state.txqs.get_mut(&id) else {
                return;
            };
            let Some(frame) = txq.try_submit() else {
                return;
            };
            let sn = match frame.reuse_sn() {
                Some(sn) => sn,
                None => txq.next_sn(frame.tid()),
            };
            let generation = txq.generation();
            let host_id = state.allocate_host_id();
            let descriptor = match state.allocator.build(frame, sn, host_id) {
                Ok(descriptor) => descriptor,
                Err((AllocError::OutOfMemory, frame)) => {
                    debug!("Out of descriptors, holding back TXQ.");
                    self.hold_back(state, id, frame, StopReason::NoDescriptors, completions);
                    return;
                }
                Err((err, frame)) => {
                    warn!("Failed to build descriptor: {:?}. Dropping frame.", err);
                    self.drop_frame(frame, TxFailure::AllocationFailed, completions);
                    continue;
                }
            };
            match state.ring.push(&descriptor) {
                Ok(()) => {
                    trace!(
                        "Submitted frame with host ID {} and SN {}.",
                        host_id.0,
                        descriptor.sn
                    );
                    if let Some(txq) = state.txqs.get_mut(&id) {
                        txq.consume_credit();
                    }
                    state.in_flight.insert(
                        host_id,
                        InFlight {
                            descriptor,
                            txq: id,
                            generation,
                        },
                    );
                }
                Err(SubmitError::RingFull) => {
                    trace!("Ring full, holding back TXQ.");
                    let frame = state.allocator.release(descriptor);
                    self.hold_back(state, id, frame, StopReason::RingFull, completions);
                    return;
                }
                Err(SubmitError::Hardware) => {
                    error!("Hardware refused descriptor {}.", host_id.0);
                    let frame = state.allocator.release(descriptor);
                    self.drop_frame(frame, TxFailure::SubmissionFailed, completions);
                }
            }
        }
    }

    /// Process a confirmation from the hardware.
    ///
    /// Depending on the status, the frame is either completed or put back at the head of its
    /// TXQ for retransmission. Credits carried by the status are returned to the TXQ, if it still
    /// exists.
    pub fn confirm(&self, host_id: HostId, status: ConfirmationStatus) -> TxResult<()> {
        let outcome = TxOutcome::classify(status);
        self.with_state(|state, completions| {
            if outcome == TxOutcome::NotDone {
                return if state.in_flight.contains_key(&host_id) {
                    Err(TxError::NotDone)
                } else {
                    Err(TxError::UnknownHostId)
                };
            }
            let Some(InFlight {
                descriptor,
                txq: id,
                generation,
            }) = state.in_flight.remove(&host_id)
            else {
                warn!("Confirmation for unknown host ID {}.", host_id.0);
                return Err(TxError::UnknownHostId);
            };
            let mut frame = state.allocator.release(descriptor);

            let mut result = Ok(());
            let mut refilled = false;
            let txq = state.live_txq(id, generation);
            match txq {
                Some(txq) if status.credits() > 0 => {
                    (refilled, result) = txq.return_credits(status.credits() as u16);
                }
                Some(_) => {}
                None => debug!("TXQ of host ID {} is gone.", host_id.0),
            }
            // The frame gets requeued, if the outcome is a retry and the TXQ is still alive.
            let retry_sn = match outcome {
                TxOutcome::Acknowledged => {
                    if let Some(enqueued_at) = frame.enqueued_at() {
                        trace!(
                            "Host ID {} acknowledged after {} us.",
                            host_id.0,
                            enqueued_at.elapsed().as_micros()
                        );
                    }
                    self.release_traffic(&frame);
                    completions.push((frame, TxStatus::Acknowledged));
                    None
                }
                TxOutcome::RetryRequired { sn } => {
                    frame.hw_retries = frame.hw_retries.saturating_add(1);
                    Some((frame, sn))
                }
                TxOutcome::SwRetryRequired { sn } => {
                    frame.sw_retries = frame.sw_retries.saturating_add(1);
                    if frame.sw_retries >= self.config.max_sw_retry {
                        debug!(
                            "Host ID {} reached the retry limit of {}.",
                            host_id.0,
                            self.config.max_sw_retry
                        );
                        self.drop_frame(frame, TxFailure::RetryLimitReached, completions);
                        None
                    } else {
                        Some((frame, sn))
                    }
                }
                // NotDone was handled above.
                _ => {
                    self.drop_frame(frame, TxFailure::NotAcknowledged, completions);
                    None
                }
            };
            if let Some((mut frame, sn)) = retry_sn {
                match state.live_txq(id, generation) {
                    Some(txq) => {
                        debug!("Retransmitting host ID {} with SN {}.", host_id.0, sn);
                        frame.prepare_retry(sn);
                        txq.requeue_head(frame);
                    }
                    None => self.drop_frame(frame, TxFailure::QueueRemoved, completions),
                }
            }
            if state.live_txq(id, generation).is_some() {
                self.kick(state, id, completions);
            }
            // A descriptor went back to the pool.
            self.restart_stopped(state, StopReason::NoDescriptors, completions);
            if refilled {
                self.credit_signal.put();
            }
            result
        })
    }

    /// Return credits to a TXQ.
    pub fn return_credits(&self, id: TxqId, count: u16) -> TxResult<()> {
        let (refilled, report) = self.with_state(|state, completions| {
            let txq = state.txqs.get_mut(&id).ok_or(TxError::NoSuchQueue)?;
            let returned = txq.return_credits(count);
            self.kick(state, id, completions);
            Ok::<_, TxError>(returned)
        })?;
        if refilled {
            self.credit_signal.put();
        }
        report
    }
    /// Apply a credit update indication from the firmware.
    ///
    /// These are sent, when the firmware changes the number of frames it accepts for a station
    /// and TID, e.g. after a block-ack agreement was set up.
    pub fn credits_update(&self, sta: u8, tid: u8, offset: i8) -> TxResult<()> {
        self.check_sta(sta)?;
        let id = TxqId::sta(sta, AccessCategory::from_user_priority(tid));
        let refilled = self.with_state(|state, completions| {
            let txq = state.txqs.get_mut(&id).ok_or(TxError::NoSuchQueue)?;
            let refilled = txq.update_credits(offset);
            debug!(
                "Credit update for STA {} TID {}: {}, now {}.",
                sta,
                tid,
                offset,
                txq.credits()
            );
            self.kick(state, id, completions);
            Ok::<_, TxError>(refilled)
        })?;
        if refilled {
            self.credit_signal.put();
        }
        Ok(())
    }
    /// Wait until credits were returned to a TXQ, that had run dry.
    ///
    /// This is meant for callers, that got [TxError::QueueFull] and want to back off.
    pub async fn wait_for_credits(&self) {
        self.credit_signal.next().await
    }

    fn stop_queues(&self, ids: impl IntoIterator<Item = TxqId>, reason: StopReason) {
        self.with_state(|state, _| {
            for id in ids {
                if let Some(txq) = state.txqs.get_mut(&id) {
                    txq.stop(reason);
                }
            }
        })
    }
    fn start_queues(&self, ids: impl IntoIterator<Item = TxqId>, reason: StopReason) {
        self.with_state(|state, completions| {
            for id in ids {
                let Some(txq) = state.txqs.get_mut(&id) else {
                    continue;
                };
                if txq.start(reason) {
                    self.kick(state, id, completions);
                }
            }
        })
    }
    pub fn stop_queue(&self, id: TxqId, reason: StopReason) {
        self.stop_queues([id], reason)
    }
    pub fn start_queue(&self, id: TxqId, reason: StopReason) {
        self.start_queues([id], reason)
    }
    /// Stop all TXQs of a station.
    ///
    /// The queues are created, if they don't exist yet, so that frames arriving later are held
    /// back too.
    pub fn stop_station(&self, sta: u8, vif: u8, reason: StopReason) -> TxResult<()> {
        self.check_sta(sta)?;
        self.check_vif(vif)?;
        debug!("Stopping STA {}, reason: {}.", sta, reason.into_bits());
        self.with_state(|state, _| {
            state.txq_or_insert(TxqId::sta(sta, AccessCategory::BestEffort), vif, &self.config);
        });
        self.stop_queues(
            AccessCategory::ALL.map(|ac| TxqId::sta(sta, ac)),
            reason,
        );
        Ok(())
    }
    pub fn start_station(&self, sta: u8, reason: StopReason) -> TxResult<()> {
        self.check_sta(sta)?;
        debug!("Starting STA {}, reason: {}.", sta, reason.into_bits());
        self.start_queues(
            AccessCategory::ALL.map(|ac| TxqId::sta(sta, ac)),
            reason,
        );
        Ok(())
    }
    /// Stop the TXQs of a VIF and all of its stations.
    pub fn stop_vif(&self, vif: u8, reason: StopReason) -> TxResult<()> {
        self.check_vif(vif)?;
        debug!("Stopping VIF {}, reason: {}.", vif, reason.into_bits());
        let ids = self.with_state(|state, _| {
            let stops = state.vif_stops.entry(vif).or_default();
            if !stops.contains(&reason) {
                stops.push(reason);
            }
            state.vif_txq_ids(vif)
        });
        self.stop_queues(ids, reason);
        Ok(())
    }
    pub fn start_vif(&self, vif: u8, reason: StopReason) -> TxResult<()> {
        self.check_vif(vif)?;
        debug!("Starting VIF {}, reason: {}.", vif, reason.into_bits());
        let ids = self.with_state(|state, _| {
            if let Some(stops) = state.vif_stops.get_mut(&vif) {
                stops.retain(|stop| *stop != reason);
            }
            state.vif_txq_ids(vif)
        });
        self.start_queues(ids, reason);
        Ok(())
    }
    /// Notify the pipeline, that the hardware ring has room again.
    pub fn ring_space_available(&self) {
        self.with_state(|state, completions| {
            self.restart_stopped(state, StopReason::RingFull, completions)
        })
    }

    /// Remove the TXQs, flushing all frames that weren't handed to the hardware yet.
    fn remove_queues(&self, ids: Vec<TxqId>) -> usize {
        self.with_state(|state, completions| {
            let mut flushed = 0;
            for id in ids {
                let Some(mut txq) = state.txqs.remove(&id) else {
                    continue;
                };
                for frame in txq.flush() {
                    self.drop_frame(frame, TxFailure::Flushed, completions);
                    flushed += 1;
                }
            }
            flushed
        })
    }
    /// Tear down the TXQs of a station, e.g. after it disassociated.
    ///
    /// Returns the number of flushed frames. Frames in flight are completed, once their
    /// confirmation arrives.
    pub fn remove_station(&self, sta: u8) -> TxResult<usize> {
        self.check_sta(sta)?;
        let ids = self.with_state(|state, _| {
            state.sta_vif.remove(&sta);
            state.sta_txq_ids(sta)
        });
        let flushed = self.remove_queues(ids);
        info!("Removed STA {}, flushed {} frames.", sta, flushed);
        Ok(flushed)
    }
    /// Tear down the TXQs of a VIF and all of its stations.
    pub fn remove_vif(&self, vif: u8) -> TxResult<usize> {
        self.check_vif(vif)?;
        let ids = self.with_state(|state, _| {
            let ids = state.vif_txq_ids(vif);
            state.sta_vif.retain(|_, sta_vif| *sta_vif != vif);
            state.vif_stops.remove(&vif);
            ids
        });
        let flushed = self.remove_queues(ids);
        info!("Removed VIF {}, flushed {} frames.", vif, flushed);
        Ok(flushed)
    }

    /// The traffic counters of a VIF, for the power save logic.
    pub fn traffic_snapshot(&self, vif: u8) -> TxResult<TrafficSnapshot> {
        self.traffic.snapshot(vif)
    }
    /// Check if nothing is in flight for the VIF.
    pub fn is_idle(&self, vif: u8) -> TxResult<bool> {
        self.traffic.is_idle(vif)
    }
    /// Inspect a TXQ.
    pub fn with_queue<T>(&self, id: TxqId, f: impl FnOnce(&TxQueue) -> T) -> Option<T> {
        self.with_state(|state, _| state.txqs.get(&id).map(f))
    }
    /// The number of descriptors handed to the hardware, that weren't confirmed yet.
    pub fn in_flight(&self) -> usize {
        self.with_state(|state, _| state.in_flight.len())
    }
    /// The host IDs of all descriptors in flight, in the order they were submitted.
    pub fn in_flight_ids(&self) -> Vec<HostId> {
        self.with_state(|state, _| state.in_flight.keys().copied().collect())
    }
}
impl<R: TxRing, M: RawMutex> Drop for TxPipeline<R, M> {
    /// Complete every frame, that is still owned by the pipeline.
    fn drop(&mut self) {
        let (flushed, abandoned) = self.with_state(|state, completions| {
            let mut flushed = 0;
            for txq in state.txqs.values_mut() {
                for frame in txq.flush() {
                    self.drop_frame(frame, TxFailure::Flushed, completions);
                    flushed += 1;
                }
            }
            let in_flight = core::mem::take(&mut state.in_flight);
            let abandoned = in_flight.len();
            for InFlight { descriptor, .. } in in_flight.into_values() {
                let frame = state.allocator.release(descriptor);
                self.drop_frame(frame, TxFailure::QueueRemoved, completions);
            }
            (flushed, abandoned)
        });
        debug!(
            "Dropped TX pipeline, flushed {} frames and abandoned {} in flight.",
            flushed,
            abandoned
        );
    }
}
