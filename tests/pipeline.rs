use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use embassy_futures::{block_on, join::join, poll_once};
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
use wifi_txq::{
    AccessCategory, ConfirmationStatus, HostId, MacAddress, StopReason, SubmitError, TxConfig,
    TxDescriptor, TxError, TxFailure, TxFrame, TxPipeline, TxRing, TxStatus, TxqId,
    ETHERTYPE_EAPOL, ETHERTYPE_IPV4,
};

const STA: u8 = 1;
const BE: TxqId = TxqId::sta(STA, AccessCategory::BestEffort);
const STA_ADDRESS: MacAddress = MacAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);

/// What the ring saw of a descriptor.
#[derive(Clone, Copy, Debug)]
struct Submitted {
    host_id: HostId,
    tag: u8,
    sn: u16,
    retry: bool,
    ac: AccessCategory,
    tid: u8,
    sw_retries: u8,
    hw_retries: u8,
}

#[derive(Default)]
struct RecordingRing {
    submitted: Vec<Submitted>,
    refuse: Option<SubmitError>,
}
impl TxRing for RecordingRing {
    fn push(&mut self, descriptor: &TxDescriptor) -> Result<(), SubmitError> {
        if let Some(err) = self.refuse {
            return Err(err);
        }
        let frame = descriptor.frame();
        self.submitted.push(Submitted {
            host_id: descriptor.host_id(),
            tag: frame.head_segment().last().copied().unwrap_or_default(),
            sn: descriptor.sn,
            retry: descriptor.flags.retry,
            ac: descriptor.ac,
            tid: descriptor.tid,
            sw_retries: frame.sw_retries(),
            hw_retries: frame.hw_retries(),
        });
        Ok(())
    }
}

type Pipeline = TxPipeline<RecordingRing, NoopRawMutex>;

/// Collects the final status of every frame, keyed by the tag of the frame.
#[derive(Clone, Default)]
struct Completions(Arc<Mutex<Vec<(u8, TxStatus)>>>);
impl Completions {
    fn attach(&self, frame: TxFrame, tag: u8) -> TxFrame {
        let completions = self.0.clone();
        frame.with_callback(move |status| completions.lock().unwrap().push((tag, status)))
    }
    /// A best effort frame to [STA], whose payload ends with `tag`.
    fn frame(&self, tag: u8) -> TxFrame {
        self.attach(
            TxFrame::new(STA_ADDRESS, 0x88b5, vec![vec![tag]]).with_sta(STA),
            tag,
        )
    }
    fn take(&self) -> Vec<(u8, TxStatus)> {
        core::mem::take(&mut *self.0.lock().unwrap())
    }
}

fn pipeline(config: TxConfig) -> Pipeline {
    TxPipeline::new(RecordingRing::default(), config)
}
fn submitted(pipeline: &Pipeline) -> Vec<Submitted> {
    pipeline.with_ring(|ring| ring.submitted.clone())
}
fn last_submitted(pipeline: &Pipeline) -> Submitted {
    pipeline.with_ring(|ring| *ring.submitted.last().unwrap())
}
fn queued(pipeline: &Pipeline, id: TxqId) -> usize {
    pipeline.with_queue(id, |txq| txq.len()).unwrap()
}
fn credits(pipeline: &Pipeline, id: TxqId) -> u16 {
    pipeline.with_queue(id, |txq| txq.credits()).unwrap()
}

fn acknowledged(credits: u8) -> ConfirmationStatus {
    ConfirmationStatus::new()
        .with_done(true)
        .with_acknowledged(true)
        .with_credits(credits)
}
fn retry_required(credits: u8, sn: u16) -> ConfirmationStatus {
    ConfirmationStatus::new()
        .with_done(true)
        .with_retry_required(true)
        .with_credits(credits)
        .with_sn(sn)
}
fn sw_retry_required(credits: u8, sn: u16) -> ConfirmationStatus {
    ConfirmationStatus::new()
        .with_done(true)
        .with_sw_retry_required(true)
        .with_credits(credits)
        .with_sn(sn)
}
fn failed(credits: u8) -> ConfirmationStatus {
    ConfirmationStatus::new().with_done(true).with_credits(credits)
}

#[test]
fn single_credit_gates_submission() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default().with_nominal_credits(1));
    for tag in 0..3 {
        pipeline.transmit(completions.frame(tag)).unwrap();
    }
    assert_eq!(submitted(&pipeline).len(), 1);
    assert_eq!(queued(&pipeline, BE), 2);
    assert_eq!(credits(&pipeline, BE), 0);

    let first = last_submitted(&pipeline);
    assert_eq!(first.tag, 0);
    pipeline.confirm(first.host_id, acknowledged(1)).unwrap();
    assert_eq!(completions.take(), [(0, TxStatus::Acknowledged)]);

    let second = last_submitted(&pipeline);
    assert_eq!(second.tag, 1);
    assert_ne!(second.host_id, first.host_id);
    assert_eq!(queued(&pipeline, BE), 1);
    assert_eq!(credits(&pipeline, BE), 0);
}

#[test]
fn hardware_retry_keeps_software_budget() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default().with_max_sw_retry(1));
    pipeline.transmit(completions.frame(0)).unwrap();
    let first = last_submitted(&pipeline);

    pipeline
        .confirm(first.host_id, retry_required(1, first.sn))
        .unwrap();
    assert!(completions.take().is_empty());
    let resent = last_submitted(&pipeline);
    assert_ne!(resent.host_id, first.host_id);
    assert_eq!((resent.tag, resent.sn), (0, first.sn));
    assert!(resent.retry);
    assert_eq!((resent.sw_retries, resent.hw_retries), (0, 1));

    pipeline
        .confirm(resent.host_id, acknowledged(1))
        .unwrap();
    assert_eq!(completions.take(), [(0, TxStatus::Acknowledged)]);
    assert_eq!(submitted(&pipeline).len(), 2);
    assert_eq!(pipeline.in_flight(), 0);
    assert!(pipeline.is_idle(0).unwrap());
}

#[test]
fn software_retries_are_bounded() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default().with_max_sw_retry(3));
    pipeline.transmit(completions.frame(7)).unwrap();

    for injection in 1..=3u8 {
        let current = last_submitted(&pipeline);
        assert_eq!(current.sw_retries, injection - 1);
        pipeline
            .confirm(current.host_id, sw_retry_required(1, current.sn))
            .unwrap();
        if injection < 3 {
            assert!(completions.take().is_empty());
        }
    }
    assert_eq!(
        completions.take(),
        [(7, TxStatus::Failed(TxFailure::RetryLimitReached))]
    );
    assert_eq!(submitted(&pipeline).len(), 3);
    assert_eq!(pipeline.in_flight(), 0);
    assert!(pipeline.with_queue(BE, |txq| txq.is_empty()).unwrap());
}

#[test]
fn teardown_flushes_queued_and_fails_stale_confirmation() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default().with_nominal_credits(1));
    for tag in 0..3 {
        pipeline.transmit(completions.frame(tag)).unwrap();
    }
    let in_flight = last_submitted(&pipeline);

    assert_eq!(pipeline.remove_station(STA), Ok(2));
    assert_eq!(
        completions.take(),
        [
            (1, TxStatus::Failed(TxFailure::Flushed)),
            (2, TxStatus::Failed(TxFailure::Flushed))
        ]
    );
    assert!(pipeline.with_queue(BE, |_| ()).is_none());
    assert!(!pipeline.is_idle(0).unwrap());

    pipeline
        .confirm(in_flight.host_id, sw_retry_required(1, in_flight.sn))
        .unwrap();
    assert_eq!(
        completions.take(),
        [(0, TxStatus::Failed(TxFailure::QueueRemoved))]
    );
    assert_eq!(submitted(&pipeline).len(), 1);
    assert!(pipeline.is_idle(0).unwrap());
}

#[test]
fn stale_confirmation_does_not_touch_new_queue() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default().with_nominal_credits(1));
    pipeline.transmit(completions.frame(0)).unwrap();
    let stale = last_submitted(&pipeline);
    pipeline.remove_station(STA).unwrap();

    // The station associates again and gets fresh queues.
    pipeline.transmit(completions.frame(1)).unwrap();
    pipeline.transmit(completions.frame(2)).unwrap();
    assert_eq!(credits(&pipeline, BE), 0);

    pipeline
        .confirm(stale.host_id, retry_required(1, stale.sn))
        .unwrap();
    assert_eq!(
        completions.take(),
        [(0, TxStatus::Failed(TxFailure::QueueRemoved))]
    );
    // Neither the credit nor the retry went to the new queue.
    assert_eq!(credits(&pipeline, BE), 0);
    assert_eq!(queued(&pipeline, BE), 1);
    assert_eq!(submitted(&pipeline).len(), 2);
}

#[test]
fn acknowledgement_after_teardown_is_still_success() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default());
    pipeline.transmit(completions.frame(0)).unwrap();
    let in_flight = last_submitted(&pipeline);
    assert_eq!(pipeline.remove_station(STA), Ok(0));

    pipeline
        .confirm(in_flight.host_id, acknowledged(1))
        .unwrap();
    assert_eq!(completions.take(), [(0, TxStatus::Acknowledged)]);
}

#[test]
fn retries_are_resent_in_confirmation_order() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default().with_nominal_credits(2));
    for tag in 0..3 {
        pipeline.transmit(completions.frame(tag)).unwrap();
    }
    let sent = submitted(&pipeline);
    let (a, b) = (sent[0], sent[1]);
    assert_eq!((a.tag, b.tag), (0, 1));

    // No credits come back yet, so both retries wait in the queue.
    pipeline.confirm(a.host_id, retry_required(0, a.sn)).unwrap();
    pipeline.confirm(b.host_id, retry_required(0, b.sn)).unwrap();
    assert_eq!(pipeline.with_queue(BE, |txq| txq.retry_len()), Some(2));

    pipeline.return_credits(BE, 2).unwrap();
    let resent = &submitted(&pipeline)[2..];
    assert_eq!(
        resent.iter().map(|s| (s.tag, s.sn)).collect::<Vec<_>>(),
        [(0, a.sn), (1, b.sn)]
    );
    assert!(resent.iter().all(|s| s.retry));

    // The pending frame only goes out after the retries.
    pipeline
        .confirm(resent[0].host_id, acknowledged(1))
        .unwrap();
    assert_eq!(last_submitted(&pipeline).tag, 2);
    assert_eq!(completions.take(), [(0, TxStatus::Acknowledged)]);
}

#[test]
fn failed_confirmation_completes_frame() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default());
    pipeline.transmit(completions.frame(3)).unwrap();
    let host_id = last_submitted(&pipeline).host_id;
    pipeline.confirm(host_id, failed(1)).unwrap();
    assert_eq!(
        completions.take(),
        [(3, TxStatus::Failed(TxFailure::NotAcknowledged))]
    );
    assert_eq!(credits(&pipeline, BE), 4);
}

#[test]
fn confirmation_errors() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default().with_nominal_credits(1));
    pipeline.transmit(completions.frame(0)).unwrap();
    let host_id = last_submitted(&pipeline).host_id;

    assert_eq!(
        pipeline.confirm(host_id, ConfirmationStatus::new()),
        Err(TxError::NotDone)
    );
    assert_eq!(pipeline.in_flight(), 1);
    assert_eq!(
        pipeline.confirm(HostId(host_id.0 + 100), acknowledged(1)),
        Err(TxError::UnknownHostId)
    );
    assert!(completions.take().is_empty());

    // Returning more credits than the queue ever had is reported, but the frame still completes.
    assert_eq!(
        pipeline.confirm(host_id, acknowledged(5)),
        Err(TxError::CreditOverflow { excess: 4 })
    );
    assert_eq!(completions.take(), [(0, TxStatus::Acknowledged)]);
    assert_eq!(credits(&pipeline, BE), 1);
    assert_eq!(
        pipeline.confirm(host_id, acknowledged(1)),
        Err(TxError::UnknownHostId)
    );
}

#[test]
fn backlog_limit_rejects_frames() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default().with_nominal_credits(1));
    for tag in 0..4 {
        pipeline.transmit(completions.frame(tag)).unwrap();
    }
    assert_eq!(
        pipeline.transmit(completions.frame(4)),
        Err(TxError::QueueFull)
    );
    assert_eq!(
        completions.take(),
        [(4, TxStatus::Failed(TxFailure::Rejected))]
    );
    assert_eq!(pipeline.traffic_snapshot(0).unwrap().total, 4);
}

#[test]
fn invalid_destination_is_rejected() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default().with_vif_count(1).with_sta_count(2));
    assert_eq!(
        pipeline.transmit(completions.frame(0).with_vif(1)),
        Err(TxError::InterfaceOutOfBounds)
    );
    assert_eq!(
        pipeline.transmit(completions.frame(1).with_sta(2)),
        Err(TxError::StationOutOfBounds)
    );
    assert_eq!(
        completions.take(),
        [
            (0, TxStatus::Failed(TxFailure::Rejected)),
            (1, TxStatus::Failed(TxFailure::Rejected))
        ]
    );
    assert!(submitted(&pipeline).is_empty());
}

#[test]
fn full_ring_holds_frame_without_credit() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default());
    pipeline.with_ring(|ring| ring.refuse = Some(SubmitError::RingFull));
    pipeline.transmit(completions.frame(0)).unwrap();
    pipeline.transmit(completions.frame(1)).unwrap();

    assert!(submitted(&pipeline).is_empty());
    assert_eq!(queued(&pipeline, BE), 2);
    assert_eq!(credits(&pipeline, BE), 4);
    assert_eq!(
        pipeline.with_queue(BE, |txq| txq.is_stopped_by(StopReason::RingFull)),
        Some(true)
    );

    pipeline.with_ring(|ring| ring.refuse = None);
    pipeline.ring_space_available();
    assert_eq!(
        submitted(&pipeline).iter().map(|s| s.tag).collect::<Vec<_>>(),
        [0, 1]
    );
    assert_eq!(credits(&pipeline, BE), 2);
    assert!(completions.take().is_empty());
}

#[test]
fn hardware_refusal_fails_frame() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default());
    pipeline.with_ring(|ring| ring.refuse = Some(SubmitError::Hardware));
    pipeline.transmit(completions.frame(0)).unwrap();
    assert_eq!(
        completions.take(),
        [(0, TxStatus::Failed(TxFailure::SubmissionFailed))]
    );
    assert_eq!(credits(&pipeline, BE), 4);
    assert!(pipeline.is_idle(0).unwrap());
}

#[test]
fn oversized_frame_fails_allocation() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default().with_max_segments(2));
    let frame = TxFrame::new(STA_ADDRESS, 0x88b5, vec![vec![0], vec![1], vec![2]]).with_sta(STA);
    pipeline.transmit(completions.attach(frame, 2)).unwrap();
    assert_eq!(
        completions.take(),
        [(2, TxStatus::Failed(TxFailure::AllocationFailed))]
    );
    assert!(submitted(&pipeline).is_empty());
    assert!(pipeline.is_idle(0).unwrap());
}

#[test]
fn credit_update_from_firmware() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default().with_nominal_credits(1));
    pipeline.transmit(completions.frame(0)).unwrap();
    pipeline.transmit(completions.frame(1)).unwrap();
    assert_eq!(submitted(&pipeline).len(), 1);

    pipeline.credits_update(STA, 0, 2).unwrap();
    assert_eq!(submitted(&pipeline).len(), 2);
    assert_eq!(credits(&pipeline, BE), 1);
    assert_eq!(pipeline.with_queue(BE, |txq| txq.max_credits()), Some(3));

    assert_eq!(
        pipeline.credits_update(STA + 1, 0, 1),
        Err(TxError::NoSuchQueue)
    );
    assert_eq!(
        pipeline.credits_update(200, 0, 1),
        Err(TxError::StationOutOfBounds)
    );
}

#[test]
fn station_power_save_holds_frames() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default());
    pipeline
        .stop_station(STA, 0, StopReason::StaPowerSave)
        .unwrap();
    pipeline.transmit(completions.frame(0)).unwrap();
    assert!(submitted(&pipeline).is_empty());
    assert_eq!(queued(&pipeline, BE), 1);

    pipeline
        .start_station(STA, StopReason::StaPowerSave)
        .unwrap();
    assert_eq!(submitted(&pipeline).len(), 1);
    assert!(completions.take().is_empty());
}

#[test]
fn disabled_station_rejects_frames() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default());
    pipeline.stop_station(STA, 0, StopReason::Disabled).unwrap();
    assert_eq!(
        pipeline.transmit(completions.frame(0)),
        Err(TxError::QueueStopped)
    );
    assert_eq!(
        completions.take(),
        [(0, TxStatus::Failed(TxFailure::Rejected))]
    );
    assert!(pipeline.is_idle(0).unwrap());
}

#[test]
fn vif_stop_applies_to_new_stations() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default());
    pipeline.stop_vif(0, StopReason::ChannelSwitch).unwrap();
    pipeline.transmit(completions.frame(0)).unwrap();
    let broadcast = TxFrame::new(MacAddress::BROADCAST, 0x88b5, vec![vec![1]]);
    pipeline.transmit(completions.attach(broadcast, 1)).unwrap();
    assert!(submitted(&pipeline).is_empty());

    pipeline.start_vif(0, StopReason::ChannelSwitch).unwrap();
    let mut tags = submitted(&pipeline)
        .iter()
        .map(|s| s.tag)
        .collect::<Vec<_>>();
    tags.sort_unstable();
    assert_eq!(tags, [0, 1]);
}

#[test]
fn remove_vif_flushes_station_and_group_queues() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default().with_nominal_credits(1));
    for tag in 0..2 {
        pipeline.transmit(completions.frame(tag)).unwrap();
        let broadcast = TxFrame::new(MacAddress::BROADCAST, 0x88b5, vec![vec![tag + 10]]);
        pipeline.transmit(completions.attach(broadcast, tag + 10)).unwrap();
    }
    assert_eq!(pipeline.in_flight(), 2);
    assert_eq!(pipeline.remove_vif(0), Ok(2));
    let mut flushed = completions.take();
    flushed.sort_unstable_by_key(|(tag, _)| *tag);
    assert_eq!(
        flushed,
        [
            (1, TxStatus::Failed(TxFailure::Flushed)),
            (11, TxStatus::Failed(TxFailure::Flushed))
        ]
    );
    assert!(pipeline
        .with_queue(TxqId::vif(0, AccessCategory::BestEffort), |_| ())
        .is_none());
    assert_eq!(pipeline.traffic_snapshot(0).unwrap().total, 2);
}

#[test]
fn admission_control_downgrades() {
    let completions = Completions::default();
    // Video and voice require admission control.
    let pipeline = pipeline(TxConfig::default().with_acm_bitmap(0b1100));
    // IPv4 with precedence 7.
    let voice = TxFrame::new(STA_ADDRESS, ETHERTYPE_IPV4, vec![vec![0x45, 0xe0, 0]]).with_sta(STA);
    pipeline.transmit(completions.attach(voice, 0)).unwrap();
    let sent = last_submitted(&pipeline);
    assert_eq!((sent.ac, sent.tid), (AccessCategory::BestEffort, 0));

    // Without admission control, authentication frames go out as voice.
    let pipeline = self::pipeline(TxConfig::default());
    let eapol = TxFrame::new(STA_ADDRESS, ETHERTYPE_EAPOL, vec![vec![1]]).with_sta(STA);
    pipeline.transmit(completions.attach(eapol, 1)).unwrap();
    let sent = last_submitted(&pipeline);
    assert_eq!((sent.ac, sent.tid), (AccessCategory::Voice, 7));
    let snapshot = pipeline.traffic_snapshot(0).unwrap();
    assert!(snapshot.vi_or_vo_active);
    assert_eq!(snapshot.per_ac, [0, 0, 0, 1]);
}

#[test]
fn sequence_numbers_advance_per_tid() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default());
    for tag in 0..3 {
        pipeline.transmit(completions.frame(tag)).unwrap();
    }
    assert_eq!(
        submitted(&pipeline).iter().map(|s| s.sn).collect::<Vec<_>>(),
        [0, 1, 2]
    );
}

#[test]
fn transmit_async_resolves_on_confirmation() {
    let pipeline = pipeline(TxConfig::default());
    let frame = TxFrame::new(STA_ADDRESS, 0x88b5, vec![vec![0]]).with_sta(STA);
    let (status, ()) = block_on(join(pipeline.transmit_async(frame), async {
        let host_id = last_submitted(&pipeline).host_id;
        pipeline.confirm(host_id, acknowledged(1)).unwrap();
    }));
    assert_eq!(status, TxStatus::Acknowledged);

    let rejected = TxFrame::new(STA_ADDRESS, 0x88b5, vec![vec![0]]).with_vif(9);
    assert_eq!(
        block_on(pipeline.transmit_async(rejected)),
        TxStatus::Failed(TxFailure::Rejected)
    );
}

#[test]
fn waiting_for_credits() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default().with_nominal_credits(1));
    pipeline.transmit(completions.frame(0)).unwrap();
    let host_id = last_submitted(&pipeline).host_id;
    block_on(join(pipeline.wait_for_credits(), async {
        pipeline.confirm(host_id, acknowledged(1)).unwrap();
    }));
    assert_eq!(credits(&pipeline, BE), 1);
}

#[test]
fn ring_full_keeps_retransmissions_first() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default());
    pipeline.transmit(completions.frame(0)).unwrap();
    pipeline.transmit(completions.frame(1)).unwrap();
    let sent = submitted(&pipeline);

    pipeline.with_ring(|ring| ring.refuse = Some(SubmitError::RingFull));
    pipeline
        .confirm(sent[0].host_id, retry_required(1, sent[0].sn))
        .unwrap();
    pipeline
        .confirm(sent[1].host_id, retry_required(1, sent[1].sn))
        .unwrap();
    pipeline.transmit(completions.frame(2)).unwrap();
    assert_eq!(pipeline.with_queue(BE, |txq| txq.retry_len()), Some(2));
    assert_eq!(queued(&pipeline, BE), 3);
    assert_eq!(
        pipeline.with_queue(BE, |txq| txq.is_stopped_by(StopReason::RingFull)),
        Some(true)
    );

    pipeline.with_ring(|ring| ring.refuse = None);
    pipeline.ring_space_available();
    let resent = &submitted(&pipeline)[2..];
    assert_eq!(
        resent
            .iter()
            .map(|s| (s.tag, s.retry))
            .collect::<Vec<_>>(),
        [(0, true), (1, true), (2, false)]
    );
    assert_eq!((resent[0].sn, resent[1].sn), (sent[0].sn, sent[1].sn));
    assert!(completions.take().is_empty());
}

#[test]
fn exhausted_pool_holds_back_frames() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default().with_descriptor_pool(2));
    for tag in 0..3 {
        pipeline.transmit(completions.frame(tag)).unwrap();
    }
    let broadcast = TxFrame::new(MacAddress::BROADCAST, 0x88b5, vec![vec![10]]);
    pipeline.transmit(completions.attach(broadcast, 10)).unwrap();
    let group = TxqId::vif(0, AccessCategory::BestEffort);

    assert_eq!(submitted(&pipeline).len(), 2);
    assert!(completions.take().is_empty());
    assert_eq!(queued(&pipeline, BE), 1);
    assert_eq!(credits(&pipeline, BE), 2);
    assert_eq!(queued(&pipeline, group), 1);
    for id in [BE, group] {
        assert_eq!(
            pipeline.with_queue(id, |txq| txq.is_stopped_by(StopReason::NoDescriptors)),
            Some(true)
        );
    }

    // Every confirmation frees a descriptor for the next held back frame.
    let first = submitted(&pipeline)[0];
    pipeline.confirm(first.host_id, acknowledged(1)).unwrap();
    assert_eq!(last_submitted(&pipeline).tag, 2);
    assert_eq!(queued(&pipeline, group), 1);

    let second = submitted(&pipeline)[1];
    pipeline.confirm(second.host_id, acknowledged(1)).unwrap();
    assert_eq!(last_submitted(&pipeline).tag, 10);
    assert_eq!(
        completions.take(),
        [(0, TxStatus::Acknowledged), (1, TxStatus::Acknowledged)]
    );
    assert_eq!(pipeline.in_flight(), 2);
}

#[test]
fn over_return_still_wakes_credit_waiters() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default().with_nominal_credits(1));
    pipeline.transmit(completions.frame(0)).unwrap();
    let host_id = last_submitted(&pipeline).host_id;

    assert_eq!(
        pipeline.confirm(host_id, acknowledged(3)),
        Err(TxError::CreditOverflow { excess: 2 })
    );
    assert!(poll_once(pipeline.wait_for_credits()).is_ready());
    assert_eq!(credits(&pipeline, BE), 1);
}

#[test]
fn dropping_pipeline_completes_every_frame() {
    let completions = Completions::default();
    let pipeline = pipeline(TxConfig::default().with_nominal_credits(1));
    for tag in 0..3 {
        pipeline.transmit(completions.frame(tag)).unwrap();
    }
    assert_eq!(pipeline.in_flight(), 1);
    drop(pipeline);

    let mut done = completions.take();
    done.sort_unstable_by_key(|(tag, _)| *tag);
    assert_eq!(
        done,
        [
            (0, TxStatus::Failed(TxFailure::QueueRemoved)),
            (1, TxStatus::Failed(TxFailure::Flushed)),
            (2, TxStatus::Failed(TxFailure::Flushed))
        ]
    );
}

/// Frames are enqueued on one thread, while another thread plays the firmware.
#[test]
fn concurrent_enqueue_and_confirmation() {
    const FRAMES: usize = 500;

    struct SharedRing;
    impl TxRing for SharedRing {
        fn push(&mut self, _descriptor: &TxDescriptor) -> Result<(), SubmitError> {
            Ok(())
        }
    }

    let pipeline =
        TxPipeline::<SharedRing, CriticalSectionRawMutex>::new(SharedRing, TxConfig::default());
    let acknowledged_count = Arc::new(AtomicUsize::new(0));
    let rejected_count = Arc::new(AtomicUsize::new(0));
    let completed = || {
        acknowledged_count.load(Ordering::Acquire) + rejected_count.load(Ordering::Acquire)
    };

    thread::scope(|scope| {
        scope.spawn(|| {
            for tag in 0..FRAMES {
                let (acknowledged_count, rejected_count) =
                    (acknowledged_count.clone(), rejected_count.clone());
                let frame = TxFrame::new(STA_ADDRESS, 0x88b5, vec![vec![tag as u8]])
                    .with_sta((tag % 3) as u8)
                    .with_callback(move |status| {
                        let counter = match status {
                            TxStatus::Acknowledged => &acknowledged_count,
                            TxStatus::Failed(TxFailure::Rejected) => &rejected_count,
                            other => panic!("Unexpected status {other:?}."),
                        };
                        counter.fetch_add(1, Ordering::AcqRel);
                    });
                let _ = pipeline.transmit(frame);
            }
        });
        scope.spawn(|| {
            let deadline = Instant::now() + Duration::from_secs(10);
            while completed() < FRAMES {
                assert!(Instant::now() < deadline, "Frames got stuck.");
                for host_id in pipeline.in_flight_ids() {
                    pipeline.confirm(host_id, acknowledged(1)).unwrap();
                }
                thread::yield_now();
            }
        });
    });

    assert_eq!(completed(), FRAMES);
    assert!(acknowledged_count.load(Ordering::Acquire) > 0);
    assert_eq!(pipeline.in_flight(), 0);
    assert!(pipeline.is_idle(0).unwrap());
    for sta in 0..3 {
        let id = TxqId::sta(sta, AccessCategory::BestEffort);
        assert_eq!(pipeline.with_queue(id, |txq| txq.credits()), Some(4));
    }
}
