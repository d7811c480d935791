//! Capture-cycle orchestration.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use capture::{DriverCaptor, FollowerCaptor};
use contracts::{
    CaptorStats, CaptureError, CaptureMeta, CaptureRange, StampOf, Stamped, State, StreamId,
    SyncedCapture,
};
use tracing::{debug, trace, warn};

/// Outcome of one capture cycle.
#[derive(Debug)]
pub enum CycleOutcome<D: Stamped> {
    /// Every participant primed; the synchronized capture is committed.
    Primed(SyncedCapture<D>),
    /// Some participant needs more data; buffers are left in place so
    /// the next cycle can observe newly arrived data.
    Retry,
    /// The range was infeasible; every participant advanced past
    /// `frontier`.
    Abort {
        /// Common forward frontier all queues converged on.
        frontier: StampOf<D>,
    },
}

/// Outcome of one dry capture cycle (queue side effects, no outputs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DryOutcome<S> {
    /// Every participant would prime for this range.
    Primed(CaptureRange<S>),
    /// Some participant would need more data.
    Retry,
    /// The range is infeasible; abort was fanned out past `frontier`.
    Abort {
        /// Common forward frontier all queues converged on.
        frontier: S,
    },
}

/// Builder for a [`Synchronizer`]; followers react in registration order.
pub struct SynchronizerBuilder<D: Stamped> {
    driver: Box<dyn DriverCaptor<D>>,
    followers: Vec<Box<dyn FollowerCaptor<D>>>,
}

impl<D: Stamped> SynchronizerBuilder<D> {
    /// Start from the driving captor.
    pub fn new(driver: Box<dyn DriverCaptor<D>>) -> Self {
        Self {
            driver,
            followers: Vec::new(),
        }
    }

    /// Register a follower; order is preserved.
    pub fn follower(mut self, follower: Box<dyn FollowerCaptor<D>>) -> Self {
        self.followers.push(follower);
        self
    }

    /// Finish building.
    pub fn build(self) -> Synchronizer<D> {
        Synchronizer {
            driver: self.driver,
            followers: self.followers,
            seq: 0,
            retries: 0,
            aborts: 0,
        }
    }
}

/// Orchestrates one driver and N followers across capture cycles.
///
/// A cycle probes every participant with `dry_capture` first and only
/// then runs the real captures, so a RETRY from any participant leaves
/// nothing emitted and nothing to restore. Per-participant outputs are
/// buffered and flushed together on commit; no captor lock is ever held
/// across a sink write. Cycles are linearized: the next cycle does not
/// begin until the current one has committed, retried, or aborted.
pub struct Synchronizer<D: Stamped> {
    driver: Box<dyn DriverCaptor<D>>,
    followers: Vec<Box<dyn FollowerCaptor<D>>>,
    seq: u64,
    /// RETRY cycles since the previous committed capture
    retries: u32,
    /// ABORT cycles since the previous committed capture
    aborts: u32,
}

impl<D: Stamped> Synchronizer<D> {
    /// Builder entry point.
    pub fn builder(driver: Box<dyn DriverCaptor<D>>) -> SynchronizerBuilder<D> {
        SynchronizerBuilder::new(driver)
    }

    /// Stream driving the capture range.
    pub fn driver_id(&self) -> &StreamId {
        self.driver.id()
    }

    /// Number of registered followers.
    pub fn follower_count(&self) -> usize {
        self.followers.len()
    }

    /// Run one capture cycle.
    ///
    /// # Errors
    /// `InvalidRange` when the driver primes with `lower > upper`, or
    /// aborts without populating the abort frontier.
    pub fn capture(&mut self) -> Result<CycleOutcome<D>, CaptureError> {
        match self.probe()? {
            DryOutcome::Retry => Ok(CycleOutcome::Retry),
            DryOutcome::Abort { frontier } => Ok(CycleOutcome::Abort { frontier }),
            DryOutcome::Primed(_) => self.commit_cycle(),
        }
    }

    /// Run one dry cycle: the same decision pattern over `dry_capture`,
    /// with queue side effects but no outputs.
    ///
    /// # Errors
    /// `InvalidRange`, as for [`capture`](Self::capture).
    pub fn dry_capture(&mut self) -> Result<DryOutcome<StampOf<D>>, CaptureError> {
        self.probe()
    }

    /// Polling wrapper: re-run cycles while RETRY until `deadline`.
    ///
    /// Expiry stops polling and reports RETRY, leaving all queues in
    /// place for the next attempt.
    ///
    /// # Errors
    /// Propagates [`capture`](Self::capture) errors.
    pub fn capture_before(
        &mut self,
        deadline: Instant,
        poll_interval: Duration,
    ) -> Result<CycleOutcome<D>, CaptureError> {
        loop {
            match self.capture()? {
                CycleOutcome::Retry => {
                    if Instant::now() >= deadline {
                        return Ok(CycleOutcome::Retry);
                    }
                    std::thread::sleep(poll_interval);
                }
                outcome => return Ok(outcome),
            }
        }
    }

    /// Fan `abort(t_abort)` out to every participant, driver included.
    pub fn abort_all(&mut self, t_abort: StampOf<D>) {
        self.fan_out_abort(t_abort);
    }

    /// Reset scalar state on every participant; queues are retained.
    pub fn reset(&mut self) {
        self.driver.reset();
        for follower in &self.followers {
            follower.reset();
        }
        self.retries = 0;
        self.aborts = 0;
    }

    /// Queue snapshots for every participant, driver first.
    pub fn captor_stats(&self) -> Vec<(StreamId, CaptorStats<StampOf<D>>)> {
        let mut stats = Vec::with_capacity(self.followers.len() + 1);
        stats.push((self.driver.id().clone(), self.driver.stats()));
        for follower in &self.followers {
            stats.push((follower.id().clone(), follower.stats()));
        }
        stats
    }

    /// Probe every participant in order; fans out abort on the first
    /// ABORT and counts the cycle.
    fn probe(&mut self) -> Result<DryOutcome<StampOf<D>>, CaptureError> {
        let mut range = CaptureRange::unset();

        match self.driver.dry_capture(&mut range) {
            State::Retry => {
                self.note_retry(self.driver.id().clone());
                return Ok(DryOutcome::Retry);
            }
            State::Abort => {
                if range.is_unset() {
                    return Err(CaptureError::invalid_range(
                        range.lower_stamp,
                        range.upper_stamp,
                    ));
                }
                let frontier = range.lower_stamp;
                self.note_abort(self.driver.id().clone(), frontier);
                return Ok(DryOutcome::Abort { frontier });
            }
            State::Primed => {
                if !range.is_valid() {
                    return Err(CaptureError::invalid_range(
                        range.lower_stamp,
                        range.upper_stamp,
                    ));
                }
            }
        }

        for index in 0..self.followers.len() {
            match self.followers[index].dry_capture(&range) {
                State::Retry => {
                    let id = self.followers[index].id().clone();
                    self.note_retry(id);
                    return Ok(DryOutcome::Retry);
                }
                State::Abort => {
                    let id = self.followers[index].id().clone();
                    let frontier = range.lower_stamp;
                    self.note_abort(id, frontier);
                    return Ok(DryOutcome::Abort { frontier });
                }
                State::Primed => {}
            }
        }

        Ok(DryOutcome::Primed(range))
    }

    /// Real capture phase, entered only after a fully primed probe.
    ///
    /// Dry captures only evict data the real capture would not emit, so
    /// every participant primes again here; a disagreement can only
    /// come from concurrent queue mutation and is handled like the
    /// probe outcomes.
    fn commit_cycle(&mut self) -> Result<CycleOutcome<D>, CaptureError> {
        let mut range = CaptureRange::unset();
        let mut driver_out: Vec<D> = Vec::new();

        match self.driver.capture(&mut driver_out, &mut range) {
            State::Retry => {
                warn!(stream = %self.driver.id(), "driver un-primed between probe and capture");
                self.note_retry(self.driver.id().clone());
                return Ok(CycleOutcome::Retry);
            }
            State::Abort => {
                if range.is_unset() {
                    return Err(CaptureError::invalid_range(
                        range.lower_stamp,
                        range.upper_stamp,
                    ));
                }
                let frontier = range.lower_stamp;
                self.note_abort(self.driver.id().clone(), frontier);
                return Ok(CycleOutcome::Abort { frontier });
            }
            State::Primed => {
                if !range.is_valid() {
                    return Err(CaptureError::invalid_range(
                        range.lower_stamp,
                        range.upper_stamp,
                    ));
                }
            }
        }

        let mut buffers: Vec<Vec<D>> = Vec::with_capacity(self.followers.len());
        for index in 0..self.followers.len() {
            let mut output: Vec<D> = Vec::new();
            match self.followers[index].capture(&mut output, &range) {
                State::Retry => {
                    let id = self.followers[index].id().clone();
                    warn!(stream = %id, "follower un-primed between probe and capture");
                    self.note_retry(id);
                    return Ok(CycleOutcome::Retry);
                }
                State::Abort => {
                    let id = self.followers[index].id().clone();
                    let frontier = range.lower_stamp;
                    self.note_abort(id, frontier);
                    return Ok(CycleOutcome::Abort { frontier });
                }
                State::Primed => buffers.push(output),
            }
        }

        Ok(CycleOutcome::Primed(self.commit(range, driver_out, buffers)))
    }

    fn note_retry(&mut self, stream: StreamId) {
        self.retries = self.retries.saturating_add(1);
        trace!(stream = %stream, "capture cycle retry");
        metrics::counter!("capture_cycles_total", "state" => "retry").increment(1);
    }

    fn note_abort(&mut self, stream: StreamId, frontier: StampOf<D>) {
        self.fan_out_abort(frontier);
        self.aborts = self.aborts.saturating_add(1);
        debug!(stream = %stream, frontier = ?frontier, "capture cycle aborted");
        metrics::counter!("capture_cycles_total", "state" => "abort").increment(1);
    }

    fn fan_out_abort(&self, frontier: StampOf<D>) {
        self.driver.abort(frontier);
        for follower in &self.followers {
            follower.abort(frontier);
        }
    }

    fn commit(
        &mut self,
        range: CaptureRange<StampOf<D>>,
        driver_out: Vec<D>,
        buffers: Vec<Vec<D>>,
    ) -> SyncedCapture<D> {
        self.seq += 1;

        let mut streams: HashMap<StreamId, Vec<D>> = HashMap::new();
        let mut stream_counts: HashMap<StreamId, usize> = HashMap::new();
        let mut emitted = driver_out.len();

        stream_counts.insert(self.driver.id().clone(), driver_out.len());
        streams.insert(self.driver.id().clone(), driver_out);

        for (follower, output) in self.followers.iter().zip(buffers) {
            emitted += output.len();
            stream_counts.insert(follower.id().clone(), output.len());
            streams
                .entry(follower.id().clone())
                .or_default()
                .extend(output);
        }

        let (mut dropped_total, mut rejected_total) = {
            let stats = self.driver.stats();
            (stats.dropped, stats.rejected)
        };
        for follower in &self.followers {
            let stats = follower.stats();
            dropped_total += stats.dropped;
            rejected_total += stats.rejected;
        }

        let meta = CaptureMeta {
            driver_stream: self.driver.id().clone(),
            retries: std::mem::take(&mut self.retries),
            aborts: std::mem::take(&mut self.aborts),
            stream_counts,
            dropped_total,
            rejected_total,
        };

        metrics::counter!("capture_cycles_total", "state" => "primed").increment(1);
        metrics::histogram!("capture_dispatches_per_cycle").record(emitted as f64);
        debug!(
            seq = self.seq,
            range = ?range,
            dispatches = emitted,
            "capture cycle committed"
        );

        SyncedCapture {
            seq: self.seq,
            range,
            streams,
            meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture::drivers::{Next, Throttled};
    use capture::followers::{AnyBefore, ClosestBefore, Ranged};
    use capture::{CapturePolicy, Captor, DispatchQueue, DispatchSink, DriverPolicy, Injector};
    use contracts::{Dispatch, LockPolicy, NoLock};

    type D = Dispatch<i64, u32>;

    fn captor<P>(id: &str, policy: P) -> Captor<P, NoLock> {
        Captor::new(id, policy)
    }

    fn fill<P: CapturePolicy<D>, L: LockPolicy>(captor: &Captor<P, L>, stamps: &[i64]) {
        for &stamp in stamps {
            captor.inject(Dispatch::new(stamp, 0)).unwrap();
        }
    }

    #[test]
    fn test_driver_and_ranged_follower_commit_together() {
        // Driver queue [5], Ranged(0) follower queue [3,4,6,7]:
        // range (5,5); follower brackets with [4,6].
        let driver = captor("drive", Next::<D>::new());
        let follower = captor("follow", Ranged::<D>::new(0));
        fill(&driver, &[5]);
        fill(&follower, &[3, 4, 6, 7]);

        let mut sync = Synchronizer::builder(Box::new(driver))
            .follower(Box::new(follower))
            .build();

        let capture = match sync.capture().unwrap() {
            CycleOutcome::Primed(capture) => capture,
            other => panic!("expected primed cycle, got {other:?}"),
        };

        assert_eq!(capture.seq, 1);
        assert_eq!(
            (capture.range.lower_stamp, capture.range.upper_stamp),
            (5, 5)
        );
        let driver_out: Vec<i64> = capture.streams["drive"].iter().map(|d| d.stamp).collect();
        let follower_out: Vec<i64> = capture.streams["follow"].iter().map(|d| d.stamp).collect();
        assert_eq!(driver_out, vec![5]);
        assert_eq!(follower_out, vec![4, 6]);
    }

    #[test]
    fn test_retry_emits_nothing_and_loses_nothing() {
        let driver = captor("drive", Next::<D>::new());
        let follower = captor("follow", Ranged::<D>::new(0));
        let follower_handle = follower.handle();
        fill(&driver, &[5]);
        // Leading bracket present, trailing bracket missing -> RETRY.
        fill(&follower, &[3, 4]);

        let mut sync = Synchronizer::builder(Box::new(driver))
            .follower(Box::new(follower))
            .build();

        assert!(matches!(sync.capture().unwrap(), CycleOutcome::Retry));
        // The driver element survived the retried cycle.
        assert_eq!(sync.captor_stats()[0].1.depth, 1);

        follower_handle.inject(Dispatch::new(6, 0)).unwrap();
        match sync.capture().unwrap() {
            CycleOutcome::Primed(capture) => {
                assert_eq!(capture.meta.retries, 1);
                assert_eq!(capture.meta.aborts, 0);
                assert_eq!(capture.streams["drive"].len(), 1);
            }
            other => panic!("expected primed cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_abort_fans_out_to_every_participant() {
        let driver = captor("drive", Next::<D>::new());
        let any_before = captor("log", AnyBefore::<D>::new(0));
        let closest = captor("odom", ClosestBefore::<D>::new(2, 0));
        let any_before_handle = any_before.handle();
        let driver_handle = driver.handle();

        fill(&driver, &[10]);
        fill(&any_before, &[1, 2, 12]);
        // ClosestBefore: nothing at/before 10, newest past upper -> ABORT.
        fill(&closest, &[12, 15]);

        let mut sync = Synchronizer::builder(Box::new(driver))
            .follower(Box::new(any_before))
            .follower(Box::new(closest))
            .build();

        match sync.capture().unwrap() {
            CycleOutcome::Abort { frontier } => assert_eq!(frontier, 10),
            other => panic!("expected aborted cycle, got {other:?}"),
        }

        // abort(10) reached the other queues: data before 10 is gone.
        let window = any_before_handle.available_stamp_range().unwrap();
        assert_eq!(window.lower_stamp, 12);
        let window = driver_handle.available_stamp_range().unwrap();
        assert_eq!(window.lower_stamp, 10);
    }

    #[test]
    fn test_dry_capture_emits_nothing() {
        let driver = captor("drive", Next::<D>::new());
        let follower = captor("follow", AnyBefore::<D>::new(0));
        let follower_handle = follower.handle();
        fill(&driver, &[5]);
        fill(&follower, &[1, 2, 7]);

        let mut sync = Synchronizer::builder(Box::new(driver))
            .follower(Box::new(follower))
            .build();

        match sync.dry_capture().unwrap() {
            DryOutcome::Primed(range) => {
                assert_eq!((range.lower_stamp, range.upper_stamp), (5, 5))
            }
            other => panic!("expected primed dry cycle, got {other:?}"),
        }
        // Nothing was emitted or consumed: the driver still holds its
        // element and the follower still holds the window.
        assert_eq!(sync.captor_stats()[0].1.depth, 1);
        assert_eq!(follower_handle.size(), 3);
    }

    #[test]
    fn test_throttled_driver_inside_synchronizer() {
        let driver = captor("drive", Throttled::<D>::new(5));
        let follower = captor("follow", AnyBefore::<D>::new(0));
        fill(&driver, &[1, 2, 7]);
        fill(&follower, &[0, 1, 6, 9]);

        let mut sync = Synchronizer::builder(Box::new(driver))
            .follower(Box::new(follower))
            .build();

        let mut lowers = Vec::new();
        while let CycleOutcome::Primed(capture) = sync.capture().unwrap() {
            lowers.push(capture.range.lower_stamp);
        }
        // 2 was skipped as too soon after 1; lower stamps stay ordered.
        assert_eq!(lowers, vec![1, 7]);
    }

    #[test]
    fn test_primed_lower_stamps_non_decreasing_across_cycles() {
        let driver = captor("drive", Next::<D>::new());
        let follower = captor("follow", AnyBefore::<D>::new(0));
        fill(&driver, &[1, 3, 8]);
        fill(&follower, &[0, 2, 5, 9]);

        let mut sync = Synchronizer::builder(Box::new(driver))
            .follower(Box::new(follower))
            .build();

        let mut previous = i64::MIN;
        while let CycleOutcome::Primed(capture) = sync.capture().unwrap() {
            assert!(capture.range.lower_stamp >= previous);
            previous = capture.range.lower_stamp;
        }
    }

    /// Driver stub that primes with an inverted range.
    struct BrokenDriver {
        queue: DispatchQueue<D>,
    }

    impl CapturePolicy<D> for BrokenDriver {
        fn queue(&self) -> &DispatchQueue<D> {
            &self.queue
        }

        fn queue_mut(&mut self) -> &mut DispatchQueue<D> {
            &mut self.queue
        }
    }

    impl DriverPolicy<D> for BrokenDriver {
        fn dry_capture(&mut self, range: &mut CaptureRange<i64>) -> State {
            range.lower_stamp = 10;
            range.upper_stamp = 5;
            State::Primed
        }

        fn capture(
            &mut self,
            _output: &mut dyn DispatchSink<D>,
            range: &mut CaptureRange<i64>,
        ) -> State {
            self.dry_capture(range)
        }
    }

    #[test]
    fn test_inverted_driver_range_is_fatal() {
        let driver = captor(
            "drive",
            BrokenDriver {
                queue: DispatchQueue::new(),
            },
        );
        let mut sync = Synchronizer::<D>::builder(Box::new(driver)).build();

        let err = sync.capture().unwrap_err();
        assert!(matches!(err, CaptureError::InvalidRange { .. }));
    }

    /// Driver stub that aborts without populating the range.
    struct SilentAbortDriver {
        queue: DispatchQueue<D>,
    }

    impl CapturePolicy<D> for SilentAbortDriver {
        fn queue(&self) -> &DispatchQueue<D> {
            &self.queue
        }

        fn queue_mut(&mut self) -> &mut DispatchQueue<D> {
            &mut self.queue
        }
    }

    impl DriverPolicy<D> for SilentAbortDriver {
        fn dry_capture(&mut self, _range: &mut CaptureRange<i64>) -> State {
            State::Abort
        }

        fn capture(
            &mut self,
            _output: &mut dyn DispatchSink<D>,
            range: &mut CaptureRange<i64>,
        ) -> State {
            self.dry_capture(range)
        }
    }

    #[test]
    fn test_unset_range_on_abort_is_fatal() {
        let driver = captor(
            "drive",
            SilentAbortDriver {
                queue: DispatchQueue::new(),
            },
        );
        let mut sync = Synchronizer::<D>::builder(Box::new(driver)).build();

        let err = sync.capture().unwrap_err();
        assert!(matches!(err, CaptureError::InvalidRange { .. }));
    }

    #[test]
    fn test_capture_before_deadline_reports_retry() {
        let driver = captor("drive", Next::<D>::new());
        let mut sync = Synchronizer::<D>::builder(Box::new(driver)).build();

        let deadline = Instant::now() + Duration::from_millis(10);
        let outcome = sync
            .capture_before(deadline, Duration::from_millis(2))
            .unwrap();
        assert!(matches!(outcome, CycleOutcome::Retry));
        assert!(Instant::now() >= deadline);
    }
}
