//! Throttled - rate-limited next-element driving policy.

use contracts::{CaptureRange, DispatchSink, OffsetOf, StampOf, Stamped, State};

use crate::captor::{CapturePolicy, DriverPolicy};
use crate::queue::DispatchQueue;

/// Captures the next oldest element, limited to a max expected period.
///
/// Elements whose stamp falls sooner than `period` after the previous
/// emission are silently skipped, so some inputs are dropped when the
/// upstream rate exceeds the throttled rate. Establishes a sequencing
/// range with `lower_stamp == upper_stamp` equal to the captured
/// element's stamp.
#[derive(Debug)]
pub struct Throttled<D: Stamped> {
    queue: DispatchQueue<D>,
    /// Capture throttling period
    period: OffsetOf<D>,
    /// Previous captured element stamp
    previous_stamp: Option<StampOf<D>>,
}

impl<D: Stamped> Throttled<D> {
    /// Throttle emissions to at least `period` apart.
    pub fn new(period: OffsetOf<D>) -> Self {
        Self::with_queue(period, DispatchQueue::new())
    }

    /// Non-default buffer (bounded, pre-filled, ...).
    pub fn with_queue(period: OffsetOf<D>, queue: DispatchQueue<D>) -> Self {
        Self {
            queue,
            period,
            previous_stamp: None,
        }
    }
}

impl<D: Stamped> CapturePolicy<D> for Throttled<D> {
    fn queue(&self) -> &DispatchQueue<D> {
        &self.queue
    }

    fn queue_mut(&mut self) -> &mut DispatchQueue<D> {
        &mut self.queue
    }

    fn reset(&mut self) {
        self.previous_stamp = None;
    }
}

impl<D: Stamped> DriverPolicy<D> for Throttled<D> {
    fn dry_capture(&mut self, range: &mut CaptureRange<StampOf<D>>) -> State {
        loop {
            let head_stamp = match self.queue.front() {
                None => return State::Retry,
                Some(head) => head.stamp(),
            };

            if let Some(previous) = self.previous_stamp {
                if head_stamp - previous < self.period {
                    // Arrived too soon after the previous emission.
                    self.queue.pop();
                    continue;
                }
            }

            range.lower_stamp = head_stamp;
            range.upper_stamp = head_stamp;
            return State::Primed;
        }
    }

    fn capture(
        &mut self,
        output: &mut dyn DispatchSink<D>,
        range: &mut CaptureRange<StampOf<D>>,
    ) -> State {
        let state = self.dry_capture(range);
        if state.is_primed() {
            if let Some(head) = self.queue.pop() {
                self.previous_stamp = Some(head.stamp());
                output.accept(head);
            }
        }
        state
    }
}
