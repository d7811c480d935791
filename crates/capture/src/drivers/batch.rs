//! Batch - fixed-width window driving policy.

use contracts::{CaptureRange, DispatchSink, OffsetOf, StampOf, Stamped, State};

use crate::captor::{CapturePolicy, DriverPolicy};
use crate::queue::DispatchQueue;

/// Captures every element inside a fixed-width stamp window.
///
/// PRIMED once the buffered span reaches `period`; the range covers
/// `[oldest, oldest + period]` and every element with a stamp at or
/// inside the upper bound is emitted and removed.
#[derive(Debug)]
pub struct Batch<D: Stamped> {
    queue: DispatchQueue<D>,
    period: OffsetOf<D>,
}

impl<D: Stamped> Batch<D> {
    /// Capture windows of width `period`.
    pub fn new(period: OffsetOf<D>) -> Self {
        Self::with_queue(period, DispatchQueue::new())
    }

    /// Non-default buffer (bounded, pre-filled, ...).
    pub fn with_queue(period: OffsetOf<D>, queue: DispatchQueue<D>) -> Self {
        Self { queue, period }
    }
}

impl<D: Stamped> CapturePolicy<D> for Batch<D> {
    fn queue(&self) -> &DispatchQueue<D> {
        &self.queue
    }

    fn queue_mut(&mut self) -> &mut DispatchQueue<D> {
        &mut self.queue
    }
}

impl<D: Stamped> DriverPolicy<D> for Batch<D> {
    fn dry_capture(&mut self, range: &mut CaptureRange<StampOf<D>>) -> State {
        let (oldest, newest) = match (self.queue.front(), self.queue.back()) {
            (Some(front), Some(back)) => (front.stamp(), back.stamp()),
            _ => return State::Retry,
        };

        if newest - oldest < self.period {
            return State::Retry;
        }

        range.lower_stamp = oldest;
        range.upper_stamp = oldest + self.period;
        State::Primed
    }

    fn capture(
        &mut self,
        output: &mut dyn DispatchSink<D>,
        range: &mut CaptureRange<StampOf<D>>,
    ) -> State {
        let state = self.dry_capture(range);
        if state.is_primed() {
            while self
                .queue
                .front()
                .is_some_and(|head| head.stamp() <= range.upper_stamp)
            {
                if let Some(head) = self.queue.pop() {
                    output.accept(head);
                }
            }
        }
        state
    }
}
