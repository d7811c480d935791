//! AnyBefore - unconditional window follower.

use contracts::{CaptureRange, DispatchSink, OffsetOf, StampOf, Stamped, State};

use crate::captor::{CapturePolicy, FollowerPolicy};
use crate::queue::DispatchQueue;

/// Captures all elements from a delay before the driving upper stamp.
///
/// Emits every buffered element with `stamp < range.upper_stamp - delay`
/// and removes them. This follower is always ready and returns PRIMED
/// regardless of whether any data was available.
///
/// This is the only unconditional policy: if producers cannot guarantee
/// that all data arrives before the shifted boundary, its output is
/// non-deterministic across runs. That liberal acceptance is
/// intentional; pick `delay` large enough for the upstream latency
/// instead of expecting the policy to wait.
#[derive(Debug)]
pub struct AnyBefore<D: Stamped> {
    queue: DispatchQueue<D>,
    /// Capture delay
    delay: OffsetOf<D>,
}

impl<D: Stamped> AnyBefore<D> {
    /// Capture everything earlier than `upper_stamp - delay`.
    pub fn new(delay: OffsetOf<D>) -> Self {
        Self::with_queue(delay, DispatchQueue::new())
    }

    /// Non-default buffer (bounded, pre-filled, ...).
    pub fn with_queue(delay: OffsetOf<D>, queue: DispatchQueue<D>) -> Self {
        Self { queue, delay }
    }
}

impl<D: Stamped> CapturePolicy<D> for AnyBefore<D> {
    fn queue(&self) -> &DispatchQueue<D> {
        &self.queue
    }

    fn queue_mut(&mut self) -> &mut DispatchQueue<D> {
        &mut self.queue
    }
}

impl<D: Stamped> FollowerPolicy<D> for AnyBefore<D> {
    fn dry_capture(&mut self, _range: &CaptureRange<StampOf<D>>) -> State {
        // Everything below the boundary would be emitted by capture, so
        // the probe must not evict it.
        State::Primed
    }

    fn capture(
        &mut self,
        output: &mut dyn DispatchSink<D>,
        range: &CaptureRange<StampOf<D>>,
    ) -> State {
        let boundary = range.upper_stamp - self.delay;
        while self
            .queue
            .front()
            .is_some_and(|head| head.stamp() < boundary)
        {
            if let Some(head) = self.queue.pop() {
                output.accept(head);
            }
        }
        State::Primed
    }
}
