//! Ranged - bracketing-interval follower.

use contracts::{CaptureRange, DispatchSink, OffsetOf, StampOf, Stamped, State};

use crate::captor::{CapturePolicy, FollowerPolicy};
use crate::queue::DispatchQueue;

/// Captures a bracketing interval around the driving range: one element
/// at or before `lower_stamp - delay`, one element at or past
/// `upper_stamp - delay`, and everything between.
///
/// ABORT when no element older than the shifted lower bound remains;
/// RETRY until an element at or past the shifted upper bound arrives.
/// `abort` is a no-op for this policy; its eviction is tied to capture.
#[derive(Debug)]
pub struct Ranged<D: Stamped> {
    queue: DispatchQueue<D>,
    /// Capture delay
    delay: OffsetOf<D>,
}

enum Decision {
    Retry,
    Abort,
    /// Inclusive index bounds of the capture sequence.
    Primed {
        first: usize,
        last: usize,
    },
}

impl<D: Stamped> Ranged<D> {
    /// Bracket the driving range shifted earlier by `delay`.
    pub fn new(delay: OffsetOf<D>) -> Self {
        Self::with_queue(delay, DispatchQueue::new())
    }

    /// Non-default buffer (bounded, pre-filled, ...).
    pub fn with_queue(delay: OffsetOf<D>, queue: DispatchQueue<D>) -> Self {
        Self { queue, delay }
    }

    /// First position at or past the shifted lower bound (queue length
    /// when none exists).
    fn find_after_first(&self, range: &CaptureRange<StampOf<D>>) -> usize {
        let boundary = range.lower_stamp - self.delay;
        self.queue
            .iter()
            .position(|dispatch| dispatch.stamp() >= boundary)
            .unwrap_or(self.queue.len())
    }

    /// First position past the shifted upper bound, searching from
    /// `after_first` (queue length when none exists).
    fn find_past_upper(&self, range: &CaptureRange<StampOf<D>>, after_first: usize) -> usize {
        let boundary = range.upper_stamp - self.delay;
        let start = if after_first == self.queue.len() {
            0
        } else {
            after_first
        };
        (start..self.queue.len())
            .find(|&index| {
                self.queue
                    .get(index)
                    .is_some_and(|dispatch| dispatch.stamp() > boundary)
            })
            .unwrap_or(self.queue.len())
    }

    fn locate(&self, range: &CaptureRange<StampOf<D>>) -> Decision {
        if self.queue.is_empty() {
            return Decision::Retry;
        }

        let after_first = self.find_after_first(range);

        // At the start of the buffered range: no bracketing element
        // before the window exists or ever will.
        if after_first == 0 {
            return Decision::Abort;
        }

        let past_upper = self.find_past_upper(range, after_first);
        if past_upper == self.queue.len() {
            return Decision::Retry;
        }

        Decision::Primed {
            first: after_first - 1,
            last: past_upper,
        }
    }

    fn evict_before_index(&mut self, first: usize) {
        if let Some(keep) = self.queue.get(first).map(|dispatch| dispatch.stamp()) {
            self.queue.remove_before(keep);
        }
    }
}

impl<D: Stamped> CapturePolicy<D> for Ranged<D> {
    fn queue(&self) -> &DispatchQueue<D> {
        &self.queue
    }

    fn queue_mut(&mut self) -> &mut DispatchQueue<D> {
        &mut self.queue
    }

    /// Eviction is tied to capture; an external abort must not disturb
    /// the bracketing element.
    fn abort(&mut self, _t_abort: StampOf<D>) {}
}

impl<D: Stamped + Clone> FollowerPolicy<D> for Ranged<D> {
    fn dry_capture(&mut self, range: &CaptureRange<StampOf<D>>) -> State {
        match self.locate(range) {
            Decision::Retry => State::Retry,
            Decision::Abort => State::Abort,
            Decision::Primed { first, .. } => {
                self.evict_before_index(first);
                State::Primed
            }
        }
    }

    fn capture(
        &mut self,
        output: &mut dyn DispatchSink<D>,
        range: &CaptureRange<StampOf<D>>,
    ) -> State {
        match self.locate(range) {
            Decision::Retry => State::Retry,
            Decision::Abort => State::Abort,
            Decision::Primed { first, last } => {
                for dispatch in self.queue.iter().skip(first).take(last - first + 1) {
                    output.accept(dispatch.clone());
                }
                self.evict_before_index(first);
                State::Primed
            }
        }
    }
}
