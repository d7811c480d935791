//! ClosestBefore - single-element follower with an expected period.

use contracts::{CaptureRange, DispatchSink, OffsetOf, StampOf, Stamped, State};

use crate::captor::{CapturePolicy, FollowerPolicy};
use crate::queue::DispatchQueue;

/// Captures one element before the range lower bound, minus a delay,
/// within an expected period. All older elements are removed.
///
/// The candidate is the newest element with
/// `stamp <= range.lower_stamp - delay`; it is accepted when it also
/// lies inside the trailing window `(boundary - period, boundary]`.
///
/// Behaves non-deterministically if the actual input period does not
/// match the `period` given at construction: a `period` that is too
/// large admits several elements before the driving range, so the
/// selected element can differ between otherwise identical runs.
#[derive(Debug)]
pub struct ClosestBefore<D: Stamped> {
    queue: DispatchQueue<D>,
    /// Expected update period
    period: OffsetOf<D>,
    /// Capture delay
    delay: OffsetOf<D>,
}

enum Decision<S> {
    Retry,
    Abort,
    Primed(S),
}

impl<D: Stamped> ClosestBefore<D> {
    /// Accept candidates within `period` behind `lower_stamp - delay`.
    pub fn new(period: OffsetOf<D>, delay: OffsetOf<D>) -> Self {
        Self::with_queue(period, delay, DispatchQueue::new())
    }

    /// Non-default buffer (bounded, pre-filled, ...).
    pub fn with_queue(period: OffsetOf<D>, delay: OffsetOf<D>, queue: DispatchQueue<D>) -> Self {
        Self {
            queue,
            period,
            delay,
        }
    }

    fn locate(&self, range: &CaptureRange<StampOf<D>>) -> Decision<StampOf<D>> {
        if self.queue.is_empty() {
            return Decision::Retry;
        }

        let boundary = range.lower_stamp - self.delay;

        // Newest element at or before the boundary.
        let mut candidate = None;
        for dispatch in self.queue.iter() {
            if dispatch.stamp() <= boundary {
                candidate = Some(dispatch.stamp());
            } else {
                break;
            }
        }

        match candidate {
            Some(stamp) if stamp > boundary - self.period => Decision::Primed(stamp),
            Some(_) => Decision::Retry,
            None => {
                // Nothing at or before the boundary; stamps only grow,
                // so data past the upper bound means none ever will be.
                let past_upper = self
                    .queue
                    .back()
                    .is_some_and(|newest| newest.stamp() > range.upper_stamp);
                if past_upper {
                    Decision::Abort
                } else {
                    Decision::Retry
                }
            }
        }
    }
}

impl<D: Stamped> CapturePolicy<D> for ClosestBefore<D> {
    fn queue(&self) -> &DispatchQueue<D> {
        &self.queue
    }

    fn queue_mut(&mut self) -> &mut DispatchQueue<D> {
        &mut self.queue
    }
}

impl<D: Stamped + Clone> FollowerPolicy<D> for ClosestBefore<D> {
    fn dry_capture(&mut self, range: &CaptureRange<StampOf<D>>) -> State {
        match self.locate(range) {
            Decision::Retry => State::Retry,
            Decision::Abort => State::Abort,
            Decision::Primed(stamp) => {
                self.queue.remove_before(stamp);
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
            Decision::Primed(stamp) => {
                self.queue.remove_before(stamp);
                if let Some(chosen) = self.queue.front() {
                    output.accept(chosen.clone());
                }
                State::Primed
            }
        }
    }
}
