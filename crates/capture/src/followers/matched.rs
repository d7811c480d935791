//! Matched - nearest-stamp follower.

use contracts::{CaptureRange, DispatchSink, OffsetOf, StampOf, Stamped, State};

use crate::captor::{CapturePolicy, FollowerPolicy};
use crate::queue::DispatchQueue;

/// Captures the single element whose stamp is closest to
/// `range.upper_stamp`, within `±tolerance`.
///
/// ABORT once the newest buffered stamp is past the upper bound plus
/// the tolerance with no in-window element; RETRY while an in-window
/// element may still arrive. An equidistant tie keeps the earlier
/// element.
#[derive(Debug)]
pub struct Matched<D: Stamped> {
    queue: DispatchQueue<D>,
    /// Acceptance tolerance around the upper bound
    tolerance: OffsetOf<D>,
}

enum Decision<S> {
    Retry,
    Abort,
    Primed(S),
}

impl<D: Stamped> Matched<D> {
    /// Match within `±tolerance` of the driving upper bound.
    pub fn new(tolerance: OffsetOf<D>) -> Self {
        Self::with_queue(tolerance, DispatchQueue::new())
    }

    /// Non-default buffer (bounded, pre-filled, ...).
    pub fn with_queue(tolerance: OffsetOf<D>, queue: DispatchQueue<D>) -> Self {
        Self { queue, tolerance }
    }

    fn locate(&self, range: &CaptureRange<StampOf<D>>) -> Decision<StampOf<D>> {
        if self.queue.is_empty() {
            return Decision::Retry;
        }

        let target = range.upper_stamp;
        let mut best: Option<(StampOf<D>, OffsetOf<D>)> = None;

        for dispatch in self.queue.iter() {
            let stamp = dispatch.stamp();
            if stamp > target + self.tolerance {
                break;
            }

            let distance = if stamp >= target {
                stamp - target
            } else {
                target - stamp
            };
            if distance > self.tolerance {
                continue;
            }

            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((stamp, distance)),
            }
        }

        match best {
            Some((stamp, _)) => Decision::Primed(stamp),
            None => {
                let past_window = self
                    .queue
                    .back()
                    .is_some_and(|newest| newest.stamp() > target + self.tolerance);
                if past_window {
                    Decision::Abort
                } else {
                    Decision::Retry
                }
            }
        }
    }
}

impl<D: Stamped> CapturePolicy<D> for Matched<D> {
    fn queue(&self) -> &DispatchQueue<D> {
        &self.queue
    }

    fn queue_mut(&mut self) -> &mut DispatchQueue<D> {
        &mut self.queue
    }
}

impl<D: Stamped + Clone> FollowerPolicy<D> for Matched<D> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Dispatch;

    type D = Dispatch<i64, u32>;

    fn follower_with(tolerance: i64, stamps: &[i64]) -> Matched<D> {
        let mut follower = Matched::new(tolerance);
        for &stamp in stamps {
            follower.queue_mut().push(Dispatch::new(stamp, 0)).unwrap();
        }
        follower
    }

    #[test]
    fn test_picks_closest_to_upper_bound() {
        let mut follower = follower_with(3, &[5, 9, 11, 20]);
        let range = CaptureRange::new(10, 10);

        let mut out: Vec<D> = Vec::new();
        assert_eq!(follower.capture(&mut out, &range), State::Primed);
        // 9 and 11 are equidistant from 10; the tie keeps the earlier one.
        assert_eq!(out.iter().map(|d| d.stamp).collect::<Vec<_>>(), vec![9]);
    }

    #[test]
    fn test_aborts_when_window_passed() {
        let mut follower = follower_with(2, &[20, 25]);
        let range = CaptureRange::new(10, 10);

        let mut out: Vec<D> = Vec::new();
        assert_eq!(follower.capture(&mut out, &range), State::Abort);
        assert!(out.is_empty());
    }

    #[test]
    fn test_retries_while_window_open() {
        // Newest stamp 8 is behind upper+tolerance=12; a closer element
        // may still arrive.
        let mut follower = follower_with(2, &[5, 6]);
        let range = CaptureRange::new(10, 10);
        assert_eq!(follower.dry_capture(&range), State::Retry);
    }

    #[test]
    fn test_empty_queue_retries() {
        let mut follower = follower_with(2, &[]);
        let range = CaptureRange::new(10, 10);
        assert_eq!(follower.dry_capture(&range), State::Retry);
    }

    #[test]
    fn test_evicts_elements_older_than_match() {
        let mut follower = follower_with(3, &[2, 4, 9, 15]);
        let range = CaptureRange::new(10, 10);

        let mut out: Vec<D> = Vec::new();
        assert_eq!(follower.capture(&mut out, &range), State::Primed);
        assert_eq!(out[0].stamp, 9);
        assert_eq!(
            follower.queue().iter().map(|d| d.stamp).collect::<Vec<_>>(),
            vec![9, 15]
        );
    }

    #[test]
    fn test_dry_capture_matches_capture() {
        let range = CaptureRange::new(10, 10);

        let mut probe = follower_with(3, &[5, 9, 11, 20]);
        let mut real = follower_with(3, &[5, 9, 11, 20]);
        let mut out: Vec<D> = Vec::new();
        assert_eq!(probe.dry_capture(&range), real.capture(&mut out, &range));
        assert_eq!(probe.queue().len(), real.queue().len());
    }
}
