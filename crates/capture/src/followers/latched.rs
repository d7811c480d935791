//! Latched - hold-last-value follower.

use contracts::{CaptureRange, DispatchSink, StampOf, Stamped, State};

use crate::captor::{CapturePolicy, FollowerPolicy};
use crate::queue::DispatchQueue;

/// Captures the most recent element with `stamp <= range.upper_stamp`.
///
/// RETRY while no such element exists. The latched element is retained
/// in the buffer and re-emitted on later cycles until a newer element
/// supersedes it; only superseded elements are evicted. `abort` is a
/// no-op so the latch survives an aborted cycle.
#[derive(Debug)]
pub struct Latched<D> {
    queue: DispatchQueue<D>,
}

impl<D: Stamped> Latched<D> {
    /// Unbounded buffer.
    pub fn new() -> Self {
        Self {
            queue: DispatchQueue::new(),
        }
    }

    /// Non-default buffer (bounded, pre-filled, ...).
    pub fn with_queue(queue: DispatchQueue<D>) -> Self {
        Self { queue }
    }

    fn locate(&self, range: &CaptureRange<StampOf<D>>) -> Option<StampOf<D>> {
        let mut latched = None;
        for dispatch in self.queue.iter() {
            if dispatch.stamp() <= range.upper_stamp {
                latched = Some(dispatch.stamp());
            } else {
                break;
            }
        }
        latched
    }
}

impl<D: Stamped> Default for Latched<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Stamped> CapturePolicy<D> for Latched<D> {
    fn queue(&self) -> &DispatchQueue<D> {
        &self.queue
    }

    fn queue_mut(&mut self) -> &mut DispatchQueue<D> {
        &mut self.queue
    }

    /// The latch must survive an aborted cycle.
    fn abort(&mut self, _t_abort: StampOf<D>) {}
}

impl<D: Stamped + Clone> FollowerPolicy<D> for Latched<D> {
    fn dry_capture(&mut self, range: &CaptureRange<StampOf<D>>) -> State {
        match self.locate(range) {
            None => State::Retry,
            Some(stamp) => {
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
            None => State::Retry,
            Some(stamp) => {
                self.queue.remove_before(stamp);
                if let Some(latched) = self.queue.front() {
                    output.accept(latched.clone());
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

    fn follower_with(stamps: &[i64]) -> Latched<D> {
        let mut follower = Latched::new();
        for &stamp in stamps {
            follower.queue_mut().push(Dispatch::new(stamp, 0)).unwrap();
        }
        follower
    }

    fn capture_once(follower: &mut Latched<D>, upper: i64) -> (State, Option<i64>) {
        let range = CaptureRange::new(upper, upper);
        let mut out: Vec<D> = Vec::new();
        let state = follower.capture(&mut out, &range);
        (state, out.first().map(|d| d.stamp))
    }

    #[test]
    fn test_emits_most_recent_at_or_before_upper() {
        let mut follower = follower_with(&[2, 5, 8]);
        assert_eq!(capture_once(&mut follower, 6), (State::Primed, Some(5)));
    }

    #[test]
    fn test_retries_without_a_latch_candidate() {
        let mut follower = follower_with(&[7, 9]);
        assert_eq!(capture_once(&mut follower, 5), (State::Retry, None));
        assert_eq!(follower.queue().len(), 2);
    }

    #[test]
    fn test_latch_repeats_until_superseded() {
        let mut follower = follower_with(&[2]);

        assert_eq!(capture_once(&mut follower, 3), (State::Primed, Some(2)));
        // Same latch on the next cycle; nothing newer arrived.
        assert_eq!(capture_once(&mut follower, 4), (State::Primed, Some(2)));

        follower.queue_mut().push(Dispatch::new(4, 0)).unwrap();
        assert_eq!(capture_once(&mut follower, 5), (State::Primed, Some(4)));
        // The superseded element is gone.
        assert_eq!(follower.queue().len(), 1);
    }

    #[test]
    fn test_abort_keeps_the_latch() {
        let mut follower = follower_with(&[2, 5]);
        follower.abort(100);
        assert_eq!(follower.queue().len(), 2);
    }

    #[test]
    fn test_dry_capture_matches_capture() {
        let range = CaptureRange::new(6, 6);

        let mut probe = follower_with(&[2, 5, 8]);
        let mut real = follower_with(&[2, 5, 8]);
        let mut out: Vec<D> = Vec::new();
        assert_eq!(probe.dry_capture(&range), real.capture(&mut out, &range));
        assert_eq!(probe.queue().len(), real.queue().len());
    }
}
