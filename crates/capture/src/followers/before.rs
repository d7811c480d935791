//! Before - confirmed-window follower.

use contracts::{CaptureRange, DispatchSink, OffsetOf, StampOf, Stamped, State};

use crate::captor::{CapturePolicy, FollowerPolicy};
use crate::queue::DispatchQueue;

/// Deterministic companion to `AnyBefore`.
///
/// PRIMED only after at least one element at or past
/// `range.upper_stamp - delay` confirms the window boundary; then emits
/// and removes every earlier element (possibly none). RETRY until the
/// boundary is confirmed.
#[derive(Debug)]
pub struct Before<D: Stamped> {
    queue: DispatchQueue<D>,
    /// Capture delay
    delay: OffsetOf<D>,
}

impl<D: Stamped> Before<D> {
    /// Capture everything earlier than `upper_stamp - delay`, once confirmed.
    pub fn new(delay: OffsetOf<D>) -> Self {
        Self::with_queue(delay, DispatchQueue::new())
    }

    /// Non-default buffer (bounded, pre-filled, ...).
    pub fn with_queue(delay: OffsetOf<D>, queue: DispatchQueue<D>) -> Self {
        Self { queue, delay }
    }

    fn boundary_confirmed(&self, boundary: StampOf<D>) -> bool {
        self.queue
            .back()
            .is_some_and(|newest| newest.stamp() >= boundary)
    }
}

impl<D: Stamped> CapturePolicy<D> for Before<D> {
    fn queue(&self) -> &DispatchQueue<D> {
        &self.queue
    }

    fn queue_mut(&mut self) -> &mut DispatchQueue<D> {
        &mut self.queue
    }
}

impl<D: Stamped> FollowerPolicy<D> for Before<D> {
    fn dry_capture(&mut self, range: &CaptureRange<StampOf<D>>) -> State {
        // Probe only: everything below the boundary is what capture
        // would emit, so it stays buffered.
        let boundary = range.upper_stamp - self.delay;
        if self.boundary_confirmed(boundary) {
            State::Primed
        } else {
            State::Retry
        }
    }

    fn capture(
        &mut self,
        output: &mut dyn DispatchSink<D>,
        range: &CaptureRange<StampOf<D>>,
    ) -> State {
        let boundary = range.upper_stamp - self.delay;
        if !self.boundary_confirmed(boundary) {
            return State::Retry;
        }

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

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Dispatch;

    type D = Dispatch<i64, u32>;

    fn follower_with(delay: i64, stamps: &[i64]) -> Before<D> {
        let mut follower = Before::new(delay);
        for &stamp in stamps {
            follower.queue_mut().push(Dispatch::new(stamp, 0)).unwrap();
        }
        follower
    }

    #[test]
    fn test_retries_until_boundary_confirmed() {
        // delay=2, range (10,10): boundary 8, newest is 6 -> not confirmed.
        let mut follower = follower_with(2, &[3, 6]);
        let range = CaptureRange::new(10, 10);

        let mut out: Vec<D> = Vec::new();
        assert_eq!(follower.capture(&mut out, &range), State::Retry);
        assert!(out.is_empty());
        assert_eq!(follower.queue().len(), 2);
    }

    #[test]
    fn test_emits_once_confirmed() {
        let mut follower = follower_with(2, &[3, 6, 8]);
        let range = CaptureRange::new(10, 10);

        let mut out: Vec<D> = Vec::new();
        assert_eq!(follower.capture(&mut out, &range), State::Primed);
        assert_eq!(out.iter().map(|d| d.stamp).collect::<Vec<_>>(), vec![3, 6]);
        assert_eq!(follower.queue().len(), 1);
    }

    #[test]
    fn test_primed_with_empty_window() {
        // Boundary confirmed but nothing earlier buffered.
        let mut follower = follower_with(0, &[12]);
        let range = CaptureRange::new(10, 10);

        let mut out: Vec<D> = Vec::new();
        assert_eq!(follower.capture(&mut out, &range), State::Primed);
        assert!(out.is_empty());
    }

    #[test]
    fn test_dry_capture_matches_capture() {
        let range = CaptureRange::new(10, 10);

        let mut follower = follower_with(2, &[3, 6, 8]);
        assert_eq!(follower.dry_capture(&range), State::Primed);

        // The probe left the window intact for the real capture.
        let mut out: Vec<D> = Vec::new();
        assert_eq!(follower.capture(&mut out, &range), State::Primed);
        assert_eq!(out.iter().map(|d| d.stamp).collect::<Vec<_>>(), vec![3, 6]);

        let mut unconfirmed = follower_with(2, &[3, 6]);
        assert_eq!(unconfirmed.dry_capture(&range), State::Retry);
    }
}
