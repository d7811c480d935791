//! Next - oldest-element driving policy.

use contracts::{CaptureRange, DispatchSink, StampOf, Stamped, State};

use crate::captor::{CapturePolicy, DriverPolicy};
use crate::queue::DispatchQueue;

/// Captures the next oldest element, one per cycle.
///
/// Establishes a sequencing range with
/// `range.lower_stamp == range.upper_stamp` equal to the captured
/// element's stamp, and removes that element from the buffer.
#[derive(Debug)]
pub struct Next<D> {
    queue: DispatchQueue<D>,
}

impl<D: Stamped> Next<D> {
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
}

impl<D: Stamped> Default for Next<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Stamped> CapturePolicy<D> for Next<D> {
    fn queue(&self) -> &DispatchQueue<D> {
        &self.queue
    }

    fn queue_mut(&mut self) -> &mut DispatchQueue<D> {
        &mut self.queue
    }
}

impl<D: Stamped> DriverPolicy<D> for Next<D> {
    fn dry_capture(&mut self, range: &mut CaptureRange<StampOf<D>>) -> State {
        match self.queue.front() {
            None => State::Retry,
            Some(head) => {
                range.lower_stamp = head.stamp();
                range.upper_stamp = range.lower_stamp;
                State::Primed
            }
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
                output.accept(head);
            }
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Dispatch;

    type D = Dispatch<i64, u32>;

    fn driver_with(stamps: &[i64]) -> Next<D> {
        let mut driver = Next::new();
        for &stamp in stamps {
            driver.queue_mut().push(Dispatch::new(stamp, 0)).unwrap();
        }
        driver
    }

    #[test]
    fn test_emits_one_element_per_cycle() {
        // Three cycles over [1,2,3] prime at (1,1), (2,2), (3,3).
        let mut driver = driver_with(&[1, 2, 3]);

        for expected in [1i64, 2, 3] {
            let mut range = CaptureRange::unset();
            let mut out: Vec<D> = Vec::new();
            assert_eq!(driver.capture(&mut out, &mut range), State::Primed);
            assert_eq!(range.lower_stamp, expected);
            assert_eq!(range.upper_stamp, expected);
            assert_eq!(out.len(), 1);
            assert_eq!(out[0].stamp, expected);
        }

        let mut range = CaptureRange::unset();
        let mut out: Vec<D> = Vec::new();
        assert_eq!(driver.capture(&mut out, &mut range), State::Retry);
        assert!(out.is_empty());
    }

    #[test]
    fn test_dry_capture_matches_capture() {
        let mut driver = driver_with(&[4]);

        let mut dry_range = CaptureRange::unset();
        let dry_state = driver.dry_capture(&mut dry_range);

        let mut range = CaptureRange::unset();
        let mut out: Vec<D> = Vec::new();
        let state = driver.capture(&mut out, &mut range);

        assert_eq!(dry_state, state);
        assert_eq!(dry_range, range);
    }

    #[test]
    fn test_abort_removes_older_data() {
        let mut driver = driver_with(&[1, 2, 3]);
        driver.abort(3);
        assert_eq!(driver.queue().len(), 1);
        assert_eq!(driver.queue().oldest_stamp().unwrap(), 3);
    }

    #[test]
    fn test_primed_lower_stamp_strictly_increases() {
        let mut driver = driver_with(&[1, 5, 9]);
        let mut previous = i64::MIN;
        loop {
            let mut range = CaptureRange::unset();
            let mut out: Vec<D> = Vec::new();
            if driver.capture(&mut out, &mut range) != State::Primed {
                break;
            }
            assert!(range.lower_stamp > previous);
            previous = range.lower_stamp;
        }
    }
}
