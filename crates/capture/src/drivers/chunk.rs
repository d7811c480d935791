//! Chunk - fixed-size batch driving policy.

use std::num::NonZeroUsize;

use contracts::{CaptureRange, DispatchSink, StampOf, Stamped, State};

use crate::captor::{CapturePolicy, DriverPolicy};
use crate::queue::DispatchQueue;

/// Captures the `size` oldest elements once that many are buffered.
///
/// Establishes a sequencing range spanning the stamps of the captured
/// chunk and removes the chunk from the buffer.
#[derive(Debug)]
pub struct Chunk<D> {
    queue: DispatchQueue<D>,
    size: NonZeroUsize,
}

impl<D: Stamped> Chunk<D> {
    /// Capture `size` elements per cycle.
    pub fn new(size: NonZeroUsize) -> Self {
        Self::with_queue(size, DispatchQueue::new())
    }

    /// Non-default buffer (bounded, pre-filled, ...).
    pub fn with_queue(size: NonZeroUsize, queue: DispatchQueue<D>) -> Self {
        Self { queue, size }
    }
}

impl<D: Stamped> CapturePolicy<D> for Chunk<D> {
    fn queue(&self) -> &DispatchQueue<D> {
        &self.queue
    }

    fn queue_mut(&mut self) -> &mut DispatchQueue<D> {
        &mut self.queue
    }
}

impl<D: Stamped> DriverPolicy<D> for Chunk<D> {
    fn dry_capture(&mut self, range: &mut CaptureRange<StampOf<D>>) -> State {
        let size = self.size.get();
        if self.queue.len() < size {
            return State::Retry;
        }

        match (self.queue.front(), self.queue.get(size - 1)) {
            (Some(first), Some(last)) => {
                range.lower_stamp = first.stamp();
                range.upper_stamp = last.stamp();
                State::Primed
            }
            _ => State::Retry,
        }
    }

    fn capture(
        &mut self,
        output: &mut dyn DispatchSink<D>,
        range: &mut CaptureRange<StampOf<D>>,
    ) -> State {
        let state = self.dry_capture(range);
        if state.is_primed() {
            for _ in 0..self.size.get() {
                if let Some(head) = self.queue.pop() {
                    output.accept(head);
                }
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

    fn chunk_of(size: usize) -> Chunk<D> {
        Chunk::new(NonZeroUsize::new(size).unwrap())
    }

    #[test]
    fn test_retries_until_chunk_is_full() {
        let mut driver = chunk_of(3);
        for stamp in [1, 2] {
            driver.queue_mut().push(Dispatch::new(stamp, 0)).unwrap();
        }

        let mut range = CaptureRange::unset();
        let mut out: Vec<D> = Vec::new();
        assert_eq!(driver.capture(&mut out, &mut range), State::Retry);
        assert!(out.is_empty());
    }

    #[test]
    fn test_range_spans_the_chunk() {
        let mut driver = chunk_of(3);
        for stamp in [1, 4, 9, 12] {
            driver.queue_mut().push(Dispatch::new(stamp, 0)).unwrap();
        }

        let mut range = CaptureRange::unset();
        let mut out: Vec<D> = Vec::new();
        assert_eq!(driver.capture(&mut out, &mut range), State::Primed);
        assert_eq!((range.lower_stamp, range.upper_stamp), (1, 9));
        assert_eq!(
            out.iter().map(|d| d.stamp).collect::<Vec<_>>(),
            vec![1, 4, 9]
        );
        assert_eq!(driver.queue().len(), 1);
    }

    #[test]
    fn test_dry_capture_matches_capture() {
        let mut driver = chunk_of(2);
        for stamp in [3, 5] {
            driver.queue_mut().push(Dispatch::new(stamp, 0)).unwrap();
        }

        let mut dry_range = CaptureRange::unset();
        let dry_state = driver.dry_capture(&mut dry_range);

        let mut range = CaptureRange::unset();
        let mut out: Vec<D> = Vec::new();
        let state = driver.capture(&mut out, &mut range);

        assert_eq!(dry_state, state);
        assert_eq!(dry_range, range);
    }
}
