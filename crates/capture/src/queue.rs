//! Stamp-ordered dispatch buffer.

use std::collections::VecDeque;

use contracts::{CaptorStats, CaptureError, OverflowPolicy, StampOf, Stamped};

/// Ordered buffer of dispatches, oldest at the front.
///
/// Stamps are strictly non-decreasing from front to back; a push whose
/// stamp is behind the newest buffered stamp is rejected with
/// `OutOfOrderStamp` (equal stamps are accepted in arrival order). A
/// bounded queue either evicts its oldest element or rejects the push
/// when full, depending on the configured [`OverflowPolicy`].
#[derive(Debug, Clone)]
pub struct DispatchQueue<D> {
    items: VecDeque<D>,
    capacity: Option<usize>,
    overflow: OverflowPolicy,
    /// Capacity evictions
    dropped: u64,
    /// Out-of-order rejections
    rejected: u64,
}

impl<D: Stamped> DispatchQueue<D> {
    /// Create an unbounded queue.
    pub fn new() -> Self {
        Self::bounded(0, OverflowPolicy::EvictOldest)
    }

    /// Create a bounded queue (`capacity == 0` means unbounded).
    pub fn bounded(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity: (capacity > 0).then_some(capacity),
            overflow,
            dropped: 0,
            rejected: 0,
        }
    }

    /// Append a dispatch.
    ///
    /// # Errors
    /// - `OutOfOrderStamp` if the stamp is behind the newest buffered stamp
    /// - `CapacityExceeded` if the queue is full and configured to reject
    pub fn push(&mut self, dispatch: D) -> Result<(), CaptureError> {
        if let Some(newest) = self.items.back() {
            if dispatch.stamp() < newest.stamp() {
                self.rejected += 1;
                return Err(CaptureError::out_of_order(dispatch.stamp(), newest.stamp()));
            }
        }

        if let Some(capacity) = self.capacity {
            if self.items.len() >= capacity {
                match self.overflow {
                    OverflowPolicy::EvictOldest => {
                        self.items.pop_front();
                        self.dropped += 1;
                        tracing::trace!(dropped = self.dropped, "bounded queue evicted oldest");
                    }
                    OverflowPolicy::Reject => {
                        return Err(CaptureError::CapacityExceeded { capacity });
                    }
                }
            }
        }

        self.items.push_back(dispatch);
        Ok(())
    }

    /// Remove and return the oldest dispatch.
    pub fn pop(&mut self) -> Option<D> {
        self.items.pop_front()
    }

    /// Oldest dispatch, if any.
    pub fn front(&self) -> Option<&D> {
        self.items.front()
    }

    /// Newest dispatch, if any.
    pub fn back(&self) -> Option<&D> {
        self.items.back()
    }

    /// Dispatch at `index` in stamp order.
    pub fn get(&self, index: usize) -> Option<&D> {
        self.items.get(index)
    }

    /// Stamp of the oldest dispatch.
    ///
    /// # Errors
    /// `Empty` when the queue holds no data; calling this without
    /// checking is a programmer error.
    pub fn oldest_stamp(&self) -> Result<StampOf<D>, CaptureError> {
        self.items
            .front()
            .map(|d| d.stamp())
            .ok_or(CaptureError::empty("read oldest stamp"))
    }

    /// Stamp of the newest dispatch.
    ///
    /// # Errors
    /// `Empty` when the queue holds no data.
    pub fn newest_stamp(&self) -> Result<StampOf<D>, CaptureError> {
        self.items
            .back()
            .map(|d| d.stamp())
            .ok_or(CaptureError::empty("read newest stamp"))
    }

    /// Drop every dispatch whose stamp is `< stamp`; returns the count.
    ///
    /// Linear in the number of evicted elements only.
    pub fn remove_before(&mut self, stamp: StampOf<D>) -> usize {
        let mut removed = 0;
        while self
            .items
            .front()
            .is_some_and(|front| front.stamp() < stamp)
        {
            self.items.pop_front();
            removed += 1;
        }
        removed
    }

    /// Drop the `count` oldest dispatches; returns how many were dropped.
    pub fn remove_first_n(&mut self, count: usize) -> usize {
        let removed = count.min(self.items.len());
        for _ in 0..removed {
            self.items.pop_front();
        }
        removed
    }

    /// Forward traversal in stamp order.
    pub fn iter(&self) -> impl Iterator<Item = &D> {
        self.items.iter()
    }

    /// Number of buffered dispatches.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue holds no data.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Configured capacity (`None` = unbounded).
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Change the capacity (`0` = unbounded); shrinking evicts oldest first.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = (capacity > 0).then_some(capacity);
        if let Some(capacity) = self.capacity {
            while self.items.len() > capacity {
                self.items.pop_front();
                self.dropped += 1;
            }
        }
    }

    /// Capacity evictions so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Out-of-order rejections so far.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Snapshot for diagnostics.
    pub fn stats(&self) -> CaptorStats<StampOf<D>> {
        CaptorStats {
            depth: self.items.len(),
            capacity: self.capacity,
            dropped: self.dropped,
            rejected: self.rejected,
            oldest_stamp: self.items.front().map(|d| d.stamp()),
            newest_stamp: self.items.back().map(|d| d.stamp()),
        }
    }
}

impl<D: Stamped> Default for DispatchQueue<D> {
    fn default() -> Self {
        Self::new()
    }
}
