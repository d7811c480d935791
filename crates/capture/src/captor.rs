//! Capture policy contract and the lock-mediated captor handle.
//!
//! Policies are plain state machines over their own queue; [`Captor`]
//! layers a [`LockPolicy`] on top so producers can inject from other
//! tasks while a consumer runs capture cycles. The object-safe
//! [`DriverCaptor`]/[`FollowerCaptor`]/[`Injector`] traits form the
//! dynamic boundary the synchronizer and the ingestion pumps compose
//! over, while policy hot paths stay monomorphized.

use std::sync::Arc;

use contracts::{
    CaptorStats, CaptureError, CaptureRange, Contended, DispatchSink, LockPolicy, NoLock, StampOf,
    Stamped, State, StreamId,
};

use crate::queue::DispatchQueue;

/// Behavior shared by every capture policy: exclusive queue ownership,
/// abort, and reset.
pub trait CapturePolicy<D: Stamped> {
    /// The policy's dispatch queue.
    fn queue(&self) -> &DispatchQueue<D>;

    /// Mutable access to the policy's dispatch queue.
    fn queue_mut(&mut self) -> &mut DispatchQueue<D>;

    /// Drop buffered data older than `t_abort`. Never fails.
    ///
    /// Policies that must keep already-selected data across an abort
    /// override this with a no-op.
    fn abort(&mut self, t_abort: StampOf<D>) {
        self.queue_mut().remove_before(t_abort);
    }

    /// Return scalar state to its initial values; the queue is retained.
    fn reset(&mut self) {}
}

/// A policy that drives the capture range.
pub trait DriverPolicy<D: Stamped>: CapturePolicy<D> {
    /// Probe without emitting.
    ///
    /// Returns the same [`State`] as [`capture`](Self::capture) would
    /// for the same pre-state and may evict, but never emits. Populates
    /// `range` on PRIMED (and its `lower_stamp` on ABORT).
    fn dry_capture(&mut self, range: &mut CaptureRange<StampOf<D>>) -> State;

    /// Capture: may mutate the queue and emit dispatches into `output`.
    fn capture(
        &mut self,
        output: &mut dyn DispatchSink<D>,
        range: &mut CaptureRange<StampOf<D>>,
    ) -> State;
}

/// A policy that reacts to a driver-supplied range.
///
/// Followers never mutate the range.
pub trait FollowerPolicy<D: Stamped>: CapturePolicy<D> {
    /// Probe without emitting; may evict.
    fn dry_capture(&mut self, range: &CaptureRange<StampOf<D>>) -> State;

    /// Capture: may mutate the queue and emit dispatches into `output`.
    fn capture(
        &mut self,
        output: &mut dyn DispatchSink<D>,
        range: &CaptureRange<StampOf<D>>,
    ) -> State;
}

/// Shared handle around a capture policy, mediated by a lock policy.
///
/// Cloning is cheap; all clones address the same policy. With
/// [`PollingLock`](contracts::PollingLock), contended capture
/// operations report RETRY and contended injections fail with
/// `ContendedQueue`, as if the queue were empty.
pub struct Captor<P, L: LockPolicy = NoLock> {
    id: StreamId,
    shared: Arc<L::Cell<P>>,
}

impl<P, L: LockPolicy> Clone for Captor<P, L> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P, L: LockPolicy> Captor<P, L> {
    /// Wrap `policy` for the stream `id`.
    pub fn new(id: impl Into<StreamId>, policy: P) -> Self {
        Self {
            id: id.into(),
            shared: Arc::new(L::new_cell(policy)),
        }
    }

    /// Stream this captor buffers for.
    pub fn id(&self) -> &StreamId {
        &self.id
    }

    /// Another handle to the same captor.
    pub fn handle(&self) -> Self {
        self.clone()
    }

    /// Inject a range of dispatches under a single lock acquisition.
    ///
    /// Stops at the first push failure; returns how many were accepted.
    pub fn insert<D, I>(&self, dispatches: I) -> Result<usize, CaptureError>
    where
        D: Stamped,
        P: CapturePolicy<D>,
        I: IntoIterator<Item = D>,
    {
        let outcome = L::with(&self.shared, |policy| {
            let mut accepted = 0;
            for dispatch in dispatches {
                policy.queue_mut().push(dispatch)?;
                accepted += 1;
            }
            Ok(accepted)
        });
        match outcome {
            Ok(result) => result,
            Err(Contended) => Err(CaptureError::ContendedQueue),
        }
    }

    /// Run an inspection callback over every buffered dispatch.
    ///
    /// The queue is immutable for the duration of the traversal. A
    /// contended polling lock skips the traversal.
    pub fn inspect<D>(&self, mut inspect_dispatch: impl FnMut(&D))
    where
        D: Stamped,
        P: CapturePolicy<D>,
    {
        let _ = L::with(&self.shared, |policy| {
            for dispatch in policy.queue().iter() {
                inspect_dispatch(dispatch);
            }
        });
    }
}

/// Producer-side handle for the pipeline's concrete packet type.
pub type PacketInjector = Arc<dyn Injector<contracts::StreamPacket> + Send + Sync>;

/// Object-safe producer-side handle: injection and queue housekeeping.
pub trait Injector<D: Stamped> {
    /// Stream this handle injects into.
    fn id(&self) -> &StreamId;

    /// Append one dispatch to the policy's queue.
    ///
    /// # Errors
    /// Queue errors (`OutOfOrderStamp`, `CapacityExceeded`) and
    /// `ContendedQueue` under a contended polling lock.
    fn inject(&self, dispatch: D) -> Result<(), CaptureError>;

    /// Buffered dispatch count (0 when contended).
    fn size(&self) -> usize;

    /// Queue snapshot for diagnostics.
    fn stats(&self) -> CaptorStats<StampOf<D>>;

    /// Stamp window of the buffered data, when non-empty.
    fn available_stamp_range(&self) -> Option<CaptureRange<StampOf<D>>>;

    /// Change the queue capacity (`0` = unbounded).
    fn set_capacity(&self, capacity: usize);
}

impl<D, P, L> Injector<D> for Captor<P, L>
where
    D: Stamped,
    P: CapturePolicy<D>,
    L: LockPolicy,
{
    fn id(&self) -> &StreamId {
        &self.id
    }

    fn inject(&self, dispatch: D) -> Result<(), CaptureError> {
        match L::with(&self.shared, |policy| policy.queue_mut().push(dispatch)) {
            Ok(result) => result,
            Err(Contended) => Err(CaptureError::ContendedQueue),
        }
    }

    fn size(&self) -> usize {
        L::with(&self.shared, |policy| policy.queue().len()).unwrap_or(0)
    }

    fn stats(&self) -> CaptorStats<StampOf<D>> {
        L::with(&self.shared, |policy| policy.queue().stats()).unwrap_or_default()
    }

    fn available_stamp_range(&self) -> Option<CaptureRange<StampOf<D>>> {
        L::with(&self.shared, |policy| {
            let queue = policy.queue();
            match (queue.front(), queue.back()) {
                (Some(oldest), Some(newest)) => {
                    Some(CaptureRange::new(oldest.stamp(), newest.stamp()))
                }
                _ => None,
            }
        })
        .unwrap_or(None)
    }

    fn set_capacity(&self, capacity: usize) {
        let _ = L::with(&self.shared, |policy| {
            policy.queue_mut().set_capacity(capacity)
        });
    }
}

/// Object-safe driver boundary used by the synchronizer.
pub trait DriverCaptor<D: Stamped> {
    /// Stream this captor buffers for.
    fn id(&self) -> &StreamId;

    /// Run the policy's capture under the lock.
    fn capture(
        &self,
        output: &mut dyn DispatchSink<D>,
        range: &mut CaptureRange<StampOf<D>>,
    ) -> State;

    /// Run the policy's dry capture under the lock.
    fn dry_capture(&self, range: &mut CaptureRange<StampOf<D>>) -> State;

    /// Drop buffered data older than `t_abort`.
    fn abort(&self, t_abort: StampOf<D>);

    /// Reset policy scalar state.
    fn reset(&self);

    /// Queue snapshot for diagnostics.
    fn stats(&self) -> CaptorStats<StampOf<D>>;
}

/// Object-safe follower boundary used by the synchronizer.
pub trait FollowerCaptor<D: Stamped> {
    /// Stream this captor buffers for.
    fn id(&self) -> &StreamId;

    /// Run the policy's capture under the lock.
    fn capture(&self, output: &mut dyn DispatchSink<D>, range: &CaptureRange<StampOf<D>>)
        -> State;

    /// Run the policy's dry capture under the lock.
    fn dry_capture(&self, range: &CaptureRange<StampOf<D>>) -> State;

    /// Drop buffered data older than `t_abort` (policy-specific).
    fn abort(&self, t_abort: StampOf<D>);

    /// Reset policy scalar state.
    fn reset(&self);

    /// Queue snapshot for diagnostics.
    fn stats(&self) -> CaptorStats<StampOf<D>>;
}

impl<D, P, L> DriverCaptor<D> for Captor<P, L>
where
    D: Stamped,
    P: DriverPolicy<D>,
    L: LockPolicy,
{
    fn id(&self) -> &StreamId {
        &self.id
    }

    fn capture(
        &self,
        output: &mut dyn DispatchSink<D>,
        range: &mut CaptureRange<StampOf<D>>,
    ) -> State {
        L::with(&self.shared, |policy| policy.capture(output, range)).unwrap_or(State::Retry)
    }

    fn dry_capture(&self, range: &mut CaptureRange<StampOf<D>>) -> State {
        L::with(&self.shared, |policy| policy.dry_capture(range)).unwrap_or(State::Retry)
    }

    fn abort(&self, t_abort: StampOf<D>) {
        let _ = L::with(&self.shared, |policy| policy.abort(t_abort));
    }

    fn reset(&self) {
        let _ = L::with(&self.shared, |policy| policy.reset());
    }

    fn stats(&self) -> CaptorStats<StampOf<D>> {
        L::with(&self.shared, |policy| policy.queue().stats()).unwrap_or_default()
    }
}

impl<D, P, L> FollowerCaptor<D> for Captor<P, L>
where
    D: Stamped,
    P: FollowerPolicy<D>,
    L: LockPolicy,
{
    fn id(&self) -> &StreamId {
        &self.id
    }

    fn capture(
        &self,
        output: &mut dyn DispatchSink<D>,
        range: &CaptureRange<StampOf<D>>,
    ) -> State {
        L::with(&self.shared, |policy| policy.capture(output, range)).unwrap_or(State::Retry)
    }

    fn dry_capture(&self, range: &CaptureRange<StampOf<D>>) -> State {
        L::with(&self.shared, |policy| policy.dry_capture(range)).unwrap_or(State::Retry)
    }

    fn abort(&self, t_abort: StampOf<D>) {
        let _ = L::with(&self.shared, |policy| policy.abort(t_abort));
    }

    fn reset(&self) {
        let _ = L::with(&self.shared, |policy| policy.reset());
    }

    fn stats(&self) -> CaptorStats<StampOf<D>> {
        L::with(&self.shared, |policy| policy.queue().stats()).unwrap_or_default()
    }
}
