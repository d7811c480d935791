//! Dispatch model: a single stamped message.

use serde::{Deserialize, Serialize};

use crate::Stamp;

/// Access to the sequencing stamp of a dispatch-like message type.
///
/// Capture policies are generic over this trait, so user message types
/// plug into the buffers directly instead of being wrapped.
pub trait Stamped {
    /// Sequencing stamp type.
    type Stamp: Stamp;

    /// The stamp this message is sequenced by.
    fn stamp(&self) -> Self::Stamp;
}

/// Stamp type of a dispatch type.
pub type StampOf<D> = <D as Stamped>::Stamp;

/// Offset type of a dispatch type's stamp.
pub type OffsetOf<D> = <<D as Stamped>::Stamp as Stamp>::Offset;

/// A stamped message `(stamp, value)`.
///
/// The stamp is immutable once the dispatch is buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatch<S, T> {
    /// Sequencing stamp.
    pub stamp: S,
    /// Message payload.
    pub value: T,
}

impl<S, T> Dispatch<S, T> {
    /// Create a new dispatch.
    pub fn new(stamp: S, value: T) -> Self {
        Self { stamp, value }
    }

    /// Consume the dispatch, keeping only the payload.
    pub fn into_value(self) -> T {
        self.value
    }
}

impl<S: Stamp, T> Stamped for Dispatch<S, T> {
    type Stamp = S;

    fn stamp(&self) -> S {
        self.stamp
    }
}

/// Extract the stamp of any dispatch-like value.
pub fn get_stamp<D: Stamped>(dispatch: &D) -> D::Stamp {
    dispatch.stamp()
}

/// Extract the payload of a plain [`Dispatch`].
pub fn get_value<S, T>(dispatch: &Dispatch<S, T>) -> &T {
    &dispatch.value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_accessors() {
        let d = Dispatch::new(42i64, "payload");
        assert_eq!(get_stamp(&d), 42);
        assert_eq!(*get_value(&d), "payload");
        assert_eq!(d.into_value(), "payload");
    }
}
