//! DispatchSource trait - Producer-side data source abstraction
//!
//! Defines a unified interface for packet producers, decoupling the
//! ingestion pumps from concrete sources. Mock sources and live feeds
//! are handled through the same API.

use std::sync::Arc;

use crate::{StreamId, StreamPacket};

/// Packet callback type.
///
/// When a source produces data, it sends `StreamPacket` through this
/// callback. Uses `Arc` to allow callback sharing across contexts.
pub type DispatchCallback = Arc<dyn Fn(StreamPacket) + Send + Sync>;

/// Producer-side packet source trait.
///
/// All packet sources implement this trait for use by the ingestion
/// pipeline.
pub trait DispatchSource: Send + Sync {
    /// Stream this source produces for.
    fn stream_id(&self) -> &StreamId;

    /// Register the data callback.
    ///
    /// When the source produces a packet it invokes the callback.
    /// Repeated calls while already listening are idempotent.
    fn listen(&self, callback: DispatchCallback);

    /// Stop producing.
    fn stop(&self);

    /// Whether the source is currently producing.
    fn is_listening(&self) -> bool;
}
