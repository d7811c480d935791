//! StreamPacket - the pipeline's concrete wire-level dispatch.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{Stamped, StreamId};

/// One stamped message as carried by the pipeline layer.
///
/// The payload is opaque to the synchronization core; transport and
/// decoding live outside this library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamPacket {
    /// Originating stream.
    pub stream_id: StreamId,

    /// Sequencing stamp in nanosecond ticks.
    pub stamp: i64,

    /// Optional producer-side sequence number, for diagnostics.
    pub seq: Option<u64>,

    /// Opaque payload bytes.
    pub payload: Bytes,
}

impl StreamPacket {
    /// Create a packet without a producer sequence number.
    pub fn new(stream_id: impl Into<StreamId>, stamp: i64, payload: Bytes) -> Self {
        Self {
            stream_id: stream_id.into(),
            stamp,
            seq: None,
            payload,
        }
    }

    /// Attach a producer sequence number.
    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = Some(seq);
        self
    }
}

impl Stamped for StreamPacket {
    type Stamp = i64;

    fn stamp(&self) -> i64 {
        self.stamp
    }
}
