//! Blueprint assembly: validated configuration to a wired synchronizer.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use capture::{drivers, followers};
use capture::{Captor, DispatchQueue, DriverCaptor, FollowerCaptor, PacketInjector};
use contracts::{
    millis_to_nanos, BufferConfig, CaptureError, DriverPolicyConfig, FollowerPolicyConfig,
    MutexLock, PipelineBlueprint, StreamId, StreamPacket,
};
use tracing::debug;

use crate::sync::Synchronizer;

/// A fully wired synchronizer plus the producer-side handles, one per
/// stream.
pub struct AssembledPipeline {
    /// Cycle orchestrator over all configured streams.
    pub synchronizer: Synchronizer<StreamPacket>,
    /// Injection handles keyed by stream.
    pub injectors: HashMap<StreamId, PacketInjector>,
}

impl std::fmt::Debug for AssembledPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssembledPipeline")
            .field("injectors", &self.injectors.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn queue_for(buffer: &BufferConfig) -> DispatchQueue<StreamPacket> {
    DispatchQueue::bounded(buffer.capacity, buffer.overflow)
}

/// Build captors for every configured stream and wire them into a
/// synchronizer. Captors use `MutexLock` so producers can inject from
/// other tasks.
///
/// # Errors
/// `ConfigValidation` on duplicate stream ids or a zero chunk size.
pub fn assemble(blueprint: &PipelineBlueprint) -> Result<AssembledPipeline, CaptureError> {
    let mut injectors: HashMap<StreamId, PacketInjector> = HashMap::new();

    let driver_id = blueprint.driver.stream.clone();
    let queue = queue_for(&blueprint.driver.buffer);
    let (driver, driver_injector): (Box<dyn DriverCaptor<StreamPacket>>, PacketInjector) =
        match &blueprint.driver.policy {
            DriverPolicyConfig::Next => {
                let captor: Captor<drivers::Next<StreamPacket>, MutexLock> =
                    Captor::new(driver_id.clone(), drivers::Next::with_queue(queue));
                (Box::new(captor.handle()), Arc::new(captor))
            }
            DriverPolicyConfig::Throttled { period_ms } => {
                let captor: Captor<drivers::Throttled<StreamPacket>, MutexLock> = Captor::new(
                    driver_id.clone(),
                    drivers::Throttled::with_queue(millis_to_nanos(*period_ms), queue),
                );
                (Box::new(captor.handle()), Arc::new(captor))
            }
            DriverPolicyConfig::Chunk { size } => {
                let size = NonZeroUsize::new(*size).ok_or_else(|| {
                    CaptureError::config_validation(
                        "driver.policy.size",
                        "chunk size must be at least 1",
                    )
                })?;
                let captor: Captor<drivers::Chunk<StreamPacket>, MutexLock> = Captor::new(
                    driver_id.clone(),
                    drivers::Chunk::with_queue(size, queue),
                );
                (Box::new(captor.handle()), Arc::new(captor))
            }
            DriverPolicyConfig::Batch { period_ms } => {
                let captor: Captor<drivers::Batch<StreamPacket>, MutexLock> = Captor::new(
                    driver_id.clone(),
                    drivers::Batch::with_queue(millis_to_nanos(*period_ms), queue),
                );
                (Box::new(captor.handle()), Arc::new(captor))
            }
        };
    injectors.insert(driver_id.clone(), driver_injector);

    let mut builder = Synchronizer::builder(driver);
    for follower in &blueprint.followers {
        let id = follower.stream.clone();
        let queue = queue_for(&follower.buffer);
        let (captor, injector): (Box<dyn FollowerCaptor<StreamPacket>>, PacketInjector) =
            match &follower.policy {
                FollowerPolicyConfig::AnyBefore { delay_ms } => {
                    let captor: Captor<followers::AnyBefore<StreamPacket>, MutexLock> =
                        Captor::new(
                            id.clone(),
                            followers::AnyBefore::with_queue(millis_to_nanos(*delay_ms), queue),
                        );
                    (Box::new(captor.handle()), Arc::new(captor))
                }
                FollowerPolicyConfig::Before { delay_ms } => {
                    let captor: Captor<followers::Before<StreamPacket>, MutexLock> = Captor::new(
                        id.clone(),
                        followers::Before::with_queue(millis_to_nanos(*delay_ms), queue),
                    );
                    (Box::new(captor.handle()), Arc::new(captor))
                }
                FollowerPolicyConfig::ClosestBefore {
                    period_ms,
                    delay_ms,
                } => {
                    let captor: Captor<followers::ClosestBefore<StreamPacket>, MutexLock> =
                        Captor::new(
                            id.clone(),
                            followers::ClosestBefore::with_queue(
                                millis_to_nanos(*period_ms),
                                millis_to_nanos(*delay_ms),
                                queue,
                            ),
                        );
                    (Box::new(captor.handle()), Arc::new(captor))
                }
                FollowerPolicyConfig::Ranged { delay_ms } => {
                    let captor: Captor<followers::Ranged<StreamPacket>, MutexLock> = Captor::new(
                        id.clone(),
                        followers::Ranged::with_queue(millis_to_nanos(*delay_ms), queue),
                    );
                    (Box::new(captor.handle()), Arc::new(captor))
                }
                FollowerPolicyConfig::Matched { tolerance_ms } => {
                    let captor: Captor<followers::Matched<StreamPacket>, MutexLock> = Captor::new(
                        id.clone(),
                        followers::Matched::with_queue(millis_to_nanos(*tolerance_ms), queue),
                    );
                    (Box::new(captor.handle()), Arc::new(captor))
                }
                FollowerPolicyConfig::Latched => {
                    let captor: Captor<followers::Latched<StreamPacket>, MutexLock> =
                        Captor::new(id.clone(), followers::Latched::with_queue(queue));
                    (Box::new(captor.handle()), Arc::new(captor))
                }
            };

        if injectors.insert(id.clone(), injector).is_some() {
            return Err(CaptureError::config_validation(
                "followers.stream",
                format!("duplicate stream id '{id}'"),
            ));
        }
        builder = builder.follower(captor);
    }

    let synchronizer = builder.build();
    debug!(
        driver = %synchronizer.driver_id(),
        followers = synchronizer.follower_count(),
        "pipeline assembled"
    );

    Ok(AssembledPipeline {
        synchronizer,
        injectors,
    })
}
