//! Ingestion pipeline 主入口
//!
//! 管理多个数据源，每个源经由一个背压通道和 pump 任务注入到对应流的
//! captor 队列。

use std::sync::Arc;

use async_channel::{bounded, Receiver};
use capture::PacketInjector;
use contracts::{CaptureError, DispatchSource, StreamPacket};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::config::{BackpressureConfig, IngestionMetrics};

struct Registration {
    source: Box<dyn DispatchSource>,
    injector: PacketInjector,
    config: BackpressureConfig,
}

/// Ingestion pipeline
///
/// 统一注册数据源并桥接到 captor 注入句柄。
pub struct IngestionPipeline {
    registrations: Vec<Registration>,
    metrics: Arc<IngestionMetrics>,
    default_config: BackpressureConfig,
}

impl IngestionPipeline {
    /// 使用默认背压配置创建
    pub fn new(default_config: BackpressureConfig) -> Self {
        Self {
            registrations: Vec::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            default_config,
        }
    }

    /// 注册一个数据源及其注入句柄
    ///
    /// # Arguments
    /// * `source` - 实现 `DispatchSource` trait 的数据源
    /// * `injector` - 目标流的注入句柄
    /// * `config` - 可选的背压配置（缺省用全局默认）
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source, injector, config),
        fields(stream_id = %source.stream_id())
    )]
    pub fn register(
        &mut self,
        source: Box<dyn DispatchSource>,
        injector: PacketInjector,
        config: Option<BackpressureConfig>,
    ) {
        debug!(stream_id = %source.stream_id(), "registered dispatch source");
        self.registrations.push(Registration {
            source,
            injector,
            config: config.unwrap_or_else(|| self.default_config.clone()),
        });
    }

    /// 启动全部源和 pump 任务
    ///
    /// 返回 pump 任务句柄；任务在源停止且通道清空后退出。
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::with_capacity(self.registrations.len());
        for registration in &self.registrations {
            let rx = Self::bridge(registration, Arc::clone(&self.metrics));
            let injector = Arc::clone(&registration.injector);
            let metrics = Arc::clone(&self.metrics);
            tasks.push(tokio::spawn(pump_loop(rx, injector, metrics)));
        }
        debug!(sources = tasks.len(), "ingestion pumps started");
        tasks
    }

    /// 停止全部源
    pub fn stop_all(&self) {
        for registration in &self.registrations {
            registration.source.stop();
        }
    }

    /// 共享的 ingestion 指标
    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }

    /// 已注册的源数量
    pub fn source_count(&self) -> usize {
        self.registrations.len()
    }

    /// 把回调式数据源桥接到有界通道；通道满时丢弃并计数。
    fn bridge(
        registration: &Registration,
        metrics: Arc<IngestionMetrics>,
    ) -> Receiver<StreamPacket> {
        let (tx, rx) = bounded(registration.config.channel_capacity);
        registration.source.listen(Arc::new(move |packet| {
            if tx.try_send(packet).is_err() {
                metrics.record_backpressure_drop();
            }
        }));
        rx
    }
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self::new(BackpressureConfig::default())
    }
}

/// 单源 pump：通道 → captor 注入
async fn pump_loop(
    rx: Receiver<StreamPacket>,
    injector: PacketInjector,
    metrics: Arc<IngestionMetrics>,
) {
    while let Ok(packet) = rx.recv().await {
        metrics.record_received();
        let stream_id = packet.stream_id.clone();
        let stamp = packet.stamp;

        match injector.inject(packet) {
            Ok(()) => {
                metrics.record_injected();
                metrics::counter!(
                    "ingestion_packets_injected_total",
                    "stream_id" => stream_id.to_string()
                )
                .increment(1);
            }
            Err(CaptureError::OutOfOrderStamp { .. }) => {
                metrics.record_rejected();
                warn!(stream_id = %stream_id, stamp, "out-of-order packet rejected");
            }
            Err(CaptureError::ContendedQueue) => {
                metrics.record_contended();
            }
            Err(error) => {
                warn!(stream_id = %stream_id, error = %error, "packet injection failed");
            }
        }
    }
    debug!("pump loop finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDispatchSource;
    use capture::drivers::Next;
    use capture::{Captor, Injector};
    use contracts::MutexLock;
    use std::time::Duration;

    #[tokio::test]
    async fn test_pump_moves_packets_into_captor() {
        let captor: Captor<Next<StreamPacket>, MutexLock> = Captor::new("imu", Next::new());
        let handle = captor.handle();

        let mut pipeline = IngestionPipeline::default();
        pipeline.register(
            Box::new(MockDispatchSource::with_rate("imu", 500.0)),
            Arc::new(captor),
            None,
        );

        let _tasks = pipeline.start_all();

        // Wait for a few packets to land in the captor queue.
        for _ in 0..100 {
            if handle.size() >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        pipeline.stop_all();

        assert!(handle.size() >= 3);
        assert!(pipeline.metrics().injected() >= 3);
        assert_eq!(pipeline.metrics().rejected(), 0);
    }

    #[tokio::test]
    async fn test_out_of_order_packets_are_counted() {
        struct BackwardsSource {
            id: contracts::StreamId,
        }

        impl DispatchSource for BackwardsSource {
            fn stream_id(&self) -> &contracts::StreamId {
                &self.id
            }

            fn listen(&self, callback: contracts::DispatchCallback) {
                callback(StreamPacket::new("x", 10, bytes::Bytes::new()));
                callback(StreamPacket::new("x", 5, bytes::Bytes::new()));
            }

            fn stop(&self) {}

            fn is_listening(&self) -> bool {
                false
            }
        }

        let captor: Captor<Next<StreamPacket>, MutexLock> = Captor::new("x", Next::new());
        let handle = captor.handle();

        let mut pipeline = IngestionPipeline::default();
        pipeline.register(
            Box::new(BackwardsSource { id: "x".into() }),
            Arc::new(captor),
            None,
        );
        let _tasks = pipeline.start_all();

        for _ in 0..100 {
            if pipeline.metrics().rejected() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(pipeline.metrics().rejected(), 1);
        assert_eq!(handle.size(), 1);
    }
}
