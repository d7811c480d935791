//! # Ingestion
//!
//! 生产者侧数据接入：把 [`DispatchSource`](contracts::DispatchSource)
//! 产生的数据包经由背压通道送入各流的 captor 队列。
//!
//! 职责：
//! - 统一注册 Mock 与真实数据源
//! - 每个源一个 pump 任务，通道满时丢弃并计数
//! - 注入失败（乱序/争用）分类计数
//!
//! ## 使用示例
//!
//! ```ignore
//! use ingestion::{IngestionPipeline, MockDispatchSource};
//!
//! let mut pipeline = IngestionPipeline::default();
//! pipeline.register(Box::new(source), injector, None);
//! let tasks = pipeline.start_all();
//! // ... run capture cycles ...
//! pipeline.stop_all();
//! ```

mod config;
mod mock;
mod pump;

pub use config::{BackpressureConfig, IngestionMetrics, IngestionSnapshot};
pub use mock::{MockDispatchSource, MockSourceConfig};
pub use pump::IngestionPipeline;
