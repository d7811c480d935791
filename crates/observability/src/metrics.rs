//! Capture 指标收集模块
//!
//! 基于 CaptureMeta 收集和统计同步管道的运行指标。

use contracts::CaptureMeta;
use metrics::{counter, gauge, histogram};

/// 从 CaptureMeta 记录指标
///
/// 每次产生 SyncedCapture 时调用此函数来记录指标。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_capture_metrics;
///
/// if let CycleOutcome::Primed(capture) = synchronizer.capture()? {
///     record_capture_metrics(&capture.meta, capture.seq);
///     // ...
/// }
/// ```
pub fn record_capture_metrics(meta: &CaptureMeta, seq: u64) {
    // 捕获计数器
    counter!("stream_syncer_captures_total").increment(1);

    // 捕获序号 (用于检测跳号)
    gauge!("stream_syncer_last_capture_seq").set(seq as f64);

    // 提交前经历的 RETRY/ABORT 轮数
    histogram!("stream_syncer_retries_per_capture").record(meta.retries as f64);
    if meta.aborts > 0 {
        counter!("stream_syncer_aborted_cycles_total").increment(meta.aborts as u64);
    }

    // 丢包计数（容量驱逐）
    gauge!("stream_syncer_packets_dropped_current").set(meta.dropped_total as f64);

    // 乱序拒绝计数
    gauge!("stream_syncer_packets_rejected_current").set(meta.rejected_total as f64);

    // 各流本次贡献的 dispatch 数
    for (stream_id, count) in &meta.stream_counts {
        histogram!(
            "stream_syncer_dispatches_per_capture",
            "stream_id" => stream_id.to_string()
        )
        .record(*count as f64);

        if *count == 0 {
            counter!(
                "stream_syncer_empty_contributions_total",
                "stream_id" => stream_id.to_string()
            )
            .increment(1);
        }
    }
}

/// 记录数据包接收
pub fn record_packet_received(stream_id: &str) {
    counter!(
        "stream_syncer_packets_received_total",
        "stream_id" => stream_id.to_string()
    )
    .increment(1);
}

/// 记录捕获结果分发
pub fn record_sink_write(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "stream_syncer_captures_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录捕获周期延迟 (从数据产生到提交)
pub fn record_cycle_latency_ms(latency_ms: f64) {
    histogram!("stream_syncer_cycle_latency_ms").record(latency_ms);
}

/// 记录 captor 队列深度
pub fn record_queue_depth(stream_id: &str, depth: usize) {
    gauge!(
        "stream_syncer_queue_depth",
        "stream_id" => stream_id.to_string()
    )
    .set(depth as f64);
}

/// 捕获指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct CaptureMetricsAggregator {
    /// 总捕获数
    pub total_captures: u64,

    /// RETRY 轮数总计
    pub total_retries: u64,

    /// ABORT 轮数总计
    pub total_aborts: u64,

    /// 容量驱逐总数（最近一次观测值）
    pub total_dropped: u64,

    /// 乱序拒绝总数（最近一次观测值）
    pub total_rejected: u64,

    /// 每次捕获的 RETRY 轮数统计
    pub retry_stats: RunningStats,

    /// 各流贡献 dispatch 数统计
    pub dispatch_stats: std::collections::HashMap<String, RunningStats>,

    /// 各流空贡献次数
    pub empty_counts: std::collections::HashMap<String, u64>,
}

impl CaptureMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, meta: &CaptureMeta) {
        self.total_captures += 1;
        self.total_retries += meta.retries as u64;
        self.total_aborts += meta.aborts as u64;
        self.total_dropped = meta.dropped_total;
        self.total_rejected = meta.rejected_total;

        self.retry_stats.push(meta.retries as f64);

        for (stream_id, count) in &meta.stream_counts {
            self.dispatch_stats
                .entry(stream_id.to_string())
                .or_default()
                .push(*count as f64);

            if *count == 0 {
                *self.empty_counts.entry(stream_id.to_string()).or_insert(0) += 1;
            }
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_captures: self.total_captures,
            total_retries: self.total_retries,
            total_aborts: self.total_aborts,
            total_dropped: self.total_dropped,
            total_rejected: self.total_rejected,
            abort_rate: if self.total_captures > 0 {
                self.total_aborts as f64 / self.total_captures as f64 * 100.0
            } else {
                0.0
            },
            retries_per_capture: StatsSummary::from(&self.retry_stats),
            stream_empty_counts: self.empty_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_captures: u64,
    pub total_retries: u64,
    pub total_aborts: u64,
    pub total_dropped: u64,
    pub total_rejected: u64,
    pub abort_rate: f64,
    pub retries_per_capture: StatsSummary,
    pub stream_empty_counts: std::collections::HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Capture Metrics Summary ===")?;
        writeln!(f, "Total captures: {}", self.total_captures)?;
        writeln!(f, "Retry cycles: {}", self.total_retries)?;
        writeln!(
            f,
            "Aborted cycles: {} ({:.2}%)",
            self.total_aborts, self.abort_rate
        )?;
        writeln!(f, "Dropped packets: {}", self.total_dropped)?;
        writeln!(f, "Rejected packets: {}", self.total_rejected)?;
        writeln!(f, "Retries per capture: {}", self.retries_per_capture)?;

        if !self.stream_empty_counts.is_empty() {
            writeln!(f, "Empty contributions:")?;
            for (stream, count) in &self.stream_empty_counts {
                writeln!(f, "  {}: {}", stream, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        if stats.count() == 0 {
            return Self::default();
        }
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值（无样本时为正无穷）
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值（无样本时为负无穷）
    pub fn max(&self) -> f64 {
        self.max
    }
}
