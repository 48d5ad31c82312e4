//! 转发指标收集模块
//!
//! 记录 ZeroMQ 输出的发送计数，并在内存中聚合统计摘要。

use std::collections::BTreeMap;

use contracts::ErrorKind;
use metrics::{counter, histogram};

/// 记录一个成功发送的信封
pub fn record_envelope_sent(sink_name: &str, payload_bytes: usize) {
    counter!(
        "zmq_forwarder_envelopes_sent_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
    counter!(
        "zmq_forwarder_bytes_sent_total",
        "sink" => sink_name.to_string()
    )
    .increment(payload_bytes as u64);
    histogram!(
        "zmq_forwarder_payload_bytes",
        "sink" => sink_name.to_string()
    )
    .record(payload_bytes as f64);
}

/// 记录发送失败 (按错误类型分类)
pub fn record_send_failure(sink_name: &str, kind: ErrorKind) {
    counter!(
        "zmq_forwarder_send_failures_total",
        "sink" => sink_name.to_string(),
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// 记录批次分发结果
pub fn record_batch_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "zmq_forwarder_batches_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 转发统计聚合器
///
/// 在内存中聚合指标，便于运行结束时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct ForwardStatsAggregator {
    /// 总批次数
    pub total_batches: u64,

    /// 失败批次数
    pub failed_batches: u64,

    /// 入队被丢弃的批次数
    pub dropped_batches: u64,

    /// 分发的指标总数 (每个输出各计一次)
    pub total_metrics: u64,

    /// 批次大小统计
    pub batch_size_stats: RunningStats,

    /// 各类错误次数
    pub failure_counts: BTreeMap<&'static str, u64>,
}

impl ForwardStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个已提交的批次
    pub fn record_batch(&mut self, size: usize, accepted: bool) {
        self.total_batches += 1;
        self.total_metrics += size as u64;
        self.batch_size_stats.push(size as f64);
        if !accepted {
            self.dropped_batches += 1;
        }
    }

    /// 记录失败批次
    pub fn record_failed_batches(&mut self, count: u64) {
        self.failed_batches += count;
    }

    /// 按错误类型记录发送失败次数
    pub fn record_failures(&mut self, kind: ErrorKind, count: u64) {
        if count == 0 {
            return;
        }
        *self.failure_counts.entry(kind.as_str()).or_insert(0) += count;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> ForwardSummary {
        ForwardSummary {
            total_batches: self.total_batches,
            failed_batches: self.failed_batches,
            dropped_batches: self.dropped_batches,
            total_metrics: self.total_metrics,
            drop_rate: if self.total_batches > 0 {
                self.dropped_batches as f64 / self.total_batches as f64 * 100.0
            } else {
                0.0
            },
            batch_size: StatsSummary::from(&self.batch_size_stats),
            failure_counts: self.failure_counts.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 转发摘要
#[derive(Debug, Clone, Default)]
pub struct ForwardSummary {
    pub total_batches: u64,
    pub failed_batches: u64,
    pub dropped_batches: u64,
    pub total_metrics: u64,
    pub drop_rate: f64,
    pub batch_size: StatsSummary,
    pub failure_counts: BTreeMap<&'static str, u64>,
}

impl std::fmt::Display for ForwardSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Forwarding Summary ===")?;
        writeln!(f, "Metrics dispatched: {}", self.total_metrics)?;
        writeln!(f, "Batches: {}", self.total_batches)?;
        writeln!(
            f,
            "Dropped batches: {} ({:.2}%)",
            self.dropped_batches, self.drop_rate
        )?;
        writeln!(f, "Failed batches: {}", self.failed_batches)?;
        writeln!(f, "Batch size: {}", self.batch_size)?;

        if !self.failure_counts.is_empty() {
            writeln!(f, "Failures by kind:")?;
            for (kind, count) in &self.failure_counts {
                writeln!(f, "  {}: {}", kind, count)?;
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
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
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
                "min={:.1}, max={:.1}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
