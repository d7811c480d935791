//! 错误分层定义
//!
//! 按来源分层：queue / synchronizer / config / sink

use std::fmt::Debug;

use thiserror::Error;

/// 统一错误类型
///
/// `Primed`/`Retry`/`Abort` 属于正常控制流，不会出现在这里。
#[derive(Debug, Error)]
pub enum CaptureError {
    // ===== 队列错误 =====
    /// 乱序 stamp（新 dispatch 的 stamp 早于队列最新 stamp）
    #[error("out-of-order stamp: {stamp} is behind newest {newest}")]
    OutOfOrderStamp { stamp: String, newest: String },

    /// 空队列访问
    #[error("empty queue: cannot {operation}")]
    Empty { operation: &'static str },

    /// 严格有界队列溢出
    #[error("queue capacity exceeded: capacity={capacity}")]
    CapacityExceeded { capacity: usize },

    /// 轮询锁争用
    #[error("queue lock contended")]
    ContendedQueue,

    // ===== 同步错误 =====
    /// driver 产生的 range 非法（lower > upper 或 ABORT 时未填充）
    #[error("invalid capture range: lower={lower}, upper={upper}")]
    InvalidRange { lower: String, upper: String },

    // ===== 配置错误 =====
    /// 配置解析错误
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// 配置校验错误
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sink 错误 =====
    /// Sink 写入错误
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== 通用错误 =====
    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 其他错误
    #[error("{0}")]
    Other(String),
}

impl CaptureError {
    /// 创建乱序 stamp 错误
    pub fn out_of_order(stamp: impl Debug, newest: impl Debug) -> Self {
        Self::OutOfOrderStamp {
            stamp: format!("{stamp:?}"),
            newest: format!("{newest:?}"),
        }
    }

    /// 创建空队列错误
    pub fn empty(operation: &'static str) -> Self {
        Self::Empty { operation }
    }

    /// 创建非法 range 错误
    pub fn invalid_range(lower: impl Debug, upper: impl Debug) -> Self {
        Self::InvalidRange {
            lower: format!("{lower:?}"),
            upper: format!("{upper:?}"),
        }
    }

    /// 创建配置解析错误
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// 创建配置校验错误
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 创建 sink 写入错误
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
