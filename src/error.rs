use std::fmt;
use std::time::Duration;

/// 监控器错误类型 (Monitor Error Type)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// 监控器未运行 (Monitor is not running)
    NotRunning,

    /// 超时时间必须大于 0 (Timeout must be positive)
    InvalidTimeout,

    /// 超时时间超过时间轮的最大范围 Δ × W^L
    /// Timeout exceeds the maximum wheel range Δ × W^L
    TimeoutOutOfRange { timeout: Duration, max: Duration },

    /// 任务 ID 已存在于注册表中 (Task ID already present in the registry)
    DuplicateTask { task_id: String },

    /// 时间轮放置失败（内部不变量被破坏时的防御性错误）
    /// Wheel placement failed (defensive error on internal invariant breakage)
    PlacementFailed,

    /// 配置验证失败 (Configuration validation failed)
    InvalidConfiguration {
        field: &'static str,
        reason: String,
    },
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::NotRunning => {
                write!(f, "monitor not running")
            }
            MonitorError::InvalidTimeout => {
                write!(f, "timeout must be positive")
            }
            MonitorError::TimeoutOutOfRange { timeout, max } => {
                write!(f, "timeout exceeds maximum range: {:?} > {:?}", timeout, max)
            }
            MonitorError::DuplicateTask { task_id } => {
                write!(f, "task already monitored: {}", task_id)
            }
            MonitorError::PlacementFailed => {
                write!(f, "placement failed: computed position outside the wheel")
            }
            MonitorError::InvalidConfiguration { field, reason } => {
                write!(f, "configuration validation failed ({}): {}", field, reason)
            }
        }
    }
}

impl std::error::Error for MonitorError {}
