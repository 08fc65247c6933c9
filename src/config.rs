//! 监控器配置模块 (Monitor Configuration Module)
//!
//! 提供时间轮几何参数的配置结构和 Builder 模式，并在构建时进行验证。
//! (Provides configuration structure and Builder pattern for the timing wheel
//! geometry, validated at build time)

use crate::error::MonitorError;
use std::time::Duration;

/// 超时监控器配置 (Timeout Monitor Configuration)
///
/// 描述分层时间轮的几何参数：层数 `L`、每层槽数 `W`、槽间隔 `Δ`。
/// 监控器可覆盖的最大超时范围为 `Δ × W^L`。
/// (Describes the hierarchical wheel geometry: `L` wheels of `W` slots each,
/// with slot interval `Δ`. The maximum coverable timeout is `Δ × W^L`)
///
/// # 示例 (Examples)
/// ```
/// use kestrel_monitor::MonitorConfig;
/// use std::time::Duration;
///
/// // 使用默认配置（60 槽/层, 1 秒/槽, 3 层）
/// //    (Use default configuration: 60 slots, 1s interval, 3 wheels)
/// let config = MonitorConfig::default();
///
/// // 使用 Builder 自定义配置
/// //    (Use Builder to customize configuration)
/// let config = MonitorConfig::builder()
///     .wheel_size(4)
///     .slot_interval(Duration::from_millis(100))
///     .num_wheels(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_timeout_range(), Duration::from_millis(1600));
/// ```
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// 每层时间轮的槽数 `W` (Number of slots per wheel, `W`)
    pub wheel_size: usize,
    /// 每个槽覆盖的时间间隔 `Δ` (Time interval covered by one slot, `Δ`)
    pub slot_interval: Duration,
    /// 时间轮层数 `L` (Number of stacked wheels, `L`)
    pub num_wheels: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            wheel_size: 60,
            slot_interval: Duration::from_millis(1000),
            num_wheels: 3,
        }
    }
}

impl MonitorConfig {
    /// 创建配置构建器 (Create configuration builder)
    pub fn builder() -> MonitorConfigBuilder {
        MonitorConfigBuilder::default()
    }

    /// 获取时间轮可覆盖的最大超时范围 `Δ × W^L`
    /// (Get the maximum timeout range coverable by the wheels, `Δ × W^L`)
    pub fn max_timeout_range(&self) -> Duration {
        let max_slots = (self.wheel_size as u64).pow(self.num_wheels as u32);
        Duration::from_millis(self.slot_interval.as_millis() as u64 * max_slots)
    }

    /// 验证几何参数 (Validate the geometry parameters)
    ///
    /// `MonitorConfig` 的字段是公开的，可以绕过 Builder 直接构造，
    /// 因此监控器在构造时会再次调用此验证。
    /// (The fields are public and the Builder can be bypassed, so the monitor
    /// re-validates on construction)
    pub(crate) fn validate(&self) -> Result<(), MonitorError> {
        if self.wheel_size == 0 {
            return Err(MonitorError::InvalidConfiguration {
                field: "wheel_size",
                reason: "每层槽数必须大于 0".to_string(),
            });
        }

        if self.num_wheels == 0 {
            return Err(MonitorError::InvalidConfiguration {
                field: "num_wheels",
                reason: "时间轮层数必须大于 0".to_string(),
            });
        }

        if self.slot_interval.is_zero() {
            return Err(MonitorError::InvalidConfiguration {
                field: "slot_interval",
                reason: "槽间隔必须大于 0".to_string(),
            });
        }

        // W^L 及其对应的毫秒跨度必须能用 u64 表示，
        // 否则放置计算和最大范围检查都会溢出
        // (W^L and its millisecond span must be representable in u64,
        // otherwise placement arithmetic and the range check overflow)
        let max_slots = (self.wheel_size as u64)
            .checked_pow(self.num_wheels as u32)
            .ok_or_else(|| MonitorError::InvalidConfiguration {
                field: "num_wheels",
                reason: format!(
                    "时间轮总槽数 {}^{} 溢出",
                    self.wheel_size, self.num_wheels
                ),
            })?;

        (self.slot_interval.as_millis() as u64)
            .checked_mul(max_slots)
            .ok_or_else(|| MonitorError::InvalidConfiguration {
                field: "slot_interval",
                reason: "时间轮最大时间范围溢出".to_string(),
            })?;

        Ok(())
    }
}

/// 超时监控器配置构建器 (Timeout Monitor Configuration Builder)
#[derive(Debug, Clone)]
pub struct MonitorConfigBuilder {
    wheel_size: usize,
    slot_interval: Duration,
    num_wheels: usize,
}

impl Default for MonitorConfigBuilder {
    fn default() -> Self {
        let config = MonitorConfig::default();
        Self {
            wheel_size: config.wheel_size,
            slot_interval: config.slot_interval,
            num_wheels: config.num_wheels,
        }
    }
}

impl MonitorConfigBuilder {
    /// 设置每层槽数 (Set slots per wheel)
    pub fn wheel_size(mut self, size: usize) -> Self {
        self.wheel_size = size;
        self
    }

    /// 设置槽间隔 (Set slot interval)
    pub fn slot_interval(mut self, interval: Duration) -> Self {
        self.slot_interval = interval;
        self
    }

    /// 设置时间轮层数 (Set number of wheels)
    pub fn num_wheels(mut self, count: usize) -> Self {
        self.num_wheels = count;
        self
    }

    /// 构建配置并进行验证
    ///      (Build and validate configuration)
    ///
    /// # 验证规则 (Validation Rules)
    /// - 每层槽数必须大于 0
    ///      (Slots per wheel must be greater than 0)
    /// - 层数必须大于 0
    ///      (Number of wheels must be greater than 0)
    /// - 槽间隔必须大于 0
    ///      (Slot interval must be greater than 0)
    /// - 最大时间范围 `Δ × W^L` 不得溢出
    ///      (The maximum range `Δ × W^L` must not overflow)
    pub fn build(self) -> Result<MonitorConfig, MonitorError> {
        let config = MonitorConfig {
            wheel_size: self.wheel_size,
            slot_interval: self.slot_interval,
            num_wheels: self.num_wheels,
        };
        config.validate()?;
        Ok(config)
    }
}
