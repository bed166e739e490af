//! # 运行器配置
//!
//! 一个 TOML 文件，四个小节：
//!
//! ```toml
//! [controller]
//! min_speed = 0.1
//! max_delta_speed = 0.025
//! blocked_sample_stride = 10
//! blocked_point_threshold = 100
//!
//! [safety]
//! simple_bumper_behavior = false
//!
//! [teleop]
//! timeout_ms = 1000
//!
//! [runner]
//! frequency_hz = 10.0
//! goal_max_distance = 1.0
//! goal_timeout_sec = 30.0
//! calibration_duration_ms = 6000
//! ```
//!
//! 缺失的字段取默认值。

use crate::error::ConfigError;
use robotside_control::{BlockedDepthConfig, ControllerConfig, SpeedLimits, TELEOP_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// 控制器参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSection {
    /// 最小线速度（m/s），限制在 [0, 0.65]
    pub min_speed: f64,
    /// 每周期最大线速度变化（m/s），限制在 [0, 0.025]
    pub max_delta_speed: f64,
    /// 阻挡检测采样步长
    pub blocked_sample_stride: usize,
    /// 阻挡点数阈值
    pub blocked_point_threshold: usize,
}

impl Default for ControllerSection {
    fn default() -> Self {
        let limits = SpeedLimits::default();
        let blocked = BlockedDepthConfig::default();
        Self {
            min_speed: limits.min_speed(),
            max_delta_speed: limits.max_delta_speed(),
            blocked_sample_stride: blocked.sample_stride,
            blocked_point_threshold: blocked.point_threshold,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetySection {
    /// 后退之后直接结束脱困，不转向也不前进
    pub simple_bumper_behavior: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleopSection {
    /// 遥操作来源过期时间（毫秒），0 表示永不过期
    pub timeout_ms: u64,
}

impl Default for TeleopSection {
    fn default() -> Self {
        Self {
            timeout_ms: TELEOP_TIMEOUT_MS,
        }
    }
}

/// 控制循环参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// 控制频率（Hz）
    pub frequency_hz: f64,
    /// 目标点离已知地图点的最大距离（米）
    pub goal_max_distance: f64,
    /// 放弃无法到达的目标之前等待的秒数，0 表示不超时
    pub goal_timeout_sec: f64,
    /// 最多运行的周期数（不设置则一直运行到关闭）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u64>,
    /// 标定时原地旋转的时长（毫秒）
    pub calibration_duration_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 10.0,
            goal_max_distance: 1.0,
            goal_timeout_sec: 30.0,
            max_iterations: None,
            calibration_duration_ms: 6000,
        }
    }
}

impl LoopConfig {
    /// 检查循环参数
    ///
    /// # 错误
    /// `frequency_hz` 不是正有限数，或距离、超时为负数时返回 [`ConfigError::InvalidValue`]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.frequency_hz.is_finite() && self.frequency_hz > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "runner.frequency_hz",
                reason: format!("must be a positive number, got {}", self.frequency_hz),
            });
        }
        if self.frequency_hz > 1000.0 {
            warn!(
                "Control frequency {} Hz is very high, cycles may overrun",
                self.frequency_hz
            );
        }
        if self.goal_max_distance.is_nan() || self.goal_max_distance < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "runner.goal_max_distance",
                reason: format!("must not be negative, got {}", self.goal_max_distance),
            });
        }
        if self.goal_timeout_sec.is_nan() || self.goal_timeout_sec < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "runner.goal_timeout_sec",
                reason: format!("must not be negative, got {}", self.goal_timeout_sec),
            });
        }
        Ok(())
    }

    /// 一个控制周期的时长
    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.frequency_hz)
    }
}

/// 运行器完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub controller: ControllerSection,
    pub safety: SafetySection,
    pub teleop: TeleopSection,
    pub runner: LoopConfig,
}

impl RunnerConfig {
    /// 从 TOML 文件加载配置并检查
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 文本解析配置并检查
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RunnerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.controller.blocked_sample_stride == 0 {
            return Err(ConfigError::InvalidValue {
                field: "controller.blocked_sample_stride",
                reason: "must be at least 1".to_string(),
            });
        }
        self.runner.validate()
    }

    /// 控制器参数（速度限制在这里被夹紧）
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            speed_limits: SpeedLimits::new(
                self.controller.min_speed,
                self.controller.max_delta_speed,
            ),
            blocked: BlockedDepthConfig {
                sample_stride: self.controller.blocked_sample_stride,
                point_threshold: self.controller.blocked_point_threshold,
            },
        }
    }
}
