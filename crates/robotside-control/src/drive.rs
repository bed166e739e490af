//! 直线驱动到目标点
//!
//! 纯计算：给定当前位姿、目标和上一周期的线速度，得出本周期的运动命令。
//! 线速度按距离指数上升，随航向误差衰减，并且每周期变化不超过 `max_delta_speed`。

use robotside_core::{Transform, wrap_angle};

/// 判定到达目标的平面距离（米）
pub const GOAL_REACHED_DISTANCE: f64 = 0.25;
/// 对齐目标朝向的允许误差
pub const ALIGN_TOLERANCE: f64 = 5.0 * std::f64::consts::PI / 180.0;
/// 正常行驶时允许直线前进的最大航向误差
pub const DRIVE_DEVIATION: f64 = 30.0 * std::f64::consts::PI / 180.0;
/// 避障时允许直线前进的最大航向误差
pub const AVOID_DEVIATION: f64 = 5.0 * std::f64::consts::PI / 180.0;
/// 避障时原地旋转的固定角速度
pub const AVOID_ROTATION: f64 = 30.0 * std::f64::consts::PI / 180.0;

pub const DEFAULT_MIN_SPEED: f64 = 0.1;
pub const DEFAULT_MAX_DELTA_SPEED: f64 = 0.025;
/// 最小速度上限，与型号允许的最大线速度一致
const MIN_SPEED_CEILING: f64 = 0.65;

/// 线速度限制
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedLimits {
    min_speed: f64,
    max_delta_speed: f64,
}

impl SpeedLimits {
    /// 创建速度限制
    ///
    /// `min_speed` 被限制在 [0, 0.65]，`max_delta_speed` 被限制在 [0, 0.025]；
    /// 更大的增量会使机器人运动发顿。
    pub fn new(min_speed: f64, max_delta_speed: f64) -> Self {
        Self {
            min_speed: min_speed.clamp(0.0, MIN_SPEED_CEILING),
            max_delta_speed: max_delta_speed.clamp(0.0, DEFAULT_MAX_DELTA_SPEED),
        }
    }

    pub fn min_speed(&self) -> f64 {
        self.min_speed
    }

    pub fn max_delta_speed(&self) -> f64 {
        self.max_delta_speed
    }
}

impl Default for SpeedLimits {
    fn default() -> Self {
        Self {
            min_speed: DEFAULT_MIN_SPEED,
            max_delta_speed: DEFAULT_MAX_DELTA_SPEED,
        }
    }
}

/// 单周期驱动决策
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveStep {
    /// 已到达（位置，以及需要时的朝向）
    Reached,
    /// 位置已到，原地转向目标朝向
    Align { angular: f64 },
    /// 朝目标直线前进
    Forward { linear: f64, angular: f64 },
    /// 原地转向目标
    Rotate { angular: f64 },
}

/// 计算本周期的驱动决策
///
/// # 参数
/// - `location`: 底盘当前位姿
/// - `target`: 目标位姿
/// - `match_rotation`: 到达后是否对齐目标朝向
/// - `avoid`: 避障模式（更窄的直行角度，固定速率旋转）
/// - `max_speed`: 型号最大线速度
/// - `current_speed`: 上一次下发的线速度
pub fn plan_drive(
    location: &Transform,
    target: &Transform,
    match_rotation: bool,
    avoid: bool,
    max_speed: f64,
    current_speed: f64,
    limits: &SpeedLimits,
) -> DriveStep {
    let dx = target.x() - location.x();
    let dy = target.y() - location.y();
    let dist = dx.hypot(dy);
    let delta_angle = wrap_angle(dy.atan2(dx) - location.rotation_z());
    let max_deviation = if avoid { AVOID_DEVIATION } else { DRIVE_DEVIATION };

    if dist < GOAL_REACHED_DISTANCE {
        if !match_rotation {
            return DriveStep::Reached;
        }
        let heading_error = wrap_angle(target.rotation_z() - location.rotation_z());
        if heading_error.abs() < ALIGN_TOLERANCE {
            return DriveStep::Reached;
        }
        return DriveStep::Align {
            angular: heading_error,
        };
    }

    if delta_angle.abs() < max_deviation {
        let mut speed = (1.0 - (-5.0 * dist).exp()).min(max_speed);
        speed *= 1.0 - (delta_angle / max_deviation).abs();
        speed = speed.max(limits.min_speed);
        return DriveStep::Forward {
            linear: rate_limit(current_speed, speed, limits.max_delta_speed),
            angular: delta_angle,
        };
    }

    let angular = if avoid {
        delta_angle.signum() * AVOID_ROTATION
    } else {
        delta_angle
    };
    DriveStep::Rotate { angular }
}

/// 限制线速度每周期的变化量
///
/// 从静止起步时直接取 `max_delta`。
pub fn rate_limit(current: f64, requested: f64, max_delta: f64) -> f64 {
    if (current - requested).abs() <= max_delta {
        return requested;
    }
    if requested >= current {
        if current == 0.0 {
            max_delta
        } else {
            current + max_delta
        }
    } else {
        current - max_delta
    }
}
