//! 遥操作命令

use serde::{Deserialize, Serialize};

/// 一条遥操作命令
///
/// 只有 `vx`（线速度）和 `rz`（角速度）驱动底盘，其余速度轴保留为 0。
/// `timestamp_ms` 为产生时刻，由 [`Clock`](crate::Clock) 给出。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Teleop {
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
    pub action1: bool,
    pub action2: bool,
    pub timestamp_ms: u64,
}

impl Teleop {
    /// 平面速度 + 附件开关
    pub fn new(vx: f64, rz: f64, action1: bool, action2: bool, timestamp_ms: u64) -> Self {
        Self {
            vx,
            rz,
            action1,
            action2,
            timestamp_ms,
            ..Default::default()
        }
    }

    /// 速度是否非零（线速度或角速度）
    pub fn has_motion(&self) -> bool {
        self.vx != 0.0 || self.rz != 0.0
    }

    /// 按型号限制缩放归一化命令（云端命令取值 [-1, 1]）
    pub fn scaled(&self, max_speed: f64, max_angular: f64) -> Self {
        Self {
            vx: self.vx.clamp(-1.0, 1.0) * max_speed,
            rz: self.rz.clamp(-1.0, 1.0) * max_angular,
            ..*self
        }
    }
}
