//! 平面运动学仿真
//!
//! 按驱动收到的速度积分底盘位姿，并生成传感器设备的位姿：设备装在底盘中心
//! 上方，Z 轴（相机朝向）指向底盘后方。

use robotside_core::{Transform, wrap_angle};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarSim {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
    device_z: f64,
}

impl PlanarSim {
    pub fn new(device_z: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            yaw: 0.0,
            device_z,
        }
    }

    /// 以恒定速度前进 `dt` 秒
    pub fn step(&mut self, speed: f64, angular: f64, dt: f64) {
        self.x += speed * self.yaw.cos() * dt;
        self.y += speed * self.yaw.sin() * dt;
        self.yaw = wrap_angle(self.yaw + angular * dt);
    }

    /// 设备在世界中的位姿
    ///
    /// 旋转为 `Rz(yaw) * Ry(-90°)`，四元数按 `[x, y, z, w]` 排列。
    pub fn device_pose(&self, timestamp: f64) -> Transform {
        let (sz, cz) = (self.yaw / 2.0).sin_cos();
        let (sy, cy) = (-std::f64::consts::FRAC_PI_4).sin_cos();
        Transform::new(
            [self.x, self.y, self.device_z],
            [-sz * sy, cz * sy, sz * cy, cz * cy],
            timestamp,
        )
    }
}
