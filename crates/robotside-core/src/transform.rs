//! 位姿变换（Transform）
//!
//! 位置（3 维）+ 姿态（单位四元数）+ 时间戳。构造后不可变，
//! 通过 [`Transform::compose`] 组合父子坐标系，通过 `project` / `unproject`
//! 相对质心平移以保证数值稳定。

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use std::f64::consts::PI;

/// 将角度包裹到 [-π, π]
///
/// 非有限值原样返回。
pub fn wrap_angle(mut a: f64) -> f64 {
    if !a.is_finite() {
        return a;
    }
    while a < -PI {
        a += 2.0 * PI;
    }
    while a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// 位姿
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    position: Vector3<f64>,
    rotation: UnitQuaternion<f64>,
    /// 时间戳（秒）
    timestamp: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// 单位变换
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            timestamp: 0.0,
        }
    }

    /// 创建位姿
    ///
    /// # 参数
    ///
    /// - `position`: `[x, y, z]`（米）
    /// - `rotation`: 四元数 `[x, y, z, w]`，会被归一化；零四元数退化为单位旋转
    /// - `timestamp`: 时间戳（秒）
    pub fn new(position: [f64; 3], rotation: [f64; 4], timestamp: f64) -> Self {
        let q = Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]);
        let rotation = UnitQuaternion::try_new(q, 1e-12).unwrap_or_else(UnitQuaternion::identity);
        Self {
            position: Vector3::from(position),
            rotation,
            timestamp,
        }
    }

    /// 由平面位姿创建：位置 + 绕 Z 轴偏航角
    pub fn from_xyz_yaw(x: f64, y: f64, z: f64, yaw: f64, timestamp: f64) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            rotation: UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw),
            timestamp,
        }
    }

    /// 组合父子变换：`parent ∘ child`
    ///
    /// 子位置先按父姿态旋转再平移，姿态为四元数乘积，时间戳取两者较大值。
    pub fn compose(parent: &Transform, child: &Transform) -> Self {
        Self {
            position: parent.rotation * child.position + parent.position,
            rotation: parent.rotation * child.rotation,
            timestamp: parent.timestamp.max(child.timestamp),
        }
    }

    /// 对一个点做变换（不含时间戳）
    pub fn transform_point(&self, point: [f64; 3]) -> [f64; 3] {
        let p = self.rotation * Vector3::from(point) + self.position;
        [p.x, p.y, p.z]
    }

    pub fn position(&self) -> [f64; 3] {
        [self.position.x, self.position.y, self.position.z]
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn z(&self) -> f64 {
        self.position.z
    }

    /// 四元数 `[x, y, z, w]`
    pub fn rotation(&self) -> [f64; 4] {
        let q = self.rotation.quaternion();
        [q.i, q.j, q.k, q.w]
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// 绕 X 轴角度（横滚）
    pub fn rotation_x(&self) -> f64 {
        let [x, y, z, w] = self.rotation();
        (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y))
    }

    /// 绕 Y 轴角度（俯仰）
    pub fn rotation_y(&self) -> f64 {
        let [x, y, z, w] = self.rotation();
        (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin()
    }

    /// 绕 Z 轴角度（偏航），范围 [-π, π]
    pub fn rotation_z(&self) -> f64 {
        let [x, y, z, w] = self.rotation();
        (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z))
    }

    /// XY 平面距离的平方
    pub fn planar_distance_to_squared(&self, other: &Transform) -> f64 {
        let dx = self.position.x - other.position.x;
        let dy = self.position.y - other.position.y;
        dx * dx + dy * dy
    }

    /// XY 平面距离
    pub fn planar_distance_to(&self, other: &Transform) -> f64 {
        self.planar_distance_to_squared(other).sqrt()
    }

    /// 相对质心表示（减去质心位置）
    pub fn project(&self, centroid: &Transform) -> Self {
        Self {
            position: self.position - centroid.position,
            ..*self
        }
    }

    /// 从质心相对坐标还原
    pub fn unproject(&self, centroid: &Transform) -> Self {
        Self {
            position: self.position + centroid.position,
            ..*self
        }
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [qx, qy, qz, qw] = self.rotation();
        write!(
            f,
            "Transform(pos: [{:.3}, {:.3}, {:.3}] rot: [{:.3}, {:.3}, {:.3}, {:.3}] t: {:.3})",
            self.position.x, self.position.y, self.position.z, qx, qy, qz, qw, self.timestamp
        )
    }
}
