//! 深度点云阻挡检测
//!
//! 把点云按步长采样，变换到世界坐标后按高度、侧向、前向三个区间分类。
//! 落在机器人正前方通道里的点计为阻挡点，阻挡点数超过阈值即判定被挡。
//! 每个采样点同时写入一个调试颜色，供可视化使用。

use robotside_core::{PointCloud, RobotModel, Transform};

/// 车身前沿之外仍计入阻挡通道的距离（米）
pub const BLOCKED_FORWARD_MARGIN: f64 = 0.4225;

pub const COLOR_BLOCKER: u32 = 0xFF0000;
pub const COLOR_CORRIDOR: u32 = 0xFFFF00;
pub const COLOR_BESIDE: u32 = 0x00FF00;
pub const COLOR_OUT_OF_HEIGHT: u32 = 0x0000FF;

/// 阻挡检测参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockedDepthConfig {
    /// 采样步长（每隔多少个点取一个）
    pub sample_stride: usize,
    /// 阻挡点数严格大于该值时判定被挡
    pub point_threshold: usize,
}

impl Default for BlockedDepthConfig {
    fn default() -> Self {
        Self {
            sample_stride: 10,
            point_threshold: 100,
        }
    }
}

/// 单个采样点的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointClass {
    /// 正前方通道内
    Blocker,
    /// 侧向在车宽内，但不在前方通道
    Corridor,
    /// 高度合适，侧向在车宽外
    Beside,
    /// 低于地面或高于车身
    OutOfHeight,
}

impl PointClass {
    /// 调试颜色（0xRRGGBB）
    pub fn color(self) -> u32 {
        match self {
            PointClass::Blocker => COLOR_BLOCKER,
            PointClass::Corridor => COLOR_CORRIDOR,
            PointClass::Beside => COLOR_BESIDE,
            PointClass::OutOfHeight => COLOR_OUT_OF_HEIGHT,
        }
    }
}

/// 对一帧点云计数阻挡点
///
/// # 参数
/// - `cloud`: 深度相机坐标系下的点云
/// - `cloud_location`: 深度相机在世界中的位姿
/// - `location`: 底盘在世界中的位姿
/// - `model`: 提供车宽、车长、车高
/// - `colors`: 颜色缓冲，长度会调整为点数；只写入采样到的点
///
/// # 返回
/// 阻挡点数量
pub fn count_blockers(
    cloud: &PointCloud,
    cloud_location: &Transform,
    location: &Transform,
    model: &RobotModel,
    config: &BlockedDepthConfig,
    colors: &mut Vec<u32>,
) -> usize {
    colors.resize(cloud.len(), 0);

    let floor = cloud_location.z();
    let ceil = floor + model.height();
    let heading = location.rotation_z();
    let (sin, cos) = heading.sin_cos();
    let half_width = model.width() / 2.0;
    let reach = model.length() / 2.0 + BLOCKED_FORWARD_MARGIN;

    let mut blockers = 0;
    for (i, p) in cloud
        .points()
        .iter()
        .enumerate()
        .step_by(config.sample_stride.max(1))
    {
        let world = cloud_location.transform_point([p[0] as f64, p[1] as f64, p[2] as f64]);
        let class = if world[2] > floor && world[2] < ceil {
            let dx = world[0] - location.x();
            let dy = world[1] - location.y();
            let side = -sin * dx + cos * dy;
            if side.abs() < half_width {
                let front = cos * dx + sin * dy;
                if front > 0.0 && front < reach {
                    PointClass::Blocker
                } else {
                    PointClass::Corridor
                }
            } else {
                PointClass::Beside
            }
        } else {
            PointClass::OutOfHeight
        };
        if class == PointClass::Blocker {
            blockers += 1;
        }
        colors[i] = class.color();
    }
    blockers
}
