//! 设备位姿到底盘位姿的换算
//!
//! 传感器设备装在底盘前部的活动支架上，会上下晃动。底盘位姿只保留绕 Z 轴的
//! 朝向：取设备 Z 轴（相机朝向）在水平面上的投影作为前进方向，再沿该方向
//! 平移安装偏移、减去设备离地高度。

use robotside_core::Transform;
use std::f64::consts::PI;

/// 由设备位姿计算底盘位姿
///
/// # 参数
///
/// - `device`: 设备在世界坐标系中的位姿
/// - `forward_offset`: 设备相对底盘中心的前向偏移（米）
/// - `z_offset`: 型号默认的设备离地高度（米）
/// - `device_height`: 标定得到的离地高度，有值时优先使用
pub fn stable_device_transform(
    device: &Transform,
    forward_offset: f64,
    z_offset: f64,
    device_height: Option<f64>,
) -> Transform {
    let [px, py, pz] = device.position();
    let ahead = device.transform_point([0.0, 0.0, 1.0]);
    let vx = ahead[0] - px;
    let vy = ahead[1] - py;

    let angle = vy.atan2(vx) + PI;
    let mut len = (vx * vx + vy * vy).sqrt();
    // 设备竖直朝上/朝下时投影长度为 0
    if len < 1e-8 {
        len = 1.0;
    }

    let x = px + vx * forward_offset / len;
    let y = py + vy * forward_offset / len;
    let z = pz - device_height.unwrap_or(z_offset);
    Transform::from_xyz_yaw(x, y, z, angle, device.timestamp())
}
