//! 最新值传感器插槽
//!
//! 传感器回调线程写入，控制线程每周期读取一次快照。所有插槽都是
//! `ArcSwapOption`：写入无等待、后写覆盖，读取方永不阻塞，也不等待新数据。
//! 位姿和点云本身没有过期检测，传感器停止回调时控制器看到的是最后一次的值。

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use robotside_core::{PointCloud, Teleop, Transform};
use std::sync::Arc;

/// 一帧深度数据及其采集时刻深度相机的世界位姿
#[derive(Debug, Clone)]
pub struct DepthFrame {
    pub cloud: Arc<PointCloud>,
    pub depth_location: Transform,
}

#[derive(Debug, Default)]
pub struct SensorSlots {
    device_pose: ArcSwapOption<Transform>,
    depth: ArcSwapOption<DepthFrame>,
    device_height_metadata: ArcSwapOption<String>,
    ros_teleop: ArcSwapOption<Teleop>,
    cloud_teleop: ArcSwapOption<Vec<Option<Teleop>>>,
    floor_measurements: Mutex<Vec<f64>>,
}

impl SensorSlots {
    // ==================== 写入（传感器线程）====================

    /// 设备在世界中的位姿（定位成功时）
    pub fn submit_device_pose(&self, pose: Transform) {
        self.device_pose.store(Some(Arc::new(pose)));
    }

    /// 定位丢失
    pub fn clear_device_pose(&self) {
        self.device_pose.store(None);
    }

    pub fn submit_depth(&self, cloud: Arc<PointCloud>, depth_location: Transform) {
        self.depth.store(Some(Arc::new(DepthFrame {
            cloud,
            depth_location,
        })));
    }

    /// 云端元数据中的设备离地高度（原始字符串，每周期解析）
    pub fn set_device_height_metadata(&self, height: Option<String>) {
        self.device_height_metadata.store(height.map(Arc::new));
    }

    /// ROS 桥接收到的最新速度命令
    pub fn set_ros_teleop(&self, teleop: Teleop) {
        self.ros_teleop.store(Some(Arc::new(teleop)));
    }

    /// 云端各通道的最新命令（归一化值）
    pub fn set_cloud_teleop(&self, channels: Vec<Option<Teleop>>) {
        self.cloud_teleop.store(Some(Arc::new(channels)));
    }

    /// 标定期间的一次设备离地高度测量
    pub fn add_floor_measurement(&self, height: f64) {
        self.floor_measurements.lock().push(height);
    }

    // ==================== 读取（控制线程）====================

    pub fn device_pose(&self) -> Option<Transform> {
        self.device_pose.load().as_deref().copied()
    }

    pub fn depth(&self) -> Option<Arc<DepthFrame>> {
        self.depth.load_full()
    }

    pub fn device_height_metadata(&self) -> Option<Arc<String>> {
        self.device_height_metadata.load_full()
    }

    pub fn ros_teleop(&self) -> Option<Teleop> {
        self.ros_teleop.load().as_deref().copied()
    }

    pub fn cloud_teleop(&self) -> Vec<Option<Teleop>> {
        self.cloud_teleop
            .load()
            .as_deref()
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn take_floor_measurements(&self) -> Vec<f64> {
        std::mem::take(&mut *self.floor_measurements.lock())
    }

    /// 重新启动定位时丢弃位姿和点云
    pub(crate) fn clear_localization(&self) {
        self.device_pose.store(None);
        self.depth.store(None);
    }
}
