//! 多路驱动
//!
//! 持有一个有序驱动列表（不同的硬件后端）。每周期更新全部驱动，
//! 选择列表中第一个已连接的驱动作为读取来源；写入命令无条件广播给所有驱动，
//! 使新连上的驱动在成为活动驱动时已有最新命令。
//!
//! ⚠️ 选择没有迟滞：两个驱动交替报告连接时，活动驱动可能每周期切换。
//! 没有任何驱动连接时保留上一次的选择。

use crate::driver::RobotDriver;
use crate::error::{DriverError, DriverEvent};
use crossbeam_channel::Sender;
use robotside_core::{BatteryStatus, BumperId, RobotModel, Transform};
use std::sync::Arc;
use tracing::info;

pub struct RobotDriverMultiplex {
    drivers: Vec<Box<dyn RobotDriver>>,
    active: Option<usize>,
}

impl RobotDriverMultiplex {
    /// 创建多路驱动，列表不能为空
    pub fn new(drivers: Vec<Box<dyn RobotDriver>>) -> Result<Self, DriverError> {
        if drivers.is_empty() {
            return Err(DriverError::EmptyMultiplex);
        }
        Ok(Self {
            drivers,
            active: None,
        })
    }

    /// 初始化全部驱动
    pub fn init(&mut self, events: Sender<DriverEvent>) {
        for driver in &mut self.drivers {
            driver.init(events.clone());
        }
    }

    /// 更新全部驱动，然后重新选择活动驱动
    pub fn update(&mut self) {
        let mut first_connected = None;
        for (i, driver) in self.drivers.iter_mut().enumerate() {
            driver.update();
            if first_connected.is_none() && driver.is_connected() {
                first_connected = Some(i);
            }
        }
        if let Some(i) = first_connected
            && self.active != Some(i)
        {
            info!("Active driver is now {}", self.drivers[i].name());
            self.active = Some(i);
        }
    }

    pub fn shutdown(&mut self) {
        for driver in &mut self.drivers {
            driver.shutdown();
        }
    }

    // ==================== 写入（广播）====================

    pub fn set_motion(&self, speed: f64, angular: f64) {
        for driver in &self.drivers {
            driver.set_motion(speed, angular);
        }
    }

    pub fn set_action1(&self, action1: bool) {
        for driver in &self.drivers {
            driver.set_action1(action1);
        }
    }

    pub fn set_action2(&self, action2: bool) {
        for driver in &self.drivers {
            driver.set_action2(action2);
        }
    }

    pub fn set_device_height(&self, height: f64, valid: bool) {
        for driver in &self.drivers {
            driver.set_device_height(height, valid);
        }
    }

    /// 按百分比修改所有驱动的最大线速度
    pub fn set_max_speed_percentage(&self, percentage: f64) {
        for driver in &self.drivers {
            driver.core().set_max_speed_percentage(percentage);
        }
    }

    // ==================== 读取（活动驱动）====================

    /// 活动驱动在列表中的序号
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    fn active_driver(&self) -> Option<&dyn RobotDriver> {
        self.active.map(|i| self.drivers[i].as_ref())
    }

    pub fn is_connected(&self) -> bool {
        self.active_driver().is_some_and(|d| d.is_connected())
    }

    pub fn model(&self) -> Option<Arc<RobotModel>> {
        self.active_driver().map(|d| d.model())
    }

    pub fn uuid(&self) -> Option<String> {
        self.active_driver().and_then(|d| d.uuid())
    }

    pub fn version_string(&self) -> Option<String> {
        self.active_driver().and_then(|d| d.version_string())
    }

    pub fn state_string(&self) -> Option<String> {
        self.active_driver().and_then(|d| d.state_string())
    }

    pub fn bumper(&self) -> BumperId {
        self.active_driver().map_or(BumperId::None, |d| d.bumper())
    }

    pub fn action1(&self) -> bool {
        self.active_driver().is_some_and(|d| d.action1())
    }

    pub fn action2(&self) -> bool {
        self.active_driver().is_some_and(|d| d.action2())
    }

    pub fn speed(&self) -> f64 {
        self.active_driver().map_or(0.0, |d| d.speed())
    }

    pub fn angular(&self) -> f64 {
        self.active_driver().map_or(0.0, |d| d.angular())
    }

    pub fn battery_statuses(&self) -> Option<Vec<BatteryStatus>> {
        self.active_driver().map(|d| d.battery_statuses())
    }

    pub fn battery_low_debounced(&self) -> bool {
        self.active_driver().is_some_and(|d| d.battery_low_debounced())
    }

    pub fn battery_critical_debounced(&self) -> bool {
        self.active_driver()
            .is_some_and(|d| d.battery_critical_debounced())
    }

    pub fn device_to_base(&self, device: &Transform) -> Option<Transform> {
        self.active_driver().map(|d| d.device_to_base(device))
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}
