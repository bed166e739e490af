//! 机器人驱动接口
//!
//! 具体硬件后端实现 [`RobotDriver`] 的少量必需方法（连接状态、保险杠、
//! 位姿换算、每周期 IO），公共逻辑全部由默认方法通过 [`DriverCore`] 提供。

use crate::error::DriverEvent;
use crate::state::DriverCore;
use crossbeam_channel::Sender;
use robotside_core::{BatteryStatus, BumperId, RobotModel, Transform};
use std::sync::Arc;

/// 机器人驱动
///
/// 调用约定：控制线程每周期调用一次 [`RobotDriver::update`]；
/// 命令方法可以在任意线程调用。
pub trait RobotDriver: Send {
    /// 公共状态
    fn core(&self) -> &DriverCore;

    /// 初始化钩子（绑定事件通道之后调用）
    fn on_init(&mut self) {}

    /// 每周期硬件 IO：把当前命令下发给硬件，读取反馈
    fn on_update(&mut self);

    /// 是否与硬件连接
    fn is_connected(&self) -> bool;

    /// 当前保险杠读数
    fn bumper(&self) -> BumperId;

    /// 设备位姿换算为底盘位姿
    fn device_to_base(&self, device: &Transform) -> Transform;

    /// 关闭钩子
    fn on_shutdown(&mut self) {}

    // ==================== 默认实现 ====================

    fn name(&self) -> &str {
        self.core().name()
    }

    /// 绑定事件通道并执行初始化钩子
    fn init(&mut self, events: Sender<DriverEvent>) {
        self.core().attach(events);
        self.on_init();
    }

    /// 周期更新：命令超时检查 → 硬件 IO → 电池去抖
    fn update(&mut self) {
        self.core().tick();
        self.on_update();
        self.core().update_battery_timers();
    }

    fn shutdown(&mut self) {
        self.on_shutdown();
    }

    fn model(&self) -> Arc<RobotModel> {
        self.core().model()
    }

    fn set_motion(&self, speed: f64, angular: f64) {
        self.core().set_motion(speed, angular);
    }

    fn set_action1(&self, action1: bool) {
        self.core().set_action1(action1);
    }

    fn set_action2(&self, action2: bool) {
        self.core().set_action2(action2);
    }

    fn speed(&self) -> f64 {
        self.core().speed()
    }

    fn angular(&self) -> f64 {
        self.core().angular()
    }

    fn action1(&self) -> bool {
        self.core().action1()
    }

    fn action2(&self) -> bool {
        self.core().action2()
    }

    fn uuid(&self) -> Option<String> {
        self.core().uuid()
    }

    fn version_string(&self) -> Option<String> {
        self.core().version_string()
    }

    fn state_string(&self) -> Option<String> {
        self.core().state_string()
    }

    fn battery_statuses(&self) -> Vec<BatteryStatus> {
        self.core().battery_statuses()
    }

    fn battery_low_debounced(&self) -> bool {
        self.core().battery_low_debounced()
    }

    fn battery_critical_debounced(&self) -> bool {
        self.core().battery_critical_debounced()
    }

    fn set_device_height(&self, height: f64, valid: bool) {
        self.core().set_device_height(height, valid);
    }
}
