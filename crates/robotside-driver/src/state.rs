//! 驱动公共状态
//!
//! 每个具体驱动内嵌一个 [`DriverCore`]，负责：
//! - 速度/附件命令的限幅与存储
//! - 命令超时自动停止（连续 [`AUTO_STOP_CYCLES`] 个周期未收到命令即归零）
//! - 电池低电量/危急状态去抖（连续 [`BATTERY_TIMER_MAX`] 个周期成立才置位）
//! - UUID、版本、状态字符串等标识信息
//!
//! # 并发
//!
//! 型号用 `ArcSwap` 存储（读多写少），命令和标识各用一把 `parking_lot::Mutex`，
//! 锁内只做字段读写。

use crate::error::{DriverError, DriverEvent, DriverFault};
use arc_swap::ArcSwap;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use robotside_core::{BatteryStatus, RobotModel};
use std::sync::Arc;
use tracing::{debug, warn};

/// 命令超时周期数
pub const AUTO_STOP_CYCLES: u64 = 10;

/// 电池状态去抖周期数
pub const BATTERY_TIMER_MAX: u32 = 100;

#[derive(Debug, Default)]
struct CommandState {
    speed: f64,
    angular: f64,
    action1: bool,
    action2: bool,
    update_counter: u64,
    last_speed_set: u64,
    last_action_set: u64,
    battery_low_timer: u32,
    battery_critical_timer: u32,
}

#[derive(Debug, Default)]
struct DriverInfo {
    uuid: Option<String>,
    version_string: Option<String>,
    state_string: Option<String>,
    battery_statuses: Vec<BatteryStatus>,
    /// 标定得到的设备离地高度（有效时覆盖型号默认值）
    device_height: Option<f64>,
    initialized: bool,
    events: Option<Sender<DriverEvent>>,
}

/// 驱动公共状态
#[derive(Debug)]
pub struct DriverCore {
    name: String,
    model: ArcSwap<RobotModel>,
    command: Mutex<CommandState>,
    info: Mutex<DriverInfo>,
}

impl DriverCore {
    /// 创建驱动状态
    ///
    /// 电池状态以型号中的电池模板初始化。
    pub fn new(name: impl Into<String>, model: RobotModel) -> Self {
        let info = DriverInfo {
            battery_statuses: model.battery_statuses().to_vec(),
            ..Default::default()
        };
        Self {
            name: name.into(),
            model: ArcSwap::from_pointee(model),
            command: Mutex::new(CommandState::default()),
            info: Mutex::new(info),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ==================== 型号 ====================

    /// 当前型号快照
    pub fn model(&self) -> Arc<RobotModel> {
        self.model.load_full()
    }

    /// 修改最大线速度（m/s）
    pub fn change_max_velocity(&self, max_speed: f64) {
        self.model.rcu(|m| {
            let mut m = RobotModel::clone(m);
            m.change_max_velocity(max_speed);
            m
        });
    }

    /// 按百分比修改最大线速度
    pub fn set_max_speed_percentage(&self, percentage: f64) {
        self.model.rcu(|m| {
            let mut m = RobotModel::clone(m);
            m.set_max_speed_percentage(percentage);
            m
        });
    }

    // ==================== 命令 ====================

    /// 设置底盘速度，按型号限幅
    pub fn set_motion(&self, speed: f64, angular: f64) {
        let model = self.model.load();
        let speed = speed.clamp(-model.max_speed(), model.max_speed());
        let angular = angular.clamp(-model.max_angular(), model.max_angular());
        let mut cmd = self.command.lock();
        cmd.speed = speed;
        cmd.angular = angular;
        cmd.last_speed_set = cmd.update_counter;
    }

    pub fn set_action1(&self, action1: bool) {
        let mut cmd = self.command.lock();
        cmd.action1 = action1;
        cmd.last_action_set = cmd.update_counter;
    }

    pub fn set_action2(&self, action2: bool) {
        let mut cmd = self.command.lock();
        cmd.action2 = action2;
        cmd.last_action_set = cmd.update_counter;
    }

    pub fn speed(&self) -> f64 {
        self.command.lock().speed
    }

    pub fn angular(&self) -> f64 {
        self.command.lock().angular
    }

    pub fn action1(&self) -> bool {
        self.command.lock().action1
    }

    pub fn action2(&self) -> bool {
        self.command.lock().action2
    }

    /// 推进周期计数并执行命令超时检查
    ///
    /// 超过 [`AUTO_STOP_CYCLES`] 个周期未设置速度则速度归零，附件同理。
    pub fn tick(&self) {
        let mut cmd = self.command.lock();
        cmd.update_counter += 1;
        let deadline = cmd.update_counter.saturating_sub(AUTO_STOP_CYCLES);
        if cmd.last_speed_set < deadline && (cmd.speed != 0.0 || cmd.angular != 0.0) {
            debug!("{}: motion command timed out, stopping", self.name);
            cmd.speed = 0.0;
            cmd.angular = 0.0;
        }
        if cmd.last_action_set < deadline {
            cmd.action1 = false;
            cmd.action2 = false;
        }
    }

    // ==================== 电池 ====================

    /// 任意一块电池低于低电量阈值
    pub fn battery_low(&self) -> bool {
        self.info.lock().battery_statuses.iter().any(BatteryStatus::is_low)
    }

    /// 任意一块电池低于危急阈值
    pub fn battery_critical(&self) -> bool {
        self.info
            .lock()
            .battery_statuses
            .iter()
            .any(BatteryStatus::is_critical)
    }

    /// 更新去抖计数器：条件成立时递增到上限，否则清零
    pub fn update_battery_timers(&self) {
        let low = self.battery_low();
        let critical = self.battery_critical();
        let mut cmd = self.command.lock();
        cmd.battery_low_timer = if low {
            (cmd.battery_low_timer + 1).min(BATTERY_TIMER_MAX)
        } else {
            0
        };
        cmd.battery_critical_timer = if critical {
            (cmd.battery_critical_timer + 1).min(BATTERY_TIMER_MAX)
        } else {
            0
        };
    }

    pub fn battery_low_debounced(&self) -> bool {
        self.command.lock().battery_low_timer >= BATTERY_TIMER_MAX
    }

    pub fn battery_critical_debounced(&self) -> bool {
        self.command.lock().battery_critical_timer >= BATTERY_TIMER_MAX
    }

    pub fn battery_statuses(&self) -> Vec<BatteryStatus> {
        self.info.lock().battery_statuses.clone()
    }

    /// 更新一块电池的读数
    pub fn set_battery_status(&self, index: usize, status: BatteryStatus) -> Result<(), DriverError> {
        let mut info = self.info.lock();
        let count = info.battery_statuses.len();
        let slot = info
            .battery_statuses
            .get_mut(index)
            .ok_or(DriverError::BatteryIndex { index, count })?;
        *slot = status;
        Ok(())
    }

    /// 以电池模板生成新读数并写入
    pub fn set_battery_reading(
        &self,
        index: usize,
        charging: bool,
        percentage: f64,
    ) -> Result<(), DriverError> {
        let mut info = self.info.lock();
        let count = info.battery_statuses.len();
        let slot = info
            .battery_statuses
            .get_mut(index)
            .ok_or(DriverError::BatteryIndex { index, count })?;
        *slot = slot.with_reading(charging, percentage);
        Ok(())
    }

    // ==================== 标识 ====================

    pub fn uuid(&self) -> Option<String> {
        self.info.lock().uuid.clone()
    }

    pub fn set_uuid(&self, uuid: Option<String>) {
        self.info.lock().uuid = uuid;
    }

    pub fn version_string(&self) -> Option<String> {
        self.info.lock().version_string.clone()
    }

    pub fn set_version_string(&self, version: Option<String>) {
        self.info.lock().version_string = version;
    }

    pub fn state_string(&self) -> Option<String> {
        self.info.lock().state_string.clone()
    }

    pub fn set_state_string(&self, state: Option<String>) {
        self.info.lock().state_string = state;
    }

    /// 设备离地高度覆盖值
    pub fn device_height(&self) -> Option<f64> {
        self.info.lock().device_height
    }

    /// 设置设备离地高度；`valid == false` 时回退到型号默认值
    pub fn set_device_height(&self, height: f64, valid: bool) {
        self.info.lock().device_height = valid.then_some(height);
    }

    // ==================== 事件 ====================

    /// 绑定事件通道
    ///
    /// 重复绑定会上报 [`DriverFault::Invalid`]。
    pub fn attach(&self, events: Sender<DriverEvent>) {
        let already = {
            let mut info = self.info.lock();
            let already = info.initialized;
            info.initialized = true;
            info.events = Some(events);
            already
        };
        if already {
            self.report_fault(DriverFault::Invalid, Some("driver initialized twice".to_string()));
        }
    }

    /// 上报故障
    pub fn report_fault(&self, fault: DriverFault, context: Option<String>) {
        warn!("{}: driver fault {:?} {:?}", self.name, fault, context);
        self.send(DriverEvent::Fault {
            driver: self.name.clone(),
            fault,
            context,
        });
    }

    /// 通知监视器刷新状态
    pub fn notify_state_changed(&self) {
        self.send(DriverEvent::StateChanged {
            driver: self.name.clone(),
        });
    }

    fn send(&self, event: DriverEvent) {
        let sender = self.info.lock().events.clone();
        if let Some(sender) = sender
            && sender.send(event).is_err()
        {
            debug!("{}: event receiver dropped", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn model() -> RobotModel {
        RobotModel::new(
            0.5,
            2.0,
            0.35,
            0.35,
            0.1,
            0.3,
            vec![BatteryStatus::new("base", 5.0, 15.0, 12.0, 13.0, 16.8)],
        )
    }

    #[test]
    fn test_set_motion_clamps_to_model() {
        let core = DriverCore::new("test", model());
        core.set_motion(3.0, -9.0);
        assert_eq!(core.speed(), 0.5);
        assert_eq!(core.angular(), -2.0);
        core.set_motion(-3.0, 1.0);
        assert_eq!(core.speed(), -0.5);
        assert_eq!(core.angular(), 1.0);
    }

    /// 第 11 次 tick 时未刷新的命令被清零
    #[test]
    fn test_auto_stop_after_ten_cycles() {
        let core = DriverCore::new("test", model());
        core.set_motion(0.3, 0.1);
        core.set_action1(true);
        for _ in 0..AUTO_STOP_CYCLES {
            core.tick();
        }
        assert_eq!(core.speed(), 0.3);
        assert!(core.action1());

        core.tick();
        assert_eq!(core.speed(), 0.0);
        assert_eq!(core.angular(), 0.0);
        assert!(!core.action1());
    }

    /// 附件和速度各自独立计时
    #[test]
    fn test_auto_stop_independent_channels() {
        let core = DriverCore::new("test", model());
        core.set_motion(0.3, 0.0);
        core.set_action2(true);
        for _ in 0..20 {
            core.tick();
            core.set_motion(0.3, 0.0);
        }
        assert_eq!(core.speed(), 0.3);
        assert!(!core.action2());
    }

    #[test]
    fn test_battery_debounce() {
        let core = DriverCore::new("test", model());
        core.set_battery_reading(0, false, 10.0).unwrap();
        assert!(core.battery_low());
        assert!(!core.battery_critical());

        for _ in 0..BATTERY_TIMER_MAX - 1 {
            core.update_battery_timers();
        }
        assert!(!core.battery_low_debounced());
        core.update_battery_timers();
        assert!(core.battery_low_debounced());

        // 一次正常读数即清零
        core.set_battery_reading(0, true, 80.0).unwrap();
        core.update_battery_timers();
        assert!(!core.battery_low_debounced());

        core.set_battery_reading(0, false, 10.0).unwrap();
        core.update_battery_timers();
        assert!(!core.battery_low_debounced());
    }

    #[test]
    fn test_battery_index_out_of_range() {
        let core = DriverCore::new("test", model());
        let err = core.set_battery_reading(2, false, 50.0).unwrap_err();
        assert_eq!(err, DriverError::BatteryIndex { index: 2, count: 1 });
    }

    #[test]
    fn test_change_max_velocity_affects_clamp() {
        let core = DriverCore::new("test", model());
        core.change_max_velocity(0.2);
        core.set_motion(0.4, 0.0);
        assert_eq!(core.speed(), 0.2);
        core.set_max_speed_percentage(100.0);
        assert!((core.model().max_speed() - 0.65).abs() < 1e-10);
    }

    #[test]
    fn test_device_height_override() {
        let core = DriverCore::new("test", model());
        assert_eq!(core.device_height(), None);
        core.set_device_height(0.42, true);
        assert_eq!(core.device_height(), Some(0.42));
        core.set_device_height(0.42, false);
        assert_eq!(core.device_height(), None);
    }

    #[test]
    fn test_double_attach_reports_invalid() {
        let core = DriverCore::new("test", model());
        let (tx, rx) = unbounded();
        core.attach(tx.clone());
        assert!(rx.try_recv().is_err());
        core.attach(tx);
        match rx.try_recv().unwrap() {
            DriverEvent::Fault { fault, driver, .. } => {
                assert_eq!(fault, DriverFault::Invalid);
                assert_eq!(driver, "test");
            },
            other => panic!("unexpected event {:?}", other),
        }
    }
}
