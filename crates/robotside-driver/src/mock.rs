//! Mock 驱动
//!
//! 不连接任何硬件。连接状态、保险杠、电池读数通过 [`MockHandle`] 从外部脚本化，
//! 每周期实际“下发”的命令记录在句柄中，供测试和仿真检查。

use crate::driver::RobotDriver;
use crate::error::DriverFault;
use crate::pose::stable_device_transform;
use crate::state::DriverCore;
use parking_lot::Mutex;
use robotside_core::{BumperId, RobotModel, Transform};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use tracing::warn;

/// 一个周期下发给硬件的命令
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentCommand {
    pub cycle: u64,
    pub speed: f64,
    pub angular: f64,
    pub action1: bool,
    pub action2: bool,
}

#[derive(Debug, Default)]
struct MockShared {
    connected: AtomicBool,
    bumper: AtomicU8,
    cycles: AtomicU64,
    /// 下一次 update 时写入的电池读数：(序号, 充电中, 百分比)
    pending_battery: Mutex<Vec<(usize, bool, f64)>>,
    sent: Mutex<Vec<SentCommand>>,
}

/// Mock 驱动的外部控制句柄
#[derive(Debug, Clone)]
pub struct MockHandle {
    shared: Arc<MockShared>,
}

impl MockHandle {
    pub fn set_connected(&self, connected: bool) {
        self.shared.connected.store(connected, Ordering::Relaxed);
    }

    pub fn set_bumper(&self, bumper: BumperId) {
        self.shared.bumper.store(bumper.into(), Ordering::Relaxed);
    }

    /// 设置原始保险杠读数，未知编号视为未触发
    pub fn set_raw_bumper(&self, raw: u8) {
        let bumper = BumperId::try_from(raw).unwrap_or_else(|_| {
            warn!("Unknown bumper id {}", raw);
            BumperId::None
        });
        self.set_bumper(bumper);
    }

    /// 下一周期更新一块电池的读数
    pub fn set_battery(&self, index: usize, charging: bool, percentage: f64) {
        self.shared
            .pending_battery
            .lock()
            .push((index, charging, percentage));
    }

    /// 已执行的 update 次数
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::Relaxed)
    }

    /// 取出并清空命令记录
    pub fn take_sent(&self) -> Vec<SentCommand> {
        std::mem::take(&mut *self.shared.sent.lock())
    }

    /// 最近一次下发的命令
    pub fn last_sent(&self) -> Option<SentCommand> {
        self.shared.sent.lock().last().copied()
    }
}

/// Mock 驱动
pub struct MockDriver {
    core: DriverCore,
    shared: Arc<MockShared>,
    forward_offset: f64,
}

impl MockDriver {
    /// 创建 Mock 驱动，初始为已连接
    pub fn new(name: impl Into<String>, model: RobotModel) -> (Self, MockHandle) {
        let shared = Arc::new(MockShared::default());
        shared.connected.store(true, Ordering::Relaxed);
        let driver = Self {
            core: DriverCore::new(name, model),
            shared: shared.clone(),
            forward_offset: 0.0,
        };
        (driver, MockHandle { shared })
    }

    /// 设备相对底盘中心的前向偏移
    pub fn with_forward_offset(mut self, forward_offset: f64) -> Self {
        self.forward_offset = forward_offset;
        self
    }

    /// 默认型号：小型圆形扫地机器人
    pub fn default_model() -> RobotModel {
        RobotModel::new(
            0.4,
            2.0,
            0.35,
            0.35,
            0.1,
            0.3,
            vec![robotside_core::BatteryStatus::new(
                "base", 5.0, 15.0, 12.0, 13.0, 16.8,
            )],
        )
    }
}

impl RobotDriver for MockDriver {
    fn core(&self) -> &DriverCore {
        &self.core
    }

    fn on_init(&mut self) {
        self.core.set_uuid(Some(format!("MOCK:{}", self.core.name())));
        self.core.set_version_string(Some("mock-1".to_string()));
        // 满电起步，避免未读数时误报低电量
        let count = self.core.battery_statuses().len();
        for i in 0..count {
            let _ = self.core.set_battery_reading(i, false, 100.0);
        }
    }

    fn on_update(&mut self) {
        let cycle = self.shared.cycles.fetch_add(1, Ordering::Relaxed) + 1;

        let pending = std::mem::take(&mut *self.shared.pending_battery.lock());
        for (index, charging, percentage) in pending {
            if let Err(e) = self.core.set_battery_reading(index, charging, percentage) {
                self.core.report_fault(DriverFault::Error, Some(e.to_string()));
            }
        }

        let connected = self.is_connected();
        let state = if connected { "connected" } else { "disconnected" };
        if self.core.state_string().as_deref() != Some(state) {
            self.core.set_state_string(Some(state.to_string()));
            // 断开后不再知道连的是哪台机器人
            let uuid = connected.then(|| format!("MOCK:{}", self.core.name()));
            self.core.set_uuid(uuid);
            self.core.notify_state_changed();
        }
        if !connected {
            return;
        }

        self.shared.sent.lock().push(SentCommand {
            cycle,
            speed: self.core.speed(),
            angular: self.core.angular(),
            action1: self.core.action1(),
            action2: self.core.action2(),
        });
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Relaxed)
    }

    fn bumper(&self) -> BumperId {
        BumperId::try_from(self.shared.bumper.load(Ordering::Relaxed)).unwrap_or_default()
    }

    fn device_to_base(&self, device: &Transform) -> Transform {
        stable_device_transform(
            device,
            self.forward_offset,
            self.core.model().device_z(),
            self.core.device_height(),
        )
    }
}
