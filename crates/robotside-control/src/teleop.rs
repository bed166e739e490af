//! 遥操作多路仲裁
//!
//! 来源按优先级排列：ROS > CLOUD > SAFETY_CONTROLLER > CONTROLLER，共用一个过期时间。
//! - 行驶：取优先级最高、未过期且速度非零的来源；没有则下发零速度。
//!   零速度表示“没有意见”，不会挡住低优先级来源。
//! - 附件：每个附件独立，任一未过期来源打开即打开。
//!
//! 每周期无论结果如何都写入驱动，零速度也是主动下发的命令。

use crate::controller::ControllerHandle;
use crate::error::ControlError;
use crate::safety::{BumperManeuver, SafetyController};
use crate::synchronizer::Synchronizer;
use parking_lot::Mutex;
use robotside_core::{BumperId, RobotModel, SharedClock, Teleop};
use robotside_driver::RobotDriverMultiplex;
use tracing::debug;

/// 默认过期时间（毫秒）
pub const TELEOP_TIMEOUT_MS: u64 = 1000;

/// 遥操作来源，按优先级从高到低
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeleopSource {
    Ros,
    Cloud,
    SafetyController,
    Controller,
}

impl TeleopSource {
    pub const ALL: [TeleopSource; 4] = [
        TeleopSource::Ros,
        TeleopSource::Cloud,
        TeleopSource::SafetyController,
        TeleopSource::Controller,
    ];
}

struct MultiplexerState {
    sync: Synchronizer<TeleopSource, Teleop>,
    maneuver: BumperManeuver,
}

pub struct TeleopMultiplexer {
    state: Mutex<MultiplexerState>,
    clock: SharedClock,
}

impl TeleopMultiplexer {
    pub fn new(clock: SharedClock) -> Result<Self, ControlError> {
        Self::with_timeout(TELEOP_TIMEOUT_MS, clock)
    }

    pub fn with_timeout(timeout_ms: u64, clock: SharedClock) -> Result<Self, ControlError> {
        Ok(Self {
            state: Mutex::new(MultiplexerState {
                sync: Synchronizer::new(TeleopSource::ALL, timeout_ms, clock.clone())?,
                maneuver: BumperManeuver::None,
            }),
            clock,
        })
    }

    /// 控制器有新输出时刷新 CONTROLLER 来源
    pub fn update_from_controller(&self, controller: &ControllerHandle) {
        if controller.have_motion() {
            let teleop = Teleop::new(
                controller.speed(),
                controller.angular(),
                controller.action1(),
                controller.action2(),
                self.clock.now_ms(),
            );
            self.state
                .lock()
                .sync
                .set_value(TeleopSource::Controller, Some(teleop));
        }
    }

    /// 用当前保险杠读数推进安全控制器并刷新 SAFETY_CONTROLLER 来源
    ///
    /// 脱困进行中时同时清除 CONTROLLER 来源，避免安全控制器的零速度
    /// 被碰撞前残留的控制器命令覆盖。
    ///
    /// # 返回
    /// 脱困动作状态发生变化时返回 `true`
    pub fn update_from_safety_controller(
        &self,
        safety: &mut SafetyController,
        bumper: BumperId,
    ) -> bool {
        let bumped = safety.update_bumper(bumper);
        let mut state = self.state.lock();
        if bumped {
            let teleop = Teleop::new(
                safety.safe_linear_speed(),
                safety.safe_angular_speed(),
                false,
                false,
                self.clock.now_ms(),
            );
            state
                .sync
                .set_value(TeleopSource::SafetyController, Some(teleop));
            state.sync.set_value(TeleopSource::Controller, None);
        } else {
            state.sync.set_value(TeleopSource::SafetyController, None);
        }

        let maneuver = safety.bumper_maneuver();
        if maneuver != state.maneuver {
            debug!("Bumper maneuver {} -> {}", state.maneuver, maneuver);
            state.maneuver = maneuver;
            return true;
        }
        false
    }

    /// ROS 有新速度命令时调用
    pub fn update_from_ros(&self, teleop: Teleop) {
        self.state
            .lock()
            .sync
            .set_value(TeleopSource::Ros, Some(teleop));
    }

    /// 刷新 CLOUD 来源
    ///
    /// 云端命令为归一化值，按型号最大速度缩放；多个通道取最新的一条。
    /// 没有型号时无法缩放，丢弃全部云端命令。
    pub fn update_from_cloud(
        &self,
        channels: impl IntoIterator<Item = Option<Teleop>>,
        model: Option<&RobotModel>,
    ) {
        let scaled: Vec<Option<Teleop>> = match model {
            Some(model) => channels
                .into_iter()
                .map(|t| t.map(|t| t.scaled(model.max_speed(), model.max_angular())))
                .collect(),
            None => Vec::new(),
        };
        self.state
            .lock()
            .sync
            .set_values(TeleopSource::Cloud, scaled);
    }

    /// 当前仲裁结果：(行驶命令, action1, action2)
    pub fn select(&self) -> (Option<Teleop>, bool, bool) {
        let state = self.state.lock();
        let drive = state.sync.first_value(|t| t.has_motion()).copied();
        let action1 = state.sync.first_value(|t| t.action1).is_some();
        let action2 = state.sync.first_value(|t| t.action2).is_some();
        (drive, action1, action2)
    }

    /// 把仲裁结果写入驱动
    ///
    /// # 返回
    /// 附件状态与驱动上一次的状态不同时返回 `true`
    pub fn update_driver(&self, driver: &RobotDriverMultiplex) -> bool {
        let (drive, action1, action2) = self.select();
        match drive {
            Some(t) => driver.set_motion(t.vx, t.rz),
            None => driver.set_motion(0.0, 0.0),
        }
        let changed = action1 != driver.action1() || action2 != driver.action2();
        driver.set_action1(action1);
        driver.set_action2(action2);
        changed
    }

    /// 当前脱困动作状态（最近一次 `update_from_safety_controller` 的结果）
    pub fn bumper_maneuver(&self) -> BumperManeuver {
        self.state.lock().maneuver
    }
}
