//! 运行器的跨线程句柄
//!
//! 状态迁移命令经 `crossbeam_channel` 送到控制线程，在周期末尾处理；
//! 导入导出锁与状态读取直接访问共享状态。

use crate::error::RunnerError;
use crate::slots::SensorSlots;
use crate::state::{RunnerState, RunnerStatus};
use arc_swap::{ArcSwap, ArcSwapOption};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use robotside_control::ControllerHandle;
use robotside_core::WorldHandle;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// 送往控制线程的命令
#[derive(Debug, Clone)]
pub enum RunnerCommand {
    StartMapping,
    StartOperation(WorldHandle),
    StopOperations,
    Calibrate,
    SaveWorld(String),
    SetMaxSpeedPercentage(f64),
    Shutdown,
}

#[derive(Debug)]
pub(crate) struct RunnerShared {
    pub(crate) slots: SensorSlots,
    pub(crate) state: Mutex<RunnerState>,
    pub(crate) status: ArcSwap<RunnerStatus>,
    pub(crate) world: ArcSwapOption<WorldHandle>,
    pub(crate) motion_enabled: AtomicBool,
}

impl Default for RunnerShared {
    fn default() -> Self {
        Self {
            slots: SensorSlots::default(),
            state: Mutex::new(RunnerState::Init),
            status: ArcSwap::from_pointee(RunnerStatus::default()),
            world: ArcSwapOption::empty(),
            motion_enabled: AtomicBool::new(true),
        }
    }
}

/// 运行器句柄，可克隆并在任意线程使用
#[derive(Debug, Clone)]
pub struct RunnerHandle {
    pub(crate) commands: Sender<RunnerCommand>,
    pub(crate) shared: Arc<RunnerShared>,
    pub(crate) controller: ControllerHandle,
}

impl RunnerHandle {
    fn send(&self, command: RunnerCommand) -> Result<(), RunnerError> {
        debug!("Runner command {:?}", command);
        self.commands
            .send(command)
            .map_err(|_| RunnerError::ChannelClosed)
    }

    pub fn start_mapping(&self) -> Result<(), RunnerError> {
        self.send(RunnerCommand::StartMapping)
    }

    pub fn start_operation(&self, world: WorldHandle) -> Result<(), RunnerError> {
        self.send(RunnerCommand::StartOperation(world))
    }

    pub fn stop_operations(&self) -> Result<(), RunnerError> {
        self.send(RunnerCommand::StopOperations)
    }

    /// 测量设备离地高度
    pub fn calibrate(&self) -> Result<(), RunnerError> {
        self.send(RunnerCommand::Calibrate)
    }

    pub fn save_world(&self, name: impl Into<String>) -> Result<(), RunnerError> {
        self.send(RunnerCommand::SaveWorld(name.into()))
    }

    /// 按型号允许的最大线速度的百分比限速
    pub fn set_max_speed_percentage(&self, percentage: f64) -> Result<(), RunnerError> {
        self.send(RunnerCommand::SetMaxSpeedPercentage(percentage))
    }

    pub fn shutdown(&self) -> Result<(), RunnerError> {
        self.send(RunnerCommand::Shutdown)
    }

    /// 获取导入导出锁
    ///
    /// # 返回
    /// 只有在 `WaitForCommand` 状态下才能获取，成功时进入 `ImportExport`
    pub fn lock_export_state(&self) -> bool {
        let mut state = self.shared.state.lock();
        if *state != RunnerState::WaitForCommand {
            return false;
        }
        *state = RunnerState::ImportExport;
        true
    }

    /// 释放导入导出锁
    pub fn clear_export_state(&self) {
        let mut state = self.shared.state.lock();
        if *state == RunnerState::ImportExport {
            *state = RunnerState::WaitForCommand;
        }
    }

    pub fn is_export_state(&self) -> bool {
        *self.shared.state.lock() == RunnerState::ImportExport
    }

    pub fn state(&self) -> RunnerState {
        *self.shared.state.lock()
    }

    /// 最近一个周期结束时的状态快照
    pub fn status(&self) -> Arc<RunnerStatus> {
        self.shared.status.load_full()
    }

    /// 正在导航的世界
    pub fn world(&self) -> Option<Arc<WorldHandle>> {
        self.shared.world.load_full()
    }

    /// 关闭后所有运动命令都下发为零
    pub fn set_motion_enabled(&self, enabled: bool) {
        self.shared.motion_enabled.store(enabled, Ordering::Release);
    }

    pub fn motion_enabled(&self) -> bool {
        self.shared.motion_enabled.load(Ordering::Acquire)
    }

    pub fn slots(&self) -> &SensorSlots {
        &self.shared.slots
    }

    /// 控制器句柄（目标点、动画、声音与消息队列）
    pub fn controller(&self) -> &ControllerHandle {
        &self.controller
    }
}
