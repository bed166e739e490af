//! # robotside-runner
//!
//! 把控制核心串成一个固定频率的控制循环：
//! - [`RobotRunner`]：每周期 传感器插槽 → 控制器 → 遥操作仲裁 → 驱动
//! - [`RunnerState`]：建图 / 导航 / 标定 / 导入导出 的高层状态机
//! - [`SensorSlots`]：传感器线程写入的最新值插槽
//! - [`RunnerConfig`]：TOML 配置文件
//! - [`Monitor`]、[`SoundSink`]、[`LogSink`]：对外通知接口
//!
//! ```rust,no_run
//! use robotside_control::GoalPursuitBehavior;
//! use robotside_core::SystemClock;
//! use robotside_driver::{MockDriver, RobotDriver};
//! use robotside_runner::{RobotRunner, RunnerConfig};
//!
//! # fn main() -> Result<(), robotside_runner::RunnerError> {
//! let (driver, _mock) = MockDriver::new("base", MockDriver::default_model());
//! let drivers: Vec<Box<dyn RobotDriver>> = vec![Box::new(driver)];
//! let runner = RobotRunner::new(
//!     GoalPursuitBehavior::new(),
//!     drivers,
//!     RunnerConfig::default(),
//!     SystemClock::shared(),
//! )?;
//! let thread = runner.spawn()?;
//! thread.handle().start_mapping()?;
//! thread.shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
mod handle;
pub mod monitor;
mod runner;
pub mod slots;
pub mod state;

pub use config::{ControllerSection, LoopConfig, RunnerConfig, SafetySection, TeleopSection};
pub use error::{ConfigError, RunnerError};
pub use handle::{RunnerCommand, RunnerHandle};
pub use monitor::{LogSink, Monitor, RunnerErrorKind, SoundSink};
pub use runner::{
    CALIBRATION_ANGULAR_SPEED, MSG_BUMPER_ACTIVATED, MSG_CONTROLLER_UNAVAILABLE,
    MSG_NEW_ROBOT_CONNECTED, MSG_ROBOT_DISCONNECTED, RobotRunner, RunnerThread,
};
pub use slots::{DepthFrame, SensorSlots};
pub use state::{RunnerState, RunnerStatus};
