//! # robotside-control
//!
//! 每个控制周期决定真正下发到电机的命令：
//! - [`Controller`]：目标点握手、动画播放、行为委托，以及公共算法
//!   （直线驱动到目标、深度点云阻挡检测、到达后的动作）
//! - [`GoalPursuitBehavior`]：直接驶向目标点的行为
//! - [`SafetyController`]：保险杠脱困状态机
//! - [`TeleopMultiplexer`]：按优先级和过期时间合并多个速度来源
//!
//! 时间一律来自注入的 [`Clock`](robotside_core::Clock)，测试中使用
//! [`ManualClock`](robotside_core::ManualClock) 得到确定性结果。

mod actions;
pub mod blocked;
pub mod controller;
pub mod drive;
mod error;
pub mod pursuit;
pub mod safety;
pub mod synchronizer;
pub mod teleop;

pub use actions::{VACUUM_SPIRAL_RADIUS, VACUUM_SPIRAL_SPEED, VACUUM_SPIRAL_TIME_MS};
pub use blocked::{BlockedDepthConfig, PointClass, count_blockers};
pub use controller::{
    Controller, ControllerConfig, ControllerContext, ControllerHandle, CycleInputs,
    ROBOT_BLOCKED_POINTS, ROBOT_UNBLOCKED_POINTS, RobotBehavior,
};
pub use drive::{DriveStep, SpeedLimits, plan_drive, rate_limit};
pub use error::{ControlError, InputKind};
pub use pursuit::{GoalPursuitBehavior, PursuitState};
pub use safety::{BumperManeuver, SafetyController};
pub use synchronizer::{Synchronizer, Timestamped};
pub use teleop::{TELEOP_TIMEOUT_MS, TeleopMultiplexer, TeleopSource};
