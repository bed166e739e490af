//! # robotside-core
//!
//! 控制核心共享的值类型：
//! - 位姿变换（[`Transform`]）与角度工具
//! - 机器人型号与电池状态
//! - 目标点、遥操作命令、点云、世界句柄、保险杠编号
//! - 时钟抽象与取出即清空的消息队列
//! - 动画脚本解析
//!
//! 本 crate 不做 IO（除读取动画文件外），不持有线程。

pub mod animation;
pub mod bumper;
pub mod clock;
mod error;
pub mod goal;
pub mod model;
pub mod point_cloud;
pub mod queue;
pub mod teleop;
pub mod transform;
pub mod world;

pub use animation::{
    Animation, AnimationCommand, AnimationSet, read_animation, read_animation_call,
    read_animation_file, read_animation_path,
};
pub use bumper::BumperId;
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::AnimationError;
pub use goal::{GoalPoint, GoalPointAction, GoalPointState};
pub use model::{BatteryStatus, MAX_ALLOWED_LINEAR_VELOCITY, RobotModel};
pub use point_cloud::PointCloud;
pub use queue::MessageQueue;
pub use teleop::Teleop;
pub use transform::{Transform, wrap_angle};
pub use world::{PointMapWorld, World, WorldHandle};
