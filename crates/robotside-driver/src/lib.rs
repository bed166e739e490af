//! 驱动层模块
//!
//! 本模块把各种硬件后端统一为一个速度/附件/电池/标识接口：
//! - [`RobotDriver`]：后端实现的 trait，公共逻辑由 [`DriverCore`] 提供
//! - 命令超时自动停止、电池状态去抖
//! - [`RobotDriverMultiplex`]：有序驱动列表，读取走第一个已连接驱动，写入广播
//! - [`MockDriver`]：无硬件的测试后端（`mock` feature）

mod driver;
mod error;
#[cfg(feature = "mock")]
pub mod mock;
mod multiplex;
pub mod pose;
pub mod state;

pub use driver::RobotDriver;
pub use error::{DriverError, DriverEvent, DriverFault};
#[cfg(feature = "mock")]
pub use mock::{MockDriver, MockHandle, SentCommand};
pub use multiplex::RobotDriverMultiplex;
pub use pose::stable_device_transform;
pub use state::{AUTO_STOP_CYCLES, BATTERY_TIMER_MAX, DriverCore};
