//! 监视器与输出接口
//!
//! 运行器不直接依赖界面、云端或声音子系统：错误和状态变化通过 [`Monitor`] 通知，
//! 控制器产生的声音和状态消息分别转发给 [`SoundSink`] 和 [`LogSink`]。

use std::fmt;

/// 可上报的错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunnerErrorKind {
    /// 驱动不可用（重复初始化、配置错误）
    DriverInvalid,
    /// 驱动运行时错误
    DriverError,
    /// 启动失败（世界无效等）
    StartupError,
    /// 控制周期契约被破坏
    ContractViolation,
}

impl fmt::Display for RunnerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunnerErrorKind::DriverInvalid => "robot_driver_invalid",
            RunnerErrorKind::DriverError => "robot_driver_error",
            RunnerErrorKind::StartupError => "startup_error",
            RunnerErrorKind::ContractViolation => "contract_violation",
        };
        f.write_str(s)
    }
}

/// 运行器监视器
///
/// 回调在控制线程上执行，实现不应阻塞。
pub trait Monitor: Send {
    fn report_error(&mut self, kind: RunnerErrorKind, context: Option<&str>);

    /// 状态快照有可见变化
    fn on_state_update(&mut self);
}

/// 控制器请求播放的声音
pub trait SoundSink: Send {
    fn play_sound(&mut self, name: &str);
}

/// 面向用户的状态消息（阻挡、脱困、机器人连接等）
pub trait LogSink: Send {
    fn log_status(&mut self, robot_uuid: Option<&str>, message: &str);
}
