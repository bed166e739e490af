//! 运行器错误类型定义

use robotside_control::ControlError;
use robotside_driver::DriverError;
use std::io;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 数值参数非法
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// TOML 解析失败
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML 序列化失败
    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// 读写配置文件失败
    #[error("Config IO error: {0}")]
    Io(#[from] io::Error),
}

/// 运行器错误类型
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 控制周期契约被破坏，控制循环终止
    #[error("Contract violation: {0}")]
    Contract(#[from] ControlError),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 运行器已退出，命令无法送达
    #[error("Runner command channel closed")]
    ChannelClosed,

    #[error("Failed to spawn runner thread: {0}")]
    ThreadSpawn(#[source] io::Error),

    #[error("Runner thread panicked")]
    ThreadPanicked,
}

#[cfg(test)]
mod tests {
    use super::*;
    use robotside_control::InputKind;

    /// 测试 RunnerError 的 Display 实现
    #[test]
    fn test_runner_error_display() {
        let err = RunnerError::from(ControlError::MissingInput(InputKind::Model));
        assert_eq!(
            format!("{}", err),
            "Contract violation: Controller error: no model in controller"
        );
        assert_eq!(
            format!("{}", RunnerError::ChannelClosed),
            "Runner command channel closed"
        );
        assert_eq!(
            format!("{}", RunnerError::ThreadPanicked),
            "Runner thread panicked"
        );
    }

    /// 测试 ConfigError 的 Display 实现
    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "runner.frequency_hz",
            reason: "must be positive".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Invalid config value for runner.frequency_hz: must be positive"
        );
    }
}
