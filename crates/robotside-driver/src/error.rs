//! 驱动层错误类型定义

use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// 多路驱动列表为空
    #[error("Drivers must be non-empty")]
    EmptyMultiplex,

    /// 电池编号越界
    #[error("Battery index {index} out of range (count: {count})")]
    BatteryIndex { index: usize, count: usize },
}

/// 驱动上报给运行器的故障类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverFault {
    /// 驱动被重复初始化或处于不可用状态
    Invalid,
    /// 驱动运行时错误（串口断开、设备异常等）
    Error,
}

/// 驱动事件
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    /// 故障及可选的上下文描述
    Fault {
        driver: String,
        fault: DriverFault,
        context: Option<String>,
    },
    /// 连接状态或状态字符串变化，监视器应刷新
    StateChanged { driver: String },
}

#[cfg(test)]
mod tests {
    use super::DriverError;

    /// 测试 DriverError 的 Display 实现
    #[test]
    fn test_driver_error_display() {
        assert_eq!(
            format!("{}", DriverError::EmptyMultiplex),
            "Drivers must be non-empty"
        );
        let msg = format!("{}", DriverError::BatteryIndex { index: 3, count: 1 });
        assert!(msg.contains("Battery index 3") && msg.contains("count: 1"));
    }
}
