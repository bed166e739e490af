//! 控制层错误类型定义

use thiserror::Error;

/// `Controller::update` 的必需输入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Model,
    Location,
    Points,
    PointCloudLocation,
    World,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InputKind::Model => "model",
            InputKind::Location => "location",
            InputKind::Points => "points",
            InputKind::PointCloudLocation => "point cloud location",
            InputKind::World => "world",
        };
        f.write_str(s)
    }
}

/// 控制层错误类型
///
/// 缺少必需输入说明调用方违反了周期约定，是不可恢复的内部一致性错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// 周期输入缺失
    #[error("Controller error: no {0} in controller")]
    MissingInput(InputKind),

    /// 仲裁器来源列表重复
    #[error("Duplicate source: {0}")]
    DuplicateSource(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试 ControlError 的 Display 实现
    #[test]
    fn test_control_error_display() {
        assert_eq!(
            format!("{}", ControlError::MissingInput(InputKind::Model)),
            "Controller error: no model in controller"
        );
        assert_eq!(
            format!("{}", ControlError::MissingInput(InputKind::PointCloudLocation)),
            "Controller error: no point cloud location in controller"
        );
        assert_eq!(
            format!("{}", ControlError::DuplicateSource("ROS".to_string())),
            "Duplicate source: ROS"
        );
    }
}
