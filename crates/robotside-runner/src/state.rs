//! 运行器状态与状态快照

use robotside_control::BumperManeuver;
use serde::Serialize;
use std::fmt;

/// 运行器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunnerState {
    /// 正在初始化驱动
    #[default]
    Init,
    /// 空闲，可以开始建图、导航或标定
    WaitForCommand,
    /// 原地旋转测量设备离地高度
    Calibration,
    /// 正在执行开始命令
    CommandExec,
    /// 正在导入或导出世界，其它命令被拒绝
    ImportExport,
    /// 建图中，可以保存世界
    RunningMapping,
    SavingWorld,
    SavedWorld,
    /// 在已有世界上导航
    RunningNavigation,
    /// 正在停止建图或导航，随后回到 `WaitForCommand`
    Stopping,
    /// 关闭，控制循环退出
    Shutdown,
}

impl RunnerState {
    pub fn is_running(self) -> bool {
        self == RunnerState::RunningNavigation
    }

    pub fn is_mapping(self) -> bool {
        self == RunnerState::RunningMapping
    }

    /// 该状态下是否接收设备位姿和点云
    pub fn accepts_sensor_data(self) -> bool {
        matches!(
            self,
            RunnerState::Calibration | RunnerState::RunningMapping | RunnerState::RunningNavigation
        )
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunnerState::Init => "INIT",
            RunnerState::WaitForCommand => "WAIT_FOR_COMMAND",
            RunnerState::Calibration => "CALIBRATION",
            RunnerState::CommandExec => "COMMAND_EXEC",
            RunnerState::ImportExport => "IMPORT_EXPORT",
            RunnerState::RunningMapping => "RUNNING_MAPPING",
            RunnerState::SavingWorld => "SAVING_WORLD",
            RunnerState::SavedWorld => "SAVED_WORLD",
            RunnerState::RunningNavigation => "RUNNING_NAVIGATION",
            RunnerState::Stopping => "STOPPING",
            RunnerState::Shutdown => "SHUTDOWN",
        };
        f.write_str(s)
    }
}

/// 运行器对外可见的状态快照
///
/// 控制线程每周期结束时整体替换一次，读取方无锁获取。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunnerStatus {
    pub state: RunnerState,
    pub cycle: u64,
    pub localized: bool,
    pub robot_connected: bool,
    pub robot_blocked: bool,
    #[serde(serialize_with = "serialize_display")]
    pub bumper_maneuver: BumperManeuver,
    pub speed: f64,
    pub angular: f64,
    pub action1: bool,
    pub action2: bool,
    pub driver_state: Option<String>,
    pub robot_uuid: Option<String>,
    pub robot_version: Option<String>,
    pub world: Option<String>,
    pub battery_low: bool,
    pub battery_critical: bool,
}

fn serialize_display<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: fmt::Display,
{
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_state_display() {
        assert_eq!(RunnerState::Init.to_string(), "INIT");
        assert_eq!(RunnerState::WaitForCommand.to_string(), "WAIT_FOR_COMMAND");
        assert_eq!(
            RunnerState::RunningNavigation.to_string(),
            "RUNNING_NAVIGATION"
        );
    }

    #[test]
    fn test_sensor_states() {
        assert!(RunnerState::Calibration.accepts_sensor_data());
        assert!(RunnerState::RunningMapping.accepts_sensor_data());
        assert!(!RunnerState::WaitForCommand.accepts_sensor_data());
        assert!(!RunnerState::ImportExport.accepts_sensor_data());
    }
}
