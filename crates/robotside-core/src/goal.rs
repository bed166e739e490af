//! 目标点（GoalPoint）与其状态

use crate::transform::Transform;
use serde::{Deserialize, Serialize};

/// 到达目标后执行的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GoalPointAction {
    /// 无动作
    #[default]
    NoAction,
    /// 到达后对齐目标朝向
    AlignRotation,
    /// 以目标为中心螺旋吸尘
    VacuumSpiral,
}

/// 目标执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalPointState {
    /// 新目标，行为层应重新开始
    New,
    /// 执行中
    Running,
    /// 已完成
    Completed,
    /// 无法完成
    Rejected,
}

impl GoalPointState {
    /// 是否为终止状态
    pub fn is_terminal(self) -> bool {
        matches!(self, GoalPointState::Completed | GoalPointState::Rejected)
    }
}

/// 目标点：目标位姿 + 到达后动作
///
/// 外部执行层发布，控制器在下一周期接收。不可变值。
#[derive(Debug, Clone, PartialEq)]
pub struct GoalPoint {
    transform: Transform,
    action: GoalPointAction,
    /// 执行层分配的标识（可选，仅用于日志）
    id: Option<String>,
}

impl GoalPoint {
    pub fn new(transform: Transform, action: GoalPointAction) -> Self {
        Self {
            transform,
            action,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn action(&self) -> GoalPointAction {
        self.action
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl std::fmt::Display for GoalPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GoalPoint(transform: {} action: {:?})", self.transform, self.action)
    }
}
