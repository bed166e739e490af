//! 到达目标后的动作

use crate::controller::ControllerContext;
use robotside_core::{GoalPointAction, GoalPointState};
use tracing::debug;

/// 螺旋清扫时长（毫秒）
pub const VACUUM_SPIRAL_TIME_MS: u64 = 30_000;
/// 螺旋清扫线速度（m/s）
pub const VACUUM_SPIRAL_SPEED: f64 = 0.1;
/// 螺旋结束时的半径（米）
pub const VACUUM_SPIRAL_RADIUS: f64 = 0.3;
/// 起步时的最小半径，避免角速度无穷大
const MIN_SPIRAL_RADIUS: f64 = 0.05;

impl ControllerContext<'_> {
    fn goal_action(&self) -> Option<GoalPointAction> {
        self.current_goal_point().map(|g| g.action())
    }

    /// 到达后是否对齐目标朝向
    pub fn should_align_goal_rotation(&self) -> bool {
        self.goal_action() == Some(GoalPointAction::AlignRotation)
    }

    /// 到达后是否直接结束，不执行动作
    pub fn goal_point_immediate_terminate(&self) -> bool {
        matches!(
            self.goal_action(),
            Some(GoalPointAction::NoAction | GoalPointAction::AlignRotation)
        )
    }

    /// 开始执行目标动作
    ///
    /// # 返回
    /// 动作成功开始时返回 `true`；没有目标或动作不可执行时返回 `false`
    pub fn start_goal_point_action(&mut self) -> bool {
        match self.goal_action() {
            Some(GoalPointAction::VacuumSpiral) => {
                let now = self.now_ms();
                self.set_action_start_ms(now);
                self.add_log_message("[CONTROLLER] Starting vacuuming");
                true
            }
            _ => false,
        }
    }

    /// 推进目标动作一个周期
    ///
    /// # 返回
    /// `Running` 表示继续，`Completed` 表示完成，`Rejected` 表示没有可执行的动作
    pub fn handle_goal_point_action(&mut self) -> GoalPointState {
        match self.goal_action() {
            Some(GoalPointAction::VacuumSpiral) => self.vacuum_spiral(),
            _ => GoalPointState::Rejected,
        }
    }

    fn vacuum_spiral(&mut self) -> GoalPointState {
        let elapsed = self.now_ms().saturating_sub(self.action_start_ms());
        if elapsed > VACUUM_SPIRAL_TIME_MS {
            debug!("Vacuum spiral finished");
            self.set_motion(0.0, 0.0);
            self.set_action1(false);
            self.set_action2(false);
            return GoalPointState::Completed;
        }

        let radius = (VACUUM_SPIRAL_RADIUS * elapsed as f64 / VACUUM_SPIRAL_TIME_MS as f64)
            .max(MIN_SPIRAL_RADIUS);
        self.set_motion(VACUUM_SPIRAL_SPEED, VACUUM_SPIRAL_SPEED / radius);
        self.set_action1(true);
        self.set_action2(true);

        // 看到墙就停止前进
        if self.is_blocked_depth() {
            let angular = self.angular();
            self.set_motion(0.0, angular);
        }
        GoalPointState::Running
    }
}
