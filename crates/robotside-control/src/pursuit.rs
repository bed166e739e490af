//! 目标追踪行为
//!
//! 一个完整的 [`RobotBehavior`]：接收控制器的目标点，检查目标是否靠近已知地图点，
//! 直线驱动到目标，按需对齐朝向，然后执行到达后的动作。
//! 超时或动作不可执行时拒绝目标，并记录拒绝原因。

use crate::controller::{ControllerContext, RobotBehavior};
use robotside_core::{GoalPoint, GoalPointState, Transform};
use tracing::{debug, info, warn};

pub const GOAL_REJECTED_NULL: &str = "[Goal rejected] Null goal";
pub const GOAL_REJECTED_FAR: &str = "[Goal rejected] Goal is too far";
pub const GOAL_REJECTED_TIMEOUT: &str = "[Goal rejected] Timeout reached";
pub const GOAL_REJECTED_INVALID_ACTION: &str = "[Goal rejected] Invalid action";

/// 追踪状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PursuitState {
    /// 没有目标，或上一个目标已完成
    #[default]
    NoGoal,
    /// 正在驶向目标
    Driving,
    /// 正在执行到达后的动作
    Action,
    /// 目标被拒绝
    Rejected,
}

#[derive(Debug, Default)]
pub struct GoalPursuitBehavior {
    state: PursuitState,
    goal: Option<GoalPoint>,
    timer_start_ms: u64,
    rejection_reason: Option<&'static str>,
}

impl GoalPursuitBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PursuitState {
        self.state
    }

    fn clear_goal(&mut self, ctx: &mut ControllerContext<'_>) {
        self.goal = None;
        self.state = PursuitState::NoGoal;
        ctx.set_action1(false);
        ctx.set_action2(false);
    }

    fn reject(&mut self, reason: &'static str) {
        info!("{}", reason);
        self.state = PursuitState::Rejected;
        self.rejection_reason = Some(reason);
    }

    fn set_goal(&mut self, ctx: &mut ControllerContext<'_>, goal: GoalPoint) {
        self.clear_goal(ctx);
        let tf = goal.transform();
        if !(tf.x().is_finite() && tf.y().is_finite()) {
            self.reject(GOAL_REJECTED_NULL);
            return;
        }
        if let Some(distance) = ctx.world().distance_to_known_point(tf)
            && distance > ctx.goal_max_distance()
        {
            debug!(
                "Goal is {:.2}m from the map, limit {:.2}m",
                distance,
                ctx.goal_max_distance()
            );
            self.reject(GOAL_REJECTED_FAR);
            return;
        }
        self.timer_start_ms = ctx.now_ms();
        self.state = PursuitState::Driving;
        self.goal = Some(goal);
    }

    /// 根据控制器的目标状态选择或结束目标
    fn update_goal(&mut self, ctx: &mut ControllerContext<'_>) {
        let Some(goal) = ctx.current_goal_point().cloned() else {
            self.clear_goal(ctx);
            return;
        };
        if ctx.current_goal_point_state() == GoalPointState::New {
            self.set_goal(ctx, goal);
            ctx.set_current_goal_point_state(GoalPointState::Running);
        } else {
            match self.state {
                PursuitState::NoGoal => ctx.set_current_goal_point_state(GoalPointState::Completed),
                PursuitState::Rejected => ctx.set_current_goal_point_state(GoalPointState::Rejected),
                PursuitState::Driving | PursuitState::Action => {}
            }
        }
    }

    fn drive(&mut self, ctx: &mut ControllerContext<'_>) {
        let Some(target) = self.goal.as_ref().map(|g| *g.transform()) else {
            self.state = PursuitState::NoGoal;
            return;
        };
        let align = ctx.should_align_goal_rotation();
        if ctx.drive_to_location(&target, align, false) {
            if ctx.goal_point_immediate_terminate() {
                info!("Clearing the goal, we have hit the target");
                self.clear_goal(ctx);
            } else if ctx.start_goal_point_action() {
                self.state = PursuitState::Action;
            } else {
                warn!("Reject goal for bad action");
                self.reject(GOAL_REJECTED_INVALID_ACTION);
            }
            ctx.set_motion(0.0, 0.0);
            return;
        }

        // 看到墙就停止前进
        if ctx.is_blocked_depth() {
            let angular = ctx.angular();
            ctx.set_motion(0.0, angular);
        }

        let timeout = ctx.goal_timeout_sec();
        if timeout > 0.0
            && ctx.now_ms().saturating_sub(self.timer_start_ms) as f64 > timeout * 1000.0
        {
            self.reject(GOAL_REJECTED_TIMEOUT);
        }
    }
}

impl RobotBehavior for GoalPursuitBehavior {
    fn on_new_world(&mut self, ctx: &mut ControllerContext<'_>) {
        self.clear_goal(ctx);
    }

    fn on_update(&mut self, ctx: &mut ControllerContext<'_>) {
        self.update_goal(ctx);

        match self.state {
            PursuitState::Driving => self.drive(ctx),
            PursuitState::Action => match ctx.handle_goal_point_action() {
                GoalPointState::Completed => {
                    info!("Clearing the goal, we have hit the target");
                    self.clear_goal(ctx);
                }
                GoalPointState::Rejected => self.reject(GOAL_REJECTED_INVALID_ACTION),
                GoalPointState::New | GoalPointState::Running => {}
            },
            PursuitState::NoGoal | PursuitState::Rejected => {
                ctx.set_motion(0.0, 0.0);
                ctx.set_action1(false);
                ctx.set_action2(false);
            }
        }
    }

    fn path(&self) -> Vec<Transform> {
        self.goal.iter().map(|g| *g.transform()).collect()
    }

    fn goal_rejection_reason(&self) -> Option<&str> {
        self.rejection_reason
    }
}
