//! 控制器核心
//!
//! [`Controller`] 每个控制周期被调用一次，负责：
//! - 目标点握手：发布槽与控制线程工作副本之间按代数（generation）同步
//! - 动画播放：动画优先于一切常规行为，直到播放完或被取消
//! - 常规行为：委托给 [`RobotBehavior`]，通过 [`ControllerContext`] 使用公共算法
//!
//! 其他线程通过 [`ControllerHandle`] 发布目标、排队动画、读取运动输出和消息队列。
//!
//! # 周期约定
//!
//! `update` 需要模型、位姿、点云、深度相机位姿和世界全部存在，
//! 缺失任意一项说明调用方违反约定，返回 [`ControlError::MissingInput`]。

use crate::blocked::{self, BlockedDepthConfig};
use crate::drive::{self, DriveStep, SpeedLimits};
use crate::error::{ControlError, InputKind};
use parking_lot::Mutex;
use robotside_core::{
    Animation, AnimationCommand, GoalPoint, GoalPointState, MessageQueue, PointCloud, RobotModel,
    SharedClock, Transform, WorldHandle,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, trace};

pub const ROBOT_BLOCKED_POINTS: &str = "[BLOCKED] Robot is blocked by pointcloud";
pub const ROBOT_UNBLOCKED_POINTS: &str = "[BLOCKED] Robot is unblocked by pointcloud";

/// 控制器参数
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerConfig {
    pub speed_limits: SpeedLimits,
    pub blocked: BlockedDepthConfig,
}

// ==================== 周期输入 ====================

/// 一个控制周期的输入快照
#[derive(Debug, Clone, Default)]
pub struct CycleInputs {
    pub world: Option<WorldHandle>,
    /// 底盘在世界中的位姿
    pub location: Option<Transform>,
    pub model: Option<Arc<RobotModel>>,
    /// 设备（相机主体）在世界中的位姿
    pub device_location: Option<Transform>,
    /// 深度相机在世界中的位姿
    pub depth_location: Option<Transform>,
    pub point_cloud: Option<Arc<PointCloud>>,
    /// 目标离已知地图点的最大允许距离（米）
    pub goal_max_distance: f64,
    /// 放弃不可达目标前的等待时间（秒），0 表示不超时
    pub goal_timeout_sec: f64,
}

impl CycleInputs {
    /// 按 模型 → 位姿 → 点云 → 点云位姿 → 世界 的顺序检查
    fn validate(self, now_ms: u64) -> Result<Cycle, ControlError> {
        let missing = ControlError::MissingInput;
        let model = self.model.ok_or(missing(InputKind::Model))?;
        let location = self.location.ok_or(missing(InputKind::Location))?;
        let point_cloud = self.point_cloud.ok_or(missing(InputKind::Points))?;
        let depth_location = self
            .depth_location
            .ok_or(missing(InputKind::PointCloudLocation))?;
        let world = self.world.ok_or(missing(InputKind::World))?;
        Ok(Cycle {
            world,
            location,
            model,
            device_location: self.device_location,
            depth_location,
            point_cloud,
            goal_max_distance: self.goal_max_distance,
            goal_timeout_sec: self.goal_timeout_sec,
            now_ms,
        })
    }
}

/// 校验后的周期输入
#[derive(Debug, Clone)]
struct Cycle {
    world: WorldHandle,
    location: Transform,
    model: Arc<RobotModel>,
    device_location: Option<Transform>,
    depth_location: Transform,
    point_cloud: Arc<PointCloud>,
    goal_max_distance: f64,
    goal_timeout_sec: f64,
    now_ms: u64,
}

// ==================== 跨线程共享状态 ====================

#[derive(Debug, Default)]
struct GoalSlots {
    published: Option<GoalPoint>,
    /// 每次发布加一，值相同的目标也视为新目标
    generation: u64,
    /// 回读槽；从未发布过目标时为 None
    state: Option<GoalPointState>,
}

#[derive(Debug, Default, Clone, Copy)]
struct MotionOutput {
    speed: f64,
    angular: f64,
    action1: bool,
    action2: bool,
    pending: bool,
}

#[derive(Debug, Default)]
struct ControllerShared {
    goal: Mutex<GoalSlots>,
    next_animation: Mutex<Option<Arc<Animation>>>,
    cancel_animation: AtomicBool,
    playing: Mutex<Option<Arc<Animation>>>,
    motion: Mutex<MotionOutput>,
    sounds: MessageQueue,
    logs: MessageQueue,
}

/// 控制器的跨线程句柄
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    shared: Arc<ControllerShared>,
}

impl ControllerHandle {
    /// 发布新目标，下一周期生效
    pub fn set_goal_point(&self, goal: GoalPoint) {
        self.publish_goal(Some(goal));
    }

    /// 取消当前目标
    pub fn cancel_goal(&self) {
        self.publish_goal(None);
    }

    fn publish_goal(&self, goal: Option<GoalPoint>) {
        let mut slots = self.shared.goal.lock();
        slots.published = goal;
        slots.generation = slots.generation.wrapping_add(1);
        slots.state = Some(GoalPointState::New);
    }

    /// 最近发布目标的状态（控制器处理前为 `New`）
    pub fn goal_point_state(&self) -> Option<GoalPointState> {
        self.shared.goal.lock().state
    }

    /// 排队一个动画，下一周期开始播放并替换正在播放的动画
    pub fn set_animation(&self, animation: impl Into<Arc<Animation>>) {
        *self.shared.next_animation.lock() = Some(animation.into());
    }

    /// 取消正在播放的动画
    pub fn cancel_animation(&self) {
        self.shared.cancel_animation.store(true, Ordering::Release);
    }

    /// 正在播放的动画（上一周期结束时）
    pub fn animation(&self) -> Option<Arc<Animation>> {
        self.shared.playing.lock().clone()
    }

    /// 自上次调用以来运动输出是否被设置过（读取即清除）
    pub fn have_motion(&self) -> bool {
        std::mem::take(&mut self.shared.motion.lock().pending)
    }

    pub fn speed(&self) -> f64 {
        self.shared.motion.lock().speed
    }

    pub fn angular(&self) -> f64 {
        self.shared.motion.lock().angular
    }

    pub fn action1(&self) -> bool {
        self.shared.motion.lock().action1
    }

    pub fn action2(&self) -> bool {
        self.shared.motion.lock().action2
    }

    /// 取出并清空待播放的声音
    pub fn get_and_clear_sounds(&self) -> Vec<String> {
        self.shared.sounds.take_all()
    }

    /// 取出并清空状态消息
    pub fn get_and_clear_log_messages(&self) -> Vec<String> {
        self.shared.logs.take_all()
    }
}

// ==================== 控制线程工作状态 ====================

#[derive(Debug)]
struct ControllerState {
    shared: Arc<ControllerShared>,
    config: ControllerConfig,

    goal: Option<GoalPoint>,
    goal_generation: u64,
    goal_state: GoalPointState,

    animation: Option<Arc<Animation>>,
    animation_step: usize,
    animation_wait_until: Option<u64>,

    world: Option<WorldHandle>,
    was_blocked: bool,
    robot_is_blocked: bool,
    /// 本周期的阻挡检测结果
    blocked_cache: Option<bool>,
    point_colors: Vec<u32>,
    point_colors_valid: bool,

    action_start_ms: u64,
}

impl ControllerState {
    fn new(config: ControllerConfig) -> Self {
        Self {
            shared: Arc::new(ControllerShared::default()),
            config,
            goal: None,
            goal_generation: 0,
            goal_state: GoalPointState::New,
            animation: None,
            animation_step: 0,
            animation_wait_until: None,
            world: None,
            was_blocked: false,
            robot_is_blocked: false,
            blocked_cache: None,
            point_colors: Vec::new(),
            point_colors_valid: false,
            action_start_ms: 0,
        }
    }

    fn sync_goal(&mut self) {
        let mut slots = self.shared.goal.lock();
        if slots.generation != self.goal_generation {
            self.goal_generation = slots.generation;
            self.goal = slots.published.clone();
            self.goal_state = GoalPointState::New;
            slots.state = Some(GoalPointState::New);
        }
    }

    fn publish_goal_state(&self) {
        let mut slots = self.shared.goal.lock();
        if slots.generation == self.goal_generation && slots.state.is_some() {
            slots.state = Some(self.goal_state);
        }
    }

    fn set_motion(&self, speed: f64, angular: f64) {
        let mut m = self.shared.motion.lock();
        m.speed = speed;
        m.angular = angular;
        m.pending = true;
    }

    fn set_action1(&self, action1: bool) {
        let mut m = self.shared.motion.lock();
        m.action1 = action1;
        m.pending = true;
    }

    fn set_action2(&self, action2: bool) {
        let mut m = self.shared.motion.lock();
        m.action2 = action2;
        m.pending = true;
    }

    fn motion(&self) -> MotionOutput {
        *self.shared.motion.lock()
    }

    fn add_log_message(&self, message: impl Into<String>) {
        let message = message.into();
        info!("Controller message: {}", message);
        self.shared.logs.push(message);
    }

    fn start_animation(&mut self, animation: Arc<Animation>) {
        debug!("Starting animation {}", animation.name());
        self.animation = Some(animation);
        self.animation_wait_until = None;
        self.animation_step = 0;
        self.set_motion(0.0, 0.0);
        self.set_action1(false);
        self.set_action2(false);
    }

    fn process_animation(&mut self, now_ms: u64) {
        let Some(animation) = self.animation.clone() else {
            return;
        };
        let commands = animation.commands();
        while let Some(command) = commands.get(self.animation_step) {
            match command {
                AnimationCommand::SetMotor { linear, angular } => self.set_motion(*linear, *angular),
                AnimationCommand::Wait { millis } => {
                    let deadline = *self
                        .animation_wait_until
                        .get_or_insert(now_ms.saturating_add(*millis));
                    if deadline > now_ms {
                        // 保持控制器来源新鲜
                        self.shared.motion.lock().pending = true;
                        return;
                    }
                    self.animation_wait_until = None;
                }
                AnimationCommand::PlayAudio { name } => self.shared.sounds.push(name.clone()),
            }
            self.animation_step += 1;
        }
        debug!("Animation {} finished", animation.name());
        self.animation = None;
        self.set_motion(0.0, 0.0);
    }

    fn is_blocked_depth(&mut self, cycle: &Cycle) -> bool {
        if let Some(blocked) = self.blocked_cache {
            return blocked;
        }
        let blockers = blocked::count_blockers(
            &cycle.point_cloud,
            &cycle.depth_location,
            &cycle.location,
            &cycle.model,
            &self.config.blocked,
            &mut self.point_colors,
        );
        self.point_colors_valid = true;
        trace!("Depth check found {} blocker(s)", blockers);

        let blocked = blockers > self.config.blocked.point_threshold;
        if blocked && !self.was_blocked {
            self.was_blocked = true;
            self.add_log_message(ROBOT_BLOCKED_POINTS);
        } else if !blocked && self.was_blocked {
            self.was_blocked = false;
            self.add_log_message(ROBOT_UNBLOCKED_POINTS);
        }
        self.blocked_cache = Some(blocked);
        blocked
    }
}

// ==================== 行为接口 ====================

/// 每种机器人行为实现的能力接口
pub trait RobotBehavior: Send {
    /// 载入新世界时调用（在同一周期的 `on_update` 之前）
    fn on_new_world(&mut self, _ctx: &mut ControllerContext<'_>) {}

    /// 没有动画播放时每周期调用
    fn on_update(&mut self, ctx: &mut ControllerContext<'_>);

    /// 计划路径，用于显示
    fn path(&self) -> Vec<Transform> {
        Vec::new()
    }

    /// 最近一次拒绝目标的原因
    fn goal_rejection_reason(&self) -> Option<&str> {
        None
    }
}

/// 行为在一个周期内可用的控制器能力
pub struct ControllerContext<'a> {
    state: &'a mut ControllerState,
    cycle: &'a Cycle,
}

impl ControllerContext<'_> {
    /// 周期开始时刻（毫秒）
    pub fn now_ms(&self) -> u64 {
        self.cycle.now_ms
    }

    pub fn world(&self) -> &WorldHandle {
        &self.cycle.world
    }

    pub fn location(&self) -> &Transform {
        &self.cycle.location
    }

    pub fn model(&self) -> &RobotModel {
        &self.cycle.model
    }

    pub fn device_location(&self) -> Option<&Transform> {
        self.cycle.device_location.as_ref()
    }

    pub fn depth_location(&self) -> &Transform {
        &self.cycle.depth_location
    }

    pub fn point_cloud(&self) -> &PointCloud {
        &self.cycle.point_cloud
    }

    pub fn goal_max_distance(&self) -> f64 {
        self.cycle.goal_max_distance
    }

    pub fn goal_timeout_sec(&self) -> f64 {
        self.cycle.goal_timeout_sec
    }

    // ==================== 目标 ====================

    pub fn current_goal_point(&self) -> Option<&GoalPoint> {
        self.state.goal.as_ref()
    }

    pub fn current_goal_point_state(&self) -> GoalPointState {
        self.state.goal_state
    }

    pub fn set_current_goal_point_state(&mut self, state: GoalPointState) {
        self.state.goal_state = state;
    }

    pub(crate) fn action_start_ms(&self) -> u64 {
        self.state.action_start_ms
    }

    pub(crate) fn set_action_start_ms(&mut self, ms: u64) {
        self.state.action_start_ms = ms;
    }

    // ==================== 输出 ====================

    pub fn set_motion(&mut self, speed: f64, angular: f64) {
        self.state.set_motion(speed, angular);
    }

    pub fn set_action1(&mut self, action1: bool) {
        self.state.set_action1(action1);
    }

    pub fn set_action2(&mut self, action2: bool) {
        self.state.set_action2(action2);
    }

    pub fn speed(&self) -> f64 {
        self.state.motion().speed
    }

    pub fn angular(&self) -> f64 {
        self.state.motion().angular
    }

    pub fn add_log_message(&mut self, message: impl Into<String>) {
        self.state.add_log_message(message);
    }

    // ==================== 运动与感知 ====================

    /// 上一次直线前进后是否被行为标记为阻挡
    pub fn robot_is_blocked(&self) -> bool {
        self.state.robot_is_blocked
    }

    pub fn set_robot_is_blocked(&mut self, blocked: bool) {
        self.state.robot_is_blocked = blocked;
    }

    /// 朝目标驱动，不考虑障碍物
    ///
    /// # 返回
    /// 位置（以及需要时的朝向）到达时返回 `true`
    pub fn drive_to_location(
        &mut self,
        target: &Transform,
        match_rotation: bool,
        avoid_action: bool,
    ) -> bool {
        let step = drive::plan_drive(
            &self.cycle.location,
            target,
            match_rotation,
            avoid_action,
            self.cycle.model.max_speed(),
            self.speed(),
            &self.state.config.speed_limits,
        );
        match step {
            DriveStep::Reached => return true,
            DriveStep::Align { angular } | DriveStep::Rotate { angular } => {
                self.set_motion(0.0, angular);
            }
            DriveStep::Forward { linear, angular } => {
                self.state.robot_is_blocked = false;
                trace!("Linear motion. Speed: {}", linear);
                self.set_motion(linear, angular);
            }
        }
        false
    }

    /// 深度点云是否挡住前进通道，同一周期内只计算一次
    pub fn is_blocked_depth(&mut self) -> bool {
        self.state.is_blocked_depth(self.cycle)
    }
}

// ==================== 控制器 ====================

/// 控制器：公共算法 + 一种机器人行为
pub struct Controller<B: RobotBehavior> {
    state: ControllerState,
    behavior: B,
    clock: SharedClock,
    last_cycle: Option<Cycle>,
}

impl<B: RobotBehavior> Controller<B> {
    pub fn new(behavior: B, config: ControllerConfig, clock: SharedClock) -> Self {
        Self {
            state: ControllerState::new(config),
            behavior,
            clock,
            last_cycle: None,
        }
    }

    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            shared: self.state.shared.clone(),
        }
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }

    /// 执行一个控制周期
    ///
    /// # 错误
    /// 必需输入缺失时返回 [`ControlError::MissingInput`]，不做任何状态修改。
    pub fn update(&mut self, inputs: CycleInputs) -> Result<(), ControlError> {
        let cycle = inputs.validate(self.clock.now_ms())?;
        let state = &mut self.state;
        state.point_colors_valid = false;
        state.blocked_cache = None;

        state.sync_goal();

        if state.shared.cancel_animation.swap(false, Ordering::AcqRel) {
            state.animation = None;
        }
        let next = state.shared.next_animation.lock().take();
        if let Some(next) = next {
            state.start_animation(next);
        }

        if state.animation.is_none() {
            let new_world = !state
                .world
                .as_ref()
                .is_some_and(|w| w.same_world(&cycle.world));
            state.world = Some(cycle.world.clone());
            let mut ctx = ControllerContext {
                state,
                cycle: &cycle,
            };
            if new_world {
                info!("New world {}", cycle.world.name());
                ctx.state.was_blocked = false;
                self.behavior.on_new_world(&mut ctx);
            }
            self.behavior.on_update(&mut ctx);
        } else {
            state.process_animation(cycle.now_ms);
        }

        self.state.publish_goal_state();
        *self.state.shared.playing.lock() = self.state.animation.clone();
        self.last_cycle = Some(cycle);
        Ok(())
    }

    /// 基于最近一个周期的输入判断是否被挡（尚未运行任何周期时为 false）
    pub fn is_blocked_depth(&mut self) -> bool {
        match &self.last_cycle {
            Some(cycle) => self.state.is_blocked_depth(cycle),
            None => false,
        }
    }

    pub fn speed(&self) -> f64 {
        self.state.motion().speed
    }

    pub fn angular(&self) -> f64 {
        self.state.motion().angular
    }

    pub fn action1(&self) -> bool {
        self.state.motion().action1
    }

    pub fn action2(&self) -> bool {
        self.state.motion().action2
    }

    /// 最近一次阻挡检测写入的点颜色
    pub fn point_colors(&self) -> &[u32] {
        &self.state.point_colors
    }

    /// 本周期是否运行过阻挡检测（颜色有效）
    pub fn point_colors_valid(&self) -> bool {
        self.state.point_colors_valid
    }

    pub fn animation(&self) -> Option<&Arc<Animation>> {
        self.state.animation.as_ref()
    }

    pub fn current_goal_point(&self) -> Option<&GoalPoint> {
        self.state.goal.as_ref()
    }

    pub fn goal_point_state(&self) -> GoalPointState {
        self.state.goal_state
    }

    pub fn path(&self) -> Vec<Transform> {
        self.behavior.path()
    }

    pub fn goal_rejection_reason(&self) -> Option<&str> {
        self.behavior.goal_rejection_reason()
    }
}
