//! 固定频率控制循环
//!
//! 一个专用控制线程按固定频率运行 [`RobotRunner::run_cycle`]，每周期的顺序为：
//!
//! 1. 读取最新的传感器插槽，把设备位姿换算为底盘位姿
//! 2. 输入齐全且允许运动时更新控制器，把控制器输出交给遥操作仲裁
//! 3. 安全控制器读取保险杠，ROS / 云端命令进入仲裁
//! 4. 仲裁结果写入驱动（禁止运动时写零），转发声音
//! 5. 更新驱动，检测驱动状态与机器人标识变化
//! 6. 推进状态迁移，处理命令队列，发布状态快照
//!
//! 周期之间睡到截止时间：慢周期推迟下一个周期，但不会累积漂移，也不补跑。

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::handle::{RunnerCommand, RunnerHandle, RunnerShared};
use crate::monitor::{LogSink, Monitor, RunnerErrorKind, SoundSink};
use crate::state::{RunnerState, RunnerStatus};
use crossbeam_channel::{Receiver, Sender, unbounded};
use robotside_control::{
    Controller, CycleInputs, RobotBehavior, SafetyController, TeleopMultiplexer,
};
use robotside_core::{BumperId, SharedClock, Transform, WorldHandle};
use robotside_driver::{DriverEvent, DriverFault, RobotDriver, RobotDriverMultiplex};
use spin_sleep::SpinSleeper;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// 标定时原地旋转的角速度（驱动按型号最大角速度限幅）
pub const CALIBRATION_ANGULAR_SPEED: f64 = 60.0 * std::f64::consts::PI;

pub const MSG_BUMPER_ACTIVATED: &str = "Bumper activated";
pub const MSG_CONTROLLER_UNAVAILABLE: &str = "Controller is unavailable: no robot model";
pub const MSG_NEW_ROBOT_CONNECTED: &str = "New robot connected";
pub const MSG_ROBOT_DISCONNECTED: &str = "Robot disconnected";

/// 跨周期完成的状态迁移
#[derive(Debug)]
enum Transition {
    /// `CommandExec` 之后启动建图（`None`）或导航
    Start(Option<WorldHandle>),
    /// `Stopping` / `SavedWorld` 之后回到 `WaitForCommand`
    Restart,
    /// `SavingWorld` 之后进入 `SavedWorld`
    Save(String),
}

#[derive(Debug, Clone, Copy)]
struct Calibration {
    start_ms: u64,
}

/// 机器人运行器
pub struct RobotRunner<B: RobotBehavior> {
    config: RunnerConfig,
    clock: SharedClock,

    controller: Controller<B>,
    safety: SafetyController,
    teleop: TeleopMultiplexer,
    driver: RobotDriverMultiplex,

    shared: Arc<RunnerShared>,
    handle: RunnerHandle,
    commands: Receiver<RunnerCommand>,
    driver_events_tx: Sender<DriverEvent>,
    driver_events: Receiver<DriverEvent>,

    monitors: Vec<Box<dyn Monitor>>,
    sound_sink: Option<Box<dyn SoundSink>>,
    log_sink: Option<Box<dyn LogSink>>,

    initialized: bool,
    cycle: u64,
    localized: bool,
    robot_blocked: bool,
    driver_state: Option<String>,
    robot_uuid: Option<String>,
    robot_version: Option<String>,
    calibration: Option<Calibration>,
    calibrated_height: Option<f64>,
    transition: Option<Transition>,
    /// 停止当前操作后再执行的命令
    deferred: Option<RunnerCommand>,
    /// 本周期有可见变化，周期末通知监视器
    dirty: bool,
}

impl<B: RobotBehavior> RobotRunner<B> {
    /// 创建运行器
    ///
    /// # 参数
    /// - `behavior`: 控制器的机器人行为
    /// - `drivers`: 按优先级排列的驱动后端，不能为空
    /// - `config`: 运行器配置
    /// - `clock`: 控制器、安全控制器和遥操作仲裁共用的时钟
    ///
    /// # 错误
    /// - `RunnerError::Config`: 配置检查失败
    /// - `RunnerError::Driver`: 驱动列表为空
    pub fn new(
        behavior: B,
        drivers: Vec<Box<dyn RobotDriver>>,
        config: RunnerConfig,
        clock: SharedClock,
    ) -> Result<Self, RunnerError> {
        config.validate()?;
        let driver = RobotDriverMultiplex::new(drivers)?;
        let teleop = TeleopMultiplexer::with_timeout(config.teleop.timeout_ms, clock.clone())?;
        let mut safety = SafetyController::new(clock.clone());
        safety.set_simple_bumper_behavior(config.safety.simple_bumper_behavior);
        let controller = Controller::new(behavior, config.controller_config(), clock.clone());

        let (commands_tx, commands) = unbounded();
        let (driver_events_tx, driver_events) = unbounded();
        let shared = Arc::new(RunnerShared::default());
        let handle = RunnerHandle {
            commands: commands_tx,
            shared: shared.clone(),
            controller: controller.handle(),
        };

        Ok(Self {
            config,
            clock,
            controller,
            safety,
            teleop,
            driver,
            shared,
            handle,
            commands,
            driver_events_tx,
            driver_events,
            monitors: Vec::new(),
            sound_sink: None,
            log_sink: None,
            initialized: false,
            cycle: 0,
            localized: false,
            robot_blocked: false,
            driver_state: None,
            robot_uuid: None,
            robot_version: None,
            calibration: None,
            calibrated_height: None,
            transition: None,
            deferred: None,
            dirty: false,
        })
    }

    pub fn handle(&self) -> RunnerHandle {
        self.handle.clone()
    }

    pub fn add_monitor(&mut self, monitor: Box<dyn Monitor>) {
        self.monitors.push(monitor);
    }

    pub fn set_sound_sink(&mut self, sink: Box<dyn SoundSink>) {
        self.sound_sink = Some(sink);
    }

    pub fn set_log_sink(&mut self, sink: Box<dyn LogSink>) {
        self.log_sink = Some(sink);
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn controller(&self) -> &Controller<B> {
        &self.controller
    }

    pub fn safety(&self) -> &SafetyController {
        &self.safety
    }

    pub fn driver(&self) -> &RobotDriverMultiplex {
        &self.driver
    }

    pub fn state(&self) -> RunnerState {
        *self.shared.state.lock()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// 标定得到的设备离地高度
    pub fn calibrated_height(&self) -> Option<f64> {
        self.calibrated_height
    }

    // ==================== 控制循环 ====================

    /// 运行到关闭、达到最大周期数或契约被破坏
    ///
    /// # 错误
    /// 控制器输入契约被破坏时返回 [`RunnerError::Contract`]，循环不再继续。
    pub fn run(&mut self) -> Result<(), RunnerError> {
        #[cfg(feature = "realtime")]
        {
            use thread_priority::*;

            match set_current_thread_priority(ThreadPriority::Max) {
                Ok(_) => info!("Runner thread priority set to MAX (realtime)"),
                Err(e) => warn!(
                    "Failed to set runner thread priority: {:?}. \
                    On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                    e
                ),
            }
        }

        let period = self.config.runner.period();
        let max_iterations = self.config.runner.max_iterations;
        let sleeper = SpinSleeper::default();
        info!(
            "Runner loop started at {:.1} Hz",
            self.config.runner.frequency_hz
        );

        let result = loop {
            if self.state() == RunnerState::Shutdown {
                break Ok(());
            }
            let started = Instant::now();
            if let Err(e) = self.run_cycle() {
                error!("Runner loop terminated: {}", e);
                break Err(e);
            }
            if max_iterations.is_some_and(|max| self.cycle >= max) {
                info!("Reached {} cycles", self.cycle);
                break Ok(());
            }
            let elapsed = started.elapsed();
            if elapsed < period {
                sleeper.sleep(period - elapsed);
            } else {
                trace!("Cycle {} overran by {:?}", self.cycle, elapsed - period);
            }
        };

        self.finish();
        result
    }

    /// 在专用线程上运行
    pub fn spawn(self) -> Result<RunnerThread, RunnerError>
    where
        B: 'static,
    {
        let handle = self.handle();
        let mut runner = self;
        let join = thread::Builder::new()
            .name("robotside-runner".to_string())
            .spawn(move || runner.run())
            .map_err(RunnerError::ThreadSpawn)?;
        Ok(RunnerThread {
            handle,
            join: Some(join),
        })
    }

    /// 执行一个控制周期
    pub fn run_cycle(&mut self) -> Result<(), RunnerError> {
        self.ensure_initialized();
        self.cycle += 1;
        let now = self.clock.now_ms();
        let state = self.state();
        let motion_enabled = self.shared.motion_enabled.load(Ordering::Acquire);

        self.apply_device_height();

        let (location, depth) = if state.accepts_sensor_data() {
            (
                self.shared.slots.device_pose(),
                self.shared.slots.depth(),
            )
        } else {
            (None, None)
        };
        self.set_localized(location.is_some());
        let location_base = location.and_then(|l| self.driver.device_to_base(&l));
        let world = self.shared.world.load_full();

        if let (Some(location), Some(base), Some(depth), Some(world)) =
            (location, location_base, depth, world)
            && motion_enabled
        {
            match self.driver.model() {
                Some(model) => {
                    let inputs = CycleInputs {
                        world: Some(world.as_ref().clone()),
                        location: Some(base),
                        model: Some(model),
                        device_location: Some(location),
                        depth_location: Some(depth.depth_location),
                        point_cloud: Some(depth.cloud.clone()),
                        goal_max_distance: self.config.runner.goal_max_distance,
                        goal_timeout_sec: self.config.runner.goal_timeout_sec,
                    };
                    self.update_controller(inputs)?;
                }
                None => self.log_status(MSG_CONTROLLER_UNAVAILABLE),
            }
        } else if self.localized {
            trace!("Localized but controller inputs are incomplete");
        }

        let bumper = self.driver.bumper();
        if self
            .teleop
            .update_from_safety_controller(&mut self.safety, bumper)
        {
            self.dirty = true;
        }

        if let Some(teleop) = self.shared.slots.ros_teleop() {
            self.teleop.update_from_ros(teleop);
        }
        let model = self.driver.model();
        self.teleop
            .update_from_cloud(self.shared.slots.cloud_teleop(), model.as_deref());

        let calibrating = self.step_calibration(now);
        if calibrating && !self.safety.is_bumped() {
            self.driver.set_motion(0.0, CALIBRATION_ANGULAR_SPEED);
            self.driver.set_action1(false);
            self.driver.set_action2(false);
        } else if motion_enabled {
            if self.teleop.update_driver(&self.driver) {
                self.dirty = true;
            }
        } else {
            self.driver.set_motion(0.0, 0.0);
            self.driver.set_action1(false);
            self.driver.set_action2(false);
        }

        let sounds = self.handle.controller.get_and_clear_sounds();
        if let Some(sink) = self.sound_sink.as_mut() {
            for sound in &sounds {
                sink.play_sound(sound);
            }
        }

        self.driver.update();
        self.drain_driver_events();
        self.detect_driver_changes();

        self.advance_transition();
        self.process_commands(now);

        self.publish_status();
        Ok(())
    }

    fn ensure_initialized(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        self.driver.init(self.driver_events_tx.clone());
        info!("Runner initialized with {} driver(s)", self.driver.len());
        self.set_state(RunnerState::WaitForCommand);
    }

    fn update_controller(&mut self, inputs: CycleInputs) -> Result<(), RunnerError> {
        debug!("Start controller");
        if let Err(e) = self.controller.update(inputs) {
            let context = e.to_string();
            self.report_error(RunnerErrorKind::ContractViolation, Some(&context));
            return Err(e.into());
        }
        self.teleop.update_from_controller(&self.handle.controller);

        if self.driver.bumper() != BumperId::None {
            self.log_status(MSG_BUMPER_ACTIVATED);
        }

        let blocked = self.controller.is_blocked_depth();
        if blocked != self.robot_blocked {
            self.robot_blocked = blocked;
            self.dirty = true;
        }

        for message in self.handle.controller.get_and_clear_log_messages() {
            self.log_status(&message);
        }
        debug!("Done controller");
        Ok(())
    }

    /// 元数据中的高度优先，其次是标定结果；都没有时使用型号默认值
    fn apply_device_height(&mut self) {
        match self.shared.slots.device_height_metadata() {
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(height) => self.driver.set_device_height(height, true),
                Err(_) => {
                    warn!("Invalid robot height: {}", raw);
                    self.driver.set_device_height(0.0, false);
                }
            },
            None => match self.calibrated_height {
                Some(height) => self.driver.set_device_height(height, true),
                None => self.driver.set_device_height(0.0, false),
            },
        }
    }

    /// 标定是否仍在进行；到时则取测量平均值并回到 `WaitForCommand`
    fn step_calibration(&mut self, now: u64) -> bool {
        let Some(calibration) = self.calibration else {
            return false;
        };
        if now.saturating_sub(calibration.start_ms) < self.config.runner.calibration_duration_ms {
            trace!("Turning around for calibration");
            return true;
        }

        self.calibration = None;
        let measurements = self.shared.slots.take_floor_measurements();
        if measurements.is_empty() {
            warn!("Calibration finished without floor measurements");
        } else {
            let height = measurements.iter().sum::<f64>() / measurements.len() as f64;
            info!(
                "Mean device height: {:.2} ({} samples)",
                height,
                measurements.len()
            );
            self.calibrated_height = Some(height);
        }
        self.driver.set_motion(0.0, 0.0);
        self.shared.slots.clear_localization();
        self.set_state(RunnerState::WaitForCommand);
        false
    }

    fn drain_driver_events(&mut self) {
        while let Ok(event) = self.driver_events.try_recv() {
            match event {
                DriverEvent::Fault {
                    driver,
                    fault,
                    context,
                } => {
                    let kind = match fault {
                        DriverFault::Invalid => RunnerErrorKind::DriverInvalid,
                        DriverFault::Error => RunnerErrorKind::DriverError,
                    };
                    let context = match context {
                        Some(c) => format!("{}: {}", driver, c),
                        None => driver,
                    };
                    self.report_error(kind, Some(&context));
                }
                DriverEvent::StateChanged { driver } => {
                    debug!("Driver {} state changed", driver);
                    self.dirty = true;
                }
            }
        }
    }

    fn detect_driver_changes(&mut self) {
        let driver_state = self.driver.state_string();
        if driver_state != self.driver_state {
            self.driver_state = driver_state;
            self.dirty = true;
        }

        let new_uuid = self.driver.uuid();
        let old_uuid = std::mem::replace(&mut self.robot_uuid, new_uuid.clone());
        let old_version = std::mem::replace(&mut self.robot_version, self.driver.version_string());
        match (new_uuid, old_uuid) {
            (Some(uuid), old) if old.as_ref() != Some(&uuid) => {
                info!("New robot connected: {}", uuid);
                // 新机器人不执行上一台留下的目标
                self.handle.controller.cancel_goal();
                self.log_status(MSG_NEW_ROBOT_CONNECTED);
                self.dirty = true;
            }
            (None, Some(old)) => {
                info!(
                    "Robot disconnected: {} ({})",
                    old,
                    old_version.as_deref().unwrap_or("unknown version")
                );
                if let Some(sink) = self.log_sink.as_mut() {
                    sink.log_status(Some(&old), MSG_ROBOT_DISCONNECTED);
                }
                self.dirty = true;
            }
            _ => {}
        }
    }

    // ==================== 状态迁移 ====================

    fn advance_transition(&mut self) {
        let Some(transition) = self.transition.take() else {
            return;
        };
        match (self.state(), transition) {
            (RunnerState::CommandExec, Transition::Start(world)) => self.start_system(world),
            (RunnerState::Stopping | RunnerState::SavedWorld, Transition::Restart) => {
                self.restart();
                if let Some(command) = self.deferred.take() {
                    let now = self.clock.now_ms();
                    self.handle_command(command, now);
                }
            }
            (RunnerState::SavingWorld, Transition::Save(name)) => {
                info!("Saved map {}", name);
                self.set_state(RunnerState::SavedWorld);
                self.transition = Some(Transition::Restart);
            }
            (state, transition) => {
                debug!("Dropping {:?} in state {}", transition, state);
            }
        }
    }

    fn start_system(&mut self, world: Option<WorldHandle>) {
        self.shared.slots.clear_localization();
        match world {
            Some(world) => {
                if world.distance_to_known_point(&Transform::identity()).is_none() {
                    error!("Attempted to start on an invalid world {}", world.name());
                    self.report_error(
                        RunnerErrorKind::StartupError,
                        Some("Attempted to start on an invalid world"),
                    );
                    self.restart();
                    return;
                }
                info!("Starting navigation on {}", world.name());
                self.shared.world.store(Some(Arc::new(world)));
                self.set_state(RunnerState::RunningNavigation);
            }
            None => {
                info!("Starting mapping");
                self.shared.world.store(None);
                self.set_state(RunnerState::RunningMapping);
            }
        }
    }

    /// 停止建图或导航，回到 `WaitForCommand`
    fn restart(&mut self) {
        info!("Restarting runner");
        self.shared.world.store(None);
        self.shared.slots.clear_localization();
        self.set_localized(false);
        self.calibration = None;
        self.driver.set_action1(false);
        self.driver.set_action2(false);
        self.set_state(RunnerState::WaitForCommand);
    }

    fn process_commands(&mut self, now: u64) {
        while let Ok(command) = self.commands.try_recv() {
            self.handle_command(command, now);
        }
    }

    fn handle_command(&mut self, command: RunnerCommand, now: u64) {
        let state = self.state();
        match command {
            RunnerCommand::StartMapping | RunnerCommand::StartOperation(_)
                if state == RunnerState::WaitForCommand =>
            {
                let world = match command {
                    RunnerCommand::StartOperation(world) => Some(world),
                    _ => None,
                };
                self.set_state(RunnerState::CommandExec);
                self.transition = Some(Transition::Start(world));
            }
            RunnerCommand::StartMapping | RunnerCommand::StartOperation(_)
                if state.is_running() || state.is_mapping() =>
            {
                info!("Stopping {} before starting a new operation", state);
                self.set_state(RunnerState::Stopping);
                self.transition = Some(Transition::Restart);
                self.deferred = Some(command);
            }
            RunnerCommand::StopOperations
                if state.is_running()
                    || state.is_mapping()
                    || state == RunnerState::Calibration =>
            {
                self.calibration = None;
                self.set_state(RunnerState::Stopping);
                self.transition = Some(Transition::Restart);
            }
            RunnerCommand::Calibrate if state == RunnerState::WaitForCommand => {
                info!("Perform robot calibration");
                self.shared.slots.take_floor_measurements();
                self.calibration = Some(Calibration { start_ms: now });
                self.set_state(RunnerState::Calibration);
            }
            RunnerCommand::SaveWorld(name) if state.is_mapping() && self.localized => {
                info!("Saving world {}", name);
                self.set_state(RunnerState::SavingWorld);
                self.transition = Some(Transition::Save(name));
            }
            RunnerCommand::SaveWorld(name) => {
                error!("The map {} could not be made in state {}", name, state);
            }
            RunnerCommand::SetMaxSpeedPercentage(percentage) => {
                info!("Max speed set to {:.0}%", percentage);
                self.driver.set_max_speed_percentage(percentage);
            }
            RunnerCommand::Shutdown => {
                info!("Shutdown requested");
                self.set_state(RunnerState::Shutdown);
            }
            other => warn!("Ignoring {:?} in state {}", other, state),
        }
    }

    /// 停车、关闭驱动并发布最终状态
    fn finish(&mut self) {
        self.driver.set_motion(0.0, 0.0);
        self.driver.set_action1(false);
        self.driver.set_action2(false);
        self.driver.update();
        self.driver.shutdown();
        self.set_state(RunnerState::Shutdown);
        self.publish_status();
        info!("Runner stopped after {} cycles", self.cycle);
    }

    // ==================== 状态与通知 ====================

    fn set_state(&mut self, state: RunnerState) {
        let mut current = self.shared.state.lock();
        if *current != state {
            info!("Runner state {} -> {}", *current, state);
            *current = state;
            self.dirty = true;
        }
    }

    fn set_localized(&mut self, localized: bool) {
        if self.localized != localized {
            debug!("Localized: {}", localized);
            self.localized = localized;
            self.dirty = true;
        }
    }

    fn report_error(&mut self, kind: RunnerErrorKind, context: Option<&str>) {
        error!("{}: {}", kind, context.unwrap_or(""));
        for monitor in &mut self.monitors {
            monitor.report_error(kind, context);
        }
    }

    fn log_status(&mut self, message: &str) {
        if let Some(sink) = self.log_sink.as_mut() {
            sink.log_status(self.robot_uuid.as_deref(), message);
        }
    }

    fn publish_status(&mut self) {
        let status = RunnerStatus {
            state: self.state(),
            cycle: self.cycle,
            localized: self.localized,
            robot_connected: self.driver.is_connected(),
            robot_blocked: self.robot_blocked,
            bumper_maneuver: self.safety.bumper_maneuver(),
            speed: self.driver.speed(),
            angular: self.driver.angular(),
            action1: self.driver.action1(),
            action2: self.driver.action2(),
            driver_state: self.driver_state.clone(),
            robot_uuid: self.robot_uuid.clone(),
            robot_version: self.robot_version.clone(),
            world: self
                .shared
                .world
                .load_full()
                .map(|w| w.name().to_string()),
            battery_low: self.driver.battery_low_debounced(),
            battery_critical: self.driver.battery_critical_debounced(),
        };
        self.shared.status.store(Arc::new(status));

        if std::mem::take(&mut self.dirty) {
            for monitor in &mut self.monitors {
                monitor.on_state_update();
            }
        }
    }
}

/// 在专用线程上运行的运行器
///
/// 丢弃时请求关闭并等待线程退出。
pub struct RunnerThread {
    handle: RunnerHandle,
    join: Option<JoinHandle<Result<(), RunnerError>>>,
}

impl RunnerThread {
    pub fn handle(&self) -> &RunnerHandle {
        &self.handle
    }

    /// 请求关闭并等待控制线程退出
    pub fn shutdown(mut self) -> Result<(), RunnerError> {
        // 循环可能已因契约错误退出，通道关闭不算失败
        let _ = self.handle.shutdown();
        self.join_inner()
    }

    /// 等待控制线程自行退出（达到最大周期数或被其它句柄关闭）
    pub fn join(mut self) -> Result<(), RunnerError> {
        self.join_inner()
    }

    fn join_inner(&mut self) -> Result<(), RunnerError> {
        match self.join.take() {
            Some(join) => join.join().map_err(|_| RunnerError::ThreadPanicked)?,
            None => Ok(()),
        }
    }
}

impl Drop for RunnerThread {
    fn drop(&mut self) {
        if self.join.is_some() {
            let _ = self.handle.shutdown();
            if let Err(e) = self.join_inner() {
                error!("Runner thread exited with error: {}", e);
            }
        }
    }
}
