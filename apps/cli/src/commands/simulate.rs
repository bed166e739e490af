//! 仿真命令
//!
//! 在 Mock 驱动和手动时钟上逐周期运行完整的控制循环：启动导航、发布目标点，
//! 用驱动实际收到的速度积分底盘位姿，再把设备位姿喂回传感器插槽。

use crate::commands::config::load_config;
use crate::sim::PlanarSim;
use crate::sinks::{LogOutput, StatusPrinter};
use anyhow::{Context, Result, anyhow};
use clap::{Args, ValueEnum};
use robotside_control::GoalPursuitBehavior;
use robotside_core::{
    AnimationSet, BumperId, Clock, GoalPoint, GoalPointAction, ManualClock, PointCloud, PointMapWorld,
    Transform, WorldHandle,
};
use robotside_driver::{MockDriver, RobotDriver};
use robotside_runner::{RobotRunner, RunnerState};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// 到达目标后的动作
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionArg {
    None,
    Align,
    Vacuum,
}

impl From<ActionArg> for GoalPointAction {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::None => GoalPointAction::NoAction,
            ActionArg::Align => GoalPointAction::AlignRotation,
            ActionArg::Vacuum => GoalPointAction::VacuumSpiral,
        }
    }
}

/// 仿真命令参数
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// 运行器配置文件
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 最多运行的周期数
    #[arg(long, default_value_t = 300)]
    pub cycles: u64,

    /// 目标点 "x,y"（米）
    #[arg(long, value_parser = parse_point, default_value = "2.0,0.0")]
    pub goal: (f64, f64),

    /// 到达后的动作
    #[arg(long, value_enum, default_value_t = ActionArg::None)]
    pub action: ActionArg,

    /// 在第 N 个周期按下左中保险杠
    #[arg(long)]
    pub bump_at: Option<u64>,

    /// 开始导航时播放的动画：脚本文件和动画名
    #[arg(long, num_args = 2, value_names = ["FILE", "NAME"])]
    pub animation: Option<Vec<String>>,

    /// 状态变化时输出 JSON 行
    #[arg(long)]
    pub json: bool,
}

/// 解析 "x,y"
pub fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{}'", s))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("x: {}", e))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("y: {}", e))?;
    if !(x.is_finite() && y.is_finite()) {
        return Err("coordinates must be finite".to_string());
    }
    Ok((x, y))
}

/// 从原点到目标每 0.5m 一个已知点
fn waypoints(goal: (f64, f64)) -> Vec<Transform> {
    let distance = goal.0.hypot(goal.1);
    let steps = (distance / 0.5).ceil().max(1.0) as usize;
    (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            Transform::from_xyz_yaw(goal.0 * t, goal.1 * t, 0.0, 0.0, 0.0)
        })
        .collect()
}

/// 仿真结束时的结果
#[derive(Debug)]
pub struct SimulationOutcome {
    pub cycles: u64,
    pub pose: PlanarSim,
    pub goal_state: Option<robotside_core::GoalPointState>,
    pub rejection_reason: Option<String>,
}

impl SimulateCommand {
    pub fn execute(&self, running: Arc<AtomicBool>) -> Result<()> {
        let outcome = self.run(running)?;
        println!(
            "Finished after {} cycles at ({:.2}, {:.2}) heading {:.2} rad, goal {:?}",
            outcome.cycles, outcome.pose.x, outcome.pose.y, outcome.pose.yaw, outcome.goal_state
        );
        if let Some(reason) = outcome.rejection_reason {
            println!("Rejected: {}", reason);
        }
        Ok(())
    }

    pub fn run(&self, running: Arc<AtomicBool>) -> Result<SimulationOutcome> {
        let config = load_config(self.config.as_deref())?;
        let period = config.runner.period();
        let step_ms = period.as_millis().max(1) as u64;
        let dt = step_ms as f64 / 1000.0;

        let animation = match &self.animation {
            Some(args) => {
                let [file, name] = args.as_slice() else {
                    return Err(anyhow!("--animation takes FILE NAME"));
                };
                let set = AnimationSet::load(file)
                    .with_context(|| format!("failed to parse {}", file))?;
                let animation = set
                    .get(name)
                    .cloned()
                    .ok_or_else(|| anyhow!("no animation named {} in {}", name, file))?;
                Some(Arc::new(animation))
            },
            None => None,
        };

        let clock = ManualClock::new(0);
        let model = MockDriver::default_model();
        let mut sim = PlanarSim::new(model.device_z());
        let (driver, mock) = MockDriver::new("sim", model);
        let drivers: Vec<Box<dyn RobotDriver>> = vec![Box::new(driver)];
        let mut runner =
            RobotRunner::new(GoalPursuitBehavior::new(), drivers, config, clock.clone())?;
        let handle = runner.handle();
        runner.add_monitor(Box::new(StatusPrinter::new(handle.clone(), self.json)));
        runner.set_sound_sink(Box::new(LogOutput));
        runner.set_log_sink(Box::new(LogOutput));

        let world = WorldHandle::new(PointMapWorld::new(
            "sim-world",
            "simulation",
            waypoints(self.goal),
        ));
        handle.start_operation(world)?;
        let goal = GoalPoint::new(
            Transform::from_xyz_yaw(self.goal.0, self.goal.1, 0.0, 0.0, 0.0),
            self.action.into(),
        );
        info!(
            "Simulating {} cycles at {:.1} Hz toward ({:.2}, {:.2})",
            self.cycles,
            runner.config().runner.frequency_hz,
            self.goal.0,
            self.goal.1
        );

        let mut goal_sent = false;
        while runner.cycle() < self.cycles {
            if !running.load(Ordering::SeqCst) {
                warn!("Interrupted");
                break;
            }

            if handle.state() == RunnerState::RunningNavigation {
                let timestamp = clock.now_ms() as f64 / 1000.0;
                let device = sim.device_pose(timestamp);
                handle.slots().submit_device_pose(device);
                handle
                    .slots()
                    .submit_depth(Arc::new(PointCloud::default()), device);
                if !goal_sent {
                    handle.controller().set_goal_point(goal.clone());
                    if let Some(animation) = &animation {
                        handle.controller().set_animation(animation.clone());
                    }
                    goal_sent = true;
                }
            }

            let bumper = if self.bump_at == Some(runner.cycle() + 1) {
                BumperId::CenterLeft
            } else {
                BumperId::None
            };
            mock.set_bumper(bumper);

            runner.run_cycle()?;
            if let Some(sent) = mock.last_sent() {
                sim.step(sent.speed, sent.angular, dt);
            }
            clock.advance_ms(step_ms);

            if goal_sent
                && handle
                    .controller()
                    .goal_point_state()
                    .is_some_and(|s| s.is_terminal())
            {
                break;
            }
        }

        let outcome = SimulationOutcome {
            cycles: runner.cycle(),
            pose: sim,
            goal_state: handle.controller().goal_point_state(),
            rejection_reason: runner
                .controller()
                .goal_rejection_reason()
                .map(str::to_string),
        };

        handle.shutdown()?;
        runner.run_cycle()?;
        runner.run()?;
        Ok(outcome)
    }
}
