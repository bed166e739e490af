//! 目标追踪行为集成测试

mod common;

use common::{blocker_cloud, inputs, world};
use robotside_control::{
    Controller, ControllerConfig, GoalPursuitBehavior, PursuitState, VACUUM_SPIRAL_TIME_MS,
    pursuit::{GOAL_REJECTED_FAR, GOAL_REJECTED_TIMEOUT},
};
use robotside_core::{
    GoalPoint, GoalPointAction, GoalPointState, ManualClock, PointCloud, Transform,
};

fn pose(x: f64, y: f64, yaw: f64) -> Transform {
    Transform::from_xyz_yaw(x, y, 0.0, yaw, 0.0)
}

/// 已经站在目标上：一个周期到达，下一个周期报告完成
#[test]
fn test_goal_at_location_completes() {
    let clock = ManualClock::new(0);
    let mut c = Controller::new(GoalPursuitBehavior::new(), ControllerConfig::default(), clock);
    let h = c.handle();
    let w = world(vec![pose(0.0, 0.0, 0.0)]);

    h.set_goal_point(GoalPoint::new(pose(0.1, 0.0, 0.0), GoalPointAction::NoAction));
    c.update(inputs(&w, pose(0.0, 0.0, 0.0), PointCloud::default()))
        .unwrap();
    assert_eq!(h.goal_point_state(), Some(GoalPointState::Running));
    assert_eq!(c.behavior().state(), PursuitState::NoGoal);

    c.update(inputs(&w, pose(0.0, 0.0, 0.0), PointCloud::default()))
        .unwrap();
    assert_eq!(h.goal_point_state(), Some(GoalPointState::Completed));
    assert_eq!(c.speed(), 0.0);
}

/// 驶向远处目标：先加速前进，位置到达后完成
#[test]
fn test_drive_then_complete() {
    let clock = ManualClock::new(0);
    let mut c = Controller::new(
        GoalPursuitBehavior::new(),
        ControllerConfig::default(),
        clock.clone(),
    );
    let h = c.handle();
    let w = world(vec![pose(2.0, 0.0, 0.0)]);

    h.set_goal_point(GoalPoint::new(pose(2.0, 0.0, 0.0), GoalPointAction::NoAction));
    let mut speeds = Vec::new();
    for _ in 0..5 {
        c.update(inputs(&w, pose(0.0, 0.0, 0.0), PointCloud::default()))
            .unwrap();
        speeds.push(c.speed());
        clock.advance_ms(100);
    }
    assert_eq!(c.behavior().state(), PursuitState::Driving);
    assert_eq!(c.path(), vec![pose(2.0, 0.0, 0.0)]);
    assert!(speeds.windows(2).all(|p| p[1] > p[0]));

    c.update(inputs(&w, pose(1.9, 0.0, 0.0), PointCloud::default()))
        .unwrap();
    c.update(inputs(&w, pose(1.9, 0.0, 0.0), PointCloud::default()))
        .unwrap();
    assert_eq!(h.goal_point_state(), Some(GoalPointState::Completed));
    assert!(c.path().is_empty());
}

/// 目标离已知地图点太远被拒绝
#[test]
fn test_far_goal_rejected() {
    let clock = ManualClock::new(0);
    let mut c = Controller::new(GoalPursuitBehavior::new(), ControllerConfig::default(), clock);
    let h = c.handle();
    let w = world(vec![pose(0.0, 0.0, 0.0)]);

    h.set_goal_point(GoalPoint::new(pose(5.0, 0.0, 0.0), GoalPointAction::NoAction));
    for _ in 0..2 {
        c.update(inputs(&w, pose(0.0, 0.0, 0.0), PointCloud::default()))
            .unwrap();
    }
    assert_eq!(h.goal_point_state(), Some(GoalPointState::Rejected));
    assert_eq!(c.goal_rejection_reason(), Some(GOAL_REJECTED_FAR));
}

/// 被挡住的目标在超时后被拒绝，被挡期间不前进
#[test]
fn test_blocked_goal_times_out() {
    let clock = ManualClock::new(0);
    let mut c = Controller::new(
        GoalPursuitBehavior::new(),
        ControllerConfig::default(),
        clock.clone(),
    );
    let h = c.handle();
    let w = world(vec![pose(2.0, 0.0, 0.0)]);

    h.set_goal_point(GoalPoint::new(pose(2.0, 0.0, 0.0), GoalPointAction::NoAction));
    c.update(inputs(&w, pose(0.0, 0.0, 0.0), blocker_cloud(2000)))
        .unwrap();
    assert_eq!(c.speed(), 0.0);

    clock.advance_ms(30_001);
    c.update(inputs(&w, pose(0.0, 0.0, 0.0), blocker_cloud(2000)))
        .unwrap();
    c.update(inputs(&w, pose(0.0, 0.0, 0.0), blocker_cloud(2000)))
        .unwrap();
    assert_eq!(h.goal_point_state(), Some(GoalPointState::Rejected));
    assert_eq!(c.goal_rejection_reason(), Some(GOAL_REJECTED_TIMEOUT));
}

/// 螺旋清扫：附件打开 30 秒后完成
#[test]
fn test_vacuum_spiral_action() {
    let clock = ManualClock::new(0);
    let mut c = Controller::new(
        GoalPursuitBehavior::new(),
        ControllerConfig::default(),
        clock.clone(),
    );
    let h = c.handle();
    let w = world(vec![pose(0.0, 0.0, 0.0)]);

    h.set_goal_point(GoalPoint::new(pose(0.0, 0.0, 0.0), GoalPointAction::VacuumSpiral));
    c.update(inputs(&w, pose(0.0, 0.0, 0.0), PointCloud::default()))
        .unwrap();
    assert_eq!(c.behavior().state(), PursuitState::Action);
    assert!(
        h.get_and_clear_log_messages()
            .contains(&"[CONTROLLER] Starting vacuuming".to_string())
    );

    clock.advance_ms(15_000);
    c.update(inputs(&w, pose(0.0, 0.0, 0.0), PointCloud::default()))
        .unwrap();
    assert!(c.action1() && c.action2());
    assert_eq!(c.speed(), 0.1);
    assert!((c.angular() - 0.1 / 0.15).abs() < 1e-9);
    assert_eq!(h.goal_point_state(), Some(GoalPointState::Running));

    clock.advance_ms(VACUUM_SPIRAL_TIME_MS);
    c.update(inputs(&w, pose(0.0, 0.0, 0.0), PointCloud::default()))
        .unwrap();
    c.update(inputs(&w, pose(0.0, 0.0, 0.0), PointCloud::default()))
        .unwrap();
    assert!(!c.action1() && !c.action2());
    assert_eq!(h.goal_point_state(), Some(GoalPointState::Completed));
}

/// 对齐朝向：位置到达后原地转向
#[test]
fn test_align_rotation_turns_in_place() {
    let clock = ManualClock::new(0);
    let mut c = Controller::new(GoalPursuitBehavior::new(), ControllerConfig::default(), clock);
    let h = c.handle();
    let w = world(vec![pose(0.0, 0.0, 0.0)]);

    h.set_goal_point(GoalPoint::new(pose(0.0, 0.0, 1.0), GoalPointAction::AlignRotation));
    c.update(inputs(&w, pose(0.0, 0.0, 0.0), PointCloud::default()))
        .unwrap();
    assert_eq!(c.speed(), 0.0);
    assert!((c.angular() - 1.0).abs() < 1e-9);
    assert_eq!(c.behavior().state(), PursuitState::Driving);

    c.update(inputs(&w, pose(0.0, 0.0, 1.0), PointCloud::default()))
        .unwrap();
    c.update(inputs(&w, pose(0.0, 0.0, 1.0), PointCloud::default()))
        .unwrap();
    assert_eq!(h.goal_point_state(), Some(GoalPointState::Completed));
}
