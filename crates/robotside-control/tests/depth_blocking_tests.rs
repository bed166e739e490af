//! 深度阻挡检测集成测试

mod common;

use common::{BlockedProbe, blocker_cloud, inputs, world};
use robotside_control::{
    BlockedDepthConfig, Controller, ControllerConfig, ROBOT_BLOCKED_POINTS, ROBOT_UNBLOCKED_POINTS,
    blocked::{COLOR_BLOCKER, COLOR_OUT_OF_HEIGHT},
};
use robotside_core::{ManualClock, PointCloud, Transform};

fn every_point() -> ControllerConfig {
    ControllerConfig {
        blocked: BlockedDepthConfig {
            sample_stride: 1,
            point_threshold: 100,
        },
        ..Default::default()
    }
}

/// 150 个通道内的点判定为阻挡，50 个不判定
#[test]
fn test_blocked_threshold() {
    let clock = ManualClock::new(0);
    let mut controller = Controller::new(BlockedProbe::default(), every_point(), clock);
    let w = world(Vec::new());

    controller
        .update(inputs(&w, Transform::identity(), blocker_cloud(150)))
        .unwrap();
    controller
        .update(inputs(&w, Transform::identity(), blocker_cloud(50)))
        .unwrap();
    assert_eq!(controller.behavior().results, vec![true, false]);
}

/// 默认每 10 个点采样一个：1500 个点 → 150 个采样点
#[test]
fn test_default_stride() {
    let clock = ManualClock::new(0);
    let mut controller =
        Controller::new(BlockedProbe::default(), ControllerConfig::default(), clock);
    let w = world(Vec::new());

    controller
        .update(inputs(&w, Transform::identity(), blocker_cloud(1500)))
        .unwrap();
    controller
        .update(inputs(&w, Transform::identity(), blocker_cloud(150)))
        .unwrap();
    assert_eq!(controller.behavior().results, vec![true, false]);
}

/// 阻挡/解除各只记录一次
#[test]
fn test_transitions_logged_once() {
    let clock = ManualClock::new(0);
    let mut controller = Controller::new(BlockedProbe::default(), every_point(), clock);
    let handle = controller.handle();
    let w = world(Vec::new());

    for n in [150, 200, 150, 10, 0, 0, 120] {
        controller
            .update(inputs(&w, Transform::identity(), blocker_cloud(n)))
            .unwrap();
    }
    assert_eq!(
        handle.get_and_clear_log_messages(),
        vec![
            ROBOT_BLOCKED_POINTS.to_string(),
            ROBOT_UNBLOCKED_POINTS.to_string(),
            ROBOT_BLOCKED_POINTS.to_string(),
        ]
    );
}

/// 点颜色只在检测运行的周期有效
#[test]
fn test_point_colors() {
    let clock = ManualClock::new(0);
    let mut controller = Controller::new(BlockedProbe::default(), every_point(), clock);
    let w = world(Vec::new());

    let cloud = PointCloud::from_xyz([[0.3, 0.0, 0.1], [0.3, 0.0, 2.0]], 0.0);
    controller
        .update(inputs(&w, Transform::identity(), cloud))
        .unwrap();
    assert!(controller.point_colors_valid());
    assert_eq!(controller.point_colors(), &[COLOR_BLOCKER, COLOR_OUT_OF_HEIGHT]);
}

/// 空点云退化为未阻挡
#[test]
fn test_empty_cloud_not_blocked() {
    let clock = ManualClock::new(0);
    let mut controller = Controller::new(BlockedProbe::default(), every_point(), clock);
    let w = world(Vec::new());
    controller
        .update(inputs(&w, Transform::identity(), PointCloud::default()))
        .unwrap();
    assert_eq!(controller.behavior().results, vec![false]);
    assert!(!controller.is_blocked_depth());
}

/// 机器人旋转后，原来的正前方点落到侧面
#[test]
fn test_rotated_robot_not_blocked_by_side_points() {
    let clock = ManualClock::new(0);
    let mut controller = Controller::new(BlockedProbe::default(), every_point(), clock);
    let w = world(Vec::new());
    // 相机与底盘同向旋转 90°：相机坐标系的 +x 是世界 +y，仍在正前方
    let facing_left = Transform::from_xyz_yaw(0.0, 0.0, 0.0, std::f64::consts::FRAC_PI_2, 0.0);
    controller
        .update(inputs(&w, facing_left, blocker_cloud(150)))
        .unwrap();
    // 点放在相机坐标系 -y（世界 +x），在机器人侧面
    let side = PointCloud::from_xyz(std::iter::repeat_n([0.0, -0.5, 0.1], 150), 0.0);
    controller.update(inputs(&w, facing_left, side)).unwrap();
    assert_eq!(controller.behavior().results, vec![true, false]);
}
