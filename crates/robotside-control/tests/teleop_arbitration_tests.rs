//! 遥操作仲裁集成测试（通过 Mock 驱动观察下发结果）

mod common;

use common::{Idle, inputs, world};
use crossbeam_channel::unbounded;
use robotside_control::{
    BumperManeuver, Controller, ControllerConfig, SafetyController, TELEOP_TIMEOUT_MS,
    TeleopMultiplexer,
};
use robotside_core::{
    BumperId, ManualClock, PointCloud, RobotModel, Teleop, Transform, read_animation_call,
};
use robotside_driver::{MockDriver, MockHandle, RobotDriverMultiplex};
use std::sync::Arc;

fn driver() -> (RobotDriverMultiplex, MockHandle) {
    let (mock, handle) = MockDriver::new("mock", MockDriver::default_model());
    let mut mux = RobotDriverMultiplex::new(vec![Box::new(mock)]).unwrap();
    let (tx, _rx) = unbounded();
    mux.init(tx);
    mux.update();
    (mux, handle)
}

fn unit_model() -> RobotModel {
    RobotModel::new(1.0, 1.0, 0.3, 0.3, 0.1, 0.3, Vec::new())
}

/// A（ROS，过期）、B（CLOUD，新鲜但为零）、C（CONTROLLER，新鲜非零）→ 下发 C
#[test]
fn test_stale_and_zero_sources_fall_through() {
    let clock = ManualClock::new(10_000);
    let mux = TeleopMultiplexer::new(clock.clone()).unwrap();
    let (driver, _h) = driver();
    let mut controller = Controller::new(Idle, ControllerConfig::default(), clock.clone());
    let w = world(Vec::new());
    controller
        .update(inputs(&w, Transform::identity(), PointCloud::default()))
        .unwrap();

    mux.update_from_ros(Teleop::new(0.3, 0.3, false, false, 10_000 - TELEOP_TIMEOUT_MS));
    mux.update_from_cloud([Some(Teleop::new(0.0, 0.0, false, false, 10_000))], Some(&unit_model()));

    // 控制器输出来自一段动画
    let controller_handle = controller.handle();
    controller_handle
        .set_animation(read_animation_call("Go(SetMotor(0.2,0.1); Wait(1000);)").unwrap());
    controller
        .update(inputs(&w, Transform::identity(), PointCloud::default()))
        .unwrap();
    mux.update_from_controller(&controller_handle);

    for _ in 0..2 {
        mux.update_driver(&driver);
        assert_eq!(driver.speed(), 0.2);
        assert_eq!(driver.angular(), 0.1);
    }
}

/// 没有任何有效来源时主动下发零速度
#[test]
fn test_no_source_commands_zero() {
    let clock = ManualClock::new(0);
    let mux = TeleopMultiplexer::new(clock.clone()).unwrap();
    let (driver, _h) = driver();

    driver.set_motion(0.3, 0.3);
    mux.update_driver(&driver);
    assert_eq!(driver.speed(), 0.0);
    assert_eq!(driver.angular(), 0.0);
}

/// 高优先级的非零来源胜出；过期后回落
#[test]
fn test_priority_then_expiry() {
    let clock = ManualClock::new(0);
    let mux = TeleopMultiplexer::new(clock.clone()).unwrap();
    let (driver, _h) = driver();

    mux.update_from_cloud([Some(Teleop::new(0.5, 0.0, false, false, 500))], Some(&unit_model()));
    mux.update_from_ros(Teleop::new(0.1, 0.0, false, false, 0));
    clock.set_ms(600);
    mux.update_driver(&driver);
    assert_eq!(driver.speed(), 0.1);

    clock.set_ms(1_000);
    mux.update_driver(&driver);
    assert_eq!(driver.speed(), 0.5);
}

/// 附件变化被报告给调用方
#[test]
fn test_accessory_change_reported() {
    let clock = ManualClock::new(0);
    let mux = TeleopMultiplexer::new(clock.clone()).unwrap();
    let (driver, _h) = driver();

    assert!(!mux.update_driver(&driver));
    mux.update_from_ros(Teleop::new(0.0, 0.0, false, true, 0));
    assert!(mux.update_driver(&driver));
    assert!(driver.action2());
    assert!(!mux.update_driver(&driver));
}

/// 脱困期间清除控制器来源，安全速度接管
#[test]
fn test_safety_overrides_controller() {
    let clock = ManualClock::new(0);
    let mux = TeleopMultiplexer::new(clock.clone()).unwrap();
    let (driver, mock) = driver();
    let mut safety = SafetyController::new(clock.clone());
    let mut controller = Controller::new(Idle, ControllerConfig::default(), clock.clone());
    let handle = controller.handle();
    let w = world(Vec::new());

    handle.set_animation(read_animation_call("Go(SetMotor(0.3,0.0); Wait(60000);)").unwrap());
    controller
        .update(inputs(&w, Transform::identity(), PointCloud::default()))
        .unwrap();
    mux.update_from_controller(&handle);
    assert!(!mux.update_from_safety_controller(&mut safety, driver.bumper()));
    mux.update_driver(&driver);
    assert_eq!(driver.speed(), 0.3);

    mock.set_bumper(BumperId::Right);
    assert!(mux.update_from_safety_controller(&mut safety, driver.bumper()));
    assert_eq!(mux.bumper_maneuver(), BumperManeuver::MovingBackwards);
    mux.update_driver(&driver);
    assert_eq!(driver.speed(), -0.15);

    // 后退结束进入转向：安全速度为零，控制器来源已被清除，机器人停住
    mock.set_bumper(BumperId::None);
    clock.advance_ms(700);
    assert!(mux.update_from_safety_controller(&mut safety, driver.bumper()));
    mux.update_driver(&driver);
    assert_eq!(driver.speed(), 0.0);
    assert_eq!(driver.angular(), 0.0);
}

/// 多线程同时写入各来源
#[test]
fn test_concurrent_sources() {
    let clock = ManualClock::new(0);
    let mux = Arc::new(TeleopMultiplexer::new(clock.clone()).unwrap());

    let ros = {
        let mux = mux.clone();
        std::thread::spawn(move || {
            for i in 0..500 {
                mux.update_from_ros(Teleop::new(0.1, 0.0, i % 2 == 0, false, 0));
            }
        })
    };
    let cloud = {
        let mux = mux.clone();
        std::thread::spawn(move || {
            let model = unit_model();
            for _ in 0..500 {
                mux.update_from_cloud([Some(Teleop::new(0.2, 0.0, false, false, 0))], Some(&model));
            }
        })
    };
    ros.join().unwrap();
    cloud.join().unwrap();

    let (drive, _, _) = mux.select();
    assert_eq!(drive.unwrap().vx, 0.1);
}
