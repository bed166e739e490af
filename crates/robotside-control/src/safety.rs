//! 保险杠安全控制器
//!
//! 保险杠触发后执行固定的脱困动作：后退 → 转向 → 前进 → 结束。
//! 简单模式只后退。所有计时都以进入当前状态的时刻为起点，
//! 因此对调用间隔不敏感。

use robotside_core::{BumperId, SharedClock};
use std::f64::consts::PI;
use tracing::debug;

pub const MOVE_BACKWARD_DISTANCE: f64 = 0.10;
pub const MOVE_BACKWARD_SPEED: f64 = 0.15;
pub const MOVE_FORWARD_DISTANCE: f64 = 0.45;
pub const MOVE_FORWARD_SPEED: f64 = 0.10;
pub const ROTATING_ANGLE_LONG: f64 = 65.0 / 180.0 * PI;
pub const ROTATING_ANGLE_SHORT: f64 = 35.0 / 180.0 * PI;
pub const ROTATING_SPEED: f64 = 60.0 / 180.0 * PI;

/// 脱困动作状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BumperManeuver {
    #[default]
    None,
    Turning,
    MovingBackwards,
    MovingForward,
}

impl std::fmt::Display for BumperManeuver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BumperManeuver::None => "NONE",
            BumperManeuver::Turning => "TURNING",
            BumperManeuver::MovingBackwards => "MOVING_BACKWARDS",
            BumperManeuver::MovingForward => "MOVING_FORWARD",
        };
        f.write_str(s)
    }
}

pub struct SafetyController {
    clock: SharedClock,
    maneuver: BumperManeuver,
    simple_bumper: bool,
    is_bumped: bool,
    safe_linear_speed: f64,
    safe_angular_speed: f64,
    /// 进入当前状态的时刻（毫秒）
    entered_ms: u64,
    bumper: BumperId,
    rotation_angle: f64,
    rotation_speed: f64,
}

impl SafetyController {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            maneuver: BumperManeuver::None,
            simple_bumper: false,
            is_bumped: false,
            safe_linear_speed: 0.0,
            safe_angular_speed: 0.0,
            entered_ms: 0,
            bumper: BumperId::None,
            rotation_angle: ROTATING_ANGLE_SHORT,
            rotation_speed: ROTATING_SPEED,
        }
    }

    pub fn safe_linear_speed(&self) -> f64 {
        self.safe_linear_speed
    }

    pub fn safe_angular_speed(&self) -> f64 {
        self.safe_angular_speed
    }

    pub fn is_bumped(&self) -> bool {
        self.is_bumped
    }

    /// 离地检测；只有保险杠的机器人恒为 false
    pub fn is_lifted(&self) -> bool {
        false
    }

    pub fn bumper_maneuver(&self) -> BumperManeuver {
        self.maneuver
    }

    /// 简单模式：只后退，不转向也不前进
    pub fn set_simple_bumper_behavior(&mut self, simple: bool) {
        self.simple_bumper = simple;
    }

    fn enter(&mut self, maneuver: BumperManeuver, now_ms: u64, linear: f64, angular: f64) {
        self.maneuver = maneuver;
        self.entered_ms = now_ms;
        self.safe_linear_speed = linear;
        self.safe_angular_speed = angular;
    }

    fn finish(&mut self, now_ms: u64) {
        self.enter(BumperManeuver::None, now_ms, 0.0, 0.0);
        self.is_bumped = false;
    }

    /// 每周期调用一次，输入当前保险杠读数
    ///
    /// # 返回
    /// 脱困动作进行中时返回 `true`，此时调用方应使用安全速度
    pub fn update_bumper(&mut self, bumper: BumperId) -> bool {
        if !bumper.is_pressed() && !self.is_bumped {
            return false;
        }
        let now = self.clock.now_ms();
        let elapsed = now.saturating_sub(self.entered_ms) as f64 / 1000.0;

        match self.maneuver {
            BumperManeuver::None => {
                debug!("Bumper maneuver starts ({:?})", bumper);
                self.is_bumped = true;
                self.bumper = bumper;
                self.enter(
                    BumperManeuver::MovingBackwards,
                    now,
                    -MOVE_BACKWARD_SPEED,
                    0.0,
                );
            }
            BumperManeuver::MovingBackwards => {
                if elapsed < MOVE_BACKWARD_DISTANCE / MOVE_BACKWARD_SPEED {
                    self.safe_linear_speed = -MOVE_BACKWARD_SPEED;
                    self.safe_angular_speed = 0.0;
                } else if self.simple_bumper {
                    debug!("Finish going back, finish bumper maneuver");
                    self.finish(now);
                } else {
                    (self.rotation_angle, self.rotation_speed) = match self.bumper {
                        BumperId::Left => (ROTATING_ANGLE_SHORT, -ROTATING_SPEED),
                        BumperId::CenterLeft => (ROTATING_ANGLE_LONG, -ROTATING_SPEED),
                        BumperId::CenterRight => (ROTATING_ANGLE_LONG, ROTATING_SPEED),
                        BumperId::Right | BumperId::None => (ROTATING_ANGLE_SHORT, ROTATING_SPEED),
                    };
                    debug!("Finish going back, start rotation");
                    self.enter(BumperManeuver::Turning, now, 0.0, 0.0);
                }
            }
            BumperManeuver::Turning => {
                if elapsed < self.rotation_angle / ROTATING_SPEED {
                    self.safe_linear_speed = 0.0;
                    self.safe_angular_speed = self.rotation_speed;
                } else {
                    debug!("Finish rotation, moving forward");
                    self.enter(BumperManeuver::MovingForward, now, 0.0, 0.0);
                }
            }
            BumperManeuver::MovingForward => {
                if bumper.is_pressed() {
                    // 前进中再次碰撞：从头开始
                    self.maneuver = BumperManeuver::None;
                    return self.update_bumper(bumper);
                } else if elapsed < MOVE_FORWARD_DISTANCE / MOVE_FORWARD_SPEED {
                    self.safe_linear_speed = MOVE_FORWARD_SPEED;
                    self.safe_angular_speed = 0.0;
                } else {
                    debug!("Finish bumper maneuver");
                    self.finish(now);
                }
            }
        }

        self.is_bumped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robotside_core::ManualClock;

    /// 完整脱困序列：后退 667ms → 转向 → 前进 4500ms
    #[test]
    fn test_full_maneuver_timing() {
        let clock = ManualClock::new(1_000);
        let mut s = SafetyController::new(clock.clone());

        assert!(!s.update_bumper(BumperId::None));
        assert!(s.update_bumper(BumperId::CenterLeft));
        assert_eq!(s.bumper_maneuver(), BumperManeuver::MovingBackwards);
        assert_eq!(s.safe_linear_speed(), -MOVE_BACKWARD_SPEED);

        clock.advance_ms(600);
        assert!(s.update_bumper(BumperId::None));
        assert_eq!(s.bumper_maneuver(), BumperManeuver::MovingBackwards);

        clock.advance_ms(100);
        assert!(s.update_bumper(BumperId::None));
        assert_eq!(s.bumper_maneuver(), BumperManeuver::Turning);
        assert_eq!(s.safe_linear_speed(), 0.0);

        // 长转角 65° @ 60°/s ≈ 1083ms，左侧碰撞向右转（负角速度）
        clock.advance_ms(1_000);
        assert!(s.update_bumper(BumperId::None));
        assert_eq!(s.bumper_maneuver(), BumperManeuver::Turning);
        assert_eq!(s.safe_angular_speed(), -ROTATING_SPEED);

        clock.advance_ms(100);
        assert!(s.update_bumper(BumperId::None));
        assert_eq!(s.bumper_maneuver(), BumperManeuver::MovingForward);

        clock.advance_ms(4_400);
        assert!(s.update_bumper(BumperId::None));
        assert_eq!(s.safe_linear_speed(), MOVE_FORWARD_SPEED);

        clock.advance_ms(200);
        assert!(!s.update_bumper(BumperId::None));
        assert_eq!(s.bumper_maneuver(), BumperManeuver::None);
        assert_eq!(s.safe_linear_speed(), 0.0);
        assert!(!s.is_bumped());
    }

    #[test]
    fn test_simple_behavior_only_backs_up() {
        let clock = ManualClock::new(0);
        let mut s = SafetyController::new(clock.clone());
        s.set_simple_bumper_behavior(true);

        assert!(s.update_bumper(BumperId::Right));
        clock.advance_ms(700);
        assert!(!s.update_bumper(BumperId::None));
        assert_eq!(s.bumper_maneuver(), BumperManeuver::None);
        assert!(!s.is_lifted());
    }

    #[test]
    fn test_rotation_direction_by_bumper() {
        for (bumper, speed, angle) in [
            (BumperId::Left, -ROTATING_SPEED, ROTATING_ANGLE_SHORT),
            (BumperId::CenterLeft, -ROTATING_SPEED, ROTATING_ANGLE_LONG),
            (BumperId::CenterRight, ROTATING_SPEED, ROTATING_ANGLE_LONG),
            (BumperId::Right, ROTATING_SPEED, ROTATING_ANGLE_SHORT),
        ] {
            let clock = ManualClock::new(0);
            let mut s = SafetyController::new(clock.clone());
            s.update_bumper(bumper);
            clock.advance_ms(700);
            s.update_bumper(BumperId::None);
            s.update_bumper(BumperId::None);
            assert_eq!(s.safe_angular_speed(), speed);
            assert_eq!(s.rotation_angle, angle);
        }
    }

    #[test]
    fn test_new_hit_while_moving_forward_restarts() {
        let clock = ManualClock::new(0);
        let mut s = SafetyController::new(clock.clone());
        s.update_bumper(BumperId::Right);
        clock.advance_ms(700);
        s.update_bumper(BumperId::None);
        clock.advance_ms(600);
        s.update_bumper(BumperId::None);
        assert_eq!(s.bumper_maneuver(), BumperManeuver::MovingForward);

        assert!(s.update_bumper(BumperId::Left));
        assert_eq!(s.bumper_maneuver(), BumperManeuver::MovingBackwards);
        assert_eq!(s.bumper, BumperId::Left);
    }

    #[test]
    fn test_bumper_ignored_until_phase_ends() {
        let clock = ManualClock::new(0);
        let mut s = SafetyController::new(clock.clone());
        s.update_bumper(BumperId::Right);
        clock.advance_ms(100);
        // 后退中再次碰撞不改变状态
        assert!(s.update_bumper(BumperId::Left));
        assert_eq!(s.bumper_maneuver(), BumperManeuver::MovingBackwards);
        assert_eq!(s.bumper, BumperId::Right);
    }
}
