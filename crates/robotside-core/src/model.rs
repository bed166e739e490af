//! 机器人物理模型与电池状态

use serde::{Deserialize, Serialize};

/// 允许的最大线速度（m/s）
///
/// `RobotModel::set_max_speed_percentage` 以此为 100% 基准。
pub const MAX_ALLOWED_LINEAR_VELOCITY: f64 = 0.65;

/// 单块电池的状态快照
///
/// 百分比为 0..=100。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatteryStatus {
    pub name: String,
    /// 低于此百分比视为电量危急
    pub critical_percentage: f64,
    /// 低于此百分比视为电量低
    pub low_percentage: f64,
    /// 仅用于显示
    pub min_voltage: f64,
    /// 仅用于显示
    pub low_voltage: f64,
    /// 仅用于显示
    pub max_voltage: f64,
    pub voltage: f64,
    /// 电流（A）
    pub current: f64,
    pub percentage: f64,
    pub have_voltage: bool,
    pub have_current: bool,
    pub charging: bool,
}

impl BatteryStatus {
    /// 创建一块尚无读数的电池
    pub fn new(
        name: impl Into<String>,
        critical_percentage: f64,
        low_percentage: f64,
        min_voltage: f64,
        low_voltage: f64,
        max_voltage: f64,
    ) -> Self {
        Self {
            name: name.into(),
            critical_percentage,
            low_percentage,
            min_voltage,
            low_voltage,
            max_voltage,
            ..Default::default()
        }
    }

    /// 以当前电池配置为模板生成新读数（无电压、电流）
    pub fn with_reading(&self, charging: bool, percentage: f64) -> Self {
        Self {
            voltage: 0.0,
            current: 0.0,
            percentage,
            have_voltage: false,
            have_current: false,
            charging,
            ..self.clone()
        }
    }

    /// 带电压的新读数
    pub fn with_voltage(&self, charging: bool, percentage: f64, voltage: f64) -> Self {
        Self {
            voltage,
            have_voltage: true,
            ..self.with_reading(charging, percentage)
        }
    }

    /// 带电压和电流的新读数
    pub fn with_current(&self, charging: bool, percentage: f64, voltage: f64, current: f64) -> Self {
        Self {
            current,
            have_current: true,
            ..self.with_voltage(charging, percentage, voltage)
        }
    }

    pub fn is_low(&self) -> bool {
        self.percentage < self.low_percentage
    }

    pub fn is_critical(&self) -> bool {
        self.percentage < self.critical_percentage
    }
}

/// 机器人型号的物理常量
///
/// 由驱动持有；控制器和安全控制器只读。最大线速度可在运行时调整。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotModel {
    /// 最大线速度（m/s）
    max_speed: f64,
    /// 最大角速度（rad/s）
    max_angular: f64,
    /// 宽度（m）
    width: f64,
    /// 长度（m）
    length: f64,
    /// 高度（m）
    height: f64,
    /// 传感器设备离地高度（m）
    device_z: f64,
    battery_statuses: Vec<BatteryStatus>,
}

impl RobotModel {
    pub fn new(
        max_speed: f64,
        max_angular: f64,
        width: f64,
        length: f64,
        height: f64,
        device_z: f64,
        battery_statuses: Vec<BatteryStatus>,
    ) -> Self {
        Self {
            max_speed,
            max_angular,
            width,
            length,
            height,
            device_z,
            battery_statuses,
        }
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn max_angular(&self) -> f64 {
        self.max_angular
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn device_z(&self) -> f64 {
        self.device_z
    }

    /// 型号定义的电池模板
    pub fn battery_statuses(&self) -> &[BatteryStatus] {
        &self.battery_statuses
    }

    /// 直接设置最大线速度（m/s）
    pub fn change_max_velocity(&mut self, max_speed: f64) {
        self.max_speed = max_speed;
    }

    /// 按百分比设置最大线速度
    ///
    /// `percentage` 钳位到 [0, 100]，100% 对应 [`MAX_ALLOWED_LINEAR_VELOCITY`]。
    pub fn set_max_speed_percentage(&mut self, percentage: f64) {
        let p = percentage.clamp(0.0, 100.0);
        self.max_speed = p / 100.0 * MAX_ALLOWED_LINEAR_VELOCITY;
    }

    pub fn max_allowed_linear_velocity(&self) -> f64 {
        MAX_ALLOWED_LINEAR_VELOCITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battery() -> BatteryStatus {
        BatteryStatus::new("base", 5.0, 15.0, 12.0, 13.0, 16.8)
    }

    #[test]
    fn test_battery_thresholds() {
        let b = battery().with_reading(false, 50.0);
        assert!(!b.is_low());
        assert!(!b.is_critical());

        let b = battery().with_reading(false, 10.0);
        assert!(b.is_low());
        assert!(!b.is_critical());

        let b = battery().with_reading(true, 2.0);
        assert!(b.is_low());
        assert!(b.is_critical());
        assert!(b.charging);
    }

    /// 新读数保留模板配置，只替换测量值
    #[test]
    fn test_battery_reading_keeps_template() {
        let b = battery().with_current(false, 80.0, 15.9, 1.2);
        assert_eq!(b.name, "base");
        assert_eq!(b.low_percentage, 15.0);
        assert!(b.have_voltage && b.have_current);
        assert_eq!(b.current, 1.2);

        let b = b.with_reading(false, 70.0);
        assert!(!b.have_voltage && !b.have_current);
        assert_eq!(b.voltage, 0.0);
    }

    #[test]
    fn test_max_speed_percentage() {
        let mut model = RobotModel::new(0.5, 1.0, 0.35, 0.35, 0.1, 0.3, vec![]);
        model.set_max_speed_percentage(50.0);
        assert!((model.max_speed() - 0.325).abs() < 1e-10);
        model.set_max_speed_percentage(250.0);
        assert!((model.max_speed() - MAX_ALLOWED_LINEAR_VELOCITY).abs() < 1e-10);
        model.change_max_velocity(0.2);
        assert_eq!(model.max_speed(), 0.2);
    }
}
