//! 控制层集成测试的公共夹具

#![allow(dead_code)]

use robotside_control::{ControllerContext, CycleInputs, RobotBehavior};
use robotside_core::{PointCloud, PointMapWorld, RobotModel, Transform, WorldHandle};
use std::sync::Arc;

/// 宽 0.4m、长 0.4m、高 0.5m 的测试型号
pub fn model() -> Arc<RobotModel> {
    Arc::new(RobotModel::new(0.4, 2.0, 0.4, 0.4, 0.5, 0.3, Vec::new()))
}

pub fn world(points: Vec<Transform>) -> WorldHandle {
    WorldHandle::new(PointMapWorld::new("test-world", "test", points))
}

/// 原点处、朝 +x 的完整周期输入；深度相机在底盘上方 0.1m
pub fn inputs(world: &WorldHandle, location: Transform, cloud: PointCloud) -> CycleInputs {
    CycleInputs {
        world: Some(world.clone()),
        location: Some(location),
        model: Some(model()),
        device_location: Some(location),
        depth_location: Some(Transform::from_xyz_yaw(
            location.x(),
            location.y(),
            0.1,
            location.rotation_z(),
            0.0,
        )),
        point_cloud: Some(Arc::new(cloud)),
        goal_max_distance: 1.0,
        goal_timeout_sec: 30.0,
    }
}

/// 正前方 0.3m、车高以内的 `n` 个点（相机坐标系）
pub fn blocker_cloud(n: usize) -> PointCloud {
    PointCloud::from_xyz(std::iter::repeat_n([0.3, 0.0, 0.1], n), 0.0)
}

/// 每周期只做阻挡检测并记录结果
#[derive(Default)]
pub struct BlockedProbe {
    pub results: Vec<bool>,
}

impl RobotBehavior for BlockedProbe {
    fn on_update(&mut self, ctx: &mut ControllerContext<'_>) {
        let blocked = ctx.is_blocked_depth();
        // 同一周期内重复查询不重复计算、不重复记日志
        assert_eq!(ctx.is_blocked_depth(), blocked);
        self.results.push(blocked);
    }
}

/// 什么都不做的行为
#[derive(Default)]
pub struct Idle;

impl RobotBehavior for Idle {
    fn on_update(&mut self, _ctx: &mut ControllerContext<'_>) {}
}
