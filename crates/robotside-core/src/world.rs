//! 世界（地图）句柄
//!
//! 控制核心只把世界当作可比较身份的句柄（用于检测“换了新世界”），
//! 以及行为层做目标校验时使用的少量查询。地图存储与加载不在本 crate 内。

use crate::transform::Transform;
use std::fmt;
use std::sync::Arc;

/// 世界查询接口
pub trait World: Send + Sync + fmt::Debug {
    /// 世界唯一标识
    fn uuid(&self) -> &str;

    /// 显示名称
    fn name(&self) -> &str {
        self.uuid()
    }

    /// 到最近已知地图点的平面距离（米）
    ///
    /// 地图没有任何点时返回 `None`。
    fn distance_to_known_point(&self, target: &Transform) -> Option<f64>;
}

/// 世界句柄
///
/// 克隆共享同一份世界；[`WorldHandle::same_world`] 按身份（而非内容）比较。
#[derive(Clone)]
pub struct WorldHandle(Arc<dyn World>);

impl WorldHandle {
    pub fn new(world: impl World + 'static) -> Self {
        Self(Arc::new(world))
    }

    pub fn from_arc(world: Arc<dyn World>) -> Self {
        Self(world)
    }

    /// 两个句柄是否指向同一次加载的世界
    pub fn same_world(&self, other: &WorldHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn world(&self) -> &dyn World {
        self.0.as_ref()
    }
}

impl std::ops::Deref for WorldHandle {
    type Target = dyn World;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl fmt::Debug for WorldHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WorldHandle").field(&self.0.uuid()).finish()
    }
}

/// 以点列表表示的简单世界
#[derive(Debug, Clone, Default)]
pub struct PointMapWorld {
    uuid: String,
    name: String,
    points: Vec<Transform>,
}

impl PointMapWorld {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>, points: Vec<Transform>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            points,
        }
    }

    pub fn points(&self) -> &[Transform] {
        &self.points
    }
}

impl World for PointMapWorld {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn distance_to_known_point(&self, target: &Transform) -> Option<f64> {
        self.points
            .iter()
            .map(|p| p.planar_distance_to_squared(target))
            .fold(None, |best: Option<f64>, d| Some(best.map_or(d, |b| b.min(d))))
            .map(f64::sqrt)
    }
}
