//! 深度点云

/// 深度传感器一帧点云
///
/// 每个点为 `[x, y, z, confidence]`，坐标在深度相机坐标系下。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    points: Vec<[f32; 4]>,
    /// 采集时间戳（秒）
    timestamp: f64,
}

impl PointCloud {
    pub fn new(points: Vec<[f32; 4]>, timestamp: f64) -> Self {
        Self { points, timestamp }
    }

    /// 由 xyz 坐标创建，置信度填 1.0
    pub fn from_xyz(points: impl IntoIterator<Item = [f32; 3]>, timestamp: f64) -> Self {
        Self {
            points: points.into_iter().map(|[x, y, z]| [x, y, z, 1.0]).collect(),
            timestamp,
        }
    }

    pub fn points(&self) -> &[[f32; 4]] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }
}
