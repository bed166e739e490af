//! 深度阻挡检测性能基准测试
//!
//! 一帧 640x480 的点云必须在一个 100ms 控制周期内远远处理完。

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use robotside_control::{BlockedDepthConfig, count_blockers};
use robotside_core::{PointCloud, RobotModel, Transform};

fn frame(n: usize) -> PointCloud {
    // 前方 0.2m~2.2m、左右 ±1m、高 0~0.6m 的均匀网格
    PointCloud::from_xyz(
        (0..n).map(|i| {
            let f = i as f32 / n as f32;
            [0.2 + 2.0 * f, (i % 97) as f32 / 48.5 - 1.0, (i % 13) as f32 * 0.05]
        }),
        0.0,
    )
}

fn bench_count_blockers(c: &mut Criterion) {
    let model = RobotModel::new(0.4, 2.0, 0.35, 0.35, 0.5, 0.3, Vec::new());
    let location = Transform::identity();
    let camera = Transform::from_xyz_yaw(0.0, 0.0, 0.1, 0.0, 0.0);
    let mut colors = Vec::new();

    let mut group = c.benchmark_group("count_blockers");
    for stride in [1usize, 10] {
        let cloud = frame(640 * 480);
        let config = BlockedDepthConfig {
            sample_stride: stride,
            ..BlockedDepthConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("vga", stride), &cloud, |b, cloud| {
            b.iter(|| {
                count_blockers(
                    black_box(cloud),
                    &camera,
                    &location,
                    &model,
                    &config,
                    &mut colors,
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_count_blockers);
criterion_main!(benches);
