//! 时钟抽象
//!
//! 所有依赖时间的组件（动画 Wait、安全控制器、遥操作超时、螺旋吸尘）
//! 都从 [`Clock`] 读取毫秒时间戳，测试中用 [`ManualClock`] 替换。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// 进程内单调时间锚点
static APP_START: OnceLock<Instant> = OnceLock::new();

/// 毫秒时钟
pub trait Clock: Send + Sync {
    /// 当前时间（毫秒）
    fn now_ms(&self) -> u64;
}

/// 共享时钟句柄
pub type SharedClock = Arc<dyn Clock>;

/// 单调系统时钟：自进程首次访问以来的毫秒数
///
/// 不受系统时间调整（NTP、手动修改）影响。
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn shared() -> SharedClock {
        Arc::new(SystemClock)
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        let start = APP_START.get_or_init(Instant::now);
        start.elapsed().as_millis() as u64
    }
}

/// 手动推进的时钟（测试、仿真）
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            now_ms: AtomicU64::new(start_ms),
        })
    }

    pub fn advance_ms(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::Relaxed);
    }

    pub fn set_ms(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = clock.now_ms();
        assert!(b >= a + 4, "a={} b={}", a, b);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now_ms(), 100);
        clock.advance_ms(50);
        assert_eq!(clock.now_ms(), 150);
        clock.set_ms(10);
        assert_eq!(clock.now_ms(), 10);
    }
}
