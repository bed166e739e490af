//! 多来源最新值仲裁
//!
//! 每个来源保存最近一次写入的值；来源按构造时给出的顺序排列优先级。
//! 超过超时时间的值在查询时视为不存在，超时为 0 表示永不过期。

use crate::error::ControlError;
use robotside_core::{SharedClock, Teleop};
use smallvec::SmallVec;
use std::fmt::Debug;
use tracing::warn;

/// 带产生时刻的值
pub trait Timestamped {
    /// 产生时刻（毫秒，与 [`Clock`](robotside_core::Clock) 同一时间基准）
    fn timestamp_ms(&self) -> u64;
}

impl Timestamped for Teleop {
    fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}

pub struct Synchronizer<K, T> {
    /// 按优先级排列的来源及其最新值
    slots: Vec<(K, Option<T>)>,
    timeout_ms: u64,
    clock: SharedClock,
}

impl<K, T> Synchronizer<K, T>
where
    K: Copy + Eq + Debug,
    T: Timestamped,
{
    /// 创建仲裁器
    ///
    /// # 参数
    /// - `sources`: 来源列表，越靠前优先级越高
    /// - `timeout_ms`: 过期时间，0 表示不过期
    ///
    /// # 错误
    /// 来源重复时返回 [`ControlError::DuplicateSource`]
    pub fn new(
        sources: impl IntoIterator<Item = K>,
        timeout_ms: u64,
        clock: SharedClock,
    ) -> Result<Self, ControlError> {
        let mut slots: Vec<(K, Option<T>)> = Vec::new();
        for source in sources {
            if slots.iter().any(|(k, _)| *k == source) {
                return Err(ControlError::DuplicateSource(format!("{:?}", source)));
            }
            slots.push((source, None));
        }
        Ok(Self {
            slots,
            timeout_ms,
            clock,
        })
    }

    pub fn sources(&self) -> impl Iterator<Item = K> + '_ {
        self.slots.iter().map(|(k, _)| *k)
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    fn slot_mut(&mut self, source: K) -> Option<&mut Option<T>> {
        let slot = self
            .slots
            .iter_mut()
            .find(|(k, _)| *k == source)
            .map(|(_, v)| v);
        if slot.is_none() {
            warn!("Source invalid: {:?}", source);
        }
        slot
    }

    /// 写入或清除（`None`）一个来源的值
    ///
    /// # 返回
    /// 来源未知时返回 `false`，不做任何修改
    pub fn set_value(&mut self, source: K, value: Option<T>) -> bool {
        match self.slot_mut(source) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// 从多个候选中选最新的非空值写入；全部为空时清除该来源
    pub fn set_values(&mut self, source: K, values: impl IntoIterator<Item = Option<T>>) -> bool {
        let newest = values
            .into_iter()
            .flatten()
            .fold(None, |best: Option<T>, v| match best {
                Some(b) if b.timestamp_ms() >= v.timestamp_ms() => Some(b),
                _ => Some(v),
            });
        self.set_value(source, newest)
    }

    /// 来源的原始值（不检查过期）
    pub fn value(&self, source: K) -> Option<&T> {
        self.slots
            .iter()
            .find(|(k, _)| *k == source)
            .and_then(|(_, v)| v.as_ref())
    }

    /// 按优先级排列的未过期值
    fn fresh(&self) -> impl Iterator<Item = &T> + '_ {
        let now = self.clock.now_ms();
        let timeout = self.timeout_ms;
        self.slots
            .iter()
            .filter_map(|(_, v)| v.as_ref())
            .filter(move |v| timeout == 0 || now.saturating_sub(v.timestamp_ms()) < timeout)
    }

    /// 优先级最高、未过期且满足条件的值
    pub fn first_value(&self, criteria: impl Fn(&T) -> bool) -> Option<&T> {
        self.fresh().find(|v| criteria(v))
    }

    /// 最新、未过期且满足条件的值；时间相同时取优先级高者
    pub fn newest_value(&self, criteria: impl Fn(&T) -> bool) -> Option<&T> {
        self.fresh()
            .filter(|v| criteria(v))
            .fold(None, |best: Option<&T>, v| match best {
                Some(b) if b.timestamp_ms() >= v.timestamp_ms() => Some(b),
                _ => Some(v),
            })
    }

    /// 按优先级排列的未过期且满足条件的值
    ///
    /// 来源通常只有几个，结果在栈上收集。
    pub fn order_by_priority(&self, criteria: impl Fn(&T) -> bool) -> SmallVec<[&T; 4]> {
        self.fresh().filter(|v| criteria(v)).collect()
    }
}
