//! 取出即清空的消息队列
//!
//! 控制器把待播放的声音、待上报的状态字符串放入队列，外部系统每周期
//! 调用一次 [`MessageQueue::take_all`]，每条消息恰好被消费一次。

use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct MessageQueue {
    items: Mutex<Vec<String>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: impl Into<String>) {
        self.items.lock().push(item.into());
    }

    /// 返回全部消息并清空
    pub fn take_all(&self) -> Vec<String> {
        std::mem::take(&mut *self.items.lock())
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_take_all_clears() {
        let q = MessageQueue::new();
        q.push("a");
        q.push(String::from("b"));
        assert_eq!(q.len(), 2);
        assert_eq!(q.take_all(), vec!["a".to_string(), "b".to_string()]);
        assert!(q.is_empty());
        assert!(q.take_all().is_empty());
    }

    /// 并发写入，消费者取到的总数等于写入总数
    #[test]
    fn test_concurrent_push_take() {
        let q = Arc::new(MessageQueue::new());
        let mut handles = Vec::new();
        for t in 0..4 {
            let q = q.clone();
            handles.push(thread::spawn(move || {
                for i in 0..250 {
                    q.push(format!("{}-{}", t, i));
                }
            }));
        }
        let mut taken = 0;
        while handles.iter().any(|h| !h.is_finished()) {
            taken += q.take_all().len();
            thread::yield_now();
        }
        for h in handles {
            h.join().unwrap();
        }
        taken += q.take_all().len();
        assert_eq!(taken, 1000);
    }
}
