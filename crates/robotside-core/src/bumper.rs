//! 保险杠编号

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// 被触发的保险杠区域
///
/// 原始读数 0 表示未触发，1..=4 依次为右、中左、中右、左。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    TryFromPrimitive,
    IntoPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
pub enum BumperId {
    None = 0,
    Right = 1,
    CenterLeft = 2,
    CenterRight = 3,
    Left = 4,
}

impl Default for BumperId {
    fn default() -> Self {
        BumperId::None
    }
}

impl BumperId {
    pub fn is_pressed(self) -> bool {
        self != BumperId::None
    }
}
