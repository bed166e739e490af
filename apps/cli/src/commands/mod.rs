//! 命令定义和实现

pub mod animations;
pub mod config;
pub mod simulate;

pub use animations::AnimationsCommand;
pub use config::ConfigCommand;
pub use simulate::SimulateCommand;
