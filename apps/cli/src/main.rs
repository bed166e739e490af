//! # robotside CLI
//!
//! 控制核心的命令行工具：在 Mock 驱动上仿真完整的控制循环，检查动画脚本，
//! 管理运行器配置文件。
//!
//! ```bash
//! # 生成默认配置
//! robotside-cli config init robot.toml
//!
//! # 驶向 (2, 1) 并在到达后螺旋吸尘，第 20 个周期撞一次保险杠
//! robotside-cli simulate --config robot.toml --goal 2,1 --action vacuum --bump-at 20 --json
//!
//! # 列出脚本中的动画
//! robotside-cli animations scripts/robot.anim --detail
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

mod commands;
mod sim;
mod sinks;

use commands::{AnimationsCommand, ConfigCommand, SimulateCommand};

/// 默认输出日志的 crate
const CRATES: [&str; 5] = [
    "robotside_cli",
    "robotside_core",
    "robotside_driver",
    "robotside_control",
    "robotside_runner",
];

/// robotside CLI - 控制核心仿真与工具
#[derive(Parser, Debug)]
#[command(name = "robotside-cli")]
#[command(about = "Simulator and tooling for the robotside control core", long_about = None)]
#[command(version)]
struct Cli {
    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 在 Mock 驱动上运行控制循环
    Simulate {
        #[command(flatten)]
        args: SimulateCommand,
    },

    /// 解析并列出动画脚本
    Animations {
        #[command(flatten)]
        args: AnimationsCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志：RUST_LOG 优先
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        let directives: Vec<String> = CRATES.iter().map(|c| format!("{}={}", c, level)).collect();
        EnvFilter::try_new(directives.join(","))
    })?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    match cli.command {
        Commands::Simulate { args } => args.execute(running),
        Commands::Animations { args } => args.execute(),
        Commands::Config(cmd) => cmd.execute(),
    }
}
