//! 配置文件命令
//!
//! 查看生效配置、生成默认配置文件

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use robotside_runner::RunnerConfig;
use std::path::{Path, PathBuf};

/// 读取配置；未指定路径时使用默认配置
pub fn load_config(path: Option<&Path>) -> Result<RunnerConfig> {
    match path {
        Some(path) => RunnerConfig::load_from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(RunnerConfig::default()),
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印生效的配置（TOML）
    Show {
        /// 配置文件（缺省为内置默认值）
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// 写出默认配置文件
    Init {
        /// 目标路径
        path: PathBuf,

        /// 覆盖已存在的文件
        #[arg(short, long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Show { config } => {
                let config = load_config(config.as_deref())?;
                print!("{}", config.to_toml_string()?);
                Ok(())
            },
            ConfigCommand::Init { path, force } => {
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                RunnerConfig::default()
                    .save_to_file(&path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("✅ Wrote default config to {}", path.display());
                Ok(())
            },
        }
    }
}
