//! 检查动画脚本文件

use anyhow::{Context, Result};
use clap::Args;
use robotside_core::{AnimationCommand, AnimationSet};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct AnimationsCommand {
    /// 动画脚本文件
    pub file: PathBuf,

    /// 同时列出每条命令
    #[arg(short, long)]
    pub detail: bool,
}

impl AnimationsCommand {
    pub fn execute(&self) -> Result<()> {
        let set = AnimationSet::load(&self.file)
            .with_context(|| format!("failed to parse {}", self.file.display()))?;

        println!("{} animation(s) in {}", set.len(), self.file.display());
        for name in set.names() {
            let Some(animation) = set.get(name) else {
                continue;
            };
            println!(
                "  {:<20} {:>3} command(s) {:>6} ms",
                name,
                animation.commands().len(),
                animation.total_wait_ms()
            );
            if self.detail {
                for command in animation.commands() {
                    println!("      {}", describe(command));
                }
            }
        }
        Ok(())
    }
}

fn describe(command: &AnimationCommand) -> String {
    match command {
        AnimationCommand::SetMotor { linear, angular } => {
            format!("SetMotor({:.2}, {:.2})", linear, angular)
        },
        AnimationCommand::Wait { millis } => format!("Wait({})", millis),
        AnimationCommand::PlayAudio { name } => format!("PlayAudio({})", name),
    }
}
