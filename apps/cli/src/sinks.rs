//! 把运行器的通知输出到日志和标准输出

use robotside_runner::{LogSink, Monitor, RunnerErrorKind, RunnerHandle, SoundSink};
use tracing::{error, info};

/// 状态变化时打印一行 JSON 快照
pub struct StatusPrinter {
    handle: RunnerHandle,
    json: bool,
    errors: usize,
}

impl StatusPrinter {
    pub fn new(handle: RunnerHandle, json: bool) -> Self {
        Self {
            handle,
            json,
            errors: 0,
        }
    }
}

impl Monitor for StatusPrinter {
    fn report_error(&mut self, kind: RunnerErrorKind, context: Option<&str>) {
        self.errors += 1;
        error!("[{}] {}", kind, context.unwrap_or("-"));
    }

    fn on_state_update(&mut self) {
        let status = self.handle.status();
        if self.json {
            match serde_json::to_string(&*status) {
                Ok(line) => println!("{}", line),
                Err(e) => error!("Failed to encode status: {}", e),
            }
        } else {
            info!(
                "cycle {} state {} speed {:.3} angular {:.3}",
                status.cycle, status.state, status.speed, status.angular
            );
        }
    }
}

/// 声音和状态消息只写日志
pub struct LogOutput;

impl SoundSink for LogOutput {
    fn play_sound(&mut self, name: &str) {
        info!("♪ {}", name);
    }
}

impl LogSink for LogOutput {
    fn log_status(&mut self, robot_uuid: Option<&str>, message: &str) {
        info!("[{}] {}", robot_uuid.unwrap_or("no robot"), message);
    }
}
