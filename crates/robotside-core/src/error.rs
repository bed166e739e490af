//! 核心层错误类型定义

use thiserror::Error;

/// 动画脚本解析错误
///
/// 任意一个错误都会使整个脚本文件解析失败。
#[derive(Error, Debug)]
pub enum AnimationError {
    /// 命令缺少 '('
    #[error("Animation {animation}: bad line, no '(': {line}")]
    MissingParenthesis { animation: String, line: String },

    /// 命令不以 ')' 结尾
    #[error("Animation {animation}: bad line, does not end with ')': {line}")]
    MissingClosingParenthesis { animation: String, line: String },

    /// 参数个数错误
    #[error("Animation {animation}: {function} expects {expected} parameter(s), got {actual}")]
    WrongArgumentCount {
        animation: String,
        function: String,
        expected: usize,
        actual: usize,
    },

    /// 数值参数无法解析
    #[error("Animation {animation}: failed to parse number '{value}' in {function}")]
    InvalidNumber {
        animation: String,
        function: String,
        value: String,
    },

    /// 不在允许列表中的函数
    #[error("Animation {animation}: invalid command {function}")]
    UnknownFunction { animation: String, function: String },

    /// PlayAudio 的声音名称为空
    #[error("Animation {animation}: empty audio name")]
    EmptyAudioName { animation: String },

    /// 动画名称不是合法标识符
    #[error("Invalid animation name: {name}")]
    InvalidIdentifier { name: String },

    /// 动画没有名称
    #[error("Nameless animation")]
    MissingName,

    /// 名称之后文件结束，没有 '('
    #[error("Animation name never ends: {name}")]
    UnterminatedName { name: String },

    /// 没有 '{' 开始的动画体
    #[error("Animation never starts: {name}")]
    MissingBody { name: String },

    /// 动画体没有 '}' 结束
    #[error("Animation never stops: {name}")]
    UnterminatedBlock { name: String },

    /// 块注释没有结束
    #[error("Unterminated block comment")]
    UnterminatedComment,

    /// 读取脚本文件失败
    #[error("Failed to read animation file: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::AnimationError;

    /// 测试 AnimationError 的 Display 实现
    #[test]
    fn test_animation_error_display() {
        let err = AnimationError::WrongArgumentCount {
            animation: "Wave".to_string(),
            function: "SetMotor".to_string(),
            expected: 2,
            actual: 3,
        };
        assert_eq!(
            format!("{}", err),
            "Animation Wave: SetMotor expects 2 parameter(s), got 3"
        );

        let err = AnimationError::UnterminatedBlock {
            name: "Wave".to_string(),
        };
        assert_eq!(format!("{}", err), "Animation never stops: Wave");

        let err = AnimationError::MissingName;
        assert_eq!(format!("{}", err), "Nameless animation");
    }

    /// 测试 From<io::Error> 转换
    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AnimationError = io.into();
        match err {
            AnimationError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("Expected Io variant"),
        }
    }
}
