//! 动画脚本
//!
//! 动画是一串按顺序执行的命令：`SetMotor(linear, angular)`、`Wait(millis)`、
//! `PlayAudio("name")`。脚本文件由多个命名块组成：
//!
//! ```text
//! // 挥手
//! Wave() {
//!     SetMotor(0.5, 0.0);
//!     Wait(200);      // 保持 200ms
//!     SetMotor(0.0, 0.0);
//! }
//! ```
//!
//! 解析是全有或全无的：任意一处错误都会使整个文件失败，不返回部分结果。

use crate::error::AnimationError;
use smallvec::SmallVec;
use std::path::Path;
use tracing::trace;

/// 单条动画命令
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationCommand {
    /// 设置底盘速度（m/s, rad/s）
    SetMotor { linear: f64, angular: f64 },
    /// 暂停命令推进（毫秒）
    Wait { millis: u64 },
    /// 播放声音
    PlayAudio { name: String },
}

/// 已解析的动画，解析后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    name: String,
    commands: Vec<AnimationCommand>,
}

impl Animation {
    pub fn new(name: impl Into<String>, commands: Vec<AnimationCommand>) -> Self {
        Self {
            name: name.into(),
            commands,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[AnimationCommand] {
        &self.commands
    }

    /// 所有 Wait 的总时长（毫秒）
    pub fn total_wait_ms(&self) -> u64 {
        self.commands
            .iter()
            .map(|c| match c {
                AnimationCommand::Wait { millis } => *millis,
                _ => 0,
            })
            .sum()
    }
}

/// 按名称查找的动画集合
#[derive(Debug, Clone, Default)]
pub struct AnimationSet {
    animations: Vec<Animation>,
}

impl AnimationSet {
    /// 解析脚本文本
    pub fn parse(text: &str) -> Result<Self, AnimationError> {
        Ok(Self {
            animations: read_animation_file(text)?,
        })
    }

    /// 从磁盘加载脚本
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AnimationError> {
        Ok(Self {
            animations: read_animation_path(path)?,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Animation> {
        self.animations.iter().find(|a| a.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.animations.iter().map(|a| a.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }
}

/// 解析一个命令流：以 `;` 分隔的 `Function(args)` 列表
///
/// 空命令（连续的 `;`）被忽略。
pub fn read_animation(name: &str, content: &str) -> Result<Animation, AnimationError> {
    let mut commands = Vec::new();
    for line in content.split(';') {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        commands.push(parse_command(name, line)?);
    }
    trace!("Animation {} parsed with {} command(s)", name, commands.len());
    Ok(Animation::new(name, commands))
}

/// 解析单行形式 `Name(cmd; cmd; ...)`
pub fn read_animation_call(text: &str) -> Result<Animation, AnimationError> {
    let text = text.trim();
    let open = text.find('(').ok_or_else(|| AnimationError::MissingParenthesis {
        animation: String::new(),
        line: text.to_string(),
    })?;
    let name = text[..open].trim();
    validate_identifier(name)?;
    if !text.ends_with(')') {
        return Err(AnimationError::MissingClosingParenthesis {
            animation: name.to_string(),
            line: text.to_string(),
        });
    }
    read_animation(name, &text[open + 1..text.len() - 1])
}

/// 解析脚本文件文本
pub fn read_animation_file(text: &str) -> Result<Vec<Animation>, AnimationError> {
    let text = strip_comments(text)?;
    let mut animations = Vec::new();
    let mut rest = text.as_str();

    loop {
        // 名称：直到 '(' 为止，';' 被忽略
        let Some(open) = rest.find('(') else {
            let leftover: String = rest.chars().filter(|c| *c != ';').collect();
            let leftover = leftover.trim();
            if !leftover.is_empty() {
                return Err(AnimationError::UnterminatedName {
                    name: leftover.to_string(),
                });
            }
            break;
        };
        let header: String = rest[..open].chars().filter(|c| *c != ';').collect();
        let name = header
            .split_whitespace()
            .last()
            .ok_or(AnimationError::MissingName)?
            .to_string();
        validate_identifier(&name)?;

        let after_name = &rest[open..];
        let brace = after_name
            .find('{')
            .ok_or_else(|| AnimationError::MissingBody { name: name.clone() })?;
        let body_and_rest = &after_name[brace + 1..];
        let close = body_and_rest
            .find('}')
            .ok_or_else(|| AnimationError::UnterminatedBlock { name: name.clone() })?;

        animations.push(read_animation(&name, &body_and_rest[..close])?);
        rest = &body_and_rest[close + 1..];
    }

    Ok(animations)
}

/// 从磁盘读取并解析脚本文件
pub fn read_animation_path<P: AsRef<Path>>(path: P) -> Result<Vec<Animation>, AnimationError> {
    let text = std::fs::read_to_string(path)?;
    read_animation_file(&text)
}

fn parse_command(animation: &str, line: &str) -> Result<AnimationCommand, AnimationError> {
    let open = line.find('(').ok_or_else(|| AnimationError::MissingParenthesis {
        animation: animation.to_string(),
        line: line.to_string(),
    })?;
    if !line.ends_with(')') {
        return Err(AnimationError::MissingClosingParenthesis {
            animation: animation.to_string(),
            line: line.to_string(),
        });
    }

    let function = line[..open].trim();
    let params: SmallVec<[&str; 2]> = line[open + 1..line.len() - 1]
        .split(',')
        .map(str::trim)
        .collect();

    let expect_args = |expected: usize| {
        if params.len() == expected {
            Ok(())
        } else {
            Err(AnimationError::WrongArgumentCount {
                animation: animation.to_string(),
                function: function.to_string(),
                expected,
                actual: params.len(),
            })
        }
    };
    let invalid_number = |value: &str| AnimationError::InvalidNumber {
        animation: animation.to_string(),
        function: function.to_string(),
        value: value.to_string(),
    };

    match function {
        "SetMotor" => {
            expect_args(2)?;
            let parse = |v: &str| {
                v.parse::<f64>()
                    .ok()
                    .filter(|x| x.is_finite())
                    .ok_or_else(|| invalid_number(v))
            };
            Ok(AnimationCommand::SetMotor {
                linear: parse(params[0])?,
                angular: parse(params[1])?,
            })
        }
        "Wait" => {
            expect_args(1)?;
            let millis = params[0].parse::<u64>().map_err(|_| invalid_number(params[0]))?;
            Ok(AnimationCommand::Wait { millis })
        }
        "PlayAudio" => {
            expect_args(1)?;
            let name = unquote(params[0]);
            if name.is_empty() {
                return Err(AnimationError::EmptyAudioName {
                    animation: animation.to_string(),
                });
            }
            Ok(AnimationCommand::PlayAudio {
                name: name.to_string(),
            })
        }
        _ => Err(AnimationError::UnknownFunction {
            animation: animation.to_string(),
            function: function.to_string(),
        }),
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

fn validate_identifier(name: &str) -> Result<(), AnimationError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(AnimationError::MissingName);
    };
    let is_start = |c: char| c.is_alphabetic() || c == '_' || c == '$';
    if !is_start(first) || !chars.all(|c| is_start(c) || c.is_alphanumeric()) {
        return Err(AnimationError::InvalidIdentifier {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// 去掉 `//`、`\\` 行注释和 `/* */` 块注释（保留换行）
fn strip_comments(text: &str) -> Result<String, AnimationError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('/', Some('/')) | ('\\', Some('\\')) => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' || next == '\r' {
                        break;
                    }
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                let mut closed = false;
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        closed = true;
                        break;
                    }
                    prev = next;
                }
                if !closed {
                    return Err(AnimationError::UnterminatedComment);
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}
