//! 推理 oracle 边界
//!
//! oracle 是外部文本生成服务：输入指令和上下文，返回自由文本。
//! 本模块负责把这些文本转换为类型化结果，且不信任其内容。

pub mod adapter;
pub mod client;
pub mod parse;
pub mod prompts;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use adapter::{complete_with_policy, match_line_item, CallPolicy};
pub use client::ChatCompletionOracle;
pub use parse::{parse_json_payload, parse_verdict, ParseFailure};

/// 一次 oracle 调用: 系统指令 + 任务上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRequest {
    pub instructions: String,
    pub context: String,
}

impl OracleRequest {
    pub fn new(instructions: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            context: context.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("oracle returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("oracle returned no content")]
    EmptyResponse,

    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),

    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

impl OracleError {
    /// 退避后是否值得重试
    pub fn is_transient(&self) -> bool {
        match self {
            OracleError::Unreachable(_)
            | OracleError::Timeout(_)
            | OracleError::Unavailable(_) => true,
            OracleError::Status { status, .. } => *status == 429 || *status >= 500,
            OracleError::EmptyResponse => false,
        }
    }
}

/// 外部推理服务
#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    /// 自由文本输出，不保证任何格式
    async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError>;

    fn model_name(&self) -> &str;
}
