use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "RFP_MATCHER";
const DEFAULT_CONFIG_FILE: &str = "rfp-matcher";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub oracle: OracleConfig,
    pub matching: MatchingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 推理 oracle 使用的 OpenAI 兼容 chat completion 接口
#[derive(Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

// 启动日志中不输出 api_key
impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// 每条明细交给 oracle 的候选数
    pub candidate_limit: usize,
    /// 单批内 oracle 并发调用上限
    pub max_concurrency: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub default_margin_percent: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: std::env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(3000),
            },
            oracle: OracleConfig {
                base_url: "https://api.groq.com/openai/v1".to_string(),
                model: "llama-3.3-70b-versatile".to_string(),
                api_key: std::env::var("GROQ_API_KEY").ok(),
                temperature: 0.2,
                timeout_secs: 30,
            },
            matching: MatchingConfig::default(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            candidate_limit: 5,
            max_concurrency: 8,
            max_retries: 2,
            retry_backoff_ms: 250,
            default_margin_percent: 20.0,
        }
    }
}

impl AppConfig {
    /// 加载配置: 内置默认值 -> 可选配置文件
    /// （`RFP_MATCHER_CONFIG` 或 `rfp-matcher.{toml,json,yaml}`）->
    /// `RFP_MATCHER_<SECTION>__<KEY>` 环境变量。
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("RFP_MATCHER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
