use crate::error::{AppError, AppResult, ConfigError, FileError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// 默认章节识别规则，`num` 捕获组为"第"与"章"之间的编号
pub const DEFAULT_CHAPTER_PATTERN: &str =
    r"^第(?P<num>[零〇一二两三四五六七八九十百千万0-9]+)章(?:\s+.*)?$";

/// 程序配置
///
/// 所有组件都从这里取参数，不使用全局常量
#[derive(Clone, Debug)]
pub struct Config {
    /// 小说源文件
    pub novel_file: PathBuf,
    /// 书名（用于提示词和最终报告标题）
    pub novel_title: String,
    /// 输出根目录
    pub output_dir: PathBuf,
    /// 分片文本目录
    pub split_chapters_dir: PathBuf,
    /// 单分片分析结果目录
    pub api_results_dir: PathBuf,
    /// 最终合并报告
    pub final_report_file: PathBuf,
    /// 提示词模板文件（不存在时使用内置模板）
    pub prompt_file: PathBuf,
    /// API 密钥文件（TOML，`api_key = "..."`）
    pub api_key_file: PathBuf,
    /// 章节标题识别规则，必须包含 `num` 捕获组
    pub chapter_pattern: String,
    /// 每个分片包含的章节数
    pub chapters_per_shard: usize,
    /// 跳过索引和分割，直接从 `split_chapters_dir` 读取已有分片
    pub reuse_split_files: bool,
    /// 每个时间窗口允许的请求数
    pub max_requests_per_window: u32,
    /// 限流时间窗口
    pub rate_window: Duration,
    /// 同时处理的分片数量
    pub worker_count: usize,
    /// 单次请求失败后的最大重试次数
    pub max_retries: u32,
    /// 重试间隔（固定，不做指数退避）
    pub retry_delay: Duration,
    /// 单次网络请求超时
    pub request_timeout: Duration,
    // --- 生成 API 配置 ---
    pub api_base_url: String,
    pub model_name: String,
    /// 日志级别（RUST_LOG 优先）
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let output_dir = PathBuf::from("output");
        Self {
            novel_file: PathBuf::from("牧神记.txt"),
            novel_title: "牧神记".to_string(),
            split_chapters_dir: output_dir.join("split_chapters"),
            api_results_dir: output_dir.join("api_results"),
            final_report_file: output_dir.join("final_analysis.txt"),
            output_dir,
            prompt_file: PathBuf::from("prompt.txt"),
            api_key_file: PathBuf::from("apikey.toml"),
            chapter_pattern: DEFAULT_CHAPTER_PATTERN.to_string(),
            chapters_per_shard: 10,
            reuse_split_files: false,
            max_requests_per_window: 15,
            rate_window: Duration::from_secs(60),
            worker_count: 10,
            max_retries: 3,
            retry_delay: Duration::from_millis(5000),
            request_timeout: Duration::from_secs(120),
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model_name: "gemini-1.5-pro-latest".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置，未设置或无法解析的项使用默认值
    ///
    /// 设置 `OUTPUT_DIR` 时，三个输出路径都会随之移动，除非单独指定
    pub fn from_env() -> Self {
        let default = Self::default();
        let output_dir = env_path("OUTPUT_DIR").unwrap_or(default.output_dir);
        Self {
            novel_file: env_path("NOVEL_FILE").unwrap_or(default.novel_file),
            novel_title: std::env::var("NOVEL_TITLE").unwrap_or(default.novel_title),
            split_chapters_dir: env_path("SPLIT_CHAPTERS_DIR")
                .unwrap_or_else(|| output_dir.join("split_chapters")),
            api_results_dir: env_path("API_RESULTS_DIR")
                .unwrap_or_else(|| output_dir.join("api_results")),
            final_report_file: env_path("FINAL_REPORT_FILE")
                .unwrap_or_else(|| output_dir.join("final_analysis.txt")),
            output_dir,
            prompt_file: env_path("PROMPT_FILE").unwrap_or(default.prompt_file),
            api_key_file: env_path("API_KEY_FILE").unwrap_or(default.api_key_file),
            chapter_pattern: std::env::var("CHAPTER_PATTERN").unwrap_or(default.chapter_pattern),
            chapters_per_shard: env_parse("CHAPTERS_PER_SHARD", default.chapters_per_shard),
            reuse_split_files: env_parse("REUSE_SPLIT_FILES", default.reuse_split_files),
            max_requests_per_window: env_parse(
                "MAX_REQUESTS_PER_WINDOW",
                default.max_requests_per_window,
            ),
            rate_window: Duration::from_secs(env_parse(
                "RATE_WINDOW_SECS",
                default.rate_window.as_secs(),
            )),
            worker_count: env_parse("WORKER_COUNT", default.worker_count),
            max_retries: env_parse("MAX_RETRIES", default.max_retries),
            retry_delay: Duration::from_millis(env_parse(
                "RETRY_DELAY_MS",
                default.retry_delay.as_millis() as u64,
            )),
            request_timeout: Duration::from_secs(env_parse(
                "REQUEST_TIMEOUT_SECS",
                default.request_timeout.as_secs(),
            )),
            api_base_url: std::env::var("API_BASE_URL").unwrap_or(default.api_base_url),
            model_name: std::env::var("MODEL_NAME").unwrap_or(default.model_name),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(default.log_level),
        }
    }
}

fn env_path(var_name: &str) -> Option<PathBuf> {
    std::env::var_os(var_name).map(PathBuf::from)
}

fn env_parse<T: FromStr>(var_name: &str, default: T) -> T {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("⚠️ 环境变量 {} 的值 '{}' 无法解析，使用默认值", var_name, value);
            default
        }),
        Err(_) => default,
    }
}

#[derive(Debug, Deserialize)]
struct ApiKeyFile {
    api_key: Option<String>,
}

/// 加载 API 密钥
///
/// `API_KEY` 环境变量优先，否则读取 `config.api_key_file`。
/// 文件不存在、缺少字段或密钥为空都是启动期致命错误。
pub fn load_api_key(config: &Config) -> AppResult<String> {
    if let Ok(key) = std::env::var("API_KEY") {
        if !key.trim().is_empty() {
            info!("✓ 已从环境变量加载API密钥");
            return Ok(key.trim().to_string());
        }
    }
    load_api_key_file(&config.api_key_file)
}

/// 从 TOML 密钥文件读取 `api_key`
pub fn load_api_key_file(path: &Path) -> AppResult<String> {
    if !path.exists() {
        return Err(ConfigError::ApiKeyFileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::file_read_failed(path, e))?;

    let parsed: ApiKeyFile = toml::from_str(&content).map_err(|source| FileError::TomlParseFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let key = parsed.api_key.ok_or_else(|| ConfigError::ApiKeyMissing {
        path: path.to_path_buf(),
    })?;

    if key.trim().is_empty() {
        return Err(ConfigError::ApiKeyEmpty.into());
    }

    info!("✓ 成功加载API密钥");
    Ok(key.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_pipeline_constants() {
        let config = Config::default();
        assert_eq!(config.chapters_per_shard, 10);
        assert_eq!(config.max_requests_per_window, 15);
        assert_eq!(config.rate_window, Duration::from_secs(60));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(5));
        assert!(config.split_chapters_dir.starts_with(&config.output_dir));
    }

    #[test]
    fn test_load_api_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apikey.toml");
        std::fs::write(&path, "api_key = \"  secret-key \"\n").unwrap();

        assert_eq!(load_api_key_file(&path).unwrap(), "secret-key");
    }

    #[test]
    fn test_load_api_key_file_rejects_empty_and_missing() {
        let dir = tempfile::tempdir().unwrap();

        let empty = dir.path().join("empty.toml");
        std::fs::write(&empty, "api_key = \"\"\n").unwrap();
        assert!(matches!(
            load_api_key_file(&empty),
            Err(AppError::Config(ConfigError::ApiKeyEmpty))
        ));

        let missing_field = dir.path().join("other.toml");
        std::fs::write(&missing_field, "model = \"x\"\n").unwrap();
        assert!(matches!(
            load_api_key_file(&missing_field),
            Err(AppError::Config(ConfigError::ApiKeyMissing { .. }))
        ));

        let absent = dir.path().join("absent.toml");
        assert!(matches!(
            load_api_key_file(&absent),
            Err(AppError::Config(ConfigError::ApiKeyFileNotFound { .. }))
        ));
    }
}
