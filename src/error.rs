use std::path::{Path, PathBuf};
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 章节校验错误
    #[error("章节校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 限流器错误
    #[error("限流器错误: {0}")]
    RateLimit(#[from] RateLimitError),
    /// 任务被外部取消
    #[error("任务已取消")]
    Cancelled,
}

/// 无法解析编号的章节标题
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnparsableTitle {
    /// 行号（从1开始）
    pub source_line: usize,
    /// 原始标题行
    pub title: String,
}

/// 章节校验错误
///
/// 出现任何一种都必须在分割之前终止流程
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 章节编号不连续、重复、乱序、越界或无法解析
    #[error(
        "章节编号校验失败: 缺失 {missing:?}, 重复 {duplicates:?}, 乱序 {out_of_order:?}, 越界 {out_of_range:?}, 无法解析 {} 处",
        .unparsable.len()
    )]
    Numbering {
        missing: Vec<u32>,
        duplicates: Vec<u32>,
        out_of_order: Vec<u32>,
        /// 大于标题总数的编号，不可能属于连续的 `1..=N`
        out_of_range: Vec<u32>,
        unparsable: Vec<UnparsableTitle>,
    },
    /// 没有识别到任何章节
    #[error("未识别到任何章节标题")]
    NoChapters,
    /// 章节识别规则无效
    #[error("章节识别规则无效 ({pattern}): {reason}")]
    InvalidPattern { pattern: String, reason: String },
    /// 分片大小为 0
    #[error("每个分片的章节数必须大于 0")]
    ZeroGroupSize,
    /// 分片序号不是从 1 开始的连续序列（缺号或重复）
    #[error("分片序号不连续: 期望第 {expected} 个分片，实际为第 {found} 个")]
    ShardIndex { expected: usize, found: usize },
    /// 分片章节范围与前一个分片不衔接，或起止颠倒
    #[error("分片 {index} 的章节范围 第{start}-{end}章 无效，应从第{expected_start}章开始")]
    ShardRange {
        index: usize,
        start: u32,
        end: u32,
        expected_start: u32,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    #[error("文件不存在: {}", .path.display())]
    NotFound { path: PathBuf },
    #[error("读取文件失败 ({}): {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("写入文件失败 ({}): {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("创建目录失败 ({}): {source}", .path.display())]
    CreateDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON序列化失败 ({}): {source}", .path.display())]
    JsonFailed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("TOML解析失败 ({}): {source}", .path.display())]
    TomlParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// API 调用错误（单次请求）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// 网络层失败
    #[error("请求发送失败: {message}")]
    Transport { message: String },
    /// 非成功状态码
    #[error("API调用失败，状态码: {status}, 响应体: {body}")]
    BadStatus { status: u16, body: String },
    /// 单次请求超时
    #[error("请求超时 ({timeout_ms}ms)")]
    Timeout { timeout_ms: u64 },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API密钥文件不存在: {}", .path.display())]
    ApiKeyFileNotFound { path: PathBuf },
    #[error("API密钥文件缺少 api_key 字段: {}", .path.display())]
    ApiKeyMissing { path: PathBuf },
    #[error("API密钥为空")]
    ApiKeyEmpty,
}

/// 限流器错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RateLimitError {
    #[error("限流器已关闭")]
    Shutdown,
    /// 等待名额期间收到取消信号
    #[error("任务已取消")]
    Cancelled,
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }

    /// 创建目录创建错误
    pub fn create_dir_failed(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::File(FileError::CreateDirFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
