/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use crate::config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化全局日志
///
/// `RUST_LOG` 优先于 `level`；重复调用时保留第一次的设置
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 小说分片分析模式");
    info!("📖 小说文件: {}", config.novel_file.display());
    info!("📊 并发数: {}", config.worker_count);
    info!(
        "🚦 限流: 每 {:?} 最多 {} 个请求",
        config.rate_window, config.max_requests_per_window
    );
    info!("{}", "=".repeat(60));
}

/// 记录分片就绪信息
///
/// # 参数
/// - `total`: 分片总数
/// - `worker_count`: 并发数
pub fn log_shards_ready(total: usize, worker_count: usize) {
    info!("✓ 共 {} 个分片待分析", total);
    info!("📋 最多同时处理 {} 个分片", worker_count);
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `report_path`: 最终报告路径
pub fn print_final_stats(success: usize, failed: usize, report_path: &std::path::Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, success + failed);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n分析报告已保存至: {}", report_path.display());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
