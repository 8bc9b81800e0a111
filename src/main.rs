use anyhow::Result;
use novel_reader::utils::logging;
use novel_reader::{App, Config};
use std::path::PathBuf;
use tracing::{error, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置，命令行第一个参数可覆盖小说路径
    let mut config = Config::from_env();
    if let Some(path) = std::env::args_os().nth(1) {
        config.novel_file = PathBuf::from(path);
    }

    // 初始化日志
    logging::init(&config.log_level);

    let app = App::initialize(config)?;

    let cancel = app.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⏹️ 收到中断信号，正在停止...");
            cancel.cancel();
        }
    });

    if let Err(e) = app.run().await {
        error!("❌ 处理过程中发生错误: {:#}", e);
        return Err(e);
    }

    Ok(())
}
