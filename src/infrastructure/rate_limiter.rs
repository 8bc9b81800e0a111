//! 请求限流器 - 基础设施层
//!
//! 固定窗口计数：每个窗口最多放行 `quota` 个请求，超出的调用方
//! 一起等到窗口边界，再一起放行。窗口刚重置时可能出现突发请求，
//! 这是固定窗口本身的取舍。

use crate::config::Config;
use crate::error::RateLimitError;
use crate::infrastructure::CancelToken;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct WindowState {
    /// 当前窗口已放行（含正在等待）的请求数
    admitted: u32,
    /// 等待下一个窗口的调用方数量
    waiting: u32,
    closed: bool,
}

struct Shared {
    quota: u32,
    state: Mutex<WindowState>,
    /// 每次窗口重置或关闭时递增，唤醒所有等待者
    generation: watch::Sender<u64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reset_window(&self) {
        let mut state = self.lock();
        if state.waiting > 0 {
            info!("⏱️ 新的限流窗口开始，放行 {} 个等待中的请求", state.waiting);
        }
        // 被放行的等待者计入新窗口
        state.admitted = state.waiting;
        state.waiting = 0;
        self.generation.send_modify(|g| *g += 1);
    }
}

/// 请求限流器
///
/// 生命周期：`new` → 多次 `acquire` → `shutdown`。
/// 窗口计时器是私有的后台任务，随 `shutdown` 或析构停止。
pub struct RateLimiter {
    shared: Arc<Shared>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    /// 创建限流器并启动窗口计时器，必须在 tokio 运行时内调用
    pub fn new(quota: u32, window: Duration) -> Self {
        let quota = quota.max(1);
        let (generation, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            quota,
            state: Mutex::new(WindowState::default()),
            generation,
        });

        let timer_shared = Arc::clone(&shared);
        let first_reset = Instant::now() + window;
        let timer = tokio::spawn(async move {
            let mut ticker = interval_at(first_reset, window);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                timer_shared.reset_window();
            }
        });

        debug!("限流器已启动: 每 {:?} 最多 {} 个请求", window, quota);
        Self {
            shared,
            timer: Mutex::new(Some(timer)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_requests_per_window, config.rate_window)
    }

    pub fn quota(&self) -> u32 {
        self.shared.quota
    }

    /// 申请一个请求名额
    ///
    /// 当前窗口未满时立即返回；否则阻塞到窗口重置。
    /// 限流器关闭后（包括等待期间被关闭）返回 [`RateLimitError::Shutdown`]。
    /// 等待中途放弃（future 被丢弃）时会归还占用的计数。
    pub async fn acquire(&self) -> Result<(), RateLimitError> {
        let (mut generation, ticket) = {
            let mut state = self.shared.lock();
            if state.closed {
                return Err(RateLimitError::Shutdown);
            }

            state.admitted += 1;
            if state.admitted <= self.shared.quota {
                return Ok(());
            }

            state.waiting += 1;
            info!("🚦 已达到每个窗口 {} 个请求的限制，等待下一个时间窗口...", self.shared.quota);
            // 持锁订阅，保证不会错过紧随其后的重置
            let rx = self.shared.generation.subscribe();
            let ticket = *rx.borrow();
            (rx, ticket)
        };

        let mut pending = PendingWait {
            shared: &self.shared,
            ticket,
            finished: false,
        };
        let changed = generation.changed().await;
        pending.finished = true;

        if changed.is_err() || self.shared.lock().closed {
            return Err(RateLimitError::Shutdown);
        }
        Ok(())
    }

    /// 申请名额，等待期间可被取消
    ///
    /// 已取消时不占用名额，直接返回 [`RateLimitError::Cancelled`]
    pub async fn acquire_or_cancel(&self, cancel: &CancelToken) -> Result<(), RateLimitError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("等待限流名额时收到取消信号");
                Err(RateLimitError::Cancelled)
            }
            result = self.acquire() => result,
        }
    }

    /// 停止窗口计时器，唤醒所有等待者并让它们返回错误
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.waiting = 0;
            self.shared.generation.send_modify(|g| *g += 1);
        }

        if let Some(timer) = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            timer.abort();
        }
        info!("🛑 限流器已关闭");
    }
}

/// 一次阻塞中的 `acquire`，被丢弃且未完成时归还计数
struct PendingWait<'a> {
    shared: &'a Shared,
    /// 开始等待时的窗口代数
    ticket: u64,
    finished: bool,
}

impl Drop for PendingWait<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self.shared.lock();
        if state.closed {
            return;
        }
        let current = *self.shared.generation.borrow();
        if current == self.ticket {
            // 仍在等待：退出等待队列
            state.waiting = state.waiting.saturating_sub(1);
            state.admitted = state.admitted.saturating_sub(1);
        } else if current == self.ticket.wrapping_add(1) {
            // 已被放行进新窗口但没用上
            state.admitted = state.admitted.saturating_sub(1);
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WINDOW: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_quota_admits_immediately() {
        let limiter = RateLimiter::new(3, WINDOW);
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await.unwrap();
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_excess_callers_release_together_at_window_boundary() {
        let limiter = Arc::new(RateLimiter::new(3, WINDOW));
        let start = Instant::now();
        let done = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = Arc::clone(&limiter);
            let done = Arc::clone(&done);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await.unwrap();
                done.fetch_add(1, Ordering::SeqCst);
                start.elapsed()
            }));
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(done.load(Ordering::SeqCst), 3);

        let mut elapsed = Vec::new();
        for handle in handles {
            elapsed.push(handle.await.unwrap());
        }
        elapsed.sort();

        assert_eq!(&elapsed[..3], &[Duration::ZERO; 3]);
        assert_eq!(&elapsed[3..], &[WINDOW; 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_released_callers_count_against_new_window() {
        let limiter = Arc::new(RateLimiter::new(2, WINDOW));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(start.elapsed(), WINDOW);

        // 新窗口已有 1 个被放行的请求，再来 1 个可立即通过，第 3 个需等下个窗口
        limiter.acquire().await.unwrap();
        assert_eq!(start.elapsed(), WINDOW);
        limiter.acquire().await.unwrap();
        assert_eq!(start.elapsed(), WINDOW * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_releases_blocked_caller_and_its_slot() {
        let limiter = Arc::new(RateLimiter::new(1, WINDOW));
        let cancel = CancelToken::new();
        let start = Instant::now();
        limiter.acquire().await.unwrap();

        let blocked = {
            let limiter = Arc::clone(&limiter);
            let cancel = cancel.clone();
            tokio::spawn(async move { limiter.acquire_or_cancel(&cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        assert_eq!(blocked.await.unwrap(), Err(RateLimitError::Cancelled));
        assert_eq!(start.elapsed(), Duration::from_secs(1));

        // 放弃的等待者不计入下一个窗口
        tokio::time::sleep_until(start + WINDOW + Duration::from_secs(1)).await;
        let before = Instant::now();
        limiter.acquire().await.unwrap();
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_or_cancel_after_cancel_takes_no_slot() {
        let limiter = RateLimiter::new(1, WINDOW);
        let cancel = CancelToken::new();
        cancel.cancel();

        assert_eq!(
            limiter.acquire_or_cancel(&cancel).await,
            Err(RateLimitError::Cancelled)
        );
        let start = Instant::now();
        limiter.acquire().await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_blocked_callers() {
        let limiter = Arc::new(RateLimiter::new(1, WINDOW));
        limiter.acquire().await.unwrap();

        let blocked = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire().await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        limiter.shutdown();

        assert_eq!(blocked.await.unwrap(), Err(RateLimitError::Shutdown));
        assert_eq!(limiter.acquire().await, Err(RateLimitError::Shutdown));
    }
}
