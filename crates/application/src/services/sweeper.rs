use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::services::link_service::LinkService;

/// 周期性过期清扫任务，整个进程只运行一个
pub struct ExpirationSweeper {
    links: Arc<LinkService>,
    interval: Duration,
}

impl ExpirationSweeper {
    pub fn new(links: Arc<LinkService>, interval: Duration) -> Self {
        Self { links, interval }
    }

    /// 在后台运行，直到 `shutdown` 被取消
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "expiration sweeper started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.tick().await,
            }
        }

        tracing::info!("expiration sweeper stopped");
    }

    async fn tick(&self) {
        match self.links.run_expiration_sweep().await {
            Ok(report) if report.is_idle() => {}
            Ok(report) => {
                tracing::info!(
                    expired = report.expired,
                    released = report.released,
                    failed = report.failed,
                    "expiration sweep completed"
                );
            }
            // 存储故障不是致命错误，下一次 tick 重试
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    transient = err.is_transient(),
                    "expiration sweep failed"
                );
            }
        }
    }
}
