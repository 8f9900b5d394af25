//! 存储调用超时
//!
//! 每次存储调用都有上限，慢存储不会让请求或清扫任务无限挂起。
//! 超时会被转换为 `RepositoryError::Timeout`，上层归类为可重试错误。
//! 这里不做自动重试。

use std::future::Future;
use std::time::Duration;

use domain::{RepositoryError, RepositoryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTimeouts {
    /// 单条记录的读写
    pub point: Duration,
    /// 扫描 / 批量操作
    pub scan: Duration,
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        Self {
            point: Duration::from_secs(10),
            scan: Duration::from_secs(30),
        }
    }
}

impl StoreTimeouts {
    pub async fn point<T, F>(&self, operation: &'static str, call: F) -> RepositoryResult<T>
    where
        F: Future<Output = RepositoryResult<T>>,
    {
        bounded(self.point, operation, call).await
    }

    pub async fn scan<T, F>(&self, operation: &'static str, call: F) -> RepositoryResult<T>
    where
        F: Future<Output = RepositoryResult<T>>,
    {
        bounded(self.scan, operation, call).await
    }
}

async fn bounded<T, F>(limit: Duration, operation: &'static str, call: F) -> RepositoryResult<T>
where
    F: Future<Output = RepositoryResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                operation,
                timeout_ms = limit.as_millis() as u64,
                "store call timed out"
            );
            Err(RepositoryError::timeout(operation))
        }
    }
}
