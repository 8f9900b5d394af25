use async_trait::async_trait;
use domain::PasswordHash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordHasherError {
    #[error("failed to hash credential: {0}")]
    Hashing(String),
    #[error("failed to verify credential: {0}")]
    Verification(String),
    /// 阻塞线程池中的哈希任务异常退出
    #[error("hashing worker failed: {0}")]
    Worker(String),
}

/// 单向哈希 + 比对，算法对应用层不可见
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError>;

    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError>;
}
