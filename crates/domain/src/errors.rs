//! 领域模型错误定义
//!
//! `DomainError` 描述业务不变量被违反的情况，`RepositoryError` 描述存储层的失败。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid argument {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("user not found")]
    UserNotFound,

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("user is not in searching mode")]
    UserNotSearching,

    #[error("user already holds an active link")]
    UserAlreadyLinked,

    #[error("no potential match found")]
    NoMatchFound,

    #[error("link not found")]
    LinkNotFound,

    #[error("a user cannot be linked with themselves")]
    SelfLink,

    #[error("user is not part of this link")]
    NotLinkParticipant,

    /// 链接已处于终态（accepted / rejected / expired），不允许再次迁移
    #[error("link is already resolved as {status}")]
    LinkAlreadyResolved { status: String },

    #[error("chatroom not found")]
    ChatroomNotFound,

    #[error("user is not part of this chatroom")]
    NotChatroomParticipant,

    #[error("chatroom is already unlocked")]
    ChatroomAlreadyUnlocked,

    #[error("chatroom is locked and message limit reached")]
    ChatroomLockedLimitReached,
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn link_already_resolved(status: impl ToString) -> Self {
        Self::LinkAlreadyResolved {
            status: status.to_string(),
        }
    }
}

/// 存储层错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    Conflict,

    /// 存储调用超过了限定时间
    #[error("store operation `{operation}` timed out")]
    Timeout { operation: String },

    #[error("storage error: {message}")]
    Storage { message: String },

    /// 存储中的数据无法还原为领域对象，重试无济于事
    #[error("invalid stored data: {message}")]
    InvalidData { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// 超时与连接失败属于可重试的瞬时错误
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Storage { .. })
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
pub type RepositoryResult<T> = Result<T, RepositoryError>;
