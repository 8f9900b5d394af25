use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::password::PasswordHasherError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("password error: {0}")]
    Password(#[from] PasswordHasherError),
    /// 未知邮箱与错误密码返回同一个错误，避免账号枚举
    #[error("authentication failed")]
    Authentication,
}

/// 面向调用方的错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    /// 调用者不是链接 / 聊天室的参与者
    Unauthorized,
    InvalidState,
    /// 正常的空结果，不是故障
    NoMatchFound,
    /// 存储超时或连接失败，可重试
    Transient,
    InvalidInput,
    Authentication,
    Internal,
}

impl ApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::Domain(err) => domain_kind(err),
            ApplicationError::Repository(err) => match err {
                RepositoryError::NotFound => ErrorKind::NotFound,
                RepositoryError::Conflict => ErrorKind::InvalidState,
                RepositoryError::Timeout { .. } | RepositoryError::Storage { .. } => {
                    ErrorKind::Transient
                }
                RepositoryError::InvalidData { .. } => ErrorKind::Internal,
            },
            ApplicationError::Password(_) => ErrorKind::Internal,
            ApplicationError::Authentication => ErrorKind::Authentication,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

fn domain_kind(err: &DomainError) -> ErrorKind {
    match err {
        DomainError::InvalidArgument { .. } => ErrorKind::InvalidInput,
        DomainError::UserNotFound | DomainError::LinkNotFound | DomainError::ChatroomNotFound => {
            ErrorKind::NotFound
        }
        DomainError::NotLinkParticipant | DomainError::NotChatroomParticipant => {
            ErrorKind::Unauthorized
        }
        DomainError::NoMatchFound => ErrorKind::NoMatchFound,
        DomainError::UserAlreadyExists
        | DomainError::UserNotSearching
        | DomainError::UserAlreadyLinked
        | DomainError::SelfLink
        | DomainError::LinkAlreadyResolved { .. }
        | DomainError::ChatroomAlreadyUnlocked
        | DomainError::ChatroomLockedLimitReached => ErrorKind::InvalidState,
    }
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;
