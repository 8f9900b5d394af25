//! 基础设施层实现。
//!
//! 提供内存与 PostgreSQL 两套存储适配器、密码哈希，以及按配置装配它们的构建器。

pub mod builder;
pub mod memory;
pub mod migrations;
pub mod password;
pub mod repository;
pub mod retry;

pub use builder::{Infrastructure, InfrastructureConfig, InfrastructureError};
pub use memory::MemoryStore;
pub use migrations::MIGRATOR;
pub use password::BcryptPasswordHasher;
pub use repository::{
    create_pg_pool, PgChatroomRepository, PgLinkRepository, PgStorage, PgUserRepository,
};
pub use retry::{retry_async, Backoff, RetryConfig};
