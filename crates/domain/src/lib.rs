//! 配对与链接生命周期的核心领域模型
//!
//! 包含用户、链接、聊天室、消息等核心实体，以及存储接口和业务规则。

pub mod chatroom;
pub mod errors;
pub mod link;
pub mod repository;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use chatroom::*;
pub use errors::*;
pub use link::*;
pub use repository::*;
pub use user::*;
pub use value_objects::*;
