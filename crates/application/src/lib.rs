//! 应用层实现。
//!
//! 这里提供配对、链接生命周期、聊天室门控等用例服务，处理输入校验、
//! 授权检查、存储调用超时，以及对外部适配器（例如密码哈希）的抽象。

pub mod clock;
pub mod dto;
pub mod error;
pub mod password;
pub mod services;
pub mod timeouts;

pub use clock::{Clock, SystemClock};
pub use dto::{CandidateDto, ChatroomDto, LinkDto, MessageDto, UserDto};
pub use error::{ApplicationError, ApplicationResult, ErrorKind};
pub use password::{PasswordHasher, PasswordHasherError};
pub use services::{
    AuthenticateUserRequest, ChatroomGate, ChatroomGateDependencies, ExpirationSweeper,
    LinkResponse, LinkService, LinkServiceDependencies, MatchFinder, MatchFinderDependencies,
    MatchingSettings, PreferencesInput, RegisterUserRequest, SweepReport, UpdateAccountRequest,
    UserService, UserServiceDependencies, MAX_PREVIEW_LIMIT,
};
pub use timeouts::StoreTimeouts;
